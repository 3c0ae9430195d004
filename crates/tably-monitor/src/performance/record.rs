//! Performance records and classification

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Operations slower than this are classified as slow
pub const SLOW_OPERATION: Duration = Duration::from_secs(5);

/// Operations slower than this (and not slow) are classified as elevated
pub const ELEVATED_OPERATION: Duration = Duration::from_secs(2);

/// Speed class of a timed operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationSpeed {
    /// Completed within 2 seconds
    #[default]
    Normal,
    /// Took more than 2 seconds
    Elevated,
    /// Took more than 5 seconds
    Slow,
}

impl OperationSpeed {
    pub fn classify(duration: Duration) -> Self {
        if duration > SLOW_OPERATION {
            OperationSpeed::Slow
        } else if duration > ELEVATED_OPERATION {
            OperationSpeed::Elevated
        } else {
            OperationSpeed::Normal
        }
    }

    /// Check if the operation needs attention (elevated or slow)
    pub fn needs_attention(&self) -> bool {
        matches!(self, OperationSpeed::Elevated | OperationSpeed::Slow)
    }
}

impl std::fmt::Display for OperationSpeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationSpeed::Normal => write!(f, "normal"),
            OperationSpeed::Elevated => write!(f, "elevated"),
            OperationSpeed::Slow => write!(f, "slow"),
        }
    }
}

/// What kind of engine operation was timed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationCategory {
    /// Reads from the backing store (describe, count, select)
    Query,
    /// Writes to the backing store
    Mutation,
    /// Cache lookups and stores
    Cache,
    /// Filter parsing and rescans
    Filter,
}

impl std::fmt::Display for OperationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationCategory::Query => write!(f, "query"),
            OperationCategory::Mutation => write!(f, "mutation"),
            OperationCategory::Cache => write!(f, "cache"),
            OperationCategory::Filter => write!(f, "filter"),
        }
    }
}

/// One logged operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub timestamp: DateTime<Utc>,
    pub operation_label: String,
    pub category: OperationCategory,
    pub duration_ms: f64,
    pub speed: OperationSpeed,
    /// Error text if the operation failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PerformanceRecord {
    pub fn new(
        operation_label: impl Into<String>,
        category: OperationCategory,
        duration: Duration,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            timestamp,
            operation_label: operation_label.into(),
            category,
            duration_ms: duration.as_secs_f64() * 1000.0,
            speed: OperationSpeed::classify(duration),
            error: None,
        }
    }

    /// Builder method: attach an error message
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Aggregate view of the records currently held
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub total_records: usize,
    pub slow: usize,
    pub elevated: usize,
    pub errors: usize,
    pub avg_duration_ms: f64,
    pub max_duration_ms: f64,
    /// Records dropped from the front of the log since the last clear
    pub dropped: u64,
}

impl PerformanceSummary {
    /// Percentage of records that were slow
    pub fn slow_percentage(&self) -> f64 {
        if self.total_records == 0 {
            return 0.0;
        }
        (self.slow as f64 / self.total_records as f64) * 100.0
    }
}
