//! Bounded log of slow operations

use super::{OperationCategory, OperationSpeed, PerformanceRecord, PerformanceSummary};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tably_core::{Clock, Result, SystemClock};

/// Thresholds and capacity of the performance log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Query operations taking longer than this are logged
    pub query_threshold: Duration,
    /// Non-query operations taking longer than this are logged
    pub operation_threshold: Duration,
    /// Maximum number of records kept; the oldest are dropped first
    pub capacity: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            query_threshold: Duration::from_millis(500),
            operation_threshold: Duration::from_secs(2),
            capacity: 1000,
        }
    }
}

impl MonitorConfig {
    /// Log every operation, however fast. Useful in tests.
    pub fn record_everything() -> Self {
        Self {
            query_threshold: Duration::ZERO,
            operation_threshold: Duration::ZERO,
            ..Self::default()
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn threshold_for(&self, category: OperationCategory) -> Duration {
        match category {
            OperationCategory::Query => self.query_threshold,
            OperationCategory::Mutation | OperationCategory::Cache | OperationCategory::Filter => {
                self.operation_threshold
            }
        }
    }
}

/// A started measurement. Hand it back to
/// [`PerformanceMonitor::finish`] when the operation completes.
#[derive(Debug)]
pub struct OperationTimer {
    label: String,
    category: OperationCategory,
    started: Instant,
}

impl OperationTimer {
    pub fn start(label: impl Into<String>, category: OperationCategory) -> Self {
        Self {
            label: label.into(),
            category,
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

#[derive(Serialize)]
struct PerformanceExport<'a> {
    exported_at: DateTime<Utc>,
    summary: PerformanceSummary,
    records: Vec<&'a PerformanceRecord>,
}

/// Times engine operations and keeps those over their category threshold in
/// a ring buffer. Overflow never fails: the oldest record is dropped.
pub struct PerformanceMonitor {
    config: MonitorConfig,
    clock: Arc<dyn Clock>,
    records: VecDeque<PerformanceRecord>,
    dropped: u64,
}

impl std::fmt::Debug for PerformanceMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerformanceMonitor")
            .field("config", &self.config)
            .field("records", &self.records.len())
            .field("dropped", &self.dropped)
            .finish()
    }
}

impl PerformanceMonitor {
    pub fn new(config: MonitorConfig, clock: Arc<dyn Clock>) -> Self {
        let records = VecDeque::with_capacity(config.capacity.min(1024));
        Self {
            config,
            clock,
            records,
            dropped: 0,
        }
    }

    pub fn with_system_clock(config: MonitorConfig) -> Self {
        Self::new(config, Arc::new(SystemClock))
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Log a completed operation if it crossed its threshold or failed.
    /// Returns its speed class.
    pub fn record(
        &mut self,
        label: &str,
        category: OperationCategory,
        duration: Duration,
        error: Option<&str>,
    ) -> OperationSpeed {
        let speed = OperationSpeed::classify(duration);
        let duration_ms = duration.as_millis() as u64;

        match speed {
            OperationSpeed::Slow => {
                tracing::warn!(operation = %label, %category, duration_ms, "slow operation")
            }
            OperationSpeed::Elevated => {
                tracing::info!(operation = %label, %category, duration_ms, "elevated operation time")
            }
            OperationSpeed::Normal => {
                tracing::trace!(operation = %label, %category, duration_ms, "operation timed")
            }
        }

        if duration > self.config.threshold_for(category) || error.is_some() {
            let mut record = PerformanceRecord::new(label, category, duration, self.clock.now());
            if let Some(error) = error {
                record = record.with_error(error);
            }
            self.push(record);
        }

        speed
    }

    /// Log a query operation
    pub fn record_slow_query(&mut self, label: &str, duration: Duration, error: Option<&str>) -> OperationSpeed {
        self.record(label, OperationCategory::Query, duration, error)
    }

    /// Stop a timer and record the measurement
    pub fn finish(&mut self, timer: OperationTimer, error: Option<&str>) -> OperationSpeed {
        let elapsed = timer.elapsed();
        self.record(&timer.label, timer.category, elapsed, error)
    }

    pub fn records(&self) -> impl Iterator<Item = &PerformanceRecord> + '_ {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records dropped to stay within capacity since the last clear
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn summary(&self) -> PerformanceSummary {
        let total_records = self.records.len();
        let mut summary = PerformanceSummary {
            total_records,
            dropped: self.dropped,
            ..Default::default()
        };
        if total_records == 0 {
            return summary;
        }

        let mut total_ms = 0.0;
        for record in &self.records {
            match record.speed {
                OperationSpeed::Slow => summary.slow += 1,
                OperationSpeed::Elevated => summary.elevated += 1,
                OperationSpeed::Normal => {}
            }
            if record.is_error() {
                summary.errors += 1;
            }
            total_ms += record.duration_ms;
            summary.max_duration_ms = summary.max_duration_ms.max(record.duration_ms);
        }
        summary.avg_duration_ms = total_ms / total_records as f64;
        summary
    }

    /// Write the summary and all records as pretty JSON. Returns the number
    /// of records written.
    pub fn export_to_file(&self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let export = PerformanceExport {
            exported_at: self.clock.now(),
            summary: self.summary(),
            records: self.records.iter().collect(),
        };
        let json = serde_json::to_string_pretty(&export)?;
        std::fs::write(path, json)?;

        tracing::info!(path = %path.display(), records = export.records.len(), "performance log exported");
        Ok(export.records.len())
    }

    /// Drop every record and reset the overflow counter
    pub fn clear(&mut self) {
        self.records.clear();
        self.dropped = 0;
    }

    fn push(&mut self, record: PerformanceRecord) {
        if self.config.capacity == 0 {
            self.dropped += 1;
            return;
        }
        while self.records.len() >= self.config.capacity {
            self.records.pop_front();
            self.dropped += 1;
        }
        self.records.push_back(record);
    }
}
