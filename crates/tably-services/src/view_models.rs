//! View models returned to the host
//!
//! These are plain data: hosts render them without reaching into engine state.

use serde::Serialize;
use tably_core::{ColumnDescriptor, Row};

/// A loaded table page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableData {
    pub table_name: String,
    pub columns: Vec<ColumnDescriptor>,
    /// Rows of the loaded page, unfiltered
    pub rows: Vec<Row>,
    /// Row count reported by the store for the whole table
    pub total_count: u64,
    /// Whether the page was served from the cache
    pub from_cache: bool,
    pub page: usize,
    pub page_size: usize,
}

/// Result of a filter dry run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterValidation {
    pub is_valid: bool,
    pub message: String,
}

impl FilterValidation {
    pub fn valid(message: impl Into<String>) -> Self {
        Self {
            is_valid: true,
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            message: message.into(),
        }
    }
}

impl From<FilterValidation> for (bool, String) {
    fn from(validation: FilterValidation) -> Self {
        (validation.is_valid, validation.message)
    }
}
