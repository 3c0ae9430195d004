//! Page sizing from table size

use std::collections::HashSet;

/// Tables above this many rows trigger the indexing advisory
pub const DEFAULT_LARGE_TABLE_THRESHOLD: u64 = 500_000;

/// Chooses page sizes from the estimated row count of a table and warns once
/// per table when a table is large enough to deserve indexing or
/// partitioning. The advisory never blocks a load.
#[derive(Debug, Clone)]
pub struct PaginationPlanner {
    large_table_threshold: u64,
    advised: HashSet<String>,
}

impl Default for PaginationPlanner {
    fn default() -> Self {
        Self::new(DEFAULT_LARGE_TABLE_THRESHOLD)
    }
}

impl PaginationPlanner {
    pub fn new(large_table_threshold: u64) -> Self {
        Self {
            large_table_threshold,
            advised: HashSet::new(),
        }
    }

    pub fn large_table_threshold(&self) -> u64 {
        self.large_table_threshold
    }

    /// Page size for a table of `estimated_total_rows`
    pub fn page_size_for(estimated_total_rows: u64) -> usize {
        if estimated_total_rows > 1_000_000 {
            500
        } else if estimated_total_rows > 500_000 {
            1000
        } else {
            2000
        }
    }

    /// Page size for `table_name`, emitting the large-table advisory the
    /// first time the table crosses the threshold.
    pub fn plan(&mut self, table_name: &str, estimated_total_rows: u64) -> usize {
        let page_size = Self::page_size_for(estimated_total_rows);

        if estimated_total_rows > self.large_table_threshold && self.advised.insert(table_name.to_string()) {
            tracing::warn!(
                table_name = %table_name,
                estimated_rows = estimated_total_rows,
                page_size,
                "large table: consider adding indexes or partitioning"
            );
        }

        page_size
    }

    /// Whether the advisory has been emitted for `table_name`
    pub fn was_advised(&self, table_name: &str) -> bool {
        self.advised.contains(table_name)
    }

    pub fn page_offset(page: usize, page_size: usize) -> usize {
        page.saturating_mul(page_size)
    }

    /// Number of pages needed for `total_rows`. An empty table still has one
    /// (empty) page.
    pub fn page_count(total_rows: u64, page_size: usize) -> usize {
        if page_size == 0 {
            return 1;
        }
        (total_rows.div_ceil(page_size as u64) as usize).max(1)
    }
}
