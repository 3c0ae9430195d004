//! Backing-store trait

use crate::{ColumnDescriptor, Mutation, Result, Row, TablyError};
use async_trait::async_trait;

/// A table store the engine reads from and reconciles edits into.
///
/// Implementations may be SQL databases, columnar files, or in-memory tables.
/// Calls are awaited one at a time by the engine; timeouts and retries are the
/// implementation's responsibility.
#[async_trait]
pub trait BackingStore: Send + Sync {
    /// Short identifier used in logs (e.g. "sqlite", "memory")
    fn name(&self) -> &str;

    /// Column layout of a table
    async fn describe_table(&self, table_name: &str) -> Result<Vec<ColumnDescriptor>>;

    /// One page of rows, in store order
    async fn select_all(&self, table_name: &str, limit: usize, offset: usize) -> Result<Vec<Row>>;

    /// Total number of rows in a table (may be an estimate for very large tables)
    async fn count_rows(&self, table_name: &str) -> Result<u64>;

    /// Apply an insert/update/delete and return the number of affected rows
    async fn execute_mutation(&self, mutation: &Mutation) -> Result<u64>;

    /// Tables available for browsing
    async fn list_tables(&self) -> Result<Vec<String>> {
        Err(TablyError::NotSupported(format!(
            "table listing is not supported by the '{}' store",
            self.name()
        )))
    }
}
