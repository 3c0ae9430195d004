//! Common test utilities and mocks

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Arc;
use tably_core::{BackingStore, ColumnDescriptor, Mutation, Result, Row, TablyError, Value};
use tably_services::MemoryStore;

/// Store for testing controller logic.
///
/// Serves tables from a `MemoryStore` and logs every call as
/// `"<operation> <table>"`, so tests can assert which round-trips were made.
/// Any operation can be made to fail.
pub struct MockStore {
    pub inner: MemoryStore,
    /// Operation name to fail, e.g. "select_all" or "execute_mutation"
    pub fail_on: Option<String>,
    /// Log of all calls made, for assertion in tests
    pub call_log: Arc<parking_lot::Mutex<Vec<String>>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_on: None,
            call_log: Arc::new(parking_lot::Mutex::new(Vec::new())),
        }
    }

    pub fn with_table(mut self, name: &str, columns: Vec<ColumnDescriptor>, rows: Vec<Row>) -> Self {
        self.inner = self.inner.with_table(name, columns, rows);
        self
    }

    pub fn with_fruit(self) -> Self {
        self.with_table("fruit", fruit_columns(), fruit_rows())
    }

    pub fn failing_on(mut self, operation: &str) -> Self {
        self.fail_on = Some(operation.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.call_log.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.call_log.lock().clear();
    }

    /// Number of logged calls starting with `operation`
    pub fn count(&self, operation: &str) -> usize {
        self.call_log
            .lock()
            .iter()
            .filter(|call| call.starts_with(operation))
            .count()
    }

    fn log(&self, operation: &str, table_name: &str) -> Result<()> {
        self.call_log.lock().push(format!("{} {}", operation, table_name));
        if self.fail_on.as_deref() == Some(operation) {
            return Err(TablyError::Store(format!("{} failed on {}", operation, table_name)));
        }
        Ok(())
    }
}

#[async_trait]
impl BackingStore for MockStore {
    fn name(&self) -> &str {
        "mock"
    }

    async fn describe_table(&self, table_name: &str) -> Result<Vec<ColumnDescriptor>> {
        self.log("describe_table", table_name)?;
        self.inner.describe_table(table_name).await
    }

    async fn select_all(&self, table_name: &str, limit: usize, offset: usize) -> Result<Vec<Row>> {
        self.log("select_all", table_name)?;
        self.inner.select_all(table_name, limit, offset).await
    }

    async fn count_rows(&self, table_name: &str) -> Result<u64> {
        self.log("count_rows", table_name)?;
        self.inner.count_rows(table_name).await
    }

    async fn execute_mutation(&self, mutation: &Mutation) -> Result<u64> {
        self.log("execute_mutation", mutation.table())?;
        self.inner.execute_mutation(mutation).await
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        self.log("list_tables", "*")?;
        self.inner.list_tables().await
    }
}

pub fn fruit_columns() -> Vec<ColumnDescriptor> {
    vec![
        ColumnDescriptor::new("id", "integer").not_null(),
        ColumnDescriptor::new("name", "text"),
        ColumnDescriptor::new("qty", "integer"),
    ]
}

pub fn fruit_rows() -> Vec<Row> {
    vec![
        vec![Value::Int64(1), Value::from("Apple"), Value::Int64(5)],
        vec![Value::Int64(2), Value::from("Banana"), Value::Int64(0)],
    ]
}
