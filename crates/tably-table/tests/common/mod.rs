//! Common test utilities and mocks

use async_trait::async_trait;
use std::sync::Arc;
use tably_core::{BackingStore, ColumnDescriptor, Mutation, MutationKind, Result, Row, TablyError, Value};
use tably_table::TableSnapshot;

/// Store that records every mutation it is asked to execute.
///
/// Optionally rejects the n-th statement (0-based) to exercise partial
/// submissions.
pub struct RecordingStore {
    pub fail_at: Option<usize>,
    pub mutation_log: Arc<parking_lot::Mutex<Vec<Mutation>>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self {
            fail_at: None,
            mutation_log: Arc::new(parking_lot::Mutex::new(Vec::new())),
        }
    }

    pub fn failing_at(mut self, statement: usize) -> Self {
        self.fail_at = Some(statement);
        self
    }

    pub fn mutations(&self) -> Vec<Mutation> {
        self.mutation_log.lock().clone()
    }

    pub fn kinds(&self) -> Vec<MutationKind> {
        self.mutation_log.lock().iter().map(Mutation::kind).collect()
    }
}

#[async_trait]
impl BackingStore for RecordingStore {
    fn name(&self) -> &str {
        "recording"
    }

    async fn describe_table(&self, _table_name: &str) -> Result<Vec<ColumnDescriptor>> {
        Ok(fruit_columns())
    }

    async fn select_all(&self, _table_name: &str, _limit: usize, _offset: usize) -> Result<Vec<Row>> {
        Ok(fruit_rows())
    }

    async fn count_rows(&self, _table_name: &str) -> Result<u64> {
        Ok(fruit_rows().len() as u64)
    }

    async fn execute_mutation(&self, mutation: &Mutation) -> Result<u64> {
        let mut log = self.mutation_log.lock();
        if self.fail_at == Some(log.len()) {
            return Err(TablyError::Store(format!("constraint violation on {}", mutation.table())));
        }
        log.push(mutation.clone());
        Ok(1)
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

pub fn fruit_snapshot() -> TableSnapshot {
    TableSnapshot::new("fruit", fruit_columns(), fruit_rows())
}
