//! Columnar in-memory `BackingStore`
//!
//! Each table keeps one value vector per column. Pages are transposed into
//! rows on read; mutations match rows the same way a SQL store's WHERE clause
//! would (column equality, NULL matches NULL).

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use tably_core::{BackingStore, ColumnDescriptor, Mutation, Result, Row, RowMatch, TablyError, Value, column_position};

#[derive(Debug, Clone, Default)]
struct ColumnarTable {
    columns: Vec<ColumnDescriptor>,
    /// `data[col][row]`
    data: Vec<Vec<Value>>,
}

impl ColumnarTable {
    fn new(columns: Vec<ColumnDescriptor>) -> Self {
        let data = vec![Vec::new(); columns.len()];
        Self { columns, data }
    }

    fn len(&self) -> usize {
        self.data.first().map_or(0, Vec::len)
    }

    fn row(&self, idx: usize) -> Row {
        self.data
            .iter()
            .map(|column| column.get(idx).cloned().unwrap_or(Value::Null))
            .collect()
    }

    fn push_row(&mut self, mut row: Row) {
        row.resize(self.columns.len(), Value::Null);
        for (column, value) in self.data.iter_mut().zip(row) {
            column.push(value);
        }
    }

    fn matching_rows(&self, matcher: &RowMatch) -> Vec<usize> {
        (0..self.len())
            .filter(|&idx| matcher.matches(&self.columns, &self.row(idx)))
            .collect()
    }

    fn resolve(&self, name: &str) -> Result<usize> {
        column_position(&self.columns, name)
            .ok_or_else(|| TablyError::InvalidArgument(format!("unknown column '{}'", name)))
    }

    fn insert(&mut self, names: &[String], values: &[Value]) -> Result<u64> {
        if names.len() != values.len() {
            return Err(TablyError::InvalidArgument(
                "column/value count mismatch for insert".to_string(),
            ));
        }
        let mut row = vec![Value::Null; self.columns.len()];
        for (name, value) in names.iter().zip(values) {
            row[self.resolve(name)?] = value.clone();
        }
        for (column, value) in self.columns.iter().zip(&row) {
            if !column.nullable && value.is_null() {
                return Err(TablyError::Store(format!("column '{}' may not be NULL", column.name)));
            }
        }
        self.push_row(row);
        Ok(1)
    }

    fn update(&mut self, assignments: &[(String, Value)], matcher: &RowMatch) -> Result<u64> {
        let targets = assignments
            .iter()
            .map(|(name, value)| Ok((self.resolve(name)?, value)))
            .collect::<Result<Vec<_>>>()?;
        let rows = self.matching_rows(matcher);
        for &row in &rows {
            for &(col, value) in &targets {
                self.data[col][row] = value.clone();
            }
        }
        Ok(rows.len() as u64)
    }

    fn delete(&mut self, matcher: &RowMatch) -> u64 {
        let rows = self.matching_rows(matcher);
        // Highest first so earlier indices stay valid
        for &row in rows.iter().rev() {
            for column in &mut self.data {
                column.remove(row);
            }
        }
        rows.len() as u64
    }
}

/// In-memory tables for embedding and tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<BTreeMap<String, ColumnarTable>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: add a table with initial rows
    pub fn with_table(self, name: impl Into<String>, columns: Vec<ColumnDescriptor>, rows: Vec<Row>) -> Self {
        self.insert_table(name, columns, rows);
        self
    }

    /// Create or replace a table
    pub fn insert_table(&self, name: impl Into<String>, columns: Vec<ColumnDescriptor>, rows: Vec<Row>) {
        let mut table = ColumnarTable::new(columns);
        for row in rows {
            table.push_row(row);
        }
        self.tables.write().insert(name.into(), table);
    }

    /// Every row of a table, for inspection
    pub fn rows(&self, table_name: &str) -> Option<Vec<Row>> {
        let tables = self.tables.read();
        let table = tables.get(table_name)?;
        Some((0..table.len()).map(|idx| table.row(idx)).collect())
    }

    fn not_found(table_name: &str) -> TablyError {
        TablyError::NotFound(format!("table '{}'", table_name))
    }
}

#[async_trait]
impl BackingStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn describe_table(&self, table_name: &str) -> Result<Vec<ColumnDescriptor>> {
        self.tables
            .read()
            .get(table_name)
            .map(|t| t.columns.clone())
            .ok_or_else(|| Self::not_found(table_name))
    }

    async fn select_all(&self, table_name: &str, limit: usize, offset: usize) -> Result<Vec<Row>> {
        let tables = self.tables.read();
        let table = tables.get(table_name).ok_or_else(|| Self::not_found(table_name))?;
        let end = offset.saturating_add(limit).min(table.len());
        Ok((offset.min(end)..end).map(|idx| table.row(idx)).collect())
    }

    async fn count_rows(&self, table_name: &str) -> Result<u64> {
        self.tables
            .read()
            .get(table_name)
            .map(|t| t.len() as u64)
            .ok_or_else(|| Self::not_found(table_name))
    }

    async fn execute_mutation(&self, mutation: &Mutation) -> Result<u64> {
        let mut tables = self.tables.write();
        let table = tables
            .get_mut(mutation.table())
            .ok_or_else(|| Self::not_found(mutation.table()))?;

        let affected = match mutation {
            Mutation::Insert { columns, values, .. } => table.insert(columns, values)?,
            Mutation::Update {
                assignments, matcher, ..
            } => table.update(assignments, matcher)?,
            Mutation::Delete { matcher, .. } => table.delete(matcher),
        };

        tracing::trace!(table_name = %mutation.table(), statement = %mutation.kind(), affected, "memory mutation");
        Ok(affected)
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        Ok(self.tables.read().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn store() -> MemoryStore {
        MemoryStore::new().with_table(
            "fruit",
            vec![
                ColumnDescriptor::new("id", "integer").not_null(),
                ColumnDescriptor::new("name", "text"),
                ColumnDescriptor::new("qty", "integer"),
            ],
            vec![
                vec![Value::Int64(1), Value::from("Apple"), Value::Int64(5)],
                vec![Value::Int64(2), Value::from("Banana"), Value::Int64(0)],
                vec![Value::Int64(3), Value::from("Cherry"), Value::Null],
            ],
        )
    }

    fn by_id(id: i64) -> RowMatch {
        RowMatch::new(vec![("id".to_string(), Value::Int64(id))])
    }

    #[tokio::test]
    async fn test_select_pages() {
        let store = store();
        assert_eq!(store.count_rows("fruit").await.unwrap(), 3);

        let page = store.select_all("fruit", 2, 1).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0][1], Value::from("Banana"));
        assert_eq!(page[1][2], Value::Null);

        assert!(store.select_all("fruit", 10, 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_table() {
        let store = store();
        assert!(matches!(store.describe_table("veg").await, Err(TablyError::NotFound(_))));
        assert!(matches!(store.select_all("veg", 1, 0).await, Err(TablyError::NotFound(_))));
        assert_eq!(store.list_tables().await.unwrap(), vec!["fruit".to_string()]);
    }

    #[tokio::test]
    async fn test_insert_maps_columns_by_name() {
        let store = store();
        let insert = Mutation::Insert {
            table: "fruit".into(),
            columns: vec!["name".into(), "id".into()],
            values: vec![Value::from("Date"), Value::Int64(4)],
        };
        assert_eq!(store.execute_mutation(&insert).await.unwrap(), 1);

        let rows = store.rows("fruit").unwrap();
        assert_eq!(rows[3], vec![Value::Int64(4), Value::from("Date"), Value::Null]);
    }

    #[tokio::test]
    async fn test_insert_rejects_bad_columns_and_nulls() {
        let store = store();
        let unknown = Mutation::Insert {
            table: "fruit".into(),
            columns: vec!["colour".into()],
            values: vec![Value::from("red")],
        };
        assert!(matches!(
            store.execute_mutation(&unknown).await,
            Err(TablyError::InvalidArgument(_))
        ));

        let null_id = Mutation::Insert {
            table: "fruit".into(),
            columns: vec!["name".into()],
            values: vec![Value::from("Elder")],
        };
        assert!(matches!(store.execute_mutation(&null_id).await, Err(TablyError::Store(_))));
        assert_eq!(store.count_rows("fruit").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_update_and_delete_match_like_sql() {
        let store = store();
        let update = Mutation::Update {
            table: "fruit".into(),
            assignments: vec![("qty".into(), Value::Int64(7))],
            matcher: RowMatch::new(vec![("qty".into(), Value::Null)]),
        };
        assert_eq!(store.execute_mutation(&update).await.unwrap(), 1);
        assert_eq!(store.rows("fruit").unwrap()[2][2], Value::Int64(7));

        let delete = Mutation::Delete {
            table: "fruit".into(),
            matcher: by_id(1),
        };
        assert_eq!(store.execute_mutation(&delete).await.unwrap(), 1);
        assert_eq!(store.execute_mutation(&delete).await.unwrap(), 0);
        assert_eq!(store.count_rows("fruit").await.unwrap(), 2);
    }
}
