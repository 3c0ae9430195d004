//! `BackingStore` over a SQL connection
//!
//! Renders page queries and mutations as parameterized SQL for the connected
//! driver. Identifier quoting and placeholder style follow the driver name.

use async_trait::async_trait;
use std::sync::Arc;
use tably_core::{BackingStore, ColumnDescriptor, Mutation, Result, Row, RowMatch, TablyError, Value};

/// Rows returned by a SQL query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlRows {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

/// The narrow slice of a database driver the store needs
#[async_trait]
pub trait SqlConnection: Send + Sync {
    /// Driver identifier ("postgresql", "mysql", "mssql", "sqlite", ...)
    fn driver_name(&self) -> &str;

    async fn query(&self, sql: &str, params: &[Value]) -> Result<SqlRows>;

    /// Run a statement and return the number of affected rows
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64>;

    /// Column layout of a table, from the driver's schema introspection
    async fn describe(&self, table_name: &str, schema: Option<&str>) -> Result<Vec<ColumnDescriptor>>;

    async fn table_names(&self, _schema: Option<&str>) -> Result<Vec<String>> {
        Err(TablyError::NotSupported(format!(
            "schema introspection is not supported by {}",
            self.driver_name()
        )))
    }
}

/// Collects bound parameters and hands out the matching placeholders
struct Params<'a> {
    driver: &'a str,
    values: Vec<Value>,
}

impl<'a> Params<'a> {
    fn new(driver: &'a str) -> Self {
        Self {
            driver,
            values: Vec::new(),
        }
    }

    fn bind(&mut self, value: &Value) -> String {
        self.values.push(value.clone());
        SqlStore::<()>::param_placeholder(self.driver, self.values.len())
    }
}

pub struct SqlStore<C: ?Sized> {
    connection: Arc<C>,
    schema: Option<String>,
}

impl<C: ?Sized> std::fmt::Debug for SqlStore<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlStore").field("schema", &self.schema).finish()
    }
}

impl<C: ?Sized> SqlStore<C> {
    pub fn escape_identifier_for(identifier: &str, driver_name: &str) -> String {
        match driver_name {
            "mysql" => format!("`{}`", identifier.replace('`', "``")),
            "mssql" => format!("[{}]", identifier.replace(']', "]]")),
            _ => format!("\"{}\"", identifier.replace('"', "\"\"")),
        }
    }

    /// `schema.table` when a schema is set, otherwise the bare table
    pub fn qualified_table_name(table_name: &str, schema: Option<&str>, driver_name: &str) -> String {
        match schema {
            Some(s) => format!(
                "{}.{}",
                Self::escape_identifier_for(s, driver_name),
                Self::escape_identifier_for(table_name, driver_name)
            ),
            None => Self::escape_identifier_for(table_name, driver_name),
        }
    }

    /// 1-based placeholder for the driver
    pub fn param_placeholder(driver_name: &str, param_index: usize) -> String {
        if driver_name == "postgresql" {
            format!("${}", param_index)
        } else {
            "?".to_string()
        }
    }

    /// One page of rows in store order. MSSQL has no LIMIT and needs an
    /// ORDER BY before OFFSET/FETCH.
    pub fn select_page_sql(table: &str, schema: Option<&str>, driver: &str, limit: usize, offset: usize) -> String {
        let qualified = Self::qualified_table_name(table, schema, driver);
        if driver == "mssql" {
            format!(
                "SELECT * FROM {} ORDER BY (SELECT NULL) OFFSET {} ROWS FETCH NEXT {} ROWS ONLY",
                qualified, offset, limit
            )
        } else {
            format!("SELECT * FROM {} LIMIT {} OFFSET {}", qualified, limit, offset)
        }
    }

    pub fn count_sql(table: &str, schema: Option<&str>, driver: &str) -> String {
        format!("SELECT COUNT(*) FROM {}", Self::qualified_table_name(table, schema, driver))
    }

    /// Render a mutation as SQL plus its bound parameters.
    ///
    /// NULL values are written as literals (`NULL` in VALUES and SET lists,
    /// `IS NULL` in WHERE clauses) rather than bound.
    pub fn render(mutation: &Mutation, schema: Option<&str>, driver: &str) -> (String, Vec<Value>) {
        let qualified = Self::qualified_table_name(mutation.table(), schema, driver);
        let mut params = Params::new(driver);

        let sql = match mutation {
            Mutation::Insert { columns, values, .. } => {
                let names: Vec<String> = columns
                    .iter()
                    .map(|c| Self::escape_identifier_for(c, driver))
                    .collect();
                let slots: Vec<String> = values
                    .iter()
                    .map(|v| if v.is_null() { "NULL".to_string() } else { params.bind(v) })
                    .collect();
                format!(
                    "INSERT INTO {} ({}) VALUES ({})",
                    qualified,
                    names.join(", "),
                    slots.join(", ")
                )
            }
            Mutation::Update {
                assignments, matcher, ..
            } => {
                let set: Vec<String> = assignments
                    .iter()
                    .map(|(col, val)| {
                        let slot = if val.is_null() { "NULL".to_string() } else { params.bind(val) };
                        format!("{} = {}", Self::escape_identifier_for(col, driver), slot)
                    })
                    .collect();
                let where_clause = Self::where_clause(matcher, &mut params);
                format!("UPDATE {} SET {} WHERE {}", qualified, set.join(", "), where_clause)
            }
            Mutation::Delete { matcher, .. } => {
                let where_clause = Self::where_clause(matcher, &mut params);
                format!("DELETE FROM {} WHERE {}", qualified, where_clause)
            }
        };

        (sql, params.values)
    }

    fn where_clause(matcher: &RowMatch, params: &mut Params<'_>) -> String {
        matcher
            .conditions()
            .iter()
            .map(|(col, val)| {
                let column = Self::escape_identifier_for(col, params.driver);
                if val.is_null() {
                    format!("{} IS NULL", column)
                } else {
                    format!("{} = {}", column, params.bind(val))
                }
            })
            .collect::<Vec<_>>()
            .join(" AND ")
    }
}

impl<C: SqlConnection + ?Sized> SqlStore<C> {
    pub fn new(connection: Arc<C>) -> Self {
        Self {
            connection,
            schema: None,
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn connection(&self) -> &Arc<C> {
        &self.connection
    }
}

#[async_trait]
impl<C: SqlConnection + ?Sized> BackingStore for SqlStore<C> {
    fn name(&self) -> &str {
        self.connection.driver_name()
    }

    async fn describe_table(&self, table_name: &str) -> Result<Vec<ColumnDescriptor>> {
        let columns = self.connection.describe(table_name, self.schema.as_deref()).await?;
        if columns.is_empty() {
            return Err(TablyError::NotFound(format!("table '{}'", table_name)));
        }
        Ok(columns)
    }

    #[tracing::instrument(skip(self), fields(driver = self.connection.driver_name()))]
    async fn select_all(&self, table_name: &str, limit: usize, offset: usize) -> Result<Vec<Row>> {
        let sql = Self::select_page_sql(
            table_name,
            self.schema.as_deref(),
            self.connection.driver_name(),
            limit,
            offset,
        );
        tracing::debug!(sql = %sql, "select page");
        Ok(self.connection.query(&sql, &[]).await?.rows)
    }

    async fn count_rows(&self, table_name: &str) -> Result<u64> {
        let sql = Self::count_sql(table_name, self.schema.as_deref(), self.connection.driver_name());
        let result = self.connection.query(&sql, &[]).await?;
        let count = result
            .rows
            .first()
            .and_then(|row| row.first())
            .and_then(Value::as_i64)
            .ok_or_else(|| TablyError::Query(format!("COUNT(*) on '{}' returned no number", table_name)))?;
        Ok(count.max(0) as u64)
    }

    #[tracing::instrument(skip(self, mutation), fields(table_name = %mutation.table(), statement = %mutation.kind()))]
    async fn execute_mutation(&self, mutation: &Mutation) -> Result<u64> {
        let (sql, params) = Self::render(mutation, self.schema.as_deref(), self.connection.driver_name());
        tracing::debug!(sql = %sql, params = params.len(), "execute mutation");
        self.connection.execute(&sql, &params).await
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        self.connection.table_names(self.schema.as_deref()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    type Sql = SqlStore<()>;

    fn matcher(conditions: &[(&str, Value)]) -> RowMatch {
        RowMatch::new(conditions.iter().map(|(c, v)| (c.to_string(), v.clone())).collect())
    }

    #[test]
    fn test_escape_identifier_postgresql() {
        assert_eq!(Sql::escape_identifier_for("fruit", "postgresql"), "\"fruit\"");
        assert_eq!(Sql::escape_identifier_for("fr\"uit", "postgresql"), "\"fr\"\"uit\"");
    }

    #[test]
    fn test_escape_identifier_mysql() {
        assert_eq!(Sql::escape_identifier_for("fruit", "mysql"), "`fruit`");
        assert_eq!(Sql::escape_identifier_for("fr`uit", "mysql"), "`fr``uit`");
    }

    #[test]
    fn test_escape_identifier_mssql() {
        assert_eq!(Sql::escape_identifier_for("fruit", "mssql"), "[fruit]");
        assert_eq!(Sql::escape_identifier_for("fr]uit", "mssql"), "[fr]]uit]");
    }

    #[test]
    fn test_qualified_table_name() {
        assert_eq!(Sql::qualified_table_name("fruit", Some("shop"), "mysql"), "`shop`.`fruit`");
        assert_eq!(Sql::qualified_table_name("fruit", None, "sqlite"), "\"fruit\"");
    }

    #[test]
    fn test_page_queries() {
        assert_eq!(
            Sql::select_page_sql("fruit", None, "sqlite", 2000, 4000),
            "SELECT * FROM \"fruit\" LIMIT 2000 OFFSET 4000"
        );
        assert_eq!(
            Sql::select_page_sql("fruit", None, "mssql", 500, 0),
            "SELECT * FROM [fruit] ORDER BY (SELECT NULL) OFFSET 0 ROWS FETCH NEXT 500 ROWS ONLY"
        );
        assert_eq!(Sql::count_sql("fruit", None, "mysql"), "SELECT COUNT(*) FROM `fruit`");
    }

    #[test]
    fn test_render_insert_with_null_literal() {
        let mutation = Mutation::Insert {
            table: "fruit".into(),
            columns: vec!["id".into(), "name".into(), "qty".into()],
            values: vec![Value::Int64(3), Value::from("Cherry"), Value::Null],
        };
        let (sql, params) = Sql::render(&mutation, None, "sqlite");
        assert_eq!(sql, "INSERT INTO \"fruit\" (\"id\", \"name\", \"qty\") VALUES (?, ?, NULL)");
        assert_eq!(params, vec![Value::Int64(3), Value::from("Cherry")]);
    }

    #[test]
    fn test_render_update_numbers_postgres_placeholders() {
        let mutation = Mutation::Update {
            table: "fruit".into(),
            assignments: vec![("qty".into(), Value::Int64(6))],
            matcher: matcher(&[("id", Value::Int64(1)), ("name", Value::Null), ("note", Value::from("x"))]),
        };
        let (sql, params) = Sql::render(&mutation, None, "postgresql");
        assert_eq!(
            sql,
            "UPDATE \"fruit\" SET \"qty\" = $1 WHERE \"id\" = $2 AND \"name\" IS NULL AND \"note\" = $3"
        );
        assert_eq!(params, vec![Value::Int64(6), Value::Int64(1), Value::from("x")]);
    }

    #[test]
    fn test_render_update_to_null() {
        let mutation = Mutation::Update {
            table: "fruit".into(),
            assignments: vec![("qty".into(), Value::Null)],
            matcher: matcher(&[("id", Value::Int64(1))]),
        };
        let (sql, params) = Sql::render(&mutation, Some("shop"), "mysql");
        assert_eq!(sql, "UPDATE `shop`.`fruit` SET `qty` = NULL WHERE `id` = ?");
        assert_eq!(params, vec![Value::Int64(1)]);
    }

    #[test]
    fn test_render_delete_full_row() {
        let mutation = Mutation::Delete {
            table: "fruit".into(),
            matcher: matcher(&[("id", Value::Int64(2)), ("qty", Value::Null)]),
        };
        let (sql, params) = Sql::render(&mutation, None, "mssql");
        assert_eq!(sql, "DELETE FROM [fruit] WHERE [id] = ? AND [qty] IS NULL");
        assert_eq!(params, vec![Value::Int64(2)]);
    }
}
