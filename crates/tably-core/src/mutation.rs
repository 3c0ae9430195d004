//! Store-agnostic mutation descriptions
//!
//! The reconciliation engine never writes SQL itself. It produces `Mutation`
//! values and hands them to the `BackingStore`, which renders them for its own
//! dialect (or applies them directly, for non-SQL stores).

use crate::{ColumnDescriptor, Value, column_position};
use serde::{Deserialize, Serialize};

/// Identifies rows by column equality.
///
/// There is no primary-key requirement: an update or delete matches every row
/// whose listed columns equal the given values (`IS NULL` for NULL values).
/// Duplicate rows are therefore all affected by one statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowMatch {
    conditions: Vec<(String, Value)>,
}

impl RowMatch {
    pub fn new(conditions: Vec<(String, Value)>) -> Self {
        Self { conditions }
    }

    /// Match on every column of a row
    pub fn full_row(columns: &[ColumnDescriptor], row: &[Value]) -> Self {
        Self {
            conditions: columns
                .iter()
                .zip(row.iter())
                .map(|(col, val)| (col.name.clone(), val.clone()))
                .collect(),
        }
    }

    pub fn conditions(&self) -> &[(String, Value)] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Whether a row satisfies every condition. Unknown columns never match.
    pub fn matches(&self, columns: &[ColumnDescriptor], row: &[Value]) -> bool {
        self.conditions.iter().all(|(name, expected)| {
            let Some(cell) = column_position(columns, name).and_then(|idx| row.get(idx)) else {
                return false;
            };
            if expected.is_null() {
                cell.is_null()
            } else {
                cell == expected
            }
        })
    }
}

/// Kind of a mutation, used for logging and statement accounting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MutationKind {
    Insert,
    Update,
    Delete,
}

impl std::fmt::Display for MutationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MutationKind::Insert => write!(f, "insert"),
            MutationKind::Update => write!(f, "update"),
            MutationKind::Delete => write!(f, "delete"),
        }
    }
}

/// An INSERT/UPDATE/DELETE-equivalent request against one table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Mutation {
    Insert {
        table: String,
        columns: Vec<String>,
        values: Vec<Value>,
    },
    Update {
        table: String,
        assignments: Vec<(String, Value)>,
        matcher: RowMatch,
    },
    Delete {
        table: String,
        matcher: RowMatch,
    },
}

impl Mutation {
    pub fn kind(&self) -> MutationKind {
        match self {
            Mutation::Insert { .. } => MutationKind::Insert,
            Mutation::Update { .. } => MutationKind::Update,
            Mutation::Delete { .. } => MutationKind::Delete,
        }
    }

    pub fn table(&self) -> &str {
        match self {
            Mutation::Insert { table, .. }
            | Mutation::Update { table, .. }
            | Mutation::Delete { table, .. } => table,
        }
    }
}
