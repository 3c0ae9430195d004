//! Replaying snapshot edits against a backing store

use crate::TableSnapshot;
use tably_core::{BackingStore, Mutation, MutationKind, RowMatch};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Every column of a persisted row was edited, leaving nothing to match
    /// the stored row on. Raised before any statement is sent.
    #[error("row {row} of '{table}' cannot be identified: every column was modified")]
    Unidentifiable { table: String, row: usize },

    /// The store rejected a statement. Statements applied before it stay
    /// applied.
    #[error("{statement} rejected after {applied} applied statement(s): {message}")]
    Rejected {
        statement: MutationKind,
        applied: usize,
        message: String,
    },
}

/// Statement counts of a successful submission
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmitReport {
    pub deletes: usize,
    pub updates: usize,
    pub inserts: usize,
    /// Sum of the affected-row counts reported by the store
    pub affected_rows: u64,
}

impl SubmitReport {
    pub fn total_statements(&self) -> usize {
        self.deletes + self.updates + self.inserts
    }

    fn count(&mut self, kind: MutationKind, affected: u64) {
        match kind {
            MutationKind::Delete => self.deletes += 1,
            MutationKind::Update => self.updates += 1,
            MutationKind::Insert => self.inserts += 1,
        }
        self.affected_rows += affected;
    }
}

/// Translate the snapshot's pending changes into mutations.
///
/// - one delete per removed persisted row, matching all of its loaded values
/// - one update per edited persisted row, setting the edited columns and
///   matching on the unedited ones
/// - one insert per new row with its current values
///
/// Deletes come first, then updates, then inserts.
pub fn plan(snapshot: &TableSnapshot) -> Result<Vec<Mutation>, ReconcileError> {
    let table = snapshot.table_name();
    let columns = snapshot.columns();
    let changes = snapshot.changes();
    let mut mutations = Vec::with_capacity(changes.change_count());

    for row in changes.deleted_rows() {
        mutations.push(Mutation::Delete {
            table: table.to_string(),
            matcher: RowMatch::full_row(columns, row),
        });
    }

    for row_idx in changes.modified_rows() {
        let Some(row) = snapshot.rows().get(row_idx) else {
            continue;
        };
        let modified = changes.modified_columns(row_idx);

        let mut assignments = Vec::with_capacity(modified.len());
        let mut conditions = Vec::with_capacity(columns.len().saturating_sub(modified.len()));
        for (col_idx, (column, value)) in columns.iter().zip(row.iter()).enumerate() {
            if modified.contains(&col_idx) {
                assignments.push((column.name.clone(), value.clone()));
            } else {
                conditions.push((column.name.clone(), value.clone()));
            }
        }

        if conditions.is_empty() {
            return Err(ReconcileError::Unidentifiable {
                table: table.to_string(),
                row: row_idx,
            });
        }

        mutations.push(Mutation::Update {
            table: table.to_string(),
            assignments,
            matcher: RowMatch::new(conditions),
        });
    }

    for row_idx in changes.new_rows() {
        let Some(row) = snapshot.rows().get(row_idx) else {
            continue;
        };
        mutations.push(Mutation::Insert {
            table: table.to_string(),
            columns: columns.iter().map(|c| c.name.clone()).collect(),
            values: row.clone(),
        });
    }

    Ok(mutations)
}

/// Write every pending change of `snapshot` to `store`, one statement per row.
///
/// On success the snapshot's change set is cleared. On failure it is kept as
/// is, and the statements executed before the failing one are not undone.
#[tracing::instrument(skip_all, fields(table_name = %snapshot.table_name(), store = store.name()))]
pub async fn submit_all(
    store: &dyn BackingStore,
    snapshot: &mut TableSnapshot,
) -> Result<SubmitReport, ReconcileError> {
    let mutations = plan(snapshot)?;
    let mut report = SubmitReport::default();

    for mutation in &mutations {
        let kind = mutation.kind();
        match store.execute_mutation(mutation).await {
            Ok(affected) => {
                if affected == 0 {
                    tracing::warn!(statement = %kind, "statement matched no rows");
                }
                report.count(kind, affected);
            }
            Err(e) => {
                let applied = report.total_statements();
                tracing::error!(statement = %kind, applied, error = %e, "store rejected statement");
                return Err(ReconcileError::Rejected {
                    statement: kind,
                    applied,
                    message: e.to_string(),
                });
            }
        }
    }

    snapshot.mark_submitted();
    tracing::info!(
        deletes = report.deletes,
        updates = report.updates,
        inserts = report.inserts,
        affected_rows = report.affected_rows,
        "changes submitted"
    );
    Ok(report)
}
