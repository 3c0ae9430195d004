//! Change tracking for a snapshot's unsaved edits

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use tably_core::{Row, Value};

/// One edited cell (not yet committed to the store)
#[derive(Clone, Debug, PartialEq)]
pub struct CellChange {
    /// Value loaded from the store, `None` for cells of new rows
    pub original: Option<Value>,
    /// Value after the latest edit
    pub current: Value,
}

/// Tracks all pending changes of one snapshot.
///
/// Row indices refer to the snapshot's row list and are renumbered whenever a
/// row is removed, so they always point at the row they were recorded for.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChangeSet {
    new_rows: BTreeSet<usize>,
    deleted_rows: Vec<Row>,
    modified_cells: BTreeMap<(usize, usize), CellChange>,
}

impl ChangeSet {
    /// Check if there are any pending changes
    pub fn is_empty(&self) -> bool {
        self.new_rows.is_empty() && self.deleted_rows.is_empty() && self.modified_cells.is_empty()
    }

    /// Clear all pending changes
    pub fn clear(&mut self) {
        self.new_rows.clear();
        self.deleted_rows.clear();
        self.modified_cells.clear();
    }

    /// Get total count of pending changes
    pub fn change_count(&self) -> usize {
        self.new_rows.len() + self.deleted_rows.len() + self.modified_cells.len()
    }

    /// Check if a row was inserted since the snapshot was loaded
    pub fn is_new_row(&self, row: usize) -> bool {
        self.new_rows.contains(&row)
    }

    /// Check if a specific cell has pending changes
    pub fn is_cell_modified(&self, row: usize, col: usize) -> bool {
        self.modified_cells.contains_key(&(row, col))
    }

    /// Get the pending change for a cell, if any
    pub fn cell_change(&self, row: usize, col: usize) -> Option<&CellChange> {
        self.modified_cells.get(&(row, col))
    }

    /// Indices of inserted rows, ascending
    pub fn new_rows(&self) -> impl Iterator<Item = usize> + '_ {
        self.new_rows.iter().copied()
    }

    /// Persisted rows removed from the snapshot, with their loaded values
    pub fn deleted_rows(&self) -> &[Row] {
        &self.deleted_rows
    }

    /// Every edited cell as `((row, col), change)`, in row-major order
    pub fn modified_cells(&self) -> impl Iterator<Item = ((usize, usize), &CellChange)> + '_ {
        self.modified_cells.iter().map(|(key, change)| (*key, change))
    }

    /// Persisted rows with at least one edited cell. New rows are excluded
    /// because they are inserted with their current values.
    pub fn modified_rows(&self) -> BTreeSet<usize> {
        self.modified_cells
            .keys()
            .map(|(row, _)| *row)
            .filter(|row| !self.new_rows.contains(row))
            .collect()
    }

    /// Edited column indices of one row, ascending
    pub fn modified_columns(&self, row: usize) -> Vec<usize> {
        self.modified_cells
            .range((row, 0)..=(row, usize::MAX))
            .map(|((_, col), _)| *col)
            .collect()
    }

    pub(crate) fn mark_new(&mut self, row: usize) {
        self.new_rows.insert(row);
    }

    /// Record an edit. The first edit of a persisted cell remembers the value
    /// it replaced; later edits only move `current`.
    pub(crate) fn record_edit(&mut self, row: usize, col: usize, previous: Value, current: Value) {
        let is_new = self.new_rows.contains(&row);
        match self.modified_cells.entry((row, col)) {
            Entry::Occupied(mut entry) => entry.get_mut().current = current,
            Entry::Vacant(entry) => {
                entry.insert(CellChange {
                    original: (!is_new).then_some(previous),
                    current,
                });
            }
        }
    }

    /// Record the removal of `row`, whose values at removal time are `removed`.
    ///
    /// A new row leaves no trace. A persisted row is remembered with its
    /// edited cells reset to their loaded values, so the delete matches what
    /// the store holds. Tracked indices above `row` shift down by one.
    pub(crate) fn record_delete(&mut self, row: usize, mut removed: Row) {
        if !self.new_rows.contains(&row) {
            for ((_, col), change) in self.modified_cells.range((row, 0)..=(row, usize::MAX)) {
                if let (Some(original), Some(cell)) = (&change.original, removed.get_mut(*col)) {
                    *cell = original.clone();
                }
            }
            self.deleted_rows.push(removed);
        }

        self.new_rows = std::mem::take(&mut self.new_rows)
            .into_iter()
            .filter_map(|r| shift_after_removal(r, row))
            .collect();
        self.modified_cells = std::mem::take(&mut self.modified_cells)
            .into_iter()
            .filter_map(|((r, col), change)| shift_after_removal(r, row).map(|r| ((r, col), change)))
            .collect();
    }
}

fn shift_after_removal(index: usize, removed: usize) -> Option<usize> {
    match index.cmp(&removed) {
        std::cmp::Ordering::Less => Some(index),
        std::cmp::Ordering::Equal => None,
        std::cmp::Ordering::Greater => Some(index - 1),
    }
}
