//! The loaded rows of one table plus their filtered view

use crate::ChangeSet;
use tably_core::{ColumnDescriptor, Row, Value, column_position};
use tably_filter::{BoundFilter, Filter, parse};

/// Summary of the active filter for status bars
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FilterInfo {
    pub total_rows: usize,
    pub filtered_rows: usize,
    pub filter_active: bool,
    /// Share of rows passing the filter, 0-100
    pub match_percentage: f64,
}

/// Rows of one table page with a filtered view and pending edits.
///
/// Row indices passed to [`insert_row`](Self::insert_row),
/// [`delete_row`](Self::delete_row) and [`set_cell`](Self::set_cell) address
/// the underlying row list. View indices (as shown to the user) go through
/// [`source_row`](Self::source_row) first.
#[derive(Debug, Clone)]
pub struct TableSnapshot {
    table_name: String,
    columns: Vec<ColumnDescriptor>,
    rows: Vec<Row>,
    total_count: u64,
    filter_text: String,
    filter: Filter,
    filtered_indices: Vec<usize>,
    changes: ChangeSet,
}

impl TableSnapshot {
    pub fn new(table_name: impl Into<String>, columns: Vec<ColumnDescriptor>, rows: Vec<Row>) -> Self {
        let total_count = rows.len() as u64;
        let filtered_indices = (0..rows.len()).collect();
        Self {
            table_name: table_name.into(),
            columns,
            rows,
            total_count,
            filter_text: String::new(),
            filter: Filter::empty(),
            filtered_indices,
            changes: ChangeSet::default(),
        }
    }

    /// Row count reported by the store, which may exceed the loaded page
    pub fn with_total_count(mut self, total_count: u64) -> Self {
        self.total_count = total_count;
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    pub fn filter_text(&self) -> &str {
        &self.filter_text
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn filtered_indices(&self) -> &[usize] {
        &self.filtered_indices
    }

    pub fn changes(&self) -> &ChangeSet {
        &self.changes
    }

    pub fn is_dirty(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Parse `text` and rebuild the filtered view. Malformed text silently
    /// becomes a substring search over every column.
    ///
    /// Returns whether the set of visible rows changed.
    pub fn set_filter(&mut self, text: &str) -> bool {
        self.filter_text = text.to_string();
        self.filter = parse(text);
        let before = std::mem::take(&mut self.filtered_indices);
        self.refilter();
        before != self.filtered_indices
    }

    /// Rows in the filtered view
    pub fn row_count(&self) -> usize {
        self.filtered_indices.len()
    }

    /// Rows loaded, ignoring the filter
    pub fn total_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn source_row(&self, view_row: usize) -> Option<usize> {
        self.filtered_indices.get(view_row).copied()
    }

    pub fn view_row(&self, view_row: usize) -> Option<&Row> {
        self.source_row(view_row).and_then(|idx| self.rows.get(idx))
    }

    pub fn cell(&self, view_row: usize, col: usize) -> Option<&Value> {
        self.view_row(view_row).and_then(|row| row.get(col))
    }

    /// Filtered rows with their source indices
    pub fn visible_rows(&self) -> impl Iterator<Item = (usize, &Row)> + '_ {
        self.filtered_indices
            .iter()
            .filter_map(|&idx| self.rows.get(idx).map(|row| (idx, row)))
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        column_position(&self.columns, name)
    }

    pub fn filter_info(&self) -> FilterInfo {
        let total_rows = self.rows.len();
        let filtered_rows = self.filtered_indices.len();
        let match_percentage = if total_rows == 0 {
            0.0
        } else {
            filtered_rows as f64 * 100.0 / total_rows as f64
        };
        FilterInfo {
            total_rows,
            filtered_rows,
            filter_active: !self.filter.is_empty(),
            match_percentage,
        }
    }

    /// A row of NULLs matching the column layout
    pub fn blank_row(&self) -> Row {
        vec![Value::Null; self.columns.len()]
    }

    /// Append a row and mark it new. The row is padded or truncated to the
    /// column count. Returns its index.
    pub fn insert_row(&mut self, mut row: Row) -> usize {
        row.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
        let index = self.rows.len() - 1;
        self.changes.mark_new(index);
        self.refilter();
        index
    }

    /// Remove a row. Returns `false` if the index is out of range.
    pub fn delete_row(&mut self, row: usize) -> bool {
        if row >= self.rows.len() {
            return false;
        }
        let removed = self.rows.remove(row);
        self.changes.record_delete(row, removed);
        self.refilter();
        true
    }

    /// Overwrite one cell. Returns `false` if the row or column is out of range.
    ///
    /// The filtered view is left as is until the next structural change or
    /// [`set_filter`](Self::set_filter), so an edited row does not vanish
    /// from under the cursor.
    pub fn set_cell(&mut self, row: usize, col: usize, value: Value) -> bool {
        if col >= self.columns.len() {
            return false;
        }
        let Some(cell) = self.rows.get_mut(row).and_then(|r| r.get_mut(col)) else {
            return false;
        };
        let previous = std::mem::replace(cell, value.clone());
        self.changes.record_edit(row, col, previous, value);
        true
    }

    /// Forget pending changes after they were written to the store
    pub(crate) fn mark_submitted(&mut self) {
        self.changes.clear();
    }

    fn refilter(&mut self) {
        let bound = BoundFilter::bind(&self.filter, &self.columns);
        if !bound.unknown_columns().is_empty() {
            tracing::debug!(
                table_name = %self.table_name,
                unknown = ?bound.unknown_columns(),
                "filter references unknown columns"
            );
        }
        self.filtered_indices = self
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| bound.matches(row))
            .map(|(idx, _)| idx)
            .collect();
    }
}
