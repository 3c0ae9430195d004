//! Table browsing controller
//!
//! Wires the cache, planner, snapshot, reconciliation and monitor into the
//! load / filter / edit / save cycle a host drives.

use crate::error::{ServiceError, ServiceResult};
use crate::settings::EngineSettings;
use crate::view_models::{FilterValidation, TableData};
use crate::PaginationPlanner;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tably_cache::{AdaptiveCache, CacheEntry, CacheStats};
use tably_core::{BackingStore, Clock, ColumnDescriptor, ColumnEditor, Row, SystemClock, Value};
use tably_filter::{BoundFilter, parse_detailed};
use tably_monitor::{OperationCategory, OperationSpeed, OperationTimer, PerformanceMonitor, PerformanceSummary};
use tably_table::{FilterInfo, RowsChanged, SubmitReport, SubscriptionId, TableEvents, TableSnapshot};

/// A load to run, possibly off the engine's context.
///
/// Obtained from [`TableBrowser::begin_fetch`]; the generation ties the
/// result back to the request so superseded loads can be dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub generation: u64,
    pub table_name: String,
    pub page: usize,
    /// `None` lets the row count decide
    pub page_size: Option<usize>,
}

/// Result of [`fetch_table`], applied with [`TableBrowser::apply_fetched`]
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedTable {
    pub generation: u64,
    pub table_name: String,
    pub columns: Vec<ColumnDescriptor>,
    pub rows: Vec<Row>,
    pub total_count: u64,
    pub page: usize,
    pub page_size: usize,
    pub elapsed: Duration,
}

/// Read one page of a table: describe, count, then select, one call at a
/// time. Touches no engine state, so it may run on any task.
#[tracing::instrument(
    skip(store, request),
    fields(table_name = %request.table_name, page = request.page, generation = request.generation)
)]
pub async fn fetch_table(store: &dyn BackingStore, request: FetchRequest) -> tably_core::Result<FetchedTable> {
    let started = Instant::now();

    let columns = store.describe_table(&request.table_name).await?;
    let total_count = store.count_rows(&request.table_name).await?;
    let page_size = request
        .page_size
        .unwrap_or_else(|| PaginationPlanner::page_size_for(total_count));
    let offset = PaginationPlanner::page_offset(request.page, page_size);
    let rows = store.select_all(&request.table_name, page_size, offset).await?;

    tracing::debug!(rows = rows.len(), total_count, page_size, "table page fetched");

    Ok(FetchedTable {
        generation: request.generation,
        table_name: request.table_name,
        columns,
        rows,
        total_count,
        page: request.page,
        page_size,
        elapsed: started.elapsed(),
    })
}

/// Controller for browsing and editing one table at a time.
///
/// All state lives here and is mutated through `&mut self`, so the browser
/// must stay on one execution context. Loads performed elsewhere come back
/// through [`apply_fetched`](Self::apply_fetched).
///
/// Row indices taken by the editing methods are source-row indices of the
/// loaded page; map a view row with [`TableSnapshot::source_row`] first.
pub struct TableBrowser {
    store: Arc<dyn BackingStore>,
    cache: AdaptiveCache,
    planner: PaginationPlanner,
    monitor: PerformanceMonitor,
    events: TableEvents,
    snapshot: Option<TableSnapshot>,
    page: usize,
    page_size: usize,
    generation: u64,
}

impl std::fmt::Debug for TableBrowser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableBrowser")
            .field("store", &self.store.name())
            .field("table", &self.table_name())
            .field("page", &self.page)
            .field("page_size", &self.page_size)
            .field("generation", &self.generation)
            .field("cache", &self.cache)
            .finish()
    }
}

impl TableBrowser {
    pub fn new(store: Arc<dyn BackingStore>, settings: &EngineSettings) -> Self {
        Self::with_clock(store, settings, Arc::new(SystemClock))
    }

    /// Create a browser whose cache and monitor read time from `clock`
    pub fn with_clock(store: Arc<dyn BackingStore>, settings: &EngineSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            cache: AdaptiveCache::new(settings.cache_config(), clock.clone()),
            planner: settings.pagination_planner(),
            monitor: PerformanceMonitor::new(settings.monitor_config(), clock),
            events: TableEvents::new(),
            snapshot: None,
            page: 0,
            page_size: PaginationPlanner::page_size_for(0),
            generation: 0,
        }
    }

    // ============ Accessors ============

    pub fn store(&self) -> &Arc<dyn BackingStore> {
        &self.store
    }

    pub fn snapshot(&self) -> Option<&TableSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn table_name(&self) -> Option<&str> {
        self.snapshot.as_ref().map(TableSnapshot::table_name)
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn page_count(&self) -> usize {
        let total = self.snapshot.as_ref().map_or(0, TableSnapshot::total_count);
        PaginationPlanner::page_count(total, self.page_size)
    }

    /// Generation of the most recent load request
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_dirty(&self) -> bool {
        self.snapshot.as_ref().is_some_and(TableSnapshot::is_dirty)
    }

    pub fn planner(&self) -> &PaginationPlanner {
        &self.planner
    }

    pub fn monitor(&self) -> &PerformanceMonitor {
        &self.monitor
    }

    // ============ Loading ============

    /// Start a load of `table_name`. Any load started earlier becomes stale.
    pub fn begin_fetch(&mut self, table_name: &str, page: usize) -> FetchRequest {
        self.generation += 1;
        let same_table = self.table_name() == Some(table_name);
        FetchRequest {
            generation: self.generation,
            table_name: table_name.to_string(),
            page,
            page_size: (same_table && page > 0).then_some(self.page_size),
        }
    }

    /// Load the first page of a table, from the cache when a fresh entry
    /// exists. Unsaved edits of the current snapshot are discarded.
    pub async fn load(&mut self, table_name: &str) -> ServiceResult<TableData> {
        let timer = OperationTimer::start(format!("cache lookup {}", table_name), OperationCategory::Cache);
        let cached = self.cache.get(table_name);
        self.monitor.finish(timer, None);

        if let Some(entry) = cached {
            // A cache hit supersedes any load still in flight
            self.generation += 1;
            let page_size = PaginationPlanner::page_size_for(entry.row_count);
            let snapshot =
                TableSnapshot::new(entry.table_name, entry.columns, entry.rows).with_total_count(entry.row_count);
            self.install(snapshot, 0, page_size);
            return self.table_data(true);
        }

        self.fetch_and_apply(table_name, 0).await
    }

    /// Load another page of the current table. Pages are never cached.
    pub async fn load_page(&mut self, page: usize) -> ServiceResult<TableData> {
        let table_name = self.table_name().ok_or(ServiceError::NoTableLoaded)?.to_string();
        let page_count = self.page_count();
        if page >= page_count {
            return Err(ServiceError::OutOfRange(format!(
                "page {} of '{}' (has {} page(s))",
                page, table_name, page_count
            )));
        }
        self.fetch_and_apply(&table_name, page).await
    }

    /// Drop the cached copy of the current table and fetch the current page
    /// again.
    pub async fn reload(&mut self) -> ServiceResult<TableData> {
        let table_name = self.table_name().ok_or(ServiceError::NoTableLoaded)?.to_string();
        self.cache.invalidate(&table_name);
        self.fetch_and_apply(&table_name, self.page).await
    }

    /// Install the result of a load. Returns `false` (and changes nothing)
    /// if a newer load was started after this one.
    pub fn apply_fetched(&mut self, fetched: FetchedTable) -> bool {
        if fetched.generation != self.generation {
            tracing::debug!(
                table_name = %fetched.table_name,
                generation = fetched.generation,
                current = self.generation,
                "discarding stale load"
            );
            return false;
        }

        self.monitor
            .record_slow_query(&format!("load {}", fetched.table_name), fetched.elapsed, None);
        self.planner.plan(&fetched.table_name, fetched.total_count);

        if fetched.page == 0 {
            self.cache.set(
                &fetched.table_name,
                fetched.columns.clone(),
                fetched.rows.clone(),
                fetched.total_count,
            );
        }

        let snapshot = TableSnapshot::new(fetched.table_name, fetched.columns, fetched.rows)
            .with_total_count(fetched.total_count);
        self.install(snapshot, fetched.page, fetched.page_size);
        true
    }

    async fn fetch_and_apply(&mut self, table_name: &str, page: usize) -> ServiceResult<TableData> {
        let request = self.begin_fetch(table_name, page);
        let timer = OperationTimer::start(format!("load {}", table_name), OperationCategory::Query);

        match fetch_table(self.store.as_ref(), request).await {
            Ok(fetched) => {
                self.apply_fetched(fetched);
                self.table_data(false)
            }
            Err(e) => {
                let message = e.to_string();
                tracing::error!(table_name = %table_name, error = %message, "table load failed");
                self.monitor.finish(timer, Some(&message));
                Err(ServiceError::LoadFailed(message))
            }
        }
    }

    /// Replace the snapshot, carrying the filter over when the same table is
    /// reloaded.
    fn install(&mut self, mut snapshot: TableSnapshot, page: usize, page_size: usize) {
        let mut schema_changed = true;
        if let Some(previous) = &self.snapshot {
            if previous.is_dirty() {
                tracing::warn!(
                    table_name = %previous.table_name(),
                    discarded = previous.changes().change_count(),
                    "discarding unsaved changes"
                );
            }
            schema_changed = previous.columns() != snapshot.columns();
            if previous.table_name() == snapshot.table_name() && !previous.filter_text().is_empty() {
                snapshot.set_filter(previous.filter_text());
            }
        }

        self.page = page;
        self.page_size = page_size;
        let row_count = snapshot.row_count();
        let snapshot = self.snapshot.insert(snapshot);

        if schema_changed {
            self.events.emit_schema_changed(snapshot.columns());
        }
        self.events.emit_rows_changed(&RowsChanged::Reset { row_count });
    }

    fn table_data(&self, from_cache: bool) -> ServiceResult<TableData> {
        let snapshot = self.snapshot.as_ref().ok_or(ServiceError::NoTableLoaded)?;
        Ok(TableData {
            table_name: snapshot.table_name().to_string(),
            columns: snapshot.columns().to_vec(),
            rows: snapshot.rows().to_vec(),
            total_count: snapshot.total_count(),
            from_cache,
            page: self.page,
            page_size: self.page_size,
        })
    }

    pub async fn list_tables(&self) -> ServiceResult<Vec<String>> {
        self.store
            .list_tables()
            .await
            .map_err(|e| ServiceError::TableOperationFailed(e.to_string()))
    }

    // ============ Filtering ============

    /// Apply filter text to the loaded rows. Returns whether the visible rows
    /// changed; `false` when no table is loaded.
    pub fn set_filter(&mut self, text: &str) -> bool {
        let Some(snapshot) = self.snapshot.as_mut() else {
            return false;
        };

        let timer = OperationTimer::start(format!("filter {}", snapshot.table_name()), OperationCategory::Filter);
        let changed = snapshot.set_filter(text);
        let row_count = snapshot.row_count();
        self.monitor.finish(timer, None);

        if changed {
            self.events.emit_rows_changed(&RowsChanged::Reset { row_count });
        }
        changed
    }

    pub fn filter_info(&self) -> FilterInfo {
        self.snapshot
            .as_ref()
            .map(TableSnapshot::filter_info)
            .unwrap_or_default()
    }

    /// Dry-run `text` against the loaded rows without applying it
    pub fn validate_filter_syntax(&self, text: &str) -> FilterValidation {
        if text.trim().is_empty() {
            return FilterValidation::valid("Empty filter matches every row");
        }

        let outcome = parse_detailed(text);
        if let Some(reason) = outcome.fallback {
            return FilterValidation::invalid(format!(
                "{}; the text will be searched for in every column",
                reason
            ));
        }

        let Some(snapshot) = &self.snapshot else {
            return FilterValidation::valid("Filter syntax is valid");
        };

        let bound = BoundFilter::bind(&outcome.filter, snapshot.columns());
        if !bound.unknown_columns().is_empty() {
            return FilterValidation::invalid(format!("Unknown column(s): {}", bound.unknown_columns().join(", ")));
        }
        if !bound.invalid_patterns().is_empty() {
            return FilterValidation::invalid(format!(
                "Invalid regular expression(s): {}",
                bound.invalid_patterns().join(", ")
            ));
        }

        let matched = snapshot.rows().iter().filter(|row| bound.matches(row)).count();
        FilterValidation::valid(format!("Filter matches {} of {} rows", matched, snapshot.total_rows()))
    }

    // ============ Editing ============

    /// Append a blank row and return its index
    pub fn insert_row(&mut self) -> ServiceResult<usize> {
        let blank = self
            .snapshot
            .as_ref()
            .ok_or(ServiceError::NoTableLoaded)?
            .blank_row();
        self.insert_row_with(blank)
    }

    /// Append a row with initial values and return its index
    pub fn insert_row_with(&mut self, row: Row) -> ServiceResult<usize> {
        let snapshot = self.snapshot.as_mut().ok_or(ServiceError::NoTableLoaded)?;
        let row = snapshot.insert_row(row);
        self.events.emit_rows_changed(&RowsChanged::Inserted { row });
        Ok(row)
    }

    pub fn delete_row(&mut self, row: usize) -> bool {
        let deleted = self.snapshot.as_mut().is_some_and(|s| s.delete_row(row));
        if deleted {
            self.events.emit_rows_changed(&RowsChanged::Removed { row });
        }
        deleted
    }

    pub fn set_cell(&mut self, row: usize, col: usize, value: Value) -> bool {
        let updated = self.snapshot.as_mut().is_some_and(|s| s.set_cell(row, col, value));
        if updated {
            self.events.emit_rows_changed(&RowsChanged::CellUpdated { row, col });
        }
        updated
    }

    /// Set a cell from user-typed text, parsed by the column's editor
    pub fn set_cell_text(&mut self, row: usize, col: usize, text: &str) -> bool {
        let Some(column) = self.snapshot.as_ref().and_then(|s| s.columns().get(col)) else {
            return false;
        };
        let value = ColumnEditor::from_declared_type(&column.declared_type).parse_input(text);
        self.set_cell(row, col, value)
    }

    /// Write pending edits to the store, then invalidate the cached copy and
    /// reload.
    ///
    /// Not atomic: if the store rejects a statement, the ones before it stay
    /// applied and the edits are kept for another attempt. A failed reload
    /// after a successful submit is logged and does not fail the call.
    pub async fn submit_all(&mut self) -> ServiceResult<SubmitReport> {
        let snapshot = self.snapshot.as_mut().ok_or(ServiceError::NoTableLoaded)?;
        if !snapshot.is_dirty() {
            return Ok(SubmitReport::default());
        }

        let table_name = snapshot.table_name().to_string();
        let timer = OperationTimer::start(format!("submit {}", table_name), OperationCategory::Mutation);

        let report = match tably_table::submit_all(self.store.as_ref(), snapshot).await {
            Ok(report) => {
                self.monitor.finish(timer, None);
                report
            }
            Err(e) => {
                self.monitor.finish(timer, Some(&e.to_string()));
                return Err(e.into());
            }
        };

        self.cache.invalidate(&table_name);
        if let Err(e) = self.reload().await {
            tracing::error!(table_name = %table_name, error = %e, "reload after submit failed");
        }

        Ok(report)
    }

    // ============ Cache ============

    pub fn cache_get(&mut self, table_name: &str) -> Option<CacheEntry> {
        self.cache.get(table_name)
    }

    pub fn cache_set(&mut self, table_name: &str, columns: Vec<ColumnDescriptor>, rows: Vec<Row>, row_count: u64) -> bool {
        self.cache.set(table_name, columns, rows, row_count)
    }

    pub fn cache_invalidate(&mut self, table_name: &str) -> bool {
        self.cache.invalidate(table_name)
    }

    pub fn cache_clear(&mut self) {
        self.cache.clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    // ============ Performance ============

    pub fn record_slow_query(&mut self, label: &str, duration: Duration, error: Option<&str>) -> OperationSpeed {
        self.monitor.record_slow_query(label, duration, error)
    }

    /// Write the performance log as JSON. Returns the number of records.
    pub fn export_performance_log(&self, path: impl AsRef<Path>) -> ServiceResult<usize> {
        self.monitor
            .export_to_file(path)
            .map_err(|e| ServiceError::ExportFailed(e.to_string()))
    }

    pub fn clear_performance_log(&mut self) {
        self.monitor.clear();
    }

    pub fn performance_summary(&self) -> PerformanceSummary {
        self.monitor.summary()
    }

    // ============ Events ============

    pub fn subscribe(
        &mut self,
        on_rows_changed: impl FnMut(&RowsChanged) + Send + 'static,
        on_schema_changed: impl FnMut(&[ColumnDescriptor]) + Send + 'static,
    ) -> SubscriptionId {
        self.events.subscribe(on_rows_changed, on_schema_changed)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }
}
