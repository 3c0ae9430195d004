//! Tably Services Layer
//!
//! This crate wires the engine crates into the surface a host application
//! (a desktop table browser, a CLI, a test harness) talks to.
//!
//! # Architecture
//!
//! ```text
//! Host / UI layer
//!     ↓
//! Service Layer (tably-services) ← This crate
//!     ↓
//! Engine (tably-table, tably-filter, tably-cache, tably-monitor)
//!     ↓
//! Infrastructure (tably-core, BackingStore implementations)
//! ```
//!
//! # Services
//!
//! - [`TableBrowser`] - Load, filter, edit and save cycles over one table
//! - [`PaginationPlanner`] - Page sizes derived from table size
//! - [`SqlStore`] - `BackingStore` over any [`SqlConnection`]
//! - [`MemoryStore`] - Columnar in-memory `BackingStore`
//! - [`EngineSettings`] - Persisted engine configuration
//! - [`logging`] - `tracing` subscriber setup for hosts
//!
//! # Design Principles
//!
//! 1. **No UI dependencies** - Hosts subscribe to row and schema events
//! 2. **Return view models** - The browser hands out DTOs, not engine internals
//! 3. **One execution context** - Engine state is mutated through `&mut self` only

mod error;
pub mod logging;
mod memory_store;
mod pagination;
mod settings;
mod sql_store;
mod table_browser;
mod view_models;

pub use error::{ServiceError, ServiceResult};
pub use memory_store::MemoryStore;
pub use pagination::PaginationPlanner;
pub use settings::{CacheSettings, EngineSettings, MonitorSettings, PaginationSettings};
pub use sql_store::{SqlConnection, SqlRows, SqlStore};
pub use table_browser::{FetchRequest, FetchedTable, TableBrowser, fetch_table};
pub use view_models::{FilterValidation, TableData};

// Engine types hosts need alongside the browser
pub use tably_cache::{CacheConfig, CacheEntry, CacheStats};
pub use tably_monitor::{MonitorConfig, OperationCategory, OperationSpeed, PerformanceSummary};
pub use tably_table::{FilterInfo, ReconcileError, RowsChanged, SubmitReport, SubscriptionId};
