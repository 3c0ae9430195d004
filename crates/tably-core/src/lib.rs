//! Tably Core - Core abstractions shared by every Tably crate
//!
//! This crate provides the fundamental traits and types the engine is built on:
//!
//! - `BackingStore` - The narrow contract a table store must implement
//! - `Mutation` / `RowMatch` - Store-agnostic INSERT/UPDATE/DELETE descriptions
//! - `Clock` - Injected time source (system or manual)
//! - `ColumnEditor` - Per-column input parsing for the presentation boundary
//! - Common types like `Value`, `Row`, `ColumnDescriptor`

mod clock;
mod editor;
mod error;
mod mutation;
mod store;
mod types;

pub use clock::*;
pub use editor::*;
pub use error::*;
pub use mutation::*;
pub use store::*;
pub use types::*;
