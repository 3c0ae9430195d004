//! Tably Table - The editable in-memory view of one loaded table
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                TableSnapshot                 │
//! │  columns · rows · filter · filtered_indices  │
//! │                     │                        │
//! │                 ChangeSet                    │
//! │   new rows · deleted rows · modified cells   │
//! └──────────────────────┬───────────────────────┘
//!                        │ plan / submit_all
//!                        ▼
//!                 ┌──────────────┐
//!                 │ BackingStore │
//!                 └──────────────┘
//! ```
//!
//! Edits are applied to the snapshot immediately and recorded in its
//! [`ChangeSet`]. [`submit_all`] replays them against the store as one
//! mutation per row: deletes first, then updates, then inserts. Submission is
//! not atomic. Statements applied before a store failure stay applied.

mod changes;
mod events;
mod reconcile;
mod snapshot;

pub use changes::{CellChange, ChangeSet};
pub use events::{RowsChanged, SubscriptionId, TableEvents};
pub use reconcile::{ReconcileError, SubmitReport, plan, submit_all};
pub use snapshot::{FilterInfo, TableSnapshot};
