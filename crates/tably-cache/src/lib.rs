//! Tably Cache - Recently loaded tables kept for quick reselection
//!
//! The cache is an explicit service object owned by the controller. It holds
//! full copies of loaded tables, trusts them for a fixed TTL measured on an
//! injected [`Clock`](tably_core::Clock), and skips tables too large to be
//! worth keeping.

mod adaptive;

pub use adaptive::*;
