//! Performance monitoring module
//!
//! Times engine operations (loads, submissions, cache lookups, filter scans)
//! and keeps the ones slower than their category threshold.

mod monitor;
mod record;

#[cfg(test)]
mod tests;

pub use monitor::*;
pub use record::*;
