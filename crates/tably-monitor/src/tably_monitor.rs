//! Tably Monitor - Operation timing for the table engine
//!
//! This crate provides:
//! - Speed classification of timed operations
//! - A bounded log of operations that exceeded their threshold
//! - Aggregate summaries and JSON export of that log

pub mod performance;

pub use performance::*;
