//! Adaptive table cache

mod cache;

#[cfg(test)]
mod tests;

pub use cache::*;
