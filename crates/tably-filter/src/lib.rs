//! Tably Filter - the filter-bar language
//!
//! A filter is typed by the user as free text, e.g.
//! `name LIKE "%an%" AND qty >= 5 OR status IN (open, pending)`.
//!
//! - [`parse`] turns text into a [`Filter`] (never fails; malformed text
//!   degrades to a substring search over every column)
//! - [`BoundFilter`] resolves column names once and evaluates rows
//! - [`evaluate`], [`evaluate_group`], [`evaluate_filter`] are one-shot helpers

mod ast;
mod evaluator;
mod parser;


pub use ast::{ConditionGroup, Filter, Operand, Predicate, PredicateKind};
pub use evaluator::{BoundFilter, evaluate, evaluate_filter, evaluate_group};
pub use parser::{ParseOutcome, parse, parse_detailed};
