//! Row predicate evaluation
//!
//! Evaluation never fails. A predicate on an unknown column is false, an
//! invalid regular expression matches nothing, and comparisons fall back from
//! numeric to string ordering when a side is not a number.

use crate::ast::{ConditionGroup, Filter, Operand, Predicate, PredicateKind};
use regex::{Regex, RegexBuilder};
use std::cmp::Ordering;
use tably_core::{ColumnDescriptor, Value, column_position};

/// Evaluate one predicate against one row
pub fn evaluate(row: &[Value], columns: &[ColumnDescriptor], predicate: &Predicate) -> bool {
    BoundPredicate::bind(predicate, columns).matches(row)
}

/// AND of every predicate in the group
pub fn evaluate_group(row: &[Value], columns: &[ColumnDescriptor], group: &ConditionGroup) -> bool {
    group
        .predicates
        .iter()
        .all(|predicate| evaluate(row, columns, predicate))
}

/// OR of every group; the empty filter matches
pub fn evaluate_filter(row: &[Value], columns: &[ColumnDescriptor], filter: &Filter) -> bool {
    filter.is_empty()
        || filter
            .groups
            .iter()
            .any(|group| evaluate_group(row, columns, group))
}

/// A filter with column names resolved and patterns compiled for one column
/// layout. Bind once, then call [`BoundFilter::matches`] for every row.
#[derive(Debug, Clone)]
pub struct BoundFilter {
    groups: Vec<Vec<BoundPredicate>>,
    unknown_columns: Vec<String>,
    invalid_patterns: Vec<String>,
}

impl BoundFilter {
    pub fn bind(filter: &Filter, columns: &[ColumnDescriptor]) -> Self {
        let mut unknown_columns: Vec<String> = Vec::new();
        let mut invalid_patterns: Vec<String> = Vec::new();

        let groups = filter
            .groups
            .iter()
            .map(|group| {
                group
                    .predicates
                    .iter()
                    .map(|predicate| {
                        let bound = BoundPredicate::bind(predicate, columns);
                        if let (Target::Missing, Some(name)) = (&bound.target, &predicate.column) {
                            if !unknown_columns.contains(name) {
                                unknown_columns.push(name.clone());
                            }
                        }
                        if let (Test::Regexp(None), Operand::Text(pattern)) =
                            (&bound.test, &predicate.operand)
                        {
                            invalid_patterns.push(pattern.clone());
                        }
                        bound
                    })
                    .collect()
            })
            .collect();

        Self {
            groups,
            unknown_columns,
            invalid_patterns,
        }
    }

    pub fn matches(&self, row: &[Value]) -> bool {
        self.groups.is_empty()
            || self
                .groups
                .iter()
                .any(|group| group.iter().all(|predicate| predicate.matches(row)))
    }

    /// Column names the filter mentions that the layout does not have
    pub fn unknown_columns(&self) -> &[String] {
        &self.unknown_columns
    }

    /// REGEXP patterns that failed to compile
    pub fn invalid_patterns(&self) -> &[String] {
        &self.invalid_patterns
    }
}

#[derive(Debug, Clone)]
enum Target {
    Column(usize),
    AnyColumn,
    Missing,
}

#[derive(Debug, Clone, Copy)]
enum LikeMode {
    Contains,
    Prefix,
    Suffix,
}

/// Right-hand side of a comparison. Integer literals keep their exact value
/// so ids above 2^53 do not collapse onto their neighbours as `f64`.
#[derive(Debug, Clone)]
struct Comparand {
    text: String,
    integer: Option<i64>,
    number: Option<f64>,
}

impl Comparand {
    fn new(text: &str) -> Self {
        let trimmed = text.trim();
        Self {
            text: text.to_string(),
            integer: trimmed.parse::<i64>().ok(),
            number: trimmed.parse::<f64>().ok(),
        }
    }

    fn numeric_cmp(&self, cell: &Value) -> Option<Ordering> {
        match (exact_integer(cell), self.integer) {
            (Some(lhs), Some(rhs)) => Some(lhs.cmp(&rhs)),
            _ => cell.as_f64().zip(self.number).and_then(|(lhs, rhs)| lhs.partial_cmp(&rhs)),
        }
    }
}

/// Integer value of a cell, leaving booleans to text comparison
fn exact_integer(cell: &Value) -> Option<i64> {
    match cell {
        Value::Bool(_) => None,
        other => other.as_i64(),
    }
}

#[derive(Debug, Clone)]
enum Test {
    Equals(Comparand),
    NotEquals(Comparand),
    Like { needle: String, mode: LikeMode },
    Compare { wanted: fn(Ordering) -> bool, rhs: Comparand },
    In(Vec<String>),
    Between(Option<(f64, f64)>),
    Regexp(Option<Regex>),
    Never,
}

#[derive(Debug, Clone)]
struct BoundPredicate {
    target: Target,
    test: Test,
}

impl BoundPredicate {
    fn bind(predicate: &Predicate, columns: &[ColumnDescriptor]) -> Self {
        let target = match &predicate.column {
            None => Target::AnyColumn,
            Some(name) => column_position(columns, name)
                .map(Target::Column)
                .unwrap_or(Target::Missing),
        };
        Self {
            target,
            test: compile_test(predicate),
        }
    }

    fn matches(&self, row: &[Value]) -> bool {
        match self.target {
            Target::Missing => false,
            Target::Column(idx) => row.get(idx).is_some_and(|cell| self.test.accepts(cell)),
            Target::AnyColumn => row.iter().any(|cell| self.test.accepts(cell)),
        }
    }
}

fn compile_test(predicate: &Predicate) -> Test {
    let text = predicate.operand.as_text();
    let list = predicate.operand.as_list();

    match (predicate.kind, text, list) {
        (PredicateKind::Equals, Some(t), _) => Test::Equals(Comparand::new(t)),
        (PredicateKind::NotEquals, Some(t), _) => Test::NotEquals(Comparand::new(t)),
        (PredicateKind::Like, Some(t), _) => compile_like(t),
        (PredicateKind::Greater, Some(t), _) => Test::Compare {
            wanted: Ordering::is_gt,
            rhs: Comparand::new(t),
        },
        (PredicateKind::GreaterEqual, Some(t), _) => Test::Compare {
            wanted: Ordering::is_ge,
            rhs: Comparand::new(t),
        },
        (PredicateKind::Less, Some(t), _) => Test::Compare {
            wanted: Ordering::is_lt,
            rhs: Comparand::new(t),
        },
        (PredicateKind::LessEqual, Some(t), _) => Test::Compare {
            wanted: Ordering::is_le,
            rhs: Comparand::new(t),
        },
        (PredicateKind::In, _, Some(items)) => Test::In(items.to_vec()),
        (PredicateKind::In, Some(t), _) => Test::In(vec![t.to_string()]),
        (PredicateKind::Between, _, Some([low, high])) => Test::Between(
            low.trim()
                .parse::<f64>()
                .ok()
                .zip(high.trim().parse::<f64>().ok()),
        ),
        (PredicateKind::Regexp, Some(pattern), _) => Test::Regexp(
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .ok(),
        ),
        _ => Test::Never,
    }
}

/// `%x%` and `x` are substring tests, `x%` a prefix test, `%x` a suffix test.
fn compile_like(pattern: &str) -> Test {
    let lowered = pattern.to_lowercase();
    let leading = lowered.starts_with('%');
    let body = if leading { &lowered[1..] } else { lowered.as_str() };
    let trailing = body.ends_with('%');
    let body = if trailing { &body[..body.len() - 1] } else { body };

    let mode = match (leading, trailing) {
        (false, true) => LikeMode::Prefix,
        (true, false) => LikeMode::Suffix,
        _ => LikeMode::Contains,
    };
    Test::Like {
        needle: body.to_string(),
        mode,
    }
}

impl Test {
    fn accepts(&self, cell: &Value) -> bool {
        match self {
            Test::Equals(rhs) => equals(cell, rhs),
            Test::NotEquals(rhs) => !equals(cell, rhs),
            Test::Like { needle, mode } => {
                let haystack = cell.filter_text().to_lowercase();
                match mode {
                    LikeMode::Contains => haystack.contains(needle.as_str()),
                    LikeMode::Prefix => haystack.starts_with(needle.as_str()),
                    LikeMode::Suffix => haystack.ends_with(needle.as_str()),
                }
            }
            Test::Compare { wanted, rhs } => {
                let ordering = match (cell.as_f64(), rhs.number) {
                    (Some(_), Some(_)) => rhs.numeric_cmp(cell),
                    _ => Some(Ord::cmp(&*cell.filter_text(), rhs.text.as_str())),
                };
                ordering.is_some_and(|o| wanted(o))
            }
            Test::In(items) => {
                let text = cell.filter_text();
                items.iter().any(|item| item.as_str() == &*text)
            }
            Test::Between(bounds) => match (bounds, cell.as_f64()) {
                (Some((low, high)), Some(x)) => *low <= x && x <= *high,
                _ => false,
            },
            Test::Regexp(regex) => regex
                .as_ref()
                .is_some_and(|re| re.is_match(&cell.filter_text())),
            Test::Never => false,
        }
    }
}

fn equals(cell: &Value, rhs: &Comparand) -> bool {
    match (cell.as_f64(), rhs.number) {
        (Some(_), Some(_)) => rhs.numeric_cmp(cell) == Some(Ordering::Equal),
        _ => cell.filter_text() == rhs.text.as_str(),
    }
}
