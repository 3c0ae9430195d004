//! Filter syntax tree

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredicateKind {
    Equals,
    NotEquals,
    Like,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    In,
    Between,
    Regexp,
}

impl PredicateKind {
    /// Canonical operator spelling
    pub fn symbol(&self) -> &'static str {
        match self {
            PredicateKind::Equals => "=",
            PredicateKind::NotEquals => "!=",
            PredicateKind::Like => "LIKE",
            PredicateKind::Greater => ">",
            PredicateKind::GreaterEqual => ">=",
            PredicateKind::Less => "<",
            PredicateKind::LessEqual => "<=",
            PredicateKind::In => "IN",
            PredicateKind::Between => "BETWEEN",
            PredicateKind::Regexp => "REGEXP",
        }
    }
}

/// Right-hand side of a predicate, with quotes already stripped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Text(String),
    /// `IN` members, or the `[low, high]` pair of a `BETWEEN`
    List(Vec<String>),
}

impl Operand {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Operand::Text(s) => Some(s),
            Operand::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Operand::Text(_) => None,
            Operand::List(items) => Some(items),
        }
    }
}

/// One atomic condition, e.g. `qty >= 5`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub kind: PredicateKind,
    /// `None` means "any column"
    pub column: Option<String>,
    pub operand: Operand,
}

impl Predicate {
    pub fn new(kind: PredicateKind, column: impl Into<String>, operand: Operand) -> Self {
        Self {
            kind,
            column: Some(column.into()),
            operand,
        }
    }

    /// Substring search across every cell of a row
    pub fn any_column_like(text: impl Into<String>) -> Self {
        Self {
            kind: PredicateKind::Like,
            column: None,
            operand: Operand::Text(text.into()),
        }
    }

    pub fn is_column_scoped(&self) -> bool {
        self.column.is_some()
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(column) = &self.column else {
            return match &self.operand {
                Operand::Text(text) => write!(f, "{}", text),
                Operand::List(items) => write!(f, "{}", items.join(" ")),
            };
        };
        match (&self.kind, &self.operand) {
            (PredicateKind::In, Operand::List(items)) => {
                write!(f, "{} IN ({})", column, items.join(", "))
            }
            (PredicateKind::Between, Operand::List(items)) if items.len() == 2 => {
                write!(f, "{} BETWEEN {} AND {}", column, items[0], items[1])
            }
            (kind, Operand::Text(text)) => {
                write!(f, "{} {} \"{}\"", column, kind.symbol(), text)
            }
            (kind, Operand::List(items)) => {
                write!(f, "{} {} ({})", column, kind.symbol(), items.join(", "))
            }
        }
    }
}

/// Predicates AND-ed together
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionGroup {
    pub predicates: Vec<Predicate>,
}

impl ConditionGroup {
    pub fn new(predicates: Vec<Predicate>) -> Self {
        Self { predicates }
    }
}

/// Condition groups OR-ed together. The empty filter matches every row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub groups: Vec<ConditionGroup>,
}

impl Filter {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(groups: Vec<ConditionGroup>) -> Self {
        Self { groups }
    }

    /// A filter holding a single predicate
    pub fn single(predicate: Predicate) -> Self {
        Self {
            groups: vec![ConditionGroup::new(vec![predicate])],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn predicates(&self) -> impl Iterator<Item = &Predicate> {
        self.groups.iter().flat_map(|g| g.predicates.iter())
    }

    /// Column names mentioned by column-scoped predicates, in first-use order
    pub fn referenced_columns(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for column in self.predicates().filter_map(|p| p.column.as_deref()) {
            if !seen.contains(&column) {
                seen.push(column);
            }
        }
        seen
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (gi, group) in self.groups.iter().enumerate() {
            if gi > 0 {
                write!(f, " OR ")?;
            }
            for (pi, predicate) in group.predicates.iter().enumerate() {
                if pi > 0 {
                    write!(f, " AND ")?;
                }
                write!(f, "{}", predicate)?;
            }
        }
        Ok(())
    }
}
