//! Filter text parser
//!
//! Grammar (informal):
//!
//! ```text
//! filter  := group (" OR " group)*
//! group   := clause (" AND " clause)*
//! clause  := column op value
//!          | column " IN (" value ("," value)* ")"
//!          | column " BETWEEN " value " AND " value
//!          | free-text                     -- substring search, any column
//! op      := LIKE | >= | <= | != | <> | REGEXP | ~ | = | > | <
//! ```
//!
//! Separators and operators inside single or double quotes are ignored, and
//! quotes around columns and values are stripped. A quote only opens a quoted
//! span at the start of a token (start of text, or after whitespace, `(`, `,`
//! or an operator character). Elsewhere it is literal, so `name = O'Brien AND
//! qty = 1` still splits into two clauses.
//!
//! Symbolic operators need no surrounding spaces (`qty=0`). The flip side is
//! that a bare search containing one of them, such as `page=2`, parses as a
//! comparison on a column named `page` rather than a substring search. When
//! no such column exists it matches nothing; quote the text (`'page=2'`) to
//! search for it literally.

use crate::ast::{ConditionGroup, Filter, Operand, Predicate, PredicateKind};

/// Result of parsing with diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOutcome {
    pub filter: Filter,
    /// Why the text degraded to a substring search, if it did
    pub fallback: Option<String>,
}

impl ParseOutcome {
    pub fn is_fallback(&self) -> bool {
        self.fallback.is_some()
    }
}

/// Operator tokens in match priority order. Two-character operators come
/// before their one-character prefixes so `>=` never parses as `>`.
/// Keyword operators must be surrounded by whitespace.
const OPERATORS: &[(&str, PredicateKind)] = &[
    (" LIKE ", PredicateKind::Like),
    (">=", PredicateKind::GreaterEqual),
    ("<=", PredicateKind::LessEqual),
    ("!=", PredicateKind::NotEquals),
    ("<>", PredicateKind::NotEquals),
    (" REGEXP ", PredicateKind::Regexp),
    ("~", PredicateKind::Regexp),
    (" BETWEEN ", PredicateKind::Between),
    (" IN (", PredicateKind::In),
    ("=", PredicateKind::Equals),
    (">", PredicateKind::Greater),
    ("<", PredicateKind::Less),
];

/// Parse filter text. Never fails: see [`parse_detailed`].
pub fn parse(text: &str) -> Filter {
    parse_detailed(text).filter
}

/// Parse filter text, reporting whether it fell back to a substring search.
///
/// Blank text yields the empty filter. Structurally broken text (an operator
/// with no column, an unterminated `IN (` list, a `BETWEEN` without both
/// bounds, an empty clause) degrades to a single any-column LIKE over the
/// whole text.
pub fn parse_detailed(text: &str) -> ParseOutcome {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return ParseOutcome {
            filter: Filter::empty(),
            fallback: None,
        };
    }

    match parse_structured(trimmed) {
        Ok(filter) => ParseOutcome {
            filter,
            fallback: None,
        },
        Err(reason) => {
            tracing::debug!(filter = %trimmed, reason = %reason, "filter text degraded to substring search");
            ParseOutcome {
                filter: Filter::single(Predicate::any_column_like(trimmed)),
                fallback: Some(reason),
            }
        }
    }
}

fn parse_structured(text: &str) -> Result<Filter, String> {
    let mut groups = Vec::new();
    for group_text in split_outside_quotes(text, " OR ") {
        let predicates = group_clauses(group_text)?
            .iter()
            .map(|clause| parse_clause(clause))
            .collect::<Result<Vec<_>, _>>()?;
        groups.push(ConditionGroup::new(predicates));
    }
    Ok(Filter::new(groups))
}

/// Split a group on `AND`, re-attaching the upper bound of a `BETWEEN`.
fn group_clauses(group: &str) -> Result<Vec<String>, String> {
    let mut clauses = Vec::new();
    let mut pieces = split_outside_quotes(group, " AND ").into_iter();

    while let Some(piece) = pieces.next() {
        let mut clause = piece.trim().to_string();
        if clause.is_empty() {
            return Err("empty condition".to_string());
        }
        if matches!(find_operator(&clause), Some((_, _, PredicateKind::Between))) {
            if let Some(upper) = pieces.next() {
                clause = format!("{} AND {}", clause, upper.trim());
            }
        }
        clauses.push(clause);
    }

    Ok(clauses)
}

fn parse_clause(clause: &str) -> Result<Predicate, String> {
    let Some((start, end, kind)) = find_operator(clause) else {
        return Ok(Predicate::any_column_like(strip_quotes(clause.trim())));
    };

    let column = strip_quotes(clause[..start].trim());
    if column.is_empty() {
        return Err(format!("missing column before '{}'", kind.symbol()));
    }
    let rest = clause[end..].trim();

    let operand = match kind {
        PredicateKind::In => {
            let inner = rest
                .strip_suffix(')')
                .ok_or_else(|| format!("unterminated IN list for column '{}'", column))?;
            let mut members = Vec::new();
            for member in split_outside_quotes(inner, ",") {
                let member = member.trim();
                if member.is_empty() {
                    return Err(format!("empty IN list member for column '{}'", column));
                }
                members.push(strip_quotes(member).to_string());
            }
            Operand::List(members)
        }
        PredicateKind::Between => {
            let bounds = split_outside_quotes(rest, " AND ");
            match bounds.as_slice() {
                [low, high] if !low.trim().is_empty() && !high.trim().is_empty() => Operand::List(vec![
                    strip_quotes(low.trim()).to_string(),
                    strip_quotes(high.trim()).to_string(),
                ]),
                _ => {
                    return Err(format!(
                        "BETWEEN on column '{}' needs 'low AND high'",
                        column
                    ));
                }
            }
        }
        _ => {
            if rest.is_empty() {
                return Err(format!("missing value after '{}'", kind.symbol()));
            }
            Operand::Text(strip_quotes(rest).to_string())
        }
    };

    Ok(Predicate::new(kind, column, operand))
}

/// Leftmost operator outside quotes: `(token_start, token_end, kind)`.
fn find_operator(clause: &str) -> Option<(usize, usize, PredicateKind)> {
    let bytes = clause.as_bytes();
    let mut quote: Option<u8> = None;

    for i in 0..bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == q {
                quote = None;
            }
            continue;
        }
        if opens_quote(bytes, i) {
            quote = Some(b);
            continue;
        }
        let rest = &bytes[i..];
        for (token, kind) in OPERATORS {
            if rest.starts_with(token.as_bytes()) {
                return Some((i, i + token.len(), *kind));
            }
        }
    }

    None
}

/// Split on an ASCII separator, ignoring occurrences inside quotes.
fn split_outside_quotes<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let bytes = text.as_bytes();
    let sep = separator.as_bytes();
    let mut parts = Vec::new();
    let mut quote: Option<u8> = None;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        if opens_quote(bytes, i) {
            quote = Some(b);
            i += 1;
            continue;
        }
        if bytes[i..].starts_with(sep) {
            parts.push(&text[start..i]);
            i += sep.len();
            start = i;
            continue;
        }
        i += 1;
    }

    parts.push(&text[start..]);
    parts
}

/// Whether the quote character at `i` starts a quoted token
fn opens_quote(bytes: &[u8], i: usize) -> bool {
    matches!(bytes[i], b'\'' | b'"')
        && (i == 0
            || bytes[i - 1].is_ascii_whitespace()
            || matches!(bytes[i - 1], b'(' | b',' | b'=' | b'<' | b'>' | b'!' | b'~'))
}

fn strip_quotes(s: &str) -> &str {
    let bytes = s.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        if (first == b'"' || first == b'\'') && bytes[bytes.len() - 1] == first {
            return &s[1..s.len() - 1];
        }
    }
    s
}

#[cfg(test)]
mod split_tests {
    use super::*;

    #[test]
    fn split_ignores_quoted_separators() {
        assert_eq!(
            split_outside_quotes("a = 'x AND y' AND b = 2", " AND "),
            vec!["a = 'x AND y'", "b = 2"]
        );
    }

    #[test]
    fn operator_search_skips_quoted_text() {
        let (start, _, kind) = find_operator("\"a>b\" = 1").unwrap();
        assert_eq!(start, 6);
        assert_eq!(kind, PredicateKind::Equals);
    }

    #[test]
    fn mid_word_apostrophe_is_literal() {
        assert_eq!(
            split_outside_quotes("name = O'Brien AND qty = 1", " AND "),
            vec!["name = O'Brien", "qty = 1"]
        );
        assert_eq!(split_outside_quotes("it's OR qty = 0", " OR "), vec!["it's", "qty = 0"]);
        assert_eq!(split_outside_quotes("'a,b',c'd,e", ","), vec!["'a,b'", "c'd", "e"]);
    }

    #[test]
    fn quote_after_operator_opens_a_span() {
        assert_eq!(
            split_outside_quotes("name='x AND y' AND qty = 1", " AND "),
            vec!["name='x AND y'", "qty = 1"]
        );
        let (start, _, kind) = find_operator("don't = 1").unwrap();
        assert_eq!(start, 6);
        assert_eq!(kind, PredicateKind::Equals);
    }

    #[test]
    fn strip_quotes_requires_matching_pair() {
        assert_eq!(strip_quotes("'abc'"), "abc");
        assert_eq!(strip_quotes("\"abc\""), "abc");
        assert_eq!(strip_quotes("'abc\""), "'abc\"");
        assert_eq!(strip_quotes("'"), "'");
    }
}
