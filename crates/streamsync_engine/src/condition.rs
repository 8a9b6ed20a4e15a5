//! Condition expression parsing.
//!
//! A rule condition is a flat boolean expression over document fields:
//!
//! ```text
//! doc.company == "ACME" and doc.docstatus != 2
//! ```
//!
//! Clauses are joined by a single logical operator. If ` or ` appears
//! anywhere, the whole expression is split on ` or ` and every clause goes to
//! the OR-group; otherwise it is split on ` and ` into the conjunctive
//! filters. Mixed expressions therefore land entirely in the OR-group. That
//! routing is kept as-is and reported through [`ConditionDiagnostic::MixedOperators`].
//!
//! The `doc.` prefix is stripped from the field position of each clause only.
//! Values keep any `doc.` text they contain, so `doc.remarks == "see doc.1"`
//! filters on `see doc.1`, and the trailing text of a mixed-operator clause
//! such as `1 and doc.b == 2` is kept verbatim.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;
use streamsync_protocol::{FieldValue, FilterSet, Predicate};

const OR_SEPARATOR: &str = " or ";
const AND_SEPARATOR: &str = " and ";

static CLAUSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(?:doc\.)?(\w+)\s*(==|!=)\s*["']?([^"']+)["']?"#)
        .expect("clause pattern is valid")
});

/// A problem found while parsing a condition. Parsing never fails; problems
/// are collected so operators can see which parts were not applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionDiagnostic {
    /// Clause does not match `<field> (==|!=) <value>` and was not applied.
    UnrecognizedClause {
        /// The clause text after trimming.
        clause: String,
    },
    /// Expression mixes ` and ` with ` or `; every clause was routed to the
    /// OR-group.
    MixedOperators,
}

impl fmt::Display for ConditionDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionDiagnostic::UnrecognizedClause { clause } => {
                write!(f, "unrecognized clause {clause:?} ignored")
            }
            ConditionDiagnostic::MixedOperators => {
                write!(f, "mixed and/or expression treated as an or-group")
            }
        }
    }
}

/// Result of parsing a condition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedCondition {
    /// Filters built from the recognized clauses.
    pub filters: FilterSet,
    /// Problems encountered.
    pub diagnostics: Vec<ConditionDiagnostic>,
}

impl ParsedCondition {
    /// Returns true if every clause was applied as written.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Parses a rule condition into filters.
///
/// Empty or absent input yields empty filters and no diagnostics.
pub fn parse_condition(condition: Option<&str>) -> ParsedCondition {
    let mut parsed = ParsedCondition::default();

    let condition = match condition.map(str::trim) {
        Some(c) if !c.is_empty() => c,
        _ => return parsed,
    };

    let (clauses, use_or) = if condition.contains(OR_SEPARATOR) {
        if condition.contains(AND_SEPARATOR) {
            parsed.diagnostics.push(ConditionDiagnostic::MixedOperators);
        }
        (condition.split(OR_SEPARATOR), true)
    } else {
        (condition.split(AND_SEPARATOR), false)
    };

    for clause in clauses.map(str::trim) {
        match parse_clause(clause) {
            Some((field, predicate)) => {
                let target = if use_or {
                    &mut parsed.filters.or_filters
                } else {
                    &mut parsed.filters.filters
                };
                target.insert(field, predicate);
            }
            None => parsed.diagnostics.push(ConditionDiagnostic::UnrecognizedClause {
                clause: clause.to_string(),
            }),
        }
    }

    for diagnostic in &parsed.diagnostics {
        tracing::warn!(condition, %diagnostic, "condition not fully applied");
    }

    parsed
}

fn parse_clause(clause: &str) -> Option<(String, Predicate)> {
    let caps = CLAUSE_RE.captures(clause)?;
    let field = caps.get(1)?.as_str().to_string();
    let value = FieldValue::coerce(caps.get(3)?.as_str());
    let predicate = match caps.get(2)?.as_str() {
        "==" => Predicate::Eq(value),
        _ => Predicate::Ne(value),
    };
    Some((field, predicate))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(condition: &str) -> ParsedCondition {
        parse_condition(Some(condition))
    }

    #[test]
    fn empty_condition() {
        assert_eq!(parse_condition(None), ParsedCondition::default());
        assert_eq!(parse("   "), ParsedCondition::default());
    }

    #[test]
    fn and_clauses_go_to_filters() {
        let parsed = parse(r#"doc.company == "ACME" and doc.status != 'Cancelled'"#);
        assert!(parsed.is_clean());
        assert!(parsed.filters.or_filters.is_empty());
        assert_eq!(
            parsed.filters.filters.get("company"),
            Some(&Predicate::Eq("ACME".into()))
        );
        assert_eq!(
            parsed.filters.filters.get("status"),
            Some(&Predicate::Ne("Cancelled".into()))
        );
    }

    #[test]
    fn or_clauses_go_to_or_filters() {
        let parsed = parse(r#"doc.territory == "East" or doc.territory_group == "Asia""#);
        assert!(parsed.is_clean());
        assert!(parsed.filters.filters.is_empty());
        assert_eq!(parsed.filters.or_filters.len(), 2);
    }

    #[test]
    fn mixed_operators_route_to_or_group() {
        let parsed = parse("doc.a == 1 and doc.b == 2 or doc.c == 3");
        assert!(parsed.filters.filters.is_empty());
        assert_eq!(
            parsed.diagnostics.first(),
            Some(&ConditionDiagnostic::MixedOperators)
        );
        // "doc.a == 1 and doc.b == 2" is one or-clause; the regex keeps the
        // leading comparison and the value runs to the end of the clause.
        assert_eq!(
            parsed.filters.or_filters.get("a"),
            Some(&Predicate::Eq("1 and doc.b == 2".into()))
        );
        assert_eq!(
            parsed.filters.or_filters.get("c"),
            Some(&Predicate::Eq(FieldValue::Int(3)))
        );
    }

    #[test]
    fn numeric_values_are_coerced() {
        let parsed = parse("doc.docstatus == 1 and doc.code == 'A1'");
        assert_eq!(
            parsed.filters.filters.get("docstatus"),
            Some(&Predicate::Eq(FieldValue::Int(1)))
        );
        assert_eq!(
            parsed.filters.filters.get("code"),
            Some(&Predicate::Eq(FieldValue::Str("A1".into())))
        );

        let parsed = parse(r#"doc.qty == "42""#);
        assert_eq!(
            parsed.filters.filters.get("qty"),
            Some(&Predicate::Eq(FieldValue::Int(42)))
        );
    }

    #[test]
    fn unrecognized_clauses_are_reported() {
        let parsed = parse("doc.a == 1 and doc.b > 2 and garbage");
        assert_eq!(parsed.filters.filters.len(), 1);
        assert_eq!(
            parsed.diagnostics,
            vec![
                ConditionDiagnostic::UnrecognizedClause {
                    clause: "doc.b > 2".into()
                },
                ConditionDiagnostic::UnrecognizedClause {
                    clause: "garbage".into()
                },
            ]
        );
    }

    #[test]
    fn prefix_is_optional() {
        let parsed = parse("company=='ACME'");
        assert!(parsed.is_clean());
        assert_eq!(
            parsed.filters.filters.get("company"),
            Some(&Predicate::Eq("ACME".into()))
        );
    }

    #[test]
    fn later_clause_wins_for_same_field() {
        let parsed = parse("doc.a == 1 and doc.a != 2");
        assert_eq!(parsed.filters.filters.len(), 1);
        assert_eq!(
            parsed.filters.filters.get("a"),
            Some(&Predicate::Ne(FieldValue::Int(2)))
        );
    }
}
