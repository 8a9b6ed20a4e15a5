//! Property-based test generators using proptest.
//!
//! Provides strategies for rule conditions whose expected parse result is
//! known up front.

use proptest::prelude::*;
use streamsync_protocol::{FieldValue, Filters, Predicate};

/// One generated `field op value` clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    /// Field name.
    pub field: String,
    /// True for `!=`.
    pub negated: bool,
    /// Raw value token.
    pub value: String,
    /// Whether the field carries the `doc.` prefix.
    pub prefixed: bool,
    /// Whether the value is wrapped in double quotes.
    pub quoted: bool,
}

impl Clause {
    /// Renders the clause as condition text.
    pub fn render(&self) -> String {
        let prefix = if self.prefixed { "doc." } else { "" };
        let op = if self.negated { "!=" } else { "==" };
        if self.quoted {
            format!("{prefix}{} {op} \"{}\"", self.field, self.value)
        } else {
            format!("{prefix}{} {op} {}", self.field, self.value)
        }
    }

    /// The predicate the clause should parse to.
    pub fn expected_predicate(&self) -> Predicate {
        let value = FieldValue::coerce(&self.value);
        if self.negated {
            Predicate::Ne(value)
        } else {
            Predicate::Eq(value)
        }
    }
}

/// A generated condition and its clauses.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// Clauses with distinct fields, in text order.
    pub clauses: Vec<Clause>,
    /// Condition text.
    pub text: String,
}

impl Condition {
    /// Filters the clauses should produce.
    pub fn expected_filters(&self) -> Filters {
        self.clauses
            .iter()
            .map(|c| (c.field.clone(), c.expected_predicate()))
            .collect()
    }
}

/// Strategy for field names (never an operator keyword).
pub fn field_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z_]{1,11}")
        .expect("Invalid regex")
        .prop_filter("Field name must not be a keyword", |s| {
            s != "and" && s != "or"
        })
}

/// Strategy for all-digit tokens that fit in an `i64`.
pub fn numeric_token_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[0-9]{1,18}").expect("Invalid regex")
}

/// Strategy for value tokens (text or numeric, no whitespace or quotes).
pub fn value_token_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::string::string_regex("[A-Za-z][A-Za-z0-9_-]{0,11}")
            .expect("Invalid regex")
            .prop_filter("Value must not be a keyword", |s| s != "and" && s != "or"),
        numeric_token_strategy(),
    ]
}

/// Strategy for a single clause.
pub fn clause_strategy() -> impl Strategy<Value = Clause> {
    (
        field_name_strategy(),
        any::<bool>(),
        value_token_strategy(),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(field, negated, value, prefixed, quoted)| Clause {
            field,
            negated,
            value,
            prefixed,
            quoted,
        })
}

fn distinct_clauses(min: usize, max: usize) -> impl Strategy<Value = Vec<Clause>> {
    prop::collection::vec(clause_strategy(), min..=max).prop_filter(
        "Clause fields must be distinct",
        |clauses| {
            let mut fields: Vec<&str> = clauses.iter().map(|c| c.field.as_str()).collect();
            fields.sort_unstable();
            fields.dedup();
            fields.len() == clauses.len()
        },
    )
}

fn join(clauses: &[Clause], separator: &str) -> String {
    clauses
        .iter()
        .map(Clause::render)
        .collect::<Vec<_>>()
        .join(separator)
}

/// Strategy for conditions joined only by ` and `.
pub fn and_condition_strategy() -> impl Strategy<Value = Condition> {
    distinct_clauses(1, 5).prop_map(|clauses| Condition {
        text: join(&clauses, " and "),
        clauses,
    })
}

/// Strategy for conditions joined only by ` or ` (at least two clauses).
pub fn or_condition_strategy() -> impl Strategy<Value = Condition> {
    distinct_clauses(2, 5).prop_map(|clauses| Condition {
        text: join(&clauses, " or "),
        clauses,
    })
}

/// Strategy for conditions mixing ` and ` and ` or `.
///
/// The condition is two or more ` or ` segments; the returned inner clause
/// is joined to the first segment with ` and `. `clauses` lists the
/// segments only, so their fields are the ones expected in the OR-group.
pub fn mixed_condition_strategy() -> impl Strategy<Value = (Condition, Clause)> {
    (distinct_clauses(2, 4), clause_strategy()).prop_map(|(clauses, inner)| {
        let text = format!("{} and {}", clauses[0].render(), inner.render());
        let rest = join(&clauses[1..], " or ");
        (
            Condition {
                text: format!("{text} or {rest}"),
                clauses,
            },
            inner,
        )
    })
}
