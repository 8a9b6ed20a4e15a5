//! Query filters shared by producer and consumer stores.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// A scalar value used on the right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Integer value (all-digit tokens are coerced to this).
    Int(i64),
    /// Text value.
    Str(String),
}

impl FieldValue {
    /// Coerces a raw token: all ASCII digits become an integer, anything
    /// else stays text.
    pub fn coerce(token: &str) -> Self {
        if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(n) = token.parse::<i64>() {
                return FieldValue::Int(n);
            }
        }
        FieldValue::Str(token.to_string())
    }

    /// Returns true if this value equals the given JSON value.
    ///
    /// Integers also match numeric strings and strings also match numbers
    /// with the same textual form, since stores disagree on how they
    /// serialize numeric fields.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (FieldValue::Int(n), Value::Number(num)) => num.as_i64() == Some(*n),
            (FieldValue::Int(n), Value::String(s)) => s.parse::<i64>().ok() == Some(*n),
            (FieldValue::Int(n), Value::Bool(b)) => i64::from(*b) == *n,
            (FieldValue::Str(s), Value::String(v)) => s == v,
            (FieldValue::Str(s), Value::Number(num)) => num.to_string() == *s,
            _ => false,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Int(n) => write!(f, "{n}"),
            FieldValue::Str(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Str(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Str(value)
    }
}

/// A single-field predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum Predicate {
    /// Field equals the value.
    Eq(FieldValue),
    /// Field differs from the value (unset fields also differ).
    Ne(FieldValue),
    /// Field is present and non-empty.
    IsSet,
    /// Field is absent, null or empty.
    IsNotSet,
}

impl Predicate {
    /// Evaluates the predicate against a field value (`None` when the record
    /// does not carry the field).
    pub fn evaluate(&self, value: Option<&Value>) -> bool {
        match self {
            Predicate::Eq(expected) => value.is_some_and(|v| expected.matches(v)),
            Predicate::Ne(expected) => !value.is_some_and(|v| expected.matches(v)),
            Predicate::IsSet => is_set(value),
            Predicate::IsNotSet => !is_set(value),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Eq(v) => write!(f, "= {v}"),
            Predicate::Ne(v) => write!(f, "!= {v}"),
            Predicate::IsSet => write!(f, "is set"),
            Predicate::IsNotSet => write!(f, "is not set"),
        }
    }
}

fn is_set(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

/// Field name → predicate, ordered by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filters(BTreeMap<String, Predicate>);

impl Filters {
    /// Creates an empty filter map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the predicate for a field, replacing any previous one.
    pub fn insert(&mut self, field: impl Into<String>, predicate: Predicate) -> Option<Predicate> {
        self.0.insert(field.into(), predicate)
    }

    /// Builder form of [`Filters::insert`].
    pub fn with(mut self, field: impl Into<String>, predicate: Predicate) -> Self {
        self.insert(field, predicate);
        self
    }

    /// Removes the predicate for a field.
    pub fn remove(&mut self, field: &str) -> Option<Predicate> {
        self.0.remove(field)
    }

    /// Returns the predicate for a field.
    pub fn get(&self, field: &str) -> Option<&Predicate> {
        self.0.get(field)
    }

    /// Number of predicates.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no predicates.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates predicates in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Predicate)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// All predicates hold (an empty map matches everything).
    pub fn match_all(&self, lookup: impl Fn(&str) -> Option<Value>) -> bool {
        self.0
            .iter()
            .all(|(field, pred)| pred.evaluate(lookup(field).as_ref()))
    }

    /// At least one predicate holds (an empty map matches everything).
    pub fn match_any(&self, lookup: impl Fn(&str) -> Option<Value>) -> bool {
        self.0.is_empty()
            || self
                .0
                .iter()
                .any(|(field, pred)| pred.evaluate(lookup(field).as_ref()))
    }
}

impl FromIterator<(String, Predicate)> for Filters {
    fn from_iter<I: IntoIterator<Item = (String, Predicate)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Conjunctive filters plus an OR-group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSet {
    /// Every predicate must hold.
    pub filters: Filters,
    /// At least one predicate must hold (ignored when empty).
    pub or_filters: Filters,
}

impl FilterSet {
    /// Creates an empty filter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if neither group has predicates.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty() && self.or_filters.is_empty()
    }
}

/// A list query against a store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    /// Conjunctive filters.
    pub filters: Filters,
    /// OR-group.
    pub or_filters: Filters,
    /// Fields to return (empty returns every field).
    pub fields: Vec<String>,
}

impl ListQuery {
    /// Creates a query with the given conjunctive filters.
    pub fn new(filters: Filters) -> Self {
        Self {
            filters,
            or_filters: Filters::new(),
            fields: Vec::new(),
        }
    }

    /// Sets the OR-group.
    pub fn with_or_filters(mut self, or_filters: Filters) -> Self {
        self.or_filters = or_filters;
        self
    }

    /// Sets the fields to return.
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }
}
