//! Documents as returned by a store.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Primary identifier field.
pub const NAME_FIELD: &str = "name";
/// Back-reference to the document this one amends.
pub const AMENDED_FROM_FIELD: &str = "amended_from";
/// Workflow status field (`1` = submitted).
pub const DOCSTATUS_FIELD: &str = "docstatus";
/// Last-modified timestamp field.
pub const MODIFIED_FIELD: &str = "modified";

/// `docstatus` value for submitted documents.
pub const DOCSTATUS_SUBMITTED: i64 = 1;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
];

/// A document: field name → JSON value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a record with only a `name`.
    pub fn named(name: impl Into<String>) -> Self {
        Self::new().with(NAME_FIELD, Value::String(name.into()))
    }

    /// Sets a field.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    /// Builder form of [`Record::set`].
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    /// Returns a field value.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Returns a field as text. Numbers are rendered; null and empty strings
    /// count as absent.
    pub fn get_str(&self, field: &str) -> Option<String> {
        match self.0.get(field)? {
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// The document's primary identifier.
    pub fn name(&self) -> Option<String> {
        self.get_str(NAME_FIELD)
    }

    /// The identifier of the document this one amends, if any.
    pub fn amended_from(&self) -> Option<String> {
        self.get_str(AMENDED_FROM_FIELD)
    }

    /// Workflow status, if present.
    pub fn docstatus(&self) -> Option<i64> {
        match self.0.get(DOCSTATUS_FIELD)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Parsed last-modified timestamp. `None` when missing or unparseable.
    pub fn modified(&self) -> Option<NaiveDateTime> {
        self.get_str(MODIFIED_FIELD)
            .and_then(|raw| parse_timestamp(&raw))
    }

    /// Returns a copy restricted to the given fields (all fields when empty).
    pub fn project(&self, fields: &[String]) -> Record {
        if fields.is_empty() {
            return self.clone();
        }
        Record(
            fields
                .iter()
                .filter_map(|f| self.0.get(f).map(|v| (f.clone(), v.clone())))
                .collect(),
        )
    }

    /// Iterates fields in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Parses a store timestamp.
///
/// Accepts `YYYY-MM-DD HH:MM:SS[.ffffff]`, the `T`-separated form, RFC 3339
/// and a bare date (midnight).
///
/// Naive timestamps are taken to be UTC. RFC 3339 values are converted to
/// UTC before the offset is dropped, so both forms compare on one clock.
/// Stores writing naive local time must do so in UTC for `modified`
/// comparisons to hold.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    for format in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(ts);
        }
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.naive_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
