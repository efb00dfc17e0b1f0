//! Value shapes accepted by iDigBio query fields.

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{Validate, ValidationError};

/// Kind of existence test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ExistenceKind {
    /// The field has a value.
    Exists,
    /// The field has no value.
    Missing,
}

/// Matches records by whether a field is present, e.g. `{"type": "exists"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Existence {
    /// Whether the field must be present or absent.
    #[serde(rename = "type")]
    pub kind: ExistenceKind,
}

impl Existence {
    /// `{"type": "exists"}`
    #[must_use]
    pub fn exists() -> Self {
        Self {
            kind: ExistenceKind::Exists,
        }
    }

    /// `{"type": "missing"}`
    #[must_use]
    pub fn missing() -> Self {
        Self {
            kind: ExistenceKind::Missing,
        }
    }
}

/// A text field filter.
///
/// A list of values matches records having any of them (OR semantics).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum StringTerm {
    /// Match a single value.
    One(String),
    /// Match any of several values.
    AnyOf(Vec<String>),
    /// Match on presence or absence of the field.
    Existence(Existence),
}

impl StringTerm {
    /// Whether this term carries no usable value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::One(value) => value.trim().is_empty(),
            Self::AnyOf(values) => values.iter().all(|v| v.trim().is_empty()),
            Self::Existence(_) => false,
        }
    }

    /// Rewrite every literal value, leaving existence tests untouched.
    #[must_use]
    pub fn map_values(self, f: impl Fn(&str) -> String) -> Self {
        match self {
            Self::One(value) => Self::One(f(&value)),
            Self::AnyOf(values) => Self::AnyOf(values.iter().map(|v| f(v)).collect()),
            existence @ Self::Existence(_) => existence,
        }
    }
}

impl From<&str> for StringTerm {
    fn from(value: &str) -> Self {
        Self::One(value.to_string())
    }
}

impl From<String> for StringTerm {
    fn from(value: String) -> Self {
        Self::One(value)
    }
}

impl From<Vec<String>> for StringTerm {
    fn from(values: Vec<String>) -> Self {
        Self::AnyOf(values)
    }
}

impl From<Existence> for StringTerm {
    fn from(existence: Existence) -> Self {
        Self::Existence(existence)
    }
}

/// Marker for the `"type": "range"` tag of a date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum RangeKind {
    /// The only accepted tag.
    #[default]
    Range,
}

/// An inclusive date range. Either bound may be left open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DateRange {
    /// Always `"range"`.
    #[serde(rename = "type")]
    pub kind: RangeKind,
    /// The start date of the range, e.g. "2024-01-01".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gte: Option<NaiveDate>,
    /// The end date of the range, e.g. "2024-02-01".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lte: Option<NaiveDate>,
}

impl DateRange {
    /// Build a range from optional bounds.
    #[must_use]
    pub fn new(gte: Option<NaiveDate>, lte: Option<NaiveDate>) -> Self {
        Self {
            kind: RangeKind::Range,
            gte,
            lte,
        }
    }
}

impl Validate for DateRange {
    fn validate(&self) -> Result<(), ValidationError> {
        match (self.gte, self.lte) {
            (None, None) => Err(ValidationError::retryable(
                "a date range needs at least one of gte or lte",
            )),
            (Some(gte), Some(lte)) if gte > lte => Err(ValidationError::retryable(format!(
                "date range start {gte} is after its end {lte}"
            ))),
            _ => Ok(()),
        }
    }
}

/// A date field filter (ISO 8601 dates).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum DateTerm {
    /// Match a single day.
    On(NaiveDate),
    /// Match days within a range.
    Range(DateRange),
    /// Match on presence or absence of the field.
    Existence(Existence),
}

impl Validate for DateTerm {
    fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Range(range) => range.validate(),
            Self::On(_) | Self::Existence(_) => Ok(()),
        }
    }
}

/// A numeric field filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum FloatTerm {
    /// Match an exact value.
    Value(f64),
    /// Match on presence or absence of the field.
    Existence(Existence),
}

impl Validate for FloatTerm {
    fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Value(value) if !value.is_finite() => Err(ValidationError::retryable(
                "numeric filters must be finite numbers",
            )),
            _ => Ok(()),
        }
    }
}

/// An integer field filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum IntTerm {
    /// Match an exact value.
    Value(i64),
    /// Match on presence or absence of the field.
    Existence(Existence),
}
