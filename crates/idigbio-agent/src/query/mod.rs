//! Typed iDigBio query objects.
//!
//! iDigBio searches take two JSON filter objects:
//!
//! - **`rq`** (record query): filters species occurrence records by taxonomy,
//!   collection event, location and record metadata.
//! - **`mq`** (media query): filters media records such as images and audio.
//!
//! Each field accepts a small family of value shapes (a plain value, a list of
//! alternatives, a date range, or an existence test), modelled here by the
//! term types in [`terms`]. The parameter objects in [`params`] wrap the query
//! objects for each API endpoint.
//!
//! All types derive [`schemars::JsonSchema`] so the same definitions drive the
//! structured output requested from the language model.

mod geo;
mod media;
mod params;
mod records;
mod terms;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use geo::{Coordinate, GeoPoint};
pub use media::{MediaQuery, MediaType};
pub use params::{
    MediaSearchParams, RecordsSearchParams, SummaryParams, DEFAULT_RECORDS_LIMIT,
    DEFAULT_SUMMARY_COUNT, DEFAULT_TOP_FIELD, MAX_LIMIT,
};
pub use records::RecordQuery;
pub use terms::{DateRange, DateTerm, Existence, ExistenceKind, FloatTerm, IntTerm, StringTerm};

/// A problem with generated query parameters.
///
/// Terminal errors describe values that no amount of regeneration will fix
/// (for example, coordinates outside the globe); retryable errors can be fed
/// back to the generator for another attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ValidationError {
    /// Human-readable description of the problem.
    pub message: String,
    /// Whether retrying generation is pointless.
    pub terminal: bool,
}

impl ValidationError {
    /// Create an error that generation may recover from.
    #[must_use]
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            terminal: false,
        }
    }

    /// Create an error that should stop generation immediately.
    #[must_use]
    pub fn terminal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            terminal: true,
        }
    }
}

/// Structural checks beyond what deserialization enforces.
pub trait Validate {
    /// Check the value, returning the first problem found.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] describing the first invalid value.
    fn validate(&self) -> Result<(), ValidationError>;
}

impl<T: Validate> Validate for Option<T> {
    fn validate(&self) -> Result<(), ValidationError> {
        self.as_ref().map_or(Ok(()), Validate::validate)
    }
}

/// Capitalize the first letter and lowercase the rest, as genus names are written.
#[must_use]
pub fn capitalize(value: &str) -> String {
    let lower = value.trim().to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_constructors() {
        let err = ValidationError::retryable("try again");
        assert!(!err.terminal);
        assert_eq!(err.to_string(), "try again");

        let err = ValidationError::terminal("give up");
        assert!(err.terminal);
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("homo"), "Homo");
        assert_eq!(capitalize("HOMO"), "Homo");
        assert_eq!(capitalize(" rattus "), "Rattus");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_option_validate() {
        let none: Option<Coordinate> = None;
        assert!(none.validate().is_ok());

        let bad = Some(Coordinate { lat: 91.0, lon: 0.0 });
        assert!(bad.validate().is_err());
    }
}
