//! Parameter objects for the iDigBio search and summary endpoints.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{MediaQuery, RecordQuery, Validate, ValidationError};

/// Largest `limit` or `count` the iDigBio API accepts.
pub const MAX_LIMIT: u32 = 5000;

/// Records returned when the request does not say how many.
pub const DEFAULT_RECORDS_LIMIT: u32 = 100;

/// Unique values counted by a summary when the request does not say how many.
pub const DEFAULT_SUMMARY_COUNT: u32 = 10;

/// Field a summary breaks counts down by when the request does not say.
pub const DEFAULT_TOP_FIELD: &str = "scientificname";

fn check_bound(name: &str, value: u32) -> Result<(), ValidationError> {
    if (1..=MAX_LIMIT).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::retryable(format!(
            "{name} must be between 1 and {MAX_LIMIT}, got {value}"
        )))
    }
}

/// Parameters for `/v2/search/records`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct RecordsSearchParams {
    /// Search criteria for species occurrence records in iDigBio.
    pub rq: RecordQuery,
    /// The maximum number of records to return.
    #[serde(default = "default_records_limit")]
    #[schemars(range(min = 1, max = 5000))]
    pub limit: Option<u32>,
}

#[allow(clippy::unnecessary_wraps)]
fn default_records_limit() -> Option<u32> {
    Some(DEFAULT_RECORDS_LIMIT)
}

impl RecordsSearchParams {
    /// Search for records matching `rq` with the default limit.
    #[must_use]
    pub fn new(rq: RecordQuery) -> Self {
        Self {
            rq,
            limit: default_records_limit(),
        }
    }

    /// Apply taxonomic casing rules to the query.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.rq = self.rq.normalize_casing();
        self
    }
}

impl Validate for RecordsSearchParams {
    fn validate(&self) -> Result<(), ValidationError> {
        if let Some(limit) = self.limit {
            check_bound("limit", limit)?;
        }
        self.rq.validate()
    }
}

/// Parameters for `/v2/search/media`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct MediaSearchParams {
    /// Search criteria for media and media records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mq: Option<MediaQuery>,
    /// Search criteria for species occurrence records. Only use this when the
    /// request names taxa or collection-event details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rq: Option<RecordQuery>,
    /// The maximum number of records to return.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl MediaSearchParams {
    /// Apply casing rules and drop query objects with no criteria.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            mq: self.mq.filter(|mq| !mq.is_empty()),
            rq: self
                .rq
                .map(RecordQuery::normalize_casing)
                .filter(|rq| !rq.is_empty()),
            limit: self.limit,
        }
    }
}

impl Validate for MediaSearchParams {
    fn validate(&self) -> Result<(), ValidationError> {
        if let Some(limit) = self.limit {
            check_bound("limit", limit)?;
        }
        self.mq.validate()?;
        self.rq.validate()
    }
}

/// Parameters for `/v2/summary/top/records`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SummaryParams {
    /// The field to break down record counts by, e.g. "country" to find the
    /// countries with the most matching records. Only one field may be given.
    #[serde(default = "default_top_fields")]
    pub top_fields: String,
    /// The maximum number of unique values to report counts for. To count
    /// every unique value, use the maximum.
    #[serde(default = "default_summary_count")]
    #[schemars(range(min = 1, max = 5000))]
    pub count: Option<u32>,
    /// Search criteria for species occurrence records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rq: Option<RecordQuery>,
}

fn default_top_fields() -> String {
    DEFAULT_TOP_FIELD.to_string()
}

#[allow(clippy::unnecessary_wraps)]
fn default_summary_count() -> Option<u32> {
    Some(DEFAULT_SUMMARY_COUNT)
}

impl Default for SummaryParams {
    fn default() -> Self {
        Self {
            top_fields: default_top_fields(),
            count: default_summary_count(),
            rq: None,
        }
    }
}

impl SummaryParams {
    /// Fields iDigBio only aggregates through their keyword sub-field.
    const KEYWORD_FIELDS: [&'static str; 3] = ["collector", "locality", "highertaxon"];

    /// Apply casing rules, drop an empty `rq`, and point text fields at their
    /// keyword index.
    #[must_use]
    pub fn normalized(self) -> Self {
        let top_fields = self.top_fields.trim();
        let top_fields = if Self::KEYWORD_FIELDS.contains(&top_fields) {
            format!("{top_fields}.keyword")
        } else {
            top_fields.to_string()
        };
        Self {
            top_fields,
            count: self.count,
            rq: self
                .rq
                .map(RecordQuery::normalize_casing)
                .filter(|rq| !rq.is_empty()),
        }
    }
}

impl Validate for SummaryParams {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.top_fields.trim().is_empty() {
            return Err(ValidationError::retryable("top_fields must name a field"));
        }
        if let Some(count) = self.count {
            check_bound("count", count)?;
        }
        self.rq.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{MediaType, StringTerm};
    use serde_json::json;

    #[test]
    fn test_records_params_default_limit() {
        let params: RecordsSearchParams =
            serde_json::from_value(json!({"rq": {"genus": "Ursus"}})).unwrap();
        assert_eq!(params.limit, Some(DEFAULT_RECORDS_LIMIT));
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_records_params_require_rq() {
        let result: Result<RecordsSearchParams, _> = serde_json::from_value(json!({"limit": 5}));
        assert!(result.is_err());
    }

    #[test]
    fn test_limit_bounds() {
        let mut params = RecordsSearchParams::new(RecordQuery::default());
        params.limit = Some(0);
        assert!(params.validate().is_err());
        params.limit = Some(5001);
        assert!(params.validate().is_err());
        params.limit = Some(5000);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_media_params_normalized_drops_empty_rq() {
        let params = MediaSearchParams {
            mq: Some(MediaQuery::of_type(MediaType::Sounds)),
            rq: Some(RecordQuery::default()),
            limit: None,
        }
        .normalized();
        assert!(params.rq.is_none());
        assert!(params.mq.is_some());
        assert_eq!(
            serde_json::to_value(&params).unwrap(),
            json!({"mq": {"mediatype": "sounds"}})
        );
    }

    #[test]
    fn test_media_params_normalized_fixes_casing() {
        let params = MediaSearchParams {
            mq: None,
            rq: Some(RecordQuery {
                genus: Some(StringTerm::from("HOMO")),
                specificepithet: Some(StringTerm::from("SAPIENS")),
                ..Default::default()
            }),
            limit: Some(10),
        }
        .normalized();
        assert_eq!(
            serde_json::to_value(params.rq).unwrap(),
            json!({"genus": "Homo", "specificepithet": "sapiens"})
        );
    }

    #[test]
    fn test_summary_defaults() {
        let params: SummaryParams = serde_json::from_value(json!({})).unwrap();
        assert_eq!(params, SummaryParams::default());
        assert_eq!(params.top_fields, "scientificname");
        assert_eq!(params.count, Some(10));
    }

    #[test]
    fn test_summary_field_order() {
        let params = SummaryParams {
            top_fields: "scientificname".to_string(),
            count: Some(5000),
            rq: Some(RecordQuery {
                class_: Some(StringTerm::from("Aves")),
                ..Default::default()
            }),
        };
        let value = serde_json::to_value(&params).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["top_fields", "count", "rq"]);
    }

    #[test]
    fn test_summary_keyword_fields() {
        for field in ["collector", "locality", "highertaxon"] {
            let params = SummaryParams {
                top_fields: field.to_string(),
                ..Default::default()
            }
            .normalized();
            assert_eq!(params.top_fields, format!("{field}.keyword"));
        }

        let params = SummaryParams {
            top_fields: "country".to_string(),
            ..Default::default()
        }
        .normalized();
        assert_eq!(params.top_fields, "country");
    }

    #[test]
    fn test_summary_validation() {
        let params = SummaryParams {
            top_fields: " ".to_string(),
            ..Default::default()
        };
        assert!(params.validate().is_err());

        let params = SummaryParams {
            count: Some(0),
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }
}
