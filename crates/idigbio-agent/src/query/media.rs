//! The iDigBio media query format (`mq`).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{DateTerm, IntTerm, StringTerm, Validate, ValidationError};

/// Kind of media attached to a media record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    /// Photographs, scans and other still images.
    Images,
    /// Audio recordings.
    Sounds,
}

impl MediaType {
    /// Name as used in queries.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Images => "images",
            Self::Sounds => "sounds",
        }
    }
}

/// Search criteria for media records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct MediaQuery {
    /// URI where the media file itself can be downloaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accessuri: Option<StringTerm>,
    /// The "datemodified" field of the original media record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datemodified: Option<DateTerm>,
    /// Hash of the media record's content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<StringTerm>,
    /// URL of the logo image for the media record's license.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub licenselogourl: Option<StringTerm>,
    /// Whether to look for images or sounds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mediatype: Option<MediaType>,
    /// Last time the media record or iDigBio's metadata about it changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTerm>,
    /// Provider identifiers of records associated with the media record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recordids: Option<StringTerm>,
    /// UUIDs of occurrence records associated with the media record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub records: Option<StringTerm>,
    /// The record set the media record belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recordset: Option<StringTerm>,
    /// Rights statement or license the media is published under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rights: Option<StringTerm>,
    /// Identifier used by iDigBio for the media record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<StringTerm>,
    /// Number of times iDigBio has updated the media record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<IntTerm>,
}

impl MediaQuery {
    /// A query matching every media record of one type.
    #[must_use]
    pub fn of_type(mediatype: MediaType) -> Self {
        Self {
            mediatype: Some(mediatype),
            ..Default::default()
        }
    }

    /// Check whether the query has no usable criteria.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        serde_json::to_value(self)
            .map(|value| crate::urls::sanitize_json(&value).is_none())
            .unwrap_or(true)
    }
}

impl Validate for MediaQuery {
    fn validate(&self) -> Result<(), ValidationError> {
        self.datemodified.validate()?;
        self.modified.validate()
    }
}
