//! The iDigBio record query format (`rq`).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{capitalize, DateTerm, FloatTerm, GeoPoint, IntTerm, StringTerm, Validate, ValidationError};

/// Search criteria for species occurrence records.
///
/// Unset fields are omitted from the serialized query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct RecordQuery {
    /// Identifiers (e.g. GenBank accession numbers or URIs) for genetic sequence data linked to the specimen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub associatedsequences: Option<StringTerm>,
    /// Machine-readable barcode string printed on the physical specimen label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcodevalue: Option<StringTerm>,
    /// Specific nature of the record (e.g. PreservedSpecimen, HumanObservation, MaterialSample).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basisofrecord: Option<StringTerm>,
    /// Full name of the lithostratigraphic bed the material was collected from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bed: Option<StringTerm>,
    /// Latinized elements of a scientific name, without authorship.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonicalname: Option<StringTerm>,
    /// Identifier for the record within its source collection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalognumber: Option<StringTerm>,
    /// Taxonomic class of the organism.
    #[serde(rename = "class", default, skip_serializing_if = "Option::is_none")]
    pub class_: Option<StringTerm>,
    /// Acronym, code, or name of the collection the record is derived from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collectioncode: Option<StringTerm>,
    /// Globally unique identifier for the collection housing the material.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collectionid: Option<StringTerm>,
    /// Human-readable name of the collection holding the record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collectionname: Option<StringTerm>,
    /// People or organizations who recorded or collected the occurrence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collector: Option<StringTerm>,
    /// Common name of a specific species. Not for groups like "birds" or "mammals".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commonname: Option<StringTerm>,
    /// Continent containing the sampling location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continent: Option<StringTerm>,
    /// Full country name, e.g. "Canada" rather than the ISO code CA.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<StringTerm>,
    /// Full name of the county (or equivalent).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub county: Option<StringTerm>,
    /// Date the specimen or observation was collected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datecollected: Option<DateTerm>,
    /// Most recent date the digital record changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datemodified: Option<DateTerm>,
    /// Data quality score for the record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dqs: Option<FloatTerm>,
    /// Entity tag used by iDigBio to detect record version changes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<StringTerm>,
    /// Date or date range of the collecting event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eventdate: Option<DateTerm>,
    /// Scientific name of the family.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<StringTerm>,
    /// Field identifier of the collecting event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fieldnumber: Option<StringTerm>,
    /// Data-quality or processing flags applied to the record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<StringTerm>,
    /// Scientific name of the genus.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genus: Option<StringTerm>,
    /// Location of the occurrence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geopoint: Option<GeoPoint>,
    /// True if the record has one or more associated images.
    #[serde(rename = "hasImage", default, skip_serializing_if = "Option::is_none")]
    pub has_image: Option<bool>,
    /// Pipe-separated higher ranks above the taxon, e.g. "Animalia | Chordata | Mammalia".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highertaxon: Option<StringTerm>,
    /// Lowest infraspecific epithet of the scientific name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infraspecificepithet: Option<StringTerm>,
    /// Name or acronym of the institution holding the material.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institutioncode: Option<StringTerm>,
    /// Identifier of the institution holding the material.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institutionid: Option<StringTerm>,
    /// Full name of the institution that manages the data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institutionname: Option<StringTerm>,
    /// Scientific name of the kingdom.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kingdom: Option<StringTerm>,
    /// Description of the place where the specimen was collected or observed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locality: Option<StringTerm>,
    /// Greater depth in metres below the local surface.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maxdepth: Option<FloatTerm>,
    /// Upper elevation limit in metres above sea level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maxelevation: Option<FloatTerm>,
    /// Identifiers of media associated with the record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mediarecords: Option<StringTerm>,
    /// Lesser depth in metres below the local surface.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mindepth: Option<FloatTerm>,
    /// Lower elevation limit in metres above sea level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minelevation: Option<FloatTerm>,
    /// Municipality or city containing the location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub municipality: Option<StringTerm>,
    /// Globally unique identifier for the occurrence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occurrenceid: Option<StringTerm>,
    /// Scientific name of the order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<StringTerm>,
    /// Scientific name of the phylum or division.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phylum: Option<StringTerm>,
    /// Specific iDigBio record UUIDs to include.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recordids: Option<StringTerm>,
    /// Collector's number assigned at the time of collection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recordnumber: Option<StringTerm>,
    /// Identifier of an iDigBio recordset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recordset: Option<StringTerm>,
    /// Full scientific name, including authorship.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scientificname: Option<StringTerm>,
    /// Species epithet of the scientific name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specificepithet: Option<StringTerm>,
    /// Primary administrative region (state, province) of the location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stateprovince: Option<StringTerm>,
    /// Identifier for the taxon information.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taxonid: Option<StringTerm>,
    /// Status of the name as a taxon label, e.g. "accepted" or "invalid".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taxonomicstatus: Option<StringTerm>,
    /// Rank of the most specific name, e.g. "species", "subspecies" or "genus".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taxonrank: Option<StringTerm>,
    /// Nomenclatural types applied to the subject, e.g. "holotype of Pinus abies".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typestatus: Option<StringTerm>,
    /// Internal iDigBio identifier of the record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<StringTerm>,
    /// Collection date exactly as written on the label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verbatimeventdate: Option<StringTerm>,
    /// Locality exactly as written on the label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verbatimlocality: Option<StringTerm>,
    /// Revision number of the record in iDigBio.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<IntTerm>,
    /// Ocean, sea, lake or river in which the location occurs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waterbody: Option<StringTerm>,
}

impl RecordQuery {
    /// Every field name accepted in a record query, as serialized.
    pub const FIELD_NAMES: &'static [&'static str] = &[
        "associatedsequences",
        "barcodevalue",
        "basisofrecord",
        "bed",
        "canonicalname",
        "catalognumber",
        "class",
        "collectioncode",
        "collectionid",
        "collectionname",
        "collector",
        "commonname",
        "continent",
        "country",
        "county",
        "datecollected",
        "datemodified",
        "dqs",
        "etag",
        "eventdate",
        "family",
        "fieldnumber",
        "flags",
        "genus",
        "geopoint",
        "hasImage",
        "highertaxon",
        "infraspecificepithet",
        "institutioncode",
        "institutionid",
        "institutionname",
        "kingdom",
        "locality",
        "maxdepth",
        "maxelevation",
        "mediarecords",
        "mindepth",
        "minelevation",
        "municipality",
        "occurrenceid",
        "order",
        "phylum",
        "recordids",
        "recordnumber",
        "recordset",
        "scientificname",
        "specificepithet",
        "stateprovince",
        "taxonid",
        "taxonomicstatus",
        "taxonrank",
        "typestatus",
        "uuid",
        "verbatimeventdate",
        "verbatimlocality",
        "version",
        "waterbody",
    ];

    /// Check whether the query has no usable criteria.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        serde_json::to_value(self)
            .map(|value| crate::urls::sanitize_json(&value).is_none())
            .unwrap_or(true)
    }

    /// Write taxonomic names the way iDigBio indexes them.
    ///
    /// Genus names are capitalized; species and infraspecific epithets are
    /// lowercase.
    #[must_use]
    pub fn normalize_casing(mut self) -> Self {
        self.genus = self.genus.map(|term| term.map_values(capitalize));
        self.specificepithet = self
            .specificepithet
            .map(|term| term.map_values(|v| v.trim().to_lowercase()));
        self.infraspecificepithet = self
            .infraspecificepithet
            .map(|term| term.map_values(|v| v.trim().to_lowercase()));
        self
    }
}

impl Validate for RecordQuery {
    fn validate(&self) -> Result<(), ValidationError> {
        self.geopoint.validate()?;
        for date in [&self.datecollected, &self.datemodified, &self.eventdate] {
            date.validate()?;
        }
        for number in [
            &self.dqs,
            &self.maxdepth,
            &self.maxelevation,
            &self.mindepth,
            &self.minelevation,
        ] {
            number.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Existence;
    use serde_json::json;

    #[test]
    fn test_field_names_match_serialization() {
        let mut value = serde_json::Map::new();
        for name in RecordQuery::FIELD_NAMES {
            value.insert((*name).to_string(), json!({"type": "exists"}));
        }
        // hasImage and geopoint do not accept existence tests
        value.insert("hasImage".to_string(), json!(true));
        value.insert(
            "geopoint".to_string(),
            json!({"type": "geo_distance", "lat": 0.0, "lon": 0.0}),
        );

        let query: RecordQuery = serde_json::from_value(json!(value)).unwrap();
        let back = serde_json::to_value(&query).unwrap();
        let keys: Vec<&str> = back.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, RecordQuery::FIELD_NAMES);
    }

    #[test]
    fn test_renamed_fields() {
        let query: RecordQuery =
            serde_json::from_value(json!({"class": "Aves", "hasImage": true})).unwrap();
        assert_eq!(query.class_, Some(StringTerm::from("Aves")));
        assert_eq!(query.has_image, Some(true));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: Result<RecordQuery, _> = serde_json::from_value(json!({"colour": "blue"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_is_empty() {
        assert!(RecordQuery::default().is_empty());

        let query = RecordQuery {
            genus: Some(StringTerm::from("")),
            scientificname: Some(StringTerm::AnyOf(vec![])),
            ..Default::default()
        };
        assert!(query.is_empty());

        let query = RecordQuery {
            commonname: Some(Existence::exists().into()),
            ..Default::default()
        };
        assert!(!query.is_empty());
    }

    #[test]
    fn test_normalize_casing() {
        let query = RecordQuery {
            genus: Some(StringTerm::from("homo")),
            specificepithet: Some(StringTerm::from("Sapiens")),
            infraspecificepithet: Some(StringTerm::AnyOf(vec!["IDALTU".to_string()])),
            country: Some(StringTerm::from("Kenya")),
            ..Default::default()
        }
        .normalize_casing();

        assert_eq!(query.genus, Some(StringTerm::from("Homo")));
        assert_eq!(query.specificepithet, Some(StringTerm::from("sapiens")));
        assert_eq!(
            query.infraspecificepithet,
            Some(StringTerm::AnyOf(vec!["idaltu".to_string()]))
        );
        assert_eq!(query.country, Some(StringTerm::from("Kenya")));
    }

    #[test]
    fn test_validate_geopoint() {
        let query: RecordQuery = serde_json::from_value(json!({
            "geopoint": {"type": "geo_distance", "lat": -100.0, "lon": 10.0}
        }))
        .unwrap();
        let err = query.validate().unwrap_err();
        assert!(err.terminal);
    }

    #[test]
    fn test_validate_date_range() {
        let query: RecordQuery = serde_json::from_value(json!({
            "datecollected": {"type": "range", "gte": "2020-01-01", "lte": "2010-01-01"}
        }))
        .unwrap();
        let err = query.validate().unwrap_err();
        assert!(!err.terminal);
    }

    #[test]
    fn test_serialization_skips_unset_fields() {
        let query = RecordQuery {
            genus: Some(StringTerm::from("Homo")),
            specificepithet: Some(StringTerm::from("sapiens")),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&query).unwrap(),
            json!({"genus": "Homo", "specificepithet": "sapiens"})
        );
    }
}
