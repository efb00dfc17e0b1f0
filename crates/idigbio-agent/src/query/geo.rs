//! Geographic filters for the `geopoint` record field.

use std::sync::LazyLock;

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{Validate, ValidationError};

static DISTANCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d+(\.\d+)?km$").expect("distance pattern is valid")
});

/// A latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Coordinate {
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lon: f64,
}

impl Validate for Coordinate {
    fn validate(&self) -> Result<(), ValidationError> {
        check_latitude(self.lat)?;
        check_longitude(self.lon)
    }
}

/// A location on earth.
///
/// Either a point with an optional search radius, or a rectangle given by its
/// top-left and bottom-right corners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GeoPoint {
    /// Records within `distance` of a point.
    GeoDistance {
        /// Latitude in decimal degrees.
        lat: f64,
        /// Longitude in decimal degrees.
        lon: f64,
        /// Radius in kilometers with "km" at the end, e.g. "575km".
        #[serde(default, skip_serializing_if = "Option::is_none")]
        distance: Option<String>,
    },
    /// Records inside a rectangle.
    GeoBoundingBox {
        /// North-west corner of the box.
        top_left: Coordinate,
        /// South-east corner of the box.
        bottom_right: Coordinate,
    },
}

impl Validate for GeoPoint {
    fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::GeoDistance { lat, lon, distance } => {
                check_latitude(*lat)?;
                check_longitude(*lon)?;
                if let Some(distance) = distance {
                    if !DISTANCE.is_match(distance) {
                        return Err(ValidationError::retryable(format!(
                            "distance \"{distance}\" must be a number of kilometers ending in km, e.g. 575km"
                        )));
                    }
                }
                Ok(())
            }
            Self::GeoBoundingBox {
                top_left,
                bottom_right,
            } => {
                top_left.validate()?;
                bottom_right.validate()?;
                if top_left.lat < bottom_right.lat {
                    return Err(ValidationError::retryable(
                        "top_left must not be south of bottom_right",
                    ));
                }
                Ok(())
            }
        }
    }
}

fn check_latitude(lat: f64) -> Result<(), ValidationError> {
    if (-90.0..=90.0).contains(&lat) {
        Ok(())
    } else {
        Err(ValidationError::terminal(format!(
            "Invalid latitude value: {lat} is not in range [-90, +90]"
        )))
    }
}

fn check_longitude(lon: f64) -> Result<(), ValidationError> {
    if (-180.0..=180.0).contains(&lon) {
        Ok(())
    } else {
        Err(ValidationError::terminal(format!(
            "Invalid longitude value: {lon} is not in range [-180, +180]"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_geo_distance_roundtrip_shape() {
        let point: GeoPoint = serde_json::from_value(json!({
            "type": "geo_distance",
            "lat": 25.0,
            "lon": 121.5,
            "distance": "50km"
        }))
        .unwrap();
        assert!(point.validate().is_ok());
        assert_eq!(
            serde_json::to_value(&point).unwrap()["type"],
            json!("geo_distance")
        );
    }

    #[test]
    fn test_bounding_box() {
        let point: GeoPoint = serde_json::from_value(json!({
            "type": "geo_bounding_box",
            "top_left": {"lat": 50.0, "lon": -10.0},
            "bottom_right": {"lat": 40.0, "lon": 5.0}
        }))
        .unwrap();
        assert!(point.validate().is_ok());
    }

    #[test]
    fn test_bounding_box_requires_corners() {
        let result: Result<GeoPoint, _> = serde_json::from_value(json!({
            "type": "geo_bounding_box",
            "lat": 10.0,
            "lon": 10.0
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_latitude_out_of_range_is_terminal() {
        let point = GeoPoint::GeoDistance {
            lat: 95.0,
            lon: 0.0,
            distance: None,
        };
        let err = point.validate().unwrap_err();
        assert!(err.terminal);
        assert!(err.message.contains("latitude"));
    }

    #[test]
    fn test_longitude_out_of_range_is_terminal() {
        let coordinate = Coordinate {
            lat: 0.0,
            lon: -181.0,
        };
        let err = coordinate.validate().unwrap_err();
        assert!(err.terminal);
        assert!(err.message.contains("[-180, +180]"));
    }

    #[test]
    fn test_bad_distance_is_retryable() {
        let point = GeoPoint::GeoDistance {
            lat: 0.0,
            lon: 0.0,
            distance: Some("five miles".to_string()),
        };
        let err = point.validate().unwrap_err();
        assert!(!err.terminal);
    }

    #[test]
    fn test_inverted_bounding_box_is_retryable() {
        let point = GeoPoint::GeoBoundingBox {
            top_left: Coordinate {
                lat: 10.0,
                lon: 0.0,
            },
            bottom_right: Coordinate {
                lat: 20.0,
                lon: 10.0,
            },
        };
        let err = point.validate().unwrap_err();
        assert!(!err.terminal);
    }
}
