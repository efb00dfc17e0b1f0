//! iDigBio URL construction.
//!
//! The portal and API accept query objects as JSON embedded directly in the
//! query string. Only the characters that break a URL are percent-encoded, so
//! the resulting links stay readable when shown to a user.

use serde_json::{Map, Value};

/// Records search endpoint.
pub const RECORDS_ENDPOINT: &str = "/v2/search/records";

/// Media search endpoint.
pub const MEDIA_ENDPOINT: &str = "/v2/search/media";

/// Records summary endpoint.
pub const SUMMARY_ENDPOINT: &str = "/v2/summary/top/records";

/// Default base URL of the search API.
pub const DEFAULT_SEARCH_URL: &str = "https://search.idigbio.org";

/// Default base URL of the web portal.
pub const DEFAULT_PORTAL_URL: &str = "https://portal.idigbio.org";

const PERCENT_ENCODING: [(char, &str); 4] = [('{', "%7B"), ('}', "%7D"), ('"', "%22"), (' ', "%20")];

/// Remove nulls and empty strings, lists and objects, recursively.
///
/// Returns `None` when nothing is left. Containers that become empty once
/// their contents are sanitized are removed as well.
#[must_use]
pub fn sanitize_json(value: &Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::Array(items) => {
            let items: Vec<Value> = items.iter().filter_map(sanitize_json).collect();
            (!items.is_empty()).then_some(Value::Array(items))
        }
        Value::Object(entries) => {
            let entries: Map<String, Value> = entries
                .iter()
                .filter_map(|(k, v)| sanitize_json(v).map(|v| (k.clone(), v)))
                .collect();
            (!entries.is_empty()).then_some(Value::Object(entries))
        }
        other => Some(other.clone()),
    }
}

fn encode_inner(value: &Value, out: &mut String) {
    match value {
        Value::Object(entries) => {
            out.push('{');
            for (i, (key, value)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push('"');
                out.push_str(key);
                out.push_str("\":");
                encode_inner(value, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                encode_inner(item, out);
            }
            out.push(']');
        }
        Value::Number(n) if n.is_i64() || n.is_u64() => out.push_str(&n.to_string()),
        Value::String(s) => {
            out.push('"');
            out.push_str(s);
            out.push('"');
        }
        other => {
            out.push('"');
            out.push_str(&other.to_string());
            out.push('"');
        }
    }
}

/// Percent-encode the characters that cannot appear raw in a URL.
#[must_use]
pub fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match PERCENT_ENCODING.iter().find(|(from, _)| *from == c) {
            Some((_, to)) => out.push_str(to),
            None => out.push(c),
        }
    }
    out
}

/// Render parameters as a query string, `key=<json-ish value>` joined by `&`.
///
/// Strings are quoted, integers are written bare, and any other scalar is
/// quoted. Booleans keep their JSON spelling, so `true` becomes `"true"`,
/// which the search API's boolean fields accept. Empty values are dropped
/// first. Anything other than an object
/// renders as an empty string.
#[must_use]
pub fn url_encode_params(params: &Value) -> String {
    let Some(Value::Object(entries)) = sanitize_json(params) else {
        return String::new();
    };
    let mut out = String::new();
    for (i, (key, value)) in entries.iter().enumerate() {
        if i > 0 {
            out.push('&');
        }
        out.push_str(key);
        out.push('=');
        encode_inner(value, &mut out);
    }
    percent_encode(&out)
}

/// Builds links into the iDigBio search API and portal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IDigBioUrls {
    search_base: String,
    portal_base: String,
}

impl Default for IDigBioUrls {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_URL, DEFAULT_PORTAL_URL)
    }
}

impl IDigBioUrls {
    /// Create a builder for the given base URLs. Trailing slashes are ignored.
    #[must_use]
    pub fn new(search_base: impl Into<String>, portal_base: impl Into<String>) -> Self {
        let trim = |s: String| s.trim_end_matches('/').to_string();
        Self {
            search_base: trim(search_base.into()),
            portal_base: trim(portal_base.into()),
        }
    }

    fn with_params(base: String, params: Option<&Value>) -> String {
        match params {
            Some(params) => format!("{base}?{}", url_encode_params(params)),
            None => base,
        }
    }

    /// URL of an API endpoint, e.g. `/v2/search/records`.
    #[must_use]
    pub fn api_url(&self, endpoint: &str, params: Option<&Value>) -> String {
        Self::with_params(format!("{}{endpoint}", self.search_base), params)
    }

    /// URL of the portal search page showing the same results.
    #[must_use]
    pub fn portal_url(&self, params: Option<&Value>) -> String {
        Self::with_params(format!("{}/portal/search", self.portal_base), params)
    }

    /// URL of the records summary endpoint for the given parameters.
    #[must_use]
    pub fn summary_url(&self, params: &Value) -> String {
        self.api_url(SUMMARY_ENDPOINT, Some(params))
    }

    /// Portal page for a single media record.
    #[must_use]
    pub fn media_record_page(&self, uuid: &str) -> String {
        format!("{}/portal/mediarecords/{uuid}", self.portal_base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sanitize_drops_empty_values() {
        let value = json!({
            "genus": "Homo",
            "country": "",
            "family": [],
            "geopoint": {},
            "locality": null,
            "limit": 0,
            "hasImage": false
        });
        assert_eq!(
            sanitize_json(&value),
            Some(json!({"genus": "Homo", "limit": 0, "hasImage": false}))
        );
    }

    #[test]
    fn test_sanitize_drops_containers_emptied_by_sanitizing() {
        let value = json!({"rq": {"genus": "", "family": [""]}, "mq": {"mediatype": "images"}});
        assert_eq!(
            sanitize_json(&value),
            Some(json!({"mq": {"mediatype": "images"}}))
        );
        assert_eq!(sanitize_json(&json!({"rq": {"genus": null}})), None);
    }

    #[test]
    fn test_summary_url_encoding() {
        let params = json!({
            "top_fields": "scientificname",
            "count": 5000,
            "rq": {"class": "Aves", "country": "Colombia", "taxonrank": "species"}
        });
        assert_eq!(
            url_encode_params(&params),
            "top_fields=%22scientificname%22&count=5000&rq=%7B%22class%22:%22Aves%22,%22country%22:%22Colombia%22,%22taxonrank%22:%22species%22%7D"
        );
    }

    #[test]
    fn test_encode_lists_floats_and_bools() {
        let params = json!({"rq": {"genus": ["Ursus", "Puffinus"], "dqs": 0.5, "hasImage": true}});
        assert_eq!(
            url_encode_params(&params),
            "rq=%7B%22genus%22:[%22Ursus%22,%22Puffinus%22],%22dqs%22:%220.5%22,%22hasImage%22:%22true%22%7D"
        );
    }

    #[test]
    fn test_encode_bools_lowercase() {
        let encoded = url_encode_params(&json!({"rq": {"hasImage": true, "flags": false}}));
        assert_eq!(
            encoded,
            "rq=%7B%22hasImage%22:%22true%22,%22flags%22:%22false%22%7D"
        );
        assert!(!encoded.contains("True"));
    }

    #[test]
    fn test_encode_spaces() {
        let params = json!({"rq": {"scientificname": "ursus arctos"}});
        assert_eq!(
            url_encode_params(&params),
            "rq=%7B%22scientificname%22:%22ursus%20arctos%22%7D"
        );
    }

    #[test]
    fn test_percent_encode_leaves_other_characters() {
        assert_eq!(percent_encode("a:b,[c]&d=e"), "a:b,[c]&d=e");
        assert_eq!(percent_encode("{\" }"), "%7B%22%20%7D");
    }

    #[test]
    fn test_api_url() {
        let urls = IDigBioUrls::default();
        assert_eq!(
            urls.api_url(RECORDS_ENDPOINT, None),
            "https://search.idigbio.org/v2/search/records"
        );
        assert_eq!(
            urls.api_url(MEDIA_ENDPOINT, Some(&json!({"mq": {"mediatype": "sounds"}}))),
            "https://search.idigbio.org/v2/search/media?mq=%7B%22mediatype%22:%22sounds%22%7D"
        );
    }

    #[test]
    fn test_portal_url() {
        let urls = IDigBioUrls::default();
        assert_eq!(
            urls.portal_url(Some(&json!({"rq": {"genus": "Homo"}}))),
            "https://portal.idigbio.org/portal/search?rq=%7B%22genus%22:%22Homo%22%7D"
        );
        assert_eq!(
            urls.portal_url(None),
            "https://portal.idigbio.org/portal/search"
        );
    }

    #[test]
    fn test_summary_url_and_media_page() {
        let urls = IDigBioUrls::new("http://localhost:8080/", "http://portal.test");
        assert_eq!(
            urls.summary_url(&json!({"count": 10})),
            "http://localhost:8080/v2/summary/top/records?count=10"
        );
        assert_eq!(
            urls.media_record_page("abc-123"),
            "http://portal.test/portal/mediarecords/abc-123"
        );
    }
}
