//! Client for the iDigBio search and summary APIs.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client as HttpClient, Response};
use serde_json::Value;
use tracing::debug;

use crate::error::Result;
use crate::urls::{sanitize_json, IDigBioUrls};

/// Outcome of a call to the iDigBio API.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// Status code and reason phrase, e.g. `"200 OK"`.
    pub status_line: String,
    /// Whether the status code indicates success.
    pub ok: bool,
    /// Parsed JSON body of a successful response.
    pub body: Option<Value>,
}

impl ApiResponse {
    /// Build a successful response around a JSON body.
    #[must_use]
    pub fn success(body: Value) -> Self {
        Self {
            status_line: "200 OK".to_string(),
            ok: true,
            body: Some(body),
        }
    }

    /// Build a failed response with the given status line.
    #[must_use]
    pub fn failure(status_line: impl Into<String>) -> Self {
        Self {
            status_line: status_line.into(),
            ok: false,
            body: None,
        }
    }

    /// Total number of matching records reported by the API.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.body
            .as_ref()
            .and_then(|body| body.get("itemCount"))
            .and_then(Value::as_u64)
            .unwrap_or(0)
    }

    /// Number of records actually returned in this response.
    #[must_use]
    pub fn items_len(&self) -> usize {
        self.body
            .as_ref()
            .and_then(|body| body.get("items"))
            .and_then(Value::as_array)
            .map_or(0, Vec::len)
    }
}

/// Access to the iDigBio search API.
///
/// The HTTP implementation is [`HttpIDigBio`]; tests substitute canned
/// responses.
#[async_trait]
pub trait IDigBioApi: Send + Sync {
    /// POST `params` to a search endpoint such as `/v2/search/records`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request could not be sent or the body is not
    /// valid JSON. Non-success status codes are reported through
    /// [`ApiResponse::ok`].
    async fn search(&self, endpoint: &str, params: &Value) -> Result<ApiResponse>;

    /// GET a fully-formed summary URL.
    ///
    /// # Errors
    ///
    /// Same as [`IDigBioApi::search`].
    async fn summary(&self, url: &str) -> Result<ApiResponse>;
}

/// [`IDigBioApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpIDigBio {
    http_client: HttpClient,
    urls: IDigBioUrls,
}

impl HttpIDigBio {
    /// Create a client for the API behind `urls`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(urls: IDigBioUrls, timeout: Duration) -> Result<Self> {
        let http_client = HttpClient::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http_client, urls })
    }

    async fn into_api_response(response: Response) -> Result<ApiResponse> {
        let status = response.status();
        let status_line = format!(
            "{} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or_default()
        );
        if !status.is_success() {
            return Ok(ApiResponse::failure(status_line));
        }
        let body: Value = response.json().await?;
        Ok(ApiResponse {
            status_line,
            ok: true,
            body: Some(body),
        })
    }
}

#[async_trait]
impl IDigBioApi for HttpIDigBio {
    async fn search(&self, endpoint: &str, params: &Value) -> Result<ApiResponse> {
        let url = self.urls.api_url(endpoint, None);
        let body = sanitize_json(params).unwrap_or_else(|| Value::Object(serde_json::Map::new()));
        debug!(%url, "POST iDigBio search");

        let response = self.http_client.post(&url).json(&body).send().await?;
        Self::into_api_response(response).await
    }

    async fn summary(&self, url: &str) -> Result<ApiResponse> {
        debug!(%url, "GET iDigBio summary");
        let response = self.http_client.get(url).send().await?;
        Self::into_api_response(response).await
    }
}
