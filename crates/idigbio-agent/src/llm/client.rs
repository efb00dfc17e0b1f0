//! OpenAI-compatible chat completions client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client as HttpClient, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::{ChatMessage, ChatModel};
use crate::config::LlmConfig;
use crate::error::{Error, Result};

/// Client for a `/chat/completions` endpoint that returns JSON objects.
#[derive(Debug, Clone)]
pub struct LlmClient {
    base_url: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
    http_client: HttpClient,
}

impl LlmClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone().filter(|key| !key.is_empty()),
            temperature: config.temperature,
            http_client,
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl ChatModel for LlmClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let body = CompletionRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let mut request = self.http_client.post(self.completions_url()).json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        debug!(model = %self.model, messages = messages.len(), "sending chat completion");
        let response = request.send().await?;

        match response.status() {
            StatusCode::OK => {
                let body: CompletionResponse = response.json().await?;
                body.choices
                    .into_iter()
                    .next()
                    .and_then(|choice| choice.message.content)
                    .filter(|content| !content.trim().is_empty())
                    .ok_or(Error::LlmEmptyResponse)
            }
            StatusCode::UNAUTHORIZED => Err(Error::LlmAuthentication),
            StatusCode::TOO_MANY_REQUESTS => Err(Error::LlmRateLimited),
            status => {
                let error_body: Option<Value> = response.json().await.ok();
                let message = error_body
                    .as_ref()
                    .and_then(|v| v.get("error").and_then(|e| e.get("message")))
                    .and_then(Value::as_str)
                    .unwrap_or("Unknown error")
                    .to_string();
                warn!(status = status.as_u16(), %message, "chat completion failed");
                Err(Error::LlmApi {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_from_config() {
        let config = LlmConfig {
            base_url: "http://localhost:11434/v1/".to_string(),
            api_key: Some(String::new()),
            ..LlmConfig::default()
        };
        let client = LlmClient::new(&config).unwrap();
        assert_eq!(client.completions_url(), "http://localhost:11434/v1/chat/completions");
        assert!(client.api_key.is_none());
        assert_eq!(client.model_name(), config.model);
    }

    #[test]
    fn test_request_body_shape() {
        let messages = [ChatMessage::system("prompt"), ChatMessage::user("request")];
        let body = CompletionRequest {
            model: "gpt-4.1",
            messages: &messages,
            temperature: 0.0,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["response_format"], json!({"type": "json_object"}));
        assert_eq!(value["messages"][1], json!({"role": "user", "content": "request"}));
        assert_eq!(value["temperature"], json!(0.0));
    }

    #[test]
    fn test_response_parsing() {
        let body: CompletionResponse = serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "{\"plan\":\"x\"}"}}],
            "usage": {"prompt_tokens": 1, "completion_tokens": 1, "total_tokens": 2}
        }))
        .unwrap();
        assert_eq!(
            body.choices[0].message.content.as_deref(),
            Some("{\"plan\":\"x\"}")
        );
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_http_error() {
        let config = LlmConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
            ..LlmConfig::default()
        };
        let client = LlmClient::new(&config).unwrap();
        let err = client
            .complete(&[ChatMessage::user("hello")])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Http(_)));
    }
}
