//! Error types for the iDigBio agent.
//!
//! This module defines all error types used throughout the crate, providing
//! detailed context for debugging and user-facing messages for the agent's
//! response stream.

use std::net::SocketAddr;

use thiserror::Error;

/// The main error type for agent operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Language Model Errors ===
    /// The language model provider rejected the credentials.
    #[error("language model authentication failed; check the API key")]
    LlmAuthentication,

    /// The language model provider is rate limiting requests.
    #[error("language model rate limit exceeded")]
    LlmRateLimited,

    /// The language model provider returned an error response.
    #[error("language model request failed ({status}): {message}")]
    LlmApi {
        /// HTTP status code returned by the provider.
        status: u16,
        /// Error message reported by the provider.
        message: String,
    },

    /// The language model returned no content.
    #[error("language model returned an empty response")]
    LlmEmptyResponse,

    /// No valid search parameters could be generated.
    #[error("failed to generate search parameters after {attempts} attempt(s)")]
    GenerationFailed {
        /// Number of attempts made before giving up.
        attempts: u32,
        /// The terminal validation error that stopped generation, if any.
        terminal: Option<String>,
    },

    // === Agent Errors ===
    /// The requested entrypoint does not exist.
    #[error("unknown entrypoint '{0}'")]
    UnknownEntrypoint(String),

    /// The receiving side of a response stream went away.
    #[error("response stream closed by receiver")]
    ResponseClosed,

    // === Network Errors ===
    /// An HTTP request could not be completed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Failed to bind the HTTP listener.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address that could not be bound.
        addr: SocketAddr,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === I/O Errors ===
    /// File system or socket operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for agent operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a configuration validation error.
    #[must_use]
    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    /// Create an unknown entrypoint error.
    #[must_use]
    pub fn unknown_entrypoint(id: impl Into<String>) -> Self {
        Self::UnknownEntrypoint(id.into())
    }

    /// Generation gave up after exhausting its attempts.
    #[must_use]
    pub fn generation_exhausted(attempts: u32) -> Self {
        Self::GenerationFailed {
            attempts,
            terminal: None,
        }
    }

    /// Generation stopped early on an error that retrying cannot fix.
    #[must_use]
    pub fn generation_terminal(attempts: u32, message: impl Into<String>) -> Self {
        Self::GenerationFailed {
            attempts,
            terminal: Some(message.into()),
        }
    }

    /// Check if this error means no search parameters could be produced.
    #[must_use]
    pub fn is_generation_failure(&self) -> bool {
        matches!(self, Self::GenerationFailed { .. })
    }

    /// Check if this error is caused by the caller rather than the service.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::UnknownEntrypoint(_))
    }

    /// Message suitable for the agent's process log.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::GenerationFailed {
                terminal: Some(message),
                ..
            } => format!("Error: {message}"),
            Self::GenerationFailed {
                attempts,
                terminal: None,
            } => format!("Error: AI failed to generate valid output after {attempts} attempts."),
            other => format!("Error: {other}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::unknown_entrypoint("find_fossils");
        assert_eq!(err.to_string(), "unknown entrypoint 'find_fossils'");

        let err = Error::internal("test error");
        assert_eq!(err.to_string(), "internal error: test error");
    }

    #[test]
    fn test_generation_exhausted_user_message() {
        let err = Error::generation_exhausted(3);
        assert!(err.is_generation_failure());
        assert_eq!(
            err.user_message(),
            "Error: AI failed to generate valid output after 3 attempts."
        );
    }

    #[test]
    fn test_generation_terminal_user_message() {
        let err = Error::generation_terminal(
            1,
            "Invalid latitude value: 95 is not in range [-90, +90]",
        );
        assert_eq!(
            err.user_message(),
            "Error: Invalid latitude value: 95 is not in range [-90, +90]"
        );
    }

    #[test]
    fn test_other_user_message() {
        let err = Error::LlmRateLimited;
        assert_eq!(
            err.user_message(),
            "Error: language model rate limit exceeded"
        );
        assert!(!err.is_generation_failure());
    }

    #[test]
    fn test_is_client_error() {
        assert!(Error::unknown_entrypoint("x").is_client_error());
        assert!(!Error::generation_terminal(1, "bad").is_client_error());
        assert!(!Error::ResponseClosed.is_client_error());
    }

    #[test]
    fn test_llm_api_error_display() {
        let err = Error::LlmApi {
            status: 500,
            message: "upstream exploded".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("500"));
        assert!(msg.contains("upstream exploded"));
    }

    #[test]
    fn test_config_validation_error_display() {
        let err = Error::config_validation("port must be greater than 0");
        assert!(err.to_string().contains("port must be greater than 0"));
    }

    #[test]
    fn test_bind_error_display() {
        let err = Error::Bind {
            addr: "0.0.0.0:9999".parse().unwrap(),
            source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "in use"),
        };
        let msg = err.to_string();
        assert!(msg.contains("0.0.0.0:9999"));
        assert!(msg.contains("in use"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_json_error() {
        let json_result: std::result::Result<i32, serde_json::Error> =
            serde_json::from_str("not valid json");
        if let Err(json_err) = json_result {
            let err: Error = json_err.into();
            assert!(matches!(err, Error::Json(_)));
        }
    }
}
