//! Configuration management for the iDigBio agent.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::urls::{IDigBioUrls, DEFAULT_PORTAL_URL, DEFAULT_SEARCH_URL};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default configuration directory name.
const CONFIG_DIR_NAME: &str = "idigbio-agent";

/// Prefix for environment variable overrides.
const ENV_PREFIX: &str = "IDIGBIO_AGENT_";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `IDIGBIO_AGENT_`, sections
///    separated by `__`, e.g. `IDIGBIO_AGENT_LLM__MODEL`)
/// 2. TOML config file at `~/.config/idigbio-agent/config.toml`
/// 3. `OPENAI_API_KEY` and `OPENAI_BASE_URL`
/// 4. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration.
    pub server: ServerConfig,
    /// Language model configuration.
    pub llm: LlmConfig,
    /// iDigBio API configuration.
    pub idigbio: IDigBioConfig,
    /// Request translation configuration.
    pub translator: TranslatorConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Number of messages buffered per response stream.
    pub response_buffer: usize,
}

/// Language model configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible API, without `/chat/completions`.
    pub base_url: String,
    /// Model name.
    pub model: String,
    /// API key sent as a bearer token. Local providers may not need one.
    pub api_key: Option<String>,
    /// Sampling temperature.
    pub temperature: f32,
    /// Attempts allowed to produce valid search parameters.
    pub max_attempts: u32,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

/// iDigBio API configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IDigBioConfig {
    /// Base URL of the search API.
    pub search_url: String,
    /// Base URL of the web portal.
    pub portal_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

/// Which backend translates requests into search parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslatorBackend {
    /// A language model.
    #[default]
    Llm,
    /// The built-in rule parser.
    Rules,
}

/// Request translation configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    /// Translator backend.
    pub backend: TranslatorBackend,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9999,
            response_buffer: 32,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4.1".to_string(),
            api_key: None,
            temperature: 0.0,
            max_attempts: 3,
            timeout_secs: 60,
        }
    }
}

impl Default for IDigBioConfig {
    fn default() -> Self {
        Self {
            search_url: DEFAULT_SEARCH_URL.to_string(),
            portal_url: DEFAULT_PORTAL_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

/// `OPENAI_*` variables understood by most OpenAI-compatible tooling.
fn openai_env() -> Env {
    Env::raw().filter_map(|key| match key.as_str().to_ascii_uppercase().as_str() {
        "OPENAI_API_KEY" => Some("llm.api_key".into()),
        "OPENAI_BASE_URL" => Some("llm.base_url".into()),
        _ => None,
    })
}

fn check_url(name: &str, url: &str) -> Result<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(Error::config_validation(format!(
            "{name} must be an http(s) URL, got '{url}'"
        )))
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(openai_env())
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            return Err(Error::config_validation("server.host must not be empty"));
        }
        if self.server.port == 0 {
            return Err(Error::config_validation("server.port must be greater than 0"));
        }
        if self.server.response_buffer == 0 {
            return Err(Error::config_validation(
                "server.response_buffer must be greater than 0",
            ));
        }

        check_url("llm.base_url", &self.llm.base_url)?;
        if self.llm.model.trim().is_empty() {
            return Err(Error::config_validation("llm.model must not be empty"));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(Error::config_validation(format!(
                "llm.temperature must be between 0 and 2, got {}",
                self.llm.temperature
            )));
        }
        if self.llm.max_attempts == 0 {
            return Err(Error::config_validation("llm.max_attempts must be at least 1"));
        }
        if self.llm.timeout_secs == 0 {
            return Err(Error::config_validation("llm.timeout_secs must be greater than 0"));
        }

        check_url("idigbio.search_url", &self.idigbio.search_url)?;
        check_url("idigbio.portal_url", &self.idigbio.portal_url)?;
        if self.idigbio.timeout_secs == 0 {
            return Err(Error::config_validation(
                "idigbio.timeout_secs must be greater than 0",
            ));
        }

        Ok(())
    }

    /// Address the server binds, as `host:port`.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Link builder for the configured iDigBio endpoints.
    #[must_use]
    pub fn urls(&self) -> IDigBioUrls {
        IDigBioUrls::new(&self.idigbio.search_url, &self.idigbio.portal_url)
    }

    /// Get the iDigBio request timeout as a Duration.
    #[must_use]
    pub fn idigbio_timeout(&self) -> Duration {
        Duration::from_secs(self.idigbio.timeout_secs)
    }

    /// Copy of the configuration that is safe to print.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if config.llm.api_key.as_deref().is_some_and(|key| !key.is_empty()) {
            config.llm.api_key = Some("********".to_string());
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9999);
        assert_eq!(config.llm.max_attempts, 3);
        assert!(config.llm.temperature.abs() < f32::EPSILON);
        assert_eq!(config.translator.backend, TranslatorBackend::Llm);
        assert_eq!(config.idigbio.search_url, "https://search.idigbio.org");
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_port() {
        let mut config = Config::default();
        config.server.port = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("server.port"));
    }

    #[test]
    fn test_validate_zero_attempts() {
        let mut config = Config::default();
        config.llm.max_attempts = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("max_attempts"));
    }

    #[test]
    fn test_validate_temperature() {
        let mut config = Config::default();
        config.llm.temperature = 2.5;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("temperature"));
    }

    #[test]
    fn test_validate_urls() {
        let mut config = Config::default();
        config.idigbio.search_url = "search.idigbio.org".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("idigbio.search_url"));

        let mut config = Config::default();
        config.llm.base_url = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bind_address() {
        let config = Config::default();
        assert_eq!(config.bind_address(), "0.0.0.0:9999");
    }

    #[test]
    fn test_urls_from_config() {
        let mut config = Config::default();
        config.idigbio.portal_url = "https://portal.example.org/".to_string();

        assert_eq!(
            config.urls().media_record_page("abc"),
            "https://portal.example.org/portal/mediarecords/abc"
        );
    }

    #[test]
    fn test_redacted_hides_api_key() {
        let mut config = Config::default();
        config.llm.api_key = Some("sk-secret".to_string());

        let redacted = config.redacted();
        assert_eq!(redacted.llm.api_key.as_deref(), Some("********"));
        assert_eq!(Config::default().redacted().llm.api_key, None);
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("idigbio-agent"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 8080

[llm]
model = "llama3.1"
base_url = "http://localhost:11434/v1"
max_attempts = 5

[translator]
backend = "rules"
"#
        )
        .unwrap();

        let config = Config::load_from(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.llm.model, "llama3.1");
        assert_eq!(config.llm.max_attempts, 5);
        assert_eq!(config.translator.backend, TranslatorBackend::Rules);
    }

    #[test]
    fn test_load_toml_top_level_tables() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[idigbio]\nportal_url = \"https://portal.example.org\"\ntimeout_secs = 7"
        )
        .unwrap();

        let config = Config::load_from(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.idigbio.portal_url, "https://portal.example.org");
        assert_eq!(config.idigbio.timeout_secs, 7);
        assert_eq!(config.idigbio.search_url, IDigBioConfig::default().search_url);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[llm]\nmax_attempts = 0").unwrap();

        let err = Config::load_from(Some(file.path().to_path_buf())).unwrap_err();
        assert!(matches!(err, Error::ConfigValidation { .. }));
    }

    #[test]
    fn test_load_rejects_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = \"not a number\"").unwrap();

        let err = Config::load_from(Some(file.path().to_path_buf())).unwrap_err();
        assert!(matches!(err, Error::ConfigLoad(_)));
    }

    #[test]
    fn test_backend_serialization() {
        let json = serde_json::to_string(&TranslatorConfig {
            backend: TranslatorBackend::Rules,
        })
        .unwrap();
        assert_eq!(json, r#"{"backend":"rules"}"#);
    }
}
