//! Live platform configuration.
//!
//! The platform base URL, API key, stream title and channel are supplied by
//! the host and treated as read-only for the lifetime of a session. The API key
//! is redacted in Debug output.

use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default HTTP request timeout.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Default connection timeout for the HTTP client.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Configuration value must not be empty: {0}")]
    EmptyValue(String),

    #[error("Platform base URL must use HTTPS, got '{0}'")]
    InsecureBaseUrl(String),

    #[error("Invalid HTTP timeout configuration: {0}")]
    InvalidHttpTimeout(String),
}

/// Connection settings for one live platform account.
#[derive(Clone)]
pub struct SessionConfig {
    /// Platform base URL without trailing slash (e.g. `https://live.example.com`).
    pub base_url: String,

    /// Account API key, sent as `api_key` on every request.
    pub api_key: SecretString,

    /// Title announced for the live session.
    pub stream_title: String,

    /// Channel the live session is published in.
    pub stream_channel: String,
}

/// Custom Debug implementation that redacts the API key.
impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("stream_title", &self.stream_title)
            .field("stream_channel", &self.stream_channel)
            .finish()
    }
}

impl SessionConfig {
    /// Create a configuration. A trailing `/` on `base_url` is dropped.
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        api_key: SecretString,
        stream_title: impl Into<String>,
        stream_channel: impl Into<String>,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            stream_title: stream_title.into(),
            stream_channel: stream_channel.into(),
        }
    }

    /// Create a configuration requiring an HTTPS base URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InsecureBaseUrl` if the URL doesn't use HTTPS.
    pub fn new_secure(
        base_url: impl Into<String>,
        api_key: SecretString,
        stream_title: impl Into<String>,
        stream_channel: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let base_url: String = base_url.into();
        if !base_url.starts_with("https://") {
            return Err(ConfigError::InsecureBaseUrl(base_url));
        }
        Ok(Self::new(base_url, api_key, stream_title, stream_channel))
    }

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// See [`SessionConfig::from_vars`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    ///
    /// # Errors
    ///
    /// - `ConfigError::MissingEnvVar` if `NUDGIS_URL` or `NUDGIS_API_KEY` is absent
    /// - `ConfigError::EmptyValue` if either of them is blank
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let base_url = required(vars, "NUDGIS_URL")?;
        let api_key = required(vars, "NUDGIS_API_KEY")?;

        let stream_title = vars.get("NUDGIS_STREAM_TITLE").cloned().unwrap_or_default();
        let stream_channel = vars
            .get("NUDGIS_STREAM_CHANNEL")
            .cloned()
            .unwrap_or_default();

        Ok(Self::new(
            base_url,
            SecretString::from(api_key),
            stream_title,
            stream_channel,
        ))
    }
}

fn required(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    let value = vars
        .get(name)
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))?;

    let value = value.trim();
    if value.is_empty() {
        return Err(ConfigError::EmptyValue(name.to_string()));
    }

    Ok(value.to_string())
}

/// Timeouts applied by the HTTP transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportConfig {
    /// Whole-request timeout.
    pub request_timeout: Duration,

    /// TCP/TLS connect timeout.
    pub connect_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_HTTP_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl TransportConfig {
    /// Load transport settings from environment variables.
    ///
    /// # Errors
    ///
    /// See [`TransportConfig::from_vars`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load transport settings from a `HashMap` (for testing).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidHttpTimeout` if
    /// `NUDGIS_HTTP_TIMEOUT_SECONDS` is not a positive integer.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let request_timeout = if let Some(value_str) = vars.get("NUDGIS_HTTP_TIMEOUT_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidHttpTimeout(format!(
                    "NUDGIS_HTTP_TIMEOUT_SECONDS must be a valid positive integer, got '{value_str}': {e}"
                ))
            })?;

            if value == 0 {
                return Err(ConfigError::InvalidHttpTimeout(
                    "NUDGIS_HTTP_TIMEOUT_SECONDS must be greater than 0".to_string(),
                ));
            }

            Duration::from_secs(value)
        } else {
            DEFAULT_HTTP_TIMEOUT
        };

        Ok(Self {
            request_timeout,
            // Never wait longer to connect than for the whole request.
            connect_timeout: DEFAULT_CONNECT_TIMEOUT.min(request_timeout),
        })
    }
}
