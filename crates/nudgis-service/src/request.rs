//! Request construction for the live session API.
//!
//! Each handshake step is a POST of a URL-encoded form to a fixed path under
//! the platform base URL. Builders are pure: the same inputs always yield the
//! same URL and body, with fields in protocol order.

use crate::config::SessionConfig;
use crate::descriptor::StreamDescriptor;
use common::secret::ExposeSecret;
use std::fmt;
use thiserror::Error;
use url::form_urlencoded;

/// Path of the session preparation endpoint.
pub const PREPARE_PATH: &str = "/api/v2/lives/prepare/";

/// Path of the session start endpoint.
pub const START_PATH: &str = "/api/v2/lives/start/";

/// Path of the session stop endpoint.
pub const STOP_PATH: &str = "/api/v2/lives/stop/";

/// Root of the v2 API, used to probe credentials.
pub const API_BASE_PATH: &str = "/api/v2/";

/// Only single-stream sessions are negotiated.
pub const MULTI_STREAMS: &str = "no";

#[derive(Debug, Error)]
pub enum RequestError {
    /// The stream descriptor could not be encoded as JSON.
    #[error("Failed to encode streams field: {0}")]
    StreamsEncoding(#[from] serde_json::Error),
}

/// A URL plus its form-encoded body.
#[derive(Clone, PartialEq, Eq)]
pub struct FormRequest {
    pub url: String,
    pub body: String,
}

impl FormRequest {
    /// Names of the body fields, in order.
    #[must_use]
    pub fn field_names(&self) -> Vec<String> {
        form_urlencoded::parse(self.body.as_bytes())
            .map(|(name, _)| name.into_owned())
            .collect()
    }

    /// Decoded value of the first body field called `name`.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<String> {
        form_urlencoded::parse(self.body.as_bytes())
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.into_owned())
    }
}

/// Bodies carry the API key, so only the URL and field names are shown.
impl fmt::Debug for FormRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormRequest")
            .field("url", &self.url)
            .field("fields", &self.field_names())
            .finish()
    }
}

/// Build the `prepare` request announcing `descriptor`.
///
/// Body fields: `api_key`, `multi_streams`, `streams` (JSON array holding the
/// descriptor), `title`, `channel`.
///
/// # Errors
///
/// Returns `RequestError::StreamsEncoding` if the descriptor cannot be
/// serialized.
pub fn build_prepare_request(
    config: &SessionConfig,
    descriptor: &StreamDescriptor,
) -> Result<FormRequest, RequestError> {
    let streams = serde_json::to_string(std::slice::from_ref(descriptor))?;

    let body = form_urlencoded::Serializer::new(String::new())
        .append_pair("api_key", config.api_key.expose_secret())
        .append_pair("multi_streams", MULTI_STREAMS)
        .append_pair("streams", &streams)
        .append_pair("title", &config.stream_title)
        .append_pair("channel", &config.stream_channel)
        .finish();

    Ok(FormRequest {
        url: endpoint(config, PREPARE_PATH),
        body,
    })
}

/// Build the `start` request for session `oid`.
#[must_use]
pub fn build_start_request(config: &SessionConfig, oid: &str) -> FormRequest {
    FormRequest {
        url: endpoint(config, START_PATH),
        body: session_body(config, oid),
    }
}

/// Build the `stop` request for session `oid`.
#[must_use]
pub fn build_stop_request(config: &SessionConfig, oid: &str) -> FormRequest {
    FormRequest {
        url: endpoint(config, STOP_PATH),
        body: session_body(config, oid),
    }
}

/// Build the credential probe URL (`GET`, API key in the query string).
#[must_use]
pub fn build_api_probe_url(config: &SessionConfig) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("api_key", config.api_key.expose_secret())
        .finish();

    format!("{}?{query}", endpoint(config, API_BASE_PATH))
}

fn endpoint(config: &SessionConfig, path: &str) -> String {
    format!("{}{path}", config.base_url)
}

fn session_body(config: &SessionConfig, oid: &str) -> String {
    form_urlencoded::Serializer::new(String::new())
        .append_pair("api_key", config.api_key.expose_secret())
        .append_pair("oid", oid)
        .finish()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::secret::SecretString;

    fn test_config() -> SessionConfig {
        SessionConfig::new(
            "https://live.example.com",
            SecretString::from("key-123"),
            "Weekly seminar",
            "research",
        )
    }

    fn test_descriptor() -> StreamDescriptor {
        StreamDescriptor {
            width: 1920,
            height: 1080,
            video_bitrate_bps: 4_500_000,
            audio_bitrate_bps: 160_000,
            framerate: 30,
        }
    }

    #[test]
    fn test_prepare_request_fields_in_order() {
        let request = build_prepare_request(&test_config(), &test_descriptor()).unwrap();

        assert_eq!(request.url, "https://live.example.com/api/v2/lives/prepare/");
        assert_eq!(
            request.field_names(),
            vec!["api_key", "multi_streams", "streams", "title", "channel"]
        );
        assert_eq!(request.field("api_key").as_deref(), Some("key-123"));
        assert_eq!(request.field("multi_streams").as_deref(), Some("no"));
        assert_eq!(request.field("title").as_deref(), Some("Weekly seminar"));
        assert_eq!(request.field("channel").as_deref(), Some("research"));
    }

    #[test]
    fn test_prepare_request_streams_is_single_element_array() {
        let request = build_prepare_request(&test_config(), &test_descriptor()).unwrap();

        let streams: serde_json::Value =
            serde_json::from_str(&request.field("streams").unwrap()).unwrap();
        assert_eq!(
            streams,
            serde_json::json!([{
                "width": 1920,
                "height": 1080,
                "video_bitrate": 4_500_000,
                "audio_bitrate": 160_000,
                "framerate": 30
            }])
        );
    }

    #[test]
    fn test_prepare_request_encodes_reserved_characters() {
        let config = SessionConfig::new(
            "https://live.example.com",
            SecretString::from("key-123"),
            "Q&A = live",
            "a/b",
        );

        let request = build_prepare_request(&config, &test_descriptor()).unwrap();

        // Still exactly five fields: the '&' and '=' in the title are escaped.
        assert_eq!(request.field_names().len(), 5);
        assert_eq!(request.field("title").as_deref(), Some("Q&A = live"));
        assert_eq!(request.field("channel").as_deref(), Some("a/b"));
        assert!(!request.body.contains("Q&A"));
    }

    #[test]
    fn test_start_request() {
        let request = build_start_request(&test_config(), "42");

        assert_eq!(request.url, "https://live.example.com/api/v2/lives/start/");
        assert_eq!(request.body, "api_key=key-123&oid=42");
    }

    #[test]
    fn test_stop_request() {
        let request = build_stop_request(&test_config(), "42");

        assert_eq!(request.url, "https://live.example.com/api/v2/lives/stop/");
        assert_eq!(request.body, "api_key=key-123&oid=42");
    }

    #[test]
    fn test_builders_are_deterministic() {
        let config = test_config();
        let descriptor = test_descriptor();

        assert_eq!(
            build_prepare_request(&config, &descriptor).unwrap(),
            build_prepare_request(&config, &descriptor).unwrap()
        );
        assert_eq!(
            build_stop_request(&config, "abc"),
            build_stop_request(&config, "abc")
        );
    }

    #[test]
    fn test_api_probe_url() {
        assert_eq!(
            build_api_probe_url(&test_config()),
            "https://live.example.com/api/v2/?api_key=key-123"
        );
    }

    #[test]
    fn test_debug_hides_body() {
        let request = build_start_request(&test_config(), "42");

        let debug_str = format!("{request:?}");
        assert!(!debug_str.contains("key-123"));
        assert!(debug_str.contains("api_key"));
        assert!(debug_str.contains("/api/v2/lives/start/"));
    }
}
