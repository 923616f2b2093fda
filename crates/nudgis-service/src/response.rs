//! Response decoding for the live session API.
//!
//! Decoding never fails. Absent, mistyped, or unparsable fields take the
//! documented defaults, and a body that is not JSON at all decodes exactly like
//! a response reporting `success: false`.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

/// Server URI used until `prepare` provides one.
pub const DEFAULT_SERVER_URI: &str = "rtmp";

/// Stream key used until `prepare` provides one.
pub const DEFAULT_STREAM_KEY: &str = "stream_id";

/// Session identifier used when `prepare` omits it.
pub const DEFAULT_OID: &str = "oid";

/// Decoded `prepare` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrepareResult {
    pub success: bool,
    pub server_uri: String,
    pub stream_key: String,
    pub oid: String,
}

impl Default for PrepareResult {
    fn default() -> Self {
        Self {
            success: false,
            server_uri: DEFAULT_SERVER_URI.to_string(),
            stream_key: DEFAULT_STREAM_KEY.to_string(),
            oid: DEFAULT_OID.to_string(),
        }
    }
}

/// Decoded `start`/`stop`/probe response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActionResult {
    pub success: bool,
}

#[derive(Deserialize)]
struct PrepareResponseBody {
    #[serde(default, deserialize_with = "strict_bool")]
    success: bool,
    #[serde(default, deserialize_with = "string_or_none")]
    oid: Option<String>,
    #[serde(default, deserialize_with = "first_stream")]
    streams: Option<StreamEndpointBody>,
}

#[derive(Deserialize)]
struct StreamEndpointBody {
    #[serde(default, deserialize_with = "string_or_none")]
    server_uri: Option<String>,
    #[serde(default, deserialize_with = "string_or_none")]
    stream_id: Option<String>,
}

#[derive(Deserialize)]
struct ActionResponseBody {
    #[serde(default, deserialize_with = "strict_bool")]
    success: bool,
}

/// Only a JSON `true` counts as success.
fn strict_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(matches!(Value::deserialize(deserializer)?, Value::Bool(true)))
}

fn string_or_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

/// Element 0 of the `streams` array, if it is an object.
fn first_stream<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<StreamEndpointBody>, D::Error> {
    let Value::Array(streams) = Value::deserialize(deserializer)? else {
        return Ok(None);
    };

    Ok(streams
        .into_iter()
        .next()
        .and_then(|stream| StreamEndpointBody::deserialize(stream).ok()))
}

/// Decode a `prepare` response body.
#[must_use]
pub fn parse_prepare_response(body: &str) -> PrepareResult {
    let decoded: PrepareResponseBody = match serde_json::from_str(body) {
        Ok(decoded) => decoded,
        Err(e) => {
            debug!(target: "nudgis.response", error = %e, "Unparsable prepare response");
            return PrepareResult::default();
        }
    };

    let (server_uri, stream_key) = match decoded.streams {
        Some(stream) => (stream.server_uri, stream.stream_id),
        None => (None, None),
    };

    PrepareResult {
        success: decoded.success,
        server_uri: server_uri.unwrap_or_else(|| DEFAULT_SERVER_URI.to_string()),
        stream_key: stream_key.unwrap_or_else(|| DEFAULT_STREAM_KEY.to_string()),
        oid: decoded.oid.unwrap_or_else(|| DEFAULT_OID.to_string()),
    }
}

/// Decode a `start`/`stop`/probe response body.
#[must_use]
pub fn parse_action_response(body: &str) -> ActionResult {
    match serde_json::from_str::<ActionResponseBody>(body) {
        Ok(decoded) => ActionResult {
            success: decoded.success,
        },
        Err(e) => {
            debug!(target: "nudgis.response", error = %e, "Unparsable action response");
            ActionResult::default()
        }
    }
}
