//! Configurations and canned platform responses.

use common::secret::SecretString;
use nudgis_service::{SessionConfig, StaticOutput, VideoOutputInfo};
use serde_json::json;

pub use nudgis_service::request::{API_BASE_PATH, PREPARE_PATH, START_PATH, STOP_PATH};

pub const TEST_API_KEY: &str = "test-api-key";
pub const TEST_STREAM_TITLE: &str = "Weekly seminar";
pub const TEST_STREAM_CHANNEL: &str = "lectures";

/// Session configuration pointing at `base_url`.
pub fn test_config(base_url: &str) -> SessionConfig {
    SessionConfig::new(
        base_url,
        SecretString::from(TEST_API_KEY),
        TEST_STREAM_TITLE,
        TEST_STREAM_CHANNEL,
    )
}

/// A successful prepare response carrying one stream.
pub fn prepare_success_body(oid: &str, server_uri: &str, stream_key: &str) -> String {
    json!({
        "success": true,
        "oid": oid,
        "streams": [{ "server_uri": server_uri, "stream_id": stream_key }]
    })
    .to_string()
}

/// A start or stop response.
pub fn action_body(success: bool) -> String {
    json!({ "success": success }).to_string()
}

/// 1920x1080 at 25 fps, 4500 kbps video, 128 kbps audio.
pub fn hd_output() -> StaticOutput {
    StaticOutput {
        video: VideoOutputInfo {
            width: 1920,
            height: 1080,
            fps_num: 25,
            fps_den: 1,
        },
        video_bitrate_kbps: 4500,
        audio_bitrate_kbps: 128,
        keyint_sec: 0,
    }
}
