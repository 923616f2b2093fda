//! Nudgis live session driver.
//!
//! Runs the live session handshake outside a host pipeline, for checking an
//! account and platform end to end:
//!
//! - `nudgis-service probe` checks the API key.
//! - `nudgis-service [initialize]` prepares and starts a session, prints the
//!   RTMP server URI and stream key, waits for Enter, then stops it.
//!
//! Configuration comes from the environment (`NUDGIS_URL`, `NUDGIS_API_KEY`,
//! `NUDGIS_STREAM_TITLE`, `NUDGIS_STREAM_CHANNEL`, `NUDGIS_PROFILE_DIR`,
//! `NUDGIS_VIDEO_*`, `NUDGIS_AUDIO_BITRATE_KBPS`).

use anyhow::{bail, Context};
use common::config::ObservabilityConfig;
use common::observability::init_tracing;
use nudgis_service::{
    JsonFileProfileStore, KeyframeEnforcer, ReqwestTransport, SessionConfig, SessionController,
    StaticOutput, TransportConfig, VideoOutputInfo,
};
use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::str::FromStr;
use tracing::{error, info};

fn main() -> anyhow::Result<()> {
    let vars: HashMap<String, String> = std::env::vars().collect();

    let observability = ObservabilityConfig::from_vars(&vars)?;
    init_tracing(&observability);

    let mode = std::env::args().nth(1).unwrap_or_else(|| "initialize".to_string());

    let config = SessionConfig::from_vars(&vars).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;
    let transport_config = TransportConfig::from_vars(&vars)?;

    info!(
        base_url = %config.base_url,
        request_timeout_secs = transport_config.request_timeout.as_secs(),
        "Configuration loaded successfully"
    );

    let transport = ReqwestTransport::new(&transport_config)?;
    let keyframes = match vars.get("NUDGIS_PROFILE_DIR") {
        Some(dir) => KeyframeEnforcer::new(Box::new(JsonFileProfileStore::in_profile_dir(dir))),
        None => KeyframeEnforcer::live_encoder_only(),
    };

    let mut controller = SessionController::new(config, transport, keyframes);

    match mode.as_str() {
        "probe" => {
            if !controller.probe() {
                bail!("API probe failed");
            }
            println!("API key accepted by {}", controller.config().base_url);
        }
        "initialize" => {
            let mut output = output_from_vars(&vars)?;

            if !controller.initialize(&mut output) {
                bail!("Live session could not be started");
            }

            println!("server: {}", controller.server_uri());
            println!("key:    {}", controller.stream_key());
            print!("Streaming session open, press Enter to stop... ");
            io::stdout().flush()?;

            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;

            controller.deactivate();
            info!(state = %controller.state(), "Live session driver finished");
        }
        other => bail!("Unknown mode '{other}', expected 'initialize' or 'probe'"),
    }

    Ok(())
}

/// Describe the would-be encoder from `NUDGIS_VIDEO_*` / `NUDGIS_AUDIO_*`.
fn output_from_vars(vars: &HashMap<String, String>) -> anyhow::Result<StaticOutput> {
    let defaults = StaticOutput::default();

    Ok(StaticOutput {
        video: VideoOutputInfo {
            width: parse_var(vars, "NUDGIS_VIDEO_WIDTH", defaults.video.width)?,
            height: parse_var(vars, "NUDGIS_VIDEO_HEIGHT", defaults.video.height)?,
            fps_num: parse_var(vars, "NUDGIS_VIDEO_FPS", defaults.video.fps_num)?,
            fps_den: 1,
        },
        video_bitrate_kbps: parse_var(
            vars,
            "NUDGIS_VIDEO_BITRATE_KBPS",
            defaults.video_bitrate_kbps,
        )?,
        audio_bitrate_kbps: parse_var(
            vars,
            "NUDGIS_AUDIO_BITRATE_KBPS",
            defaults.audio_bitrate_kbps,
        )?,
        keyint_sec: defaults.keyint_sec,
    })
}

fn parse_var<V>(vars: &HashMap<String, String>, name: &str, default: V) -> anyhow::Result<V>
where
    V: FromStr,
    V::Err: std::error::Error + Send + Sync + 'static,
{
    match vars.get(name) {
        Some(value) => value
            .parse()
            .with_context(|| format!("{name} must be a valid number, got '{value}'")),
        None => Ok(default),
    }
}
