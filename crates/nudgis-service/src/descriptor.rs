//! Stream descriptor announced during `prepare`.

use crate::output::OutputHandle;
use serde::Serialize;

/// Encoders report bitrates in kilobits; the platform expects bits.
pub const BITS_PER_KILOBIT: u64 = 1000;

/// Encoding parameters of the single stream announced to the platform.
///
/// Serializes to the wire object
/// `{width, height, video_bitrate, audio_bitrate, framerate}`, bitrates in
/// bits per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StreamDescriptor {
    pub width: u32,
    pub height: u32,
    #[serde(rename = "video_bitrate")]
    pub video_bitrate_bps: u64,
    #[serde(rename = "audio_bitrate")]
    pub audio_bitrate_bps: u64,
    pub framerate: u32,
}

impl StreamDescriptor {
    /// Snapshot the current encoder state of `output`.
    ///
    /// `framerate` is the output's frame-rate numerator.
    #[must_use]
    pub fn from_output<O: OutputHandle + ?Sized>(output: &O) -> Self {
        let video = output.video_info();

        Self {
            width: video.width,
            height: video.height,
            video_bitrate_bps: u64::from(output.video_bitrate_kbps()) * BITS_PER_KILOBIT,
            audio_bitrate_bps: u64::from(output.audio_bitrate_kbps()) * BITS_PER_KILOBIT,
            framerate: video.fps_num,
        }
    }
}
