//! Host output boundary.
//!
//! The host pipeline hands the controller an output handle exposing the
//! encoders bound to the outgoing stream. Only the settings the handshake needs
//! are surfaced here.

/// Geometry and timing of the video the output produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoOutputInfo {
    pub width: u32,
    pub height: u32,
    /// Frame rate numerator.
    pub fps_num: u32,
    /// Frame rate denominator.
    pub fps_den: u32,
}

/// Encoder state of an output about to start streaming.
pub trait OutputHandle {
    /// Video geometry and frame rate of the output.
    fn video_info(&self) -> VideoOutputInfo;

    /// Video encoder bitrate, in kilobits per second.
    fn video_bitrate_kbps(&self) -> u32;

    /// Audio encoder bitrate, in kilobits per second.
    fn audio_bitrate_kbps(&self) -> u32;

    /// Keyframe interval of the live video encoder, in seconds (0 = encoder default).
    fn video_keyint_sec(&self) -> i64;

    /// Replace the keyframe interval of the live video encoder.
    ///
    /// Takes effect for the current encoder instance only; nothing is persisted.
    fn set_video_keyint_sec(&mut self, keyint_sec: i64);
}

/// An output whose settings are fixed values.
///
/// Used by the command-line driver, where no host pipeline exists, and by
/// tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticOutput {
    pub video: VideoOutputInfo,
    pub video_bitrate_kbps: u32,
    pub audio_bitrate_kbps: u32,
    pub keyint_sec: i64,
}

impl Default for StaticOutput {
    fn default() -> Self {
        Self {
            video: VideoOutputInfo {
                width: 1280,
                height: 720,
                fps_num: 30,
                fps_den: 1,
            },
            video_bitrate_kbps: 2500,
            audio_bitrate_kbps: 160,
            keyint_sec: 0,
        }
    }
}

impl OutputHandle for StaticOutput {
    fn video_info(&self) -> VideoOutputInfo {
        self.video
    }

    fn video_bitrate_kbps(&self) -> u32 {
        self.video_bitrate_kbps
    }

    fn audio_bitrate_kbps(&self) -> u32 {
        self.audio_bitrate_kbps
    }

    fn video_keyint_sec(&self) -> i64 {
        self.keyint_sec
    }

    fn set_video_keyint_sec(&mut self, keyint_sec: i64) {
        self.keyint_sec = keyint_sec;
    }
}
