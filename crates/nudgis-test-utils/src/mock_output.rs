//! Output handle that counts live encoder writes.

use nudgis_service::{OutputHandle, StaticOutput, VideoOutputInfo};

/// Wraps a `StaticOutput` and records every keyframe interval write.
#[derive(Debug, Clone, Default)]
pub struct MockOutput {
    pub inner: StaticOutput,
    keyint_writes: Vec<i64>,
}

impl MockOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an encoder already at `keyint_sec`.
    pub fn with_keyint_sec(mut self, keyint_sec: i64) -> Self {
        self.inner.keyint_sec = keyint_sec;
        self
    }

    pub fn with_video(mut self, video: VideoOutputInfo) -> Self {
        self.inner.video = video;
        self
    }

    pub fn with_bitrates(mut self, video_kbps: u32, audio_kbps: u32) -> Self {
        self.inner.video_bitrate_kbps = video_kbps;
        self.inner.audio_bitrate_kbps = audio_kbps;
        self
    }

    /// Values written through `set_video_keyint_sec`, in order.
    pub fn keyint_writes(&self) -> &[i64] {
        &self.keyint_writes
    }
}

impl OutputHandle for MockOutput {
    fn video_info(&self) -> VideoOutputInfo {
        self.inner.video_info()
    }

    fn video_bitrate_kbps(&self) -> u32 {
        self.inner.video_bitrate_kbps()
    }

    fn audio_bitrate_kbps(&self) -> u32 {
        self.inner.audio_bitrate_kbps()
    }

    fn video_keyint_sec(&self) -> i64 {
        self.inner.video_keyint_sec()
    }

    fn set_video_keyint_sec(&mut self, keyint_sec: i64) {
        self.keyint_writes.push(keyint_sec);
        self.inner.set_video_keyint_sec(keyint_sec);
    }
}
