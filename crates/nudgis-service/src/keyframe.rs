//! Keyframe interval enforcement.
//!
//! The platform segments incoming streams on keyframes and requires a fixed
//! interval. Before a session is prepared, the interval is written to both the
//! persisted encoder profile and the live encoder of the output. Each write
//! happens only if the current value differs, so enforcing twice with the same
//! target writes nothing the second time.

use crate::output::OutputHandle;
use crate::profile::{ProfileError, ProfileStore};
use tracing::{debug, info, warn};

/// Keyframe interval, in seconds, required by the platform.
pub const DEFAULT_KEYINT_SEC: i64 = 3;

/// Which of the two writes an enforcement performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnforceOutcome {
    /// The persisted profile document was rewritten.
    pub profile_updated: bool,
    /// The live encoder setting was replaced.
    pub encoder_updated: bool,
}

/// Applies a keyframe interval to the encoder profile and the live encoder.
pub struct KeyframeEnforcer {
    profile: Option<Box<dyn ProfileStore + Send>>,
}

impl std::fmt::Debug for KeyframeEnforcer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyframeEnforcer")
            .field("has_profile", &self.profile.is_some())
            .finish()
    }
}

impl KeyframeEnforcer {
    /// Enforce on `profile` and on the live encoder.
    #[must_use]
    pub fn new(profile: Box<dyn ProfileStore + Send>) -> Self {
        Self {
            profile: Some(profile),
        }
    }

    /// Enforce on the live encoder only, for hosts without a profile document.
    #[must_use]
    pub fn live_encoder_only() -> Self {
        Self { profile: None }
    }

    /// Apply `target_keyint_sec` to the profile and to `output`'s video encoder.
    ///
    /// A profile that cannot be read or written is logged and skipped; the
    /// live encoder is still updated.
    pub fn enforce<O: OutputHandle + ?Sized>(
        &self,
        target_keyint_sec: i64,
        output: &mut O,
    ) -> EnforceOutcome {
        let profile_updated = match &self.profile {
            Some(store) => match enforce_on_profile(store.as_ref(), target_keyint_sec) {
                Ok(updated) => updated,
                Err(e) => {
                    warn!(
                        target: "nudgis.keyframe",
                        error = %e,
                        "Could not enforce keyframe interval on encoder profile"
                    );
                    false
                }
            },
            None => false,
        };

        let current = output.video_keyint_sec();
        let encoder_updated = current != target_keyint_sec;
        if encoder_updated {
            output.set_video_keyint_sec(target_keyint_sec);
            info!(
                target: "nudgis.keyframe",
                from = current,
                to = target_keyint_sec,
                "Live encoder keyframe interval updated"
            );
        }

        EnforceOutcome {
            profile_updated,
            encoder_updated,
        }
    }
}

fn enforce_on_profile(
    store: &(dyn ProfileStore + Send),
    target_keyint_sec: i64,
) -> Result<bool, ProfileError> {
    let mut document = store.load()?;

    let current = document.keyint_sec();
    if current == target_keyint_sec {
        debug!(
            target: "nudgis.keyframe",
            keyint_sec = current,
            "Encoder profile already at target keyframe interval"
        );
        return Ok(false);
    }

    document.set_keyint_sec(target_keyint_sec);
    store.save(&document)?;

    info!(
        target: "nudgis.keyframe",
        from = current,
        to = target_keyint_sec,
        "Encoder profile keyframe interval updated"
    );
    Ok(true)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::output::StaticOutput;
    use crate::profile::ProfileDocument;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// In-memory store sharing its state with the test through `Arc`s.
    #[derive(Clone, Default)]
    struct SharedStore {
        document: Arc<Mutex<Option<ProfileDocument>>>,
        saves: Arc<AtomicUsize>,
    }

    impl SharedStore {
        fn with_keyint(keyint_sec: i64) -> Self {
            let mut document = ProfileDocument::default();
            document.set_keyint_sec(keyint_sec);
            Self {
                document: Arc::new(Mutex::new(Some(document))),
                saves: Arc::default(),
            }
        }
    }

    impl ProfileStore for SharedStore {
        fn load(&self) -> Result<ProfileDocument, ProfileError> {
            self.document
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| ProfileError::NotFound("memory".into()))
        }

        fn save(&self, document: &ProfileDocument) -> Result<(), ProfileError> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            *self.document.lock().unwrap() = Some(document.clone());
            Ok(())
        }
    }

    #[test]
    fn test_enforce_updates_both_when_different() {
        let store = SharedStore::with_keyint(0);
        let enforcer = KeyframeEnforcer::new(Box::new(store.clone()));
        let mut output = StaticOutput::default();

        let outcome = enforcer.enforce(3, &mut output);

        assert_eq!(
            outcome,
            EnforceOutcome {
                profile_updated: true,
                encoder_updated: true,
            }
        );
        assert_eq!(output.keyint_sec, 3);
        assert_eq!(store.load().unwrap().keyint_sec(), 3);
        assert_eq!(store.saves.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_enforce_is_idempotent() {
        let store = SharedStore::with_keyint(3);
        let enforcer = KeyframeEnforcer::new(Box::new(store.clone()));
        let mut output = StaticOutput::default();

        enforcer.enforce(3, &mut output);
        let second = enforcer.enforce(3, &mut output);

        assert_eq!(second, EnforceOutcome::default());
        assert_eq!(store.saves.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_profile_failure_does_not_block_live_encoder() {
        let store = SharedStore::default();
        let enforcer = KeyframeEnforcer::new(Box::new(store.clone()));
        let mut output = StaticOutput::default();

        let outcome = enforcer.enforce(3, &mut output);

        assert!(!outcome.profile_updated);
        assert!(outcome.encoder_updated);
        assert_eq!(output.keyint_sec, 3);
    }

    #[test]
    fn test_live_encoder_only() {
        let enforcer = KeyframeEnforcer::live_encoder_only();
        let mut output = StaticOutput {
            keyint_sec: 3,
            ..StaticOutput::default()
        };

        assert_eq!(enforcer.enforce(3, &mut output), EnforceOutcome::default());

        let outcome = enforcer.enforce(2, &mut output);
        assert!(outcome.encoder_updated);
        assert_eq!(output.keyint_sec, 2);
    }
}
