//! Live session controller.
//!
//! One controller drives one streaming attempt through the platform handshake:
//!
//! ```text
//! Idle --initialize--> Preparing --ok--> Prepared --> Starting --ok--> Active
//!                          |                              |
//!                          +----------fail----------------+--> Failed
//!
//! Active --deactivate--> Stopping --> Stopped   (whatever stop returns)
//! ```
//!
//! `Stopped` and `Failed` are terminal: the host creates a fresh controller for
//! the next attempt. Every remote step is attempted exactly once. Transport
//! errors, `success: false` and undecodable bodies all fail the step the same
//! way, and the host only ever sees the boolean outcome of `initialize`.
//!
//! The host serializes `initialize` and `deactivate` (an output is never
//! restarted before its teardown completes), so the controller holds no locks.

use crate::config::SessionConfig;
use crate::descriptor::StreamDescriptor;
use crate::keyframe::{KeyframeEnforcer, DEFAULT_KEYINT_SEC};
use crate::output::OutputHandle;
use crate::request::{
    build_api_probe_url, build_prepare_request, build_start_request, build_stop_request,
    FormRequest,
};
use crate::response::{
    parse_action_response, parse_prepare_response, PrepareResult, DEFAULT_SERVER_URI,
    DEFAULT_STREAM_KEY,
};
use crate::transport::{HttpTransport, TransportError};
use crate::version::ServerVersion;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, `initialize` not called yet.
    Idle,
    /// Keyframe enforcement and the `prepare` request are in flight.
    Preparing,
    /// `prepare` succeeded; server URI, stream key and oid are known.
    Prepared,
    /// The `start` request is in flight.
    Starting,
    /// The platform accepted the session; the host may stream.
    Active,
    /// The `stop` request is in flight.
    Stopping,
    /// Torn down. Terminal.
    Stopped,
    /// `prepare` or `start` failed. Terminal.
    Failed,
}

impl SessionState {
    /// Whether the instance can no longer make progress.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Stopped | SessionState::Failed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Preparing => "preparing",
            SessionState::Prepared => "prepared",
            SessionState::Starting => "starting",
            SessionState::Active => "active",
            SessionState::Stopping => "stopping",
            SessionState::Stopped => "stopped",
            SessionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
#[error("Failed to store stream key: {0}")]
pub struct StreamKeyStoreError(pub String);

/// Host-side persistence of the negotiated stream key.
///
/// Lets the host show the key in its own settings once `prepare` succeeds.
pub trait StreamKeyStore {
    /// Persist `stream_key`.
    ///
    /// # Errors
    ///
    /// Returns `StreamKeyStoreError` if the key could not be persisted.
    fn save_stream_key(&mut self, stream_key: &str) -> Result<(), StreamKeyStoreError>;
}

/// Handshake steps, used for logging.
#[derive(Debug, Clone, Copy)]
enum Step {
    Prepare,
    Start,
    Stop,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Step::Prepare => "prepare",
            Step::Start => "start",
            Step::Stop => "stop",
        })
    }
}

/// Why a step did not succeed.
#[derive(Debug, Error)]
enum StepError {
    #[error("could not build request: {0}")]
    Request(#[from] crate::request::RequestError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("platform reported failure")]
    Rejected,
}

/// Drives the prepare/start/stop handshake for one streaming attempt.
pub struct SessionController<T: HttpTransport> {
    config: SessionConfig,
    transport: T,
    keyframes: KeyframeEnforcer,
    keyint_sec: i64,
    stream_key_store: Option<Box<dyn StreamKeyStore + Send>>,
    state: SessionState,
    server_uri: String,
    stream_key: String,
    oid: Option<String>,
}

impl<T: HttpTransport> fmt::Debug for SessionController<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionController")
            .field("config", &self.config)
            .field("keyint_sec", &self.keyint_sec)
            .field("state", &self.state)
            .field("server_uri", &self.server_uri)
            .field("stream_key", &"[REDACTED]")
            .field("oid", &self.oid)
            .finish_non_exhaustive()
    }
}

impl<T: HttpTransport> SessionController<T> {
    /// Create a controller in the `Idle` state.
    ///
    /// Server URI and stream key read as their defaults (`"rtmp"`,
    /// `"stream_id"`) until `prepare` succeeds.
    #[must_use]
    pub fn new(config: SessionConfig, transport: T, keyframes: KeyframeEnforcer) -> Self {
        Self {
            config,
            transport,
            keyframes,
            keyint_sec: DEFAULT_KEYINT_SEC,
            stream_key_store: None,
            state: SessionState::Idle,
            server_uri: DEFAULT_SERVER_URI.to_string(),
            stream_key: DEFAULT_STREAM_KEY.to_string(),
            oid: None,
        }
    }

    /// Persist the stream key through `store` after a successful `prepare`.
    #[must_use]
    pub fn with_stream_key_store(mut self, store: Box<dyn StreamKeyStore + Send>) -> Self {
        self.stream_key_store = Some(store);
        self
    }

    /// Override the enforced keyframe interval (default: 3 seconds).
    #[must_use]
    pub fn with_keyint_sec(mut self, keyint_sec: i64) -> Self {
        self.keyint_sec = keyint_sec;
        self
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// RTMP server URI negotiated by `prepare`, or `"rtmp"` before that.
    #[must_use]
    pub fn server_uri(&self) -> &str {
        &self.server_uri
    }

    /// Stream key negotiated by `prepare`, or `"stream_id"` before that.
    #[must_use]
    pub fn stream_key(&self) -> &str {
        &self.stream_key
    }

    /// Remote session identifier, known once `prepare` succeeded.
    #[must_use]
    pub fn oid(&self) -> Option<&str> {
        self.oid.as_deref()
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// API version the request and response formats follow.
    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn server_version(&self) -> ServerVersion {
        ServerVersion::TARGET
    }

    fn transition(&mut self, to: SessionState) {
        debug!(
            target: "nudgis.controller",
            from = %self.state,
            to = %to,
            "Session state transition"
        );
        self.state = to;
    }

    fn fail(&mut self, step: Step, error: &StepError) -> bool {
        warn!(
            target: "nudgis.controller",
            step = %step,
            error = %error,
            "Live session step failed"
        );
        self.transition(SessionState::Failed);
        false
    }

    /// Enforce the keyframe interval, then prepare and start the session.
    ///
    /// Returns `true` only if both `prepare` and `start` succeed. A failed
    /// `prepare` short-circuits: `start` is never attempted. Calling this on a
    /// controller that is not `Idle` returns `false` and does nothing.
    #[instrument(skip_all, fields(base_url = %self.config.base_url))]
    pub fn initialize<O: OutputHandle + ?Sized>(&mut self, output: &mut O) -> bool {
        if self.state != SessionState::Idle {
            warn!(
                target: "nudgis.controller",
                state = %self.state,
                "initialize called on a used session"
            );
            return false;
        }

        self.transition(SessionState::Preparing);

        // Must precede any network call: the platform validates the stream
        // against the interval in force at prepare time.
        self.keyframes.enforce(self.keyint_sec, output);

        let descriptor = StreamDescriptor::from_output(&*output);
        let prepared = match self.prepare(&descriptor) {
            Ok(prepared) => prepared,
            Err(e) => return self.fail(Step::Prepare, &e),
        };
        self.accept_prepared(prepared);

        self.transition(SessionState::Starting);
        if let Err(e) = self.start() {
            return self.fail(Step::Start, &e);
        }

        self.transition(SessionState::Active);
        info!(
            target: "nudgis.controller",
            server_uri = %self.server_uri,
            oid = self.oid.as_deref().unwrap_or_default(),
            "Live session started"
        );
        true
    }

    /// Stop the session, best effort.
    ///
    /// The outcome of the `stop` request is logged and otherwise ignored; the
    /// platform expires abandoned sessions on its own. No request is made when
    /// the session oid is unknown.
    #[instrument(skip_all)]
    pub fn deactivate(&mut self) {
        match self.state {
            SessionState::Stopped | SessionState::Stopping => {
                debug!(target: "nudgis.controller", "Session already stopped");
            }
            SessionState::Failed => {
                // start failed after a successful prepare: the remote session
                // exists, so close it, but stay Failed.
                self.stop();
            }
            SessionState::Idle
            | SessionState::Preparing
            | SessionState::Prepared
            | SessionState::Starting
            | SessionState::Active => {
                self.transition(SessionState::Stopping);
                self.stop();
                self.transition(SessionState::Stopped);
            }
        }
    }

    /// Check the API key against the platform.
    ///
    /// Returns `true` if the platform answers the authenticated API root with
    /// `success: true`.
    #[instrument(skip_all, fields(base_url = %self.config.base_url))]
    pub fn probe(&self) -> bool {
        let url = build_api_probe_url(&self.config);

        match self.transport.get(&url) {
            Ok(body) => {
                let success = parse_action_response(&body).success;
                info!(target: "nudgis.controller", success, "API probe completed");
                success
            }
            Err(e) => {
                warn!(target: "nudgis.controller", error = %e, "API probe failed");
                false
            }
        }
    }

    fn post(&self, step: Step, request: &FormRequest) -> Result<String, TransportError> {
        debug!(
            target: "nudgis.controller",
            step = %step,
            url = %request.url,
            body_fields = ?request.field_names(),
            "Sending live session request"
        );
        self.transport.post_form(&request.url, &request.body)
    }

    fn prepare(&self, descriptor: &StreamDescriptor) -> Result<PrepareResult, StepError> {
        let request = build_prepare_request(&self.config, descriptor)?;
        let body = self.post(Step::Prepare, &request)?;

        let prepared = parse_prepare_response(&body);
        if !prepared.success {
            return Err(StepError::Rejected);
        }
        Ok(prepared)
    }

    /// Replace all session fields at once from a successful `prepare`.
    fn accept_prepared(&mut self, prepared: PrepareResult) {
        info!(
            target: "nudgis.controller",
            server_uri = %prepared.server_uri,
            oid = %prepared.oid,
            "Live session prepared"
        );

        self.server_uri = prepared.server_uri;
        self.stream_key = prepared.stream_key;
        self.oid = Some(prepared.oid);
        self.transition(SessionState::Prepared);

        if let Some(store) = self.stream_key_store.as_mut() {
            if let Err(e) = store.save_stream_key(&self.stream_key) {
                warn!(target: "nudgis.controller", error = %e, "Could not persist stream key");
            }
        }
    }

    fn start(&self) -> Result<(), StepError> {
        let Some(oid) = self.oid.as_deref() else {
            return Err(StepError::Rejected);
        };

        let request = build_start_request(&self.config, oid);
        let body = self.post(Step::Start, &request)?;

        if parse_action_response(&body).success {
            Ok(())
        } else {
            Err(StepError::Rejected)
        }
    }

    fn stop(&self) {
        let Some(oid) = self.oid.as_deref() else {
            debug!(target: "nudgis.controller", "No session oid, skipping stop");
            return;
        };

        let request = build_stop_request(&self.config, oid);
        let outcome = self
            .post(Step::Stop, &request)
            .map_err(StepError::from)
            .and_then(|body| {
                if parse_action_response(&body).success {
                    Ok(())
                } else {
                    Err(StepError::Rejected)
                }
            });

        match outcome {
            Ok(()) => info!(target: "nudgis.controller", oid = %oid, "Live session stopped"),
            Err(e) => warn!(
                target: "nudgis.controller",
                oid = %oid,
                error = %e,
                "Stop request failed, ignoring"
            ),
        }
    }
}
