//! Nudgis live session controller.
//!
//! Negotiates a live-ingest session with the Nudgis platform before an
//! outgoing stream starts:
//!
//! 1. Force the encoder keyframe interval the platform requires
//!    ([`keyframe`]).
//! 2. `prepare` - announce the stream geometry and bitrates, receive the RTMP
//!    server URI, stream key and session `oid`.
//! 3. `start` - open the session identified by `oid`.
//! 4. `stop` - close it when the output is torn down.
//!
//! [`controller::SessionController`] drives the handshake. Request bodies are
//! built by [`request`], responses decoded by [`response`], and all network
//! I/O goes through the [`transport::HttpTransport`] seam so hosts and tests
//! can substitute their own transport.

#![warn(clippy::pedantic)]

pub mod config;
pub mod controller;
pub mod descriptor;
pub mod keyframe;
pub mod output;
pub mod profile;
pub mod request;
pub mod response;
pub mod transport;
pub mod version;

pub use config::{ConfigError, SessionConfig, TransportConfig};
pub use controller::{SessionController, SessionState, StreamKeyStore, StreamKeyStoreError};
pub use descriptor::StreamDescriptor;
pub use keyframe::{EnforceOutcome, KeyframeEnforcer, DEFAULT_KEYINT_SEC};
pub use output::{OutputHandle, StaticOutput, VideoOutputInfo};
pub use profile::{JsonFileProfileStore, ProfileDocument, ProfileError, ProfileStore};
pub use request::{FormRequest, RequestError};
pub use response::{ActionResult, PrepareResult};
pub use transport::{HttpTransport, ReqwestTransport, TransportError};
pub use version::ServerVersion;
