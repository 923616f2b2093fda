//! # Nudgis Test Utilities
//!
//! Mock collaborators and fixtures for exercising the live session controller
//! without a host pipeline or a live platform.
//!
//! ## Modules
//!
//! - `mock_transport` - Scripted `HttpTransport` that records every request
//! - `mock_output` - Output handle counting live encoder writes
//! - `stores` - In-memory profile and stream key stores
//! - `fixtures` - Configs and canned platform responses
//!
//! ## Usage
//!
//! ```rust,ignore
//! use nudgis_test_utils::*;
//! use std::sync::Arc;
//!
//! let transport = Arc::new(
//!     MockTransport::new()
//!         .reply(PREPARE_PATH, prepare_success_body("42", "rtmp://host", "key42"))
//!         .reply(START_PATH, action_body(true)),
//! );
//!
//! let mut controller = SessionController::new(
//!     test_config("https://live.test"),
//!     Arc::clone(&transport),
//!     KeyframeEnforcer::live_encoder_only(),
//! );
//! assert!(controller.initialize(&mut MockOutput::new()));
//! assert_eq!(transport.call_count(START_PATH), 1);
//! ```

pub mod fixtures;
pub mod mock_output;
pub mod mock_transport;
pub mod stores;

// Re-export commonly used items
pub use fixtures::*;
pub use mock_output::*;
pub use mock_transport::*;
pub use stores::*;
