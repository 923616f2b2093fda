//! Secret types for protecting sensitive values from accidental logging.
//!
//! Re-exports [`secrecy`] so every crate in the workspace holds the platform
//! API key the same way. `SecretString` implements `Debug` with redaction, so a
//! struct deriving `Debug` around it can be passed to `tracing` freely.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct Credentials {
//!     account: String,
//!     api_key: SecretString,
//! }
//!
//! let creds = Credentials {
//!     account: "studio-a".to_string(),
//!     api_key: SecretString::from("k-123"),
//! };
//!
//! assert!(!format!("{creds:?}").contains("k-123"));
//! assert_eq!(creds.api_key.expose_secret(), "k-123");
//! ```
//!
//! Only call `expose_secret()` at the point the value goes on the wire (form
//! bodies, query strings), never to build log fields.

pub use secrecy::{ExposeSecret, SecretString};
