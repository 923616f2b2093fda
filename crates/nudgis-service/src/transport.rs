//! Blocking HTTP transport to the live platform.
//!
//! The controller performs exactly one call per handshake step and blocks
//! until it returns. Connection, timeout and non-2xx outcomes all surface as a
//! `TransportError`; the controller treats every one of them like a response
//! reporting failure.

use crate::config::TransportConfig;
use reqwest::blocking::{Client, Response};
use reqwest::header::CONTENT_TYPE;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument, warn};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Errors from the HTTP transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The request could not be sent or no response arrived (DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The platform answered with a non-success status.
    #[error("Unexpected HTTP status: {0}")]
    Status(u16),

    /// The response body could not be read.
    #[error("Failed to read response body: {0}")]
    Body(String),

    /// The HTTP client could not be built.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// One-shot HTTP calls returning the response body.
pub trait HttpTransport {
    /// POST a form-encoded `body` to `url`.
    ///
    /// # Errors
    ///
    /// Returns a `TransportError` if no 2xx response body could be obtained.
    fn post_form(&self, url: &str, body: &str) -> Result<String, TransportError>;

    /// GET `url`.
    ///
    /// # Errors
    ///
    /// Returns a `TransportError` if no 2xx response body could be obtained.
    fn get(&self, url: &str) -> Result<String, TransportError>;
}

impl<T: HttpTransport + ?Sized> HttpTransport for Arc<T> {
    fn post_form(&self, url: &str, body: &str) -> Result<String, TransportError> {
        (**self).post_form(url, body)
    }

    fn get(&self, url: &str) -> Result<String, TransportError> {
        (**self).get(url)
    }
}

impl<T: HttpTransport + ?Sized> HttpTransport for &T {
    fn post_form(&self, url: &str, body: &str) -> Result<String, TransportError> {
        (**self).post_form(url, body)
    }

    fn get(&self, url: &str) -> Result<String, TransportError> {
        (**self).get(url)
    }
}

/// `reqwest` blocking client with configured timeouts.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Build the HTTP client.
    ///
    /// Must not be called from inside an async runtime; the blocking client
    /// owns its own.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Configuration` if the HTTP client cannot be built.
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| TransportError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }

    fn read_body(response: Response) -> Result<String, TransportError> {
        let status = response.status();

        if !status.is_success() {
            warn!(target: "nudgis.transport", status = %status, "Platform returned non-success status");
            return Err(TransportError::Status(status.as_u16()));
        }

        let body = response.text().map_err(|e| {
            warn!(target: "nudgis.transport", error = %e, "Failed to read response body");
            TransportError::Body(e.to_string())
        })?;

        debug!(target: "nudgis.transport", status = %status, bytes = body.len(), "Response received");
        Ok(body)
    }
}

impl HttpTransport for ReqwestTransport {
    #[instrument(skip_all, fields(url = %url))]
    fn post_form(&self, url: &str, body: &str) -> Result<String, TransportError> {
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(body.to_owned())
            .send()
            .map_err(|e| {
                warn!(target: "nudgis.transport", error = %e, "HTTP request failed");
                TransportError::Request(e.to_string())
            })?;

        Self::read_body(response)
    }

    // The query string carries the API key; only the path is recorded.
    #[instrument(skip_all, fields(path = %url.split('?').next().unwrap_or_default()))]
    fn get(&self, url: &str) -> Result<String, TransportError> {
        let response = self.client.get(url).send().map_err(|e| {
            let e = e.without_url();
            warn!(target: "nudgis.transport", error = %e, "HTTP request failed");
            TransportError::Request(e.to_string())
        })?;

        Self::read_body(response)
    }
}
