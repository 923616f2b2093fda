//! Common configuration types for the Nudgis live crates.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Default log filter when neither `RUST_LOG` nor `NUDGIS_LOG_LEVEL` is set.
///
/// Matches both the `nudgis.*` event targets and the `nudgis_service` spans.
pub const DEFAULT_LOG_LEVEL: &str = "nudgis=debug";

/// Errors raised while reading observability settings.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ObservabilityConfigError {
    /// `NUDGIS_JSON_LOGS` held something other than a boolean.
    #[error("Invalid NUDGIS_JSON_LOGS value: {0}")]
    InvalidJsonLogs(String),
}

/// Observability configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log filter directive (trace, debug, info, warn, error, or a full `EnvFilter` string)
    pub log_level: String,
    /// Enable JSON-formatted logs
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            json_logs: false,
        }
    }
}

impl ObservabilityConfig {
    /// Load observability settings from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ObservabilityConfigError::InvalidJsonLogs` if `NUDGIS_JSON_LOGS`
    /// is not a recognised boolean.
    pub fn from_env() -> Result<Self, ObservabilityConfigError> {
        Self::from_vars(&std::env::vars().collect())
    }

    /// Load observability settings from a map (for testing).
    ///
    /// # Errors
    ///
    /// Returns `ObservabilityConfigError::InvalidJsonLogs` if `NUDGIS_JSON_LOGS`
    /// is not a recognised boolean.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ObservabilityConfigError> {
        let log_level = vars
            .get("NUDGIS_LOG_LEVEL")
            .cloned()
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

        let json_logs = match vars.get("NUDGIS_JSON_LOGS").map(String::as_str) {
            None | Some("" | "0" | "false") => false,
            Some("1" | "true") => true,
            Some(other) => {
                return Err(ObservabilityConfigError::InvalidJsonLogs(other.to_string()));
            }
        };

        Ok(Self {
            log_level,
            json_logs,
        })
    }
}
