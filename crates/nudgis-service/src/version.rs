//! Platform API version targeted by this client.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid server version '{0}': expected MAJOR.MINOR.PATCH")]
pub struct VersionParseError(String);

/// A `MAJOR.MINOR.PATCH` platform version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServerVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ServerVersion {
    /// Version of the live API the request and response formats follow.
    pub const TARGET: ServerVersion = ServerVersion {
        major: 10,
        minor: 2,
        patch: 2,
    };
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for ServerVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || VersionParseError(s.to_string());

        let mut parts = s.trim().split('.');
        let mut next = || -> Result<u32, VersionParseError> {
            parts
                .next()
                .and_then(|part| part.parse().ok())
                .ok_or_else(invalid)
        };

        let version = ServerVersion {
            major: next()?,
            minor: next()?,
            patch: next()?,
        };

        if parts.next().is_some() {
            return Err(invalid());
        }

        Ok(version)
    }
}
