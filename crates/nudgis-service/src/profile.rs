//! Persisted encoder profile.
//!
//! The host keeps the streaming encoder settings of the active profile in a
//! JSON document. Only `keyint_sec` is interpreted here; every other key is
//! carried through untouched when the document is rewritten.
//!
//! Writes go through a temporary file and a rename, keeping the previous
//! document as `<file>.bak`. Loads fall back to the backup when the main file
//! is missing or corrupt, and move it back in place of the main file.

use serde_json::{Map, Value};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Key holding the keyframe interval in seconds.
pub const KEYINT_SEC_FIELD: &str = "keyint_sec";

/// File name of the streaming encoder settings inside a profile directory.
pub const STREAM_ENCODER_FILENAME: &str = "streamEncoder.json";

const TEMP_EXTENSION: &str = "tmp";
const BACKUP_EXTENSION: &str = "bak";

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Profile document not found: {0}")]
    NotFound(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed profile document {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode profile document: {0}")]
    Encode(#[source] serde_json::Error),
}

/// An encoder settings document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileDocument(Map<String, Value>);

impl ProfileDocument {
    /// Parse a document. The top level must be a JSON object.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error for anything that is not a JSON object.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text).map(Self)
    }

    /// Serialize the document, pretty-printed.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.0)
    }

    /// Keyframe interval in seconds; `0` when absent or not a whole number.
    ///
    /// Whole floating point values such as `3.0` read as integers.
    #[must_use]
    pub fn keyint_sec(&self) -> i64 {
        self.0
            .get(KEYINT_SEC_FIELD)
            .and_then(|value| value.as_i64().or_else(|| whole_f64(value)))
            .unwrap_or(0)
    }

    pub fn set_keyint_sec(&mut self, keyint_sec: i64) {
        self.0
            .insert(KEYINT_SEC_FIELD.to_string(), Value::from(keyint_sec));
    }

    /// Raw value of `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn whole_f64(value: &Value) -> Option<i64> {
    let number = value.as_f64()?;
    let in_range = number >= i64::MIN as f64 && number < i64::MAX as f64;
    (number.fract() == 0.0 && in_range).then(|| number as i64)
}

/// Storage for the encoder profile document.
pub trait ProfileStore {
    /// Read the current document.
    ///
    /// # Errors
    ///
    /// Returns a `ProfileError` if no usable document exists.
    fn load(&self) -> Result<ProfileDocument, ProfileError>;

    /// Replace the stored document.
    ///
    /// # Errors
    ///
    /// Returns a `ProfileError` if the document could not be written.
    fn save(&self, document: &ProfileDocument) -> Result<(), ProfileError>;
}

/// Profile document stored as a JSON file with `.tmp`/`.bak` siblings.
#[derive(Debug, Clone)]
pub struct JsonFileProfileStore {
    path: PathBuf,
}

impl JsonFileProfileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store for the stream encoder settings of the profile in `profile_dir`.
    #[must_use]
    pub fn in_profile_dir(profile_dir: impl AsRef<Path>) -> Self {
        Self::new(profile_dir.as_ref().join(STREAM_ENCODER_FILENAME))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn backup_path(&self) -> PathBuf {
        sibling(&self.path, BACKUP_EXTENSION)
    }

    #[must_use]
    pub fn temp_path(&self) -> PathBuf {
        sibling(&self.path, TEMP_EXTENSION)
    }
}

/// `<path>.<extension>`, keeping the original extension.
fn sibling(path: &Path, extension: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

fn read_document(path: &Path) -> Result<ProfileDocument, ProfileError> {
    let text = fs::read_to_string(path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            ProfileError::NotFound(path.to_path_buf())
        } else {
            ProfileError::Io {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;

    ProfileDocument::from_json(&text).map_err(|e| ProfileError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> ProfileError + '_ {
    move |source| ProfileError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl ProfileStore for JsonFileProfileStore {
    fn load(&self) -> Result<ProfileDocument, ProfileError> {
        let primary = match read_document(&self.path) {
            Ok(document) => return Ok(document),
            Err(e) => e,
        };

        let backup_path = self.backup_path();
        match read_document(&backup_path) {
            Ok(document) => {
                warn!(
                    target: "nudgis.profile",
                    path = %self.path.display(),
                    error = %primary,
                    "Profile unreadable, restoring backup"
                );
                // The unreadable file must never be rotated into the backup
                // slot by a later save.
                if let Err(e) = fs::rename(&backup_path, &self.path) {
                    warn!(
                        target: "nudgis.profile",
                        path = %backup_path.display(),
                        error = %e,
                        "Failed to restore profile backup"
                    );
                }
                Ok(document)
            }
            Err(ProfileError::NotFound(_)) => Err(primary),
            Err(backup_error) => {
                debug!(
                    target: "nudgis.profile",
                    path = %backup_path.display(),
                    error = %backup_error,
                    "Profile backup unreadable"
                );
                Err(primary)
            }
        }
    }

    fn save(&self, document: &ProfileDocument) -> Result<(), ProfileError> {
        let text = document.to_json().map_err(ProfileError::Encode)?;

        let temp_path = self.temp_path();
        {
            let mut file = File::create(&temp_path).map_err(io_error(&temp_path))?;
            file.write_all(text.as_bytes())
                .map_err(io_error(&temp_path))?;
            file.sync_all().map_err(io_error(&temp_path))?;
        }

        if self.path.exists() {
            let backup_path = self.backup_path();
            match fs::remove_file(&backup_path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(io_error(&backup_path)(e)),
            }
            fs::rename(&self.path, &backup_path).map_err(io_error(&self.path))?;
        }

        fs::rename(&temp_path, &self.path).map_err(io_error(&self.path))?;

        debug!(
            target: "nudgis.profile",
            path = %self.path.display(),
            "Profile document saved"
        );
        Ok(())
    }
}
