//! In-memory profile and stream key stores.
//!
//! Both stores are cheap to clone and clones share state, so a test can hand
//! one to the code under test and keep another to inspect.

use nudgis_service::{
    ProfileDocument, ProfileError, ProfileStore, StreamKeyStore, StreamKeyStoreError,
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct ProfileState {
    document: Option<ProfileDocument>,
    saves: usize,
    fail_saves: bool,
}

/// Profile store holding the document in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryProfileStore {
    state: Arc<Mutex<ProfileState>>,
}

impl MemoryProfileStore {
    /// A store with no document; `load` reports `NotFound`.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A store holding `document`.
    pub fn with_document(document: ProfileDocument) -> Self {
        let store = Self::default();
        store.state.lock().unwrap().document = Some(document);
        store
    }

    /// A store holding `{"keyint_sec": <keyint_sec>}`.
    pub fn with_keyint_sec(keyint_sec: i64) -> Self {
        let mut document = ProfileDocument::default();
        document.set_keyint_sec(keyint_sec);
        Self::with_document(document)
    }

    /// Make every later `save` fail with an I/O error.
    pub fn failing_saves(self) -> Self {
        self.state.lock().unwrap().fail_saves = true;
        self
    }

    /// The current document, if any.
    pub fn document(&self) -> Option<ProfileDocument> {
        self.state.lock().unwrap().document.clone()
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.state.lock().unwrap().saves
    }
}

impl ProfileStore for MemoryProfileStore {
    fn load(&self) -> Result<ProfileDocument, ProfileError> {
        self.state
            .lock()
            .unwrap()
            .document
            .clone()
            .ok_or_else(|| ProfileError::NotFound(PathBuf::from("memory")))
    }

    fn save(&self, document: &ProfileDocument) -> Result<(), ProfileError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_saves {
            return Err(ProfileError::Io {
                path: PathBuf::from("memory"),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            });
        }
        state.document = Some(document.clone());
        state.saves += 1;
        Ok(())
    }
}

/// Stream key store recording every key it is given.
#[derive(Debug, Clone, Default)]
pub struct MemoryStreamKeyStore {
    keys: Arc<Mutex<Vec<String>>>,
    fail: bool,
}

impl MemoryStreamKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose saves always fail.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Keys saved so far, in order.
    pub fn saved_keys(&self) -> Vec<String> {
        self.keys.lock().unwrap().clone()
    }
}

impl StreamKeyStore for MemoryStreamKeyStore {
    fn save_stream_key(&mut self, stream_key: &str) -> Result<(), StreamKeyStoreError> {
        if self.fail {
            return Err(StreamKeyStoreError("settings store unavailable".to_string()));
        }
        self.keys.lock().unwrap().push(stream_key.to_string());
        Ok(())
    }
}
