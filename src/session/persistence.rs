// Session persistence module
// Saves and restores the authenticated browser state between runs

use crate::browser::StorageState;
use crate::error::PersistenceError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Current on-disk layout
const STATE_VERSION: u32 = 1;

/// Serializable wrapper around the captured browser state
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionFile {
    /// Version of the file format (for future migration support)
    version: u32,
    /// When the state was captured
    saved_at: DateTime<Utc>,
    /// Origin the cookies belong to
    origin: String,
    /// Cookies and local storage
    #[serde(flatten)]
    state: StorageState,
}

/// A persisted session loaded from disk
#[derive(Debug, Clone)]
pub struct SavedSession {
    /// Origin the cookies belong to
    pub origin: String,
    /// When the state was captured
    pub saved_at: DateTime<Utc>,
    /// Cookies and local storage
    pub state: StorageState,
}

/// Session state file at a fixed path
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Create a store backed by `path`
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Location of the state file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Save the state, overwriting any previous file
    ///
    /// Writes to a sibling temp file and renames it into place so a crash
    /// never leaves a truncated state file behind.
    pub fn save(&self, origin: &str, state: &StorageState) -> Result<(), PersistenceError> {
        let data = SessionFile {
            version: STATE_VERSION,
            saved_at: Utc::now(),
            origin: origin.to_string(),
            state: state.clone(),
        };
        let json = serde_json::to_string_pretty(&data)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Load the saved state
    ///
    /// # Returns
    /// * `Ok(None)` - No state file exists
    /// * `Ok(Some(_))` - State file parsed
    /// * `Err(PersistenceError)` - File exists but is unreadable or corrupt
    pub fn load(&self) -> Result<Option<SavedSession>, PersistenceError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&self.path)?;
        let data: SessionFile = serde_json::from_str(&json)?;

        if data.version != STATE_VERSION {
            return Err(PersistenceError::InvalidData(format!(
                "Unsupported session state version: {}",
                data.version
            )));
        }

        Ok(Some(SavedSession {
            origin: data.origin,
            saved_at: data.saved_at,
            state: data.state,
        }))
    }

    /// Load the saved state, treating a corrupt file as absent
    pub fn load_or_discard(&self) -> Option<SavedSession> {
        match self.load() {
            Ok(saved) => saved,
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Discarding unreadable session state"
                );
                self.discard();
                None
            }
        }
    }

    /// Remove the state file if present
    pub fn discard(&self) {
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "Failed to remove session state");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::StoredCookie;
    use tempfile::TempDir;

    fn sample_state() -> StorageState {
        let mut state = StorageState::default();
        state.cookies.push(StoredCookie {
            name: ".ASPXAUTH".to_string(),
            value: "abc123".to_string(),
            domain: Some("mytools.gatewayedi.com".to_string()),
            path: Some("/".to_string()),
            secure: true,
            http_only: true,
        });
        state
            .local_storage
            .insert("lastPayer".to_string(), "UMR".to_string());
        state
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path().join("login_state.json"));

        store.save("https://portal.test", &sample_state()).unwrap();
        let loaded = store.load().unwrap().expect("state should exist");

        assert_eq!(loaded.origin, "https://portal.test");
        assert_eq!(loaded.state, sample_state());
        assert!(!dir.path().join("login_state.json.tmp").exists());
    }

    #[test]
    fn test_load_from_nonexistent_file() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path().join("missing.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_corrupt_file_is_discarded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("login_state.json");
        fs::write(&path, "{ not json").unwrap();

        let store = SessionStore::new(&path);
        assert!(matches!(store.load(), Err(PersistenceError::Json(_))));
        assert!(store.load_or_discard().is_none());
        assert!(!path.exists());
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("login_state.json");
        fs::write(
            &path,
            r#"{"version": 7, "saved_at": "2025-01-01T00:00:00Z", "origin": "x", "cookies": []}"#,
        )
        .unwrap();

        let err = SessionStore::new(&path).load().unwrap_err();
        assert!(err.to_string().contains("Unsupported session state version: 7"));
    }

    #[test]
    fn test_save_overwrites_previous_state() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path().join("nested").join("state.json"));

        store.save("https://old.test", &StorageState::default()).unwrap();
        store.save("https://new.test", &sample_state()).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.origin, "https://new.test");
        assert_eq!(loaded.state.cookies.len(), 1);
    }
}
