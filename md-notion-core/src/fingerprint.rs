//! Content fingerprint store.
//!
//! Maps a document identifier to the digest of the content last pushed
//! successfully. The store is loaded at the start of a pass, mutated in
//! memory as pushes succeed, and written back once at the end of the pass.
//! A missing or unreadable state file is treated as "nothing synced yet".

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::StoreError;

const STATE_VERSION: u32 = 1;

/// Lowercase hex SHA-256 of `bytes`.
pub fn digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Serialize, Deserialize)]
struct StateFile {
    version: u32,
    documents: BTreeMap<String, String>,
}

#[derive(Debug)]
pub struct FingerprintStore {
    path: PathBuf,
    records: BTreeMap<String, String>,
}

impl FingerprintStore {
    /// Load the store persisted at `path`, falling back to an empty store.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let records = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<StateFile>(&raw) {
                Ok(state) if state.version == STATE_VERSION => {
                    info!(path = %path.display(), documents = state.documents.len(), "Loaded fingerprint store");
                    state.documents
                }
                Ok(state) => {
                    warn!(path = %path.display(), version = state.version, "Unknown fingerprint store version, starting from empty state");
                    BTreeMap::new()
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Corrupt fingerprint store, starting from empty state");
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No fingerprint store yet, every document counts as changed");
                BTreeMap::new()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unreadable fingerprint store, starting from empty state");
                BTreeMap::new()
            }
        };
        FingerprintStore { path, records }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.records.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// True when there is no record for `id` or the recorded digest differs.
    pub fn has_changed(&self, id: &str, digest: &str) -> bool {
        self.get(id) != Some(digest)
    }

    /// Record `digest` for `id` in memory. Only call after a confirmed push.
    pub fn record(&mut self, id: &str, digest: &str) {
        debug!(id, digest, "Recording fingerprint");
        self.records.insert(id.to_string(), digest.to_string());
    }

    /// Replace the on-disk store with the in-memory mapping.
    ///
    /// Writes a sibling temporary file and renames it over the target, so a
    /// reader never observes a half-written store.
    pub fn persist(&self) -> Result<(), StoreError> {
        let state = StateFile {
            version: STATE_VERSION,
            documents: self.records.clone(),
        };
        let json = serde_json::to_string_pretty(&state)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, json).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;

        info!(path = %self.path.display(), documents = self.records.len(), "Persisted fingerprint store");
        Ok(())
    }
}
