//! Error taxonomy for the core crate.
//!
//! Input errors are scoped to a single document and never abort a pass.
//! Store-state errors on load are recovered from (see [`crate::fingerprint`]),
//! so [`StoreError`] only surfaces when persisting fails.

use std::path::PathBuf;

/// Failure to obtain a document's raw text.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("failed to list document directory {path}: {source}")]
    Listing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read document {id} at {path}: {source}")]
    Read {
        id: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("document {id} at {path} is not valid UTF-8")]
    Decode { id: String, path: PathBuf },

    #[error("document {id} at {path} has the same id as {first}")]
    DuplicateId {
        id: String,
        path: PathBuf,
        first: PathBuf,
    },
}

impl DocumentError {
    /// Identifier of the document the error belongs to, if it is scoped to one.
    pub fn document_id(&self) -> Option<&str> {
        match self {
            DocumentError::Listing { .. } => None,
            DocumentError::Read { id, .. }
            | DocumentError::Decode { id, .. }
            | DocumentError::DuplicateId { id, .. } => Some(id),
        }
    }
}

/// Failure to write the fingerprint store to disk.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("fingerprint store io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialise fingerprint store: {0}")]
    Serialise(#[from] serde_json::Error),
}
