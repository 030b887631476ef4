//! Document source: reads Markdown documents from a directory.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::DocumentError;
use crate::fingerprint::digest;

/// A document read for one sync pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Identifier derived from the file name without extension; also the page title.
    pub id: String,
    pub path: PathBuf,
    pub content: String,
    pub digest: String,
}

impl Document {
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        let content = content.into();
        Document {
            id: id.into(),
            path: path.into(),
            digest: digest(content.as_bytes()),
            content,
        }
    }
}

/// Result of reading one listed document; an error only affects that document.
pub type LoadedDocument = Result<Document, DocumentError>;

#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
    extension: String,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        let extension = extension.into();
        DirectorySource {
            dir: dir.into(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// List and read every matching file directly inside the directory,
    /// ordered by file name.
    ///
    /// Fails only when the directory itself cannot be listed.
    pub fn load(&self) -> Result<Vec<LoadedDocument>, DocumentError> {
        let listing_error = |source| DocumentError::Listing {
            path: self.dir.clone(),
            source,
        };

        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.dir).map_err(listing_error)? {
            let path = entry.map_err(listing_error)?.path();
            if path.is_file() && self.matches(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        info!(dir = %self.dir.display(), documents = paths.len(), "Listed documents");

        // Ids double as page titles, so two files sharing a stem (`a.md`,
        // `a.MD`) would overwrite each other remotely. The first one wins.
        let mut seen: HashMap<String, PathBuf> = HashMap::new();
        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            let id = document_id(&path);
            if let Some(first) = seen.get(&id) {
                warn!(id = %id, path = %path.display(), first = %first.display(), "Duplicate document id, skipping");
                documents.push(Err(DocumentError::DuplicateId {
                    id,
                    path,
                    first: first.clone(),
                }));
                continue;
            }
            seen.insert(id.clone(), path.clone());
            documents.push(read_document(id, path));
        }
        Ok(documents)
    }

    fn matches(&self, path: &Path) -> bool {
        path.extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(self.extension.as_str()))
    }
}

fn document_id(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn read_document(id: String, path: PathBuf) -> LoadedDocument {
    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(source) => {
            warn!(id = %id, path = %path.display(), error = %source, "Failed to read document");
            return Err(DocumentError::Read { id, path, source });
        }
    };
    let content = match String::from_utf8(bytes) {
        Ok(content) => content,
        Err(_) => {
            warn!(id = %id, path = %path.display(), "Document is not valid UTF-8");
            return Err(DocumentError::Decode { id, path });
        }
    };

    debug!(id = %id, bytes = content.len(), "Read document");
    Ok(Document::new(id, path, content))
}
