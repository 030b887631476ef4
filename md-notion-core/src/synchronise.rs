//! High-level pipeline: fingerprint → tokenize → map → push, per document.
//!
//! One pass walks the listed documents in order. A document whose digest
//! matches the stored fingerprint is skipped. Changed or new documents are
//! tokenized, mapped to blocks and pushed through the injected
//! [`DocumentStore`]; only a confirmed push records the new digest. The
//! fingerprint store is persisted exactly once, after every document has been
//! handled, so an interrupted pass leaves the previous state on disk.
//!
//! # Error Handling
//! Failures stay local to their document: unreadable input and rejected
//! pushes end up in [`SyncReport::failed`] and the pass continues. A failure
//! to persist the store is carried in [`SyncReport::persist_error`].
//!
//! Pushes are awaited one by one; no push is in flight when the store is
//! persisted.

use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::contract::{DocumentStore, Tokenizer};
use crate::document::{Document, LoadedDocument};
use crate::fingerprint::FingerprintStore;
use crate::mapper::map_tokens;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Push every document regardless of its stored fingerprint.
    pub force: bool,
    /// Tokenize and map changed documents without pushing or persisting.
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDocument {
    pub id: String,
    pub cause: String,
}

#[derive(Debug, Default)]
pub struct SyncReport {
    pub synced: Vec<String>,
    pub unchanged: Vec<String>,
    /// Changed documents that a dry run would have pushed.
    pub planned: Vec<String>,
    pub failed: Vec<FailedDocument>,
    pub persist_error: Option<String>,
}

impl SyncReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.persist_error.is_none()
    }

    pub fn failed_ids(&self) -> Vec<&str> {
        self.failed.iter().map(|f| f.id.as_str()).collect()
    }
}

enum Outcome {
    Synced,
    Unchanged,
    Planned,
    Failed(String),
}

/// Run one sync pass over `documents`.
pub async fn synchronise<T, S>(
    documents: Vec<LoadedDocument>,
    fingerprints: &mut FingerprintStore,
    tokenizer: &T,
    store: &S,
    options: SyncOptions,
) -> SyncReport
where
    T: Tokenizer + ?Sized,
    S: DocumentStore + ?Sized,
{
    info!(
        documents = documents.len(),
        force = options.force,
        dry_run = options.dry_run,
        "[SYNC] Starting sync pass"
    );

    let mut report = SyncReport::default();

    for loaded in documents {
        let document = match loaded {
            Ok(document) => document,
            Err(e) => {
                let id = e.document_id().unwrap_or_default().to_string();
                error!(id = %id, error = %e, "[SYNC][ERROR] Document could not be read");
                report.failed.push(FailedDocument {
                    id,
                    cause: e.to_string(),
                });
                continue;
            }
        };

        let span = info_span!("document", id = %document.id);
        let outcome = sync_document(&document, fingerprints, tokenizer, store, options)
            .instrument(span)
            .await;

        match outcome {
            Outcome::Synced => report.synced.push(document.id),
            Outcome::Unchanged => report.unchanged.push(document.id),
            Outcome::Planned => report.planned.push(document.id),
            Outcome::Failed(cause) => report.failed.push(FailedDocument {
                id: document.id,
                cause,
            }),
        }
    }

    if options.dry_run {
        info!("[SYNC] Dry run, fingerprint store left untouched");
    } else if let Err(e) = fingerprints.persist() {
        error!(error = %e, "[SYNC][ERROR] Failed to persist fingerprint store");
        report.persist_error = Some(e.to_string());
    }

    info!(
        synced = report.synced.len(),
        unchanged = report.unchanged.len(),
        planned = report.planned.len(),
        failed = report.failed.len(),
        "[SYNC] Sync pass complete"
    );
    report
}

async fn sync_document<T, S>(
    document: &Document,
    fingerprints: &mut FingerprintStore,
    tokenizer: &T,
    store: &S,
    options: SyncOptions,
) -> Outcome
where
    T: Tokenizer + ?Sized,
    S: DocumentStore + ?Sized,
{
    if !options.force && !fingerprints.has_changed(&document.id, &document.digest) {
        debug!("[SYNC] Unchanged, skipping");
        return Outcome::Unchanged;
    }

    let tokens = tokenizer.tokenize(&document.content);
    let blocks = map_tokens(&tokens);
    debug!(tokens = tokens.len(), blocks = blocks.len(), "[SYNC] Mapped document");

    if options.dry_run {
        info!(blocks = blocks.len(), "[SYNC] Dry run, would push document");
        return Outcome::Planned;
    }

    match store.upsert(&document.id, &blocks).await {
        Ok(page) => {
            fingerprints.record(&document.id, &document.digest);
            info!(page_id = %page.page_id, blocks = blocks.len(), "[SYNC][UPLOAD] Document pushed");
            Outcome::Synced
        }
        Err(e) => {
            warn!(error = %e, "[SYNC][ERROR][UPLOAD] Push failed, fingerprint not recorded");
            Outcome::Failed(e.to_string())
        }
    }
}
