use std::sync::{Arc, Mutex};

use md_notion_core::block::Block;
use md_notion_core::contract::{MockDocumentStore, MockTokenizer, UpsertedPage};
use md_notion_core::document::{Document, LoadedDocument};
use md_notion_core::error::DocumentError;
use md_notion_core::fingerprint::FingerprintStore;
use md_notion_core::synchronise::{synchronise, SyncOptions};
use md_notion_core::token::{MarkdownTokenizer, Token};
use tempfile::tempdir;

fn doc(id: &str, content: &str) -> LoadedDocument {
    Ok(Document::new(id, format!("{id}.md"), content))
}

fn corpus() -> Vec<LoadedDocument> {
    vec![
        doc("a", "# A\n\nFirst document.\n"),
        doc("b", "# B\n\n- one\n- two\n"),
        doc("c", "# C\n\n```rust\nfn main() {}\n```\n"),
    ]
}

/// A store that accepts every push and remembers the titles it saw.
fn recording_store(pushed: Arc<Mutex<Vec<String>>>) -> MockDocumentStore {
    let mut store = MockDocumentStore::new();
    store.expect_upsert().returning(move |title, _blocks| {
        pushed.lock().unwrap().push(title.to_string());
        Ok(UpsertedPage {
            page_id: format!("page-{title}"),
        })
    });
    store
}

#[tokio::test]
async fn second_pass_without_changes_pushes_nothing() {
    let dir = tempdir().unwrap();
    let state = dir.path().join("state.json");
    let pushed = Arc::new(Mutex::new(Vec::new()));
    let store = recording_store(pushed.clone());

    let mut fingerprints = FingerprintStore::load(&state);
    let first = synchronise(
        corpus(),
        &mut fingerprints,
        &MarkdownTokenizer,
        &store,
        SyncOptions::default(),
    )
    .await;
    assert_eq!(first.synced, vec!["a", "b", "c"]);
    assert!(first.is_success());

    let mut fingerprints = FingerprintStore::load(&state);
    let second = synchronise(
        corpus(),
        &mut fingerprints,
        &MarkdownTokenizer,
        &store,
        SyncOptions::default(),
    )
    .await;
    assert!(second.synced.is_empty());
    assert_eq!(second.unchanged, vec!["a", "b", "c"]);
    assert_eq!(*pushed.lock().unwrap(), vec!["a", "b", "c"]);
}

#[tokio::test]
async fn edited_document_is_pushed_again() {
    let dir = tempdir().unwrap();
    let state = dir.path().join("state.json");
    let pushed = Arc::new(Mutex::new(Vec::new()));
    let store = recording_store(pushed.clone());

    let mut fingerprints = FingerprintStore::load(&state);
    synchronise(
        corpus(),
        &mut fingerprints,
        &MarkdownTokenizer,
        &store,
        SyncOptions::default(),
    )
    .await;

    let mut edited = corpus();
    edited[1] = doc("b", "# B\n\n- one\n- two\n- three\n");
    let mut fingerprints = FingerprintStore::load(&state);
    let report = synchronise(
        edited,
        &mut fingerprints,
        &MarkdownTokenizer,
        &store,
        SyncOptions::default(),
    )
    .await;

    assert_eq!(report.synced, vec!["b"]);
    assert_eq!(report.unchanged, vec!["a", "c"]);
}

#[tokio::test]
async fn failed_push_is_isolated_and_retried_next_pass() {
    let dir = tempdir().unwrap();
    let state = dir.path().join("state.json");

    let mut failing = MockDocumentStore::new();
    failing.expect_upsert().times(3).returning(|title, _blocks| {
        if title == "b" {
            Err("remote store unavailable".into())
        } else {
            Ok(UpsertedPage {
                page_id: format!("page-{title}"),
            })
        }
    });

    let mut fingerprints = FingerprintStore::load(&state);
    let report = synchronise(
        corpus(),
        &mut fingerprints,
        &MarkdownTokenizer,
        &failing,
        SyncOptions::default(),
    )
    .await;

    assert_eq!(report.synced, vec!["a", "c"]);
    assert_eq!(report.failed_ids(), vec!["b"]);
    assert!(report.failed[0].cause.contains("remote store unavailable"));
    assert!(!report.is_success());

    let reloaded = FingerprintStore::load(&state);
    assert!(reloaded.get("a").is_some());
    assert!(reloaded.get("b").is_none());
    assert!(reloaded.get("c").is_some());

    // The next pass retries only the failed document.
    let mut retry = MockDocumentStore::new();
    retry
        .expect_upsert()
        .withf(|title, _blocks| title == "b")
        .times(1)
        .returning(|_, _| {
            Ok(UpsertedPage {
                page_id: "page-b".to_string(),
            })
        });

    let mut fingerprints = FingerprintStore::load(&state);
    let report = synchronise(
        corpus(),
        &mut fingerprints,
        &MarkdownTokenizer,
        &retry,
        SyncOptions::default(),
    )
    .await;
    assert_eq!(report.synced, vec!["b"]);
    assert_eq!(report.unchanged, vec!["a", "c"]);
}

#[tokio::test]
async fn unreadable_document_is_reported_without_aborting_the_pass() {
    let dir = tempdir().unwrap();
    let pushed = Arc::new(Mutex::new(Vec::new()));
    let store = recording_store(pushed.clone());

    let documents = vec![
        doc("a", "# A\n"),
        Err(DocumentError::Decode {
            id: "broken".to_string(),
            path: "broken.md".into(),
        }),
        doc("c", "# C\n"),
    ];

    let mut fingerprints = FingerprintStore::load(dir.path().join("state.json"));
    let report = synchronise(
        documents,
        &mut fingerprints,
        &MarkdownTokenizer,
        &store,
        SyncOptions::default(),
    )
    .await;

    assert_eq!(report.synced, vec!["a", "c"]);
    assert_eq!(report.failed_ids(), vec!["broken"]);
    assert_eq!(*pushed.lock().unwrap(), vec!["a", "c"]);
}

#[tokio::test]
async fn pushes_mapped_blocks_under_document_title() {
    let dir = tempdir().unwrap();
    let mut store = MockDocumentStore::new();
    store
        .expect_upsert()
        .withf(|title, blocks| {
            title == "guide"
                && blocks
                    == [
                        Block::Heading {
                            level: 1,
                            text: "Guide".to_string(),
                        },
                        Block::ListItem {
                            ordered: true,
                            text: "install".to_string(),
                        },
                        Block::ListItem {
                            ordered: true,
                            text: "run".to_string(),
                        },
                    ]
        })
        .times(1)
        .returning(|_, _| {
            Ok(UpsertedPage {
                page_id: "page-guide".to_string(),
            })
        });

    let mut fingerprints = FingerprintStore::load(dir.path().join("state.json"));
    let report = synchronise(
        vec![doc("guide", "# Guide\n\n1. install\n2. run\n")],
        &mut fingerprints,
        &MarkdownTokenizer,
        &store,
        SyncOptions::default(),
    )
    .await;
    assert_eq!(report.synced, vec!["guide"]);
}

#[tokio::test]
async fn unsupported_tokens_are_dropped_before_pushing() {
    let dir = tempdir().unwrap();

    let mut tokenizer = MockTokenizer::new();
    tokenizer.expect_tokenize().returning(|_| {
        vec![
            Token::Unsupported {
                kind: "table".to_string(),
            },
            Token::Paragraph {
                text: "kept".to_string(),
                inline: vec![],
            },
        ]
    });

    let mut store = MockDocumentStore::new();
    store
        .expect_upsert()
        .withf(|_, blocks| {
            blocks
                == [Block::Paragraph {
                    text: "kept".to_string(),
                }]
        })
        .times(1)
        .returning(|_, _| {
            Ok(UpsertedPage {
                page_id: "p".to_string(),
            })
        });

    let mut fingerprints = FingerprintStore::load(dir.path().join("state.json"));
    let report = synchronise(
        vec![doc("tables", "| a |\n|---|\n| b |\n")],
        &mut fingerprints,
        &tokenizer,
        &store,
        SyncOptions::default(),
    )
    .await;
    assert!(report.is_success());
}

#[tokio::test]
async fn force_pushes_unchanged_documents() {
    let dir = tempdir().unwrap();
    let state = dir.path().join("state.json");
    let pushed = Arc::new(Mutex::new(Vec::new()));
    let store = recording_store(pushed.clone());

    for options in [
        SyncOptions::default(),
        SyncOptions {
            force: true,
            dry_run: false,
        },
    ] {
        let mut fingerprints = FingerprintStore::load(&state);
        synchronise(corpus(), &mut fingerprints, &MarkdownTokenizer, &store, options).await;
    }

    assert_eq!(pushed.lock().unwrap().len(), 6);
}

#[tokio::test]
async fn dry_run_neither_pushes_nor_persists() {
    let dir = tempdir().unwrap();
    let state = dir.path().join("state.json");

    let mut store = MockDocumentStore::new();
    store.expect_upsert().never();

    let mut fingerprints = FingerprintStore::load(&state);
    let report = synchronise(
        corpus(),
        &mut fingerprints,
        &MarkdownTokenizer,
        &store,
        SyncOptions {
            force: false,
            dry_run: true,
        },
    )
    .await;

    assert_eq!(report.planned, vec!["a", "b", "c"]);
    assert!(report.synced.is_empty());
    assert!(!state.exists());
}

#[tokio::test]
async fn persist_failure_is_reported() {
    let dir = tempdir().unwrap();
    // A directory where the state file should be makes the final rename fail.
    let state = dir.path().join("state.json");
    std::fs::create_dir(&state).unwrap();
    std::fs::write(state.join("occupied"), "x").unwrap();

    let store = recording_store(Arc::new(Mutex::new(Vec::new())));
    let mut fingerprints = FingerprintStore::load(&state);
    let report = synchronise(
        corpus(),
        &mut fingerprints,
        &MarkdownTokenizer,
        &store,
        SyncOptions::default(),
    )
    .await;

    assert_eq!(report.synced.len(), 3);
    assert!(report.persist_error.is_some());
    assert!(!report.is_success());
}
