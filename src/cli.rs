//! # md-notion CLI
//!
//! Command parsing and orchestration glue. All mapping and change-detection
//! logic lives in `md-notion-core`; this module wires the config file, the
//! document directory, the fingerprint state file and the Notion client
//! together and turns the sync report into an exit status.
//!
//! - `md-notion sync --config <file>` runs one sync pass.
//! - `md-notion convert <file>` prints the blocks a document maps to.
use crate::load_config::{load_config, CliConfig};
use crate::notion::block_to_notion;
use crate::upload::NotionClient;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use md_notion_core::contract::DocumentStore;
use md_notion_core::document::DirectorySource;
use md_notion_core::fingerprint::FingerprintStore;
use md_notion_core::mapper::map_tokens;
use md_notion_core::synchronise::{synchronise, SyncOptions, SyncReport};
use md_notion_core::token::{tokenize, MarkdownTokenizer};
use std::path::PathBuf;

/// CLI for md-notion: push changed Markdown documents to Notion.
#[derive(Parser)]
#[clap(
    name = "md-notion",
    version,
    about = "Synchronise a directory of Markdown documents into Notion pages"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Push every new or changed document to Notion
    Sync {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Push all documents, ignoring stored fingerprints
        #[clap(long)]
        force: bool,
        /// Report what would be pushed without contacting Notion
        #[clap(long)]
        dry_run: bool,
    },
    /// Print the blocks a Markdown file maps to, as JSON
    Convert {
        /// Markdown file to convert
        file: PathBuf,
        /// Print Notion API block objects instead of the internal block schema
        #[clap(long)]
        notion: bool,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Sync {
            config,
            force,
            dry_run,
        } => {
            let config = load_config(config)?;
            let options = SyncOptions { force, dry_run };
            tracing::info!(command = "sync", ?options, "Starting synchronisation process");

            let client = NotionClient::new_from_env(&config.notion)
                .map_err(|e| anyhow::anyhow!("Failed to construct Notion client: {e}"))?;
            let report = sync_with_store(&config, &client, options).await?;
            print_report(&report);

            if report.is_success() {
                tracing::info!(command = "sync", ?report, "Synchronisation complete");
                Ok(())
            } else {
                tracing::error!(command = "sync", failed = ?report.failed_ids(), "Synchronisation finished with failures");
                Err(anyhow::anyhow!(
                    "{} document(s) failed to sync{}",
                    report.failed.len(),
                    report
                        .persist_error
                        .as_deref()
                        .map(|e| format!("; fingerprint store not saved: {e}"))
                        .unwrap_or_default()
                ))
            }
        }
        Commands::Convert { file, notion } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let blocks = map_tokens(&tokenize(&content));
            tracing::info!(command = "convert", file = %file.display(), blocks = blocks.len(), "Converted document");

            let json = if notion {
                let rendered: Vec<_> = blocks.iter().map(block_to_notion).collect();
                serde_json::to_string_pretty(&rendered)?
            } else {
                serde_json::to_string_pretty(&blocks)?
            };
            println!("{json}");
            Ok(())
        }
    }
}

/// Run one sync pass for `config` against any [`DocumentStore`].
///
/// Fails only when the document directory cannot be listed; per-document
/// failures are part of the returned report.
pub async fn sync_with_store<S>(config: &CliConfig, store: &S, options: SyncOptions) -> Result<SyncReport>
where
    S: DocumentStore + ?Sized,
{
    let source = DirectorySource::new(&config.source.dir, config.source.extension.as_str());
    let documents = source
        .load()
        .with_context(|| format!("Failed to list documents in {}", config.source.dir.display()))?;

    let mut fingerprints = FingerprintStore::load(&config.state_file);
    Ok(synchronise(documents, &mut fingerprints, &MarkdownTokenizer, store, options).await)
}

fn print_report(report: &SyncReport) {
    println!(
        "Synchronise complete: {} synced, {} unchanged, {} planned, {} failed",
        report.synced.len(),
        report.unchanged.len(),
        report.planned.len(),
        report.failed.len()
    );
    for failed in &report.failed {
        println!("  failed: {} ({})", failed.id, failed.cause);
    }
    if let Some(e) = &report.persist_error {
        println!("  fingerprint store not saved: {e}");
    }
}
