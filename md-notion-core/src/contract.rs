//! # contract: trait seams between the core and its collaborators
//!
//! The sync pipeline talks to two collaborators it does not implement itself:
//! - a [`Tokenizer`] turning raw Markdown into [`Token`]s,
//! - a [`DocumentStore`] accepting a title and a block sequence.
//!
//! Both are injected into [`crate::synchronise::synchronise`] so tests can
//! substitute deterministic fakes. With the `test-export-mocks` feature
//! (on by default) the `mockall` mocks are exported for downstream crates.

use async_trait::async_trait;
use mockall::automock;

use crate::block::Block;
use crate::token::Token;

/// Error returned by a remote store push. Kept opaque: the core only needs to
/// know that the push failed and why, for the report.
pub type PushError = Box<dyn std::error::Error + Send + Sync>;

/// What the remote store hands back after an upsert.
///
/// The core never interprets the id; it is surfaced in logs only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertedPage {
    pub page_id: String,
}

/// Remote document store able to create or replace a page from blocks.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create or replace the page titled `title` so that its content is `blocks`.
    async fn upsert(&self, title: &str, blocks: &[Block]) -> Result<UpsertedPage, PushError>;
}

/// Lexer from Markdown text into the ordered token stream the mapper consumes.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<Token>;
}
