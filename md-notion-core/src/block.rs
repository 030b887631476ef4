//! Block schema accepted by the remote document store.
//!
//! A block has no identity of its own: its position in the mapped sequence is
//! all that distinguishes it. The remote store assigns ids on creation.

use serde::{Deserialize, Serialize};

/// Language attached to code blocks whose fence carries none.
pub const DEFAULT_CODE_LANGUAGE: &str = "plaintext";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Heading { level: u8, text: String },
    Paragraph { text: String },
    ListItem { ordered: bool, text: String },
    Image { url: String },
    Code { text: String, language: String },
}

impl Block {
    /// Short name of the variant, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Block::Heading { .. } => "heading",
            Block::Paragraph { .. } => "paragraph",
            Block::ListItem { .. } => "list_item",
            Block::Image { .. } => "image",
            Block::Code { .. } => "code",
        }
    }
}
