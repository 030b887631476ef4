//! Block mapper: token stream → block sequence.
//!
//! The only state carried across tokens is the list grouping state, held in
//! an explicit `ListState` value owned by one [`map_tokens`] call. List
//! items are buffered until the list ends (or something else interrupts it)
//! and then emitted in order, exactly once.
//!
//! Lists do not nest in this model. A list start while another list is open
//! flushes the pending items of the outer list and then tracks the inner one;
//! items of both lists come out flat, in document order.

use tracing::debug;

use crate::block::{Block, DEFAULT_CODE_LANGUAGE};
use crate::token::{InlineToken, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Ordered,
    Unordered,
}

/// Grouping state for the list currently being read.
#[derive(Debug, Default)]
struct ListState {
    kind: Option<ListKind>,
    pending: Vec<Block>,
}

impl ListState {
    fn open(&mut self, ordered: bool, out: &mut Vec<Block>) {
        if self.kind.is_some() {
            debug!(
                pending = self.pending.len(),
                "Nested list start, flattening into the enclosing list"
            );
        }
        self.flush(out);
        self.kind = Some(if ordered {
            ListKind::Ordered
        } else {
            ListKind::Unordered
        });
    }

    fn push_item(&mut self, text: &str) {
        self.pending.push(Block::ListItem {
            ordered: self.kind == Some(ListKind::Ordered),
            text: text.to_string(),
        });
    }

    /// Move pending items to the output; the list kind stays tracked so later
    /// items of the same list keep their ordered flag.
    fn flush(&mut self, out: &mut Vec<Block>) {
        out.append(&mut self.pending);
    }

    fn close(&mut self, out: &mut Vec<Block>) {
        self.flush(out);
        self.kind = None;
    }
}

/// Map an ordered token sequence into blocks.
///
/// Total and deterministic: unsupported tokens are skipped, never an error.
pub fn map_tokens(tokens: &[Token]) -> Vec<Block> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut list = ListState::default();

    for token in tokens {
        match token {
            Token::Heading { level, text } => {
                list.flush(&mut out);
                out.push(Block::Heading {
                    level: *level,
                    text: text.clone(),
                });
            }
            Token::Paragraph { text, inline } => {
                list.flush(&mut out);
                match inline.first() {
                    Some(InlineToken::Image { url }) => out.push(Block::Image { url: url.clone() }),
                    _ => out.push(Block::Paragraph { text: text.clone() }),
                }
            }
            Token::ListStart { ordered } => list.open(*ordered, &mut out),
            Token::ListItem { text } => list.push_item(text),
            Token::ListEnd => list.close(&mut out),
            Token::Image { url } => {
                list.flush(&mut out);
                out.push(Block::Image { url: url.clone() });
            }
            Token::Code { text, language } => {
                list.flush(&mut out);
                out.push(Block::Code {
                    text: text.clone(),
                    language: language
                        .clone()
                        .unwrap_or_else(|| DEFAULT_CODE_LANGUAGE.to_string()),
                });
            }
            Token::Unsupported { kind } => {
                debug!(kind = %kind, "Skipping unsupported token");
            }
        }
    }

    // Documents may end mid-list without an explicit end marker.
    list.close(&mut out);
    out
}
