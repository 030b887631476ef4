//! Token model and the Markdown tokenizer.
//!
//! The tokenizer lowers the `pulldown-cmark` event stream into a flat,
//! ordered sequence of [`Token`]s. Block constructs the mapper has no shape
//! for are reported as [`Token::Unsupported`] and their content is dropped,
//! so downstream code never has to reason about CommonMark nesting.
//!
//! List items are flattened: the text of an item (including the text of any
//! loose-list paragraphs it contains) becomes a single [`Token::ListItem`].
//! When a nested list, code block or image interrupts an item, the text
//! gathered so far is emitted first so document order is preserved.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::contract::Tokenizer;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Token {
    Heading {
        level: u8,
        text: String,
    },
    Paragraph {
        text: String,
        inline: Vec<InlineToken>,
    },
    ListStart {
        ordered: bool,
    },
    ListItem {
        text: String,
    },
    ListEnd,
    Image {
        url: String,
    },
    Code {
        text: String,
        language: Option<String>,
    },
    /// A block construct with no block shape (block quote, table, rule, ...).
    Unsupported {
        kind: String,
    },
}

/// Inline content of a paragraph, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum InlineToken {
    Text(String),
    Code(String),
    Image { url: String },
    Link { url: String, text: String },
}

/// Production tokenizer backed by `pulldown-cmark`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownTokenizer;

impl Tokenizer for MarkdownTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        tokenize(text)
    }
}

/// Tokenize Markdown source into an ordered token sequence.
pub fn tokenize(source: &str) -> Vec<Token> {
    let options = Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TABLES
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_FOOTNOTES;
    let events: Vec<Event<'_>> = Parser::new_ext(source, options).collect();

    let mut lexer = Lexer::default();
    lexer.run(&events);
    debug!(tokens = lexer.tokens.len(), "Tokenized markdown source");
    lexer.tokens
}

#[derive(Default)]
struct ItemBuffer {
    text: String,
    emitted: bool,
}

#[derive(Default)]
struct Lexer {
    tokens: Vec<Token>,
    /// Open list items, innermost last.
    items: Vec<ItemBuffer>,
}

impl Lexer {
    fn run(&mut self, events: &[Event<'_>]) {
        let mut i = 0;
        while i < events.len() {
            match &events[i] {
                Event::Start(Tag::Heading { level, .. }) => {
                    i += 1;
                    let inline = collect_inlines(events, &mut i, &|e| {
                        matches!(e, TagEnd::Heading(_))
                    });
                    self.flush_item();
                    self.tokens.push(Token::Heading {
                        level: *level as u8,
                        text: plain_text(&inline),
                    });
                }

                Event::Start(Tag::Paragraph) => {
                    i += 1;
                    let inline =
                        collect_inlines(events, &mut i, &|e| matches!(e, TagEnd::Paragraph));
                    self.paragraph(inline);
                }

                Event::Start(Tag::List(start)) => {
                    self.flush_item();
                    self.tokens.push(Token::ListStart {
                        ordered: start.is_some(),
                    });
                }
                Event::End(TagEnd::List(_)) => self.tokens.push(Token::ListEnd),

                Event::Start(Tag::Item) => self.items.push(ItemBuffer::default()),
                Event::End(TagEnd::Item) => {
                    if let Some(item) = self.items.pop() {
                        let text = item.text.trim();
                        if !item.emitted || !text.is_empty() {
                            self.tokens.push(Token::ListItem {
                                text: text.to_string(),
                            });
                        }
                    }
                }

                Event::Start(Tag::CodeBlock(kind)) => {
                    let language = match kind {
                        CodeBlockKind::Fenced(info) => info
                            .split_whitespace()
                            .next()
                            .map(|lang| lang.to_string()),
                        CodeBlockKind::Indented => None,
                    };
                    i += 1;
                    let mut text = String::new();
                    while i < events.len() {
                        match &events[i] {
                            Event::End(TagEnd::CodeBlock) => break,
                            Event::Text(s) => text.push_str(s),
                            _ => {}
                        }
                        i += 1;
                    }
                    self.flush_item();
                    self.tokens.push(Token::Code {
                        text: text.trim_end_matches('\n').to_string(),
                        language,
                    });
                }

                Event::Start(Tag::Image { dest_url, .. }) if !self.items.is_empty() => {
                    let url = dest_url.to_string();
                    skip_to_matching_end(events, &mut i);
                    self.flush_item();
                    self.tokens.push(Token::Image { url });
                }

                Event::Start(tag) if unsupported_kind(tag).is_some() => {
                    let kind = unsupported_kind(tag).unwrap_or("unknown");
                    skip_to_matching_end(events, &mut i);
                    self.unsupported(kind);
                }
                Event::Rule => self.unsupported("rule"),
                Event::Html(_) => self.unsupported("html"),
                Event::DisplayMath(_) => self.unsupported("math"),

                // Tight list items carry their inline content directly.
                Event::Text(s) | Event::Code(s) => {
                    if let Some(item) = self.items.last_mut() {
                        item.text.push_str(s);
                    }
                }
                Event::SoftBreak | Event::HardBreak => {
                    if let Some(item) = self.items.last_mut() {
                        item.text.push('\n');
                    }
                }

                _ => {}
            }
            i += 1;
        }
    }

    fn paragraph(&mut self, inline: Vec<InlineToken>) {
        if self.items.is_empty() {
            self.tokens.push(Token::Paragraph {
                text: plain_text(&inline),
                inline,
            });
            return;
        }

        if let Some(InlineToken::Image { url }) = inline.first() {
            let url = url.clone();
            self.flush_item();
            self.tokens.push(Token::Image { url });
            return;
        }

        if let Some(item) = self.items.last_mut() {
            if !item.text.is_empty() {
                item.text.push('\n');
            }
            item.text.push_str(&plain_text(&inline));
        }
    }

    /// Emit the innermost open item's text gathered so far. Called right
    /// before another token is emitted inside the item, so the item counts as
    /// emitted even when it had no text of its own.
    fn flush_item(&mut self) {
        if let Some(item) = self.items.last_mut() {
            let text = item.text.trim();
            if !text.is_empty() {
                self.tokens.push(Token::ListItem {
                    text: text.to_string(),
                });
            }
            item.text.clear();
            item.emitted = true;
        }
    }

    fn unsupported(&mut self, kind: &str) {
        self.tokens.push(Token::Unsupported {
            kind: kind.to_string(),
        });
    }
}

fn unsupported_kind(tag: &Tag<'_>) -> Option<&'static str> {
    match tag {
        Tag::BlockQuote(_) => Some("block_quote"),
        Tag::HtmlBlock => Some("html"),
        Tag::Table(_) => Some("table"),
        Tag::FootnoteDefinition(_) => Some("footnote_definition"),
        Tag::DefinitionList => Some("definition_list"),
        Tag::MetadataBlock(_) => Some("metadata"),
        _ => None,
    }
}

/// Advance `i` from a `Start` event to its matching `End`.
fn skip_to_matching_end(events: &[Event<'_>], i: &mut usize) {
    let mut depth = 0usize;
    while *i < events.len() {
        match &events[*i] {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return;
                }
            }
            _ => {}
        }
        *i += 1;
    }
}

/// Collect inline tokens until the end tag matching `is_end`, leaving `i` on it.
fn collect_inlines(
    events: &[Event<'_>],
    i: &mut usize,
    is_end: &dyn Fn(&TagEnd) -> bool,
) -> Vec<InlineToken> {
    let mut inline = Vec::new();
    while *i < events.len() {
        match &events[*i] {
            Event::End(end) if is_end(end) => break,
            Event::Text(s) => push_text(&mut inline, s),
            Event::SoftBreak | Event::HardBreak => push_text(&mut inline, "\n"),
            Event::Code(s) => inline.push(InlineToken::Code(s.to_string())),
            Event::Start(Tag::Image { dest_url, .. }) => {
                let url = dest_url.to_string();
                skip_to_matching_end(events, i);
                inline.push(InlineToken::Image { url });
            }
            Event::Start(Tag::Link { dest_url, .. }) => {
                let url = dest_url.to_string();
                *i += 1;
                let children = collect_inlines(events, i, &|e| matches!(e, TagEnd::Link));
                inline.push(InlineToken::Link {
                    url,
                    text: plain_text(&children),
                });
            }
            _ => {}
        }
        *i += 1;
    }
    inline
}

fn push_text(inline: &mut Vec<InlineToken>, s: &str) {
    if let Some(InlineToken::Text(prev)) = inline.last_mut() {
        prev.push_str(s);
    } else {
        inline.push(InlineToken::Text(s.to_string()));
    }
}

fn plain_text(inline: &[InlineToken]) -> String {
    inline
        .iter()
        .map(|token| match token {
            InlineToken::Text(s) | InlineToken::Code(s) => s.as_str(),
            InlineToken::Link { text, .. } => text.as_str(),
            InlineToken::Image { .. } => "",
        })
        .collect()
}
