//! Rendering of core [`Block`]s into Notion API block objects.

use md_notion_core::block::Block;
use serde_json::{json, Value};

/// Maximum length of the `content` of one Notion rich-text object.
pub const MAX_RICH_TEXT_LEN: usize = 2000;

/// Maximum number of rich-text objects in one block property.
pub const MAX_RICH_TEXT_OBJECTS: usize = 100;

/// Maximum number of children accepted by one create/append request.
pub const MAX_CHILDREN_PER_REQUEST: usize = 100;

/// Languages accepted by Notion code blocks, lowercase.
const NOTION_LANGUAGES: &[&str] = &[
    "abap", "arduino", "bash", "basic", "c", "clojure", "coffeescript", "c++", "c#", "css",
    "dart", "diff", "docker", "elixir", "elm", "erlang", "flow", "fortran", "f#", "gherkin",
    "glsl", "go", "graphql", "groovy", "haskell", "html", "java", "javascript", "json", "julia",
    "kotlin", "latex", "less", "lisp", "livescript", "lua", "makefile", "markdown", "markup",
    "matlab", "mermaid", "nix", "objective-c", "ocaml", "pascal", "perl", "php", "plain text",
    "powershell", "prolog", "protobuf", "python", "r", "reason", "ruby", "rust", "sass",
    "scala", "scheme", "scss", "shell", "sql", "swift", "typescript", "vb.net", "verilog",
    "vhdl", "visual basic", "webassembly", "xml", "yaml",
];

/// Map a fence language onto Notion's code language vocabulary.
pub fn notion_language(language: &str) -> &'static str {
    let lower = language.trim().to_ascii_lowercase();
    let alias = match lower.as_str() {
        "plaintext" | "text" | "txt" | "" => "plain text",
        "js" | "jsx" | "node" => "javascript",
        "ts" | "tsx" => "typescript",
        "py" | "python3" => "python",
        "rs" => "rust",
        "sh" | "zsh" => "shell",
        "console" => "bash",
        "yml" => "yaml",
        "md" => "markdown",
        "cpp" | "cxx" | "hpp" => "c++",
        "cs" | "csharp" => "c#",
        "rb" => "ruby",
        "kt" => "kotlin",
        "dockerfile" => "docker",
        "proto" => "protobuf",
        "golang" => "go",
        other => other,
    };
    NOTION_LANGUAGES
        .iter()
        .find(|candidate| **candidate == alias)
        .copied()
        .unwrap_or("plain text")
}

/// Split `text` into rich-text objects of at most [`MAX_RICH_TEXT_LEN`] chars.
///
/// Text beyond [`MAX_RICH_TEXT_OBJECTS`] objects is truncated.
pub fn rich_text(text: &str) -> Value {
    let chars: Vec<char> = text.chars().collect();
    let limit = MAX_RICH_TEXT_LEN * MAX_RICH_TEXT_OBJECTS;
    if chars.len() > limit {
        tracing::warn!(
            chars = chars.len(),
            limit,
            "Text exceeds Notion's rich-text limit, truncating"
        );
    }
    let parts: Vec<Value> = chars[..chars.len().min(limit)]
        .chunks(MAX_RICH_TEXT_LEN)
        .map(|chunk| {
            json!({
                "type": "text",
                "text": { "content": chunk.iter().collect::<String>() }
            })
        })
        .collect();
    Value::Array(parts)
}

pub fn block_to_notion(block: &Block) -> Value {
    match block {
        Block::Heading { level, text } => {
            let kind = match level {
                0 | 1 => "heading_1",
                2 => "heading_2",
                _ => "heading_3",
            };
            json!({
                "object": "block",
                "type": kind,
                kind: { "rich_text": rich_text(text) }
            })
        }
        Block::Paragraph { text } => json!({
            "object": "block",
            "type": "paragraph",
            "paragraph": { "rich_text": rich_text(text) }
        }),
        Block::ListItem { ordered, text } => {
            let kind = if *ordered {
                "numbered_list_item"
            } else {
                "bulleted_list_item"
            };
            json!({
                "object": "block",
                "type": kind,
                kind: { "rich_text": rich_text(text) }
            })
        }
        Block::Image { url } => json!({
            "object": "block",
            "type": "image",
            "image": { "type": "external", "external": { "url": url } }
        }),
        Block::Code { text, language } => json!({
            "object": "block",
            "type": "code",
            "code": {
                "rich_text": rich_text(text),
                "language": notion_language(language)
            }
        }),
    }
}

/// Body of a `POST /pages` request creating `title` under `parent_page_id`
/// with `children` as its first blocks.
pub fn create_page_body(parent_page_id: &str, title: &str, children: &[Block]) -> Value {
    json!({
        "parent": { "page_id": parent_page_id },
        "properties": {
            "title": { "title": rich_text(title) }
        },
        "children": children.iter().map(block_to_notion).collect::<Vec<_>>()
    })
}

/// Body of a `PATCH /blocks/{id}/children` request.
pub fn append_children_body(children: &[Block]) -> Value {
    json!({
        "children": children.iter().map(block_to_notion).collect::<Vec<_>>()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headings_clamp_to_three_levels() {
        for (level, expected) in [(1, "heading_1"), (2, "heading_2"), (3, "heading_3"), (6, "heading_3")] {
            let value = block_to_notion(&Block::Heading {
                level,
                text: "T".to_string(),
            });
            assert_eq!(value["type"], expected);
            assert_eq!(value[expected]["rich_text"][0]["text"]["content"], "T");
        }
    }

    #[test]
    fn language_aliases_and_fallback() {
        assert_eq!(notion_language("plaintext"), "plain text");
        assert_eq!(notion_language("py"), "python");
        assert_eq!(notion_language("Rust"), "rust");
        assert_eq!(notion_language("brainfuck"), "plain text");
    }

    #[test]
    fn long_text_is_chunked() {
        let text = "x".repeat(MAX_RICH_TEXT_LEN * 2 + 1);
        let value = rich_text(&text);
        let parts = value.as_array().unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(
            parts[2]["text"]["content"].as_str().unwrap().len(),
            1
        );
    }

    #[test]
    fn text_beyond_the_object_limit_is_truncated() {
        let text = "y".repeat(MAX_RICH_TEXT_LEN * MAX_RICH_TEXT_OBJECTS + 5);
        let value = rich_text(&text);
        let parts = value.as_array().unwrap();
        assert_eq!(parts.len(), MAX_RICH_TEXT_OBJECTS);
        assert_eq!(
            parts[MAX_RICH_TEXT_OBJECTS - 1]["text"]["content"]
                .as_str()
                .unwrap()
                .len(),
            MAX_RICH_TEXT_LEN
        );
    }

    #[test]
    fn empty_text_has_no_rich_text_objects() {
        assert_eq!(rich_text(""), json!([]));
    }
}
