use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::trace;

use crate::notion::types::{Block, BlockContent};

static BLANK_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Flatten a `rich_text` array into plain text. Anything but an array yields "".
pub fn plain_text(rich_text: &Value) -> String {
    let Some(spans) = rich_text.as_array() else {
        return String::new();
    };
    spans
        .iter()
        .map(|span| span.get("plain_text").and_then(Value::as_str).unwrap_or(""))
        .collect()
}

/// Like [`plain_text`], but a span without `plain_text` falls back to its
/// `text.content`. Request-shaped spans only carry the latter.
pub fn span_text(rich_text: &Value) -> String {
    let Some(spans) = rich_text.as_array() else {
        return String::new();
    };
    spans
        .iter()
        .map(|span| {
            span.get("plain_text")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .or_else(|| span.pointer("/text/content").and_then(Value::as_str))
                .unwrap_or("")
        })
        .collect()
}

/// Render one block as a single Markdown line, or "" if it contributes nothing.
///
/// Nesting is ignored on purpose: every block becomes one line at the top level.
pub fn render_line(block: &Block) -> String {
    match &block.content {
        BlockContent::Heading1(rt) => heading("#", rt),
        BlockContent::Heading2(rt) => heading("##", rt),
        BlockContent::Heading3(rt) => heading("###", rt),
        BlockContent::Divider => "---".to_string(),
        BlockContent::BulletedListItem(rt) => prefixed("- ", rt),
        BlockContent::Paragraph(rt) => plain_text(rt).trim().to_string(),
        BlockContent::Callout(rt) => prefixed("## ", rt),
        BlockContent::Unsupported(kind) => {
            trace!("Not rendering {} block {}", kind, block.id);
            String::new()
        }
    }
}

/// An empty heading still renders as its bare `#` prefix.
fn heading(hashes: &str, rich_text: &Value) -> String {
    let text = plain_text(rich_text);
    format!("{hashes} {}", text.trim()).trim_end().to_string()
}

fn prefixed(prefix: &str, rich_text: &Value) -> String {
    let text = plain_text(rich_text);
    let text = text.trim();
    if text.is_empty() {
        String::new()
    } else {
        format!("{prefix}{text}")
    }
}

/// Render a page body into report Markdown.
pub fn assemble_report(blocks: &[Block]) -> String {
    let lines: Vec<String> = blocks
        .iter()
        .map(render_line)
        .filter(|line| !line.is_empty())
        .collect();

    let joined = lines.join("\n");
    BLANK_RUN_RE.replace_all(&joined, "\n\n").trim().to_string()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn block(kind: &str, text: &str) -> Block {
        serde_json::from_value(json!({
            "id": format!("id-{kind}"),
            "type": kind,
            "has_children": false,
            kind: { "rich_text": [{ "plain_text": text }] }
        }))
        .unwrap()
    }

    #[test]
    fn plain_text_concatenates_spans() {
        let rt = json!([{ "plain_text": "Hello" }, { "plain_text": " " }, { "plain_text": "World" }]);
        assert_eq!(plain_text(&rt), "Hello World");
    }

    #[test]
    fn plain_text_non_array_is_empty() {
        for value in [Value::Null, json!("text"), json!(42), json!({ "plain_text": "x" })] {
            assert_eq!(plain_text(&value), "");
        }
    }

    #[test]
    fn plain_text_skips_malformed_spans() {
        let rt = json!([{ "plain_text": "a" }, {}, null, { "plain_text": 3 }, { "plain_text": "b" }]);
        assert_eq!(plain_text(&rt), "ab");
    }

    #[test]
    fn headings_and_divider() {
        assert_eq!(render_line(&block("heading_1", "見出し")), "# 見出し");
        assert_eq!(render_line(&block("heading_2", " 業務 ")), "## 業務");
        assert_eq!(render_line(&block("heading_3", "小見出し")), "### 小見出し");
        assert_eq!(render_line(&block("heading_3", "")), "###");
        assert_eq!(render_line(&block("divider", "")), "---");
    }

    #[test]
    fn heading_text_is_trimmed_inside_prefix() {
        assert_eq!(render_line(&block("heading_1", "\u{3000}全角空白 ")), "# 全角空白");
        assert_eq!(render_line(&block("heading_2", "  ")), "##");
        assert_eq!(render_line(&block("heading_3", "\t小\n")), "### 小");
    }

    #[test]
    fn span_text_falls_back_to_content() {
        let rt = json!([
            { "text": { "content": "AI" } },
            { "plain_text": "", "text": { "content": "フィード" } },
            { "plain_text": "バック", "text": { "content": "ignored" } },
            {},
        ]);
        assert_eq!(span_text(&rt), "AIフィードバック");
        assert_eq!(plain_text(&rt), "バック");
        assert_eq!(span_text(&Value::Null), "");
    }

    #[test]
    fn bullets_paragraphs_callouts() {
        assert_eq!(render_line(&block("bulleted_list_item", " 項目 ")), "- 項目");
        assert_eq!(render_line(&block("bulleted_list_item", "  ")), "");
        assert_eq!(render_line(&block("paragraph", "本文\n")), "本文");
        assert_eq!(render_line(&block("paragraph", "")), "");
        assert_eq!(render_line(&block("callout", "注意")), "## 注意");
        assert_eq!(render_line(&block("callout", " ")), "");
    }

    #[test]
    fn unknown_type_renders_empty() {
        assert_eq!(render_line(&block("toggle", "hidden")), "");
        assert_eq!(render_line(&block("numbered_list_item", "1")), "");
    }

    #[test]
    fn rendering_ignores_children_flag() {
        let mut b = block("bulleted_list_item", "親");
        b.has_children = true;
        assert_eq!(render_line(&b), "- 親");
    }

    #[test]
    fn assemble_simple_report() {
        let blocks = vec![block("heading_2", "業務内容"), block("paragraph", "タスクAを実施")];
        assert_eq!(assemble_report(&blocks), "## 業務内容\nタスクAを実施");
    }

    #[test]
    fn assemble_skips_empty_lines() {
        let blocks = vec![
            block("paragraph", ""),
            block("heading_2", "A"),
            block("toggle", "x"),
            block("paragraph", ""),
            block("bulleted_list_item", "b"),
        ];
        assert_eq!(assemble_report(&blocks), "## A\n- b");
    }

    #[test]
    fn assemble_collapses_blank_runs() {
        let blocks = vec![
            block("paragraph", "上\n\n\n\n中"),
            block("divider", ""),
            block("paragraph", "下\n\n\n"),
        ];
        let md = assemble_report(&blocks);
        assert_eq!(md, "上\n\n中\n---\n下");
        assert!(!md.contains("\n\n\n"));
        assert_eq!(md.trim(), md);
    }

    #[test]
    fn assemble_empty_input() {
        assert_eq!(assemble_report(&[]), "");
    }
}
