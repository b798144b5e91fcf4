use std::sync::LazyLock;

use regex::Regex;

use crate::notion::types::WriteRichText;

/// Per-span content limit, kept under the API's hard limit of 2000.
pub const SPAN_LIMIT: usize = 1990;
/// Maximum number of spans in one rich-text field.
pub const MAX_SPANS: usize = 100;

pub const TRUNCATION_NOTE: &str = "…（文字数制限のため一部省略）";

static BOLD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").unwrap());

/// Split `text` into at most `max_spans` pieces of at most `limit` chars each.
///
/// A cut prefers the last newline of the window when it falls in the back 40%
/// of it; the newline stays with the emitted piece. Text left over once
/// `max_spans` is reached is replaced by [`TRUNCATION_NOTE`].
pub fn chunk_text(text: &str, limit: usize, max_spans: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut chunks: Vec<String> = Vec::new();
    let mut rest = text;

    while !rest.is_empty() && chunks.len() < max_spans {
        let Some(window_end) = byte_offset(rest, limit) else {
            chunks.push(rest.to_string());
            rest = "";
            break;
        };

        let window = &rest[..window_end];
        let cut = match window.rfind('\n') {
            Some(nl) if window[..nl].chars().count() > limit * 6 / 10 => nl + 1,
            _ => window_end,
        };

        chunks.push(rest[..cut].to_string());
        rest = &rest[cut..];
    }

    if !rest.is_empty() {
        if let Some(last) = chunks.last_mut() {
            append_truncation_note(last, limit);
        }
    }

    chunks
}

/// Chunk `text` with the default limits into spans sharing one style.
pub fn chunk_rich_text(text: &str, bold: bool) -> Vec<WriteRichText> {
    chunk_text(text, SPAN_LIMIT, MAX_SPANS)
        .into_iter()
        .map(|content| WriteRichText { content, bold })
        .collect()
}

/// Parse `**bold**` runs into styled spans. Empty runs are dropped.
pub fn parse_inline_bold(text: &str) -> Vec<WriteRichText> {
    let mut spans = Vec::new();
    let mut cursor = 0;

    for caps in BOLD_RE.captures_iter(text) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        spans.extend(chunk_rich_text(&text[cursor..whole.start()], false));
        spans.extend(chunk_rich_text(inner.as_str(), true));
        cursor = whole.end();
    }
    spans.extend(chunk_rich_text(&text[cursor..], false));

    // Many short runs can still overflow the field's span budget.
    if spans.len() > MAX_SPANS {
        spans.truncate(MAX_SPANS);
        if let Some(last) = spans.last_mut() {
            append_truncation_note(&mut last.content, SPAN_LIMIT);
        }
    }

    spans
}

fn append_truncation_note(last: &mut String, limit: usize) {
    let sep = if last.ends_with('\n') { "" } else { "\n" };
    let merged = format!("{last}{sep}{TRUNCATION_NOTE}");
    *last = if merged.chars().count() <= limit {
        merged
    } else {
        TRUNCATION_NOTE.to_string()
    };
}

/// Byte offset of the `n`th char, or None when `s` has `n` chars or fewer.
fn byte_offset(s: &str, n: usize) -> Option<usize> {
    s.char_indices().nth(n).map(|(i, _)| i)
}

// ── Tests ──
