use std::sync::LazyLock;

use regex::Regex;

use super::rich_text::parse_inline_bold;
use crate::notion::types::WriteBlock;

static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(#{1,3})\s+(.*)$").unwrap());
static DIVIDER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-{3,}$").unwrap());
static BULLET_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\s*)-\s+(.*)$").unwrap());

const INDENT_WIDTH: usize = 4;

/// Compile feedback Markdown into blocks ready to append.
///
/// Supported: `#`..`###` headings, `---` dividers, `-` bullets nested by
/// 4-space indents, `**bold**`, paragraphs. Anything else (numbered lists, fenced code, ...)
/// lands verbatim in a paragraph.
pub fn compile(markdown: &str) -> Vec<WriteBlock> {
    if markdown.trim().is_empty() {
        return Vec::new();
    }

    let normalized = markdown.replace("\r\n", "\n").replace('\r', "\n");
    let mut state = CompileState::default();

    for raw_line in normalized.split('\n') {
        let line = raw_line.replace('\t', "    ");
        let trimmed = line.trim();

        // ── Blank line: ends paragraphs and lists ──
        if trimmed.is_empty() {
            state.flush_paragraph();
            state.list_stack.clear();
            continue;
        }

        // ── Heading: # / ## / ### ──
        if let Some(caps) = HEADING_RE.captures(&line) {
            state.flush_paragraph();
            state.list_stack.clear();
            state.blocks.push(WriteBlock::Heading {
                level: caps[1].len() as u8,
                rich_text: parse_inline_bold(caps[2].trim()),
            });
            continue;
        }

        // ── Divider: a line of three or more dashes ──
        if DIVIDER_RE.is_match(trimmed) {
            state.flush_paragraph();
            state.list_stack.clear();
            state.blocks.push(WriteBlock::Divider);
            continue;
        }

        // ── Bullet: - item, nested by indent ──
        if let Some(caps) = BULLET_RE.captures(&line) {
            state.flush_paragraph();
            let level = caps[1].chars().count() / INDENT_WIDTH;
            state.push_bullet(level, caps[2].trim());
            continue;
        }

        // ── Anything else joins the open paragraph ──
        state.list_stack.clear();
        state.paragraph.push(trimmed.to_string());
    }

    state.flush_paragraph();
    state.blocks
}

#[derive(Default)]
struct CompileState {
    blocks: Vec<WriteBlock>,
    paragraph: Vec<String>,
    /// Open bullet per nesting level, as an index path into `blocks`.
    list_stack: Vec<Option<Vec<usize>>>,
}

impl CompileState {
    fn flush_paragraph(&mut self) {
        if self.paragraph.is_empty() {
            return;
        }
        let text = self.paragraph.join("\n");
        self.paragraph.clear();

        let text = text.trim();
        if !text.is_empty() {
            self.blocks.push(WriteBlock::Paragraph {
                rich_text: parse_inline_bold(text),
            });
        }
    }

    fn push_bullet(&mut self, level: usize, text: &str) {
        if text.is_empty() {
            self.list_stack.truncate(level);
            return;
        }

        let item = WriteBlock::BulletedListItem {
            rich_text: parse_inline_bold(text),
            children: Vec::new(),
        };

        let parent_path = match level {
            0 => None,
            _ => self.list_stack.get(level - 1).cloned().flatten(),
        };

        let path = match parent_path.and_then(|p| self.attach_child(&p, item.clone()).map(|i| (p, i))) {
            Some((mut p, index)) => {
                p.push(index);
                p
            }
            None => {
                self.blocks.push(item);
                vec![self.blocks.len() - 1]
            }
        };

        if self.list_stack.len() <= level {
            self.list_stack.resize(level + 1, None);
        }
        self.list_stack[level] = Some(path);
        self.list_stack.truncate(level + 1);
    }

    /// Push `child` under the bullet at `path`, returning its index there.
    fn attach_child(&mut self, path: &[usize], child: WriteBlock) -> Option<usize> {
        let (first, rest) = path.split_first()?;
        let mut node = self.blocks.get_mut(*first)?;
        for &i in rest {
            node = match node {
                WriteBlock::BulletedListItem { children, .. } => children.get_mut(i)?,
                _ => return None,
            };
        }
        match node {
            WriteBlock::BulletedListItem { children, .. } => {
                children.push(child);
                Some(children.len() - 1)
            }
            _ => None,
        }
    }
}

// ── Tests ──
