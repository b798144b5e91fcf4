use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Map, Value};

// ── Read model ──

/// One node of a page's content tree, as returned by `GET /blocks/{id}/children`.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "RawBlock")]
pub struct Block {
    pub id: String,
    pub has_children: bool,
    pub content: BlockContent,
}

/// Recognized block types carry their raw `rich_text` value (Null when absent).
#[derive(Debug, Clone, PartialEq)]
pub enum BlockContent {
    Heading1(Value),
    Heading2(Value),
    Heading3(Value),
    Divider,
    BulletedListItem(Value),
    Paragraph(Value),
    Callout(Value),
    Unsupported(String),
}

#[derive(Deserialize)]
struct RawBlock {
    id: String,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    has_children: bool,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl From<RawBlock> for Block {
    fn from(raw: RawBlock) -> Self {
        let rich_text = || {
            raw.fields
                .get(&raw.kind)
                .and_then(|body| body.get("rich_text"))
                .cloned()
                .unwrap_or(Value::Null)
        };

        let content = match raw.kind.as_str() {
            "heading_1" => BlockContent::Heading1(rich_text()),
            "heading_2" => BlockContent::Heading2(rich_text()),
            "heading_3" => BlockContent::Heading3(rich_text()),
            "divider" => BlockContent::Divider,
            "bulleted_list_item" => BlockContent::BulletedListItem(rich_text()),
            "paragraph" => BlockContent::Paragraph(rich_text()),
            "callout" => BlockContent::Callout(rich_text()),
            other => BlockContent::Unsupported(other.to_string()),
        };

        Block {
            id: raw.id,
            has_children: raw.has_children,
            content,
        }
    }
}

/// One page of `GET /blocks/{id}/children`.
#[derive(Debug, Deserialize)]
pub struct ChildrenPage {
    #[serde(default)]
    pub results: Vec<Block>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub results: Vec<PageRef>,
}

#[derive(Debug, Deserialize)]
pub struct PageRef {
    pub id: String,
}

// ── Write model ──

/// A text run to be written. `content` must stay under the per-span limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRichText {
    pub content: String,
    pub bold: bool,
}

impl WriteRichText {
    #[cfg(test)]
    pub fn plain(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            bold: false,
        }
    }
}

impl Serialize for WriteRichText {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut value = json!({
            "type": "text",
            "text": { "content": self.content },
        });
        if self.bold {
            value["annotations"] = json!({ "bold": true });
        }
        value.serialize(serializer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteBlock {
    Heading {
        level: u8,
        rich_text: Vec<WriteRichText>,
    },
    Paragraph {
        rich_text: Vec<WriteRichText>,
    },
    BulletedListItem {
        rich_text: Vec<WriteRichText>,
        children: Vec<WriteBlock>,
    },
    Divider,
}

impl WriteBlock {
    pub fn type_name(&self) -> &'static str {
        match self {
            WriteBlock::Heading { level: 1, .. } => "heading_1",
            WriteBlock::Heading { level: 2, .. } => "heading_2",
            WriteBlock::Heading { .. } => "heading_3",
            WriteBlock::Paragraph { .. } => "paragraph",
            WriteBlock::BulletedListItem { .. } => "bulleted_list_item",
            WriteBlock::Divider => "divider",
        }
    }

    pub fn rich_text(&self) -> &[WriteRichText] {
        match self {
            WriteBlock::Heading { rich_text, .. }
            | WriteBlock::Paragraph { rich_text }
            | WriteBlock::BulletedListItem { rich_text, .. } => rich_text,
            WriteBlock::Divider => &[],
        }
    }

    #[cfg(test)]
    pub fn children(&self) -> &[WriteBlock] {
        match self {
            WriteBlock::BulletedListItem { children, .. } => children,
            _ => &[],
        }
    }

    /// Concatenated content of every span, ignoring styling.
    #[cfg(test)]
    pub fn text(&self) -> String {
        self.rich_text().iter().map(|rt| rt.content.as_str()).collect()
    }
}

impl Serialize for WriteBlock {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let kind = self.type_name();
        let body = match self {
            WriteBlock::Divider => json!({}),
            WriteBlock::BulletedListItem { rich_text, children } if !children.is_empty() => {
                json!({ "rich_text": rich_text, "children": children })
            }
            _ => json!({ "rich_text": self.rich_text() }),
        };

        let mut value = Map::new();
        value.insert("object".into(), json!("block"));
        value.insert("type".into(), json!(kind));
        value.insert(kind.into(), body);
        value.serialize(serializer)
    }
}

// ── Tests ──
