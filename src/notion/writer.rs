use chrono::{SecondsFormat, Utc};
use serde_json::json;
use tracing::debug;

use super::client::{NotionClient, PAGE_SIZE};
use super::{COMPLETED_AT_PROPERTY, DONE_PROPERTY};
use crate::error::Result;
use crate::markdown::compile;

/// Replace a page's feedback region with `feedback_markdown` and mark the page done.
///
/// Steps run strictly in order and stop at the first failure: archive the
/// stale feedback blocks, append the new ones under the container, then flip
/// the page's done flag. The flag is only touched once everything else succeeded.
pub async fn write_feedback(
    client: &NotionClient,
    page_id: &str,
    feedback_markdown: &str,
    container_id: &str,
    stale_ids: &[String],
) -> Result<()> {
    for block_id in stale_ids {
        client.archive_block(block_id).await?;
    }
    debug!("Archived {} stale feedback blocks on {}", stale_ids.len(), page_id);

    let blocks = compile(feedback_markdown);
    for batch in blocks.chunks(PAGE_SIZE) {
        client.append_children(container_id, batch).await?;
    }
    debug!("Appended {} feedback blocks under {}", blocks.len(), container_id);

    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    let properties = json!({
        DONE_PROPERTY: { "checkbox": true },
        COMPLETED_AT_PROPERTY: { "date": { "start": now } },
    });
    client.update_page_properties(page_id, properties).await
}

// ── Tests ──
