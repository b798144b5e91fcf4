use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tracing::debug;

use super::client::NotionClient;
use super::types::{Block, BlockContent};
use crate::error::{Error, Result};
use crate::markdown::render::span_text;

/// Heading text that marks the region feedback is written into.
pub const FEEDBACK_MARKER: &str = "AIフィードバック";

/// Delay between consecutive children requests (Notion allows ~3 req/s).
pub const DEFAULT_PACING: Duration = Duration::from_millis(250);

/// A page's body plus the location of its feedback region.
#[derive(Debug, Default)]
pub struct CollectedBlocks {
    /// Report body in document order, up to the marker heading.
    pub blocks: Vec<Block>,
    /// Parent of the marker heading; new feedback is appended here.
    pub feedback_container_id: Option<String>,
    pub feedback_divider_id: Option<String>,
    /// Blocks after the divider: the previous run's feedback.
    pub feedback_content_ids: Vec<String>,
}

impl CollectedBlocks {
    /// The container ID, provided both the marker and its divider were found.
    pub fn feedback_container(&self, page_id: &str) -> Result<&str> {
        match (&self.feedback_container_id, &self.feedback_divider_id) {
            (Some(container), Some(_)) => Ok(container.as_str()),
            _ => Err(Error::FeedbackRegionNotFound {
                page_id: page_id.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Collecting,
    SeekingDivider,
    CollectingFeedbackContent,
}

#[derive(Default)]
struct WalkState {
    collected: CollectedBlocks,
    /// Raised once a branch has found the marker; every branch checks it.
    stop: bool,
}

/// Depth-first, paginated walk of a page's block tree.
pub struct Collector<'a> {
    client: &'a NotionClient,
    pacing: Duration,
}

impl<'a> Collector<'a> {
    pub fn new(client: &'a NotionClient) -> Self {
        Self {
            client,
            pacing: DEFAULT_PACING,
        }
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub async fn collect(&self, root_id: &str) -> Result<CollectedBlocks> {
        let mut state = WalkState::default();
        self.walk(root_id, &mut state).await?;

        let c = &state.collected;
        debug!(
            "Collected {} blocks from {} (container={:?} divider={:?} stale={})",
            c.blocks.len(),
            root_id,
            c.feedback_container_id,
            c.feedback_divider_id,
            c.feedback_content_ids.len(),
        );
        Ok(state.collected)
    }

    fn walk<'s>(
        &'s self,
        block_id: &'s str,
        state: &'s mut WalkState,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 's>> {
        Box::pin(async move {
            let mut mode = Mode::Collecting;
            let mut cursor: Option<String> = None;

            loop {
                let page = self.client.list_children(block_id, cursor.as_deref()).await?;

                for block in page.results {
                    if state.stop {
                        break;
                    }

                    match mode {
                        Mode::Collecting => {
                            if is_marker(&block) {
                                state.collected.feedback_container_id = Some(block_id.to_string());
                                mode = Mode::SeekingDivider;
                                continue;
                            }

                            let child_id = block.has_children.then(|| block.id.clone());
                            state.collected.blocks.push(block);

                            if let Some(child_id) = child_id {
                                tokio::time::sleep(self.pacing).await;
                                self.walk(&child_id, state).await?;
                            }
                        }
                        Mode::SeekingDivider => {
                            if block.content == BlockContent::Divider {
                                state.collected.feedback_divider_id = Some(block.id);
                                mode = Mode::CollectingFeedbackContent;
                            }
                        }
                        Mode::CollectingFeedbackContent => {
                            state.collected.feedback_content_ids.push(block.id);
                        }
                    }
                }

                cursor = if page.has_more { page.next_cursor } else { None };
                match cursor {
                    Some(_) if !state.stop => tokio::time::sleep(self.pacing).await,
                    _ => break,
                }
            }

            if mode != Mode::Collecting {
                state.stop = true;
            }
            Ok(())
        })
    }
}

fn is_marker(block: &Block) -> bool {
    matches!(&block.content, BlockContent::Heading2(rt) if span_text(rt) == FEEDBACK_MARKER)
}

// ── Tests ──
