use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading settings or processing a page.
#[derive(Error, Debug)]
pub enum Error {
    #[error("missing required setting: {0}")]
    MissingSetting(String),

    #[error("HTTP {status} {status_text} - {url}\n{body}")]
    Http {
        status: u16,
        status_text: String,
        url: String,
        body: String,
    },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The page has no "AIフィードバック" heading, or no divider after it.
    #[error("AIフィードバックの見出しまたはdividerが見つかりません pageId={page_id}")]
    FeedbackRegionNotFound { page_id: String },

    #[error("generation returned no text")]
    EmptyGeneration,

    #[error("failed to read prompt {}: {source}", path.display())]
    Prompt {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
