use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{Error, Result};

/// Path of the system prompt for `version`: `<dir>/prompt_<version>.md`.
pub fn prompt_path(dir: &Path, version: &str) -> PathBuf {
    dir.join(format!("prompt_{version}.md"))
}

pub async fn load_prompt(dir: &Path, version: &str) -> Result<String> {
    let path = prompt_path(dir, version);
    let text = tokio::fs::read_to_string(&path)
        .await
        .map_err(|source| Error::Prompt { path: path.clone(), source })?;
    info!("Loaded prompt {} ({} chars)", path.display(), text.chars().count());
    Ok(text)
}

// ── Tests ──
