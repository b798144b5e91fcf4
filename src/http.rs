use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// Read a response body as JSON, turning any non-2xx status into [`Error::Http`].
pub async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let url = response.url().to_string();
    let text = response.text().await?;

    if !status.is_success() {
        return Err(Error::Http {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_string(),
            url,
            body: text,
        });
    }

    let body = if text.trim().is_empty() { "null" } else { &text };
    Ok(serde_json::from_str(body)?)
}
