use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::GeminiSettings;
use crate::error::{Error, Result};
use crate::http::read_json;

/// Produces feedback text for one report.
#[async_trait]
pub trait FeedbackGenerator: Send + Sync {
    async fn generate(&self, system_prompt: &str, report_markdown: &str) -> Result<String>;
}

/// User turn sent alongside the system prompt.
pub fn user_message(report_markdown: &str) -> String {
    format!(
        "日報本文:\n{report_markdown}\n\n\
         補足:\n\
         - この日報はNotionから抽出したblocksをMarkdown風に整形したものです。\n\
         - 見出しや箇条書きの構造を尊重し、文脈を読み取ってください。\n"
    )
}

// ── Wire types ──

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    system_instruction: RequestContent,
    contents: Vec<RequestContent>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Debug)]
struct RequestContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    top_p: f64,
}

#[derive(Deserialize, Debug)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

/// `generateContent` client for the Gemini API.
pub struct GeminiClient {
    http: Client,
    base: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(settings: &GeminiSettings) -> Result<Self> {
        Ok(Self {
            http: Client::builder().build()?,
            base: settings.api_base.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
        })
    }
}

#[async_trait]
impl FeedbackGenerator for GeminiClient {
    async fn generate(&self, system_prompt: &str, report_markdown: &str) -> Result<String> {
        let request = GenerateRequest {
            system_instruction: RequestContent {
                role: None,
                parts: vec![Part { text: system_prompt.to_string() }],
            },
            contents: vec![RequestContent {
                role: Some("user"),
                parts: vec![Part { text: user_message(report_markdown) }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.7,
                top_p: 0.95,
            },
        };

        let url = format!("{}/models/{}:generateContent", self.base, self.model);
        debug!("POST {}", url);
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;
        let body: GenerateResponse = read_json(response).await?;

        let text: String = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(Error::EmptyGeneration);
        }
        Ok(text)
    }
}

// ── Tests ──
