use std::collections::HashMap;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::error::{Error, Result};

pub const DEFAULT_NOTION_API_BASE: &str = "https://api.notion.com/v1";
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Resolves a named setting. Empty values count as unset.
pub trait SettingsSource {
    fn get(&self, key: &str) -> Option<String>;
}

/// Process environment (after `.env` has been loaded by the binary).
pub struct EnvSource;

impl SettingsSource for EnvSource {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Fixed key/value pairs, such as command-line overrides.
#[derive(Default)]
pub struct MapSource(HashMap<String, String>);

impl MapSource {
    pub fn new<K: Into<String>, V: Into<String>>(pairs: impl IntoIterator<Item = (K, V)>) -> Self {
        Self(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }
}

impl SettingsSource for MapSource {
    fn get(&self, key: &str) -> Option<String> {
        self.0.get(key).cloned()
    }
}

/// Asks each source in order; the first non-empty answer wins.
pub struct Layered(Vec<Box<dyn SettingsSource>>);

impl Layered {
    pub fn new(sources: Vec<Box<dyn SettingsSource>>) -> Self {
        Self(sources)
    }
}

impl SettingsSource for Layered {
    fn get(&self, key: &str) -> Option<String> {
        self.0
            .iter()
            .find_map(|s| s.get(key).filter(|v| !v.is_empty()))
    }
}

#[derive(Debug, Clone)]
pub struct NotionSettings {
    pub token: String,
    pub data_source_id: String,
    pub version: String,
    pub api_base: String,
}

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: String,
    pub model: String,
    pub api_base: String,
}

#[derive(Debug, Clone)]
pub struct BatchSettings {
    pub max_items_per_run: usize,
    /// Reports shorter than this (in chars) are skipped.
    pub min_body_chars: usize,
    /// Pause between pages, sized for the generation API's rate limit.
    pub gemini_interval_ms: u64,
    pub prompt_version: String,
    pub debug: bool,
}

/// Everything one run needs. Built once and passed by reference.
#[derive(Debug, Clone)]
pub struct Config {
    pub notion: NotionSettings,
    pub gemini: GeminiSettings,
    pub batch: BatchSettings,
    pub prompt_dir: PathBuf,
}

impl Config {
    pub fn from_source(source: &dyn SettingsSource) -> Result<Self> {
        let optional = |key: &str| source.get(key).filter(|v| !v.is_empty());
        let required = |key: &str| optional(key).ok_or_else(|| Error::MissingSetting(key.to_string()));
        let or_default = |key: &str, default: &str| optional(key).unwrap_or_else(|| default.to_string());

        let config = Config {
            notion: NotionSettings {
                token: required("NOTION_TOKEN")?,
                data_source_id: required("NOTION_DATA_SOURCE_ID")?,
                version: or_default("NOTION_VERSION", "2025-09-03"),
                api_base: or_default("NOTION_API_BASE", DEFAULT_NOTION_API_BASE),
            },
            gemini: GeminiSettings {
                api_key: required("GEMINI_API_KEY")?,
                model: or_default("GEMINI_MODEL", "gemini-2.5-flash"),
                api_base: or_default("GEMINI_API_BASE", DEFAULT_GEMINI_API_BASE),
            },
            batch: BatchSettings {
                max_items_per_run: parse_or("MAX_ITEMS_PER_RUN", optional("MAX_ITEMS_PER_RUN"), 5),
                min_body_chars: parse_or("MIN_BODY_CHARS", optional("MIN_BODY_CHARS"), 80),
                gemini_interval_ms: parse_or("GEMINI_INTERVAL_MS", optional("GEMINI_INTERVAL_MS"), 15_000),
                prompt_version: or_default("PROMPT_VERSION", "v1.0"),
                debug: optional("DEBUG").as_deref() == Some("1"),
            },
            prompt_dir: PathBuf::from(or_default("PROMPT_DIR", "prompts")),
        };

        debug!(
            "Config loaded: data_source={} model={} max_items={} min_chars={} interval_ms={} prompt={}",
            config.notion.data_source_id,
            config.gemini.model,
            config.batch.max_items_per_run,
            config.batch.min_body_chars,
            config.batch.gemini_interval_ms,
            config.batch.prompt_version,
        );
        Ok(config)
    }

    /// `overrides` first, then the process environment.
    pub fn load(overrides: MapSource) -> Result<Self> {
        let sources: Vec<Box<dyn SettingsSource>> = vec![Box::new(overrides), Box::new(EnvSource)];
        Self::from_source(&Layered::new(sources))
    }
}

/// Correlation ID for log lines: the serverless request ID when there is one.
pub fn request_id(source: &dyn SettingsSource) -> String {
    ["AWS_REQUEST_ID", "AWS_LAMBDA_LOG_STREAM_NAME"]
        .iter()
        .find_map(|key| source.get(key).filter(|v| !v.is_empty()))
        .unwrap_or_else(|| "local".to_string())
}

fn parse_or<T: std::str::FromStr + std::fmt::Display>(key: &str, value: Option<String>, fallback: T) -> T {
    let Some(raw) = value else {
        return fallback;
    };
    match raw.trim().parse() {
        Ok(v) => v,
        Err(_) => {
            warn!("{}={:?} is not a valid number, using {}", key, raw, fallback);
            fallback
        }
    }
}

/// Config pointing both APIs at local mock servers, with no pacing.
#[cfg(test)]
pub fn test_config(notion_base: &str, gemini_base: &str) -> Config {
    Config {
        notion: NotionSettings {
            token: "secret".into(),
            data_source_id: "ds-123".into(),
            version: "2025-09-03".into(),
            api_base: notion_base.into(),
        },
        gemini: GeminiSettings {
            api_key: "key".into(),
            model: "gemini-2.5-flash".into(),
            api_base: gemini_base.into(),
        },
        batch: BatchSettings {
            max_items_per_run: 5,
            min_body_chars: 10,
            gemini_interval_ms: 0,
            prompt_version: "v1.0".into(),
            debug: false,
        },
        prompt_dir: PathBuf::from("prompts"),
    }
}

// ── Tests ──
