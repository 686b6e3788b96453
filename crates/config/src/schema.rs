/// Config schema types (review flow, evaluator backend, channels).
use std::{path::PathBuf, time::Duration};

use {
    folio_common::Mode,
    folio_markup::DEFAULT_FRAGMENT_LIMIT,
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Quiet period after the last image of an album.
pub const DEFAULT_DEBOUNCE_MS: u64 = 800;

pub const DEFAULT_EVALUATION_TIMEOUT_SECS: u64 = 120;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FolioConfig {
    pub review: ReviewConfig,
    pub evaluator: EvaluatorConfig,
    pub channels: ChannelsConfig,
}

/// How incoming images are grouped and how feedback is delivered.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// Quiet period after the last image before a submission is dispatched.
    pub debounce_ms: u64,
    /// Maximum size of one outbound message, in bytes. Must be within
    /// `1..=4096`, Telegram's message limit.
    pub fragment_limit: usize,
    /// Upper bound on a single evaluator call.
    pub evaluation_timeout_secs: u64,
    /// Mode used for conversations that never picked one.
    pub default_mode: Mode,
    /// Where downloaded images are kept until their review is delivered.
    /// Defaults to a `folio` directory under the system temp dir.
    pub download_dir: Option<PathBuf>,
}

impl ReviewConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn evaluation_timeout(&self) -> Duration {
        Duration::from_secs(self.evaluation_timeout_secs)
    }

    pub fn resolved_download_dir(&self) -> PathBuf {
        self.download_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("folio"))
    }
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            fragment_limit: DEFAULT_FRAGMENT_LIMIT,
            evaluation_timeout_secs: DEFAULT_EVALUATION_TIMEOUT_SECS,
            default_mode: Mode::Basic,
            download_dir: None,
        }
    }
}

/// OpenAI-compatible vision endpoint used to score portfolios.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    pub base_url: String,
    #[serde(
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub api_key: Option<Secret<String>>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            api_key: None,
            model: "gpt-4o-mini".into(),
            max_tokens: 1500,
            temperature: 0.7,
        }
    }
}

impl std::fmt::Debug for EvaluatorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluatorConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .finish()
    }
}

/// Raw per-channel settings, decoded by the channel crate that owns them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelsConfig {
    pub telegram: Option<serde_json::Value>,
}

// ── Serde helpers for Secret<String> ────────────────────────────────────────

fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}
