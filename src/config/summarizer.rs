//! Narrative summarizer configuration.

use std::env;
use tracing::warn;

/// Where narrative summaries come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummarizerProvider {
    /// Deterministic text built locally from the payload
    Mock,
    /// OpenAI-compatible `/chat/completions` endpoint
    OpenAi,
    /// Azure OpenAI deployment
    Azure,
}

impl SummarizerProvider {
    /// Parse a provider name; unknown names fall back to the mock provider
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "mock" => Self::Mock,
            "openai" => Self::OpenAi,
            "azure" | "azure-openai" => Self::Azure,
            other => {
                warn!(provider = %other, "Unknown summarizer provider, using mock");
                Self::Mock
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mock => "mock",
            Self::OpenAi => "openai",
            Self::Azure => "azure",
        }
    }
}

/// Configuration for the narrative summarizer
#[derive(Debug, Clone)]
pub struct SummarizerConfig {
    pub provider: SummarizerProvider,
    pub api_key: Option<String>,
    /// API base (`https://api.openai.com/v1`) or Azure resource endpoint
    pub base_url: Option<String>,
    /// Model name for OpenAI, deployment name for Azure
    pub model: String,
    pub api_version: String,
    pub enabled: bool,
    pub timeout_seconds: u64,
    /// Additional attempts after a transient failure
    pub max_retries: usize,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            provider: SummarizerProvider::Mock,
            api_key: None,
            base_url: None,
            model: "gpt-4o-mini".to_string(),
            api_version: "2024-02-01".to_string(),
            enabled: true,
            timeout_seconds: 60,
            max_retries: 2,
            max_tokens: 2000,
            temperature: 0.7,
        }
    }
}

impl SummarizerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            provider: env::var("SUMMARIZER_PROVIDER")
                .map(|v| SummarizerProvider::parse(&v))
                .unwrap_or(defaults.provider),
            api_key: env::var("SUMMARIZER_API_KEY").ok().filter(|v| !v.is_empty()),
            base_url: env::var("SUMMARIZER_BASE_URL").ok().filter(|v| !v.is_empty()),
            model: env::var("SUMMARIZER_MODEL").unwrap_or(defaults.model),
            api_version: env::var("SUMMARIZER_API_VERSION").unwrap_or(defaults.api_version),
            enabled: env::var("SUMMARIZER_ENABLED")
                .map(|v| v.to_lowercase() == "true")
                .unwrap_or(defaults.enabled),
            timeout_seconds: env::var("SUMMARIZER_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.timeout_seconds),
            max_retries: env::var("SUMMARIZER_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_retries),
            max_tokens: defaults.max_tokens,
            temperature: defaults.temperature,
        }
    }
}
