//! LLM provider abstraction.
//!
//! Each vendor adapter implements [`ChatProvider`]; the [`ProviderManager`]
//! owns registration, priority order and sequential fallback. Adapters never
//! fail to construct: missing credentials or an unbuildable HTTP client make
//! the provider permanently unavailable instead.

pub mod anthropic;
pub mod groq;
pub mod manager;
pub mod openai;

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use folio_core::errors::AiError;
use serde::Serialize;

pub use manager::ProviderManager;

/// Stable identity of a registered provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    Groq,
    OpenAi,
    Anthropic,
}

impl ProviderId {
    /// Fallback priority, highest first.
    pub const PRIORITY: [ProviderId; 3] =
        [ProviderId::Groq, ProviderId::OpenAi, ProviderId::Anthropic];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Groq => "groq",
            ProviderId::OpenAi => "openai",
            ProviderId::Anthropic => "anthropic",
        }
    }

    pub fn parse(value: &str) -> Option<ProviderId> {
        match value.trim().to_ascii_lowercase().as_str() {
            "groq" => Some(ProviderId::Groq),
            "openai" => Some(ProviderId::OpenAi),
            "anthropic" | "claude" => Some(ProviderId::Anthropic),
            _ => None,
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Token accounting as reported by the vendor, or estimated from text length
/// when the vendor omits usage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    /// Rough length-based estimate for responses without usage metadata.
    pub fn estimated(prompt: &str, completion: &str) -> Self {
        let prompt_tokens = (prompt.len() / 4) as u32;
        let completion_tokens = (completion.len() / 4) as u32;
        Self { prompt_tokens, completion_tokens, total_tokens: prompt_tokens + completion_tokens }
    }
}

/// A data source the finalize phase attributes to a response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SourceTag {
    pub kind: String,
    pub count: usize,
}

/// Completed generation with provider metadata attached.
#[derive(Clone, Debug, Serialize)]
pub struct GeneratedResponse {
    pub text: String,
    pub provider: ProviderId,
    pub model: String,
    pub confidence: f64,
    pub token_usage: TokenUsage,
    pub sources: Vec<SourceTag>,
    #[serde(serialize_with = "serialize_secs")]
    pub processing_time: Duration,
}

fn serialize_secs<S: serde::Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(value.as_secs_f64())
}

/// Per-call generation knobs. `None` defers to the provider's configuration.
#[derive(Clone, Copy, Debug, Default)]
pub struct GenerateOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// Introspection snapshot for status endpoints.
#[derive(Clone, Debug, Serialize)]
pub struct ProviderInfo {
    pub id: ProviderId,
    pub model: String,
    pub available: bool,
    pub confidence: f64,
}

/// Shape of a provider's defaults, surfaced without secrets.
#[derive(Clone, Debug, Serialize)]
pub struct ProviderDefaults {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub api_key_required: bool,
}

/// An interchangeable text-generation backend.
///
/// `is_available` must be cheap and side-effect free; the manager calls it on
/// every fallback pass to decide whether the provider is even worth trying.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    fn is_available(&self) -> bool;

    fn info(&self) -> ProviderInfo;

    fn default_config(&self) -> ProviderDefaults;

    async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<GeneratedResponse, AiError>;
}

/// Map from provider name to its availability, used by health reporting.
pub type AvailabilityMap = BTreeMap<String, bool>;
