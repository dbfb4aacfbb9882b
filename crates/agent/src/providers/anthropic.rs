//! Anthropic adapter (messages API).
//!
//! Unlike the OpenAI-compatible vendors this API authenticates with an
//! `x-api-key` header plus a pinned `anthropic-version`, and returns content
//! as a block list rather than a choices array.

use std::time::{Duration, Instant};

use folio_core::config::ProviderSettings;
use folio_core::errors::AiError;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{
    ChatProvider, GenerateOptions, GeneratedResponse, ProviderDefaults, ProviderId, ProviderInfo,
    TokenUsage,
};
use async_trait::async_trait;

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const CONFIDENCE: f64 = 0.88;

pub struct AnthropicProvider {
    settings: ProviderSettings,
    client: Option<Client>,
}

impl AnthropicProvider {
    pub fn new(settings: ProviderSettings) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|error| {
                warn!(
                    event_name = "provider.anthropic.client_failed",
                    error = %error,
                    "failed to build http client, provider disabled"
                );
                error
            })
            .ok();
        Self { settings, client }
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

#[async_trait]
impl ChatProvider for AnthropicProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Anthropic
    }

    fn is_available(&self) -> bool {
        self.settings.has_api_key() && !self.settings.model.is_empty() && self.client.is_some()
    }

    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            id: self.id(),
            model: self.settings.model.clone(),
            available: self.is_available(),
            confidence: CONFIDENCE,
        }
    }

    fn default_config(&self) -> ProviderDefaults {
        ProviderDefaults {
            model: self.settings.model.clone(),
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            api_key_required: true,
        }
    }

    async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<GeneratedResponse, AiError> {
        let started = Instant::now();

        let (client, api_key) = match (&self.client, &self.settings.api_key) {
            (Some(client), Some(api_key)) if self.is_available() => (client, api_key),
            _ => {
                return Err(AiError::ProviderUnavailable {
                    provider: self.id().to_string(),
                    reason: "missing api key, model, or http client".to_string(),
                })
            }
        };

        let request = MessagesRequest {
            model: &self.settings.model,
            max_tokens: options.max_tokens.unwrap_or(self.settings.max_tokens),
            temperature: options.temperature.unwrap_or(self.settings.temperature),
            messages: vec![Message { role: "user", content: prompt }],
        };

        let response = client
            .post(API_URL)
            .header("x-api-key", api_key.expose_secret())
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|error| AiError::Request {
                provider: self.id().to_string(),
                message: error.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Request {
                provider: self.id().to_string(),
                message: format!("http {status}: {body}"),
            });
        }

        let parsed: MessagesResponse =
            response.json().await.map_err(|error| AiError::Request {
                provider: self.id().to_string(),
                message: format!("invalid response body: {error}"),
            })?;

        let text = parsed
            .content
            .into_iter()
            .next()
            .and_then(|block| block.text)
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(AiError::EmptyResponse { provider: self.id().to_string() });
        }

        let token_usage = parsed
            .usage
            .map(|usage| TokenUsage {
                prompt_tokens: usage.input_tokens,
                completion_tokens: usage.output_tokens,
                total_tokens: usage.input_tokens + usage.output_tokens,
            })
            .unwrap_or_else(|| TokenUsage::estimated(prompt, &text));

        debug!(
            event_name = "provider.anthropic.generated",
            model = %self.settings.model,
            total_tokens = token_usage.total_tokens,
            "generation complete"
        );

        Ok(GeneratedResponse {
            text,
            provider: self.id(),
            model: self.settings.model.clone(),
            confidence: CONFIDENCE,
            token_usage,
            sources: Vec::new(),
            processing_time: started.elapsed(),
        })
    }
}
