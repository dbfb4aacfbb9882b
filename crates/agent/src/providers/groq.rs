//! Groq adapter (OpenAI-compatible chat completions API).

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

const API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const CONFIDENCE: f64 = 0.90;

pub struct GroqProvider {
    settings: ProviderSettings,
    client: Option<Client>,
}

impl GroqProvider {
    /// Construction never fails. Without an API key, a model, or a buildable
    /// HTTP client the provider reports unavailable for its lifetime.
    pub fn new(settings: ProviderSettings) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|error| {
                warn!(
                    event_name = "provider.groq.client_failed",
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
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[async_trait]
impl ChatProvider for GroqProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Groq
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

        let request = ChatRequest {
            model: &self.settings.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            temperature: options.temperature.unwrap_or(self.settings.temperature),
            max_tokens: options.max_tokens.unwrap_or(self.settings.max_tokens),
        };

        let response = client
            .post(API_URL)
            .bearer_auth(api_key.expose_secret())
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

        let parsed: ChatResponse = response.json().await.map_err(|error| AiError::Request {
            provider: self.id().to_string(),
            message: format!("invalid response body: {error}"),
        })?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(AiError::EmptyResponse { provider: self.id().to_string() });
        }

        let token_usage = parsed
            .usage
            .map(|usage| TokenUsage {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
                total_tokens: usage.total_tokens,
            })
            .unwrap_or_else(|| TokenUsage::estimated(prompt, &text));

        debug!(
            event_name = "provider.groq.generated",
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

#[cfg(test)]
mod tests {
    use folio_core::config::ProviderSettings;
    use secrecy::SecretString;

    use super::super::ChatProvider;
    use super::GroqProvider;

    fn settings(api_key: Option<&str>) -> ProviderSettings {
        ProviderSettings {
            api_key: api_key.map(|key| SecretString::from(key.to_string())),
            model: "llama-3.1-8b-instant".to_string(),
            temperature: 0.7,
            max_tokens: 1024,
            timeout_secs: 30,
        }
    }

    #[test]
    fn available_only_with_key_and_model() {
        assert!(GroqProvider::new(settings(Some("gsk_test"))).is_available());
        assert!(!GroqProvider::new(settings(None)).is_available());

        let mut no_model = settings(Some("gsk_test"));
        no_model.model.clear();
        assert!(!GroqProvider::new(no_model).is_available());
    }

    #[tokio::test]
    async fn unavailable_provider_refuses_to_generate() {
        let provider = GroqProvider::new(settings(None));
        let error = provider
            .generate("hello", &Default::default())
            .await
            .expect_err("must refuse without a key");
        assert!(matches!(error, folio_core::errors::AiError::ProviderUnavailable { .. }));
    }

    #[test]
    fn defaults_do_not_leak_the_key() {
        let provider = GroqProvider::new(settings(Some("gsk_secret")));
        let defaults = provider.default_config();
        assert_eq!(defaults.model, "llama-3.1-8b-instant");
        assert!(defaults.api_key_required);
        let rendered = serde_json::to_string(&defaults).expect("serialize");
        assert!(!rendered.contains("gsk_secret"));
    }
}
