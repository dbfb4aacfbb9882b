//! Provider registry and sequential fallback.

use std::collections::BTreeMap;
use std::sync::Arc;

use folio_core::config::AiConfig;
use folio_core::errors::AiError;
use tracing::{info, warn};

use super::{
    anthropic::AnthropicProvider, groq::GroqProvider, openai::OpenAiProvider, AvailabilityMap,
    ChatProvider, GenerateOptions, GeneratedResponse, ProviderDefaults, ProviderId, ProviderInfo,
};

/// Owns the registered providers and decides who answers a request.
///
/// Fallback is strictly sequential: one candidate is tried at a time, in
/// order, and the first success wins. There is no hedging or parallel
/// dispatch, so a single request never burns quota on more than one vendor
/// unless an earlier one actually failed.
#[derive(Default)]
pub struct ProviderManager {
    providers: BTreeMap<ProviderId, Arc<dyn ChatProvider>>,
}

impl ProviderManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the manager from configuration. Only providers with an API key
    /// configured are registered at all; registered-but-unreachable is a
    /// runtime state, unregistered is a configuration state.
    pub fn from_config(config: &AiConfig) -> Self {
        let mut manager = Self::new();

        if config.groq.has_api_key() {
            manager.register(Arc::new(GroqProvider::new(config.groq.clone())));
        }
        if config.openai.has_api_key() {
            manager.register(Arc::new(OpenAiProvider::new(config.openai.clone())));
        }
        if config.anthropic.has_api_key() {
            manager.register(Arc::new(AnthropicProvider::new(config.anthropic.clone())));
        }

        info!(
            event_name = "providers.registered",
            count = manager.providers.len(),
            "provider registry initialized"
        );
        manager
    }

    pub fn register(&mut self, provider: Arc<dyn ChatProvider>) {
        self.providers.insert(provider.id(), provider);
    }

    pub fn get(&self, id: ProviderId) -> Option<&Arc<dyn ChatProvider>> {
        self.providers.get(&id)
    }

    pub fn is_registered(&self, id: ProviderId) -> bool {
        self.providers.contains_key(&id)
    }

    /// Registered providers that currently report available, in priority
    /// order.
    pub fn available_providers(&self) -> Vec<ProviderId> {
        ProviderId::PRIORITY
            .iter()
            .copied()
            .filter(|id| self.providers.get(id).is_some_and(|p| p.is_available()))
            .collect()
    }

    pub fn has_available_provider(&self) -> bool {
        self.providers.values().any(|provider| provider.is_available())
    }

    pub fn provider_info(&self) -> Vec<ProviderInfo> {
        ProviderId::PRIORITY
            .iter()
            .filter_map(|id| self.providers.get(id))
            .map(|provider| provider.info())
            .collect()
    }

    pub fn default_configs(&self) -> BTreeMap<String, ProviderDefaults> {
        self.providers
            .values()
            .map(|provider| (provider.id().to_string(), provider.default_config()))
            .collect()
    }

    pub fn availability(&self) -> AvailabilityMap {
        ProviderId::PRIORITY
            .iter()
            .map(|id| {
                let available =
                    self.providers.get(id).is_some_and(|provider| provider.is_available());
                (id.to_string(), available)
            })
            .collect()
    }

    /// Generate with fallback. The candidate list starts with the preferred
    /// provider when it is registered and available, then the remaining
    /// providers in priority order, deduplicated; unavailable providers are
    /// skipped entirely. An empty candidate list is `NoProvidersAvailable`;
    /// exhausting the list is `AllProvidersFailed` carrying the last error.
    pub async fn generate_with_fallback(
        &self,
        prompt: &str,
        preferred: Option<ProviderId>,
        options: &GenerateOptions,
    ) -> Result<GeneratedResponse, AiError> {
        let candidates = self.candidate_order(preferred);
        if candidates.is_empty() {
            return Err(AiError::NoProvidersAvailable);
        }

        let mut last_error = String::new();
        for id in candidates {
            let provider = match self.providers.get(&id) {
                Some(provider) => provider,
                None => continue,
            };

            match provider.generate(prompt, options).await {
                Ok(response) => return Ok(response),
                Err(error) => {
                    warn!(
                        event_name = "providers.fallback",
                        provider = %id,
                        error = %error,
                        "provider failed, trying next candidate"
                    );
                    last_error = error.to_string();
                }
            }
        }

        Err(AiError::AllProvidersFailed { last_error })
    }

    fn candidate_order(&self, preferred: Option<ProviderId>) -> Vec<ProviderId> {
        let mut order = Vec::with_capacity(ProviderId::PRIORITY.len());

        if let Some(id) = preferred {
            if self.providers.get(&id).is_some_and(|provider| provider.is_available()) {
                order.push(id);
            }
        }
        for id in ProviderId::PRIORITY {
            if order.contains(&id) {
                continue;
            }
            if self.providers.get(&id).is_some_and(|provider| provider.is_available()) {
                order.push(id);
            }
        }

        order
    }
}
