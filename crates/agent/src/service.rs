//! The assistant facade consumed by the HTTP layer and the CLI.
//!
//! Owns the provider manager, the agent pipeline and the search
//! orchestrator. Constructed once at startup from configuration; handlers
//! share it behind an `Arc`.

use std::collections::BTreeMap;
use std::sync::Arc;

use folio_core::config::AiConfig;
use folio_core::errors::AiError;
use folio_data::DataStore;
use serde::Serialize;
use tracing::info;

use crate::classifier::{classify, Classification};
use crate::pipeline::{AgentPipeline, ChatOutcome, ChatRequest};
use crate::prompts::{PromptComposer, PromptLibrary};
use crate::providers::{
    AvailabilityMap, GenerateOptions, GeneratedResponse, ProviderDefaults, ProviderId,
    ProviderInfo, ProviderManager, SourceTag,
};
use crate::search::{SearchOrchestrator, SearchOutcome, SearchQuery};

/// Service health snapshot for the status endpoint.
#[derive(Clone, Debug, Serialize)]
pub struct AiStatus {
    /// `"active"` with at least one reachable provider, `"limited"` otherwise.
    pub status: &'static str,
    pub components: BTreeMap<&'static str, &'static str>,
    pub providers: AvailabilityMap,
}

/// Question-answer shaped result for the ask surface.
#[derive(Clone, Debug, Serialize)]
pub struct AskAnswer {
    pub question: String,
    pub answer: String,
    pub confidence: f64,
    pub provider: ProviderId,
    pub sources: Vec<SourceTag>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SummaryResult {
    pub summary: String,
    /// True when no provider answered and the digest is deterministic.
    pub degraded: bool,
}

/// Classifier-driven text report.
#[derive(Clone, Debug, Serialize)]
pub struct AnalysisReport {
    pub classification: Classification,
    pub word_count: usize,
    pub character_count: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct ProviderReport {
    pub providers: Vec<ProviderInfo>,
    pub defaults: BTreeMap<String, ProviderDefaults>,
}

pub struct AiService {
    manager: Arc<ProviderManager>,
    pipeline: AgentPipeline,
    search: SearchOrchestrator,
}

impl AiService {
    pub fn new(config: &AiConfig, store: DataStore) -> Self {
        let manager = Arc::new(ProviderManager::from_config(config));
        Self::assemble(manager, store)
    }

    /// Test seam: build around a pre-populated manager.
    pub fn with_manager(manager: Arc<ProviderManager>, store: DataStore) -> Self {
        Self::assemble(manager, store)
    }

    fn assemble(manager: Arc<ProviderManager>, store: DataStore) -> Self {
        let library =
            PromptLibrary::new().with_overrides(&store.data_dir().join("prompts.toml"));
        let composer = PromptComposer::new(library, store.clone());
        let pipeline = AgentPipeline::new(manager.clone(), composer, store.clone());
        let search = SearchOrchestrator::new(store, manager.clone());

        info!(
            event_name = "ai.service_ready",
            providers = manager.available_providers().len(),
            "assistant service assembled"
        );
        Self { manager, pipeline, search }
    }

    pub fn classify(&self, message: &str) -> Classification {
        classify(message)
    }

    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatOutcome, AiError> {
        self.pipeline.process(request).await
    }

    /// Single-question convenience over the same pipeline.
    pub async fn ask(&self, question: &str) -> Result<AskAnswer, AiError> {
        let request = ChatRequest { message: question.to_string(), ..Default::default() };
        let outcome = self.pipeline.process(&request).await?;
        Ok(AskAnswer {
            question: question.to_string(),
            answer: outcome.response.text,
            confidence: outcome.response.confidence,
            provider: outcome.response.provider,
            sources: outcome.response.sources,
        })
    }

    pub async fn search(&self, query: &SearchQuery) -> SearchOutcome {
        self.search.search(query).await
    }

    /// Raw generation without the pipeline phases.
    pub async fn generate(
        &self,
        prompt: &str,
        preferred: Option<ProviderId>,
        options: &GenerateOptions,
    ) -> Result<GeneratedResponse, AiError> {
        self.manager.generate_with_fallback(prompt, preferred, options).await
    }

    /// Summarize arbitrary text. Degrades to a leading-sentence digest when
    /// no provider answers.
    pub async fn summarize(&self, text: &str) -> SummaryResult {
        let prompt = format!("Summarize the following text in two sentences:\n{text}");
        match self.manager.generate_with_fallback(&prompt, None, &GenerateOptions::default()).await
        {
            Ok(response) => SummaryResult { summary: response.text, degraded: false },
            Err(_) => SummaryResult { summary: leading_digest(text), degraded: true },
        }
    }

    pub fn analyze(&self, text: &str) -> AnalysisReport {
        AnalysisReport {
            classification: classify(text),
            word_count: text.split_whitespace().count(),
            character_count: text.chars().count(),
        }
    }

    pub fn extract_keywords(&self, text: &str) -> Vec<String> {
        classify(text).keywords.into_iter().collect()
    }

    pub fn status(&self) -> AiStatus {
        let available = self.manager.has_available_provider();
        let mut components = BTreeMap::new();
        components.insert("classifier", "ready");
        components.insert("pipeline", "ready");
        components.insert("search", "ready");
        components.insert("providers", if available { "ready" } else { "unavailable" });

        AiStatus {
            status: if available { "active" } else { "limited" },
            components,
            providers: self.manager.availability(),
        }
    }

    pub fn provider_report(&self) -> ProviderReport {
        ProviderReport {
            providers: self.manager.provider_info(),
            defaults: self.manager.default_configs(),
        }
    }

    pub fn manager(&self) -> &Arc<ProviderManager> {
        &self.manager
    }
}

/// First couple of sentences, capped, for the deterministic summary path.
fn leading_digest(text: &str) -> String {
    let mut digest = String::new();
    for sentence in text.split_inclusive(['.', '!', '?']) {
        if digest.len() + sentence.len() > 280 {
            break;
        }
        digest.push_str(sentence);
        if digest.matches(['.', '!', '?']).count() >= 2 {
            break;
        }
    }
    if digest.is_empty() {
        text.chars().take(280).collect()
    } else {
        digest.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;

    use folio_core::config::AppConfig;
    use folio_data::DataStore;
    use tempfile::TempDir;

    use crate::providers::ProviderManager;

    use super::{leading_digest, AiService};

    fn empty_store() -> (TempDir, DataStore) {
        let dir = TempDir::new().expect("tempdir");
        fs::write(dir.path().join("projects.json"), "[]").expect("projects");
        let store = DataStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn no_keys_means_limited_status() {
        let (_dir, store) = empty_store();
        let service = AiService::new(&AppConfig::default().ai, store);

        let status = service.status();
        assert_eq!(status.status, "limited");
        assert_eq!(status.components.get("providers"), Some(&"unavailable"));
        assert!(status.providers.values().all(|available| !available));
    }

    #[tokio::test]
    async fn chat_without_providers_is_an_error_but_search_is_not() {
        let (_dir, store) = empty_store();
        let service = AiService::with_manager(Arc::new(ProviderManager::new()), store);

        let chat = service.ask("What projects do you have?").await;
        assert!(chat.is_err());

        let outcome = service
            .search(&crate::search::SearchQuery {
                query: "anything".to_string(),
                include_sections: None,
                limit: 5,
                offset: 0,
            })
            .await;
        assert!(outcome.fallback_used);
    }

    #[tokio::test]
    async fn summarize_degrades_deterministically() {
        let (_dir, store) = empty_store();
        let service = AiService::with_manager(Arc::new(ProviderManager::new()), store);

        let result = service.summarize("First sentence. Second sentence. Third sentence.").await;
        assert!(result.degraded);
        assert_eq!(result.summary, "First sentence. Second sentence.");
    }

    #[test]
    fn analysis_counts_words_and_classifies() {
        let (_dir, store) = empty_store();
        let service = AiService::with_manager(Arc::new(ProviderManager::new()), store);

        let report = service.analyze("What projects have you worked on?");
        assert_eq!(report.word_count, 6);
        assert_eq!(report.classification.intent, "project_inquiry");
    }

    #[test]
    fn keyword_extraction_matches_the_classifier() {
        let (_dir, store) = empty_store();
        let service = AiService::with_manager(Arc::new(ProviderManager::new()), store);

        let keywords = service.extract_keywords("Python projects using Docker");
        assert!(keywords.contains(&"python".to_string()));
        assert!(keywords.contains(&"docker".to_string()));
    }

    #[test]
    fn digest_handles_text_without_punctuation() {
        let digest = leading_digest("just some words with no sentence ending");
        assert_eq!(digest, "just some words with no sentence ending");
    }
}
