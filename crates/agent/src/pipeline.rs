//! The conversational agent pipeline.
//!
//! Every chat runs the same four phases in order: classify, generate,
//! validate, finalize. Each phase records a step in the execution trace so
//! callers can see what happened, including the retry taken when validation
//! rejects a response.

use std::sync::Arc;
use std::time::Instant;

use folio_core::errors::AiError;
use folio_data::DataStore;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::classifier::{classify, Classification};
use crate::prompts::PromptComposer;
use crate::providers::{GenerateOptions, GeneratedResponse, ProviderId, ProviderManager, SourceTag};

/// Minimum trimmed length for a response to pass validation.
const MIN_RESPONSE_LEN: usize = 10;

/// Prompt used for the single regeneration attempt after a failed validation.
const FALLBACK_PROMPT: &str = "Please provide a helpful response about the portfolio.";

/// An inbound chat message with optional routing hints.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub preferred_provider: Option<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentPhase {
    Classify,
    Generate,
    Validate,
    Finalize,
}

/// One phase's trace entry.
#[derive(Clone, Debug, Serialize)]
pub struct AgentStep {
    pub phase: AgentPhase,
    pub input: Value,
    pub output: Value,
    pub success: bool,
    pub duration_secs: f64,
}

/// The full trace of a pipeline run.
#[derive(Clone, Debug, Default, Serialize)]
pub struct AgentExecution {
    pub steps: Vec<AgentStep>,
    pub regenerated: bool,
    pub total_secs: f64,
}

impl AgentExecution {
    fn record(&mut self, phase: AgentPhase, input: Value, output: Value, success: bool, started: Instant) {
        self.steps.push(AgentStep {
            phase,
            input,
            output,
            success,
            duration_secs: started.elapsed().as_secs_f64(),
        });
    }
}

/// A completed chat: the response, how the message was read, and the trace.
#[derive(Clone, Debug, Serialize)]
pub struct ChatOutcome {
    pub response: GeneratedResponse,
    pub classification: Classification,
    pub execution: AgentExecution,
}

pub struct AgentPipeline {
    manager: Arc<ProviderManager>,
    composer: PromptComposer,
    store: DataStore,
}

impl AgentPipeline {
    pub fn new(manager: Arc<ProviderManager>, composer: PromptComposer, store: DataStore) -> Self {
        Self { manager, composer, store }
    }

    pub fn manager(&self) -> &Arc<ProviderManager> {
        &self.manager
    }

    /// Run the four phases. Provider errors surface as-is; classification,
    /// validation and finalization cannot fail.
    pub async fn process(&self, request: &ChatRequest) -> Result<ChatOutcome, AiError> {
        let run_started = Instant::now();
        let mut execution = AgentExecution::default();

        // Phase 1: classify.
        let phase_started = Instant::now();
        let classification = classify(&request.message);
        execution.record(
            AgentPhase::Classify,
            json!({ "message": request.message }),
            json!({
                "message_type": classification.message_type.as_str(),
                "intent": classification.intent,
                "confidence": classification.confidence,
            }),
            true,
            phase_started,
        );
        debug!(
            event_name = "pipeline.classified",
            intent = %classification.intent,
            confidence = classification.confidence,
            "message classified"
        );

        // Phase 2: generate.
        let phase_started = Instant::now();
        let mut prompt = self.composer.compose(&request.message, &classification);
        if let Some(extra) = &request.context {
            prompt.push_str("\n\nAdditional context: ");
            prompt.push_str(extra);
        }

        let preferred = request.preferred_provider.as_deref().and_then(ProviderId::parse);
        let options = GenerateOptions::default();
        let generated = self.manager.generate_with_fallback(&prompt, preferred, &options).await;
        execution.record(
            AgentPhase::Generate,
            json!({ "prompt_chars": prompt.len(), "preferred": preferred.map(|id| id.as_str()) }),
            match &generated {
                Ok(response) => json!({ "provider": response.provider, "model": response.model }),
                Err(error) => json!({ "error": error.to_string() }),
            },
            generated.is_ok(),
            phase_started,
        );
        let mut response = generated?;

        // Phase 3: validate, with a single regeneration on failure.
        let phase_started = Instant::now();
        let valid = response.text.trim().len() > MIN_RESPONSE_LEN;
        execution.record(
            AgentPhase::Validate,
            json!({ "response_chars": response.text.len() }),
            json!({ "valid": valid }),
            valid,
            phase_started,
        );

        if !valid {
            warn!(
                event_name = "pipeline.validation_failed",
                provider = %response.provider,
                "response too short, regenerating once"
            );
            let phase_started = Instant::now();
            let retried = self.manager.generate_with_fallback(FALLBACK_PROMPT, preferred, &options).await;
            execution.regenerated = true;
            execution.record(
                AgentPhase::Generate,
                json!({ "prompt": FALLBACK_PROMPT }),
                match &retried {
                    Ok(retry) => json!({ "provider": retry.provider, "model": retry.model }),
                    Err(error) => json!({ "error": error.to_string() }),
                },
                retried.is_ok(),
                phase_started,
            );
            // The invalid response is never returned; a failed retry aborts
            // the chat.
            response = retried?;
        }

        // Phase 4: finalize.
        let phase_started = Instant::now();
        response.sources = self.attribute_sources(&response.text);
        execution.record(
            AgentPhase::Finalize,
            json!({}),
            json!({ "sources": response.sources.len() }),
            true,
            phase_started,
        );

        execution.total_secs = run_started.elapsed().as_secs_f64();
        info!(
            event_name = "pipeline.completed",
            provider = %response.provider,
            regenerated = execution.regenerated,
            total_secs = execution.total_secs,
            "chat pipeline complete"
        );

        Ok(ChatOutcome { response, classification, execution })
    }

    /// Attach source attributions when the response talks about searchable
    /// content. Counts reflect what is actually on disk; a missing file
    /// counts as zero.
    fn attribute_sources(&self, text: &str) -> Vec<SourceTag> {
        let lowered = text.to_lowercase();
        if !lowered.contains("search") && !lowered.contains("project") {
            return Vec::new();
        }

        vec![
            SourceTag {
                kind: "projects".to_string(),
                count: self.store.projects().map(|p| p.len()).unwrap_or(0),
            },
            SourceTag {
                kind: "jobs".to_string(),
                count: self.store.jobs().map(|j| j.len()).unwrap_or(0),
            },
            SourceTag {
                kind: "certificates".to_string(),
                count: self.store.certificates().map(|c| c.len()).unwrap_or(0),
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use folio_core::errors::AiError;
    use folio_data::DataStore;
    use tempfile::TempDir;

    use crate::prompts::{PromptComposer, PromptLibrary};
    use crate::providers::{
        ChatProvider, GenerateOptions, GeneratedResponse, ProviderDefaults, ProviderId,
        ProviderInfo, ProviderManager, TokenUsage,
    };

    use super::{AgentPhase, AgentPipeline, ChatRequest};

    struct ScriptedProvider {
        replies: std::sync::Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        fn new(replies: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                replies: std::sync::Mutex::new(
                    replies.iter().rev().map(|reply| reply.to_string()).collect(),
                ),
            })
        }
    }

    #[async_trait]
    impl ChatProvider for ScriptedProvider {
        fn id(&self) -> ProviderId {
            ProviderId::Groq
        }

        fn is_available(&self) -> bool {
            true
        }

        fn info(&self) -> ProviderInfo {
            ProviderInfo {
                id: ProviderId::Groq,
                model: "scripted".to_string(),
                available: true,
                confidence: 0.9,
            }
        }

        fn default_config(&self) -> ProviderDefaults {
            ProviderDefaults {
                model: "scripted".to_string(),
                temperature: 0.7,
                max_tokens: 64,
                api_key_required: false,
            }
        }

        async fn generate(
            &self,
            _prompt: &str,
            _options: &GenerateOptions,
        ) -> Result<GeneratedResponse, AiError> {
            let Some(text) = self.replies.lock().expect("lock").pop() else {
                return Err(AiError::Request {
                    provider: "groq".to_string(),
                    message: "script exhausted".to_string(),
                });
            };
            Ok(GeneratedResponse {
                text,
                provider: ProviderId::Groq,
                model: "scripted".to_string(),
                confidence: 0.9,
                token_usage: TokenUsage::default(),
                sources: Vec::new(),
                processing_time: Duration::ZERO,
            })
        }
    }

    fn pipeline_with(replies: &[&str]) -> (TempDir, AgentPipeline) {
        let dir = TempDir::new().expect("tempdir");
        fs::write(
            dir.path().join("projects.json"),
            r#"[{"id": "p1", "name": "Folio", "description": "Backend", "category": "web"}]"#,
        )
        .expect("projects");
        let store = DataStore::new(dir.path());

        let mut manager = ProviderManager::new();
        manager.register(ScriptedProvider::new(replies));
        let manager = Arc::new(manager);

        let composer = PromptComposer::new(PromptLibrary::new(), store.clone());
        (dir, AgentPipeline::new(manager, composer, store))
    }

    #[tokio::test]
    async fn happy_path_runs_all_four_phases_once() {
        let (_dir, pipeline) = pipeline_with(&["Here is a long enough answer about things."]);
        let request = ChatRequest { message: "Hello there".to_string(), ..Default::default() };

        let outcome = pipeline.process(&request).await.expect("chat");
        assert!(!outcome.execution.regenerated);
        let phases: Vec<AgentPhase> =
            outcome.execution.steps.iter().map(|step| step.phase).collect();
        assert_eq!(
            phases,
            vec![
                AgentPhase::Classify,
                AgentPhase::Generate,
                AgentPhase::Validate,
                AgentPhase::Finalize
            ]
        );
    }

    #[tokio::test]
    async fn short_response_triggers_exactly_one_regeneration() {
        let (_dir, pipeline) =
            pipeline_with(&["ok", "A much better answer with substance this time."]);
        let request = ChatRequest { message: "Hi".to_string(), ..Default::default() };

        let outcome = pipeline.process(&request).await.expect("chat");
        assert!(outcome.execution.regenerated);
        assert_eq!(outcome.response.text, "A much better answer with substance this time.");
        // Classify, generate, validate, retry generate, finalize.
        assert_eq!(outcome.execution.steps.len(), 5);
    }

    #[tokio::test]
    async fn failed_regeneration_aborts_the_chat() {
        // One short reply; the regeneration attempt finds the script empty
        // and every provider fails.
        let (_dir, pipeline) = pipeline_with(&["ok"]);
        let request = ChatRequest { message: "Hi".to_string(), ..Default::default() };

        let error = pipeline.process(&request).await.expect_err("retry fails");
        assert!(matches!(error, AiError::AllProvidersFailed { .. }));
    }

    #[tokio::test]
    async fn project_mentions_carry_source_counts() {
        let (_dir, pipeline) = pipeline_with(&["I found one project you might like."]);
        let request =
            ChatRequest { message: "What have you built?".to_string(), ..Default::default() };

        let outcome = pipeline.process(&request).await.expect("chat");
        let projects = outcome
            .response
            .sources
            .iter()
            .find(|source| source.kind == "projects")
            .expect("projects source");
        assert_eq!(projects.count, 1);
    }

    #[tokio::test]
    async fn unrelated_responses_carry_no_sources() {
        let (_dir, pipeline) = pipeline_with(&["The weather is lovely today, thanks for asking."]);
        let request = ChatRequest { message: "How are you?".to_string(), ..Default::default() };

        let outcome = pipeline.process(&request).await.expect("chat");
        assert!(outcome.response.sources.is_empty());
    }

    #[tokio::test]
    async fn empty_registry_surfaces_no_providers() {
        let dir = TempDir::new().expect("tempdir");
        let store = DataStore::new(dir.path());
        let pipeline = AgentPipeline::new(
            Arc::new(ProviderManager::new()),
            PromptComposer::new(PromptLibrary::new(), store.clone()),
            store,
        );

        let request = ChatRequest { message: "Hello".to_string(), ..Default::default() };
        let error = pipeline.process(&request).await.expect_err("no providers");
        assert!(matches!(error, AiError::NoProvidersAvailable));
    }
}
