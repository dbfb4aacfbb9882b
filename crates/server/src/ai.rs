//! Assistant routes.
//!
//! JSON API:
//! - `POST /ai/chat`             — full pipeline chat with execution trace
//! - `POST /ai/ask`              — question/answer shape over the same pipeline
//! - `POST /ai/classify`         — classification only, no provider calls
//! - `POST /ai/search`           — orchestrated search
//! - `POST /ai/analyze`          — classifier-driven text report
//! - `POST /ai/generate`         — raw generation without pipeline phases
//! - `POST /ai/summarize`        — summary with deterministic degradation
//! - `POST /ai/extract-keywords` — domain keyword extraction
//! - `GET  /ai/status`           — component and provider health
//! - `GET  /ai/providers`        — provider info and default configurations
//! - `GET  /ai/health`           — liveness for the assistant subsystem

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use folio_agent::pipeline::{ChatOutcome, ChatRequest};
use folio_agent::providers::{GenerateOptions, GeneratedResponse, ProviderId};
use folio_agent::search::{SearchOutcome, SearchQuery};
use folio_agent::service::{AnalysisReport, AskAnswer, ProviderReport, SummaryResult};
use folio_agent::Classification;
use folio_core::errors::AiError;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::api::ErrorBody;
use crate::bootstrap::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ai/chat", post(chat))
        .route("/ai/ask", post(ask))
        .route("/ai/classify", post(classify))
        .route("/ai/search", post(search))
        .route("/ai/analyze", post(analyze))
        .route("/ai/generate", post(generate))
        .route("/ai/summarize", post(summarize))
        .route("/ai/extract-keywords", post(extract_keywords))
        .route("/ai/status", get(status))
        .route("/ai/providers", get(providers))
        .route("/ai/health", get(health))
}

type AiApiError = (StatusCode, Json<ErrorBody>);

/// Terminal errors (no providers, all failed) are 500s; bad routing hints and
/// vendor rejections map to client-visible statuses.
fn map_ai_error(error: AiError) -> AiApiError {
    let status = match &error {
        AiError::NoProvidersAvailable | AiError::AllProvidersFailed { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        AiError::ProviderUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        AiError::Request { .. } | AiError::EmptyResponse { .. } => StatusCode::BAD_GATEWAY,
    };
    warn!(event_name = "ai.request_failed", error = %error, "assistant request failed");
    (status, Json(ErrorBody { detail: error.to_string() }))
}

#[derive(Debug, Serialize)]
pub struct ChatBody {
    pub response_id: String,
    #[serde(flatten)]
    pub outcome: ChatOutcome,
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatBody>, AiApiError> {
    let outcome = state.ai.chat(&request).await.map_err(map_ai_error)?;
    Ok(Json(ChatBody { response_id: Uuid::new_v4().to_string(), outcome }))
}

#[derive(Deserialize)]
pub struct AskRequest {
    pub question: String,
}

async fn ask(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskAnswer>, AiApiError> {
    state.ai.ask(&request.question).await.map(Json).map_err(map_ai_error)
}

#[derive(Deserialize)]
pub struct TextRequest {
    pub text: String,
}

async fn classify(
    State(state): State<AppState>,
    Json(request): Json<TextRequest>,
) -> Json<Classification> {
    Json(state.ai.classify(&request.text))
}

async fn search(
    State(state): State<AppState>,
    Json(query): Json<SearchQuery>,
) -> Json<SearchOutcome> {
    Json(state.ai.search(&query).await)
}

async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<TextRequest>,
) -> Json<AnalysisReport> {
    Json(state.ai.analyze(&request.text))
}

#[derive(Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

async fn generate(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GeneratedResponse>, AiApiError> {
    let preferred = request.provider.as_deref().and_then(ProviderId::parse);
    let options = GenerateOptions {
        temperature: request.temperature,
        max_tokens: request.max_tokens,
    };
    state
        .ai
        .generate(&request.prompt, preferred, &options)
        .await
        .map(Json)
        .map_err(map_ai_error)
}

async fn summarize(
    State(state): State<AppState>,
    Json(request): Json<TextRequest>,
) -> Json<SummaryResult> {
    Json(state.ai.summarize(&request.text).await)
}

#[derive(Debug, Serialize)]
pub struct KeywordsBody {
    pub keywords: Vec<String>,
}

async fn extract_keywords(
    State(state): State<AppState>,
    Json(request): Json<TextRequest>,
) -> Json<KeywordsBody> {
    Json(KeywordsBody { keywords: state.ai.extract_keywords(&request.text) })
}

async fn status(State(state): State<AppState>) -> Json<folio_agent::AiStatus> {
    Json(state.ai.status())
}

async fn providers(State(state): State<AppState>) -> Json<ProviderReport> {
    Json(state.ai.provider_report())
}

#[derive(Debug, Serialize)]
pub struct AiHealth {
    pub status: &'static str,
}

async fn health(State(state): State<AppState>) -> Json<AiHealth> {
    Json(AiHealth { status: state.ai.status().status })
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;

    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::Json;
    use folio_agent::pipeline::ChatRequest;
    use folio_agent::search::SearchQuery;
    use folio_agent::AiService;
    use folio_core::config::AppConfig;
    use folio_data::DataStore;
    use tempfile::TempDir;

    use crate::bootstrap::AppState;

    use super::{chat, classify, extract_keywords, search, status, TextRequest};

    fn keyless_state() -> (TempDir, AppState) {
        let dir = TempDir::new().expect("tempdir");
        fs::write(
            dir.path().join("projects.json"),
            r#"[{"id": "p1", "name": "Folio", "description": "Backend", "category": "web", "skills": ["Python"]}]"#,
        )
        .expect("projects");
        let store = DataStore::new(dir.path());
        let ai = Arc::new(AiService::new(&AppConfig::default().ai, store.clone()));
        (dir, AppState { store, ai })
    }

    #[tokio::test]
    async fn status_is_limited_without_api_keys() {
        let (_dir, state) = keyless_state();
        let body = status(State(state)).await.0;
        assert_eq!(body.status, "limited");
    }

    #[tokio::test]
    async fn chat_without_providers_is_a_500() {
        let (_dir, state) = keyless_state();
        let request = ChatRequest { message: "Hello".to_string(), ..Default::default() };
        let (status, body) =
            chat(State(state), Json(request)).await.expect_err("no providers configured");
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.0.detail.is_empty());
    }

    #[tokio::test]
    async fn classify_needs_no_providers() {
        let (_dir, state) = keyless_state();
        let body = classify(
            State(state),
            Json(TextRequest { text: "What projects have you worked on?".to_string() }),
        )
        .await
        .0;
        assert_eq!(body.intent, "project_inquiry");
    }

    #[tokio::test]
    async fn search_degrades_instead_of_failing() {
        let (_dir, state) = keyless_state();
        let query = SearchQuery {
            query: "python".to_string(),
            include_sections: None,
            limit: 5,
            offset: 0,
        };
        let body = search(State(state), Json(query)).await.0;
        assert_eq!(body.total_count, 1);
        assert!(body.fallback_used, "llm layer degrades without providers");
    }

    #[tokio::test]
    async fn keyword_extraction_round_trips() {
        let (_dir, state) = keyless_state();
        let body = extract_keywords(
            State(state),
            Json(TextRequest { text: "python and docker projects".to_string() }),
        )
        .await
        .0;
        assert!(body.keywords.contains(&"python".to_string()));
    }
}
