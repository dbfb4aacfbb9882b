//! Liveness endpoints.
//!
//! - `GET /`       — service banner
//! - `GET /health` — liveness probe with data and assistant summaries

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::bootstrap::AppState;

#[derive(Debug, Serialize)]
pub struct Banner {
    pub service: &'static str,
    pub version: &'static str,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub data_files_missing: Vec<String>,
    pub ai_status: &'static str,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(banner)).route("/health", get(health))
}

async fn banner() -> Json<Banner> {
    Json(Banner {
        service: "folio-server",
        version: env!("CARGO_PKG_VERSION"),
        status: "ok",
    })
}

async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    let missing = state.store.missing_required_files();
    Json(HealthReport {
        status: if missing.is_empty() { "healthy" } else { "degraded" },
        data_files_missing: missing,
        ai_status: state.ai.status().status,
    })
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;

    use axum::extract::State;
    use folio_agent::AiService;
    use folio_core::config::AppConfig;
    use folio_data::DataStore;
    use tempfile::TempDir;

    use crate::bootstrap::AppState;

    use super::{banner, health};

    fn state(dir: &TempDir) -> AppState {
        let store = DataStore::new(dir.path());
        let ai = Arc::new(AiService::new(&AppConfig::default().ai, store.clone()));
        AppState { store, ai }
    }

    #[tokio::test]
    async fn banner_reports_the_service_name() {
        let body = banner().await.0;
        assert_eq!(body.service, "folio-server");
        assert_eq!(body.status, "ok");
    }

    #[tokio::test]
    async fn health_is_degraded_until_required_files_exist() {
        let dir = TempDir::new().expect("tempdir");
        let body = health(State(state(&dir))).await.0;
        assert_eq!(body.status, "degraded");
        assert_eq!(body.data_files_missing.len(), 3);

        fs::write(dir.path().join("intro.json"), "{\"name\":\"A\",\"title\":\"B\",\"bio\":\"C\"}")
            .expect("intro");
        fs::write(dir.path().join("jobs.json"), "[]").expect("jobs");
        fs::write(dir.path().join("projects.json"), "[]").expect("projects");

        let body = health(State(state(&dir))).await.0;
        assert_eq!(body.status, "healthy");
    }
}
