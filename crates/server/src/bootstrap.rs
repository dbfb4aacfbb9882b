use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use axum::Router;
use folio_agent::AiService;
use folio_core::config::{AppConfig, ConfigError, LoadOptions};
use folio_data::DataStore;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub struct Application {
    pub config: AppConfig,
    pub store: DataStore,
    pub ai: Arc<AiService>,
}

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub store: DataStore,
    pub ai: Arc<AiService>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config)
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let store = DataStore::new(config.data.data_dir.clone());

    // Missing data files degrade the content endpoints but are not fatal;
    // the doctor command reports the same list.
    let missing = store.missing_required_files();
    if !missing.is_empty() {
        warn!(
            event_name = "system.bootstrap.data_incomplete",
            missing = %missing.join(", "),
            "required data files are missing"
        );
    }

    let ai = Arc::new(AiService::new(&config.ai, store.clone()));
    info!(
        event_name = "system.bootstrap.ready",
        ai_status = ai.status().status,
        "application bootstrap complete"
    );

    Ok(Application { config, store, ai })
}

pub fn router(app: &Application) -> Router {
    let state = AppState { store: app.store.clone(), ai: app.ai.clone() };

    Router::new()
        .merge(crate::health::router())
        .merge(crate::api::router())
        .merge(crate::ai::router())
        .with_state(state)
        .layer(cors_layer(&app.config))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    if config.server.cors_origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .server
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    layer.allow_origin(origins)
}
