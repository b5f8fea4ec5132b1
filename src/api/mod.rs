//! HTTP surface of the service.
//!
//! All routes live under `/api/` and keep their trailing slashes, which is
//! what the web client calls.

mod chat;
mod documents;
pub mod error;
mod translate;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::agent::FeedbackAgent;
use crate::config::Config;
use crate::db::{Database, StoreError};
use crate::llm::LlmService;
use crate::store::DocumentStore;
use crate::translate::Translator;

pub use error::{ApiError, ApiResult};

/// Shared state for every handler. Built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<DocumentStore>,
    pub llm: Arc<LlmService>,
    pub agent: Arc<FeedbackAgent>,
    pub translator: Arc<Translator>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn from_config(config: &Config) -> Result<Self, StoreError> {
        std::fs::create_dir_all(&config.media_root)?;
        let db = Database::new(&config.database_path)?;

        Ok(Self {
            store: Arc::new(DocumentStore::new(db, config.media_root.clone())),
            llm: Arc::new(LlmService::new(&config.llm)),
            agent: Arc::new(FeedbackAgent::new(&config.agent)),
            translator: Arc::new(Translator::new(config.deepl.clone())),
            max_upload_bytes: config.max_upload_bytes,
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes;

    Router::new()
        .route("/api/hello/", get(chat::hello))
        .route("/api/chat/", post(chat::chat))
        .route("/api/upload/", post(documents::upload))
        .route("/api/dashboard/content/:name/", get(documents::dashboard))
        .route("/api/analyze/:name/", post(documents::analyze))
        .route("/api/translate/", post(translate::translate))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
