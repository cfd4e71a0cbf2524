//! Health check endpoints
//!
//! Besides liveness, reports whether the builders have produced the indexes
//! the reader and the deck app load on startup.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct IndexStatus {
    pub chapters: bool,
    pub decks: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub service: &'static str,
    pub indexes: IndexStatus,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let content = &state.config().content;
    let indexes = IndexStatus {
        chapters: tokio::fs::try_exists(content.chapter_index_path())
            .await
            .unwrap_or(false),
        decks: tokio::fs::try_exists(content.deck_index_path())
            .await
            .unwrap_or(false),
    };

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        service: "study-reader",
        indexes,
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(health_check))
}
