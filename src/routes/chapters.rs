//! Chapter listing endpoint
//!
//! Serves the built chapter index grouped by source and system, optionally
//! filtered with `?q=`.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::library::{ChapterIndex, ChapterItem, LibraryError};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ChapterQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Serialize)]
pub struct ChapterGroupResponse {
    pub label: String,
    pub source: String,
    pub system: String,
    pub items: Vec<ChapterItem>,
}

#[derive(Debug, Serialize)]
pub struct ChapterListResponse {
    pub generated: DateTime<Utc>,
    pub total: usize,
    pub groups: Vec<ChapterGroupResponse>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_chapters))
}

async fn list_chapters(
    State(state): State<AppState>,
    Query(query): Query<ChapterQuery>,
) -> Result<Json<ChapterListResponse>> {
    let path = state.config().content.chapter_index_path();
    let raw = match tokio::fs::read_to_string(&path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::NotFound(
                "Chapter index has not been built".to_string(),
            ))
        }
        Err(e) => return Err(e.into()),
    };
    let index: ChapterIndex = serde_json::from_str(&raw).map_err(LibraryError::from)?;

    let matches = index.search(&query.q);
    let groups = ChapterIndex::grouped(&matches)
        .into_iter()
        .map(|group| ChapterGroupResponse {
            label: group.label(),
            source: group.source.to_string(),
            system: group.system.to_string(),
            items: group.items.into_iter().cloned().collect(),
        })
        .collect();

    Ok(Json(ChapterListResponse {
        generated: index.generated,
        total: matches.len(),
        groups,
    }))
}
