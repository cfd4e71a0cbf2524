//! HTTP routes
//!
//! The reader is a static site: everything under the web root is served as
//! files, with a couple of JSON endpoints next to it.

pub mod chapters;
pub mod health;

use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the application router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let static_files = ServeDir::new(&state.config().content.root);

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1/health", health::router())
        .nest("/api/v1/chapters", chapters::router())
        .fallback_service(static_files)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tempfile::TempDir;
    use tower::ServiceExt;

    const INDEX: &str = r#"{
        "generated": "2024-03-05T10:20:30.000Z",
        "items": [
            {"source": "firstaid", "system": "renal", "title": "Acid Base", "slug": "acid_base",
             "url": "build/content/firstaid/renal/acid_base.html", "updated": "2024-03-01T08:00:00.000Z"},
            {"source": "firstaid", "system": "cardio", "title": "Murmurs", "slug": "murmurs",
             "url": "build/content/firstaid/cardio/murmurs.html", "updated": "2024-03-01T08:00:00.000Z"}
        ]
    }"#;

    fn app(root: &std::path::Path) -> Router {
        let mut config = Config::default();
        config.content.root = root.to_path_buf();
        config.content.decks_dir = root.to_path_buf();
        router(AppState::new(config))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let dir = TempDir::new().unwrap();
        let (status, body) = get_json(app(dir.path()), "/api/v1/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "study-reader");
        assert_eq!(body["indexes"]["chapters"], false);

        std::fs::write(dir.path().join("index.json"), INDEX).unwrap();
        let (_, body) = get_json(app(dir.path()), "/health").await;
        assert_eq!(body["indexes"]["chapters"], true);
        assert_eq!(body["indexes"]["decks"], false);
    }

    #[tokio::test]
    async fn test_chapters_grouped_and_filtered() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("index.json"), INDEX).unwrap();

        let (status, body) = get_json(app(dir.path()), "/api/v1/chapters").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 2);
        assert_eq!(body["groups"][0]["label"], "firstaid / cardio");
        assert_eq!(body["groups"][1]["items"][0]["title"], "Acid Base");

        let (_, body) = get_json(app(dir.path()), "/api/v1/chapters?q=ACID").await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["groups"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_chapters_missing_index() {
        let dir = TempDir::new().unwrap();
        let (status, body) = get_json(app(dir.path()), "/api/v1/chapters").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
    }

    #[tokio::test]
    async fn test_chapters_corrupt_index() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("index.json"), "{\"items\": [").unwrap();
        let (status, body) = get_json(app(dir.path()), "/api/v1/chapters").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "library_error");
    }

    #[tokio::test]
    async fn test_static_fragment_served() {
        let dir = TempDir::new().unwrap();
        let chapter = dir.path().join("build/content/firstaid/renal");
        std::fs::create_dir_all(&chapter).unwrap();
        std::fs::write(chapter.join("acid_base.html"), "<h1>Acid Base</h1>").unwrap();

        let response = app(dir.path())
            .oneshot(
                Request::builder()
                    .uri("/build/content/firstaid/renal/acid_base.html")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"<h1>Acid Base</h1>");
    }
}
