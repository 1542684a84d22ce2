//! HTTP gateway for parley.
//!
//! Exposes health, streaming chat, and history endpoints over the dispatch
//! runtime. Built on Axum.

pub mod api;
pub mod runtime;

pub use api::{AppState, SharedState};
pub use runtime::Runtime;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::{
    Router,
    routing::{get, post},
};
use parley_config::AppConfig;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Build the router with every gateway route.
pub fn build_router(state: SharedState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(api::health_handler))
        .route("/api/chat", post(api::chat_handler))
        .route("/api/chat-history/{session_id}", get(api::history_handler))
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS policy from `gateway.allowed_origins`. Empty or `*` allows any origin.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let allow_origin = if allowed_origins.is_empty() || allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|origin| match origin.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600))
}

/// Start the gateway and serve until Ctrl-C, then drain the worker pool.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let runtime = Runtime::from_config(&config).await?;
    let app = build_router(runtime.state(), &config.gateway.allowed_origins);

    info!(addr = %addr, workers = runtime.workers(), "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    runtime.shutdown().await;
    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C, serving until killed");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use api::{ErrorResponse, HealthResponse, HistoryResponse};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use parley_core::history::HistoryStore;
    use parley_core::message::{Message, Role};
    use parley_core::model::{LanguageModel, ModelFactory, StreamFn};
    use parley_core::{Error, Result};
    use parley_memory::InMemoryHistory;
    use std::sync::Arc;
    use tower::ServiceExt;

    /// Streams the same chunks for every prompt.
    struct CannedModel {
        chunks: Vec<&'static str>,
    }

    #[async_trait]
    impl LanguageModel for CannedModel {
        fn model_id(&self) -> &str {
            "canned"
        }

        async fn generate(&self, _prompt: &str, on_chunk: Option<&StreamFn<'_>>) -> Result<String> {
            if let Some(forward) = on_chunk {
                for chunk in &self.chunks {
                    forward(chunk)?;
                }
            }
            Ok(self.chunks.concat())
        }
    }

    struct CannedFactory(Arc<CannedModel>);

    impl ModelFactory for CannedFactory {
        fn create(&self, model_id: &str) -> Result<Arc<dyn LanguageModel>> {
            if model_id.is_empty() {
                return Err(Error::config("missing model name"));
            }
            Ok(self.0.clone())
        }
    }

    fn test_runtime(history: Arc<InMemoryHistory>) -> Runtime {
        let mut config = AppConfig::default();
        config.dispatch.workers = 2;
        let model = Arc::new(CannedModel {
            chunks: vec!["2 + 2", " = ", "4"],
        });
        Runtime::with_parts(&config, Arc::new(CannedFactory(model)), vec![], history)
    }

    fn app(runtime: &Runtime) -> Router {
        build_router(runtime.state(), &[])
    }

    fn chat_request(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn health_reports_workers() {
        let runtime = test_runtime(Arc::new(InMemoryHistory::new()));
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();

        let response = app(&runtime).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let health: HealthResponse = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(health.status, "ok");
        assert_eq!(health.workers, 2);
        assert_eq!(health.in_flight, 0);
    }

    #[tokio::test]
    async fn chat_streams_result_events_and_records_history() {
        let history = Arc::new(InMemoryHistory::new());
        let runtime = test_runtime(history.clone());

        let response = app(&runtime)
            .oneshot(chat_request(serde_json::json!({
                "username": "ana",
                "session_id": "s1",
                "query": "2+2?",
                "model": "qwen-plus",
                "mode": "normal"
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            response.headers()["content-type"]
                .to_str()
                .unwrap()
                .starts_with("text/event-stream")
        );

        let body = body_text(response).await;
        assert_eq!(body.matches("event: result").count(), 3);
        assert!(body.contains("data: 2 + 2"));
        assert!(body.contains("data: 4"));
        assert!(!body.contains("event: error"));

        let turns = history.get_history("s1").await.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].content, "2 + 2 = 4");
    }

    #[tokio::test]
    async fn missing_field_is_bad_request() {
        let runtime = test_runtime(Arc::new(InMemoryHistory::new()));

        let response = app(&runtime)
            .oneshot(chat_request(serde_json::json!({
                "username": "ana",
                "session_id": "s1",
                "query": "   ",
                "model": "qwen-plus"
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let err: ErrorResponse = serde_json::from_str(&body_text(response).await).unwrap();
        assert!(err.error.contains("query"));
    }

    #[tokio::test]
    async fn unknown_mode_streams_error_event() {
        let history = Arc::new(InMemoryHistory::new());
        let runtime = test_runtime(history.clone());

        let response = app(&runtime)
            .oneshot(chat_request(serde_json::json!({
                "username": "ana",
                "session_id": "s1",
                "query": "hi",
                "model": "qwen-plus",
                "mode": "turbo"
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_text(response).await;
        assert!(body.contains("event: error"));
        assert!(body.contains("invalid mode: turbo"));
        assert!(!body.contains("event: result"));
        assert_eq!(history.session_count().await, 0);
    }

    #[tokio::test]
    async fn history_endpoint_lists_turns() {
        let history = Arc::new(
            InMemoryHistory::new()
                .with_session("s9", vec![Message::user("hello"), Message::assistant("hi there")]),
        );
        let runtime = test_runtime(history);

        let req = Request::builder()
            .uri("/api/chat-history/s9")
            .body(Body::empty())
            .unwrap();
        let response = app(&runtime).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: HistoryResponse = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body.session_id, "s9");
        assert_eq!(body.messages.len(), 2);
        assert_eq!(body.messages[0].role, Role::User);
        assert_eq!(body.messages[1].content, "hi there");
    }

    #[tokio::test]
    async fn unknown_session_has_empty_history() {
        let runtime = test_runtime(Arc::new(InMemoryHistory::new()));
        let req = Request::builder()
            .uri("/api/chat-history/nobody")
            .body(Body::empty())
            .unwrap();

        let response = app(&runtime).oneshot(req).await.unwrap();
        let body: HistoryResponse = serde_json::from_str(&body_text(response).await).unwrap();
        assert!(body.messages.is_empty());
    }

    #[tokio::test]
    async fn configured_origin_is_allowed() {
        let runtime = test_runtime(Arc::new(InMemoryHistory::new()));
        let router = build_router(runtime.state(), &["http://localhost:3000".to_string()]);

        let req = Request::builder()
            .uri("/health")
            .header("origin", "http://localhost:3000")
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(req).await.unwrap();

        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "http://localhost:3000"
        );
    }
}
