//! REST API for the banking persona assistant
//!
//! POST /api/ai       one chat turn
//! GET  /api/ai/ping  provider status
//! GET  /health

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::agent::{ChatOrchestrator, TurnRequest};
use crate::error::AssistantError;

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<ChatOrchestrator>,
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Provider Status
/// =============================

async fn ping(State(state): State<ApiState>) -> Response {
    let status = state.orchestrator.provider_status();
    Json(status).into_response()
}

/// =============================
/// Chat Turn Endpoint
/// =============================

async fn chat_turn(State(state): State<ApiState>, Json(req): Json<TurnRequest>) -> Response {
    if req.conversation.last_user().is_none() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "No user message found" })),
        )
            .into_response();
    }

    info!(
        messages = req.conversation.len(),
        session_id = ?req.session_id,
        "Received chat turn"
    );

    match state.orchestrator.handle_turn(req).await {
        Ok(reply) => (StatusCode::OK, Json(reply)).into_response(),
        Err(e) => error_reply(&state, &e),
    }
}

fn error_reply(state: &ApiState, error: &AssistantError) -> Response {
    warn!(code = error.code().as_str(), "Chat turn failed: {}", error);

    let status = StatusCode::from_u16(error.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(state.orchestrator.error_response(error))).into_response()
}

/// =============================
/// Router
/// =============================

pub fn create_router(orchestrator: Arc<ChatOrchestrator>) -> Router {
    let state = ApiState { orchestrator };

    Router::new()
        .route("/health", get(health))
        .route("/api/ai", post(chat_turn))
        .route("/api/ai/ping", get(ping))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    orchestrator: Arc<ChatOrchestrator>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(orchestrator);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BackendSettings, ProviderConfig};
    use crate::faq::FaqRetriever;
    use crate::persona::InMemoryPersonaStore;
    use crate::provider::{
        BackendFailure, BackendId, BackendRegistry, CompletionBackend, CompletionRequest,
    };
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    struct EchoBackend;

    #[async_trait]
    impl CompletionBackend for EchoBackend {
        fn id(&self) -> BackendId {
            BackendId::Groq
        }

        async fn dispatch(
            &self,
            _request: &CompletionRequest,
        ) -> std::result::Result<String, BackendFailure> {
            Ok("Set aside 20% of your salary first.".into())
        }
    }

    fn router(config: ProviderConfig) -> Router {
        let mut backends = BackendRegistry::new();
        backends.register(Arc::new(EchoBackend));

        let orchestrator = ChatOrchestrator::new(
            Arc::new(config),
            backends,
            Arc::new(InMemoryPersonaStore::new()),
            Arc::new(FaqRetriever::empty()),
        );
        create_router(Arc::new(orchestrator))
    }

    fn configured() -> ProviderConfig {
        ProviderConfig {
            groq: BackendSettings::with_key("gsk"),
            ..ProviderConfig::default()
        }
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_turn(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/ai")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, body) = send(router(configured()), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_turn_round_trip() {
        let (status, body) = send(
            router(configured()),
            post_turn(serde_json::json!({
                "messages": [{"role": "user", "content": "How should I budget my salary?"}]
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["text"], "Set aside 20% of your salary first.");
        assert_eq!(body["provider"], "groq");
        assert_eq!(body["personaSnapshot"]["riskAffinity"], "balanced");
        assert_eq!(body["trace"][0], "GATING");
    }

    #[tokio::test]
    async fn test_anonymous_callers_do_not_share_a_persona() {
        let app = router(configured());
        let turn = || {
            post_turn(serde_json::json!({
                "messages": [{"role": "user", "content": "How do I pay off my loan early?"}]
            }))
        };

        let (_, first) = send(app.clone(), turn()).await;
        let (_, second) = send(app, turn()).await;

        assert_eq!(first["personaSnapshot"]["id"], first["sessionId"]);
        assert_ne!(first["sessionId"], second["sessionId"]);
        assert_ne!(first["personaSnapshot"]["id"], second["personaSnapshot"]["id"]);
    }

    #[tokio::test]
    async fn test_session_id_carries_persona_across_requests() {
        let app = router(configured());
        let (_, first) = send(
            app.clone(),
            post_turn(serde_json::json!({
                "messages": [{"role": "user", "content": "I'm worried about my loan payment"}]
            })),
        )
        .await;

        let (_, second) = send(
            app,
            post_turn(serde_json::json!({
                "messages": [{"role": "user", "content": "How do I restructure the loan?"}],
                "sessionId": first["sessionId"]
            })),
        )
        .await;

        assert_eq!(second["sessionId"], first["sessionId"]);
        assert_eq!(second["personaSnapshot"]["createdAt"], first["personaSnapshot"]["createdAt"]);
    }

    #[tokio::test]
    async fn test_missing_user_message_is_400() {
        let (status, body) = send(
            router(configured()),
            post_turn(serde_json::json!({
                "messages": [{"role": "assistant", "content": "Hi! How can I help?"}]
            })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No user message found");
    }

    #[tokio::test]
    async fn test_not_configured_is_400_with_code() {
        let (status, body) = send(
            router(ProviderConfig::default()),
            post_turn(serde_json::json!({
                "messages": [{"role": "user", "content": "What is a credit card APR?"}]
            })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "not_configured");
        assert_eq!(body["provider"], "auto");
    }

    #[tokio::test]
    async fn test_ping_reports_status() {
        let request = Request::builder()
            .uri("/api/ai/ping")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(router(configured()), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["configured"], true);
        assert_eq!(body["provider"], "groq");
        assert_eq!(body["model"], "llama-3.3-70b-versatile");
    }
}
