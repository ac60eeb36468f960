use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Request, State, rejection::JsonRejection},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    routing::post,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use tracing::{Instrument, info};
use uuid::Uuid;

use crate::AppState;
use crate::config::AppConfig;
use crate::llm::{HttpAssistantsBackend, Orchestrator, RunConfigPayload, RunError};
use crate::shoe::{ScanSolesClient, ShoeDesign, ShoeDesignRequest, ShoeError};

/// Largest accepted request body.
const BODY_LIMIT_BYTES: usize = 1024 * 1024;

/// Build the shared state from configuration.
pub fn build_state(config: Arc<AppConfig>) -> anyhow::Result<AppState> {
    let backend =
        HttpAssistantsBackend::new(config.connect_timeout(), config.outbound_request_timeout())?;
    let orchestrator = Orchestrator::new(Arc::new(backend))
        .with_policy(config.poll_policy())
        .with_defaults(config.run_defaults());

    let shoes = ScanSolesClient::new(
        config.scansoles.base_url.as_str(),
        config.scansoles.api_key.clone(),
        config.connect_timeout(),
        config.outbound_request_timeout(),
    )?;

    Ok(AppState {
        orchestrator: Arc::new(orchestrator),
        shoes: Arc::new(shoes),
        config,
    })
}

/// Build the router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let config = Arc::clone(&state.config);

    let mut app = Router::new()
        .route("/api/chat", post(api_chat))
        .route("/.netlify/functions/mdbchat", post(api_chat))
        .route("/api/generate-shoe", post(api_generate_shoe))
        .route("/.netlify/functions/generate-shoe", post(api_generate_shoe))
        .method_not_allowed_fallback(method_not_allowed);

    if let Some(dir) = &config.server.static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    let timeout_duration = config.request_timeout();
    let mut app = app
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(axum::middleware::from_fn(
            move |req: Request, next: Next| async move {
                match tokio::time::timeout(timeout_duration, next.run(req)).await {
                    Ok(res) => res,
                    Err(_) => (StatusCode::REQUEST_TIMEOUT, "Request timed out").into_response(),
                }
            },
        ))
        .layer(TraceLayer::new_for_http());

    if config.server.cors_permissive {
        app = app.layer(CorsLayer::permissive());
    }

    app.with_state(state)
}

/// Start the Axum server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>) -> anyhow::Result<()> {
    info!(
        name: "run.config.loaded",
        budget_secs = config.run.budget_secs,
        poll_interval_ms = config.run.poll_interval_ms,
        default_model = %config.run.default_model,
        "Run configuration loaded"
    );
    if config.scansoles.api_key.is_none() {
        tracing::warn!("ScanSoles API key not set, shoe generation will fail");
    }

    let state = build_state(Arc::clone(&config))?;
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        static_dir = ?config.server.static_dir,
        "Server started"
    );

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!(name: "server.stopped", "Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

// ─────────────────────────────────────────────────────────────────────────────
// API Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Request body for chat API.
#[derive(Debug, Deserialize)]
struct ChatRequest {
    /// User message content.
    #[serde(default)]
    message: String,
    /// Per-request assistant settings.
    #[serde(default)]
    config: Option<RunConfigPayload>,
}

/// Response from chat API.
#[derive(Debug, Serialize)]
struct ChatResponse {
    reply: String,
}

/// POST /api/chat - Relay one message to the assistant and return its reply.
async fn api_chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(req) = payload?;
    let request_id = Uuid::new_v4();

    async move {
        tracing::info!(message_length = req.message.len(), "Received chat request");

        let config = req.config.unwrap_or_default().into_configuration()?;
        let reply = state.orchestrator.run(&req.message, &config).await?;

        Ok::<_, ApiError>(Json(ChatResponse { reply: reply.text }))
    }
    .instrument(tracing::info_span!("http.chat", request_id = %request_id))
    .await
}

/// POST /api/generate-shoe - Generate a shoe model from a foot scan.
async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(serde_json::json!({ "error": "Method Not Allowed" })),
    )
        .into_response()
}

async fn api_generate_shoe(
    State(state): State<AppState>,
    payload: Result<Json<ShoeDesignRequest>, JsonRejection>,
) -> Result<Json<ShoeDesign>, ApiError> {
    let Json(req) =
        payload.map_err(|rejection| ShoeError::InvalidRequest(rejection.body_text()))?;

    let design = state.shoes.generate(&req).await?;
    info!(model_url = %design.model_url, "Shoe generated");
    Ok(Json(design))
}

// ─────────────────────────────────────────────────────────────────────────────
// Error responses
// ─────────────────────────────────────────────────────────────────────────────

/// Errors rendered as JSON bodies by the API handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Run(#[from] RunError),

    #[error(transparent)]
    Shoe(#[from] ShoeError),

    #[error(transparent)]
    Body(#[from] JsonRejection),
}

/// HTTP status for an orchestrator error.
#[must_use]
pub fn status_for(error: &RunError) -> StatusCode {
    match error {
        e if e.is_request_error() => StatusCode::BAD_REQUEST,
        RunError::RunTimedOut { .. } => StatusCode::GATEWAY_TIMEOUT,
        RunError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Run(e) => {
                let status = status_for(&e);
                if status.is_server_error() {
                    tracing::error!(error = %e, status = status.as_u16(), "Chat request failed");
                }
                (status, Json(serde_json::json!({ "error": e.to_string() }))).into_response()
            }
            Self::Shoe(e) => {
                tracing::error!(error = %e, "Shoe generation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({
                        "error": "Shoe generation failed",
                        "details": e.to_string(),
                    })),
                )
                    .into_response()
            }
            Self::Body(rejection) => (
                rejection.status(),
                Json(serde_json::json!({ "error": rejection.body_text() })),
            )
                .into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{Operation, types::RunStatus};
    use std::time::Duration;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&RunError::ConfigurationInvalid("missing apiKey".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_for(&RunError::EmptyMessage), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_for(&RunError::RunTimedOut {
                run_id: "run_1".into(),
                elapsed: Duration::from_secs(30),
                last_status: RunStatus::InProgress,
            }),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status_for(&RunError::Cancelled),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_for(&RunError::RemoteRejected {
                operation: Operation::CreateRun,
                status: Some(404),
                message: "No assistant found".into(),
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
