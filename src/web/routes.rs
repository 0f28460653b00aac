//! REST endpoints for the wizard.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::{debug, info};

use super::ws::ws_handler;
use crate::wizard::{IgnoreReason, WizardSession};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<WizardSession>,
}

/// Build the Axum router with the wizard REST and WebSocket routes.
pub fn wizard_routes(session: Arc<WizardSession>) -> Router {
    let state = AppState { session };

    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .route("/api/wizard", get(get_snapshot))
        .route("/api/wizard/answer", post(post_answer))
        .route("/api/wizard/reset", post(post_reset))
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
        .with_state(state)
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "car-price-ai"
    }))
}

// ── Wizard ──────────────────────────────────────────────────────────────

/// GET /api/wizard
async fn get_snapshot(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.session.snapshot().await)
}

#[derive(Deserialize)]
pub struct AnswerRequest {
    pub text: String,
}

/// POST /api/wizard/answer
///
/// Accepts the answer and returns immediately; pacing and the valuation call
/// continue in the background and show up in later snapshots and on `/ws`.
async fn post_answer(
    State(state): State<AppState>,
    Json(body): Json<AnswerRequest>,
) -> Response {
    let step = match state.session.begin(&body.text).await {
        Ok(step) => step,
        Err(reason) => {
            debug!(%reason, "Answer rejected");
            let status = match reason {
                IgnoreReason::Blank => StatusCode::UNPROCESSABLE_ENTITY,
                IgnoreReason::Busy | IgnoreReason::Done => StatusCode::CONFLICT,
            };
            return (
                status,
                Json(serde_json::json!({"error": "Answer not accepted", "reason": reason})),
            )
                .into_response();
        }
    };

    let session = Arc::clone(&state.session);
    tokio::spawn(async move {
        let outcome = session.finish(step).await;
        debug!(?outcome, "Wizard step finished");
    });

    let snapshot = state.session.snapshot().await;
    (StatusCode::ACCEPTED, Json(snapshot)).into_response()
}

/// POST /api/wizard/reset
///
/// Returns the greeting-only snapshot; the first question follows after the
/// prompt delay.
async fn post_reset(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.session.reset().await;
    info!(session_id = %snapshot.session_id, "Wizard reset via REST");

    let session = Arc::clone(&state.session);
    tokio::spawn(async move { session.start().await });

    Json(snapshot)
}
