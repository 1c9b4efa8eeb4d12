//! Webhook HTTP surface
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | POST | `/trigger` | Alert-driven scaling trigger |
//! | POST | `/optimize` | Scale the workload to its minimum |
//! | GET | `/health` | Liveness probe |
//! | GET | `/ready` | Readiness probe |
//!
//! Handlers only translate between JSON and [`TriggerDispatcher`].

use crate::controllers::{ScalingAction, TriggerDispatcher, TriggerRequest};
use crate::error::ScalerError;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};

/// Build the webhook router around a dispatcher.
pub fn build_router(dispatcher: TriggerDispatcher) -> Router {
    Router::new()
        .route("/trigger", post(handle_trigger))
        .route("/optimize", post(handle_optimize))
        .route("/health", get(health))
        .route("/ready", get(ready))
        .with_state(dispatcher)
}

/// Error body returned for rejected triggers
#[derive(serde::Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    previous_replicas: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    target_replicas: Option<i32>,
}

fn status_for(err: &ScalerError) -> StatusCode {
    match err {
        ScalerError::PolicyNotFound(_) => StatusCode::NOT_FOUND,
        ScalerError::InvalidAction(_) => StatusCode::BAD_REQUEST,
        ScalerError::ReadFailed(_) | ScalerError::ExecutionFailed { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: ScalerError) -> Response {
    let (previous_replicas, target_replicas) = match &err {
        ScalerError::ExecutionFailed { decision, .. } => (
            Some(decision.current_replicas),
            Some(decision.target_replicas),
        ),
        _ => (None, None),
    };
    let body = ErrorBody {
        error: err.kind(),
        message: err.to_string(),
        previous_replicas,
        target_replicas,
    };
    (status_for(&err), Json(body)).into_response()
}

async fn dispatch(dispatcher: &TriggerDispatcher, request: &TriggerRequest) -> Response {
    match dispatcher.handle(request).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /trigger
async fn handle_trigger(
    State(dispatcher): State<TriggerDispatcher>,
    Json(request): Json<TriggerRequest>,
) -> Response {
    dispatch(&dispatcher, &request).await
}

/// POST /optimize
async fn handle_optimize(
    State(dispatcher): State<TriggerDispatcher>,
    Json(mut request): Json<TriggerRequest>,
) -> Response {
    request.action = ScalingAction::ScaleToMinimum.as_str().to_string();
    dispatch(&dispatcher, &request).await
}

/// GET /health
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// GET /ready
async fn ready(State(dispatcher): State<TriggerDispatcher>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ready",
        "policies": dispatcher.policies().len(),
    }))
}
