use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use crate::batch::{BatchOrchestrator, BatchRequest};
use crate::error::MusterError;
use crate::store::ExecutionStatus;

#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<BatchOrchestrator>,
}

#[derive(Deserialize)]
struct SubmitBatchRequest {
    #[serde(flatten)]
    request: BatchRequest,
    #[serde(default = "default_user")]
    user_id: String,
}

fn default_user() -> String {
    "anonymous".to_string()
}

#[derive(Deserialize)]
struct StatusQuery {
    status: Option<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Build the HTTP API router.
pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/batches", post(create_batch_handler))
        .route("/api/batches/{id}", get(batch_status_handler))
        .route("/api/batches/{id}/cancel", post(cancel_batch_handler))
        .route("/api/queue", get(queue_status_handler))
        .layer(cors)
        .with_state(state)
}

fn error_status(err: &MusterError) -> StatusCode {
    match err {
        MusterError::InvalidNodes(_) => StatusCode::BAD_REQUEST,
        MusterError::BatchNotFound(_) | MusterError::ExecutionNotFound(_) => StatusCode::NOT_FOUND,
        MusterError::QueueFull { .. } | MusterError::Enqueue { .. } => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: MusterError) -> (StatusCode, Json<ErrorResponse>) {
    (
        error_status(&err),
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

async fn create_batch_handler(
    State(state): State<ApiState>,
    Json(payload): Json<SubmitBatchRequest>,
) -> impl IntoResponse {
    match state
        .orchestrator
        .create_batch(payload.request, &payload.user_id)
        .await
    {
        Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

async fn batch_status_handler(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Query(query): Query<StatusQuery>,
) -> impl IntoResponse {
    let filter = match query.status.as_deref() {
        Some(raw) => match raw.parse::<ExecutionStatus>() {
            Ok(status) => Some(status),
            Err(e) => {
                return (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: e }))
                    .into_response()
            }
        },
        None => None,
    };

    match state.orchestrator.get_batch_status(id, filter).await {
        Ok(report) => Json(report).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

async fn cancel_batch_handler(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match state.orchestrator.cancel_batch(id).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

async fn queue_status_handler(State(state): State<ApiState>) -> impl IntoResponse {
    Json(state.orchestrator.queue().status().await)
}
