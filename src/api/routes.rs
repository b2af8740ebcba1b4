use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;

use crate::events::SnapshotView;
use crate::middleware::request_logging;
use crate::pipeline::{CycleStatsSummary, PipelineStatus};

/// Shared application state. Read-only handles only.
#[derive(Clone)]
pub struct AppState {
    pub snapshot: SnapshotView,
    pub status: Arc<dyn PipelineStatus>,
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/client/state", get(get_client_state))
        .with_state(state)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(middleware::from_fn(request_logging))
        .layer(CorsLayer::permissive())
}

// ===== Route Handlers =====

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let (active_events, removed_events) = state.snapshot.counts();

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        mapping_version: state.status.mapping_version(),
        mapping_entries: state.status.mapping_entries(),
        mappings_updated_at: state.status.mappings_updated_at(),
        active_events,
        removed_events,
        cycle_in_flight: state.status.is_cycle_in_flight(),
        cycles: state.status.stats_summary(),
    })
}

/// Current events keyed by id, tombstoned events excluded
async fn get_client_state(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let client_state = state.snapshot.client_state();
    let body = serde_json::to_value(client_state).map_err(anyhow::Error::from)?;
    Ok(Json(body))
}

// ===== Response Types =====

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    mapping_version: u64,
    mapping_entries: usize,
    mappings_updated_at: Option<DateTime<Utc>>,
    active_events: usize,
    removed_events: usize,
    cycle_in_flight: bool,
    cycles: CycleStatsSummary,
}

// ===== Error Handling =====

#[derive(Debug)]
pub enum ApiError {
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Internal(err) => {
                tracing::error!("Error serving client state: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}

fn handle_panic(_err: Box<dyn Any + Send + 'static>) -> Response {
    ApiError::Internal(anyhow::anyhow!("request handler panicked")).into_response()
}
