//! HTTP API server for the data monitor
//!
//! Exposes the live counters, the buffered events and readings, and the
//! controls a dashboard needs: search text, buffer size, pause and resume.

use crate::{
    core::{Event, Reading},
    error::MonitorError,
    monitor::{Monitor, MonitorStats},
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

/// Request to change the active search filter
#[derive(Debug, Deserialize)]
pub struct FilterRequest {
    #[serde(default)]
    pub filter: String,
}

/// Request to change the per-table buffer size
#[derive(Debug, Deserialize)]
pub struct BufferSizeRequest {
    pub buffer_size: usize,
}

/// Generic success response
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub message: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Shared application state
pub struct AppState {
    pub monitor: Arc<Monitor>,
}

/// Custom error type for API errors
pub enum ApiError {
    BadRequest(String),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}

impl From<MonitorError> for ApiError {
    fn from(err: MonitorError) -> Self {
        match err {
            MonitorError::InvalidBufferSize { .. } | MonitorError::Config(_) => {
                ApiError::BadRequest(err.to_string())
            }
            other => ApiError::InternalError(other.to_string()),
        }
    }
}

/// Create the HTTP router with all routes
pub fn create_server(monitor: Arc<Monitor>) -> Router {
    let state = Arc::new(AppState { monitor });

    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/stats", get(stats))
        .route("/api/events", get(list_events))
        .route("/api/events/recent", get(recent_events))
        .route("/api/readings", get(list_readings))
        .route("/api/filter", put(update_filter))
        .route("/api/buffer-size", put(update_buffer_size))
        .route("/api/processor/activate", post(activate))
        .route("/api/processor/deactivate", post(deactivate))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(SuccessResponse { message: "Data monitor HTTP API is running".to_string() })
}

/// Run store work on the blocking pool. Filter and resize rescan every
/// buffered row under the store's write lock.
async fn with_monitor<T, F>(state: &AppState, work: F) -> Result<T, ApiError>
where
    F: FnOnce(&Monitor) -> T + Send + 'static,
    T: Send + 'static,
{
    let monitor = Arc::clone(&state.monitor);
    tokio::task::spawn_blocking(move || work(&monitor))
        .await
        .map_err(|e| ApiError::InternalError(format!("Store task failed: {}", e)))
}

/// GET /api/stats - Counters, rates and store sizes
async fn stats(State(state): State<Arc<AppState>>) -> Result<Json<MonitorStats>, ApiError> {
    Ok(Json(with_monitor(&state, Monitor::stats).await?))
}

/// GET /api/events - Buffered events matching the active filter
async fn list_events(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Event>>, ApiError> {
    Ok(Json(with_monitor(&state, |monitor| monitor.db().get_events()).await?))
}

/// GET /api/events/recent - The last few processed events
async fn recent_events(State(state): State<Arc<AppState>>) -> Json<Vec<Event>> {
    Json(state.monitor.processor().last_events())
}

/// GET /api/readings - Buffered readings matching the active filter
async fn list_readings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Reading>>, ApiError> {
    Ok(Json(with_monitor(&state, |monitor| monitor.db().get_readings()).await?))
}

/// PUT /api/filter - Replace the search filter; empty clears it
async fn update_filter(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<FilterRequest>,
) -> Result<Json<MonitorStats>, ApiError> {
    let stats = with_monitor(&state, move |monitor| {
        monitor.set_search(&payload.filter);
        monitor.stats()
    })
    .await?;
    Ok(Json(stats))
}

/// PUT /api/buffer-size - Resize both tables
async fn update_buffer_size(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<BufferSizeRequest>,
) -> Result<Json<MonitorStats>, ApiError> {
    let stats = with_monitor(&state, move |monitor| {
        monitor.set_buffer_size(payload.buffer_size).map(|_| monitor.stats())
    })
    .await??;
    Ok(Json(stats))
}

/// POST /api/processor/activate - Resume ingestion
async fn activate(State(state): State<Arc<AppState>>) -> Json<SuccessResponse> {
    state.monitor.connect();
    Json(SuccessResponse { message: "Event processor activated".to_string() })
}

/// POST /api/processor/deactivate - Pause ingestion
async fn deactivate(State(state): State<Arc<AppState>>) -> Json<SuccessResponse> {
    state.monitor.disconnect();
    Json(SuccessResponse { message: "Event processor deactivated".to_string() })
}

/// Start the HTTP server on the specified address
pub async fn start_server(addr: &str, monitor: Arc<Monitor>) -> std::io::Result<()> {
    let app = create_server(monitor);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, "data monitor HTTP API listening");

    axum::serve(listener, app).await?;

    Ok(())
}
