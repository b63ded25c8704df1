//! REST surface of the service binary.
//!
//! - `GET /health`
//! - `POST /api/mars/ingest`
//! - `POST /api/mars/ask` with `{"question": "..."}`
//! - `GET /api/mars/analyze`

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::{error, info};

use crate::{
    application::{
        AnalysisResult, AskRequest, AskResponse, HealthStatusResponse, IngestResponse,
        MarsService,
    },
    domain::DomainError,
};

#[derive(Clone)]
struct AppState {
    service: Arc<MarsService>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

pub fn router(service: Arc<MarsService>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/mars/ingest", post(ingest))
        .route("/api/mars/ask", post(ask))
        .route("/api/mars/analyze", get(analyze))
        .with_state(AppState { service })
}

/// Runs a blocking service call on the blocking pool.
async fn run_blocking<T, F>(state: AppState, code: &'static str, op: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(&MarsService) -> Result<T, DomainError> + Send + 'static,
{
    let service = state.service;
    let result = tokio::task::spawn_blocking(move || op(&service))
        .await
        .map_err(|err| {
            error!(target: "marsrag::http", error = %err, "worker task failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: err.to_string(),
                    code: "TASK_FAILED".into(),
                }),
            )
        })?;

    result.map(Json).map_err(|err| {
        error!(target: "marsrag::http", code, error = %err, "request failed");
        (
            status_for(&err),
            Json(ErrorResponse {
                error: err.to_string(),
                code: code.into(),
            }),
        )
    })
}

fn status_for(err: &DomainError) -> StatusCode {
    match err {
        DomainError::Validation(_) => StatusCode::BAD_REQUEST,
        DomainError::Fetch(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn health_check(State(state): State<AppState>) -> ApiResult<HealthStatusResponse> {
    run_blocking(state, "HEALTH_FAILED", |service| service.health()).await
}

async fn ingest(State(state): State<AppState>) -> ApiResult<IngestResponse> {
    let response = run_blocking(state, "INGEST_FAILED", |service| service.ingest()).await?;
    info!(target: "marsrag::http", status = %response.status, "ingest completed");
    Ok(response)
}

async fn ask(
    State(state): State<AppState>,
    Json(payload): Json<AskRequest>,
) -> ApiResult<AskResponse> {
    run_blocking(state, "ASK_FAILED", move |service| service.ask(payload)).await
}

async fn analyze(State(state): State<AppState>) -> ApiResult<AnalysisResult> {
    run_blocking(state, "ANALYZE_FAILED", |service| service.analyze()).await
}
