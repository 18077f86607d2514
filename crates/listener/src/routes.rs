//! Route table and request handlers.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use engine::Orchestrator;
use pipeline::{AnalysisReport, ExecutionOptions, HistoryReport, LayerDefinition, OrchestrationResult};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{ApiError, AppState};

/// Records returned by `/history` when no limit is given.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Largest `limit` `/history` honours.
pub const MAX_HISTORY_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub file_path: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRequest {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub layers: Vec<u8>,
    #[serde(default)]
    pub options: Option<ExecutionOptions>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub transformer: String,
    pub version: &'static str,
}

/// Builds the full route table around `orchestrator`.
pub fn router(orchestrator: Arc<Orchestrator>) -> Router {
    Router::new()
        .route("/analyze", post(analyze))
        .route("/execute", post(execute))
        .route("/layers", get(layers))
        .route("/history", get(history))
        .route("/health", get(health))
        .with_state(AppState { orchestrator })
}

fn required_code(code: Option<String>) -> Result<String, ApiError> {
    match code {
        Some(code) if !code.trim().is_empty() => Ok(code),
        _ => Err(ApiError::MissingCode),
    }
}

async fn analyze(
    State(state): State<AppState>,
    body: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalysisReport>, ApiError> {
    let Json(request) = body?;
    let code = required_code(request.code)?;
    let report = state
        .orchestrator
        .analyze(&code, request.file_path.as_deref());
    Ok(Json(report))
}

async fn execute(
    State(state): State<AppState>,
    body: Result<Json<ExecuteRequest>, JsonRejection>,
) -> Result<Json<OrchestrationResult>, ApiError> {
    let Json(request) = body?;
    let code = required_code(request.code)?;
    let options = request.options.unwrap_or_default();
    let layers = request.layers;
    info!(layers = ?layers, bytes = code.len(), "execute requested");

    // A panic escaping the orchestrator is answered with a 500 instead of a
    // dropped connection.
    let orchestrator = Arc::clone(&state.orchestrator);
    let result = tokio::spawn(async move { orchestrator.orchestrate(&code, &layers, &options).await })
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(result))
}

async fn layers(State(state): State<AppState>) -> Json<Vec<LayerDefinition>> {
    Json(state.orchestrator.layer_info())
}

async fn history(
    State(state): State<AppState>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<HistoryReport>, ApiError> {
    let Query(query) = query?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .min(MAX_HISTORY_LIMIT);
    Ok(Json(state.orchestrator.history(limit)))
}

async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok",
        transformer: state.orchestrator.transformer_name().to_string(),
        version: env!("CARGO_PKG_VERSION"),
    })
}
