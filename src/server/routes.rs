//! REST endpoints for the simulator, analytics, and insights.
//!
//! No logic lives here: every handler forwards to the core and maps errors
//! to status codes (busy/terminal session → 409, empty data → 400,
//! storage → 500).

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tracing::warn;

use crate::analytics::{self, AnalysisResult, StepCompletion, StepDropOff};
use crate::error::{Error, InsightError, SessionError};
use crate::insights::InsightEngine;
use crate::session::Simulator;
use crate::store::FunnelStore;

/// Shared state for the API routes.
#[derive(Clone)]
pub struct AppState {
    pub simulator: Arc<Simulator>,
    pub store: Arc<dyn FunnelStore>,
    pub engine: Arc<InsightEngine>,
}

/// Analysis payload: the aggregate plus both chart projections.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalysisResponse {
    analysis: AnalysisResult,
    completion_chart: Vec<StepCompletion>,
    drop_off_chart: Vec<StepDropOff>,
}

/// Insight generation payload: the new list plus the analysis it came from.
#[derive(Debug, Serialize)]
struct InsightsResponse {
    insights: Vec<String>,
    analysis: AnalysisResult,
}

type ApiError = (StatusCode, Json<serde_json::Value>);

fn error_response(err: Error) -> ApiError {
    let status = match &err {
        Error::Session(SessionError::Busy) => StatusCode::CONFLICT,
        Error::Session(SessionError::AlreadyTerminal { .. }) => StatusCode::CONFLICT,
        Error::Insight(InsightError::NoData) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        warn!(error = %err, "Request failed");
    }
    (status, Json(serde_json::json!({ "error": err.to_string() })))
}

/// POST /api/session/start
async fn start_session(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let view = state.simulator.start().await.map_err(error_response)?;
    Ok(Json(view))
}

/// POST /api/session/complete
async fn complete_step(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .simulator
        .complete_current_step()
        .await
        .map_err(error_response)?;
    Ok(Json(outcome))
}

/// POST /api/session/abandon
async fn abandon_session(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let outcome = state.simulator.abandon().await.map_err(error_response)?;
    Ok(Json(outcome))
}

/// GET /api/session — display state of the active session.
async fn get_session(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.simulator.display().await)
}

/// GET /api/records — the full ordered record list.
async fn get_records(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let records = state
        .store
        .load_records()
        .await
        .map_err(|e| error_response(e.into()))?;
    Ok(Json(records))
}

/// GET /api/analysis — aggregate statistics and chart data, recomputed
/// from the current record set.
async fn get_analysis(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let records = state
        .store
        .load_records()
        .await
        .map_err(|e| error_response(e.into()))?;
    Ok(Json(AnalysisResponse {
        analysis: analytics::analyze(&records),
        completion_chart: analytics::completion_chart(&records),
        drop_off_chart: analytics::drop_off_chart(&records),
    }))
}

/// GET /api/insights — the current stored insight list.
async fn get_insights(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let insights = state
        .store
        .load_insights()
        .await
        .map_err(|e| error_response(e.into()))?;
    Ok(Json(insights))
}

/// POST /api/insights — regenerate the insight list from the current
/// records and persist it, replacing the previous list.
///
/// With zero records this is a user-visible warning, not an error; any
/// storage failure leaves the previously stored list untouched.
async fn generate_insights(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let records = state
        .store
        .load_records()
        .await
        .map_err(|e| error_response(e.into()))?;
    if records.is_empty() {
        return Err(error_response(InsightError::NoData.into()));
    }

    let analysis = analytics::analyze(&records);
    let insights = state.engine.generate(&analysis);
    state
        .store
        .save_insights(&insights)
        .await
        .map_err(|e| error_response(InsightError::Generation(e.to_string()).into()))?;

    Ok(Json(InsightsResponse { insights, analysis }))
}

/// POST /api/reset — clear records and insights, start a fresh session.
async fn reset_all(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    state
        .store
        .reset()
        .await
        .map_err(|e| error_response(e.into()))?;
    let view = state.simulator.start().await.map_err(error_response)?;
    Ok(Json(view))
}

/// Build the API router.
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/session", get(get_session))
        .route("/api/session/start", post(start_session))
        .route("/api/session/complete", post(complete_step))
        .route("/api/session/abandon", post(abandon_session))
        .route("/api/records", get(get_records))
        .route("/api/analysis", get(get_analysis))
        .route("/api/insights", get(get_insights).post(generate_insights))
        .route("/api/reset", post(reset_all))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
