//! Handler for the DAG trigger endpoint.
//!
//! Accepts a JSON body (POST) or query parameters (GET), normalizes them,
//! and hands the result to the relay for a single trigger attempt.

use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::Method;
use axum::Json;
use dagrelay_core::error::CoreError;
use dagrelay_core::trigger::{TriggerQuery, TriggerResult};

use crate::error::{AppError, AppResult};
use crate::response::TriggerResponse;
use crate::state::AppState;

/// GET / and POST /
///
/// Trigger one run of the resolved DAG. Extractor rejections are taken as
/// values so every failure renders the JSON error envelope. The query is
/// decoded as raw pairs; it only matters when the body is empty or `null`.
pub async fn trigger_dag(
    State(state): State<AppState>,
    method: Method,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
    body: Result<Bytes, BytesRejection>,
) -> AppResult<Json<TriggerResponse>> {
    let query = query
        .map(|Query(pairs)| TriggerQuery::from_pairs(pairs))
        .map_err(|e| CoreError::BadRequest(format!("Invalid query string: {}", e.body_text())));
    let body =
        body.map_err(|e| AppError::BadRequest(format!("Unreadable request body: {}", e.body_text())))?;

    let trigger = state.normalizer.normalize(&body, query).map_err(|e| {
        tracing::info!(%method, error = %e, "Rejected trigger request");
        AppError::Core(e)
    })?;

    tracing::debug!(%method, dag_id = %trigger.dag_id, "Normalized trigger request");

    match state.relay.trigger(&trigger).await {
        TriggerResult::Success(success) => Ok(Json(TriggerResponse::from(success))),
        TriggerResult::Failure(err) => Err(AppError::Core(err)),
    }
}
