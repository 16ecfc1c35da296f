use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;

use sentinel_application::commands::pass_commands;
use sentinel_application::dtos::{AlertQuery, AlertSummary, SummaryQuery};
use sentinel_application::queries::{alert_queries, checkpoint_queries};
use sentinel_application::AppState;
use sentinel_domain::{AlertRecord, Checkpoint, PassResult};

use crate::error::HttpError;
use crate::middleware::authorize;

/// Runs a MANUAL pass and waits for it. 409 while another pass holds the
/// checkpoint. If the request times out the reply is lost, but the pass keeps
/// running and its outcome lands on the checkpoint.
pub async fn run_pass(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<PassResult>, HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Unauthorized);
    }
    let result = pass_commands::run_manual_pass(&state).await?;
    Ok(Json(result))
}

pub async fn get_checkpoint(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Checkpoint>, HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Unauthorized);
    }
    let checkpoint = checkpoint_queries::get_checkpoint(&state).await?;
    Ok(Json(checkpoint))
}

pub async fn list_alerts(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<AlertQuery>,
) -> Result<Json<Vec<AlertRecord>>, HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Unauthorized);
    }
    let rows = alert_queries::list_alerts(&state, query).await?;
    Ok(Json(rows))
}

pub async fn alert_summary(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<AlertSummary>, HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Unauthorized);
    }
    let summary = alert_queries::alert_summary(&state, query).await?;
    Ok(Json(summary))
}
