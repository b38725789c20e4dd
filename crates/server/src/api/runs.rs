//! Manual run handlers.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use reportrelay_core::orchestrator::{CompletionCallback, LastRun};
use reportrelay_core::RunReport;

use super::{error_response, message, ErrorResponse, MessageResponse};
use crate::cli::requested_range;
use crate::state::AppState;

/// Optional body of `POST /runs`.
#[derive(Debug, Default, Deserialize)]
pub struct RunRequest {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Start a run in the background. 202 when started, 409 when a run is
/// already in flight.
pub async fn trigger_run(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<MessageResponse>), (StatusCode, Json<ErrorResponse>)> {
    let request: RunRequest = if body.is_empty() {
        RunRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| error_response(StatusCode::BAD_REQUEST, e))?
    };

    let range = requested_range(
        &state.config().date_range,
        request.start_date,
        request.end_date,
    )
    .map_err(|e| error_response(StatusCode::BAD_REQUEST, e))?;

    let on_done: CompletionCallback = Box::new(|report: &RunReport| {
        if report.success {
            info!(
                "Manual run {} completed in {} ms",
                report.run_id,
                report.duration_ms()
            );
        } else {
            warn!(
                "Manual run {} failed: {}",
                report.run_id,
                report.error.as_deref().unwrap_or("unknown error")
            );
        }
    });

    match state.orchestrator().spawn_run(range, Some(on_done)) {
        Ok(_handle) => Ok((StatusCode::ACCEPTED, message("Workflow run started"))),
        Err(e) => Err(error_response(StatusCode::CONFLICT, e)),
    }
}

/// Summary of the last finished run.
pub async fn last_run(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.orchestrator().last_run().await {
        Some(run) => Ok(Json::<LastRun>(run)),
        None => Err(error_response(StatusCode::NOT_FOUND, "No run has finished yet")),
    }
}
