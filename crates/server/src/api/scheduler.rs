//! Scheduler control handlers.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use std::sync::Arc;

use reportrelay_core::scheduler::ScheduleState;
use reportrelay_core::SchedulerError;

use super::{error_response, message, ErrorResponse, MessageResponse};
use crate::state::AppState;

type ApiResult = Result<Json<MessageResponse>, (StatusCode, Json<ErrorResponse>)>;

#[derive(Debug, Deserialize)]
pub struct RunTimeRequest {
    pub run_time: String,
}

fn scheduler_error(e: SchedulerError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match e {
        SchedulerError::InvalidRunTime(_) => StatusCode::BAD_REQUEST,
        SchedulerError::AlreadyActive | SchedulerError::NotActive => StatusCode::CONFLICT,
        SchedulerError::Persist(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, e)
}

pub async fn get_state(State(state): State<Arc<AppState>>) -> Json<ScheduleState> {
    Json(state.scheduler().state())
}

pub async fn start(State(state): State<Arc<AppState>>) -> ApiResult {
    state.scheduler().start().await.map_err(scheduler_error)?;
    Ok(message("Scheduler started"))
}

pub async fn stop(State(state): State<Arc<AppState>>) -> ApiResult {
    state.scheduler().stop().await.map_err(scheduler_error)?;
    Ok(message("Scheduler stopped"))
}

/// Change the daily run time. The scheduler restarts if it was active.
pub async fn set_run_time(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RunTimeRequest>,
) -> ApiResult {
    state
        .scheduler()
        .reschedule(&request.run_time)
        .await
        .map_err(scheduler_error)?;
    Ok(message(format!(
        "Run time set to {}",
        state.scheduler().state().run_time
    )))
}
