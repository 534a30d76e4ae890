//! Scheduled Trigger Handler
//!
//! `GET /__scheduled?cron=<expr>` 手动触发一次定时事件（开发调试用）

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::application::{DispatchOutcome, ScheduledEvent};
use crate::infrastructure::http::dto::ApiResponse;
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ScheduledParams {
    pub cron: Option<String>,
}

pub async fn trigger_scheduled(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ScheduledParams>,
) -> Result<Json<ApiResponse<DispatchOutcome>>, ApiError> {
    let cron = params
        .cron
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing `cron` query parameter".to_string()))?;

    let outcome = state.dispatcher.dispatch(&ScheduledEvent::new(cron)).await?;

    Ok(Json(ApiResponse::success(outcome)))
}
