use axum::{
    extract::State,
    Json,
};
use serde::Deserialize;

use crate::{
    api::state::AppState,
    domain::{BroadcastReport, TransitionReport},
    error::{AppError, Result},
};

pub async fn checkout(State(state): State<AppState>) -> Result<Json<TransitionReport>> {
    let report = state.service_context.transition_service.check_out_all().await?;
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct MatchUpdateRequest {
    /// Display string for the pass, e.g. "LIV v EVE Sat 12:30".
    pub display: String,
    #[serde(default)]
    pub only_placeholders: bool,
}

pub async fn update_match(
    State(state): State<AppState>,
    Json(request): Json<MatchUpdateRequest>,
) -> Result<Json<BroadcastReport>> {
    let display = request.display.trim();
    if display.is_empty() {
        return Err(AppError::BadRequest("Match display text is required".to_string()));
    }

    let report = state
        .service_context
        .broadcast_service
        .update_next_match(display, request.only_placeholders)
        .await?;
    Ok(Json(report))
}
