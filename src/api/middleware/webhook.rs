use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;

use crate::{
    api::state::AppState,
    error::AppError,
};

pub const WEBHOOK_SECRET_HEADER: &str = "X-Webhook-Secret";

/// Rejects webhook deliveries that do not carry the shared secret. With no
/// secret configured every delivery is accepted.
pub async fn require_webhook_secret(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(expected) = state.webhook_secret() else {
        return Ok(next.run(request).await);
    };

    let provided = request
        .headers()
        .get(WEBHOOK_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    if !bool::from(provided.as_bytes().ct_eq(expected.as_bytes())) {
        tracing::warn!("Webhook delivery with a wrong secret rejected");
        return Err(AppError::Unauthorized);
    }

    Ok(next.run(request).await)
}
