use axum::{http::StatusCode, Json, response::IntoResponse};
use serde_json::json;

pub async fn root() -> impl IntoResponse {
    Json(json!({
        "name": "Clubpass API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Supporters club membership operations",
        "status": "operational",
        "endpoints": {
            "health": "/health",
            "members": "/api/members",
            "headcount": "/api/headcount",
            "checkout": "/api/checkout",
            "match": "/api/match",
            "webhooks": "/webhook/form, /webhook/order"
        }
    }))
}

pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}
