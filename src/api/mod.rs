pub mod handlers;
pub mod middleware;
pub mod state;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::CorsLayer,
    trace::TraceLayer,
};
use std::sync::Arc;

use crate::{
    config::Settings,
    service::ServiceContext,
};
use state::AppState;

pub fn create_app(
    service_context: Arc<ServiceContext>,
    settings: Arc<Settings>,
) -> Router {
    let app_state = AppState::new(service_context, settings);

    Router::new()
        // Root and health endpoints
        .route("/", get(handlers::root::root))
        .route("/health", get(handlers::root::health_check))

        // Operator actions
        .nest("/api", api_routes())

        // Inbound order/form webhooks
        .nest("/webhook", webhook_routes(app_state.clone()))

        .with_state(app_state)

        // Middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/members", post(handlers::members::create))
        .route("/headcount", get(handlers::members::headcount))
        .route("/checkout", post(handlers::checkout::checkout))
        .route("/match", post(handlers::checkout::update_match))
}

fn webhook_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/form", post(handlers::webhooks::form))
        .route("/order", post(handlers::webhooks::order))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::webhook::require_webhook_secret,
        ))
}
