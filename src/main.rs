use std::sync::Arc;

use clubpass::{
    api,
    directory::{MemberDirectory, PassKitDirectory},
    service::ServiceContext,
    telemetry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    telemetry::init("clubpass=debug,tower_http=debug,axum=debug");

    // Load configuration
    let settings = telemetry::load_settings()?;

    tracing::info!("Starting Clubpass server on {}:{}", settings.server.host, settings.server.port);

    let directory: Arc<dyn MemberDirectory> = Arc::new(PassKitDirectory::new(settings.passkit.clone())?);
    let service_context = Arc::new(ServiceContext::new(directory, &settings));

    if settings.webhook.secret.is_none() {
        tracing::warn!("No webhook secret configured; webhook deliveries are not authenticated");
    }

    let app = api::create_app(service_context, Arc::new(settings.clone()));

    let listener = tokio::net::TcpListener::bind(
        format!("{}:{}", settings.server.host, settings.server.port)
    ).await?;

    tracing::info!("Server listening on http://{}:{}", settings.server.host, settings.server.port);

    axum::serve(listener, app).await?;

    Ok(())
}
