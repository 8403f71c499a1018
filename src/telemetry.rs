use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the fmt subscriber. `RUST_LOG` overrides `default_filter`.
pub fn init(default_filter: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Settings for a binary: `.env` first, then layered config, then a check
/// that the membership-service credentials are present.
pub fn load_settings() -> anyhow::Result<crate::config::Settings> {
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }
    let settings = crate::config::Settings::new()?;
    settings.validate()?;
    Ok(settings)
}
