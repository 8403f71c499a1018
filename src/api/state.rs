use std::sync::Arc;

use crate::{config::Settings, service::ServiceContext};

#[derive(Clone)]
pub struct AppState {
    pub service_context: Arc<ServiceContext>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(service_context: Arc<ServiceContext>, settings: Arc<Settings>) -> Self {
        Self { service_context, settings }
    }

    /// Shared secret webhook deliveries must carry, if one is configured.
    pub fn webhook_secret(&self) -> Option<&str> {
        self.settings
            .webhook
            .secret
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}
