use serde::Deserialize;
use config::{Config, ConfigError, Environment, File};

use crate::error::{AppError, Result};

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub passkit: PassKitConfig,
    #[serde(default)]
    pub enrollment: EnrollmentConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Connection settings for the membership service.
#[derive(Debug, Deserialize, Clone)]
pub struct PassKitConfig {
    pub api_base: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub project_key: String,
    #[serde(default)]
    pub program_id: String,
    pub tier_id: String,
    pub timeout_secs: u64,
    /// How many of the most recent members an email lookup scans when the
    /// server-side filter comes back empty.
    pub lookup_page_size: u32,
    pub list_page_size: u32,
    pub pass_url_base: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EnrollmentConfig {
    pub default_next_match: String,
    pub default_membership_type: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct WebhookConfig {
    pub secret: Option<String>,
}

impl Settings {
    pub fn new() -> std::result::Result<Self, ConfigError> {
        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("passkit.api_base", "https://api.pub2.passkit.io")?
            .set_default("passkit.tier_id", "base")?
            .set_default("passkit.timeout_secs", 30)?
            .set_default("passkit.lookup_page_size", 1000)?
            .set_default("passkit.list_page_size", 1000)?
            .set_default("passkit.pass_url_base", "https://pub2.passkit.io/pass")?
            .set_default("enrollment.default_next_match", "TBD")?
            .set_default("enrollment.default_membership_type", "Standard")?

            // Add config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))

            // Add environment variables (with CLUBPASS__ prefix, double underscore separates levels)
            .add_source(Environment::with_prefix("CLUBPASS").separator("__"))

            .build()?;

        config.try_deserialize()
    }

    /// Refuse to start without the credentials every remote call needs.
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.passkit.api_key.is_empty() {
            missing.push("passkit.api_key");
        }
        if self.passkit.project_key.is_empty() {
            missing.push("passkit.project_key");
        }
        if self.passkit.program_id.is_empty() {
            missing.push("passkit.program_id");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::Config(format!("missing required settings: {}", missing.join(", "))))
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            passkit: PassKitConfig::default(),
            enrollment: EnrollmentConfig::default(),
            webhook: WebhookConfig::default(),
        }
    }
}

impl Default for PassKitConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.pub2.passkit.io".to_string(),
            api_key: String::new(),
            project_key: String::new(),
            program_id: String::new(),
            tier_id: "base".to_string(),
            timeout_secs: 30,
            lookup_page_size: 1000,
            list_page_size: 1000,
            pass_url_base: "https://pub2.passkit.io/pass".to_string(),
        }
    }
}

impl Default for EnrollmentConfig {
    fn default() -> Self {
        Self {
            default_next_match: "TBD".to_string(),
            default_membership_type: "Standard".to_string(),
        }
    }
}
