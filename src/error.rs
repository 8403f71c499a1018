use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    /// The membership service answered with a non-2xx status. `message` is
    /// the response body, kept verbatim.
    #[error("Remote rejected request ({status}): {message}")]
    RemoteRejected { status: u16, message: String },

    #[error("Remote unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        AppError::RemoteRejected {
            status,
            message: message.into(),
        }
    }

    /// Whether a rejection from the membership service means the record we
    /// tried to create is already there.
    pub fn is_email_conflict(&self) -> bool {
        let AppError::RemoteRejected { status, message } = self else {
            return false;
        };
        if *status == 409 {
            return true;
        }

        let msg = message.to_lowercase();
        if msg.contains("already exists") {
            return true;
        }
        let mentions_identity = msg.contains("email") || msg.contains("externalid");
        mentions_identity && (msg.contains("duplicate") || msg.contains("conflict"))
    }

    /// HTTP status and client-facing message. Server-side failures are
    /// logged here and their detail withheld.
    pub fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::RemoteRejected { status, message } => {
                tracing::error!("Membership service rejected request ({}): {}", status, message);
                (StatusCode::BAD_GATEWAY, message.clone())
            }
            AppError::RemoteUnavailable(msg) => {
                tracing::error!("Membership service unavailable: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, msg.clone())
            }
            AppError::MalformedRecord(msg) => {
                tracing::error!("Malformed record: {}", msg);
                (StatusCode::BAD_GATEWAY, msg.clone())
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            AppError::Config(msg) => {
                tracing::error!("Configuration error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = self.status_and_message();

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AppError::MalformedRecord(err.to_string())
        } else {
            AppError::RemoteUnavailable(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::MalformedRecord(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}
