use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    api::state::AppState,
    domain::{EnrollmentResult, EnrollmentStatus, Headcount, MemberStatus, Person},
    error::{AppError, Result},
};

#[derive(Debug, Deserialize)]
pub struct EnrollRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub display_name: Option<String>,
    pub membership_type: Option<String>,
    pub source: Option<String>,
    pub idempotency_token: Option<String>,
    pub salt: Option<String>,
}

impl From<EnrollRequest> for Person {
    fn from(request: EnrollRequest) -> Self {
        Person {
            given_name: request.first_name,
            family_name: request.last_name,
            display_name: request.display_name,
            email: request.email,
            phone: request.phone.filter(|p| !p.trim().is_empty()),
            membership_type: request.membership_type,
            provenance: request.source.unwrap_or_else(|| "manual".to_string()),
            idempotency_token: request.idempotency_token,
            salt: request.salt,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EnrollResponse {
    #[serde(flatten)]
    pub result: EnrollmentResult,
    pub message: String,
}

impl From<EnrollmentResult> for EnrollResponse {
    fn from(result: EnrollmentResult) -> Self {
        let message = match result.status {
            EnrollmentStatus::Created => "Member created; welcome email requested",
            EnrollmentStatus::AlreadyExisted => "Member already exists; no duplicate created",
        };
        Self {
            result,
            message: message.to_string(),
        }
    }
}

/// An enrollment error, reported together with the address it was for.
#[derive(Debug)]
pub struct EnrollmentErrorResponse {
    pub email: String,
    pub error: AppError,
}

impl IntoResponse for EnrollmentErrorResponse {
    fn into_response(self) -> Response {
        let (status, message) = self.error.status_and_message();
        (status, Json(json!({ "error": message, "email": self.email }))).into_response()
    }
}

pub(crate) fn enrollment_reply(result: EnrollmentResult) -> (StatusCode, Json<EnrollResponse>) {
    let status = if result.is_new() { StatusCode::CREATED } else { StatusCode::OK };
    (status, Json(result.into()))
}

pub async fn create(
    State(state): State<AppState>,
    Json(request): Json<EnrollRequest>,
) -> std::result::Result<(StatusCode, Json<EnrollResponse>), EnrollmentErrorResponse> {
    let person = Person::from(request);
    let email = person.email.clone();

    state
        .service_context
        .enrollment_service
        .enroll(person)
        .await
        .map(enrollment_reply)
        .map_err(|error| EnrollmentErrorResponse { email, error })
}

pub async fn headcount(State(state): State<AppState>) -> Result<Json<Headcount>> {
    let headcount = state
        .service_context
        .transition_service
        .headcount(&MemberStatus::CheckedIn)
        .await?;
    Ok(Json(headcount))
}
