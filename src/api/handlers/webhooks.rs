use axum::{
    extract::State,
    http::StatusCode,
    Json,
};

use crate::{
    api::{
        handlers::members::{enrollment_reply, EnrollResponse, EnrollmentErrorResponse},
        state::AppState,
    },
    domain::{BatchEnrollmentSummary, FormSubmission, OrderSubmission},
    error::{AppError, Result},
};

pub async fn form(
    State(state): State<AppState>,
    Json(submission): Json<FormSubmission>,
) -> std::result::Result<(StatusCode, Json<EnrollResponse>), EnrollmentErrorResponse> {
    tracing::info!(
        "Received form submission: {}",
        submission.form_name.as_deref().unwrap_or("Unknown Form")
    );

    let person = submission.into_person();
    let email = person.email.clone();
    if email.trim().is_empty() {
        return Err(EnrollmentErrorResponse {
            email,
            error: AppError::BadRequest("No email address provided".to_string()),
        });
    }

    state
        .service_context
        .enrollment_service
        .enroll(person)
        .await
        .map(enrollment_reply)
        .map_err(|error| EnrollmentErrorResponse { email, error })
}

pub async fn order(
    State(state): State<AppState>,
    Json(order): Json<OrderSubmission>,
) -> Result<Json<BatchEnrollmentSummary>> {
    if order.members.is_empty() {
        return Err(AppError::BadRequest("Order contains no memberships".to_string()));
    }
    tracing::info!(
        "Received order {} with {} memberships",
        order.transaction_id,
        order.members.len()
    );

    let summary = state
        .service_context
        .enrollment_service
        .enroll_batch(order.into_people())
        .await;
    Ok(Json(summary))
}
