use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use clubpass::{
    api::create_app,
    config::Settings,
    directory::InMemoryDirectory,
    domain::{MemberStatus, Person},
    service::ServiceContext,
};
use serde_json::{json, Value};
use tower::ServiceExt;

fn app_with(directory: Arc<InMemoryDirectory>, secret: Option<&str>) -> Router {
    let mut settings = Settings::default();
    settings.webhook.secret = secret.map(str::to_string);
    let service_context = Arc::new(ServiceContext::new(directory, &settings));
    create_app(service_context, Arc::new(settings))
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> anyhow::Result<Value> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[tokio::test]
async fn test_health_check() -> anyhow::Result<()> {
    let app = app_with(Arc::new(InMemoryDirectory::new()), None);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await?["status"], "healthy");
    Ok(())
}

#[tokio::test]
async fn test_manual_enrollment_is_idempotent() -> anyhow::Result<()> {
    let directory = Arc::new(InMemoryDirectory::new());
    let app = app_with(directory.clone(), None);
    let request = json!({
        "first_name": "Jamie",
        "last_name": "Laughlin",
        "email": "jamielaughlin@live.co.uk",
        "salt": "2025-season"
    });

    let response = app.clone().oneshot(post_json("/api/members", request.clone())).await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let first = json_body(response).await?;
    assert_eq!(first["status"], "created");

    let response = app.oneshot(post_json("/api/members", request)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let second = json_body(response).await?;
    assert_eq!(second["status"], "already_existed");
    assert_eq!(second["member_id"], first["member_id"]);

    assert_eq!(directory.create_calls().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_invalid_enrollment_reports_email() -> anyhow::Result<()> {
    let app = app_with(Arc::new(InMemoryDirectory::new()), None);

    let response = app
        .oneshot(post_json(
            "/api/members",
            json!({"first_name": "No", "last_name": "Email", "email": "nope"}),
        ))
        .await?;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json_body(response).await?["email"], "nope");
    Ok(())
}

#[tokio::test]
async fn test_webhook_requires_secret() -> anyhow::Result<()> {
    let directory = Arc::new(InMemoryDirectory::new());
    let app = app_with(directory.clone(), Some("hook-secret"));
    let form = json!({
        "formName": "Membership",
        "data": {"firstName": "Jo", "lastName": "Park", "email": "jo@example.com"}
    });

    let response = app.clone().oneshot(post_json("/webhook/form", form.clone())).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let mut wrong = post_json("/webhook/form", form.clone());
    wrong.headers_mut().insert("x-webhook-secret", "guess".parse()?);
    let response = app.clone().oneshot(wrong).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(directory.create_calls().is_empty());

    let mut signed = post_json("/webhook/form", form);
    signed.headers_mut().insert("x-webhook-secret", "hook-secret".parse()?);
    let response = app.oneshot(signed).await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(directory.create_calls().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_order_webhook_returns_summary() -> anyhow::Result<()> {
    let directory = Arc::new(InMemoryDirectory::new());
    let app = app_with(directory.clone(), None);

    let response = app
        .oneshot(post_json(
            "/webhook/order",
            json!({
                "transactionId": "T-2002",
                "members": [
                    {"firstName": "Jo", "lastName": "Park", "email": "jo@example.com"},
                    {"firstName": "Ali", "lastName": "Khan", "email": "ali@example.com"}
                ]
            }),
        ))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let summary = json_body(response).await?;
    assert_eq!(summary["created"], 2);
    assert_eq!(summary["already_existed"], 0);
    assert_eq!(directory.members().len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_checkout_and_headcount() -> anyhow::Result<()> {
    let directory = Arc::new(InMemoryDirectory::new());
    directory.seed(
        &Person::new("Ava", "One", "ava@example.com", "manual"),
        MemberStatus::CheckedIn,
    );
    directory.seed(
        &Person::new("Ben", "Two", "ben@example.com", "manual"),
        MemberStatus::CheckedIn,
    );
    let app = app_with(directory.clone(), None);

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/api/headcount").body(Body::empty())?)
        .await?;
    assert_eq!(json_body(response).await?["count"], 2);

    let response = app.clone().oneshot(post_json("/api/checkout", json!({}))).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let report = json_body(response).await?;
    assert_eq!(report["total"], 2);
    assert_eq!(report["succeeded"], 2);
    assert_eq!(report["source"], "CHECKED_IN");
    assert_eq!(report["target"], "CHECKED_OUT");

    let response = app
        .oneshot(Request::builder().uri("/api/headcount").body(Body::empty())?)
        .await?;
    assert_eq!(json_body(response).await?["count"], 0);
    Ok(())
}

#[tokio::test]
async fn test_match_update_requires_display() -> anyhow::Result<()> {
    let app = app_with(Arc::new(InMemoryDirectory::new()), None);

    let response = app
        .oneshot(post_json("/api/match", json!({"display": "   "})))
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}
