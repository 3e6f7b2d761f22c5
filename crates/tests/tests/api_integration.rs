use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use triage_api::{build_app, ApiConfig};

async fn app() -> Router {
    build_app(ApiConfig::default())
        .await
        .expect("app should build")
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn read_json(response: axum::response::Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let response = app()
        .await
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let parsed = read_json(response).await;
    assert_eq!(parsed["status"], "ok");
    assert_eq!(parsed["feedback_backend"], "memory");
}

#[tokio::test]
async fn labels_are_listed_in_tie_break_order() {
    let response = app()
        .await
        .oneshot(Request::builder().uri("/labels").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let parsed = read_json(response).await;
    let labels = parsed["labels"].as_array().unwrap();
    assert_eq!(labels.len(), 9);
    assert_eq!(labels[0], "Urgent");
    assert_eq!(labels[1], "Finance/Invoice");
    assert_eq!(labels[8], "Spam");
}

#[tokio::test]
async fn classify_routes_production_incident() {
    let response = app()
        .await
        .oneshot(post_json(
            "/classify",
            json!({
                "subject": "URGENT: prod down",
                "body": "sev1 issue, need help asap"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let parsed = read_json(response).await;
    assert_eq!(parsed["label"], "Urgent");
    assert_eq!(parsed["priority"], 5);
    assert_eq!(parsed["routed_queue"], "#incidents");
    assert_eq!(parsed["sla_hours"], 4);
    assert_eq!(parsed["extracted"]["declared_priority"], "sev1");
    assert_eq!(parsed["alt_labels"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn classify_accepts_missing_fields() {
    let response = app()
        .await
        .oneshot(post_json("/classify", json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let parsed = read_json(response).await;
    assert_eq!(parsed["label"], "Urgent");
    assert_eq!(parsed["confidence"], 0.1111);
    assert_eq!(parsed["extracted"], json!({}));
}

#[tokio::test]
async fn classify_rejects_oversized_subject() {
    let response = app()
        .await
        .oneshot(post_json(
            "/classify",
            json!({ "subject": "x".repeat(1_001), "body": "" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let parsed = read_json(response).await;
    assert_eq!(parsed["error"], "payload_too_large");
}

#[tokio::test]
async fn bulk_classify_keeps_order() {
    let response = app()
        .await
        .oneshot(post_json(
            "/bulk_classify",
            json!({
                "emails": [
                    { "subject": "Invoice INV-9981", "body": "Please pay $500.00, PO: PO-4471, net 30" },
                    { "subject": "Free crypto", "body": "winner! claim now" }
                ]
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let parsed = read_json(response).await;
    assert_eq!(parsed["count"], 2);
    assert_eq!(parsed["results"][0]["label"], "Finance/Invoice");
    assert_eq!(parsed["results"][0]["extracted"]["po_number"], "PO-4471");
    assert_eq!(
        parsed["results"][0]["suggested_actions"][0],
        "Create AP entry and start 2-way match"
    );
    assert_eq!(parsed["results"][1]["label"], "Spam");
    assert_eq!(parsed["results"][1]["routed_queue"], "(junk)");
}

#[tokio::test]
async fn bulk_classify_enforces_batch_limit() {
    let app = build_app(ApiConfig {
        max_bulk: 1,
        ..ApiConfig::default()
    })
    .await
    .unwrap();

    let response = app
        .oneshot(post_json(
            "/bulk_classify",
            json!({ "emails": [{ "subject": "a" }, { "subject": "b" }] }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let parsed = read_json(response).await;
    assert_eq!(parsed["error"], "bulk_too_large");
}

#[tokio::test]
async fn feedback_is_recorded_and_listed() {
    let app = app().await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/feedback",
            json!({
                "subject": "Lunch?",
                "body": "team lunch friday",
                "predicted": "Personal",
                "correct": "HR/Recruiting"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let parsed = read_json(response).await;
    assert_eq!(parsed["ok"], true);
    assert_eq!(parsed["feedback"]["correct"], "HR/Recruiting");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/feedback/recent?limit=5")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let parsed = read_json(response).await;
    assert_eq!(parsed["count"], 1);
    assert_eq!(parsed["items"][0]["predicted"], "Personal");
}

#[tokio::test]
async fn feedback_rejects_unknown_labels() {
    let response = app()
        .await
        .oneshot(post_json(
            "/feedback",
            json!({
                "subject": "s",
                "body": "b",
                "predicted": "Billing",
                "correct": "Spam"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let parsed = read_json(response).await;
    assert_eq!(parsed["error"], "invalid_label");
}

#[tokio::test]
async fn feedback_appends_to_jsonl_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("feedback.jsonl");
    let app = build_app(ApiConfig {
        feedback_file: Some(path.clone()),
        ..ApiConfig::default()
    })
    .await
    .unwrap();

    for correct in ["Support", "Spam"] {
        let response = app
            .clone()
            .oneshot(post_json(
                "/feedback",
                json!({
                    "subject": "s",
                    "body": "b",
                    "predicted": "Urgent",
                    "correct": correct
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let raw = std::fs::read_to_string(&path).unwrap();
    assert_eq!(raw.lines().count(), 2);
}

#[tokio::test]
async fn api_key_guards_classification_but_not_health() {
    let app = build_app(ApiConfig {
        api_key: Some("secret".to_string()),
        ..ApiConfig::default()
    })
    .await
    .unwrap();

    let denied = app
        .clone()
        .oneshot(post_json("/classify", json!({ "subject": "hi" })))
        .await
        .unwrap();
    assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);

    let mut request = post_json("/classify", json!({ "subject": "hi" }));
    request
        .headers_mut()
        .insert("x-api-key", "secret".parse().unwrap());
    let allowed = app.clone().oneshot(request).await.unwrap();
    assert_eq!(allowed.status(), StatusCode::OK);

    let health = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(health.status(), StatusCode::OK);
}

#[tokio::test]
async fn rate_limit_applies_per_client() {
    let app = build_app(ApiConfig {
        rate_limit_window: Duration::from_secs(60),
        rate_limit_max: 1,
        ..ApiConfig::default()
    })
    .await
    .unwrap();

    let first = app
        .clone()
        .oneshot(post_json("/classify", json!({ "subject": "one" })))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .oneshot(post_json("/classify", json!({ "subject": "two" })))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
}
