mod config;
mod rate_limit;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::{Json, Query, State};
use axum::http::{header, HeaderValue, Method, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use triage_core::{Category, EmailInput, RuleSet, TriageEngine};
use triage_observability::{AppMetrics, MetricsSnapshot};
use triage_service::{FeedbackInput, TriageService};
use triage_storage::Store;

pub use crate::config::ApiConfig;
use crate::rate_limit::ClientRateLimiter;

const MAX_SUBJECT_CHARS: usize = 1_000;
const MAX_BODY_CHARS: usize = 100_000;
const MAX_REQUEST_BYTES: usize = 2 * 1024 * 1024;
const DEFAULT_FEEDBACK_LIMIT: usize = 20;
const MAX_FEEDBACK_LIMIT: usize = 200;

#[derive(Clone)]
pub struct ApiState {
    pub service: Arc<TriageService<Store>>,
    pub metrics: Arc<AppMetrics>,
    pub api_key: Option<String>,
    pub limiter: ClientRateLimiter,
    pub max_bulk: usize,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp_utc: String,
    feedback_backend: &'static str,
    metrics: MetricsSnapshot,
}

#[derive(Debug, Serialize)]
struct LabelsResponse {
    labels: Vec<Category>,
}

#[derive(Debug, Deserialize)]
struct BulkRequest {
    emails: Vec<EmailInput>,
}

#[derive(Debug, Deserialize)]
struct FeedbackRequest {
    subject: String,
    body: String,
    predicted: String,
    correct: String,
}

#[derive(Debug, Deserialize)]
struct FeedbackListQuery {
    limit: Option<usize>,
}

pub async fn build_app(config: ApiConfig) -> Result<Router> {
    let metrics = AppMetrics::shared();

    let rules = match config.rules_path.as_ref() {
        Some(path) => RuleSet::from_json_file(path)
            .with_context(|| format!("failed loading rule set from {}", path.display()))?,
        None => RuleSet::default(),
    };
    let engine = Arc::new(TriageEngine::new(rules));

    let store = if let Some(database_url) = config.database_url.as_deref() {
        Store::sqlite(database_url).await?
    } else if let Some(path) = config.feedback_file.as_ref() {
        Store::jsonl(path)
    } else {
        Store::memory()
    };
    tracing::info!(backend = store.backend_name(), "feedback store ready");

    let service = Arc::new(TriageService::new(engine, Arc::new(store), metrics.clone()));

    let state = ApiState {
        service,
        metrics,
        api_key: config.api_key,
        limiter: ClientRateLimiter::new(config.rate_limit_window, config.rate_limit_max),
        max_bulk: config.max_bulk,
    };

    Ok(build_router(state))
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/labels", get(labels))
        .route("/classify", post(classify))
        .route("/bulk_classify", post(bulk_classify))
        .route("/feedback", post(feedback_submit))
        .route("/feedback/recent", get(feedback_recent))
        .layer(build_cors_layer())
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BYTES))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api_key_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .with_state(state)
}

async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let payload = HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp_utc: chrono::Utc::now().to_rfc3339(),
        feedback_backend: state.service.store().backend_name(),
        metrics: state.metrics.snapshot(),
    };
    (StatusCode::OK, Json(payload))
}

async fn labels(State(state): State<ApiState>) -> impl IntoResponse {
    let payload = LabelsResponse {
        labels: state.service.labels().to_vec(),
    };
    (StatusCode::OK, Json(payload))
}

async fn classify(State(state): State<ApiState>, Json(email): Json<EmailInput>) -> Response {
    state.metrics.inc_request();
    if let Err(rejection) = validate_email(&email) {
        state.metrics.inc_rejected();
        return rejection;
    }

    let result = state.service.classify(&email);
    (StatusCode::OK, Json(result)).into_response()
}

async fn bulk_classify(State(state): State<ApiState>, Json(bulk): Json<BulkRequest>) -> Response {
    state.metrics.inc_request();
    if bulk.emails.len() > state.max_bulk {
        state.metrics.inc_rejected();
        return error_response(
            StatusCode::BAD_REQUEST,
            "bulk_too_large",
            format!("at most {} emails per request", state.max_bulk),
        );
    }
    for email in &bulk.emails {
        if let Err(rejection) = validate_email(email) {
            state.metrics.inc_rejected();
            return rejection;
        }
    }

    let results = state.service.bulk_classify(&bulk.emails);
    (StatusCode::OK, Json(results)).into_response()
}

async fn feedback_submit(
    State(state): State<ApiState>,
    Json(input): Json<FeedbackRequest>,
) -> Response {
    state.metrics.inc_request();

    let (Some(predicted), Some(correct)) = (
        Category::parse(&input.predicted),
        Category::parse(&input.correct),
    ) else {
        state.metrics.inc_rejected();
        return error_response(
            StatusCode::BAD_REQUEST,
            "invalid_label",
            "predicted and correct must be one of the labels listed at /labels",
        );
    };

    let email = EmailInput::new(input.subject, input.body);
    if let Err(rejection) = validate_email(&email) {
        state.metrics.inc_rejected();
        return rejection;
    }

    match state
        .service
        .record_feedback(FeedbackInput {
            subject: email.subject,
            body: email.body,
            predicted,
            correct,
        })
        .await
    {
        Ok(record) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "ok": true,
                "feedback": record
            })),
        )
            .into_response(),
        Err(error) => {
            tracing::error!(error = %format!("{error:#}"), "feedback write failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "feedback_write_failed",
                "feedback could not be stored",
            )
        }
    }
}

async fn feedback_recent(
    State(state): State<ApiState>,
    Query(query): Query<FeedbackListQuery>,
) -> Response {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_FEEDBACK_LIMIT)
        .clamp(1, MAX_FEEDBACK_LIMIT);

    match state.service.recent_feedback(limit).await {
        Ok(items) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "count": items.len(),
                "items": items
            })),
        )
            .into_response(),
        Err(error) => {
            tracing::error!(error = %format!("{error:#}"), "feedback read failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "feedback_read_failed",
                "feedback could not be loaded",
            )
        }
    }
}

fn validate_email(email: &EmailInput) -> Result<(), Response> {
    if email.subject.chars().count() > MAX_SUBJECT_CHARS {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "payload_too_large",
            format!("subject is limited to {MAX_SUBJECT_CHARS} characters"),
        ));
    }
    if email.body.chars().count() > MAX_BODY_CHARS {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "payload_too_large",
            format!("body is limited to {MAX_BODY_CHARS} characters"),
        ));
    }
    Ok(())
}

fn error_response(status: StatusCode, error: &str, message: impl Into<String>) -> Response {
    (
        status,
        Json(serde_json::json!({
            "error": error,
            "message": message.into()
        })),
    )
        .into_response()
}

fn is_public_endpoint(path: &str) -> bool {
    matches!(path, "/health" | "/labels")
}

fn build_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::HeaderName::from_static("x-api-key"),
        ])
}

async fn api_key_middleware(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(expected) = state.api_key.as_deref() else {
        return next.run(request).await;
    };
    if request.method() == Method::OPTIONS || is_public_endpoint(request.uri().path()) {
        return next.run(request).await;
    }

    let header_key = request
        .headers()
        .get("x-api-key")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if header_key != expected {
        return error_response(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "missing or invalid x-api-key",
        );
    }

    next.run(request).await
}

async fn rate_limit_middleware(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS || is_public_endpoint(request.uri().path()) {
        return next.run(request).await;
    }

    let client = request_client(&request);
    if !state.limiter.allow(&client) {
        tracing::warn!(client = %client, "rate limit exceeded");
        return error_response(
            StatusCode::TOO_MANY_REQUESTS,
            "rate_limited",
            "rate limit exceeded for this client",
        );
    }

    next.run(request).await
}

fn request_client(request: &Request<Body>) -> String {
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "local".to_string())
}

async fn security_headers_middleware(request: Request<Body>, next: Next) -> Response {
    let mut response = next.run(request).await;

    response.headers_mut().insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    response.headers_mut().insert(
        header::HeaderName::from_static("x-frame-options"),
        HeaderValue::from_static("DENY"),
    );
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store"),
    );

    response
}
