//! HTTP API over the submission pipeline
//!
//! | Route               | Purpose                                   |
//! |---------------------|-------------------------------------------|
//! | `POST /submit`      | validate and store `{ step, data }`       |
//! | `GET /submissions`  | list records, needs `x-admin-key`         |
//! | `GET /schema`       | the schema the server validates against   |
//! | `GET /health`       | liveness                                  |

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use miette::Diagnostic;
use serde_json::{json, Value};
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::core::client::ADMIN_KEY_HEADER;
use crate::core::pipeline::{SubmissionPipeline, SubmitError};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<SubmissionPipeline>,
}

/// Errors starting or running the server
#[derive(Debug, Error, Diagnostic)]
pub enum ServerError {
    #[error("could not bind {addr}: {message}")]
    #[diagnostic(code(udyam::server::bind), help("pick another address with --bind or PORT"))]
    Bind { addr: String, message: String },

    #[error("server error: {0}")]
    #[diagnostic(code(udyam::server::io))]
    Io(String),
}

/// Build the router
pub fn router(pipeline: Arc<SubmissionPipeline>) -> Router {
    let state = AppState { pipeline };

    Router::new()
        .route("/health", get(health))
        .route("/schema", get(schema))
        .route("/submit", post(submit))
        .route("/submissions", get(list_submissions))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Listen on `addr` until Ctrl-C
pub async fn serve(addr: &str, pipeline: Arc<SubmissionPipeline>) -> Result<(), ServerError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Bind {
            addr: addr.to_string(),
            message: e.to_string(),
        })?;

    let local = listener
        .local_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| addr.to_string());
    tracing::info!(
        addr = %local,
        steps = pipeline.schema().step_count(),
        admin = pipeline.has_admin_key(),
        "API listening"
    );
    if !pipeline.has_admin_key() {
        tracing::warn!("no admin key configured, GET /submissions will refuse every request");
    }

    axum::serve(listener, router(pipeline))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ServerError::Io(e.to_string()))?;

    tracing::info!("API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "could not listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn schema(State(state): State<AppState>) -> Json<Value> {
    Json(serde_json::to_value(state.pipeline.schema().as_ref()).unwrap_or(Value::Null))
}

async fn submit(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => {
            tracing::debug!(error = %rejection.body_text(), "unreadable submit body");
            return ApiError(SubmitError::MalformedRequest(rejection.body_text())).into_response();
        }
    };

    let pipeline = state.pipeline.clone();
    match tokio::task::spawn_blocking(move || pipeline.submit_request(&body)).await {
        Ok(Ok(id)) => Json(json!({ "ok": true, "id": id })).into_response(),
        Ok(Err(e)) => ApiError(e).into_response(),
        Err(e) => internal(e),
    }
}

async fn list_submissions(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let credential = headers
        .get(ADMIN_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let pipeline = state.pipeline.clone();
    match tokio::task::spawn_blocking(move || pipeline.list(credential.as_deref())).await {
        Ok(Ok(records)) => Json(records).into_response(),
        Ok(Err(e)) => ApiError(e).into_response(),
        Err(e) => internal(e),
    }
}

fn internal(e: tokio::task::JoinError) -> Response {
    tracing::error!(error = %e, "request task failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "internal error" })),
    )
        .into_response()
}

/// Wire rendering of [`SubmitError`]
struct ApiError(SubmitError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self.0 {
            SubmitError::MalformedRequest(reason) => {
                (StatusCode::BAD_REQUEST, json!({ "error": reason }))
            }
            SubmitError::ValidationFailed(errors) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": self.0.to_string(), "details": errors.to_details() }),
            ),
            SubmitError::AuthorizationFailed => {
                (StatusCode::FORBIDDEN, json!({ "error": self.0.to_string() }))
            }
            SubmitError::TransportFailed(reason) => {
                (StatusCode::SERVICE_UNAVAILABLE, json!({ "error": reason }))
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pipeline::Submitter;
    use crate::core::sink::{MemorySink, RecordSink, SinkError, Submission};
    use crate::core::RemoteClient;
    use crate::schema::fixtures::sample_schema;
    use crate::schema::FormData;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    struct BrokenSink;

    impl RecordSink for BrokenSink {
        fn create(&self, _step: u32, _data: &FormData) -> Result<Submission, SinkError> {
            Err(SinkError::Unavailable("database is locked".to_string()))
        }

        fn list(&self) -> Result<Vec<Submission>, SinkError> {
            Ok(Vec::new())
        }
    }

    fn app() -> Router {
        let pipeline = SubmissionPipeline::new(Arc::new(sample_schema()), Box::new(MemorySink::new()))
            .with_admin_key(Some("admin".to_string()));
        router(Arc::new(pipeline))
    }

    fn post_submit(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/submit")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_submissions(key: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/submissions");
        if let Some(key) = key {
            builder = builder.header(ADMIN_KEY_HEADER, key);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    const STEP_ONE: &str =
        r#"{"step": 1, "data": {"aadhaarNumber": "123412341234", "applicantName": "Asha"}}"#;

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"OK");
    }

    #[tokio::test]
    async fn test_schema_endpoint() {
        let response = app()
            .oneshot(Request::builder().uri("/schema").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["steps"].as_array().unwrap().len(), 2);
        assert!(body["scrapedAt"].is_string());
    }

    #[tokio::test]
    async fn test_submit_success() {
        let response = app().oneshot(post_submit(STEP_ONE)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["ok"], json!(true));
        assert!(body["id"].as_str().unwrap().starts_with("SUB-"));
    }

    #[tokio::test]
    async fn test_submit_validation_failure() {
        let response = app()
            .oneshot(post_submit(
                r#"{"step": 2, "data": {"panNumber": "abcde1234f", "terms": false, "businessType": "service"}}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = json_body(response).await;
        assert_eq!(body["error"], json!("Validation failed"));
        assert_eq!(body["details"]["panNumber"], json!(["Invalid PAN"]));
        assert_eq!(body["details"]["terms"], json!(["Terms must be checked"]));
    }

    #[tokio::test]
    async fn test_submit_missing_fields() {
        for bad in [r#"{"data": {}}"#, r#"{"step": 1}"#, r#"{"step": 0, "data": {}}"#] {
            let response = app().oneshot(post_submit(bad)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(json_body(response).await, json!({"error": "step & data required"}));
        }
    }

    #[tokio::test]
    async fn test_submit_unknown_step() {
        let response = app()
            .oneshot(post_submit(r#"{"step": 9, "data": {}}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], json!("unknown step 9"));
    }

    #[tokio::test]
    async fn test_submit_invalid_json() {
        let response = app().oneshot(post_submit("{not json")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_sink_failure_is_503() {
        let pipeline = SubmissionPipeline::new(Arc::new(sample_schema()), Box::new(BrokenSink));
        let response = router(Arc::new(pipeline))
            .oneshot(post_submit(STEP_ONE))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().contains("database is locked"));
    }

    #[tokio::test]
    async fn test_submissions_require_admin_key() {
        let app = app();
        app.clone().oneshot(post_submit(STEP_ONE)).await.unwrap();

        for key in [None, Some("wrong")] {
            let response = app.clone().oneshot(get_submissions(key)).await.unwrap();
            assert_eq!(response.status(), StatusCode::FORBIDDEN);
            assert_eq!(json_body(response).await, json!({"error": "Forbidden"}));
        }

        let response = app.oneshot(get_submissions(Some("admin"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["step"], json!(1));
        assert!(body[0]["createdAt"].is_string());
    }

    #[tokio::test]
    async fn test_submissions_most_recent_first() {
        let app = app();
        let mut ids = Vec::new();
        for _ in 0..3 {
            let response = app.clone().oneshot(post_submit(STEP_ONE)).await.unwrap();
            ids.push(json_body(response).await["id"].clone());
        }

        let body = json_body(app.oneshot(get_submissions(Some("admin"))).await.unwrap()).await;
        let listed: Vec<Value> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["id"].clone())
            .collect();
        ids.reverse();
        assert_eq!(listed, ids);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_remote_client_round_trip() {
        let pipeline = SubmissionPipeline::new(Arc::new(sample_schema()), Box::new(MemorySink::new()))
            .with_admin_key(Some("admin".to_string()));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, router(Arc::new(pipeline))).await.unwrap();
        });

        let outcome = tokio::task::spawn_blocking(move || {
            let client = RemoteClient::new(&base);
            let schema = client.schema().unwrap();
            let good: FormData = serde_json::from_str(
                r#"{"aadhaarNumber": "123412341234", "applicantName": "Asha"}"#,
            )
            .unwrap();
            let id = client.submit(1, &good).unwrap();
            let invalid = client.submit(1, &FormData::new()).unwrap_err();
            let forbidden = client.list(Some("nope")).unwrap_err();
            let listed = client.list(Some("admin")).unwrap();
            (schema, id, invalid, forbidden, listed)
        })
        .await
        .unwrap();

        let (schema, id, invalid, forbidden, listed) = outcome;
        assert_eq!(schema, sample_schema());
        assert_eq!(invalid.field_errors().unwrap().len(), 2);
        assert_eq!(forbidden, SubmitError::AuthorizationFailed);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, id);
    }
}
