//! HTTP boundary: JSON in, base64 documents out.
//!
//! ```text
//! POST /        {"pdf_base64": "...", "ranges": [{"start": 1, "end": 3}, ...]}
//!           →   [{"base64": "..."}, ...]          one per valid range
//! GET  /health  {"status": "ok", "version": "..."}
//! ```
//!
//! Malformed requests are rejected with 400 before the pipeline runs.
//! A body or decoded document larger than `max_input_bytes` is 413.
//! Failures inside the pipeline, timeouts included, are 500 with the failure
//! text. Every error body is `{"error": "<message>"}`.

use crate::config::ServerConfig;
use crate::error::SplitError;
use crate::pipeline::{encode, input};
use crate::pipeline::range::PageRange;
use crate::process::Pipeline;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Headroom for the JSON envelope around the base64 payload.
const ENVELOPE_SLACK_BYTES: usize = 64 * 1024;

/// State shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

/// Build the router with all endpoints.
pub fn build_router(state: AppState) -> Router {
    let body_limit = encoded_body_limit(state.pipeline.config().max_input_bytes);

    Router::new()
        .route("/", post(split_handler))
        .route("/health", get(health_check))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Largest request body that can carry a document of `max_input_bytes`.
fn encoded_body_limit(max_input_bytes: usize) -> usize {
    max_input_bytes
        .saturating_add(2)
        .saturating_div(3)
        .saturating_mul(4)
        .saturating_add(ENVELOPE_SLACK_BYTES)
}

/// Serve `router` on an already bound listener until Ctrl-C.
pub async fn serve(listener: TcpListener, router: Router) -> Result<(), std::io::Error> {
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

/// Bind `config` and serve `pipeline` until Ctrl-C.
pub async fn run(config: ServerConfig, pipeline: Pipeline) -> Result<(), std::io::Error> {
    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", listener.local_addr()?);

    serve(listener, build_router(AppState::new(pipeline))).await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Could not install Ctrl-C handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// The request envelope, after structural validation.
#[derive(Debug)]
struct SplitRequest {
    pdf_base64: String,
    ranges: Vec<Value>,
}

impl SplitRequest {
    /// Pull the two fields out of an arbitrary JSON body.
    fn from_body(body: &[u8]) -> Result<Self, ApiError> {
        let payload = serde_json::from_slice::<Value>(body)
            .ok()
            .filter(|v| v.as_object().is_some_and(|o| !o.is_empty()))
            .ok_or_else(|| ApiError::BadRequest("No JSON payload provided".into()))?;

        let missing = || ApiError::BadRequest("Missing pdf_base64 or ranges".into());

        let pdf_base64 = match payload.get("pdf_base64") {
            None | Some(Value::Null) => return Err(missing()),
            Some(Value::String(s)) if s.is_empty() => return Err(missing()),
            Some(Value::String(s)) => s.clone(),
            Some(_) => return Err(ApiError::BadRequest("pdf_base64 must be a string".into())),
        };

        let ranges = match payload.get("ranges") {
            None | Some(Value::Null) => return Err(missing()),
            Some(Value::Array(a)) if a.is_empty() => return Err(missing()),
            Some(Value::Array(a)) => a.clone(),
            Some(_) => return Err(ApiError::BadRequest("ranges must be an array".into())),
        };

        Ok(Self { pdf_base64, ranges })
    }
}

#[derive(Debug, Serialize)]
struct EncodedDocument {
    base64: String,
}

async fn split_handler(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<Vec<EncodedDocument>>, ApiError> {
    let request = SplitRequest::from_body(&body?)?;

    let bytes = input::decode_base64(&request.pdf_base64)?;
    let ranges: Vec<PageRange> = request.ranges.iter().map(PageRange::from_json).collect();
    info!(
        "Split request: {} byte document, {} ranges",
        bytes.len(),
        ranges.len()
    );

    let pipeline = Arc::clone(&state.pipeline);
    let secs = pipeline.config().request_timeout_secs;
    let output = tokio::time::timeout(Duration::from_secs(secs), pipeline.run(bytes, &ranges))
        .await
        .map_err(|_| SplitError::Timeout { secs })??;

    let documents = output
        .parts
        .iter()
        .map(|part| EncodedDocument {
            base64: encode::encode_document(&part.document),
        })
        .collect();

    Ok(Json(documents))
}

/// Handler failure, rendered as `{"error": ...}` with a matching status.
#[derive(Debug)]
pub enum ApiError {
    /// The request is structurally invalid; the pipeline never ran.
    BadRequest(String),
    /// The body exceeded the configured size.
    PayloadTooLarge(String),
    /// The pipeline ran and failed.
    Split(SplitError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Split(SplitError::InvalidBase64(_)) => StatusCode::BAD_REQUEST,
            Self::Split(SplitError::InputTooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Split(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::BadRequest(msg) | Self::PayloadTooLarge(msg) => msg.clone(),
            Self::Split(e) => e.to_string(),
        }
    }
}

impl From<SplitError> for ApiError {
    fn from(e: SplitError) -> Self {
        Self::Split(e)
    }
}

impl From<BytesRejection> for ApiError {
    fn from(rejection: BytesRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge(rejection.body_text())
        } else {
            Self::BadRequest(rejection.body_text())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();
        if status.is_server_error() {
            warn!("Request failed: {}", message);
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}
