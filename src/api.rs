//! HTTP surface for the parsing gateway.
//!
//! This module exposes a compact Axum router:
//!
//! - `GET /` – Static service banner.
//! - `GET /health` – Liveness probe, never touches the converter.
//! - `GET /metrics` – Parse counters.
//! - `POST /parse` – Multipart upload (`file` field) of a PDF, JPEG, or PNG.
//! - `POST /parse-base64` – JSON `{ "content": "<base64>", "filename": "invoice.pdf" }`.
//!
//! Both parse endpoints answer with the same envelope. Conversion problems are reported in-band
//! with HTTP 200; only a rejected upload type or an unreadable multipart body yields HTTP 400.

use crate::config::Config;
use crate::format::{DEFAULT_FILENAME, resolve_upload};
use crate::metrics::MetricsSnapshot;
use crate::parsing::{ParseError, ParseRequest, ParseResponse, ParsingApi};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartError},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::Instrument;
use uuid::Uuid;

/// Name reported by `GET /`.
pub const SERVICE_NAME: &str = "Document Parsing Gateway";

/// Multipart field that carries the uploaded document.
const UPLOAD_FIELD: &str = "file";

/// Transport settings applied around the routes.
#[derive(Debug, Clone)]
pub struct RouterOptions {
    /// Origins allowed by CORS.
    pub cors_origins: Vec<String>,
    /// Request body limit; `None` disables the limit.
    pub max_upload_bytes: Option<usize>,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl RouterOptions {
    /// Derive router settings from runtime configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            cors_origins: config.cors_origins.clone(),
            max_upload_bytes: config.max_upload_bytes,
        }
    }
}

/// Build the HTTP router exposing the parsing API surface.
pub fn create_router<S>(service: Arc<S>, options: &RouterOptions) -> Router
where
    S: ParsingApi + 'static,
{
    let body_limit = match options.max_upload_bytes {
        Some(limit) => DefaultBodyLimit::max(limit),
        None => DefaultBodyLimit::disable(),
    };

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/metrics", get(get_metrics::<S>))
        .route("/parse", post(parse_upload::<S>))
        .route("/parse-base64", post(parse_base64::<S>))
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&options.cors_origins))
        .with_state(service)
}

/// CORS for browser front-ends: listed origins, any method and header, credentials allowed.
///
/// Wildcard methods/headers cannot be combined with credentials, so the request's own
/// preflight values are mirrored back instead. A `*` entry likewise mirrors the caller's origin.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|origin| origin == "*") {
        AllowOrigin::mirror_request()
    } else {
        AllowOrigin::list(parse_origins(origins))
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

fn parse_origins(origins: &[String]) -> Vec<HeaderValue> {
    origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect()
}

async fn root() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": SERVICE_NAME }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Return a snapshot of parse counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: ParsingApi,
{
    Json(service.metrics_snapshot())
}

/// Parse an uploaded PDF or image.
///
/// The declared part content type is checked against the allow-list, with the filename
/// extension as fallback. Rejected types never reach the converter.
async fn parse_upload<S>(
    State(service): State<Arc<S>>,
    mut multipart: Multipart,
) -> Result<Json<ParseResponse>, ApiError>
where
    S: ParsingApi,
{
    let request_id = Uuid::new_v4();

    while let Some(field) = multipart.next_field().await.map_err(ApiError::from)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let content_type = field.content_type().map(str::to_string);
        let filename = field.file_name().map(str::to_string);
        let format = resolve_upload(content_type.as_deref(), filename.as_deref()).map_err(
            |err| {
                tracing::warn!(
                    %request_id,
                    content_type = ?content_type,
                    filename = ?filename,
                    "Rejected upload"
                );
                service.record_rejection();
                ApiError::bad_request(err.to_string())
            },
        )?;
        let bytes = field.bytes().await.map_err(ApiError::from)?;

        let span = tracing::info_span!(
            "parse",
            %request_id,
            endpoint = "/parse",
            format = format.format.as_str()
        );
        let result = service
            .parse(ParseRequest::new(Vec::from(bytes), format))
            .instrument(span.clone())
            .await;
        return Ok(Json(respond(result, &span)));
    }

    Err(ApiError::bad_request(format!(
        "Missing '{UPLOAD_FIELD}' field in multipart upload"
    )))
}

/// Fields of a `POST /parse-base64` body.
///
/// The body is read as raw bytes so that a missing content type, invalid JSON, or a field of the
/// wrong type is reported in the envelope instead of as an extractor rejection.
#[derive(Debug, PartialEq)]
struct Base64Body {
    /// Base64-encoded document bytes; empty when absent.
    content: String,
    /// Filename used to infer the document type.
    filename: String,
}

impl Base64Body {
    fn from_slice(body: &[u8]) -> Result<Self, ParseError> {
        let value: Value = serde_json::from_slice(body).map_err(|err| {
            ParseError::MalformedRequest(format!("expected a JSON object: {err}"))
        })?;
        let Value::Object(mut fields) = value else {
            return Err(ParseError::MalformedRequest(
                "expected a JSON object".to_string(),
            ));
        };

        let content = string_field(fields.remove("content"), "content")?.unwrap_or_default();
        let filename = string_field(fields.remove("filename"), "filename")?
            .unwrap_or_else(|| DEFAULT_FILENAME.to_string());
        Ok(Self { content, filename })
    }
}

/// `null` and absent fields read as `None`; any non-string value is rejected.
fn string_field(value: Option<Value>, name: &str) -> Result<Option<String>, ParseError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text)),
        Some(other) => Err(ParseError::MalformedRequest(format!(
            "'{name}' must be a string, got {}",
            json_type(&other)
        ))),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Parse a base64-encoded document. Every failure, malformed bodies included, is reported
/// in-band.
async fn parse_base64<S>(State(service): State<Arc<S>>, body: Bytes) -> Json<ParseResponse>
where
    S: ParsingApi,
{
    let span = tracing::info_span!(
        "parse",
        request_id = %Uuid::new_v4(),
        endpoint = "/parse-base64",
        filename = tracing::field::Empty
    );

    let prepared = Base64Body::from_slice(&body).and_then(|payload| {
        span.record("filename", payload.filename.as_str());
        ParseRequest::from_base64(&payload.content, &payload.filename)
    });
    let result = match prepared {
        Ok(request) => service.parse(request).instrument(span.clone()).await,
        Err(err) => {
            service.record_rejection();
            Err(err)
        }
    };
    Json(respond(result, &span))
}

fn respond(result: Result<String, ParseError>, span: &tracing::Span) -> ParseResponse {
    let _entered = span.enter();
    match &result {
        Ok(markdown) => tracing::info!(markdown_len = markdown.len(), "Document parsed"),
        Err(err) => tracing::warn!(kind = err.kind().as_str(), error = %err, "Document parse failed"),
    }
    ParseResponse::from(result)
}

/// Transport-level rejection rendered as `{ "detail": ... }`.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        tracing::warn!(error = %err, "Failed to read multipart upload");
        Self {
            status: err.status(),
            detail: format!("Failed to read upload: {}", err.body_text()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}
