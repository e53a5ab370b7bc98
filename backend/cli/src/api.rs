use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use roomscribe_core::{AnalysisRequest, BatchResult, ProcessingMode, ScribeError, ValidationError};
use roomscribe_understanding::BatchCoordinator;

/// Shared application state for API handlers.
pub struct AppState {
    pub coordinator: BatchCoordinator,
    /// Mode used when a request does not name one.
    pub default_mode: ProcessingMode,
    pub model_name: String,
}

/// Build the Axum router with all API routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/captions", post(create_captions))
        .route("/api/caption", post(create_caption))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .with_state(state)
}

/// Any origin; preflight answered with an empty body.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
        ])
}

/// JSON error body `{"error": ...}` with a matching status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<ScribeError> for ApiError {
    fn from(err: ScribeError) -> Self {
        let status = match &err {
            ScribeError::Validation(_) => StatusCode::BAD_REQUEST,
            ScribeError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ScribeError::from(err).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = self.status.as_u16(), error = %self.message, "Request failed");
        } else {
            warn!(status = self.status.as_u16(), error = %self.message, "Request rejected");
        }
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Health check endpoint.
async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "roomscribe",
        "version": env!("CARGO_PKG_VERSION"),
        "model": state.model_name,
    }))
}

/// Caption a batch of photos: `{imageUrls: [...], mode?: "sequential"|"concurrent"}`.
///
/// The body is parsed by hand so shape errors come back as 400 `{error}`
/// rather than the extractor's default rejection.
async fn create_captions(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<BatchResult>, ApiError> {
    let request = parse_body(&body)?;
    let image_urls = image_urls_from(&request)?;

    let mode = match request.get("mode") {
        None | Some(Value::Null) => state.default_mode,
        Some(Value::String(mode)) => mode.parse().map_err(ApiError::bad_request)?,
        Some(other) => {
            return Err(ApiError::bad_request(format!("mode must be a string, got {other}")))
        }
    };

    let result = state.coordinator.process_batch(&image_urls, mode).await?;
    Ok(Json(result))
}

/// Caption a single photo: `{imageUrl}` → `{room, visualDescription, caption}`.
async fn create_caption(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let request = parse_body(&body)?;
    let url = request
        .get("imageUrl")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::bad_request("imageUrl is required and must be a string"))?;

    let analysis = AnalysisRequest::parse(url).map_err(|reason| ValidationError::InvalidUrl {
        index: 0,
        url: url.to_string(),
        reason,
    })?;

    let outcome = state.coordinator.pipeline().process(&analysis).await;
    if let Some(message) = outcome.error() {
        return Err(ScribeError::Other(anyhow::Error::msg(message.to_string())).into());
    }

    Ok(Json(json!({
        "room": outcome.room(),
        "visualDescription": outcome.visual_description(),
        "caption": outcome.caption(),
    })))
}

fn parse_body(body: &[u8]) -> Result<Value, ApiError> {
    serde_json::from_slice(body)
        .map_err(|e| ApiError::bad_request(format!("request body must be valid JSON: {e}")))
}

fn image_urls_from(request: &Value) -> Result<Vec<String>, ValidationError> {
    let items = match request.get("imageUrls") {
        None | Some(Value::Null) => return Err(ValidationError::EmptyBatch),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(ValidationError::NotAnArray),
    };
    items
        .iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::String(url) => Ok(url.clone()),
            other => Err(ValidationError::InvalidUrl {
                index,
                url: other.to_string(),
                reason: "expected a string".to_string(),
            }),
        })
        .collect()
}
