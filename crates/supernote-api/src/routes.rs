//! Router and middleware stack.

use std::time::Duration;

use axum::body::Body;
use axum::error_handling::HandleErrorLayer;
use axum::http::{Method, Request};
use axum::routing::{get, post};
use axum::{BoxError, Router};
use tower::timeout::error::Elapsed;
use tower::timeout::TimeoutLayer;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use supernote_core::{defaults, Config, Error};

use crate::error::ApiError;
use crate::handlers::{assist, health, notes};
use crate::state::AppState;

/// Tags every request with a time-ordered UUIDv7 `x-request-id`.
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

/// Answer middleware failures in the same `{"error": ..}` shape as handlers.
async fn handle_middleware_error(err: BoxError) -> ApiError {
    if err.is::<Elapsed>() {
        ApiError::Timeout(Error::Timeout("request exceeded its deadline".to_string()))
    } else {
        ApiError::Internal(Error::Internal(err.to_string()))
    }
}

/// Per-request limits applied by the middleware stack.
///
/// `request_timeout` should exceed the gateway's query timeout so a slow
/// store is reported by the gateway first.
#[derive(Debug, Clone, Copy)]
pub struct HttpLimits {
    pub request_timeout: Duration,
    pub max_body_bytes: usize,
}

impl Default for HttpLimits {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(defaults::REQUEST_TIMEOUT_SECS),
            max_body_bytes: defaults::MAX_BODY_BYTES,
        }
    }
}

impl From<&Config> for HttpLimits {
    fn from(config: &Config) -> Self {
        Self {
            request_timeout: config.request_timeout,
            max_body_bytes: config.max_body_bytes,
        }
    }
}

/// Every route the server answers, in banner order.
pub const ENDPOINTS: &[(&str, &str, &str)] = &[
    ("GET", "/health", "Health check"),
    ("GET", "/api/notes", "List notes"),
    ("POST", "/api/notes", "Create note"),
    ("GET", "/api/notes/:id", "Get note by ID"),
    ("DELETE", "/api/notes/:id", "Delete note"),
    ("POST", "/api/search", "Search notes (not implemented)"),
    ("POST", "/api/chat", "Chat with AI (not implemented)"),
];

pub fn router(state: AppState, limits: HttpLimits) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/notes", get(notes::list_notes).post(notes::create_note))
        .route(
            "/api/notes/:id",
            get(notes::get_note).delete(notes::delete_note),
        )
        .route("/api/search", post(assist::search_notes))
        .route("/api/chat", post(assist::chat))
        .layer(CatchPanicLayer::new())
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_middleware_error))
                .layer(TimeoutLayer::new(limits.request_timeout)),
        )
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers(Any)
                .max_age(Duration::from_secs(3600)),
        )
        .layer(RequestBodyLimitLayer::new(limits.max_body_bytes))
        .with_state(state)
}
