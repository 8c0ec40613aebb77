//! HTTP adapters - the REST surface of the widget backend.
//!
//! [`api_router`] assembles the widget routes under `/api` with the
//! cross-cutting layers: sanitization, per-IP rate limiting, CORS, request
//! timeout, request ids and tracing.

pub mod middleware;
pub mod widget;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    Router,
};
use http::HeaderName;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::ports::{RateLimitQuota, RateLimiter};

pub use middleware::{rate_limit_middleware, sanitize_middleware, RateLimitState};
pub use widget::{widget_router, WidgetApiError, WidgetAppState};

/// Header carrying the per-request id, generated when the caller sends none.
pub static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Cross-cutting HTTP settings.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub allowed_origins: Vec<String>,
    pub request_timeout: Duration,
    /// `None` disables rate limiting.
    pub rate_limit: Option<RateLimitQuota>,
}

/// Builds the complete application router.
pub fn api_router(
    state: WidgetAppState,
    limiter: Arc<dyn RateLimiter>,
    settings: &HttpSettings,
) -> Router {
    let mut api = widget_router().route_layer(from_fn(sanitize_middleware));
    if let Some(quota) = settings.rate_limit {
        api = api.route_layer(from_fn_with_state(
            RateLimitState::new(limiter, quota),
            rate_limit_middleware,
        ));
    }

    Router::new()
        .nest("/api", api)
        .with_state(state)
        .layer(TimeoutLayer::new(settings.request_timeout))
        .layer(cors_layer(&settings.allowed_origins))
        .layer(PropagateRequestIdLayer::new(REQUEST_ID_HEADER.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(REQUEST_ID_HEADER.clone(), MakeRequestUuid))
}

/// CORS restricted to the configured origins.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}
