//! Rate limiting middleware for axum.
//!
//! Counts requests per client IP against the `RateLimiter` port and answers
//! `429 Too Many Requests` with `Retry-After` once the window is used up.
//!
//! Rate limit status is returned in standard HTTP headers:
//! - `X-RateLimit-Limit`: Maximum requests allowed in the window
//! - `X-RateLimit-Remaining`: Requests remaining in the current window
//! - `X-RateLimit-Reset`: Unix timestamp when the window resets
//! - `Retry-After`: Seconds to wait (only on 429 response)

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::ports::{RateLimitKey, RateLimitQuota, RateLimitResult, RateLimiter};

/// Standard rate limit header names.
pub mod headers {
    use super::HeaderName;

    /// Maximum requests allowed in the window.
    pub static X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
    /// Requests remaining in the current window.
    pub static X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
    /// Unix timestamp when the window resets.
    pub static X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");
}

/// Rate limiter middleware state.
#[derive(Clone)]
pub struct RateLimitState {
    pub limiter: Arc<dyn RateLimiter>,
    pub quota: RateLimitQuota,
}

impl RateLimitState {
    pub fn new(limiter: Arc<dyn RateLimiter>, quota: RateLimitQuota) -> Self {
        Self { limiter, quota }
    }
}

/// Per-IP fixed-window rate limiting.
///
/// Requests whose client IP cannot be determined share one global bucket.
/// A limiter failure lets the request through.
pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    let key = match extract_client_ip(request.headers(), connect_info.as_ref()) {
        Some(ip) => RateLimitKey::ip(ip),
        None => RateLimitKey::Global,
    };

    let status = match state.limiter.check(&key, state.quota).await {
        Ok(RateLimitResult::Denied(denied)) => {
            tracing::info!(key = %key, retry_after = denied.retry_after_secs, "rate limit exceeded");
            return rate_limit_response(denied.limit, denied.retry_after_secs, &denied.message);
        }
        Ok(RateLimitResult::Allowed(status)) => Some(status),
        Err(e) => {
            tracing::warn!(error = %e, "rate limiter unavailable");
            None
        }
    };

    let mut response = next.run(request).await;
    if let Some(status) = status {
        add_rate_limit_headers(
            response.headers_mut(),
            status.limit,
            status.remaining,
            status.reset_at.as_unix_secs(),
        );
    }
    response
}

/// Extract client IP, checking forwarded headers first.
///
/// Order of precedence:
/// 1. X-Forwarded-For header (first IP in list)
/// 2. X-Real-IP header
/// 3. ConnectInfo socket address
fn extract_client_ip(
    headers: &HeaderMap,
    connect_info: Option<&ConnectInfo<SocketAddr>>,
) -> Option<String> {
    let forwarded = headers
        .get("X-Forwarded-For")
        .and_then(|h| h.to_str().ok())
        .and_then(|list| list.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());
    if let Some(ip) = forwarded {
        return Some(ip.to_string());
    }

    let real_ip = headers
        .get("X-Real-IP")
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());
    if let Some(ip) = real_ip {
        return Some(ip.to_string());
    }

    connect_info.map(|ci| ci.0.ip().to_string())
}

fn rate_limit_response(limit: u32, retry_after_secs: u32, message: &str) -> Response {
    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response();

    let headers = response.headers_mut();
    headers.insert(headers::X_RATELIMIT_LIMIT.clone(), HeaderValue::from(limit));
    headers.insert(headers::X_RATELIMIT_REMAINING.clone(), HeaderValue::from(0u32));
    headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
    response
}

fn add_rate_limit_headers(headers: &mut HeaderMap, limit: u32, remaining: u32, reset_at: u64) {
    headers.insert(headers::X_RATELIMIT_LIMIT.clone(), HeaderValue::from(limit));
    headers.insert(headers::X_RATELIMIT_REMAINING.clone(), HeaderValue::from(remaining));
    headers.insert(headers::X_RATELIMIT_RESET.clone(), HeaderValue::from(reset_at));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::rate_limiter::InMemoryRateLimiter;
    use axum::{body::Body, middleware, routing::get, Router};
    use tower::ServiceExt;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    // ════════════════════════════════════════════════════════════════════════════
    // IP Extraction Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn extract_ip_from_x_forwarded_for() {
        let ip = extract_client_ip(&headers(&[("X-Forwarded-For", "1.2.3.4, 5.6.7.8")]), None);
        assert_eq!(ip, Some("1.2.3.4".to_string()));
    }

    #[test]
    fn extract_ip_from_x_real_ip() {
        let ip = extract_client_ip(&headers(&[("X-Real-IP", "9.8.7.6")]), None);
        assert_eq!(ip, Some("9.8.7.6".to_string()));
    }

    #[test]
    fn extract_ip_prefers_x_forwarded_for() {
        let ip = extract_client_ip(
            &headers(&[("X-Forwarded-For", "1.2.3.4"), ("X-Real-IP", "5.6.7.8")]),
            None,
        );
        assert_eq!(ip, Some("1.2.3.4".to_string()));
    }

    #[test]
    fn extract_ip_falls_back_to_socket_address() {
        let addr: SocketAddr = "10.1.1.1:4000".parse().unwrap();
        let ip = extract_client_ip(&HeaderMap::new(), Some(&ConnectInfo(addr)));
        assert_eq!(ip, Some("10.1.1.1".to_string()));
    }

    #[test]
    fn extract_ip_returns_none_without_source() {
        assert_eq!(extract_client_ip(&HeaderMap::new(), None), None);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Middleware Tests
    // ════════════════════════════════════════════════════════════════════════════

    fn app(max_requests: u32) -> Router {
        let state = RateLimitState::new(
            Arc::new(InMemoryRateLimiter::new()),
            RateLimitQuota::new(max_requests, 900),
        );
        Router::new()
            .route("/ping", get(|| async { "pong" }))
            .layer(middleware::from_fn_with_state(state, rate_limit_middleware))
    }

    fn request(ip: &str) -> Request {
        axum::http::Request::builder()
            .uri("/ping")
            .header("X-Forwarded-For", ip)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn allowed_requests_carry_limit_headers() {
        let response = app(5).oneshot(request("1.1.1.1")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-ratelimit-limit"], "5");
        assert_eq!(response.headers()["x-ratelimit-remaining"], "4");
    }

    #[tokio::test]
    async fn exceeding_the_window_returns_429_with_retry_after() {
        let app = app(2);
        for _ in 0..2 {
            let response = app.clone().oneshot(request("1.1.1.1")).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app.clone().oneshot(request("1.1.1.1")).await.unwrap();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let retry_after: u32 = response.headers()[header::RETRY_AFTER]
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert!(retry_after > 0 && retry_after <= 900);
    }

    #[tokio::test]
    async fn clients_are_limited_independently() {
        let app = app(1);
        app.clone().oneshot(request("1.1.1.1")).await.unwrap();

        let response = app.clone().oneshot(request("2.2.2.2")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn rate_limit_state_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RateLimitState>();
    }
}
