//! Request sanitization middleware.
//!
//! Runs before every widget handler. JSON bodies get every string leaf
//! trimmed and stripped of markup so no user-supplied HTML reaches a model
//! call. A `messages` key that is not an array is rejected here with 400.

use axum::{
    body::{to_bytes, Body},
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

use crate::domain::sanitize::sanitize_json_strings;

/// Largest request body accepted, in bytes.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

pub async fn sanitize_middleware(request: Request, next: Next) -> Response {
    let (mut parts, body) = request.into_parts();
    let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => return bad_request("request body too large"),
    };

    let body = match serde_json::from_slice::<Value>(&bytes) {
        Ok(value) => match sanitize_body(value) {
            Ok(clean) => match serde_json::to_vec(&clean) {
                Ok(encoded) => {
                    parts.headers.remove(header::CONTENT_LENGTH);
                    Body::from(encoded)
                }
                Err(_) => Body::from(bytes),
            },
            Err(message) => return bad_request(message),
        },
        // Not JSON: the handler's extractor reports it.
        Err(_) => Body::from(bytes),
    };

    next.run(Request::from_parts(parts, body)).await
}

/// Validates the shape of `messages` and sanitizes every string in the body.
pub fn sanitize_body(body: Value) -> Result<Value, &'static str> {
    if let Value::Object(map) = &body {
        if let Some(messages) = map.get("messages") {
            if !messages.is_array() {
                return Err("messages must be an array");
            }
        }
    }
    Ok(sanitize_json_strings(&body))
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}
