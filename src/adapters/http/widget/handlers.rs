//! HTTP handlers for the widget endpoints.

use std::sync::Arc;

use axum::{
    async_trait,
    body::Body,
    extract::{FromRequest, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures::StreamExt;
use serde::de::DeserializeOwned;

use crate::domain::content::ContentRequest;
use crate::ports::{BackendError, TurnPayload, WidgetBackend};

use super::dto::{ErrorResponse, IntentionRequest, ModerateRequest, ProspectRequest};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for the widget endpoints.
#[derive(Clone)]
pub struct WidgetAppState {
    pub backend: Arc<dyn WidgetBackend>,
}

impl WidgetAppState {
    pub fn new(backend: Arc<dyn WidgetBackend>) -> Self {
        Self { backend }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Errors and extraction
// ════════════════════════════════════════════════════════════════════════════════

/// Error type mapped to `{error}` bodies.
#[derive(Debug)]
pub enum WidgetApiError {
    BadRequest(String),
    Internal(String),
}

impl From<BackendError> for WidgetApiError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Validation(message) => WidgetApiError::BadRequest(message),
            other => WidgetApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for WidgetApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            WidgetApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            WidgetApiError::Internal(message) => {
                tracing::error!(error = %message, "widget request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        };
        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

/// JSON body extractor whose rejection is a 400 `{error}` body.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = WidgetApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(WidgetApiError::BadRequest(rejection.body_text())),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// Streams the assistant reply as plain text.
///
/// POST /api/chat
pub async fn chat(
    State(state): State<WidgetAppState>,
    ApiJson(payload): ApiJson<TurnPayload>,
) -> Result<Response, WidgetApiError> {
    let stream = state.backend.stream_chat(payload).await?;
    let stream = stream.inspect(|chunk| {
        if let Err(e) = chunk {
            tracing::warn!(error = %e, "reply stream broke off");
        }
    });

    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(stream),
    )
        .into_response())
}

/// POST /api/search-data
pub async fn search_data(
    State(state): State<WidgetAppState>,
    ApiJson(payload): ApiJson<TurnPayload>,
) -> Result<impl IntoResponse, WidgetApiError> {
    let snapshot = state.backend.search_data(payload).await?;
    Ok(Json(snapshot))
}

/// POST /api/customer-intention
pub async fn customer_intention(
    State(state): State<WidgetAppState>,
    ApiJson(request): ApiJson<IntentionRequest>,
) -> Result<impl IntoResponse, WidgetApiError> {
    let snapshot = state
        .backend
        .customer_intention(request.messages, request.current_data)
        .await?;
    Ok(Json(snapshot))
}

/// POST /api/moderate-user-message
pub async fn moderate_user_message(
    State(state): State<WidgetAppState>,
    ApiJson(request): ApiJson<ModerateRequest>,
) -> Result<impl IntoResponse, WidgetApiError> {
    let verdict = state.backend.moderate(&request.content).await?;
    Ok(Json(verdict))
}

/// POST /api/generate-custom-content
pub async fn generate_custom_content(
    State(state): State<WidgetAppState>,
    ApiJson(request): ApiJson<ContentRequest>,
) -> Result<impl IntoResponse, WidgetApiError> {
    let result = state.backend.generate_content(request).await?;
    Ok(Json(result))
}

/// POST /api/customer-prospect
pub async fn customer_prospect(
    State(state): State<WidgetAppState>,
    ApiJson(request): ApiJson<ProspectRequest>,
) -> Result<impl IntoResponse, WidgetApiError> {
    let prospect = state.backend.customer_prospect(request.messages).await?;
    Ok(Json(prospect))
}
