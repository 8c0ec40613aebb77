//! HttpWidgetClient - WidgetBackend over the `/api` HTTP surface.
//!
//! This is what an embedded widget talks to. The chat reply arrives as a
//! plain-text body read chunk by chunk; every other call is JSON.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::domain::content::{ContentRequest, GenerationResult};
use crate::domain::conversation::ChatMessage;
use crate::domain::moderation::ModerationVerdict;
use crate::domain::snapshot::Snapshot;
use crate::ports::{BackendError, TextStream, TurnPayload, WidgetBackend};

/// Connection settings for the widget backend.
#[derive(Debug, Clone)]
pub struct WidgetClientConfig {
    /// Base URL including the `/api` prefix, e.g. `http://localhost:5001/api`.
    pub base_url: String,
    pub timeout: Duration,
}

impl WidgetClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(120),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

pub struct HttpWidgetClient {
    config: WidgetClientConfig,
    client: Client,
}

impl HttpWidgetClient {
    pub fn new(config: WidgetClientConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BackendError::Transport(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url, path)
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        failure: fn(String) -> BackendError,
    ) -> Result<Response, BackendError> {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        check_status(response, failure).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        failure: fn(String) -> BackendError,
    ) -> Result<T, BackendError> {
        self.post(path, body, failure)
            .await?
            .json()
            .await
            .map_err(|e| failure(format!("unreadable response: {}", e)))
    }
}

#[derive(Serialize)]
struct ModerateBody<'a> {
    content: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IntentionBody<'a> {
    messages: &'a [ChatMessage],
    current_data: &'a Snapshot,
}

#[derive(Serialize)]
struct ProspectBody<'a> {
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Turns a non-success response into an error; 400 is always a validation error.
async fn check_status(
    response: Response,
    failure: fn(String) -> BackendError,
) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = match response.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => status.to_string(),
    };
    Err(status_error(status, message, failure))
}

fn status_error(status: StatusCode, message: String, failure: fn(String) -> BackendError) -> BackendError {
    match status {
        StatusCode::BAD_REQUEST => BackendError::Validation(message),
        StatusCode::TOO_MANY_REQUESTS => BackendError::Transport(format!("rate limited: {}", message)),
        _ => failure(message),
    }
}

#[async_trait]
impl WidgetBackend for HttpWidgetClient {
    async fn moderate(&self, content: &str) -> Result<ModerationVerdict, BackendError> {
        self.post_json("moderate-user-message", &ModerateBody { content }, BackendError::Moderation)
            .await
    }

    async fn stream_chat(&self, payload: TurnPayload) -> Result<TextStream, BackendError> {
        let response = self.post("chat", &payload, BackendError::Reply).await?;
        let body = Box::pin(response.bytes_stream());
        let stream = futures::stream::unfold((body, Vec::new()), |(mut body, mut pending)| async move {
            loop {
                match body.next().await {
                    Some(Ok(bytes)) => {
                        pending.extend_from_slice(&bytes);
                        let text = take_decoded(&mut pending);
                        if !text.is_empty() {
                            return Some((Ok(text), (body, pending)));
                        }
                    }
                    Some(Err(e)) => return Some((Err(BackendError::Reply(e.to_string())), (body, pending))),
                    None if pending.is_empty() => return None,
                    None => {
                        let rest = String::from_utf8_lossy(&pending).into_owned();
                        pending.clear();
                        return Some((Ok(rest), (body, pending)));
                    }
                }
            }
        });
        Ok(Box::pin(stream))
    }

    async fn search_data(&self, payload: TurnPayload) -> Result<Snapshot, BackendError> {
        self.post_json("search-data", &payload, BackendError::Extraction).await
    }

    async fn customer_intention(
        &self,
        messages: Vec<ChatMessage>,
        current: Snapshot,
    ) -> Result<Snapshot, BackendError> {
        let body = IntentionBody {
            messages: &messages,
            current_data: &current,
        };
        self.post_json("customer-intention", &body, BackendError::Extraction).await
    }

    async fn customer_prospect(&self, messages: Vec<ChatMessage>) -> Result<Snapshot, BackendError> {
        self.post_json("customer-prospect", &ProspectBody { messages: &messages }, BackendError::Extraction)
            .await
    }

    async fn generate_content(&self, request: ContentRequest) -> Result<GenerationResult, BackendError> {
        self.post_json("generate-custom-content", &request, BackendError::Generation)
            .await
    }
}

/// Decodes everything in `pending` except a trailing incomplete character,
/// which stays buffered for the next frame. Invalid bytes become U+FFFD.
fn take_decoded(pending: &mut Vec<u8>) -> String {
    let mut text = String::new();
    loop {
        match std::str::from_utf8(pending) {
            Ok(valid) => {
                text.push_str(valid);
                pending.clear();
                return text;
            }
            Err(e) => {
                let valid = e.valid_up_to();
                text.push_str(&String::from_utf8_lossy(&pending[..valid]));
                match e.error_len() {
                    None => {
                        pending.drain(..valid);
                        return text;
                    }
                    Some(len) => {
                        text.push(char::REPLACEMENT_CHARACTER);
                        pending.drain(..valid + len);
                    }
                }
            }
        }
    }
}
