//! Mock AI Provider for testing.
//!
//! Provides a configurable mock implementation of the AIProvider port,
//! allowing tests to run without calling real AI APIs.
//!
//! # Features
//!
//! - Pre-configured responses, optionally routed by structured output name
//! - Simulated latency, both per request and per streamed chunk
//! - Error injection for resilience testing
//! - Call tracking for verification
//!
//! # Example
//!
//! ```ignore
//! let provider = MockAIProvider::new()
//!     .with_response("Hello, I'm the assistant!")
//!     .with_response_for("searchData", r#"{"location":"Paris"}"#);
//!
//! let response = provider.complete(request).await?;
//! ```

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::sleep;

use crate::ports::{
    AIError, AIProvider, CompletionRequest, CompletionResponse, CompletionStream, FinishReason,
    ProviderInfo, StreamChunk, TokenUsage,
};

/// Content returned once every queue is exhausted.
pub const DEFAULT_MOCK_CONTENT: &str = "Mock response";

/// Mock AI provider for testing.
#[derive(Debug, Clone)]
pub struct MockAIProvider {
    /// Responses for requests without a structured output format.
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    /// Responses keyed by structured output name.
    routed: Arc<Mutex<HashMap<String, VecDeque<MockResponse>>>>,
    info: ProviderInfo,
    /// Simulated latency per request.
    delay: Duration,
    /// Simulated latency before each streamed chunk.
    chunk_delay: Duration,
    calls: Arc<Mutex<Vec<CompletionRequest>>>,
}

/// A configured mock response.
#[derive(Debug, Clone)]
pub enum MockResponse {
    Success { content: String },
    Error(MockError),
}

/// Mock error types for testing error handling.
#[derive(Debug, Clone)]
pub enum MockError {
    RateLimited { retry_after_secs: u32 },
    ContentFiltered { reason: String },
    Unavailable { message: String },
    AuthenticationFailed,
    Network { message: String },
    Timeout { timeout_secs: u32 },
}

impl From<MockError> for AIError {
    fn from(err: MockError) -> Self {
        match err {
            MockError::RateLimited { retry_after_secs } => AIError::rate_limited(retry_after_secs),
            MockError::ContentFiltered { reason } => AIError::content_filtered(reason),
            MockError::Unavailable { message } => AIError::unavailable(message),
            MockError::AuthenticationFailed => AIError::AuthenticationFailed,
            MockError::Network { message } => AIError::network(message),
            MockError::Timeout { timeout_secs } => AIError::Timeout { timeout_secs },
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Default for MockAIProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAIProvider {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            routed: Arc::new(Mutex::new(HashMap::new())),
            info: ProviderInfo::new("mock", "mock-model-1"),
            delay: Duration::ZERO,
            chunk_delay: Duration::ZERO,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queues a response for plain (unstructured) requests.
    pub fn with_response(self, content: impl Into<String>) -> Self {
        lock(&self.responses).push_back(MockResponse::Success {
            content: content.into(),
        });
        self
    }

    /// Queues an error for plain (unstructured) requests.
    pub fn with_error(self, error: MockError) -> Self {
        lock(&self.responses).push_back(MockResponse::Error(error));
        self
    }

    /// Queues a response for requests whose output format has this name.
    pub fn with_response_for(self, format: &str, content: impl Into<String>) -> Self {
        self.push_routed(
            format,
            MockResponse::Success {
                content: content.into(),
            },
        );
        self
    }

    /// Queues an error for requests whose output format has this name.
    pub fn with_error_for(self, format: &str, error: MockError) -> Self {
        self.push_routed(format, MockResponse::Error(error));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Number of calls whose structured output format had this name.
    pub fn call_count_for(&self, format: &str) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|call| call.response_format.as_ref().map(|f| f.name.as_str()) == Some(format))
            .count()
    }

    pub fn get_calls(&self) -> Vec<CompletionRequest> {
        lock(&self.calls).clone()
    }

    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    fn push_routed(&self, format: &str, response: MockResponse) {
        lock(&self.routed)
            .entry(format.to_string())
            .or_default()
            .push_back(response);
    }

    /// Records the call and picks its response.
    fn take(&self, request: CompletionRequest) -> MockResponse {
        let routed = request
            .response_format
            .as_ref()
            .and_then(|format| lock(&self.routed).get_mut(&format.name)?.pop_front());
        lock(&self.calls).push(request);

        routed
            .or_else(|| lock(&self.responses).pop_front())
            .unwrap_or_else(|| MockResponse::Success {
                content: DEFAULT_MOCK_CONTENT.to_string(),
            })
    }
}

#[async_trait]
impl AIProvider for MockAIProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AIError> {
        let response = self.take(request);

        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        match response {
            MockResponse::Success { content } => Ok(CompletionResponse {
                content,
                usage: TokenUsage::new(10, 20),
                model: self.info.model.clone(),
                finish_reason: FinishReason::Stop,
            }),
            MockResponse::Error(err) => Err(err.into()),
        }
    }

    async fn stream_complete(&self, request: CompletionRequest) -> Result<CompletionStream, AIError> {
        let response = self.take(request);

        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        let content = match response {
            MockResponse::Success { content } => content,
            MockResponse::Error(err) => return Err(err.into()),
        };

        // Word chunks that concatenate back to the exact content
        let mut chunks: Vec<StreamChunk> = content
            .split_inclusive(' ')
            .map(StreamChunk::content)
            .collect();
        chunks.push(StreamChunk::finished(FinishReason::Stop));

        let chunk_delay = self.chunk_delay;
        let stream = stream::iter(chunks).then(move |chunk| async move {
            if !chunk_delay.is_zero() {
                sleep(chunk_delay).await;
            }
            Ok(chunk)
        });

        Ok(Box::pin(stream))
    }

    fn provider_info(&self) -> ProviderInfo {
        self.info.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversation::Role;
    use crate::ports::{RequestMetadata, ResponseFormat};
    use serde_json::json;

    fn plain_request() -> CompletionRequest {
        CompletionRequest::new(RequestMetadata::new("trace-123")).with_message(Role::User, "Hello")
    }

    fn structured_request(name: &str) -> CompletionRequest {
        plain_request().with_response_format(ResponseFormat::strict(name, json!({})))
    }

    #[tokio::test]
    async fn returns_responses_in_order() {
        let provider = MockAIProvider::new().with_response("First").with_response("Second");

        assert_eq!(provider.complete(plain_request()).await.unwrap().content, "First");
        assert_eq!(provider.complete(plain_request()).await.unwrap().content, "Second");
        assert_eq!(
            provider.complete(plain_request()).await.unwrap().content,
            DEFAULT_MOCK_CONTENT
        );
    }

    #[tokio::test]
    async fn routes_by_format_name() {
        let provider = MockAIProvider::new()
            .with_response("chat")
            .with_response_for("searchData", "{\"a\":1}");

        let structured = provider.complete(structured_request("searchData")).await.unwrap();
        let plain = provider.complete(plain_request()).await.unwrap();

        assert_eq!(structured.content, "{\"a\":1}");
        assert_eq!(plain.content, "chat");
        assert_eq!(provider.call_count_for("searchData"), 1);
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn unrouted_format_falls_back_to_queue() {
        let provider = MockAIProvider::new().with_response("fallback");
        let response = provider.complete(structured_request("other")).await.unwrap();
        assert_eq!(response.content, "fallback");
    }

    #[tokio::test]
    async fn returns_configured_error() {
        let provider = MockAIProvider::new().with_error(MockError::RateLimited { retry_after_secs: 30 });

        let err = provider.complete(plain_request()).await.unwrap_err();
        assert!(matches!(err, AIError::RateLimited { retry_after_secs: 30 }));
    }

    #[tokio::test]
    async fn streaming_reassembles_exact_content() {
        let provider = MockAIProvider::new().with_response("Hello world from streaming");

        let mut stream = provider.stream_complete(plain_request()).await.unwrap();
        let mut content = String::new();
        let mut finished = false;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.unwrap();
            if chunk.is_final() {
                finished = true;
            } else {
                content.push_str(&chunk.delta);
            }
        }

        assert_eq!(content, "Hello world from streaming");
        assert!(finished);
    }

    #[tokio::test]
    async fn streaming_returns_error() {
        let provider = MockAIProvider::new().with_error(MockError::Unavailable {
            message: "Service down".to_string(),
        });

        let result = provider.stream_complete(plain_request()).await;
        assert!(matches!(result, Err(AIError::Unavailable { .. })));
    }

    #[tokio::test]
    async fn tracks_and_clears_calls() {
        let provider = MockAIProvider::new();
        provider.complete(plain_request()).await.unwrap();
        assert_eq!(provider.call_count(), 1);
        provider.clear_calls();
        assert_eq!(provider.call_count(), 0);
    }
}
