//! Remote assistant thread/run API.
//!
//! [`AssistantsBackend`] is the seam between the orchestrator and the remote
//! service. Every method takes the request's [`RunConfiguration`], so a single
//! backend (and its connection pool) serves all concurrent requests without
//! holding per-request state.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::error::{Operation, RunError};
use super::provider::Provider;
use super::types::{
    CreateMessageRequest, CreateRunRequest, MessageList, MessageObject, MessageRole, RunObject,
    ThreadDeleted, ThreadObject,
};
use super::RunConfiguration;

/// Maximum number of body characters quoted in a rejection message.
const ERROR_BODY_LIMIT: usize = 200;

/// One async method per remote operation used by the orchestrator.
#[async_trait]
pub trait AssistantsBackend: Send + Sync + std::fmt::Debug {
    async fn create_thread(&self, config: &RunConfiguration) -> Result<ThreadObject, RunError>;

    async fn create_message(
        &self,
        config: &RunConfiguration,
        thread_id: &str,
        content: &str,
    ) -> Result<MessageObject, RunError>;

    async fn create_run(
        &self,
        config: &RunConfiguration,
        thread_id: &str,
        request: &CreateRunRequest,
    ) -> Result<RunObject, RunError>;

    async fn retrieve_run(
        &self,
        config: &RunConfiguration,
        thread_id: &str,
        run_id: &str,
    ) -> Result<RunObject, RunError>;

    /// Messages on the thread, newest first.
    async fn list_messages(
        &self,
        config: &RunConfiguration,
        thread_id: &str,
    ) -> Result<MessageList, RunError>;

    async fn delete_thread(
        &self,
        config: &RunConfiguration,
        thread_id: &str,
    ) -> Result<ThreadDeleted, RunError>;
}

/// [`AssistantsBackend`] speaking HTTP to an OpenAI-compatible service.
#[derive(Debug, Clone)]
pub struct HttpAssistantsBackend {
    http: reqwest::Client,
}

impl HttpAssistantsBackend {
    /// Create a backend whose calls time out individually.
    ///
    /// `request_timeout` bounds each remote call; the overall run budget is
    /// enforced by the supervisor.
    pub fn new(connect_timeout: Duration, request_timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http })
    }

    /// Wrap an existing client.
    #[must_use]
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    fn request(
        &self,
        method: reqwest::Method,
        config: &RunConfiguration,
        path: &str,
    ) -> reqwest::RequestBuilder {
        let provider = Provider::detect_from_url(config.base_url());
        let url = provider.build_url(config.base_url(), path);
        debug!(%method, %url, "Assistant API request");
        provider.authorize(self.http.request(method, url), config.api_key())
    }

    /// Send a request and decode the typed response body.
    async fn send<T: DeserializeOwned>(
        operation: Operation,
        request: reqwest::RequestBuilder,
    ) -> Result<T, RunError> {
        let response = request
            .send()
            .await
            .map_err(|e| RunError::unavailable(operation, e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| RunError::unavailable(operation, e.to_string()))?;

        if !status.is_success() {
            return Err(RunError::rejected(
                operation,
                Some(status.as_u16()),
                remote_error_message(&body),
            ));
        }

        serde_json::from_slice(&body).map_err(|e| {
            RunError::rejected(
                operation,
                Some(status.as_u16()),
                format!("malformed response: {e}"),
            )
        })
    }
}

#[async_trait]
impl AssistantsBackend for HttpAssistantsBackend {
    async fn create_thread(&self, config: &RunConfiguration) -> Result<ThreadObject, RunError> {
        let request = self
            .request(reqwest::Method::POST, config, "threads")
            .json(&serde_json::json!({}));
        Self::send(Operation::CreateThread, request).await
    }

    async fn create_message(
        &self,
        config: &RunConfiguration,
        thread_id: &str,
        content: &str,
    ) -> Result<MessageObject, RunError> {
        let body = CreateMessageRequest {
            role: MessageRole::User,
            content,
        };
        let request = self
            .request(
                reqwest::Method::POST,
                config,
                &format!("threads/{thread_id}/messages"),
            )
            .json(&body);
        Self::send(Operation::CreateMessage, request).await
    }

    async fn create_run(
        &self,
        config: &RunConfiguration,
        thread_id: &str,
        request: &CreateRunRequest,
    ) -> Result<RunObject, RunError> {
        let request = self
            .request(
                reqwest::Method::POST,
                config,
                &format!("threads/{thread_id}/runs"),
            )
            .json(request);
        Self::send(Operation::CreateRun, request).await
    }

    async fn retrieve_run(
        &self,
        config: &RunConfiguration,
        thread_id: &str,
        run_id: &str,
    ) -> Result<RunObject, RunError> {
        let request = self.request(
            reqwest::Method::GET,
            config,
            &format!("threads/{thread_id}/runs/{run_id}"),
        );
        Self::send(Operation::RetrieveRun, request).await
    }

    async fn list_messages(
        &self,
        config: &RunConfiguration,
        thread_id: &str,
    ) -> Result<MessageList, RunError> {
        let request = self
            .request(
                reqwest::Method::GET,
                config,
                &format!("threads/{thread_id}/messages"),
            )
            .query(&[("order", "desc")]);
        Self::send(Operation::ListMessages, request).await
    }

    async fn delete_thread(
        &self,
        config: &RunConfiguration,
        thread_id: &str,
    ) -> Result<ThreadDeleted, RunError> {
        let request = self.request(
            reqwest::Method::DELETE,
            config,
            &format!("threads/{thread_id}"),
        );
        Self::send(Operation::DeleteThread, request).await
    }
}

/// Pull `error.message` out of an error body, or quote the start of it.
fn remote_error_message(body: &[u8]) -> String {
    let parsed = serde_json::from_slice::<serde_json::Value>(body).ok();
    if let Some(message) = parsed
        .as_ref()
        .and_then(|v| v.pointer("/error/message"))
        .and_then(serde_json::Value::as_str)
    {
        return message.to_string();
    }

    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        "empty response body".to_string()
    } else {
        text.chars().take(ERROR_BODY_LIMIT).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_from_openai_body() {
        let body = br#"{"error":{"message":"No assistant found with id 'asst_x'.","type":"invalid_request_error"}}"#;
        assert_eq!(
            remote_error_message(body),
            "No assistant found with id 'asst_x'."
        );
    }

    #[test]
    fn test_error_message_truncates_plain_text() {
        let body = "x".repeat(500);
        assert_eq!(remote_error_message(body.as_bytes()).len(), ERROR_BODY_LIMIT);
    }

    #[test]
    fn test_error_message_empty_body() {
        assert_eq!(remote_error_message(b"  "), "empty response body");
    }
}
