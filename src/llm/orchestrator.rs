//! Conversation run orchestrator.
//!
//! The orchestrator drives one request-scoped conversation against the remote
//! assistant service:
//! 1. Create a thread and take a [`ContextLease`] on it
//! 2. Post the user's message
//! 3. Start a run and poll it under the [`PollPolicy`]
//! 4. Read the newest assistant message back as the [`Reply`]
//! 5. Delete the thread, whatever happened in steps 2 to 4
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use assistant_relay::llm::{HttpAssistantsBackend, Orchestrator, RunConfiguration};
//!
//! let backend = HttpAssistantsBackend::new(connect_timeout, request_timeout)?;
//! let orchestrator = Orchestrator::new(Arc::new(backend));
//!
//! let config = RunConfiguration::new("https://api.openai.com", "sk-...", "asst_123")?;
//! let reply = orchestrator.run("Do you ship to Norway?", &config).await?;
//! ```

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use super::assistants::AssistantsBackend;
use super::clock::{Clock, TokioClock};
use super::error::RunError;
use super::lease::ContextLease;
use super::reply::{Reply, extract_reply};
use super::supervisor::{PollPolicy, RunSupervisor};
use super::types::{CreateRunRequest, MessageObject};
use super::{ConversationContext, RunConfiguration, RunDefaults};

/// Runs conversations against one assistant backend.
///
/// Cheap to clone; every clone shares the backend and its connection pool.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    backend: Arc<dyn AssistantsBackend>,
    clock: Arc<dyn Clock>,
    policy: PollPolicy,
    defaults: RunDefaults,
}

impl Orchestrator {
    /// Create an orchestrator with the default polling policy and run defaults.
    pub fn new(backend: Arc<dyn AssistantsBackend>) -> Self {
        Self {
            backend,
            clock: Arc::new(TokioClock),
            policy: PollPolicy::default(),
            defaults: RunDefaults::default(),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_defaults(mut self, defaults: RunDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    #[must_use]
    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    #[must_use]
    pub fn defaults(&self) -> &RunDefaults {
        &self.defaults
    }

    /// Relay one message and wait for the assistant's reply.
    ///
    /// The thread created for the conversation is deleted before this
    /// returns, on success and on every error after it was created.
    pub async fn run(&self, message: &str, config: &RunConfiguration) -> Result<Reply, RunError> {
        self.run_until_cancelled(message, config, &CancellationToken::new())
            .await
    }

    /// Like [`Orchestrator::run`], but gives up with [`RunError::Cancelled`]
    /// once `cancel` fires.
    ///
    /// Cancellation still deletes the thread before returning. A thread whose
    /// creation was in flight when `cancel` fired is not known locally and
    /// cannot be deleted.
    #[instrument(
        name = "assistant.run",
        skip_all,
        fields(assistant_id = %config.assistant_id(), thread_id = tracing::field::Empty)
    )]
    pub async fn run_until_cancelled(
        &self,
        message: &str,
        config: &RunConfiguration,
        cancel: &CancellationToken,
    ) -> Result<Reply, RunError> {
        if message.trim().is_empty() {
            return Err(RunError::EmptyMessage);
        }

        let config = Arc::new(config.clone());
        info!(
            base_url = %config.base_url(),
            message_length = message.len(),
            "Starting assistant run"
        );

        let lease = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                warn!("Run cancelled before a thread was created");
                return Err(RunError::Cancelled);
            }
            lease = self.open_context(Arc::clone(&config)) => lease?,
        };
        tracing::Span::current().record("thread_id", lease.context().id.as_str());

        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(RunError::Cancelled),
            outcome = self.converse(&lease, message, &config) => outcome,
        };

        lease.release().await;

        match &outcome {
            Ok(reply) => info!(
                run_id = %reply.run_id,
                reply_length = reply.text.len(),
                "Assistant run finished"
            ),
            Err(e) => warn!(error = %e, "Assistant run failed"),
        }
        outcome
    }

    /// Create a remote thread and lease it.
    pub async fn open_context(
        &self,
        config: Arc<RunConfiguration>,
    ) -> Result<ContextLease, RunError> {
        let thread = self.backend.create_thread(&config).await?;
        tracing::debug!(thread_id = %thread.id, "Thread created");

        let context = ConversationContext {
            id: thread.id,
            created_at: self.clock.now(),
        };
        Ok(ContextLease::new(Arc::clone(&self.backend), config, context))
    }

    /// Post a user message onto the thread.
    pub async fn submit_message(
        &self,
        context: &ConversationContext,
        message: &str,
        config: &RunConfiguration,
    ) -> Result<MessageObject, RunError> {
        let posted = self
            .backend
            .create_message(config, &context.id, message)
            .await?;
        tracing::debug!(thread_id = %context.id, message_id = %posted.id, "Message posted");
        Ok(posted)
    }

    /// Body for the run request, with request settings over server defaults.
    #[must_use]
    pub fn run_request(&self, config: &RunConfiguration) -> CreateRunRequest {
        CreateRunRequest {
            assistant_id: config.assistant_id().to_string(),
            model: config
                .model()
                .unwrap_or(self.defaults.model.as_str())
                .to_string(),
            temperature: config.temperature().unwrap_or(self.defaults.temperature),
        }
    }

    async fn converse(
        &self,
        lease: &ContextLease,
        message: &str,
        config: &RunConfiguration,
    ) -> Result<Reply, RunError> {
        let context = lease.context();
        self.submit_message(context, message, config).await?;

        let supervisor =
            RunSupervisor::new(self.backend.as_ref(), self.clock.as_ref(), &self.policy);
        let completed = supervisor
            .supervise(config, context, &self.run_request(config))
            .await?;

        let messages = self.backend.list_messages(config, &context.id).await?;
        extract_reply(&messages, &completed.run_id, &context.id)
    }
}
