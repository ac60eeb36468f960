//! Assistant thread/run orchestration.
//!
//! This module drives a remote assistant service through one request-scoped
//! conversation: create a thread, post the user's message, start a run, poll
//! it to completion within a budget, read back the assistant's reply and
//! delete the thread again on every exit path.
//!
//! # Overview
//!
//! - [`AssistantsBackend`]: one async method per remote operation
//! - [`HttpAssistantsBackend`]: `reqwest` implementation of the backend
//! - [`Orchestrator`]: the open → submit → supervise → extract sequence
//! - [`RunSupervisor`]: starts the run and polls it under [`PollPolicy`]
//! - [`ContextLease`]: owns a remote thread and guarantees its deletion
//!
//! # Example
//!
//! ```rust,ignore
//! use assistant_relay::llm::{Orchestrator, RunConfiguration};
//!
//! let config = RunConfiguration::new("https://api.openai.com", "sk-...", "asst_123")?
//!     .with_model("gpt-4o");
//! let reply = orchestrator.run("Which shoe fits a wide foot?", &config).await?;
//! println!("{}", reply.text);
//! ```

pub mod assistants;
pub mod clock;
pub mod error;
pub mod lease;
pub mod orchestrator;
pub mod provider;
pub mod reply;
pub mod supervisor;
pub mod types;

pub use assistants::{AssistantsBackend, HttpAssistantsBackend};
pub use clock::{Clock, ManualClock, TokioClock};
pub use error::{Operation, RunError};
pub use lease::ContextLease;
pub use orchestrator::Orchestrator;
pub use provider::Provider;
pub use reply::Reply;
pub use supervisor::{PollPolicy, RunSupervisor};

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use tokio::time::Instant;

/// Remote conversation thread owned by one orchestration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationContext {
    /// Opaque remote thread identifier.
    pub id: String,
    /// Local instant the thread was created.
    pub created_at: Instant,
}

/// Values applied when a request leaves an optional run setting unset.
#[derive(Debug, Clone, PartialEq)]
pub struct RunDefaults {
    pub model: String,
    pub temperature: f64,
}

impl Default for RunDefaults {
    fn default() -> Self {
        Self {
            model: "gpt-4".to_string(),
            temperature: 0.7,
        }
    }
}

/// Validated, immutable per-request settings for one conversation run.
///
/// Only obtainable through [`RunConfiguration::new`] or
/// [`RunConfigPayload::into_configuration`], so a value of this type always
/// carries a usable base URL, credential and assistant id.
#[derive(Clone)]
pub struct RunConfiguration {
    base_url: String,
    api_key: String,
    assistant_id: String,
    model: Option<String>,
    temperature: Option<f64>,
    budget: Option<Duration>,
}

impl fmt::Debug for RunConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfiguration")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("assistant_id", &self.assistant_id)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("budget", &self.budget)
            .finish()
    }
}

impl RunConfiguration {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        assistant_id: impl Into<String>,
    ) -> Result<Self, RunError> {
        let base_url = required("baseUrl", Some(base_url.into()))?;
        let api_key = required("apiKey", Some(api_key.into()))?;
        let assistant_id = required("assistantId", Some(assistant_id.into()))?;

        let parsed = url::Url::parse(&base_url)
            .map_err(|e| RunError::ConfigurationInvalid(format!("baseUrl is not a URL: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(RunError::ConfigurationInvalid(format!(
                "baseUrl must use http or https, got {}",
                parsed.scheme()
            )));
        }

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            assistant_id,
            model: None,
            temperature: None,
            budget: None,
        })
    }

    /// Select a model. An empty name leaves the default in place.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        self.model = (!model.trim().is_empty()).then(|| model.trim().to_string());
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Result<Self, RunError> {
        if !temperature.is_finite() || !(0.0..=2.0).contains(&temperature) {
            return Err(RunError::ConfigurationInvalid(format!(
                "temperature must be between 0 and 2, got {temperature}"
            )));
        }
        self.temperature = Some(temperature);
        Ok(self)
    }

    /// Request a polling budget other than the server default.
    pub fn with_budget(mut self, budget: Duration) -> Result<Self, RunError> {
        if budget.is_zero() {
            return Err(RunError::ConfigurationInvalid(
                "timeoutSeconds must be positive".to_string(),
            ));
        }
        self.budget = Some(budget);
        Ok(self)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn assistant_id(&self) -> &str {
        &self.assistant_id
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn temperature(&self) -> Option<f64> {
        self.temperature
    }

    pub fn budget(&self) -> Option<Duration> {
        self.budget
    }
}

/// Run configuration exactly as a client sends it.
#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunConfigPayload {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub assistant_id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

impl fmt::Debug for RunConfigPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfigPayload")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("assistant_id", &self.assistant_id)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

impl RunConfigPayload {
    pub fn into_configuration(self) -> Result<RunConfiguration, RunError> {
        let mut missing = Vec::new();
        for (name, value) in [
            ("apiKey", &self.api_key),
            ("baseUrl", &self.base_url),
            ("assistantId", &self.assistant_id),
        ] {
            if value.as_deref().is_none_or(|v| v.trim().is_empty()) {
                missing.push(name);
            }
        }
        if !missing.is_empty() {
            return Err(RunError::ConfigurationInvalid(format!(
                "missing {}",
                missing.join(", ")
            )));
        }

        let mut config = RunConfiguration::new(
            self.base_url.unwrap_or_default(),
            self.api_key.unwrap_or_default(),
            self.assistant_id.unwrap_or_default(),
        )?;
        if let Some(model) = self.model {
            config = config.with_model(model);
        }
        if let Some(temperature) = self.temperature {
            config = config.with_temperature(temperature)?;
        }
        if let Some(secs) = self.timeout_seconds {
            config = config.with_budget(Duration::from_secs(secs))?;
        }
        Ok(config)
    }
}

fn required(name: &str, value: Option<String>) -> Result<String, RunError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(RunError::ConfigurationInvalid(format!("missing {name}"))),
    }
}
