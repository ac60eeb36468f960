//! Typed request and response bodies for the assistant thread/run API.
//!
//! Every remote response is deserialized into the type for its operation.
//! Required fields are not optional here, so a body missing an `id` or a
//! `status` fails at the boundary instead of deep inside the orchestrator.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Response to `POST /threads`.
#[derive(Debug, Clone, Deserialize)]
pub struct ThreadObject {
    pub id: String,
}

/// Response to `DELETE /threads/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ThreadDeleted {
    pub id: String,
    #[serde(default)]
    pub deleted: bool,
}

/// Body of `POST /threads/{id}/messages`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateMessageRequest<'a> {
    pub role: MessageRole,
    pub content: &'a str,
}

/// Response to `POST /threads/{id}/messages`.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageObject {
    pub id: String,
}

/// Body of `POST /threads/{id}/runs`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateRunRequest {
    pub assistant_id: String,
    pub model: String,
    pub temperature: f64,
}

/// A run as reported by `POST /threads/{id}/runs` and
/// `GET /threads/{id}/runs/{run_id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct RunObject {
    pub id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub last_error: Option<RunLastError>,
}

/// Failure details attached to a run that ended badly.
#[derive(Debug, Clone, Deserialize)]
pub struct RunLastError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl RunLastError {
    /// Human-readable summary, preferring the message over the code.
    #[must_use]
    pub fn describe(&self) -> Option<String> {
        match (&self.code, &self.message) {
            (Some(code), Some(message)) => Some(format!("{code}: {message}")),
            (None, Some(message)) => Some(message.clone()),
            (Some(code), None) => Some(code.clone()),
            (None, None) => None,
        }
    }
}

/// Response to `GET /threads/{id}/messages`.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageList {
    pub data: Vec<ThreadMessage>,
}

/// A message stored on a thread.
#[derive(Debug, Clone, Deserialize)]
pub struct ThreadMessage {
    pub id: String,
    pub role: MessageRole,
    #[serde(default)]
    pub content: Vec<MessageContent>,
    #[serde(default)]
    pub run_id: Option<String>,
}

impl ThreadMessage {
    /// First non-blank text part, searching past non-text parts.
    #[must_use]
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(|part| match part {
            MessageContent::Text { text } if !text.value.trim().is_empty() => {
                Some(text.value.as_str())
            }
            _ => None,
        })
    }
}

/// Role of a message author on a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    #[serde(other)]
    Other,
}

/// A content part of a thread message.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text { text: TextContent },
    /// Images, files and anything this relay cannot render as text.
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TextContent {
    pub value: String,
}

/// Remote run status.
///
/// Statuses this crate does not know are kept verbatim in
/// [`RunStatus::Other`] and treated as still pending.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
    Other(String),
}

/// What the orchestrator does with a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// The run produced its output.
    Completed,
    /// The run stopped without output; no further transitions.
    Terminal,
    /// Keep polling.
    Pending,
}

impl RunStatus {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::RequiresAction => "requires_action",
            Self::Cancelling => "cancelling",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
            Self::Completed => "completed",
            Self::Incomplete => "incomplete",
            Self::Expired => "expired",
            Self::Other(s) => s,
        }
    }

    /// `requires_action` counts as terminal: this relay never submits tool
    /// outputs, so the run cannot progress.
    #[must_use]
    pub fn phase(&self) -> RunPhase {
        match self {
            Self::Completed => RunPhase::Completed,
            Self::Failed
            | Self::Cancelled
            | Self::Expired
            | Self::Incomplete
            | Self::RequiresAction => RunPhase::Terminal,
            Self::Queued | Self::InProgress | Self::Cancelling | Self::Other(_) => {
                RunPhase::Pending
            }
        }
    }
}

impl From<String> for RunStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "queued" => Self::Queued,
            "in_progress" => Self::InProgress,
            "requires_action" => Self::RequiresAction,
            "cancelling" => Self::Cancelling,
            "cancelled" => Self::Cancelled,
            "failed" => Self::Failed,
            "completed" => Self::Completed,
            "incomplete" => Self::Incomplete,
            "expired" => Self::Expired,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for RunStatus {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
