//! Error taxonomy for a single relayed conversation run.

use std::fmt;
use std::time::Duration;

use super::types::RunStatus;

/// A remote operation issued against the assistant service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CreateThread,
    CreateMessage,
    CreateRun,
    RetrieveRun,
    ListMessages,
    DeleteThread,
}

impl Operation {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateThread => "create thread",
            Self::CreateMessage => "create message",
            Self::CreateRun => "create run",
            Self::RetrieveRun => "retrieve run",
            Self::ListMessages => "list messages",
            Self::DeleteThread => "delete thread",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced while orchestrating a conversation run.
///
/// The variant returned to a caller is always the first failure of the
/// primary sequence. [`RunError::ReclaimFailed`] is only ever logged.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// Required configuration is missing or malformed. No remote call was made.
    #[error("Invalid configuration: {0}")]
    ConfigurationInvalid(String),

    /// The caller submitted an empty message. No remote call was made.
    #[error("Message must not be empty")]
    EmptyMessage,

    /// The assistant service could not be reached.
    #[error("Assistant service unavailable during {operation}: {message}")]
    RemoteUnavailable {
        operation: Operation,
        message: String,
    },

    /// The assistant service answered with a non-success status or a body
    /// that did not match the expected shape.
    #[error("Assistant service rejected {operation}{}: {message}", fmt_status(.status.as_ref()))]
    RemoteRejected {
        operation: Operation,
        status: Option<u16>,
        message: String,
    },

    /// The run reached a terminal status other than `completed`.
    #[error("Run {run_id} ended with status {status}{}", fmt_reason(.reason.as_deref()))]
    RunFailed {
        run_id: String,
        status: RunStatus,
        reason: Option<String>,
    },

    /// The polling budget elapsed before the run reached a terminal status.
    #[error("Run timed out after {}s (last status: {last_status})", .elapsed.as_secs())]
    RunTimedOut {
        run_id: String,
        elapsed: Duration,
        last_status: RunStatus,
    },

    /// The run completed but produced no assistant text.
    #[error("No reply received: {0}")]
    ReplyMissing(String),

    /// The caller cancelled the run.
    #[error("Run cancelled")]
    Cancelled,

    /// Deleting the thread failed. Logged, never surfaced.
    #[error("Failed to delete thread {thread_id}: {source}")]
    ReclaimFailed {
        thread_id: String,
        #[source]
        source: Box<RunError>,
    },
}

impl RunError {
    pub(crate) fn unavailable(operation: Operation, message: impl Into<String>) -> Self {
        Self::RemoteUnavailable {
            operation,
            message: message.into(),
        }
    }

    pub(crate) fn rejected(
        operation: Operation,
        status: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        Self::RemoteRejected {
            operation,
            status,
            message: message.into(),
        }
    }

    /// Whether the failure was decided locally, before any remote call.
    #[must_use]
    pub fn is_request_error(&self) -> bool {
        matches!(self, Self::ConfigurationInvalid(_) | Self::EmptyMessage)
    }
}

fn fmt_status(status: Option<&u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

fn fmt_reason(reason: Option<&str>) -> String {
    reason.map(|r| format!(": {r}")).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_message_includes_status() {
        let err = RunError::rejected(Operation::CreateRun, Some(404), "No assistant found");
        assert_eq!(
            err.to_string(),
            "Assistant service rejected create run (HTTP 404): No assistant found"
        );
    }

    #[test]
    fn test_rejected_message_without_status() {
        let err = RunError::rejected(Operation::ListMessages, None, "bad body");
        assert_eq!(
            err.to_string(),
            "Assistant service rejected list messages: bad body"
        );
    }

    #[test]
    fn test_run_failed_message_with_reason() {
        let err = RunError::RunFailed {
            run_id: "run_1".to_string(),
            status: RunStatus::Failed,
            reason: Some("rate_limit_exceeded".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Run run_1 ended with status failed: rate_limit_exceeded"
        );
    }

    #[test]
    fn test_timed_out_message() {
        let err = RunError::RunTimedOut {
            run_id: "run_1".to_string(),
            elapsed: Duration::from_secs(30),
            last_status: RunStatus::InProgress,
        };
        assert_eq!(
            err.to_string(),
            "Run timed out after 30s (last status: in_progress)"
        );
    }

    #[test]
    fn test_request_errors() {
        assert!(RunError::EmptyMessage.is_request_error());
        assert!(RunError::ConfigurationInvalid("x".into()).is_request_error());
        assert!(!RunError::Cancelled.is_request_error());
    }
}
