//! Reading the assistant's answer back off a thread.

use serde::Serialize;

use super::error::RunError;
use super::types::{MessageList, MessageRole, ThreadMessage};

/// Text produced by the assistant for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reply {
    pub text: String,
    pub message_id: String,
    pub run_id: String,
    pub thread_id: String,
}

/// Pick the reply for `run_id` out of a newest-first message list.
///
/// The newest assistant message wins. Assistant messages explicitly tagged
/// with a different run are skipped; untagged ones are accepted.
pub fn extract_reply(
    messages: &MessageList,
    run_id: &str,
    thread_id: &str,
) -> Result<Reply, RunError> {
    let Some(message) = messages
        .data
        .iter()
        .find(|m| m.role == MessageRole::Assistant && belongs_to(m, run_id))
    else {
        return Err(RunError::ReplyMissing(format!(
            "no assistant message on thread {thread_id}"
        )));
    };

    let text = message.first_text().ok_or_else(|| {
        RunError::ReplyMissing(format!("assistant message {} has no text", message.id))
    })?;

    Ok(Reply {
        text: text.to_string(),
        message_id: message.id.clone(),
        run_id: run_id.to_string(),
        thread_id: thread_id.to_string(),
    })
}

fn belongs_to(message: &ThreadMessage, run_id: &str) -> bool {
    message.run_id.as_deref().is_none_or(|id| id == run_id)
}
