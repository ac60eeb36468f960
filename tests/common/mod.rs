//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use assistant_relay::llm::types::{
    CreateRunRequest, MessageContent, MessageList, MessageObject, MessageRole, RunObject,
    RunStatus, TextContent, ThreadDeleted, ThreadMessage, ThreadObject,
};
use assistant_relay::llm::{AssistantsBackend, Operation, RunConfiguration, RunError};
use async_trait::async_trait;
use tokio::sync::Notify;

pub const THREAD_ID: &str = "thread_abc";
pub const RUN_ID: &str = "run_abc";
pub const REPLY_TEXT: &str = "Our wide-fit runner comes in sizes 38 to 47.";

/// In-memory assistant backend that follows a script and records calls.
#[derive(Debug)]
pub struct ScriptedBackend {
    calls: Mutex<Vec<Operation>>,
    statuses: Mutex<VecDeque<RunStatus>>,
    messages: Mutex<MessageList>,
    failures: Mutex<Vec<Operation>>,
    hang_on_retrieve: bool,
    gate_delete: bool,
    completed_deletes: AtomicUsize,
    last_run_request: Mutex<Option<CreateRunRequest>>,
    /// Signalled on the first status poll.
    pub polling: Notify,
    /// Signalled whenever a delete finishes.
    pub deleted: Notify,
    /// Signalled when a delete begins.
    pub delete_started: Notify,
    /// Opens a gated delete.
    pub delete_gate: Notify,
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            statuses: Mutex::new(VecDeque::from([RunStatus::Completed])),
            messages: Mutex::new(assistant_reply(REPLY_TEXT, Some(RUN_ID))),
            failures: Mutex::new(Vec::new()),
            hang_on_retrieve: false,
            gate_delete: false,
            completed_deletes: AtomicUsize::new(0),
            last_run_request: Mutex::new(None),
            polling: Notify::new(),
            deleted: Notify::new(),
            delete_started: Notify::new(),
            delete_gate: Notify::new(),
        }
    }
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Statuses returned by successive polls; the last one repeats.
    pub fn with_statuses(statuses: &[&str]) -> Self {
        Self {
            statuses: Mutex::new(statuses.iter().map(|s| RunStatus::from(*s)).collect()),
            ..Self::default()
        }
    }

    /// Polls never return.
    pub fn hanging() -> Self {
        Self {
            hang_on_retrieve: true,
            ..Self::default()
        }
    }

    /// Deletes wait for `delete_gate` before finishing.
    pub fn gated_delete(self) -> Self {
        Self {
            gate_delete: true,
            ..self
        }
    }

    pub fn messages(self, messages: MessageList) -> Self {
        *self.messages.lock().unwrap() = messages;
        self
    }

    pub fn failing(self, operation: Operation) -> Self {
        self.failures.lock().unwrap().push(operation);
        self
    }

    pub fn count(&self, operation: Operation) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|op| **op == operation)
            .count()
    }

    pub fn completed_deletes(&self) -> usize {
        self.completed_deletes.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<Operation> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_run_request(&self) -> Option<CreateRunRequest> {
        self.last_run_request.lock().unwrap().clone()
    }

    fn record(&self, operation: Operation) -> Result<(), RunError> {
        self.calls.lock().unwrap().push(operation);
        if self.failures.lock().unwrap().contains(&operation) {
            return Err(RunError::RemoteRejected {
                operation,
                status: Some(500),
                message: "scripted failure".to_string(),
            });
        }
        Ok(())
    }

    fn next_status(&self) -> RunStatus {
        let mut statuses = self.statuses.lock().unwrap();
        if statuses.len() > 1 {
            statuses.pop_front().unwrap()
        } else {
            statuses.front().cloned().unwrap_or(RunStatus::Completed)
        }
    }
}

#[async_trait]
impl AssistantsBackend for ScriptedBackend {
    async fn create_thread(&self, _config: &RunConfiguration) -> Result<ThreadObject, RunError> {
        self.record(Operation::CreateThread)?;
        Ok(ThreadObject {
            id: THREAD_ID.to_string(),
        })
    }

    async fn create_message(
        &self,
        _config: &RunConfiguration,
        _thread_id: &str,
        _content: &str,
    ) -> Result<MessageObject, RunError> {
        self.record(Operation::CreateMessage)?;
        Ok(MessageObject {
            id: "msg_user".to_string(),
        })
    }

    async fn create_run(
        &self,
        _config: &RunConfiguration,
        _thread_id: &str,
        request: &CreateRunRequest,
    ) -> Result<RunObject, RunError> {
        self.record(Operation::CreateRun)?;
        *self.last_run_request.lock().unwrap() = Some(request.clone());
        Ok(RunObject {
            id: RUN_ID.to_string(),
            status: RunStatus::Queued,
            last_error: None,
        })
    }

    async fn retrieve_run(
        &self,
        _config: &RunConfiguration,
        _thread_id: &str,
        run_id: &str,
    ) -> Result<RunObject, RunError> {
        self.record(Operation::RetrieveRun)?;
        self.polling.notify_one();
        if self.hang_on_retrieve {
            std::future::pending::<()>().await;
        }
        Ok(RunObject {
            id: run_id.to_string(),
            status: self.next_status(),
            last_error: None,
        })
    }

    async fn list_messages(
        &self,
        _config: &RunConfiguration,
        _thread_id: &str,
    ) -> Result<MessageList, RunError> {
        self.record(Operation::ListMessages)?;
        Ok(self.messages.lock().unwrap().clone())
    }

    async fn delete_thread(
        &self,
        _config: &RunConfiguration,
        thread_id: &str,
    ) -> Result<ThreadDeleted, RunError> {
        let outcome = self.record(Operation::DeleteThread);
        self.delete_started.notify_one();
        if self.gate_delete {
            self.delete_gate.notified().await;
        }
        self.completed_deletes.fetch_add(1, Ordering::SeqCst);
        self.deleted.notify_one();
        outcome?;
        Ok(ThreadDeleted {
            id: thread_id.to_string(),
            deleted: true,
        })
    }
}

/// A newest-first message list holding one assistant reply and the user turn.
pub fn assistant_reply(text: &str, run_id: Option<&str>) -> MessageList {
    MessageList {
        data: vec![
            ThreadMessage {
                id: "msg_assistant".to_string(),
                role: MessageRole::Assistant,
                content: vec![MessageContent::Text {
                    text: TextContent {
                        value: text.to_string(),
                    },
                }],
                run_id: run_id.map(str::to_string),
            },
            ThreadMessage {
                id: "msg_user".to_string(),
                role: MessageRole::User,
                content: vec![MessageContent::Text {
                    text: TextContent {
                        value: "Do you have wide shoes?".to_string(),
                    },
                }],
                run_id: None,
            },
        ],
    }
}

pub fn run_config() -> RunConfiguration {
    RunConfiguration::new("https://api.openai.com", "sk-test", "asst_shoes").unwrap()
}
