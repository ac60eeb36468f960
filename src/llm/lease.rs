//! Scoped ownership of a remote conversation thread.
//!
//! A [`ContextLease`] exists only once a thread has been created, and the
//! thread is deleted exactly once when the lease goes away: through
//! [`ContextLease::release`] on the normal path, or from `Drop` when the
//! owning future was cancelled before it could release. Both paths issue
//! the delete from a spawned task, so cancelling the owner mid-delete does
//! not abandon it.

use std::sync::Arc;

use tracing::{debug, error, warn};

use super::assistants::AssistantsBackend;
use super::error::RunError;
use super::{ConversationContext, RunConfiguration};

pub struct ContextLease {
    backend: Arc<dyn AssistantsBackend>,
    config: Arc<RunConfiguration>,
    context: ConversationContext,
    released: bool,
}

impl std::fmt::Debug for ContextLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextLease")
            .field("context", &self.context)
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}

impl ContextLease {
    pub(crate) fn new(
        backend: Arc<dyn AssistantsBackend>,
        config: Arc<RunConfiguration>,
        context: ConversationContext,
    ) -> Self {
        Self {
            backend,
            config,
            context,
            released: false,
        }
    }

    pub fn context(&self) -> &ConversationContext {
        &self.context
    }

    /// Delete the thread. Failures are logged and swallowed.
    ///
    /// The delete runs on its own task, so it completes even if the caller
    /// stops waiting for it.
    pub async fn release(mut self) {
        self.released = true;
        let backend = Arc::clone(&self.backend);
        let config = Arc::clone(&self.config);
        let thread_id = self.context.id.clone();
        let task = tokio::spawn(async move {
            reclaim(backend.as_ref(), &config, &thread_id).await;
        });
        if let Err(e) = task.await {
            error!(thread_id = %self.context.id, error = %e, "Thread reclaim task failed");
        }
    }
}

impl Drop for ContextLease {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        let thread_id = self.context.id.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                warn!(
                    thread_id = %thread_id,
                    "Thread lease dropped before release, reclaiming in background"
                );
                let backend = Arc::clone(&self.backend);
                let config = Arc::clone(&self.config);
                handle.spawn(async move {
                    reclaim(backend.as_ref(), &config, &thread_id).await;
                });
            }
            Err(_) => {
                error!(
                    thread_id = %thread_id,
                    "Thread lease dropped outside a runtime, thread left on the remote service"
                );
            }
        }
    }
}

async fn reclaim(backend: &dyn AssistantsBackend, config: &RunConfiguration, thread_id: &str) {
    match backend.delete_thread(config, thread_id).await {
        Ok(deleted) if deleted.deleted => {
            debug!(thread_id = %thread_id, "Thread deleted");
        }
        Ok(_) => {
            warn!(thread_id = %thread_id, "Assistant service did not confirm thread deletion");
        }
        Err(source) => {
            let err = RunError::ReclaimFailed {
                thread_id: thread_id.to_string(),
                source: Box::new(source),
            };
            error!(error = %err, "Cleanup failed");
        }
    }
}
