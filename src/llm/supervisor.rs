//! Run supervision: start a run and poll it to a terminal status or timeout.

use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use super::assistants::AssistantsBackend;
use super::clock::Clock;
use super::error::RunError;
use super::types::{CreateRunRequest, RunObject, RunPhase};
use super::{ConversationContext, RunConfiguration};

/// How long and how often to poll a run.
///
/// The budget is measured from the moment the run is created. With a
/// `backoff_factor` of `1.0` the interval stays fixed.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    pub budget: Duration,
    /// Upper bound for per-request budget overrides.
    pub max_budget: Duration,
    pub interval: Duration,
    pub max_interval: Duration,
    pub backoff_factor: f64,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            budget: Duration::from_secs(30),
            max_budget: Duration::from_secs(120),
            interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(5),
            backoff_factor: 1.0,
        }
    }
}

impl PollPolicy {
    /// Fixed-interval polling.
    #[must_use]
    pub fn fixed(budget: Duration, interval: Duration) -> Self {
        Self {
            budget,
            max_budget: budget,
            interval,
            max_interval: interval,
            backoff_factor: 1.0,
        }
    }

    /// Budget for one request, honouring an override up to `max_budget`.
    #[must_use]
    pub fn budget_for(&self, requested: Option<Duration>) -> Duration {
        requested.map_or(self.budget, |b| b.min(self.max_budget))
    }

    fn next_interval(&self, current: Duration) -> Duration {
        if self.backoff_factor <= 1.0 {
            return current;
        }
        Duration::try_from_secs_f64(current.as_secs_f64() * self.backoff_factor)
            .map_or(self.max_interval, |next| next.min(self.max_interval))
    }
}

/// A run that reached `completed`.
#[derive(Debug, Clone)]
pub struct CompletedRun {
    pub run_id: String,
    pub polls: u32,
    pub elapsed: Duration,
}

/// Starts one run on a thread and watches it until it settles.
#[derive(Debug, Clone, Copy)]
pub struct RunSupervisor<'a> {
    backend: &'a dyn AssistantsBackend,
    clock: &'a dyn Clock,
    policy: &'a PollPolicy,
}

impl<'a> RunSupervisor<'a> {
    pub fn new(
        backend: &'a dyn AssistantsBackend,
        clock: &'a dyn Clock,
        policy: &'a PollPolicy,
    ) -> Self {
        Self {
            backend,
            clock,
            policy,
        }
    }

    /// Start the run and poll it.
    ///
    /// Returns [`RunError::RunFailed`] as soon as a terminal non-completed
    /// status is seen and [`RunError::RunTimedOut`] once the budget is spent.
    #[instrument(
        name = "assistant.run.supervise",
        skip_all,
        fields(thread_id = %context.id, run_id = tracing::field::Empty)
    )]
    pub async fn supervise(
        &self,
        config: &RunConfiguration,
        context: &ConversationContext,
        request: &CreateRunRequest,
    ) -> Result<CompletedRun, RunError> {
        let run = self
            .backend
            .create_run(config, &context.id, request)
            .await?;
        let started = self.clock.now();
        tracing::Span::current().record("run_id", run.id.as_str());

        let budget = self.policy.budget_for(config.budget());
        info!(
            status = %run.status,
            model = %request.model,
            budget_secs = budget.as_secs_f64(),
            "Run started"
        );

        let RunObject {
            id: run_id,
            mut status,
            mut last_error,
        } = run;
        let mut interval = self.policy.interval;
        let mut polls = 0u32;

        loop {
            let elapsed = self.clock.now().saturating_duration_since(started);

            match status.phase() {
                RunPhase::Completed => {
                    info!(polls, elapsed_ms = elapsed.as_millis(), "Run completed");
                    return Ok(CompletedRun {
                        run_id,
                        polls,
                        elapsed,
                    });
                }
                RunPhase::Terminal => {
                    let reason = last_error.as_ref().and_then(|e| e.describe());
                    warn!(%status, reason = ?reason, polls, "Run ended without completing");
                    return Err(RunError::RunFailed {
                        run_id,
                        status,
                        reason,
                    });
                }
                RunPhase::Pending => {}
            }

            if elapsed >= budget {
                warn!(
                    %status,
                    polls,
                    elapsed_ms = elapsed.as_millis(),
                    "Run polling budget exhausted"
                );
                return Err(RunError::RunTimedOut {
                    run_id,
                    elapsed,
                    last_status: status,
                });
            }

            self.clock.sleep(interval.min(budget - elapsed)).await;

            let snapshot = self
                .backend
                .retrieve_run(config, &context.id, &run_id)
                .await?;
            polls += 1;
            debug!(status = %snapshot.status, polls, "Run status polled");

            status = snapshot.status;
            last_error = snapshot.last_error;
            interval = self.policy.next_interval(interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_override_is_capped() {
        let policy = PollPolicy::default();
        assert_eq!(policy.budget_for(None), Duration::from_secs(30));
        assert_eq!(
            policy.budget_for(Some(Duration::from_secs(60))),
            Duration::from_secs(60)
        );
        assert_eq!(
            policy.budget_for(Some(Duration::from_secs(600))),
            Duration::from_secs(120)
        );
    }

    #[test]
    fn test_fixed_interval_does_not_grow() {
        let policy = PollPolicy::fixed(Duration::from_secs(30), Duration::from_secs(1));
        assert_eq!(
            policy.next_interval(Duration::from_secs(1)),
            Duration::from_secs(1)
        );
    }

    #[test]
    fn test_backoff_grows_to_cap() {
        let policy = PollPolicy {
            backoff_factor: 2.0,
            max_interval: Duration::from_secs(3),
            ..PollPolicy::default()
        };
        let second = policy.next_interval(Duration::from_secs(1));
        assert_eq!(second, Duration::from_secs(2));
        assert_eq!(policy.next_interval(second), Duration::from_secs(3));
    }

    #[test]
    fn test_huge_backoff_saturates_at_cap() {
        let policy = PollPolicy {
            backoff_factor: 1e300,
            max_interval: Duration::from_secs(5),
            ..PollPolicy::default()
        };
        assert_eq!(
            policy.next_interval(Duration::from_secs(1)),
            Duration::from_secs(5)
        );
    }
}
