//! Completion polling for remote tuning jobs.
//!
//! A submitted job moves `PENDING -> ACTIVE | FAILED | CANCELLED` on the
//! service side. [`JobPoller::poll`] checks the status, sleeps for the policy
//! interval while the job is still pending, and stops at the first terminal
//! state. The first check happens immediately.

use std::time::Duration;

use crate::core::{JobId, JobStatus, Sleeper, TunedModel, TuningError, TuningService};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// `None` waits for as long as the job stays pending.
    pub max_attempts: Option<u32>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: None,
        }
    }
}

impl PollPolicy {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            max_attempts: None,
        }
    }

    /// `0` leaves the wait unbounded, the same as `max_poll_attempts = 0` in
    /// the config file.
    pub fn with_max_attempts(self, max_attempts: u32) -> Self {
        Self {
            max_attempts: (max_attempts > 0).then_some(max_attempts),
            ..self
        }
    }
}

pub struct JobPoller<'a> {
    service: &'a dyn TuningService,
    sleeper: &'a dyn Sleeper,
    policy: PollPolicy,
}

impl<'a> JobPoller<'a> {
    pub fn new(service: &'a dyn TuningService, sleeper: &'a dyn Sleeper, policy: PollPolicy) -> Self {
        Self {
            service,
            sleeper,
            policy,
        }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Waits for `job` to reach a terminal state and resolves the tuned model
    /// once it is `ACTIVE`.
    pub async fn poll(&self, job: &JobId) -> Result<TunedModel, TuningError> {
        let mut attempts: u32 = 0;
        loop {
            let status = self.service.status(job).await.map_err(|err| {
                tracing::error!(job = %job, error = %err, "tuning job status check failed");
                err
            })?;
            attempts = attempts.saturating_add(1);
            tracing::info!(job = %job, status = %status, attempt = attempts, "tuning job status");

            match status {
                JobStatus::Active => {
                    let model = self.service.resolve(job).await?;
                    tracing::info!(job = %job, model = %model.name, "tuning completed");
                    return Ok(model);
                }
                JobStatus::Failed | JobStatus::Cancelled => {
                    tracing::error!(job = %job, status = %status, "tuning job did not succeed");
                    return Err(TuningError::JobFailed {
                        job: job.clone(),
                        status,
                    });
                }
                JobStatus::Pending => {}
            }

            if let Some(max) = self.policy.max_attempts {
                if attempts >= max {
                    tracing::error!(job = %job, attempts, "giving up on tuning job");
                    return Err(TuningError::PollLimitExceeded {
                        job: job.clone(),
                        attempts,
                    });
                }
            }

            self.sleeper.sleep(self.policy.interval).await;
        }
    }
}
