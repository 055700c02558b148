//! Status polling for asynchronously executed jobs.
//!
//! [`poll_until_finished`] sleeps one interval, asks the executor for the
//! job's status, and repeats until the job reports `end_processing`, the
//! [`PollPolicy`] budget runs out, or the [`CancellationToken`] fires.

use std::time::{Duration, Instant};

use rexec_core::types::JobId;
use tokio_util::sync::CancellationToken;

use crate::api::RemoteExecutorApi;
use crate::error::{ApiError, RemoteError};
use crate::messages::RemoteJobInfo;

/// Default wait between status checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// How often and for how long to poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    /// Sleep before every status check.
    pub interval: Duration,
    /// Give up once another poll would land past this much wall-clock time.
    pub max_wait: Option<Duration>,
    /// Give up after this many unfinished status checks.
    pub max_polls: Option<u32>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_wait: None,
            max_polls: None,
        }
    }
}

impl PollPolicy {
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }

    /// Whether another status check fits in the budget after `polls`
    /// checks and `elapsed` time.
    ///
    /// The first check is always allowed: the job has already been
    /// submitted, so its status is looked at least once.
    pub fn allows_another_poll(&self, polls: u32, elapsed: Duration) -> bool {
        if polls == 0 {
            return true;
        }
        if self.max_polls.is_some_and(|max| polls >= max) {
            return false;
        }
        match self.max_wait {
            Some(max_wait) => elapsed.saturating_add(self.interval) <= max_wait,
            None => true,
        }
    }
}

/// Poll `job_info/<job_id>` until the job finishes.
///
/// Returns the first job info with `end_processing == true`; the exit code
/// is not inspected here.
pub async fn poll_until_finished(
    api: &RemoteExecutorApi,
    job_id: &JobId,
    policy: &PollPolicy,
    cancel: &CancellationToken,
) -> Result<RemoteJobInfo, RemoteError> {
    let started = Instant::now();
    let mut polls = 0u32;

    loop {
        if !policy.allows_another_poll(polls, started.elapsed()) {
            tracing::warn!(
                job_id = %job_id,
                polls,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Polling budget exhausted",
            );
            return Err(RemoteError::PollTimeout {
                job_id: job_id.to_string(),
                polls,
                elapsed: started.elapsed(),
            });
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!(job_id = %job_id, polls, "Polling cancelled");
                return Err(RemoteError::Cancelled { job_id: job_id.to_string() });
            }
            _ = tokio::time::sleep(policy.interval) => {}
        }

        polls += 1;
        let info = api
            .job_info(job_id)
            .await
            .map_err(|e| poll_error(job_id, e))?;

        tracing::debug!(
            job_id = %job_id,
            attempt = polls,
            end_processing = info.job_info.end_processing,
            "Polled remote job",
        );

        if info.is_finished() {
            return Ok(info);
        }
    }
}

fn poll_error(job_id: &JobId, err: ApiError) -> RemoteError {
    let job_id = job_id.to_string();
    match err {
        ApiError::Status { status, message } => {
            tracing::warn!(job_id = %job_id, status, message = %message, "Status check rejected");
            RemoteError::Poll {
                job_id,
                status: Some(status),
                message,
            }
        }
        ApiError::Decode(message) => RemoteError::MalformedResponse { job_id, message },
        other => {
            tracing::warn!(job_id = %job_id, error = %other, "Status check failed");
            RemoteError::Poll {
                job_id,
                status: None,
                message: other.to_string(),
            }
        }
    }
}
