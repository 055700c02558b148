//! End-to-end remote run: submit, optionally poll, check the exit code.

use rexec_core::types::{ExecutionMode, JobId};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::api::{decode, RemoteExecutorApi};
use crate::error::{ApiError, RemoteError};
use crate::messages::{RemoteJobInfo, RemoteSubmission};
use crate::poll::{poll_until_finished, PollPolicy};

/// Drives one job through the remote executor protocol.
#[derive(Debug, Clone)]
pub struct RemoteExecutionClient {
    api: RemoteExecutorApi,
}

impl RemoteExecutionClient {
    pub fn new(api: RemoteExecutorApi) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &RemoteExecutorApi {
        &self.api
    }

    /// Submit `code_input_params` for `job_id` and wait for the terminal
    /// job info.
    ///
    /// In [`ExecutionMode::Synchronous`] the submission response is the
    /// result. In [`ExecutionMode::Asynchronous`] the job is polled
    /// according to `policy`. A finished job with a non-zero exit code is
    /// returned as [`RemoteError::JobFailed`]; its error stream is logged
    /// here and goes no further.
    pub async fn run(
        &self,
        job_id: &JobId,
        mode: ExecutionMode,
        code_input_params: &Map<String, Value>,
        policy: &PollPolicy,
        cancel: &CancellationToken,
    ) -> Result<RemoteJobInfo, RemoteError> {
        let submission = RemoteSubmission::new(job_id, mode, code_input_params);

        let body = tokio::select! {
            _ = cancel.cancelled() => {
                return Err(RemoteError::Cancelled { job_id: job_id.to_string() });
            }
            result = self.api.submit(&submission) => {
                result.map_err(|e| submission_error(job_id, e))?
            }
        };

        tracing::info!(job_id = %job_id, mode = %mode, "Job submitted to remote executor");

        // A success status means the job has started remotely.
        let info = match mode {
            ExecutionMode::Synchronous => {
                decode::<RemoteJobInfo>(&body).map_err(|e| RemoteError::MalformedResponse {
                    job_id: job_id.to_string(),
                    message: e.to_string(),
                })?
            }
            ExecutionMode::Asynchronous => {
                poll_until_finished(&self.api, job_id, policy, cancel).await?
            }
        };

        check_exit_code(job_id, info)
    }
}

fn submission_error(job_id: &JobId, err: ApiError) -> RemoteError {
    match err {
        ApiError::Status { status, message } => {
            tracing::warn!(job_id = %job_id, status, message = %message, "Remote executor rejected job");
            RemoteError::Submission {
                status: Some(status),
                message,
            }
        }
        // Never connected, so the job cannot have started.
        ApiError::Request(e) if e.is_connect() => {
            tracing::warn!(job_id = %job_id, error = %e, "Could not reach remote executor");
            RemoteError::Submission {
                status: None,
                message: e.to_string(),
            }
        }
        // The request went out; the job may be running.
        ApiError::Request(e) if e.is_timeout() || e.is_body() || e.is_decode() => {
            tracing::warn!(job_id = %job_id, error = %e, "Submission outcome unknown");
            RemoteError::Interrupted {
                job_id: job_id.to_string(),
                message: e.to_string(),
            }
        }
        other => {
            tracing::warn!(job_id = %job_id, error = %other, "Could not submit job");
            RemoteError::Submission {
                status: None,
                message: other.to_string(),
            }
        }
    }
}

fn check_exit_code(job_id: &JobId, info: RemoteJobInfo) -> Result<RemoteJobInfo, RemoteError> {
    if info.succeeded() {
        tracing::info!(job_id = %job_id, "Remote job finished");
        return Ok(info);
    }

    let exit_code = info.job_info.exit_code;
    tracing::error!(
        job_id = %job_id,
        exit_code,
        std_err = %info.job_info.std_err,
        "Remote job exited with a non-zero code",
    );
    Err(RemoteError::JobFailed {
        job_id: job_id.to_string(),
        exit_code,
    })
}
