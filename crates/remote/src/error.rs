use std::time::Duration;

/// Errors from the raw HTTP layer ([`crate::api::RemoteExecutorApi`]).
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The configured base URL cannot be used.
    #[error("Invalid executor URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The executor returned a non-2xx status.
    #[error("{message}")]
    Status {
        status: u16,
        /// `Message` from the body, or the raw body.
        message: String,
    },

    /// A 2xx body did not match the expected shape.
    #[error("Invalid response body: {0}")]
    Decode(String),
}

/// Outcome classes of a remote run.
///
/// The variants differ in what the caller should do with the job's
/// working directory; see [`RemoteError::discards_working_dir`].
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// The executor refused the job, or could not be reached, before it
    /// started.
    #[error("{message}")]
    Submission {
        status: Option<u16>,
        message: String,
    },

    /// The submission request was sent but its outcome is unknown (the
    /// request timed out or the connection dropped mid-response).
    #[error("Lost contact with the remote executor while submitting job '{job_id}': {message}")]
    Interrupted { job_id: String, message: String },

    /// A status check failed. The job may still be running remotely.
    #[error("{message}")]
    Poll {
        job_id: String,
        status: Option<u16>,
        message: String,
    },

    /// The job ran and exited non-zero. Carries no error-stream text.
    #[error("The job '{job_id}' exited with code {exit_code}")]
    JobFailed { job_id: String, exit_code: i64 },

    /// The configured polling budget ran out before the job finished.
    #[error("The job '{job_id}' did not finish after {polls} status checks ({elapsed:?})")]
    PollTimeout {
        job_id: String,
        polls: u32,
        elapsed: Duration,
    },

    /// Waiting was cancelled locally. The remote job is not aborted.
    #[error("Waiting for job '{job_id}' was cancelled")]
    Cancelled { job_id: String },

    /// A success response carried a body that is not valid job info.
    #[error("Invalid response from the remote executor for job '{job_id}': {message}")]
    MalformedResponse { job_id: String, message: String },
}

impl RemoteError {
    /// Whether the failure proves the job never started remotely, making
    /// any staged inputs garbage.
    ///
    /// Only submission rejections qualify. Every other class keeps the
    /// directory: the job may still be running, or its files are needed
    /// for inspection.
    pub fn discards_working_dir(&self) -> bool {
        matches!(self, Self::Submission { .. })
    }
}
