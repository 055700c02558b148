//! Identity and mode types shared by the client and the orchestrator.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Caller-assigned identifier of one job.
///
/// The id doubles as the name of the job's working directory, so it must
/// be a single, non-empty path component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Validate `raw` and wrap it.
    ///
    /// Rejects empty ids, `.`/`..`, and anything containing a path
    /// separator or NUL byte.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        if raw.trim().is_empty() {
            return Err(CoreError::Usage(
                "A job id must be assigned before execution".into(),
            ));
        }
        if raw == "." || raw == ".." || raw.contains(['/', '\\', '\0']) {
            return Err(CoreError::Usage(format!(
                "Job id '{}' is not a valid directory name",
                raw.escape_default()
            )));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for JobId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// How the remote executor is asked to run a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// The submission response is the terminal job info.
    #[default]
    Synchronous,
    /// The submission is acknowledged immediately; completion is polled.
    Asynchronous,
}

impl ExecutionMode {
    pub fn from_synch_flag(synch: bool) -> Self {
        if synch {
            Self::Synchronous
        } else {
            Self::Asynchronous
        }
    }

    /// Value sent as `application_params.synch_execution`.
    pub fn is_synchronous(self) -> bool {
        matches!(self, Self::Synchronous)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Synchronous => "synchronous",
            Self::Asynchronous => "asynchronous",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
