//! Wire types exchanged with the remote executor.

use rexec_core::types::{ExecutionMode, JobId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of `POST <base>/execute`.
#[derive(Debug, Serialize)]
pub struct RemoteSubmission<'a> {
    pub application_params: ApplicationParams<'a>,
    /// Opaque parameters produced by the job-kind adapter.
    pub code_input_params: &'a Map<String, Value>,
}

#[derive(Debug, Serialize)]
pub struct ApplicationParams<'a> {
    pub job_id: &'a JobId,
    pub synch_execution: bool,
}

impl<'a> RemoteSubmission<'a> {
    pub fn new(job_id: &'a JobId, mode: ExecutionMode, params: &'a Map<String, Value>) -> Self {
        Self {
            application_params: ApplicationParams {
                job_id,
                synch_execution: mode.is_synchronous(),
            },
            code_input_params: params,
        }
    }
}

/// Job status document returned by `execute` (synchronous mode) and
/// `job_info/<job_id>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteJobInfo {
    #[serde(default)]
    pub job_id: String,
    pub job_info: JobInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobInfo {
    /// `true` once the remote process has exited.
    pub end_processing: bool,
    /// Exit code of the remote process. Only meaningful once
    /// `end_processing` is set.
    pub exit_code: i64,
    /// Captured error stream. Logged on failure, never returned to callers.
    #[serde(default)]
    pub std_err: String,
    /// Parameters the remote code ran with, e.g. output file names.
    #[serde(default)]
    pub params: Map<String, Value>,
    /// Any further fields the executor reports.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RemoteJobInfo {
    pub fn is_finished(&self) -> bool {
        self.job_info.end_processing
    }

    pub fn succeeded(&self) -> bool {
        self.job_info.exit_code == 0
    }
}

/// Pull a human-readable message out of an error response body.
///
/// Uses the `Message` field when the body is a JSON object carrying one,
/// otherwise the raw body text, otherwise the status line.
pub fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(body) {
        match obj.get("Message") {
            Some(Value::String(message)) => return message.clone(),
            Some(Value::Null) | None => {}
            Some(other) => return other.to_string(),
        }
    }

    let raw = body.trim();
    if raw.is_empty() {
        format!("Remote executor responded with {status}")
    } else {
        raw.to_string()
    }
}
