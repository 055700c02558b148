//! Collaborator interface implemented once per job kind.
//!
//! The orchestrator never knows which scientific code it is running: an
//! adapter translates the caller's request into the executor's parameter
//! map, and the remote result back into the caller's output.

use std::future::Future;
use std::path::Path;

use rexec_core::error::CoreError;
use rexec_remote::messages::RemoteJobInfo;
use serde::Serialize;
use serde_json::{Map, Value};

/// What a processor returns to its caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionResult {
    pub mimetype: String,
    pub outputs: Value,
}

impl ExecutionResult {
    pub fn json(outputs: Value) -> Self {
        Self {
            mimetype: "application/json".to_string(),
            outputs,
        }
    }
}

/// Input and output preparation for one job kind.
///
/// Both hooks receive the job's working directory, which exists for the
/// whole call, and the caller's optional output selection. Returning
/// [`CoreError::Validation`] reports a bad request to the caller.
pub trait JobAdapter: Send + Sync {
    /// Short identifier used in logs.
    fn kind(&self) -> &str;

    /// Validate `request`, stage any files under `working_dir`, and return
    /// the parameters sent to the executor as `code_input_params`.
    fn prepare_input(
        &self,
        request: &Value,
        working_dir: &Path,
        outputs: Option<&Value>,
    ) -> impl Future<Output = Result<Map<String, Value>, CoreError>> + Send;

    /// Build the caller's result from the terminal job info and whatever
    /// the remote code left in `working_dir`.
    fn prepare_output(
        &self,
        info: &RemoteJobInfo,
        working_dir: &Path,
        outputs: Option<&Value>,
    ) -> impl Future<Output = Result<ExecutionResult, CoreError>> + Send;
}
