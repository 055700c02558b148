use rexec_core::error::CoreError;
use rexec_remote::error::RemoteError;

/// Error returned by [`crate::orchestrator::ExecutionOrchestrator::execute`].
///
/// Both variants are transparent: the caller sees the message of the
/// stage that failed, unchanged.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    /// Usage, directory, input or output preparation failure.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Submission, polling or remote job failure.
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl ExecutionError {
    /// `true` for caller/integration bugs such as a missing job id.
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::Core(CoreError::Usage(_)))
    }

    /// `true` when the request itself was rejected by the adapter.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Core(CoreError::Validation(_)))
    }
}
