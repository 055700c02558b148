//! Lifecycle of one remote job.
//!
//! [`ExecutionOrchestrator::execute`] runs the stages in order:
//! 1. Validate the job id.
//! 2. Create the job's working directory.
//! 3. Prepare inputs (adapter).
//! 4. Submit and wait (remote client).
//! 5. Prepare outputs (adapter).
//!
//! Cleanup is all-or-nothing up to a successful submission: a failure in
//! stage 3, or a rejected submission, removes the working directory.
//! From then on the directory is kept, because the remote job may still be
//! running or its files are needed for inspection.

use std::path::{Path, PathBuf};

use rexec_core::error::CoreError;
use rexec_core::types::{ExecutionMode, JobId};
use rexec_core::workdir::WorkingDirectoryManager;
use rexec_remote::api::RemoteExecutorApi;
use rexec_remote::client::RemoteExecutionClient;
use rexec_remote::poll::PollPolicy;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::adapter::{ExecutionResult, JobAdapter};
use crate::config::ProcessorConfig;
use crate::error::ExecutionError;

/// Runs jobs of one kind against one remote executor.
///
/// Holds no per-job state, so a single instance can serve concurrent
/// executions as long as their job ids differ.
pub struct ExecutionOrchestrator<A> {
    adapter: A,
    workdirs: WorkingDirectoryManager,
    client: RemoteExecutionClient,
    mode: ExecutionMode,
    policy: PollPolicy,
}

impl<A: JobAdapter> ExecutionOrchestrator<A> {
    /// Validate `config`, create the processor root directory, and build
    /// the HTTP client.
    pub async fn new(config: &ProcessorConfig, adapter: A) -> Result<Self, ExecutionError> {
        config.validate()?;

        let api = RemoteExecutorApi::new(&config.url_executor, config.request_timeout()?)
            .map_err(|e| CoreError::Usage(e.to_string()))?;

        let workdirs = WorkingDirectoryManager::new(&config.private_processor_dir);
        workdirs.ensure_root().await?;

        tracing::info!(
            kind = adapter.kind(),
            root = %workdirs.root().display(),
            executor = api.base_url(),
            mode = %config.execution_mode(),
            "Remote execution processor ready",
        );

        Ok(Self::from_parts(
            adapter,
            workdirs,
            RemoteExecutionClient::new(api),
            config.execution_mode(),
            config.poll_policy()?,
        ))
    }

    /// Assemble from already-built parts. Performs no I/O.
    pub fn from_parts(
        adapter: A,
        workdirs: WorkingDirectoryManager,
        client: RemoteExecutionClient,
        mode: ExecutionMode,
        policy: PollPolicy,
    ) -> Self {
        Self {
            adapter,
            workdirs,
            client,
            mode,
            policy,
        }
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Where the working directory of `job_id` lives.
    pub fn working_dir(&self, job_id: &JobId) -> PathBuf {
        self.workdirs.job_dir(job_id)
    }

    /// Run `request` as job `job_id` and return the adapter's output.
    ///
    /// `job_id` must be assigned by the caller beforehand; an empty or
    /// unusable id fails before any filesystem or network access.
    pub async fn execute(
        &self,
        job_id: &str,
        request: &Value,
        outputs: Option<&Value>,
    ) -> Result<ExecutionResult, ExecutionError> {
        self.execute_with_cancel(job_id, request, outputs, &CancellationToken::new())
            .await
    }

    /// [`execute`](Self::execute), giving up the local wait when `cancel`
    /// fires. The remote job is not aborted and its directory is kept.
    pub async fn execute_with_cancel(
        &self,
        job_id: &str,
        request: &Value,
        outputs: Option<&Value>,
        cancel: &CancellationToken,
    ) -> Result<ExecutionResult, ExecutionError> {
        let job_id = JobId::parse(job_id)?;

        let working_dir = self.workdirs.create(&job_id).await?;

        let code_input_params = match self
            .adapter
            .prepare_input(request, &working_dir, outputs)
            .await
        {
            Ok(params) => params,
            Err(e) => {
                tracing::warn!(
                    job_id = %job_id,
                    kind = self.adapter.kind(),
                    error = %e,
                    "Input preparation failed",
                );
                self.discard(&job_id, &working_dir).await;
                return Err(e.into());
            }
        };

        let info = match self
            .client
            .run(&job_id, self.mode, &code_input_params, &self.policy, cancel)
            .await
        {
            Ok(info) => info,
            Err(e) => {
                if e.discards_working_dir() {
                    self.discard(&job_id, &working_dir).await;
                } else {
                    tracing::warn!(
                        job_id = %job_id,
                        path = %working_dir.display(),
                        error = %e,
                        "Remote execution failed, keeping working directory",
                    );
                }
                return Err(e.into());
            }
        };

        let result = self
            .adapter
            .prepare_output(&info, &working_dir, outputs)
            .await?;

        tracing::info!(
            job_id = %job_id,
            kind = self.adapter.kind(),
            mimetype = %result.mimetype,
            "Job completed",
        );
        Ok(result)
    }

    /// Remove a working directory on a failure path. A cleanup failure is
    /// logged; the caller still gets the original error.
    async fn discard(&self, job_id: &JobId, working_dir: &Path) {
        if let Err(e) = self.workdirs.destroy(working_dir).await {
            tracing::error!(
                job_id = %job_id,
                path = %working_dir.display(),
                error = %e,
                "Failed to remove working directory",
            );
        }
    }
}
