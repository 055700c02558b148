//! Adapter for executors whose parameters need no translation.
//!
//! Request shape:
//!
//! ```json
//! { "inputs": { "-n": 4 }, "files": { "model.cfg": "depth = 10\n" } }
//! ```
//!
//! `files` are written into the working directory, `inputs` is sent to the
//! executor as-is, and the executor's reported `params` map becomes the
//! output, optionally narrowed by the caller's output selection.

use std::path::Path;

use rexec_core::error::CoreError;
use rexec_remote::messages::RemoteJobInfo;
use serde_json::{Map, Value};
use tokio::io::AsyncWriteExt;

use crate::adapter::{ExecutionResult, JobAdapter};

#[derive(Debug, Clone, Default)]
pub struct PassthroughAdapter;

impl PassthroughAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl JobAdapter for PassthroughAdapter {
    fn kind(&self) -> &str {
        "passthrough"
    }

    async fn prepare_input(
        &self,
        request: &Value,
        working_dir: &Path,
        _outputs: Option<&Value>,
    ) -> Result<Map<String, Value>, CoreError> {
        let request = request
            .as_object()
            .ok_or_else(|| CoreError::Validation("Request must be a JSON object".into()))?;

        let params = match request.get("inputs") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(inputs)) => inputs.clone(),
            Some(_) => {
                return Err(CoreError::Validation(
                    "'inputs' must be a JSON object".into(),
                ))
            }
        };

        match request.get("files") {
            None | Some(Value::Null) => {}
            Some(Value::Object(files)) => {
                for (name, content) in files {
                    let content = content.as_str().ok_or_else(|| {
                        CoreError::Validation(format!("File '{name}' must be given as text"))
                    })?;
                    stage_file(working_dir, name, content).await?;
                }
            }
            Some(_) => {
                return Err(CoreError::Validation(
                    "'files' must map file names to text".into(),
                ))
            }
        }

        Ok(params)
    }

    async fn prepare_output(
        &self,
        info: &RemoteJobInfo,
        _working_dir: &Path,
        outputs: Option<&Value>,
    ) -> Result<ExecutionResult, CoreError> {
        let params = &info.job_info.params;

        let selected = match outputs {
            None | Some(Value::Null) => params.clone(),
            Some(Value::Object(selection)) if selection.is_empty() => params.clone(),
            Some(Value::Object(selection)) => {
                let mut selected = Map::new();
                for key in selection.keys() {
                    let value = params.get(key).ok_or_else(|| {
                        CoreError::Validation(format!("Unknown output '{key}'"))
                    })?;
                    selected.insert(key.clone(), value.clone());
                }
                selected
            }
            Some(_) => {
                return Err(CoreError::Validation(
                    "Output selection must be a JSON object".into(),
                ))
            }
        };

        Ok(ExecutionResult::json(Value::Object(selected)))
    }
}

/// Write `content` to `<working_dir>/<name>`. The file must not exist yet.
async fn stage_file(working_dir: &Path, name: &str, content: &str) -> Result<(), CoreError> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
        return Err(CoreError::Validation(format!(
            "File name '{}' is not allowed",
            name.escape_default()
        )));
    }

    let path = working_dir.join(name);
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .await
        .map_err(|e| CoreError::io(&path, e))?;
    file.write_all(content.as_bytes())
        .await
        .map_err(|e| CoreError::io(&path, e))?;
    file.flush().await.map_err(|e| CoreError::io(&path, e))?;

    tracing::debug!(path = %path.display(), bytes = content.len(), "Staged input file");
    Ok(())
}
