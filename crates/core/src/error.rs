use std::path::PathBuf;

/// Errors raised before a job reaches the remote executor.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The caller's request failed the job-kind's checks.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Missing configuration or a job executed without a usable job id.
    #[error("Usage error: {0}")]
    Usage(String),

    /// A working directory for this job id is already present on disk.
    #[error("Working directory already exists: {}", .0.display())]
    JobDirExists(PathBuf),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Attach a path to an [`std::io::Error`].
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_validation() {
        let err = CoreError::Validation("missing 'inputs'".to_string());
        assert_eq!(err.to_string(), "Validation failed: missing 'inputs'");
    }

    #[test]
    fn display_job_dir_exists() {
        let err = CoreError::JobDirExists(PathBuf::from("/srv/jobs/abc123"));
        assert_eq!(
            err.to_string(),
            "Working directory already exists: /srv/jobs/abc123"
        );
    }

    #[test]
    fn io_error_keeps_source() {
        let inner = std::io::Error::other("disk full");
        let err = CoreError::io("/srv/jobs", inner);
        assert!(err.to_string().contains("/srv/jobs"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
