//! Job-scoped working directories.
//!
//! Every job gets `<root>/<job_id>`. The directory is created exclusively
//! so a reused job id fails instead of writing into another job's inputs.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs::DirBuilder;

use crate::error::CoreError;
use crate::types::JobId;

/// Permission bits for the root and per-job directories.
#[cfg(unix)]
const DIR_MODE: u32 = 0o755;

/// Creates and tears down per-job working directories under one root.
#[derive(Debug, Clone)]
pub struct WorkingDirectoryManager {
    root: PathBuf,
}

impl WorkingDirectoryManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root directory if it is absent.
    ///
    /// An existing directory is fine; any other failure (permissions, a
    /// regular file in the way) is returned to the caller.
    pub async fn ensure_root(&self) -> Result<(), CoreError> {
        let mut builder = DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(DIR_MODE);

        builder
            .create(&self.root)
            .await
            .map_err(|e| CoreError::io(&self.root, e))?;

        tracing::debug!(path = %self.root.display(), "Processor root directory ready");
        Ok(())
    }

    /// Path of the working directory for `job_id`. Pure; touches nothing.
    pub fn job_dir(&self, job_id: &JobId) -> PathBuf {
        self.root.join(job_id.as_str())
    }

    /// Create the working directory for `job_id`.
    ///
    /// Fails with [`CoreError::JobDirExists`] if the directory is already
    /// present. The existing directory and its contents are left alone.
    pub async fn create(&self, job_id: &JobId) -> Result<PathBuf, CoreError> {
        let path = self.job_dir(job_id);

        let mut builder = DirBuilder::new();
        #[cfg(unix)]
        builder.mode(DIR_MODE);

        match builder.create(&path).await {
            Ok(()) => {
                tracing::debug!(job_id = %job_id, path = %path.display(), "Created working directory");
                Ok(path)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                tracing::warn!(job_id = %job_id, path = %path.display(), "Working directory already exists");
                Err(CoreError::JobDirExists(path))
            }
            Err(e) => Err(CoreError::io(path, e)),
        }
    }

    /// Recursively remove a working directory.
    ///
    /// A directory that is already gone is not an error, so this is safe
    /// after a partially failed setup.
    pub async fn destroy(&self, path: &Path) -> Result<(), CoreError> {
        match tokio::fs::remove_dir_all(path).await {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "Removed working directory");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CoreError::io(path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn job(id: &str) -> JobId {
        JobId::parse(id).unwrap()
    }

    #[tokio::test]
    async fn ensure_root_creates_missing_directory() {
        let tmp = tempfile::tempdir().expect("create temp dir");
        let root = tmp.path().join("processors").join("private");
        let manager = WorkingDirectoryManager::new(&root);

        manager.ensure_root().await.unwrap();
        assert!(root.is_dir());
    }

    #[tokio::test]
    async fn ensure_root_is_idempotent() {
        let tmp = tempfile::tempdir().expect("create temp dir");
        let manager = WorkingDirectoryManager::new(tmp.path());

        manager.ensure_root().await.unwrap();
        manager.ensure_root().await.unwrap();
    }

    #[tokio::test]
    async fn ensure_root_fails_when_a_file_is_in_the_way() {
        let tmp = tempfile::tempdir().expect("create temp dir");
        let blocker = tmp.path().join("root");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let manager = WorkingDirectoryManager::new(&blocker);
        assert_matches!(manager.ensure_root().await, Err(CoreError::Io { .. }));
    }

    #[test]
    fn job_dir_is_root_joined_with_id() {
        let manager = WorkingDirectoryManager::new("/srv/private");
        assert_eq!(
            manager.job_dir(&job("abc123")),
            PathBuf::from("/srv/private/abc123")
        );
    }

    #[tokio::test]
    async fn create_makes_job_directory() {
        let tmp = tempfile::tempdir().expect("create temp dir");
        let manager = WorkingDirectoryManager::new(tmp.path());

        let path = manager.create(&job("abc123")).await.unwrap();
        assert_eq!(path, tmp.path().join("abc123"));
        assert!(path.is_dir());
    }

    #[tokio::test]
    async fn create_rejects_reused_id_and_keeps_contents() {
        let tmp = tempfile::tempdir().expect("create temp dir");
        let manager = WorkingDirectoryManager::new(tmp.path());

        let path = manager.create(&job("abc123")).await.unwrap();
        std::fs::write(path.join("input.data"), b"1 2 3").unwrap();

        let err = manager.create(&job("abc123")).await.unwrap_err();
        assert_matches!(err, CoreError::JobDirExists(p) if p == path);
        assert_eq!(std::fs::read(path.join("input.data")).unwrap(), b"1 2 3");
    }

    #[tokio::test]
    async fn create_fails_without_root() {
        let tmp = tempfile::tempdir().expect("create temp dir");
        let manager = WorkingDirectoryManager::new(tmp.path().join("missing"));

        assert_matches!(manager.create(&job("abc123")).await, Err(CoreError::Io { .. }));
    }

    #[tokio::test]
    async fn destroy_removes_nested_contents() {
        let tmp = tempfile::tempdir().expect("create temp dir");
        let manager = WorkingDirectoryManager::new(tmp.path());

        let path = manager.create(&job("abc123")).await.unwrap();
        std::fs::create_dir(path.join("nested")).unwrap();
        std::fs::write(path.join("nested").join("out.txt"), b"x").unwrap();

        manager.destroy(&path).await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn destroy_missing_directory_is_ok() {
        let tmp = tempfile::tempdir().expect("create temp dir");
        let manager = WorkingDirectoryManager::new(tmp.path());

        manager.destroy(&tmp.path().join("never-created")).await.unwrap();
    }
}
