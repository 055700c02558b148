//! Shared types for the remote execution bridge.
//!
//! Holds the error taxonomy used by every layer, the [`types::JobId`]
//! newtype, and the job-scoped working directory manager.

pub mod error;
pub mod types;
pub mod workdir;
