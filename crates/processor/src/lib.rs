//! Remote execution processors.
//!
//! An [`orchestrator::ExecutionOrchestrator`] runs one job end to end:
//! it creates the job's working directory, lets a [`adapter::JobAdapter`]
//! stage inputs, hands the job to the remote executor, and lets the same
//! adapter turn the remote result into the caller's output.

pub mod adapter;
pub mod adapters;
pub mod config;
pub mod error;
pub mod orchestrator;
