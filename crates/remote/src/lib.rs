//! HTTP client for the remote execution service.
//!
//! Submits jobs to `POST <base>/execute`, optionally polls
//! `GET <base>/job_info/<job_id>` until the job reports completion, and
//! maps transport and business failures onto [`error::RemoteError`].

pub mod api;
pub mod client;
pub mod error;
pub mod messages;
pub mod poll;
