//! Built-in job adapters.

pub mod passthrough;

pub use passthrough::PassthroughAdapter;
