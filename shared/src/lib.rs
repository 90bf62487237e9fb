//! Shared utilities for the object storage workspace

// Re-export common dependencies
pub use tracing;
pub use uuid;

pub mod observability;
