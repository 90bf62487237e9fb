//! Observability utilities for logging and operation timing
//!
//! Provides centralized logging setup for the library and the CLI

pub mod logging;
pub mod operation;

pub use logging::*;
pub use operation::*;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObservabilityError {
    #[error("Logging setup error: {0}")]
    Logging(String),

    #[error("Invalid logging option: {0}")]
    InvalidOption(String),
}

pub type ObservabilityResult<T> = Result<T, ObservabilityError>;
