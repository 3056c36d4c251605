//! Core error types

use thiserror::Error;

/// Core error type for SimBind
#[derive(Debug, Error)]
pub enum CoreError {
    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
