//! Error types for SIM resolution, fingerprinting and watching.

use thiserror::Error;

/// Failure reported by a platform collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    /// The app lacks the platform permission for the call.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The platform service could not answer.
    #[error("Platform service unavailable: {0}")]
    Unavailable(String),
}

/// Errors from SIM enumeration and resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    /// SIM read permission was denied. Not retryable without user action.
    #[error("SIM permission denied: {reason}")]
    Permission { reason: String },

    /// No SIM could be enumerated. Retryable after SIM insertion.
    #[error("No SIM found")]
    NoSim,

    /// The telephony service failed for another reason.
    #[error("Telephony error: {reason}")]
    Platform { reason: String },
}

impl SimError {
    /// Whether retrying later may succeed without user action.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Permission { .. })
    }
}

impl From<PlatformError> for SimError {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::PermissionDenied(reason) => Self::Permission { reason },
            PlatformError::Unavailable(reason) => Self::Platform { reason },
        }
    }
}

/// Errors from the key-value storage collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// Read failed.
    #[error("Storage read failed for '{key}': {reason}")]
    Read { key: String, reason: String },

    /// Write failed.
    #[error("Storage write failed for '{key}': {reason}")]
    Write { key: String, reason: String },
}

/// Errors from device fingerprint computation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FingerprintError {
    /// The primary SIM could not be resolved.
    #[error("Fingerprint unavailable: {0}")]
    Sim(#[from] SimError),

    /// The install identifier could not be read or persisted.
    #[error("Fingerprint unavailable: {0}")]
    Storage(#[from] StorageError),
}

/// Errors from starting the SIM watcher.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WatcherError {
    /// `start` was called on a watcher that is already running.
    #[error("SIM watcher already started")]
    AlreadyStarted,

    /// The watcher was stopped; construct a new one to watch again.
    #[error("SIM watcher stopped")]
    Stopped,

    /// `start` was called outside a tokio runtime.
    #[error("SIM watcher requires a tokio runtime")]
    NoRuntime,

    /// Registering for platform notifications failed.
    #[error("Notification registration failed: {0}")]
    Registration(#[from] PlatformError),
}

/// Result type for SIM operations.
pub type SimResult<T> = Result<T, SimError>;
