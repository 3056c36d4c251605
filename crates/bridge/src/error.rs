//! Errors as they cross the host boundary.

use std::fmt;

use serde::{Deserialize, Serialize};
use simbind_crypto::KeyError;
use simbind_identity::{FingerprintError, SimError, WatcherError};
use thiserror::Error;

/// Stable error codes seen by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    PermissionDenied,
    NoSim,
    SimUnavailable,
    FingerprintFailed,
    KeyNotFound,
    KeystoreUnavailable,
    KeyGenerationFailed,
    InvalidKey,
    SignFailed,
    InvalidChallenge,
    ListenerFailed,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::NoSim => "NO_SIM",
            Self::SimUnavailable => "SIM_UNAVAILABLE",
            Self::FingerprintFailed => "FINGERPRINT_FAILED",
            Self::KeyNotFound => "KEY_NOT_FOUND",
            Self::KeystoreUnavailable => "KEYSTORE_UNAVAILABLE",
            Self::KeyGenerationFailed => "KEY_GENERATION_FAILED",
            Self::InvalidKey => "INVALID_KEY",
            Self::SignFailed => "SIGN_FAILED",
            Self::InvalidChallenge => "INVALID_CHALLENGE",
            Self::ListenerFailed => "LISTENER_FAILED",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `{ code, message, retryable }` error object.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct BridgeError {
    pub code: ErrorCode,
    pub message: String,
    /// Whether the host may retry without user action
    pub retryable: bool,
}

impl BridgeError {
    pub fn new(code: ErrorCode, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            code,
            message: message.into(),
            retryable,
        }
    }

    pub fn invalid_challenge(reason: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::InvalidChallenge,
            format!("Challenge is not valid base64: {reason}"),
            false,
        )
    }

    /// Serialize for the host. Falls back to a minimal literal if
    /// serialization itself fails.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":"{}","message":"","retryable":false}}"#, self.code)
        })
    }
}

impl From<SimError> for BridgeError {
    fn from(err: SimError) -> Self {
        let code = match &err {
            SimError::Permission { .. } => ErrorCode::PermissionDenied,
            SimError::NoSim => ErrorCode::NoSim,
            SimError::Platform { .. } => ErrorCode::SimUnavailable,
        };
        Self::new(code, err.to_string(), err.is_retryable())
    }
}

impl From<FingerprintError> for BridgeError {
    fn from(err: FingerprintError) -> Self {
        let retryable = match &err {
            FingerprintError::Sim(sim) => sim.is_retryable(),
            FingerprintError::Storage(_) => true,
        };
        Self::new(ErrorCode::FingerprintFailed, err.to_string(), retryable)
    }
}

impl From<KeyError> for BridgeError {
    fn from(err: KeyError) -> Self {
        let code = match &err {
            KeyError::KeyNotFound { .. } => ErrorCode::KeyNotFound,
            KeyError::KeyStoreUnavailable { .. } => ErrorCode::KeystoreUnavailable,
            KeyError::KeyGeneration { .. }
            | KeyError::StrongBoxUnavailable
            | KeyError::KeyAlreadyExists { .. } => ErrorCode::KeyGenerationFailed,
            KeyError::InvalidKey { .. } => ErrorCode::InvalidKey,
            KeyError::Sign { .. } => ErrorCode::SignFailed,
        };
        Self::new(code, err.to_string(), err.is_retryable())
    }
}

impl From<WatcherError> for BridgeError {
    fn from(err: WatcherError) -> Self {
        let retryable = matches!(err, WatcherError::Registration(_));
        Self::new(ErrorCode::ListenerFailed, err.to_string(), retryable)
    }
}
