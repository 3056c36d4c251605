//! Error types for key vault operations.

use thiserror::Error;

/// Errors surfaced by the secure key store and the key vault.
///
/// A caller that never initialized the vault must re-run initialization; a
/// caller that hit a store outage may retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// No key exists under the alias.
    #[error("Key not found: {alias}")]
    KeyNotFound { alias: String },

    /// A key already exists under the alias.
    #[error("Key already exists: {alias}")]
    KeyAlreadyExists { alias: String },

    /// The platform key store could not be reached.
    #[error("Key store unavailable: {reason}")]
    KeyStoreUnavailable { reason: String },

    /// A dedicated secure element was requested but is not present.
    #[error("StrongBox not available on this device")]
    StrongBoxUnavailable,

    /// Key generation failed inside the store.
    #[error("Key generation failed: {reason}")]
    KeyGeneration { reason: String },

    /// The signing operation failed.
    #[error("Signing failed: {reason}")]
    Sign { reason: String },

    /// Stored public key could not be encoded or decoded.
    #[error("Invalid key: {reason}")]
    InvalidKey { reason: String },
}

impl KeyError {
    /// Create a store-unavailable error from a reason.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::KeyStoreUnavailable {
            reason: reason.into(),
        }
    }

    /// Create a signing error from a reason.
    pub fn signing(reason: impl Into<String>) -> Self {
        Self::Sign {
            reason: reason.into(),
        }
    }

    /// Whether retrying the same call may succeed without user action.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::KeyStoreUnavailable { .. })
    }

    /// Whether the caller must run key initialization before retrying.
    pub fn requires_initialization(&self) -> bool {
        matches!(self, Self::KeyNotFound { .. })
    }
}

/// Result type for key operations.
pub type KeyResult<T> = Result<T, KeyError>;
