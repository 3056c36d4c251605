//! Device binding key vault.
//!
//! Owns the lifecycle of the single device binding keypair:
//! - Creates it lazily on first [`KeyVault::ensure_key`], never again afterwards
//! - Signs raw challenge bytes with it
//! - Exposes the public key as base64 DER SubjectPublicKeyInfo
//!
//! # Security Model
//!
//! - Private key material stays inside the [`SecureKeyStore`]
//! - An existing key is never rotated: server-side registrations of the
//!   public key depend on it
//! - Check-then-create is serialized so concurrent first calls produce one key

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use p256::ecdsa::{signature::Verifier as _, Signature, VerifyingKey};
use p256::pkcs8::DecodePublicKey;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::{KeyError, KeyResult};
use crate::keystore::{KeySpec, SecureKeyStore};

/// Public half of the device binding key, as handed to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyInfo {
    /// Base64 (standard alphabet, padded) of the DER SubjectPublicKeyInfo
    pub public_key: String,
    /// Whether the key is ready for signing
    pub success: bool,
}

impl PublicKeyInfo {
    /// The value reported when initialization failed.
    pub fn failed() -> Self {
        Self {
            public_key: String::new(),
            success: false,
        }
    }

    /// Decode the public key back to DER bytes.
    pub fn public_key_der(&self) -> KeyResult<Vec<u8>> {
        BASE64
            .decode(&self.public_key)
            .map_err(|e| KeyError::InvalidKey {
                reason: format!("public key is not base64: {e}"),
            })
    }
}

/// Counters for observability.
#[derive(Debug, Default)]
pub struct VaultMetrics {
    pub keys_generated_total: AtomicU64,
    pub signatures_total: AtomicU64,
    pub signing_errors_total: AtomicU64,
}

/// Key vault bound to one alias in a secure key store.
pub struct KeyVault {
    store: Arc<dyn SecureKeyStore>,
    alias: String,
    init_lock: Mutex<()>,
    metrics: VaultMetrics,
}

impl KeyVault {
    /// Create a vault for `alias` backed by `store`. No key is created yet.
    pub fn new(store: Arc<dyn SecureKeyStore>, alias: impl Into<String>) -> Self {
        Self {
            store,
            alias: alias.into(),
            init_lock: Mutex::new(()),
            metrics: VaultMetrics::default(),
        }
    }

    /// Alias of the vault key.
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Backing key store, shared with posture evaluation.
    pub fn store(&self) -> Arc<dyn SecureKeyStore> {
        Arc::clone(&self.store)
    }

    /// Make sure the device binding key exists and return its public key.
    ///
    /// Idempotent: once a key exists under the alias it is returned as-is.
    /// StrongBox is requested first; a device without one gets a key from
    /// the next best level the store offers.
    pub fn ensure_key(&self) -> KeyResult<PublicKeyInfo> {
        let _guard = self
            .init_lock
            .lock()
            .map_err(|_| KeyError::unavailable("vault initialization lock poisoned"))?;

        if self.store.contains_alias(&self.alias)? {
            debug!(alias = %self.alias, "Device key already present");
            return self.public_key();
        }

        let spec = KeySpec::signing(self.alias.clone());
        let generated = match self.store.generate(&spec) {
            Err(KeyError::StrongBoxUnavailable) => {
                warn!(alias = %self.alias, "StrongBox unavailable, generating without it");
                self.store.generate(&spec.without_strongbox())
            }
            other => other,
        };
        match generated {
            Ok(()) => {}
            // Another vault on the same store created the alias first
            Err(KeyError::KeyAlreadyExists { .. }) => {
                debug!(alias = %self.alias, "Device key created concurrently, reusing it");
                return self.public_key();
            }
            Err(e) => {
                error!(alias = %self.alias, error = %e, "Device key generation failed");
                return Err(e);
            }
        }

        self.metrics.keys_generated_total.fetch_add(1, Ordering::Relaxed);
        info!(alias = %self.alias, "Device key generated");
        self.public_key()
    }

    /// Public key of an existing vault key, without creating one.
    pub fn public_key(&self) -> KeyResult<PublicKeyInfo> {
        let der = self.store.public_key_der(&self.alias)?;
        Ok(PublicKeyInfo {
            public_key: BASE64.encode(der),
            success: true,
        })
    }

    /// Sign raw payload bytes with the vault key.
    ///
    /// The payload must already be decoded from any transport encoding:
    /// signing a base64 string instead of the bytes it encodes yields a
    /// signature the server cannot verify.
    pub fn sign(&self, payload: &[u8]) -> KeyResult<Vec<u8>> {
        match self.store.sign(&self.alias, payload) {
            Ok(signature) => {
                self.metrics.signatures_total.fetch_add(1, Ordering::Relaxed);
                Ok(signature)
            }
            Err(e) => {
                self.metrics
                    .signing_errors_total
                    .fetch_add(1, Ordering::Relaxed);
                warn!(alias = %self.alias, error = %e, "Signing failed");
                Err(e)
            }
        }
    }

    /// Verify a DER signature over `payload` against the vault public key.
    pub fn verify(&self, payload: &[u8], signature: &[u8]) -> KeyResult<bool> {
        let der = self.store.public_key_der(&self.alias)?;
        verify_signature(&der, payload, signature)
    }

    /// Gets a snapshot of current metrics.
    pub fn metrics(&self) -> &VaultMetrics {
        &self.metrics
    }
}

/// Verify a DER ECDSA P-256/SHA-256 signature against a DER SPKI public key.
///
/// Returns `Ok(false)` for a well-formed signature that does not verify and
/// `Err` when either encoding is malformed.
pub fn verify_signature(spki_der: &[u8], payload: &[u8], signature: &[u8]) -> KeyResult<bool> {
    let verifying_key =
        VerifyingKey::from_public_key_der(spki_der).map_err(|e| KeyError::InvalidKey {
            reason: format!("invalid SPKI public key: {e}"),
        })?;
    let signature = Signature::from_der(signature).map_err(|e| KeyError::InvalidKey {
        reason: format!("invalid DER signature: {e}"),
    })?;
    Ok(verifying_key.verify(payload, &signature).is_ok())
}
