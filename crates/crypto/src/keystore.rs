//! Secure key store abstraction.
//!
//! The platform key store (Android Keystore, StrongBox, a TEE-backed
//! keymaster) owns all private key material. This core only ever holds an
//! alias and asks the store to act on its behalf.

use serde::{Deserialize, Serialize};

use crate::error::KeyResult;

/// Where the store keeps a key's private material.
///
/// Mirrors the attestation security levels reported by Android keymaster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SecurityLevel {
    /// Software-only keystore, no hardware isolation
    Software,
    /// Isolated trusted execution environment
    TrustedEnvironment,
    /// Dedicated secure element
    StrongBox,
}

impl SecurityLevel {
    /// Keymaster wire name of the level.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Software => "software",
            Self::TrustedEnvironment => "trusted_environment",
            Self::StrongBox => "strongbox",
        }
    }
}

/// Signature scheme bound to a key at generation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum KeyAlgorithm {
    /// ECDSA over NIST P-256 with SHA-256, DER-encoded signatures
    #[default]
    EcdsaP256Sha256,
}

impl KeyAlgorithm {
    /// JCA name of the signature scheme.
    pub const fn signature_algorithm(&self) -> &'static str {
        match self {
            Self::EcdsaP256Sha256 => "SHA256withECDSA",
        }
    }
}

/// Parameters for creating the device binding key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpec {
    /// Alias the key is stored under.
    pub alias: String,
    /// Signature scheme; the key is restricted to sign/verify with it.
    pub algorithm: KeyAlgorithm,
    /// Ask for a dedicated secure element.
    pub strongbox: bool,
}

impl KeySpec {
    /// Signing key spec for the alias, preferring StrongBox.
    pub fn signing(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            algorithm: KeyAlgorithm::default(),
            strongbox: true,
        }
    }

    /// Same spec without the secure element requirement.
    #[must_use]
    pub fn without_strongbox(mut self) -> Self {
        self.strongbox = false;
        self
    }
}

/// Operations the core needs from the platform key store.
///
/// Implementations must keep private material inside the store. Errors use
/// the [`crate::KeyError`] taxonomy so the vault can pass them through
/// unchanged.
pub trait SecureKeyStore: Send + Sync {
    /// Whether a key exists under the alias.
    fn contains_alias(&self, alias: &str) -> KeyResult<bool>;

    /// Create a new keypair. Fails with `KeyAlreadyExists` if the alias is taken.
    fn generate(&self, spec: &KeySpec) -> KeyResult<()>;

    /// DER-encoded SubjectPublicKeyInfo of the key.
    fn public_key_der(&self, alias: &str) -> KeyResult<Vec<u8>>;

    /// Sign raw bytes with the key's bound scheme.
    fn sign(&self, alias: &str, payload: &[u8]) -> KeyResult<Vec<u8>>;

    /// Security level protecting the key, `None` if the store cannot report it.
    fn security_level(&self, alias: &str) -> KeyResult<Option<SecurityLevel>>;
}
