//! Key management and signing for the SimBind device binding core.
//!
//! This crate owns the device binding keypair through the [`KeyVault`]. The
//! private key lives in a platform [`SecureKeyStore`]; the vault only keeps
//! its alias.
//!
//! # Supported Algorithms
//!
//! - **Signatures**: ECDSA P-256 with SHA-256 (`SHA256withECDSA`), DER-encoded
//! - **Public keys**: DER SubjectPublicKeyInfo, base64 at the API boundary
//!
//! # Security Principles
//!
//! - Private keys never leave the key store
//! - An existing key is never regenerated
//! - Failures keep their kind (missing key, store outage, crypto failure)

mod error;
pub mod keystore;
pub mod vault;

#[cfg(feature = "software")]
pub mod software;

pub use error::{KeyError, KeyResult};
pub use keystore::{KeyAlgorithm, KeySpec, SecureKeyStore, SecurityLevel};
pub use vault::{verify_signature, KeyVault, PublicKeyInfo, VaultMetrics};

#[cfg(feature = "software")]
pub use software::SoftwareKeyStore;
