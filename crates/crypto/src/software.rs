//! In-process P-256 key store.
//!
//! Stands in for the platform key store on hosts without secure hardware
//! and in tests. Keys never leave the struct, but they live in ordinary
//! process memory, so the store reports whatever [`SecurityLevel`] it was
//! constructed with only for simulation purposes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use p256::ecdsa::{signature::Signer as _, Signature, SigningKey};
use p256::pkcs8::EncodePublicKey;
use tracing::{debug, warn};

use crate::error::{KeyError, KeyResult};
use crate::keystore::{KeySpec, SecureKeyStore, SecurityLevel};

#[derive(Debug)]
struct SoftwareKeyRecord {
    signing_key: SigningKey,
    level: SecurityLevel,
}

/// Key store keeping P-256 keys in process memory.
#[derive(Debug)]
pub struct SoftwareKeyStore {
    keys: Mutex<HashMap<String, SoftwareKeyRecord>>,
    level: SecurityLevel,
    available: AtomicBool,
    generation_available: AtomicBool,
}

impl SoftwareKeyStore {
    /// Store reporting [`SecurityLevel::Software`].
    pub fn new() -> Self {
        Self::with_level(SecurityLevel::Software)
    }

    /// Store simulating keys protected at the given level.
    ///
    /// StrongBox generation requests succeed only when `level` is
    /// [`SecurityLevel::StrongBox`].
    pub fn with_level(level: SecurityLevel) -> Self {
        warn!(
            level = level.as_str(),
            "STATUS: SoftwareKeyStore :: Hardware Key Store :: STUBBED"
        );
        Self {
            keys: Mutex::new(HashMap::new()),
            level,
            available: AtomicBool::new(true),
            generation_available: AtomicBool::new(true),
        }
    }

    /// Simulate the whole store going away (or coming back).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Simulate a store that answers lookups but refuses to create keys.
    pub fn set_generation_available(&self, available: bool) {
        self.generation_available.store(available, Ordering::SeqCst);
    }

    /// Number of keys currently held.
    pub fn key_count(&self) -> usize {
        self.keys.lock().map(|keys| keys.len()).unwrap_or(0)
    }

    fn check_available(&self) -> KeyResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(KeyError::unavailable("software key store offline"))
        }
    }

    fn with_keys<T>(
        &self,
        f: impl FnOnce(&mut HashMap<String, SoftwareKeyRecord>) -> KeyResult<T>,
    ) -> KeyResult<T> {
        self.check_available()?;
        let mut keys = self
            .keys
            .lock()
            .map_err(|_| KeyError::unavailable("software key store lock poisoned"))?;
        f(&mut keys)
    }
}

impl Default for SoftwareKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SecureKeyStore for SoftwareKeyStore {
    fn contains_alias(&self, alias: &str) -> KeyResult<bool> {
        self.with_keys(|keys| Ok(keys.contains_key(alias)))
    }

    fn generate(&self, spec: &KeySpec) -> KeyResult<()> {
        if !self.generation_available.load(Ordering::SeqCst) {
            return Err(KeyError::unavailable("key generation service not responding"));
        }
        if spec.strongbox && self.level != SecurityLevel::StrongBox {
            return Err(KeyError::StrongBoxUnavailable);
        }

        self.with_keys(|keys| {
            if keys.contains_key(&spec.alias) {
                return Err(KeyError::KeyAlreadyExists {
                    alias: spec.alias.clone(),
                });
            }
            let signing_key = SigningKey::random(&mut rand::rngs::OsRng);
            keys.insert(
                spec.alias.clone(),
                SoftwareKeyRecord {
                    signing_key,
                    level: self.level,
                },
            );
            debug!(alias = %spec.alias, "Software key generated");
            Ok(())
        })
    }

    fn public_key_der(&self, alias: &str) -> KeyResult<Vec<u8>> {
        self.with_keys(|keys| {
            let record = keys.get(alias).ok_or_else(|| KeyError::KeyNotFound {
                alias: alias.to_string(),
            })?;
            let document = record
                .signing_key
                .verifying_key()
                .to_public_key_der()
                .map_err(|e| KeyError::InvalidKey {
                    reason: format!("SPKI encoding failed: {e}"),
                })?;
            Ok(document.as_bytes().to_vec())
        })
    }

    fn sign(&self, alias: &str, payload: &[u8]) -> KeyResult<Vec<u8>> {
        self.with_keys(|keys| {
            let record = keys.get(alias).ok_or_else(|| KeyError::KeyNotFound {
                alias: alias.to_string(),
            })?;
            let signature: Signature = record
                .signing_key
                .try_sign(payload)
                .map_err(|e| KeyError::signing(e.to_string()))?;
            Ok(signature.to_der().as_bytes().to_vec())
        })
    }

    fn security_level(&self, alias: &str) -> KeyResult<Option<SecurityLevel>> {
        self.with_keys(|keys| Ok(keys.get(alias).map(|record| record.level)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use p256::ecdsa::{signature::Verifier as _, VerifyingKey};
    use p256::pkcs8::DecodePublicKey;

    #[test]
    fn test_generate_sign_verify() {
        let store = SoftwareKeyStore::new();
        store
            .generate(&KeySpec::signing("k").without_strongbox())
            .unwrap();

        let der = store.public_key_der("k").unwrap();
        let verifying_key = VerifyingKey::from_public_key_der(&der).unwrap();
        let sig = store.sign("k", b"payload").unwrap();
        let sig = Signature::from_der(&sig).unwrap();

        assert!(verifying_key.verify(b"payload", &sig).is_ok());
        assert!(verifying_key.verify(b"other", &sig).is_err());
    }

    #[test]
    fn test_duplicate_alias_rejected() {
        let store = SoftwareKeyStore::new();
        let spec = KeySpec::signing("k").without_strongbox();
        store.generate(&spec).unwrap();
        assert_eq!(
            store.generate(&spec),
            Err(KeyError::KeyAlreadyExists {
                alias: "k".to_string()
            })
        );
        assert_eq!(store.key_count(), 1);
    }

    #[test]
    fn test_strongbox_request_on_tee_store() {
        let store = SoftwareKeyStore::with_level(SecurityLevel::TrustedEnvironment);
        assert_eq!(
            store.generate(&KeySpec::signing("k")),
            Err(KeyError::StrongBoxUnavailable)
        );
        store
            .generate(&KeySpec::signing("k").without_strongbox())
            .unwrap();
        assert_eq!(
            store.security_level("k").unwrap(),
            Some(SecurityLevel::TrustedEnvironment)
        );
    }

    #[test]
    fn test_offline_store() {
        let store = SoftwareKeyStore::new();
        store.set_available(false);
        assert!(matches!(
            store.contains_alias("k"),
            Err(KeyError::KeyStoreUnavailable { .. })
        ));
        store.set_available(true);
        assert_eq!(store.contains_alias("k"), Ok(false));
    }

    #[test]
    fn test_missing_key_lookups() {
        let store = SoftwareKeyStore::new();
        assert_eq!(store.security_level("absent").unwrap(), None);
        assert!(matches!(
            store.sign("absent", b"x"),
            Err(KeyError::KeyNotFound { .. })
        ));
    }
}
