//! Device fingerprint: a stable pseudo-identity bound to the SIM.
//!
//! ```text
//! fingerprint = hash(device_id ":" primary_sim_id_hash ":" install_id)
//! ```
//!
//! The component order and the `:` separator are a format contract. Any
//! change alters every fingerprint already registered server-side and must
//! ship as a migration.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use simbind_core::hash_str;
use tracing::{debug, info, warn};

use crate::error::{FingerprintError, StorageError};
use crate::platform::{DeviceInfoProvider, KeyValueStore};
use crate::sim::SimResolver;

/// Separator between fingerprint components.
pub const FINGERPRINT_SEPARATOR: char = ':';

/// Fingerprint and the components it was derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceFingerprint {
    /// Platform device id, empty where the platform withholds it
    pub device_id: String,
    pub device_id_hash: String,
    /// Per-install UUID
    pub install_id: String,
    pub fingerprint: String,
}

/// Combine the three components into the fingerprint hash.
pub fn compose_fingerprint(device_id: &str, sim_id_hash: &str, install_id: &str) -> String {
    let input = format!(
        "{device_id}{sep}{sim_id_hash}{sep}{install_id}",
        sep = FINGERPRINT_SEPARATOR
    );
    hash_str(&input)
}

/// Computes the device fingerprint on demand.
pub struct DeviceIdentity {
    device: Arc<dyn DeviceInfoProvider>,
    storage: Arc<dyn KeyValueStore>,
    resolver: Arc<SimResolver>,
    install_id_key: String,
    primary_slot: i32,
    install_lock: Mutex<()>,
}

impl DeviceIdentity {
    pub fn new(
        device: Arc<dyn DeviceInfoProvider>,
        storage: Arc<dyn KeyValueStore>,
        resolver: Arc<SimResolver>,
        install_id_key: impl Into<String>,
    ) -> Self {
        Self {
            device,
            storage,
            resolver,
            install_id_key: install_id_key.into(),
            primary_slot: 0,
            install_lock: Mutex::new(()),
        }
    }

    /// Bind the fingerprint to a SIM slot other than 0.
    #[must_use]
    pub fn with_primary_slot(mut self, slot_index: i32) -> Self {
        self.primary_slot = slot_index;
        self
    }

    /// Compute the fingerprint.
    ///
    /// A missing device id is tolerated. The primary SIM is not: without a
    /// SIM there is no SIM-bound identity, so resolver failures propagate.
    pub fn fingerprint(&self) -> Result<DeviceFingerprint, FingerprintError> {
        let device_id = self.device.device_id().unwrap_or_default();
        if device_id.is_empty() {
            debug!("Platform device id unavailable, using empty component");
        }
        let install_id = self.install_id()?;

        let sim = self.resolver.primary_sim(self.primary_slot).map_err(|e| {
            warn!(error = %e, "Fingerprint failed: primary SIM unresolved");
            FingerprintError::from(e)
        })?;

        let fingerprint = compose_fingerprint(&device_id, &sim.sim_id_hash, &install_id);
        debug!(sim_id_hash = %sim.sim_id_hash, %fingerprint, "Fingerprint computed");

        Ok(DeviceFingerprint {
            device_id_hash: hash_str(&device_id),
            device_id,
            install_id,
            fingerprint,
        })
    }

    /// Read the install id, creating and persisting it on first use.
    ///
    /// Concurrent first calls agree on one UUID: creation is serialized here
    /// and the store write is conditional on the key being absent.
    pub fn install_id(&self) -> Result<String, StorageError> {
        if let Some(existing) = self.read_install_id()? {
            return Ok(existing);
        }

        let _guard = self.install_lock.lock().map_err(|_| StorageError::Write {
            key: self.install_id_key.clone(),
            reason: "install id lock poisoned".to_string(),
        })?;

        if let Some(existing) = self.read_install_id()? {
            return Ok(existing);
        }

        let candidate = uuid::Uuid::new_v4().to_string();
        let stored = self
            .storage
            .put_if_absent(&self.install_id_key, &candidate)?;
        if stored == candidate {
            info!("Install id created");
        } else {
            debug!("Install id written concurrently, adopting stored value");
        }
        Ok(stored)
    }

    fn read_install_id(&self) -> Result<Option<String>, StorageError> {
        Ok(self
            .storage
            .get(&self.install_id_key)?
            .filter(|id| !id.trim().is_empty()))
    }
}
