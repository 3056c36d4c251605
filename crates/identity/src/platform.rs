//! Platform collaborator interfaces.
//!
//! The host platform supplies telephony, device metadata, persistence and
//! notification delivery. This core depends only on the traits below so the
//! same logic runs against the real platform bridge and against test fakes.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use simbind_core::SimNotification;
use tokio::sync::mpsc;

use crate::error::{PlatformError, StorageError};

/// One active SIM subscription as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionInfo {
    /// Platform subscription id
    pub subscription_id: i32,
    /// Physical/virtual slot index
    pub slot_index: i32,
    /// ICCID, empty when the platform withholds it
    pub icc_id: String,
    /// Number declared in the subscription metadata
    pub number: Option<String>,
    /// Display name of the carrier
    pub carrier_name: String,
}

/// Result of the legacy single-SIM query path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultSimInfo {
    /// SIM serial number
    pub sim_serial: String,
    /// Line 1 number, if the carrier provisioned one
    pub line_number: Option<String>,
    /// Network operator name
    pub operator_name: String,
}

/// Telephony queries used by the SIM resolver.
pub trait TelephonyProvider: Send + Sync {
    /// Active subscriptions across all slots.
    fn active_subscriptions(&self) -> Result<Vec<SubscriptionInfo>, PlatformError>;

    /// Carrier-service line number scoped to one subscription.
    fn carrier_line_number(&self, subscription_id: i32) -> Result<Option<String>, PlatformError>;

    /// Phone numbers stored on linked user/account profiles.
    fn profile_phone_numbers(&self) -> Result<Vec<String>, PlatformError>;

    /// Legacy default-SIM query.
    fn default_sim(&self) -> Result<Option<DefaultSimInfo>, PlatformError>;
}

/// Build metadata used for emulator heuristics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildProperties {
    pub device: String,
    pub manufacturer: String,
    pub hardware: String,
    pub product: String,
    pub model: String,
    pub brand: String,
    pub fingerprint: String,
    pub tags: String,
}

/// Device metadata queries.
pub trait DeviceInfoProvider: Send + Sync {
    /// Platform-assigned device identifier, `None` where the platform withholds it.
    fn device_id(&self) -> Option<String>;

    /// Platform API level.
    fn api_level(&self) -> u32;

    /// Build metadata.
    fn build_properties(&self) -> BuildProperties;
}

/// App-scoped key-value persistence.
pub trait KeyValueStore: Send + Sync {
    /// Read a value.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write `value` only if `key` is absent and return whatever is stored
    /// afterwards: `value` on success, the existing value otherwise.
    fn put_if_absent(&self, key: &str, value: &str) -> Result<String, StorageError>;
}

/// In-memory [`KeyValueStore`].
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    values: Mutex<HashMap<String, String>>,
    writes: Mutex<u64>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with one entry.
    pub fn with_entry(key: impl Into<String>, value: impl Into<String>) -> Self {
        let store = Self::new();
        if let Ok(mut values) = store.values.lock() {
            values.insert(key.into(), value.into());
        }
        store
    }

    /// Number of successful writes.
    pub fn write_count(&self) -> u64 {
        self.writes.lock().map(|w| *w).unwrap_or(0)
    }

    /// Drop an entry, simulating an app data wipe.
    pub fn remove(&self, key: &str) {
        if let Ok(mut values) = self.values.lock() {
            values.remove(key);
        }
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let values = self.values.lock().map_err(|_| StorageError::Read {
            key: key.to_string(),
            reason: "lock poisoned".to_string(),
        })?;
        Ok(values.get(key).cloned())
    }

    fn put_if_absent(&self, key: &str, value: &str) -> Result<String, StorageError> {
        let mut values = self.values.lock().map_err(|_| StorageError::Write {
            key: key.to_string(),
            reason: "lock poisoned".to_string(),
        })?;
        if let Some(existing) = values.get(key) {
            return Ok(existing.clone());
        }
        values.insert(key.to_string(), value.to_string());
        if let Ok(mut writes) = self.writes.lock() {
            *writes += 1;
        }
        Ok(value.to_string())
    }
}

/// Handle the platform uses to deliver SIM notifications to a watcher.
#[derive(Debug, Clone)]
pub struct NotificationSink {
    tx: mpsc::UnboundedSender<SimNotification>,
}

impl NotificationSink {
    pub(crate) fn new(tx: mpsc::UnboundedSender<SimNotification>) -> Self {
        Self { tx }
    }

    /// Deliver one notification. Returns `false` once the watcher is gone.
    pub fn notify(&self, notification: SimNotification) -> bool {
        self.tx.send(notification).is_ok()
    }
}

/// Platform registration point for SIM change notifications.
pub trait SimNotificationSource: Send + Sync {
    /// Start delivering the listed notifications to `sink`.
    fn register(
        &self,
        notifications: &[SimNotification],
        sink: NotificationSink,
    ) -> Result<(), PlatformError>;

    /// Stop all deliveries registered by [`SimNotificationSource::register`].
    fn unregister(&self);
}
