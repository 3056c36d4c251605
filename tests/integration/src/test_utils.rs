//! Test utilities for end-to-end device binding tests

use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use p256::ecdsa::{signature::Verifier, Signature, VerifyingKey};
use p256::pkcs8::DecodePublicKey;
use simbind_bridge::{DeviceBindingModule, PlatformServices, SimChangeNotice};
use simbind_core::{logging, Config};
use simbind_crypto::{SecurityLevel, SoftwareKeyStore};
use simbind_identity::testing::{
    ManualNotificationSource, ScriptedTelephony, StaticDeviceInfo, StaticRootProbe,
};
use simbind_identity::MemoryKeyValueStore;
use tokio::sync::mpsc::UnboundedReceiver;

/// Debounce used by every watcher under test
pub const TEST_DEBOUNCE_MS: u64 = 20;

/// A device with scripted platform services and the module wired to them
pub struct TestDevice {
    pub telephony: Arc<ScriptedTelephony>,
    pub device: Arc<StaticDeviceInfo>,
    pub storage: Arc<MemoryKeyValueStore>,
    pub key_store: Arc<SoftwareKeyStore>,
    pub notifications: Arc<ManualNotificationSource>,
    pub module: DeviceBindingModule,
}

impl TestDevice {
    /// Device on a recent platform with one SIM and a TEE-backed key store
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> TestDeviceBuilder {
        TestDeviceBuilder::default()
    }
}

impl Default for TestDevice {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for [`TestDevice`]
pub struct TestDeviceBuilder {
    telephony: ScriptedTelephony,
    api_level: u32,
    device_id: Option<String>,
    level: SecurityLevel,
    root_probe: StaticRootProbe,
}

impl Default for TestDeviceBuilder {
    fn default() -> Self {
        Self {
            telephony: ScriptedTelephony::single("89014103211118510720", Some("+15550100")),
            api_level: 34,
            device_id: Some("a1b2c3d4e5f60789".to_string()),
            level: SecurityLevel::TrustedEnvironment,
            root_probe: StaticRootProbe::default(),
        }
    }
}

impl TestDeviceBuilder {
    pub fn telephony(mut self, telephony: ScriptedTelephony) -> Self {
        self.telephony = telephony;
        self
    }

    pub fn api_level(mut self, api_level: u32) -> Self {
        self.api_level = api_level;
        self
    }

    pub fn device_id(mut self, device_id: Option<&str>) -> Self {
        self.device_id = device_id.map(str::to_string);
        self
    }

    pub fn security_level(mut self, level: SecurityLevel) -> Self {
        self.level = level;
        self
    }

    pub fn root_probe(mut self, probe: StaticRootProbe) -> Self {
        self.root_probe = probe;
        self
    }

    pub fn build(self) -> TestDevice {
        logging::try_init();

        let telephony = Arc::new(self.telephony);
        let device = Arc::new(StaticDeviceInfo::new(
            self.device_id.as_deref(),
            self.api_level,
        ));
        let storage = Arc::new(MemoryKeyValueStore::new());
        let key_store = Arc::new(SoftwareKeyStore::with_level(self.level));
        let notifications = Arc::new(ManualNotificationSource::new());

        let mut config = Config::default_config();
        config.watcher.debounce_ms = TEST_DEBOUNCE_MS;

        let module = DeviceBindingModule::new(
            &config,
            PlatformServices {
                telephony: telephony.clone(),
                device: device.clone(),
                storage: storage.clone(),
                key_store: key_store.clone(),
                root_probe: Arc::new(self.root_probe),
                notifications: notifications.clone(),
            },
        );

        TestDevice {
            telephony,
            device,
            storage,
            key_store,
            notifications,
            module,
        }
    }
}

/// Verify a base64 DER signature against a base64 SPKI public key with an
/// independent P-256 verifier
pub fn verify_b64(public_key_b64: &str, payload: &[u8], signature_b64: &str) -> bool {
    let Ok(spki) = STANDARD.decode(public_key_b64) else {
        return false;
    };
    let Ok(signature_der) = STANDARD.decode(signature_b64) else {
        return false;
    };
    let Ok(key) = VerifyingKey::from_public_key_der(&spki) else {
        return false;
    };
    let Ok(signature) = Signature::from_der(&signature_der) else {
        return false;
    };
    key.verify(payload, &signature).is_ok()
}

/// Wait for the next listener notice
pub async fn next_notice(rx: &mut UnboundedReceiver<SimChangeNotice>) -> Option<SimChangeNotice> {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .ok()
        .flatten()
}

/// Long enough for any pending debounce, retry and resolution to finish
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(TEST_DEBOUNCE_MS * 8)).await;
}
