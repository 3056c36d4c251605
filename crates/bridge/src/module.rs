//! The device binding facade exposed to the host.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use simbind_core::{logging, Config, PlatformCapabilities};
use simbind_crypto::{KeyVault, PublicKeyInfo, SecureKeyStore};
use simbind_identity::{
    DeviceFingerprint, DeviceIdentity, DeviceInfoProvider, KeyValueStore, RootProbe,
    SecurityPosture, SecurityReport, SimNotificationSource, SimRecord, SimResolver, SimWatcher,
    TelephonyProvider,
};
use tracing::{debug, error, info, warn};

use crate::error::BridgeError;
use crate::wire::SimChangeNotice;

/// Platform collaborators the module is wired to.
#[derive(Clone)]
pub struct PlatformServices {
    pub telephony: Arc<dyn TelephonyProvider>,
    pub device: Arc<dyn DeviceInfoProvider>,
    pub storage: Arc<dyn KeyValueStore>,
    pub key_store: Arc<dyn SecureKeyStore>,
    pub root_probe: Arc<dyn RootProbe>,
    pub notifications: Arc<dyn SimNotificationSource>,
}

/// Device binding operations for the host application.
pub struct DeviceBindingModule {
    resolver: Arc<SimResolver>,
    vault: KeyVault,
    identity: DeviceIdentity,
    posture: SecurityPosture,
    notifications: Arc<dyn SimNotificationSource>,
    debounce: Duration,
    listener: Mutex<Option<SimWatcher>>,
}

impl DeviceBindingModule {
    pub fn new(config: &Config, services: PlatformServices) -> Self {
        logging::try_init();

        let api_level = config
            .platform
            .api_level
            .unwrap_or_else(|| services.device.api_level());
        let capabilities = PlatformCapabilities::for_api_level(api_level);
        info!(
            api_level,
            alias = %config.keystore.alias,
            "Initializing device binding module"
        );

        let resolver = Arc::new(SimResolver::new(services.telephony, capabilities));
        let vault = KeyVault::new(Arc::clone(&services.key_store), config.keystore.alias.clone());
        let identity = DeviceIdentity::new(
            Arc::clone(&services.device),
            services.storage,
            Arc::clone(&resolver),
            config.identity.install_id_key.clone(),
        );
        let posture = SecurityPosture::new(
            services.root_probe,
            services.device,
            services.key_store,
            config.keystore.alias.clone(),
        )
        .with_extra_root_paths(config.posture.extra_root_paths.iter().cloned());

        Self {
            resolver,
            vault,
            identity,
            posture,
            notifications: services.notifications,
            debounce: Duration::from_millis(config.watcher.debounce_ms),
            listener: Mutex::new(None),
        }
    }

    /// Build from a TOML configuration file.
    pub fn from_config_file<P: AsRef<Path>>(
        path: P,
        services: PlatformServices,
    ) -> anyhow::Result<Self> {
        let config = Config::from_file(path)?;
        Ok(Self::new(&config, services))
    }

    /// Every SIM currently present.
    pub fn get_all_sims(&self) -> Result<Vec<SimRecord>, BridgeError> {
        Ok(self.resolver.list_sims()?)
    }

    /// SIM in `slot_index`, or the first SIM if that slot is empty.
    pub fn get_sim_info(&self, slot_index: i32) -> Result<SimRecord, BridgeError> {
        Ok(self.resolver.primary_sim(slot_index)?)
    }

    pub fn get_device_fingerprint(&self) -> Result<DeviceFingerprint, BridgeError> {
        Ok(self.identity.fingerprint()?)
    }

    /// Ensure the binding key exists. Never fails: any key store error is
    /// reported as `{ publicKey: "", success: false }`.
    pub fn initialize_keystore(&self) -> PublicKeyInfo {
        match self.vault.ensure_key() {
            Ok(info) => info,
            Err(e) => {
                error!(alias = %self.vault.alias(), error = %e, "Key store initialization failed");
                PublicKeyInfo::failed()
            }
        }
    }

    /// Sign a base64 challenge. The decoded bytes are signed, not the
    /// base64 text.
    pub fn sign_challenge(&self, challenge_base64: &str) -> Result<String, BridgeError> {
        let challenge = STANDARD.decode(challenge_base64.trim()).map_err(|e| {
            warn!(error = %e, "Rejected malformed challenge");
            BridgeError::invalid_challenge(e)
        })?;
        let signature = self.vault.sign(&challenge)?;
        debug!(challenge_len = challenge.len(), "Challenge signed");
        Ok(STANDARD.encode(signature))
    }

    pub fn is_rooted(&self) -> bool {
        self.posture.is_rooted()
    }

    pub fn is_emulator(&self) -> bool {
        self.posture.is_emulator()
    }

    pub fn get_security_info(&self) -> SecurityReport {
        self.posture.report()
    }

    /// Start delivering SIM change notices to `callback`.
    ///
    /// Replaces any listener already running. Must be called from within a
    /// tokio runtime.
    pub fn start_sim_change_listener(
        &self,
        callback: impl Fn(SimChangeNotice) + Send + Sync + 'static,
    ) -> Result<(), BridgeError> {
        let mut listener = self.lock_listener();
        if let Some(previous) = listener.take() {
            debug!("Replacing running SIM change listener");
            previous.stop();
        }

        let watcher = SimWatcher::new(Arc::clone(&self.resolver), Arc::clone(&self.notifications))
            .with_debounce(self.debounce);
        watcher.start(move |event| callback(SimChangeNotice::from(event)))?;
        *listener = Some(watcher);
        Ok(())
    }

    /// Stop the SIM change listener. A no-op when none is running.
    pub fn stop_sim_change_listener(&self) {
        if let Some(watcher) = self.lock_listener().take() {
            watcher.stop();
        }
    }

    /// Whether a SIM change listener is registered.
    pub fn is_listening(&self) -> bool {
        self.lock_listener().is_some()
    }

    /// The underlying key vault.
    pub fn vault(&self) -> &KeyVault {
        &self.vault
    }

    fn lock_listener(&self) -> MutexGuard<'_, Option<SimWatcher>> {
        self.listener
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
