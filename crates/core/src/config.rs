//! Configuration management for SimBind.

use serde::{Deserialize, Serialize};
#[cfg(feature = "config-file")]
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub keystore: KeystoreConfig,
    pub identity: IdentityConfig,
    pub watcher: WatcherConfig,
    #[serde(default)]
    pub posture: PostureConfig,
    #[serde(default)]
    pub platform: PlatformConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeystoreConfig {
    /// Fixed alias of the device binding keypair.
    pub alias: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Key-value store key holding the per-install UUID.
    pub install_id_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatcherConfig {
    pub debounce_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostureConfig {
    /// Extra root indicator paths checked alongside the built-in list.
    #[serde(default)]
    pub extra_root_paths: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Overrides the API level reported by the host, for testing.
    pub api_level: Option<u32>,
}

impl Config {
    #[cfg(feature = "config-file")]
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the vault and watcher cannot work with.
    pub fn validate(&self) -> crate::Result<()> {
        if self.keystore.alias.trim().is_empty() {
            return Err(crate::CoreError::Config(
                "keystore.alias must not be empty".to_string(),
            ));
        }
        if self.identity.install_id_key.trim().is_empty() {
            return Err(crate::CoreError::Config(
                "identity.install_id_key must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn default_config() -> Self {
        Self {
            keystore: KeystoreConfig {
                alias: "simbind_device_key".to_string(),
            },
            identity: IdentityConfig {
                install_id_key: "simbind.install_id".to_string(),
            },
            watcher: WatcherConfig { debounce_ms: 500 },
            posture: PostureConfig::default(),
            platform: PlatformConfig::default(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}
