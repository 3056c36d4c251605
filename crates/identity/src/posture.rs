//! Device security posture.
//!
//! Detects compromised execution environments:
//! - Rooted devices (root binaries, root managers, `su` on the shell path)
//! - Emulators (build metadata signatures)
//! - Hardware security class of the device binding key
//!
//! Every check here is advisory. Detection can false-negative, and no check
//! ever fails the caller: an inconclusive probe is reported as a typed
//! [`Verdict`] and degrades to the conservative answer at the boolean
//! surface.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use simbind_crypto::{SecureKeyStore, SecurityLevel};
use tracing::{debug, info, warn};

use crate::platform::{BuildProperties, DeviceInfoProvider};

/// Root binaries and root-manager artifacts.
pub const ROOT_INDICATOR_PATHS: &[&str] = &[
    "/system/bin/su",
    "/system/xbin/su",
    "/sbin/su",
    "/system/su",
    "/data/local/xbin/su",
    "/data/local/bin/su",
    "/data/local/su",
    "/system/sd/xbin/su",
    "/system/bin/failsafe/su",
    "/su/bin/su",
    "/system/app/Superuser.apk",
    "/data/adb/magisk",
    "/sbin/.magisk",
    "/cache/.disable_magisk",
    "/dev/.magisk.unblock",
    "/data/data/com.topjohnwu.magisk",
    "/data/data/eu.chainfire.supersu",
    "/data/data/com.noshufou.android.su",
    "/data/data/com.koushikdutta.superuser",
];

/// Outcome of a best-effort check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Detected,
    NotDetected,
    /// The probe itself failed; nothing can be concluded.
    Inconclusive(String),
}

impl Verdict {
    /// Boolean view: only a positive detection counts.
    pub fn is_detected(&self) -> bool {
        matches!(self, Self::Detected)
    }

    fn or(self, other: impl FnOnce() -> Verdict) -> Verdict {
        match self {
            Self::Detected => Self::Detected,
            Self::NotDetected => other(),
            Self::Inconclusive(reason) => match other() {
                Self::Detected => Self::Detected,
                _ => Self::Inconclusive(reason),
            },
        }
    }
}

/// Filesystem and shell access used by root detection.
pub trait RootProbe: Send + Sync {
    /// Whether `path` exists.
    fn path_exists(&self, path: &str) -> std::io::Result<bool>;

    /// Whether a shell lookup for `binary` succeeds.
    fn shell_which(&self, binary: &str) -> std::io::Result<bool>;
}

/// [`RootProbe`] on the local filesystem and process table.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostProbe;

impl RootProbe for HostProbe {
    fn path_exists(&self, path: &str) -> std::io::Result<bool> {
        match std::fs::symlink_metadata(path) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn shell_which(&self, binary: &str) -> std::io::Result<bool> {
        let output = std::process::Command::new("which").arg(binary).output()?;
        Ok(output.status.success() && !output.stdout.is_empty())
    }
}

/// Where the vault key's private material is protected, most trusted first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HardwareClass {
    #[serde(rename = "STRONGBOX")]
    StrongBox,
    Tee,
    Software,
    Unknown,
}

impl HardwareClass {
    /// Trust rank, higher is better.
    pub const fn security_level(&self) -> u8 {
        match self {
            Self::StrongBox => 3,
            Self::Tee => 2,
            Self::Software => 1,
            Self::Unknown => 0,
        }
    }

    pub const fn is_hardware_backed(&self) -> bool {
        matches!(self, Self::StrongBox | Self::Tee)
    }
}

impl From<SecurityLevel> for HardwareClass {
    fn from(level: SecurityLevel) -> Self {
        match level {
            SecurityLevel::StrongBox => Self::StrongBox,
            SecurityLevel::TrustedEnvironment => Self::Tee,
            SecurityLevel::Software => Self::Software,
        }
    }
}

/// Heuristic boot state. Not attestation-grade: derived from root
/// detection, not from a verified boot chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BootState {
    Verified,
    Unverified,
}

/// Snapshot of every posture signal. Recomputed on each call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityReport {
    pub rooted: bool,
    pub emulator: bool,
    pub key_hardware_class: HardwareClass,
    pub boot_state: BootState,
}

/// Posture evaluator bound to the vault key.
pub struct SecurityPosture {
    probe: Arc<dyn RootProbe>,
    device: Arc<dyn DeviceInfoProvider>,
    key_store: Arc<dyn SecureKeyStore>,
    key_alias: String,
    root_paths: Vec<String>,
}

impl SecurityPosture {
    pub fn new(
        probe: Arc<dyn RootProbe>,
        device: Arc<dyn DeviceInfoProvider>,
        key_store: Arc<dyn SecureKeyStore>,
        key_alias: impl Into<String>,
    ) -> Self {
        Self {
            probe,
            device,
            key_store,
            key_alias: key_alias.into(),
            root_paths: ROOT_INDICATOR_PATHS.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Check additional root indicator paths.
    #[must_use]
    pub fn with_extra_root_paths(mut self, paths: impl IntoIterator<Item = String>) -> Self {
        for path in paths {
            if !self.root_paths.contains(&path) {
                self.root_paths.push(path);
            }
        }
        self
    }

    /// Root verdict across every heuristic.
    pub fn root_verdict(&self) -> Verdict {
        self.root_path_verdict()
            .or(|| self.shell_verdict())
            .or(|| self.build_tags_verdict())
    }

    /// Advisory root check; inconclusive probes count as not rooted.
    pub fn is_rooted(&self) -> bool {
        let verdict = self.root_verdict();
        if let Verdict::Inconclusive(reason) = &verdict {
            debug!(%reason, "Root check inconclusive");
        }
        verdict.is_detected()
    }

    /// Emulator check over build metadata. Pure, no I/O.
    pub fn is_emulator(&self) -> bool {
        is_emulator_build(&self.device.build_properties())
    }

    /// Hardware class protecting the vault key.
    ///
    /// [`HardwareClass::Unknown`] when the key does not exist, the store is
    /// unreachable or it cannot report a level.
    pub fn hardware_security_class(&self) -> HardwareClass {
        match self.key_store.security_level(&self.key_alias) {
            Ok(Some(level)) => level.into(),
            Ok(None) => HardwareClass::Unknown,
            Err(e) => {
                debug!(error = %e, "Key security level unavailable");
                HardwareClass::Unknown
            }
        }
    }

    /// `Unverified` iff rooted. A heuristic proxy for verified boot.
    pub fn boot_state(&self) -> BootState {
        boot_state_for(self.is_rooted())
    }

    /// Evaluate every signal once.
    pub fn report(&self) -> SecurityReport {
        let rooted = self.is_rooted();
        let report = SecurityReport {
            rooted,
            emulator: self.is_emulator(),
            key_hardware_class: self.hardware_security_class(),
            boot_state: boot_state_for(rooted),
        };
        if report.rooted || report.emulator {
            warn!(
                rooted = report.rooted,
                emulator = report.emulator,
                hardware_class = ?report.key_hardware_class,
                "Device posture degraded"
            );
        } else {
            info!(hardware_class = ?report.key_hardware_class, "Device posture evaluated");
        }
        report
    }

    fn root_path_verdict(&self) -> Verdict {
        let mut failure = None;
        for path in &self.root_paths {
            match self.probe.path_exists(path) {
                Ok(true) => {
                    debug!(%path, "Root indicator present");
                    return Verdict::Detected;
                }
                Ok(false) => {}
                Err(e) => failure = Some(format!("{path}: {e}")),
            }
        }
        match failure {
            Some(reason) => Verdict::Inconclusive(reason),
            None => Verdict::NotDetected,
        }
    }

    fn shell_verdict(&self) -> Verdict {
        match self.probe.shell_which("su") {
            Ok(true) => Verdict::Detected,
            Ok(false) => Verdict::NotDetected,
            Err(e) => Verdict::Inconclusive(format!("which su: {e}")),
        }
    }

    fn build_tags_verdict(&self) -> Verdict {
        if self.device.build_properties().tags.contains("test-keys") {
            Verdict::Detected
        } else {
            Verdict::NotDetected
        }
    }
}

fn boot_state_for(rooted: bool) -> BootState {
    if rooted {
        BootState::Unverified
    } else {
        BootState::Verified
    }
}

/// Match build metadata against known emulator signatures.
pub fn is_emulator_build(build: &BuildProperties) -> bool {
    let fingerprint = build.fingerprint.to_lowercase();
    let model = build.model.to_lowercase();
    let product = build.product.to_lowercase();
    let hardware = build.hardware.to_lowercase();
    let device = build.device.to_lowercase();

    fingerprint.starts_with("generic")
        || fingerprint.starts_with("unknown")
        || fingerprint.contains("emulator")
        || fingerprint.contains("vbox")
        || model.contains("google_sdk")
        || model.contains("emulator")
        || model.contains("android sdk built for")
        || model.starts_with("sdk_gphone")
        || build.manufacturer.contains("Genymotion")
        || matches!(hardware.as_str(), "goldfish" | "ranchu" | "vbox86")
        || matches!(
            product.as_str(),
            "sdk" | "google_sdk" | "sdk_x86" | "sdk_google" | "vbox86p" | "emulator" | "simulator"
        )
        || product.starts_with("sdk_gphone")
        || matches!(device.as_str(), "generic" | "generic_x86" | "generic_x86_64" | "vbox86p")
        || (build.brand.starts_with("generic") && device.starts_with("generic"))
}
