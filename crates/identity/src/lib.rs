//! Device identity and SIM binding for SimBind.
//!
//! This crate binds an installation to the physical device and to the SIM
//! currently inserted, and reports on the trustworthiness of the execution
//! environment.
//!
//! # Core Concepts
//!
//! - **SIM Records**: Enumerated SIMs carrying a hashed identifier
//! - **Device Fingerprint**: Hash over device id, SIM hash and install id
//! - **Security Posture**: Advisory root, emulator and key-class checks
//! - **SIM Watching**: Debounced presence/removal events
//!
//! # Privacy
//!
//! Raw device and SIM identifiers are never logged. Only their SHA-256
//! hashes appear in log fields.
//!
//! # Platform Seams
//!
//! Every OS service is reached through a trait in [`platform`], so the
//! same logic runs against the real platform bindings and against the
//! fakes in `testing` (enabled by the `testing` feature).

pub mod error;
pub mod fingerprint;
pub mod platform;
pub mod posture;
pub mod sim;
pub mod watcher;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{
    FingerprintError, PlatformError, SimError, SimResult, StorageError, WatcherError,
};
pub use fingerprint::{compose_fingerprint, DeviceFingerprint, DeviceIdentity};
pub use platform::{
    BuildProperties, DefaultSimInfo, DeviceInfoProvider, KeyValueStore, MemoryKeyValueStore,
    NotificationSink, SimNotificationSource, SubscriptionInfo, TelephonyProvider,
};
pub use posture::{
    is_emulator_build, BootState, HardwareClass, HostProbe, RootProbe, SecurityPosture,
    SecurityReport, Verdict, ROOT_INDICATOR_PATHS,
};
pub use sim::{SimRecord, SimResolver, NO_SLOT};
pub use watcher::{
    SimChangeCallback, SimChangeEvent, SimWatcher, StateTransition, WatcherState,
    DEFAULT_DEBOUNCE,
};
