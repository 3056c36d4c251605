//! Core functionality for the SimBind device binding system.
//!
//! This crate provides the fundamental types and utilities shared by the
//! key vault, the SIM resolver and the host bridge:
//!
//! - **Hashing**: one-way SHA-256 hex digests used instead of raw hardware ids
//! - **Platform capabilities**: version-keyed feature table resolved once at startup
//! - **Configuration**: serde-backed config with production defaults
//! - **Logging**: `tracing` subscriber initialization

pub mod capabilities;
pub mod config;
pub mod error;
pub mod hash;
pub mod logging;

pub use capabilities::{PlatformCapabilities, SimNotification, LEGACY_PROFILE_CUTOFF};
pub use config::Config;
pub use error::{CoreError, Result};
pub use hash::{hash, hash_str, EMPTY_HASH};
