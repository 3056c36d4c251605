//! Host bridge for the SimBind device binding core.
//!
//! [`DeviceBindingModule`] is the single entry point the host application
//! talks to. It wires the platform collaborators into the SIM resolver, key
//! vault, device identity, security posture and SIM watcher, and converts
//! every failure into a [`BridgeError`] with a stable code.
//!
//! Public keys and signatures cross the boundary as base64 strings; records
//! serialize with camelCase field names.

pub mod error;
pub mod module;
pub mod wire;

pub use error::{BridgeError, ErrorCode};
pub use module::{DeviceBindingModule, PlatformServices};
pub use wire::SimChangeNotice;
