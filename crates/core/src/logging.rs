//! Structured logging infrastructure for SimBind.
//!
//! This module provides centralized logging initialization with support
//! for structured JSON output and environment-based configuration.
//! Only hashed identifiers may appear in log fields.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "info";

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Initialize the logging system with structured output.
///
/// Log level can be configured via the `RUST_LOG` environment variable.
/// If not set, defaults to `info` level.
///
/// # Example
/// ```no_run
/// use simbind_core::logging;
///
/// logging::init();
/// tracing::info!("Device binding core started");
/// ```
pub fn init() {
    tracing_subscriber::registry()
        .with(filter())
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .init();
}

/// Initialize the logging system with JSON output for production environments.
///
/// # Example
/// ```no_run
/// use simbind_core::logging;
///
/// logging::init_json();
/// tracing::info!(component = "key_vault", "Vault ready");
/// ```
pub fn init_json() {
    tracing_subscriber::registry()
        .with(filter())
        .with(fmt::layer().json().with_target(true).with_thread_ids(true))
        .init();
}

/// Like [`init`], but tolerates a subscriber already being installed.
///
/// Hosts that embed the core as a library call this from every entry
/// point; only the first call takes effect.
pub fn try_init() -> bool {
    tracing_subscriber::registry()
        .with(filter())
        .with(fmt::layer().with_target(true))
        .try_init()
        .is_ok()
}
