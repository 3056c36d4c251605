//! End-to-end tests for the SimBind device binding core
//!
//! This test suite validates:
//! - The host facade against scripted platform collaborators
//! - First-run scenarios (missing permission, unavailable key store)
//! - Signature round trips verified with an independent P-256 verifier
//! - SIM number fallback ordering across platform versions
//! - SIM watcher debouncing, coalescing and removal reporting

pub mod test_utils;

#[cfg(test)]
mod device_binding_scenarios;

#[cfg(test)]
mod sim_fallback_tests;

#[cfg(test)]
mod sim_watcher_tests;
