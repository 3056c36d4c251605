//! SIM enumeration and per-slot resolution.
//!
//! Each active subscription becomes a [`SimRecord`] carrying a stable
//! identifier, its hash and a best-effort phone number. Phone numbers come
//! from an ordered chain of sources; the first non-empty answer wins:
//!
//! ```text
//! subscription metadata number
//!     ↓ (empty)
//! carrier lookup scoped to the subscription
//!     ↓ (empty / failed)
//! linked profile scan        (legacy platform versions only)
//!     ↓ (empty)
//! ""                         (not an error)
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use simbind_core::{hash_str, PlatformCapabilities};
use tracing::{debug, info, warn};

use crate::error::{PlatformError, SimError, SimResult};
use crate::platform::{DefaultSimInfo, SubscriptionInfo, TelephonyProvider};

/// Slot index carried by the empty sentinel record.
pub const NO_SLOT: i32 = -1;

/// One SIM slot, resolved at query time. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimRecord {
    /// Stable SIM identifier (ICCID, or the subscription id where withheld)
    pub sim_id: String,
    /// `hash(sim_id)`
    pub sim_id_hash: String,
    /// Best-effort phone number, possibly empty
    pub phone_number: String,
    pub carrier_name: String,
    pub slot_index: i32,
}

impl SimRecord {
    /// Build a record, deriving the id hash.
    pub fn new(
        sim_id: impl Into<String>,
        phone_number: impl Into<String>,
        carrier_name: impl Into<String>,
        slot_index: i32,
    ) -> Self {
        let sim_id = sim_id.into();
        let sim_id_hash = if sim_id.is_empty() {
            String::new()
        } else {
            hash_str(&sim_id)
        };
        Self {
            sim_id,
            sim_id_hash,
            phone_number: phone_number.into(),
            carrier_name: carrier_name.into(),
            slot_index,
        }
    }

    /// Sentinel record reported when no SIM is present.
    pub fn empty() -> Self {
        Self {
            sim_id: String::new(),
            sim_id_hash: String::new(),
            phone_number: String::new(),
            carrier_name: String::new(),
            slot_index: NO_SLOT,
        }
    }

    /// Whether this is the [`SimRecord::empty`] sentinel.
    pub fn is_empty(&self) -> bool {
        self.sim_id.is_empty() && self.slot_index == NO_SLOT
    }
}

/// Stable identifier for a subscription: ICCID when readable, otherwise
/// the platform subscription id.
fn subscription_sim_id(sub: &SubscriptionInfo) -> String {
    let icc_id = sub.icc_id.trim();
    if icc_id.is_empty() {
        format!("sub:{}", sub.subscription_id)
    } else {
        icc_id.to_string()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Resolves SIM records from the telephony provider.
pub struct SimResolver {
    telephony: Arc<dyn TelephonyProvider>,
    capabilities: PlatformCapabilities,
}

impl SimResolver {
    pub fn new(telephony: Arc<dyn TelephonyProvider>, capabilities: PlatformCapabilities) -> Self {
        Self {
            telephony,
            capabilities,
        }
    }

    /// Capability table the resolver was built with.
    pub fn capabilities(&self) -> &PlatformCapabilities {
        &self.capabilities
    }

    /// All SIMs present right now, ordered by slot.
    ///
    /// Falls back to the legacy default-SIM query when no subscription can
    /// be enumerated. Fails with [`SimError::NoSim`] rather than inventing an
    /// identifier.
    pub fn list_sims(&self) -> SimResult<Vec<SimRecord>> {
        let subscriptions = if self.capabilities.subscription_enumeration {
            match self.telephony.active_subscriptions() {
                Ok(subs) => subs,
                Err(PlatformError::PermissionDenied(reason)) => {
                    warn!("SIM enumeration denied");
                    return Err(SimError::Permission { reason });
                }
                Err(PlatformError::Unavailable(reason)) => {
                    warn!(%reason, "Subscription service unavailable, using legacy path");
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        if subscriptions.is_empty() {
            return self.legacy_default_sim().map(|record| vec![record]);
        }

        let mut records: Vec<SimRecord> = subscriptions
            .iter()
            .map(|sub| {
                SimRecord::new(
                    subscription_sim_id(sub),
                    self.resolve_phone_number(sub),
                    sub.carrier_name.clone(),
                    sub.slot_index,
                )
            })
            .collect();
        records.sort_by_key(|record| record.slot_index);

        debug!(count = records.len(), "SIMs resolved");
        Ok(records)
    }

    /// SIM in `slot_index`, or the first available SIM if that slot is empty.
    pub fn primary_sim(&self, slot_index: i32) -> SimResult<SimRecord> {
        let mut records = self.list_sims()?;
        if let Some(pos) = records.iter().position(|r| r.slot_index == slot_index) {
            return Ok(records.swap_remove(pos));
        }
        if records.is_empty() {
            return Err(SimError::NoSim);
        }
        debug!(
            requested = slot_index,
            fallback = records[0].slot_index,
            "Requested slot empty, using first SIM"
        );
        Ok(records.swap_remove(0))
    }

    fn resolve_phone_number(&self, sub: &SubscriptionInfo) -> String {
        non_empty(sub.number.clone())
            .or_else(|| self.carrier_lookup(sub.subscription_id))
            .or_else(|| self.linked_profile_number())
            .unwrap_or_default()
    }

    fn carrier_lookup(&self, subscription_id: i32) -> Option<String> {
        if !self.capabilities.scoped_carrier_lookup {
            return None;
        }
        match self.telephony.carrier_line_number(subscription_id) {
            Ok(number) => non_empty(number),
            Err(e) => {
                debug!(subscription_id, error = %e, "Carrier number lookup failed");
                None
            }
        }
    }

    fn linked_profile_number(&self) -> Option<String> {
        if !self.capabilities.legacy_profile_lookup {
            return None;
        }
        match self.telephony.profile_phone_numbers() {
            Ok(numbers) => numbers.into_iter().find_map(|n| non_empty(Some(n))),
            Err(e) => {
                debug!(error = %e, "Profile number scan failed");
                None
            }
        }
    }

    fn legacy_default_sim(&self) -> SimResult<SimRecord> {
        let info: DefaultSimInfo = match self.telephony.default_sim() {
            Ok(Some(info)) if !info.sim_serial.trim().is_empty() => info,
            Ok(_) => {
                info!("No SIM found on legacy path");
                return Err(SimError::NoSim);
            }
            Err(e) => return Err(e.into()),
        };

        let phone_number = non_empty(info.line_number.clone())
            .or_else(|| self.linked_profile_number())
            .unwrap_or_default();

        Ok(SimRecord::new(
            info.sim_serial.trim(),
            phone_number,
            info.operator_name,
            0,
        ))
    }
}
