//! Platform capability table.
//!
//! Telephony APIs and SIM-change notifications differ between platform
//! versions. Rather than scattering version checks over every call site, the
//! host resolves a [`PlatformCapabilities`] once at startup and the resolver
//! and watcher consult it.

use serde::{Deserialize, Serialize};

/// Platform versions at or above this level never attempt the linked
/// profile phone-number scan.
pub const LEGACY_PROFILE_CUTOFF: u32 = 26;

/// First version exposing per-slot subscription enumeration.
const SUBSCRIPTION_API_LEVEL: u32 = 22;

/// First version allowing carrier lookups scoped to one subscription.
const SCOPED_CARRIER_LOOKUP_LEVEL: u32 = 24;

/// SIM-related notifications a platform may deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SimNotification {
    /// Legacy SIM card state broadcast, present on every version.
    SimStateChanged,
    /// Active subscription list changed.
    SubscriptionsChanged,
    /// Carrier configuration reloaded for a subscription.
    CarrierConfigChanged,
    /// Default data/voice subscription switched.
    DefaultSubscriptionChanged,
}

impl SimNotification {
    /// Minimum platform version delivering this notification.
    pub const fn min_api_level(&self) -> u32 {
        match self {
            Self::SimStateChanged => 1,
            Self::SubscriptionsChanged => 22,
            Self::CarrierConfigChanged => 23,
            Self::DefaultSubscriptionChanged => 26,
        }
    }

    /// Platform action name, used only for diagnostics.
    pub const fn action_name(&self) -> &'static str {
        match self {
            Self::SimStateChanged => "android.intent.action.SIM_STATE_CHANGED",
            Self::SubscriptionsChanged => {
                "android.telephony.action.SUBSCRIPTION_CHANGED"
            }
            Self::CarrierConfigChanged => {
                "android.telephony.action.CARRIER_CONFIG_CHANGED"
            }
            Self::DefaultSubscriptionChanged => {
                "android.telephony.action.DEFAULT_SUBSCRIPTION_CHANGED"
            }
        }
    }

    /// All known notification kinds, oldest first.
    pub const ALL: [SimNotification; 4] = [
        Self::SimStateChanged,
        Self::SubscriptionsChanged,
        Self::CarrierConfigChanged,
        Self::DefaultSubscriptionChanged,
    ];
}

/// Capabilities of the running platform version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformCapabilities {
    /// Platform API level the table was resolved for
    pub api_level: u32,
    /// Per-slot subscription enumeration is available
    pub subscription_enumeration: bool,
    /// Carrier lookups can be scoped to a single subscription
    pub scoped_carrier_lookup: bool,
    /// Linked profile phone-number scan may be attempted
    pub legacy_profile_lookup: bool,
    /// Notifications to register for, every one the version supports
    pub notifications: Vec<SimNotification>,
}

impl PlatformCapabilities {
    /// Resolve the capability table for a platform API level.
    pub fn for_api_level(api_level: u32) -> Self {
        let notifications = SimNotification::ALL
            .iter()
            .copied()
            .filter(|n| api_level >= n.min_api_level())
            .collect();

        Self {
            api_level,
            subscription_enumeration: api_level >= SUBSCRIPTION_API_LEVEL,
            scoped_carrier_lookup: api_level >= SCOPED_CARRIER_LOOKUP_LEVEL,
            legacy_profile_lookup: api_level < LEGACY_PROFILE_CUTOFF,
            notifications,
        }
    }

    /// Whether the given notification is delivered on this version.
    pub fn supports(&self, notification: SimNotification) -> bool {
        self.notifications.contains(&notification)
    }
}
