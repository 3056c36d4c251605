//! Host-facing wire types.

use serde::{Deserialize, Serialize};
use simbind_identity::{SimChangeEvent, SimRecord};

/// SIM change event as delivered to the host listener.
///
/// Serializes flat: `{ "simRemoved": bool, "simId": ..., "slotIndex": ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimChangeNotice {
    pub sim_removed: bool,
    #[serde(flatten)]
    pub sim: SimRecord,
}

impl From<SimChangeEvent> for SimChangeNotice {
    fn from(event: SimChangeEvent) -> Self {
        Self {
            sim_removed: !event.present,
            sim: event.record,
        }
    }
}
