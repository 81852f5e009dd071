//! Reconnection of equipment missing from some snapshots.
//!
//! The equipment of a substation is the union over every snapshot of that
//! substation id. A snapshot missing some of it gets one new bus per missing
//! equipment, so all snapshots mention the same equipment set.

use std::collections::{BTreeMap, BTreeSet};

use subtopo_core::{Bus, Equipment, TopologyHistory};

pub fn reconnect_disconnected_equipment(history: &mut TopologyHistory) -> Vec<String> {
    let mut union: BTreeMap<String, BTreeSet<Equipment>> = BTreeMap::new();
    for substation in history.substations() {
        union
            .entry(substation.id.clone())
            .or_default()
            .extend(substation.equipment().cloned());
    }

    let mut reconnected = Vec::new();
    for substation in history.substations_mut() {
        let Some(all) = union.get(&substation.id) else {
            continue;
        };
        let present: BTreeSet<Equipment> = substation.equipment().cloned().collect();
        for eq in all {
            if !present.contains(eq) {
                substation.buses.push(Bus::new(vec![eq.clone()]));
                reconnected.push(eq.to_string());
            }
        }
    }
    reconnected
}
