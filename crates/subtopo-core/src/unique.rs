//! Canonical topology derived from a cleaned history.
//!
//! One [`UniqueSubstation`] per substation id: canonical buses holding equipment that
//! is always co-located across the history, and switches between pairs of canonical
//! buses. Opening and closing those switches reproduces every sampled configuration.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::equipment::Equipment;

/// A canonical bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueBus {
    pub num: usize,
    pub equipment: BTreeSet<Equipment>,
}

impl UniqueBus {
    pub fn contains(&self, eq: &Equipment) -> bool {
        self.equipment.contains(eq)
    }
}

/// A switch between two canonical buses of the same substation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueSwitch {
    pub id: String,
    pub bus1: usize,
    pub bus2: usize,
}

/// Canonical topology of one substation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueSubstation {
    pub id: String,
    pub buses: Vec<UniqueBus>,
    pub switches: Vec<UniqueSwitch>,
}

impl UniqueSubstation {
    /// Switch id as created in the network.
    pub fn switch_id(substation_id: &str, num: usize) -> String {
        format!("{substation_id}_SW_{num}")
    }

    /// Bus id as created in the network.
    pub fn bus_id(substation_id: &str, num: usize) -> String {
        format!("{substation_id}_TOPO_{num}")
    }

    /// Bus holding the disconnected terminals of equipment kept on another
    /// voltage level or under another duplicate index.
    pub fn disconnected_bus_id(substation_id: &str) -> String {
        format!("{substation_id}_DISCONNECTED")
    }

    /// Canonical bus number of `eq`.
    pub fn bus_of(&self, eq: &Equipment) -> Option<usize> {
        self.buses.iter().find(|b| b.contains(eq)).map(|b| b.num)
    }

    pub fn equipment(&self) -> impl Iterator<Item = &Equipment> {
        self.buses.iter().flat_map(|b| b.equipment.iter())
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.equipment().any(|e| e.id == id)
    }

    /// Equipment to canonical bus number.
    pub fn bus_index(&self) -> BTreeMap<&Equipment, usize> {
        self.buses
            .iter()
            .flat_map(|b| b.equipment.iter().map(move |e| (e, b.num)))
            .collect()
    }
}

/// Canonical topology of every substation, keyed by substation id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueTopology {
    pub substations: BTreeMap<String, UniqueSubstation>,
}

impl UniqueTopology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, substation: UniqueSubstation) {
        self.substations.insert(substation.id.clone(), substation);
    }

    pub fn get(&self, id: &str) -> Option<&UniqueSubstation> {
        self.substations.get(id)
    }

    pub fn len(&self) -> usize {
        self.substations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.substations.is_empty()
    }

    pub fn switch_count(&self) -> usize {
        self.substations.values().map(|s| s.switches.len()).sum()
    }

    /// Whether some substation holds an equipment with this id.
    pub fn contains_id(&self, id: &str) -> bool {
        self.substations.values().any(|s| s.contains_id(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn substation() -> UniqueSubstation {
        UniqueSubstation {
            id: "VL1".into(),
            buses: vec![
                UniqueBus {
                    num: 0,
                    equipment: [Equipment::new("L1"), Equipment::new("LD1")]
                        .into_iter()
                        .collect(),
                },
                UniqueBus {
                    num: 1,
                    equipment: [Equipment::new("L1").with_index(1)].into_iter().collect(),
                },
            ],
            switches: vec![UniqueSwitch {
                id: UniqueSubstation::switch_id("VL1", 0),
                bus1: 0,
                bus2: 1,
            }],
        }
    }

    #[test]
    fn test_bus_lookup_uses_duplicate_index() {
        let s = substation();
        assert_eq!(s.bus_of(&Equipment::new("L1")), Some(0));
        assert_eq!(s.bus_of(&Equipment::new("L1").with_index(1)), Some(1));
        assert_eq!(s.bus_of(&Equipment::new("G1")), None);
        assert_eq!(s.bus_index().len(), 3);
    }

    #[test]
    fn test_topology_counts() {
        let mut topo = UniqueTopology::new();
        topo.insert(substation());
        assert_eq!(topo.len(), 1);
        assert_eq!(topo.switch_count(), 1);
        assert!(topo.contains_id("LD1"));
        assert_eq!(topo.get("VL1").unwrap().switches[0].id, "VL1_SW_0");
        assert_eq!(UniqueSubstation::disconnected_bus_id("VL1"), "VL1_DISCONNECTED");
    }
}
