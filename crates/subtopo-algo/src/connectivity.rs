//! Stacked connectivity index.
//!
//! Stacks every historical bus of every snapshot and records, per substation,
//! which pairs of equipment were at least once on the same bus. The builder uses
//! it as an oracle: two canonical buses that never shared a historical bus never
//! need a switch between them.
//!
//! The index is a snapshot of the history at construction time and must be rebuilt
//! after the history changes.

use std::collections::{HashMap, HashSet};

use subtopo_core::{Equipment, TopologyHistory};

#[derive(Debug, Clone, Default)]
pub struct StackedConnectivityIndex {
    neighbours: HashMap<String, HashMap<Equipment, HashSet<Equipment>>>,
}

impl StackedConnectivityIndex {
    pub fn build(history: &TopologyHistory) -> Self {
        let mut neighbours: HashMap<String, HashMap<Equipment, HashSet<Equipment>>> =
            HashMap::new();
        for substation in history.substations() {
            let by_equipment = neighbours.entry(substation.id.clone()).or_default();
            for bus in &substation.buses {
                for a in &bus.equipment {
                    let set = by_equipment.entry(a.clone()).or_default();
                    set.extend(bus.equipment.iter().cloned());
                }
            }
        }
        Self { neighbours }
    }

    /// Whether some equipment of `bus_a` and some equipment of `bus_b` were ever on
    /// the same bus of `substation`.
    pub fn were_sometimes_connected<'a, A, B>(&self, substation: &str, bus_a: A, bus_b: B) -> bool
    where
        A: IntoIterator<Item = &'a Equipment>,
        B: IntoIterator<Item = &'a Equipment> + Clone,
    {
        let Some(by_equipment) = self.neighbours.get(substation) else {
            return false;
        };
        bus_a.into_iter().any(|a| {
            by_equipment
                .get(a)
                .is_some_and(|set| bus_b.clone().into_iter().any(|b| set.contains(b)))
        })
    }

    /// Number of substations indexed.
    pub fn len(&self) -> usize {
        self.neighbours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbours.is_empty()
    }
}
