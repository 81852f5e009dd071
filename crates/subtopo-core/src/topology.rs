//! Historical topology snapshots.
//!
//! ## Hierarchy
//!
//! ```text
//! TopologyHistory
//! └── TopologyChoice (one per correlated cluster)
//!     └── PossibleTopology (probability + hash)
//!         └── MetaSubstation
//!             └── Substation (id = voltage level id)
//!                 └── Bus
//!                     └── Equipment
//! ```
//!
//! Every level owns its children by value. Cloning a [`PossibleTopology`] copies the
//! whole tree down to the equipment, so mutating a clone never affects the original.
//!
//! Equality follows the content, not the storage order: two buses are equal when they
//! hold the same equipment set, two substations when they have the same id, fictive
//! flag and bus partition, two meta-substations when they hold equal substations.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::equipment::{BusCounts, Equipment};
use crate::error::{TopoError, TopoResult};

/// A historical electrical bus: equipment that was connected together.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Bus {
    pub equipment: Vec<Equipment>,
    /// Assigned by [`TopologyHistory::number`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num: Option<i32>,
}

impl Bus {
    pub fn new(equipment: Vec<Equipment>) -> Self {
        Self {
            equipment,
            num: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.equipment.is_empty()
    }

    pub fn contains(&self, eq: &Equipment) -> bool {
        self.equipment.iter().any(|e| e == eq)
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.equipment.iter().any(|e| e.id == id)
    }

    /// Remove every occurrence of `eq`; returns whether something was removed.
    pub fn remove(&mut self, eq: &Equipment) -> bool {
        let before = self.equipment.len();
        self.equipment.retain(|e| e != eq);
        before != self.equipment.len()
    }

    pub fn equipment_set(&self) -> BTreeSet<&Equipment> {
        self.equipment.iter().collect()
    }

    pub fn counts(&self) -> BusCounts {
        BusCounts::of(self.equipment.iter().filter_map(|e| e.kind))
    }

    /// Only loads, no branch.
    pub fn is_isolated_loads(&self) -> bool {
        !self.equipment.is_empty() && self.equipment.iter().all(Equipment::is_load)
    }

    fn canonical(&self) -> Vec<&Equipment> {
        self.equipment_set().into_iter().collect()
    }
}

impl PartialEq for Bus {
    fn eq(&self, other: &Self) -> bool {
        self.equipment_set() == other.equipment_set()
    }
}

impl Eq for Bus {}

/// One substation of a sampled configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Substation {
    pub id: String,
    /// Synthetic substation hosting branches disconnected at one side.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub fictive: bool,
    pub buses: Vec<Bus>,
    /// Switch id to open state, filled once a unique topology is known.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub switches: BTreeMap<String, bool>,
}

impl Substation {
    pub fn new(id: impl Into<String>, buses: Vec<Bus>) -> Self {
        Self {
            id: id.into(),
            fictive: false,
            buses,
            switches: BTreeMap::new(),
        }
    }

    pub fn fictive(id: impl Into<String>, buses: Vec<Bus>) -> Self {
        Self {
            fictive: true,
            ..Self::new(id, buses)
        }
    }

    pub fn equipment(&self) -> impl Iterator<Item = &Equipment> {
        self.buses.iter().flat_map(|b| b.equipment.iter())
    }

    pub fn equipment_mut(&mut self) -> impl Iterator<Item = &mut Equipment> {
        self.buses.iter_mut().flat_map(|b| b.equipment.iter_mut())
    }

    pub fn equipment_set(&self) -> BTreeSet<&Equipment> {
        self.equipment().collect()
    }

    pub fn contains(&self, eq: &Equipment) -> bool {
        self.buses.iter().any(|b| b.contains(eq))
    }

    /// Index of the bus holding `eq`.
    pub fn bus_of(&self, eq: &Equipment) -> Option<usize> {
        self.buses.iter().position(|b| b.contains(eq))
    }

    /// Remove `eq` from every bus; returns whether something was removed.
    pub fn remove_equipment(&mut self, eq: &Equipment) -> bool {
        let mut removed = false;
        for bus in &mut self.buses {
            removed |= bus.remove(eq);
        }
        removed
    }

    /// Remove every equipment with the given id, whatever its duplicate index.
    pub fn remove_equipment_id(&mut self, id: &str) -> bool {
        let mut removed = false;
        for bus in &mut self.buses {
            let before = bus.equipment.len();
            bus.equipment.retain(|e| e.id != id);
            removed |= before != bus.equipment.len();
        }
        removed
    }

    /// Buses kept by the network bus computation.
    pub fn valid_buses(&self) -> impl Iterator<Item = &Bus> {
        self.buses.iter().filter(|b| b.counts().is_valid())
    }

    fn canonical(&self) -> Vec<Vec<&Equipment>> {
        let mut buses: Vec<_> = self.buses.iter().map(Bus::canonical).collect();
        buses.sort();
        buses
    }
}

impl PartialEq for Substation {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.fictive == other.fictive
            && self.canonical() == other.canonical()
    }
}

impl Eq for Substation {}

/// Substations whose topology was sampled jointly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetaSubstation {
    pub substations: Vec<Substation>,
}

impl MetaSubstation {
    pub fn new(substations: Vec<Substation>) -> Self {
        Self { substations }
    }

    pub fn substation(&self, id: &str) -> Option<&Substation> {
        self.substations.iter().find(|s| s.id == id)
    }

    pub fn substation_mut(&mut self, id: &str) -> Option<&mut Substation> {
        self.substations.iter_mut().find(|s| s.id == id)
    }

    pub fn equipment(&self) -> impl Iterator<Item = &Equipment> {
        self.substations.iter().flat_map(Substation::equipment)
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.equipment().any(|e| e.id == id)
    }
}

impl PartialEq for MetaSubstation {
    fn eq(&self, other: &Self) -> bool {
        if self.substations.len() != other.substations.len() {
            return false;
        }
        self.substations
            .iter()
            .all(|s| other.substation(&s.id).is_some_and(|o| o == s))
    }
}

impl Eq for MetaSubstation {}

/// One sampled configuration competing inside a [`TopologyChoice`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PossibleTopology {
    pub topo_hash: String,
    pub probability: f64,
    pub meta_substation: MetaSubstation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<usize>,
}

impl PossibleTopology {
    pub fn new(
        topo_hash: impl Into<String>,
        probability: f64,
        meta_substation: MetaSubstation,
    ) -> Self {
        Self {
            topo_hash: topo_hash.into(),
            probability,
            meta_substation,
            number: None,
        }
    }
}

/// Possible topologies describing the same cluster of substations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopologyChoice {
    pub cluster_id: usize,
    pub possible_topologies: Vec<PossibleTopology>,
}

impl TopologyChoice {
    pub fn new(cluster_id: usize, possible_topologies: Vec<PossibleTopology>) -> Self {
        Self {
            cluster_id,
            possible_topologies,
        }
    }

    /// Fails when the choice lost its last possible topology.
    pub fn ensure_non_empty(&self) -> TopoResult<()> {
        if self.possible_topologies.is_empty() {
            return Err(TopoError::EmptyTopologyChoice {
                cluster_id: self.cluster_id,
            });
        }
        Ok(())
    }

    /// Ids of every substation sampled by this choice.
    pub fn substation_ids(&self) -> BTreeSet<&str> {
        self.possible_topologies
            .iter()
            .flat_map(|t| t.meta_substation.substations.iter())
            .map(|s| s.id.as_str())
            .collect()
    }
}

/// Time range the samples were mined from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeInterval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> TopoResult<Self> {
        if end < start {
            return Err(TopoError::Validation(format!(
                "interval end {end} is before start {start}"
            )));
        }
        Ok(Self { start, end })
    }
}

/// Root aggregate: every topology choice mined over an interval.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopologyHistory {
    pub interval: TimeInterval,
    pub correlation_threshold: f64,
    pub probability_threshold: f64,
    pub topology_choices: Vec<TopologyChoice>,
}

/// Element counts of a history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HistoryStats {
    pub choices: usize,
    pub possible_topologies: usize,
    pub substations: usize,
    pub buses: usize,
    pub equipment: usize,
}

impl std::fmt::Display for HistoryStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} choices, {} possible topologies, {} substation snapshots, {} buses, {} equipment",
            self.choices, self.possible_topologies, self.substations, self.buses, self.equipment
        )
    }
}

impl TopologyHistory {
    pub fn new(
        interval: TimeInterval,
        correlation_threshold: f64,
        probability_threshold: f64,
        topology_choices: Vec<TopologyChoice>,
    ) -> Self {
        Self {
            interval,
            correlation_threshold,
            probability_threshold,
            topology_choices,
        }
    }

    pub fn stats(&self) -> HistoryStats {
        let mut stats = HistoryStats {
            choices: self.topology_choices.len(),
            ..HistoryStats::default()
        };
        for topology in self.possible_topologies() {
            stats.possible_topologies += 1;
            for substation in &topology.meta_substation.substations {
                stats.substations += 1;
                stats.buses += substation.buses.len();
                stats.equipment += substation.equipment().count();
            }
        }
        stats
    }

    pub fn possible_topologies(&self) -> impl Iterator<Item = &PossibleTopology> {
        self.topology_choices
            .iter()
            .flat_map(|c| c.possible_topologies.iter())
    }

    pub fn possible_topologies_mut(&mut self) -> impl Iterator<Item = &mut PossibleTopology> {
        self.topology_choices
            .iter_mut()
            .flat_map(|c| c.possible_topologies.iter_mut())
    }

    pub fn substations(&self) -> impl Iterator<Item = &Substation> {
        self.possible_topologies()
            .flat_map(|t| t.meta_substation.substations.iter())
    }

    pub fn substations_mut(&mut self) -> impl Iterator<Item = &mut Substation> {
        self.possible_topologies_mut()
            .flat_map(|t| t.meta_substation.substations.iter_mut())
    }

    /// Ids of every non fictive substation of the history, sorted.
    pub fn substation_ids(&self) -> BTreeSet<String> {
        self.substations()
            .filter(|s| !s.fictive)
            .map(|s| s.id.clone())
            .collect()
    }

    /// Checks the structural invariants a history must hold between cleaning passes.
    pub fn validate(&self) -> TopoResult<()> {
        for choice in &self.topology_choices {
            choice.ensure_non_empty()?;
            for topology in &choice.possible_topologies {
                if !(0.0..=1.0).contains(&topology.probability) {
                    return Err(TopoError::Validation(format!(
                        "topology {} of cluster {} has probability {} outside [0, 1]",
                        topology.topo_hash, choice.cluster_id, topology.probability
                    )));
                }
            }
        }
        Ok(())
    }

    /// Assign ordinal numbers to possible topologies and buses.
    pub fn number(&mut self) {
        let mut next = 0;
        for topology in self.possible_topologies_mut() {
            topology.number = Some(next);
            next += 1;
            for substation in &mut topology.meta_substation.substations {
                for (num, bus) in substation.buses.iter_mut().enumerate() {
                    bus.num = Some(num as i32);
                }
            }
        }
    }
}
