//! Fixture builders for histories written inline in tests.
//!
//! Equipment specs are `"ID"` or `"ID#n"` (duplicate index `n`). Kinds follow the
//! id prefix: `LOAD`/`LD` load, `GEN` generator, `SH` shunt, `BBS` busbar section,
//! `DL` dangling line, `TR` two windings transformer, anything else a line.

use subtopo_core::{
    Bus, Equipment, EquipmentKind, MetaSubstation, PossibleTopology, Substation, TimeInterval,
    TopologyChoice, TopologyHistory,
};

pub fn kind_of(id: &str) -> EquipmentKind {
    if id.starts_with("LOAD") || id.starts_with("LD") {
        EquipmentKind::Load
    } else if id.starts_with("GEN") {
        EquipmentKind::Generator
    } else if id.starts_with("SH") {
        EquipmentKind::ShuntCompensator
    } else if id.starts_with("BBS") {
        EquipmentKind::BusbarSection
    } else if id.starts_with("DL") {
        EquipmentKind::DanglingLine
    } else if id.starts_with("TR") {
        EquipmentKind::TwoWindingsTransformer
    } else {
        EquipmentKind::Line
    }
}

pub fn eq(spec: &str) -> Equipment {
    let (id, index) = match spec.split_once('#') {
        Some((id, index)) => (id, index.parse().unwrap_or(0)),
        None => (spec, 0),
    };
    Equipment::new(id).with_index(index).with_kind(kind_of(id))
}

pub fn bus(specs: &[&str]) -> Bus {
    Bus::new(specs.iter().map(|s| eq(s)).collect())
}

pub fn substation(id: &str, buses: Vec<Bus>) -> Substation {
    Substation::new(id, buses)
}

pub fn topology(hash: &str, probability: f64, substations: Vec<Substation>) -> PossibleTopology {
    PossibleTopology::new(hash, probability, MetaSubstation::new(substations))
}

pub fn choice(cluster_id: usize, topologies: Vec<PossibleTopology>) -> TopologyChoice {
    TopologyChoice::new(cluster_id, topologies)
}

pub fn interval() -> TimeInterval {
    let start = chrono::DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
        .map(|d| d.with_timezone(&chrono::Utc))
        .unwrap_or_default();
    let end = chrono::DateTime::parse_from_rfc3339("2024-12-31T23:00:00Z")
        .map(|d| d.with_timezone(&chrono::Utc))
        .unwrap_or_default();
    TimeInterval { start, end }
}

pub fn history(choices: Vec<TopologyChoice>) -> TopologyHistory {
    TopologyHistory::new(interval(), 0.9, 0.0, choices)
}

/// Sorted equipment specs of every bus of `substation` in topology `topo` of choice `choice`.
pub fn partition(history: &TopologyHistory, choice: usize, topo: usize, substation: &str) -> Vec<Vec<String>> {
    let mut buses: Vec<Vec<String>> = history.topology_choices[choice].possible_topologies[topo]
        .meta_substation
        .substation(substation)
        .map(|s| {
            s.buses
                .iter()
                .map(|b| {
                    let mut ids: Vec<String> = b.equipment.iter().map(|e| e.to_string()).collect();
                    ids.sort();
                    ids
                })
                .collect()
        })
        .unwrap_or_default();
    buses.sort();
    buses
}
