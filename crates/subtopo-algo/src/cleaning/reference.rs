//! Resolution of history equipment against the reference network.
//!
//! - ids matching the fictive pattern are dropped silently
//! - paired dangling lines take the id of their tie line; when both halves sit in
//!   the same substation the second one becomes duplicate index 1
//! - equipment the network does not know is removed: possible topologies holding
//!   it are deleted while their choice keeps another one, the last one is kept
//!   with the equipment stripped
//! - every remaining equipment gets its kind; a three windings transformer is fatal

use std::collections::{BTreeSet, HashSet};

use regex::Regex;
use subtopo_core::{
    Equipment, EquipmentKind, Substation, TopoError, TopoResult, TopologyHistory, TopologyNetwork,
};

use super::topology_label;

/// Ids touched while resolving, per kind of change.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub fictive: Vec<String>,
    pub merged: Vec<String>,
    pub unknown: Vec<String>,
    pub removed_topologies: Vec<String>,
}

pub fn resolve_against_network<N: TopologyNetwork + ?Sized>(
    history: &mut TopologyHistory,
    network: &N,
    fictive: &Regex,
) -> TopoResult<Resolution> {
    let mut resolution = Resolution::default();

    for substation in history.substations_mut() {
        for bus in &mut substation.buses {
            let before = bus.equipment.len();
            bus.equipment.retain(|e| !fictive.is_match(&e.id));
            if bus.equipment.len() != before {
                resolution.fictive.push(substation.id.clone());
            }
        }
        if merge_dangling_lines(substation, network) {
            resolution.merged.push(substation.id.clone());
        }
    }

    remove_unknown_equipment(history, network, &mut resolution);

    for substation in history.substations_mut() {
        for eq in substation.equipment_mut() {
            let kind = network.equipment_kind(&eq.id);
            if kind == Some(EquipmentKind::ThreeWindingsTransformer) {
                return Err(TopoError::UnsupportedThreeWindingsTransformer { id: eq.id.clone() });
            }
            eq.kind = kind;
        }
    }
    Ok(resolution)
}

fn merge_dangling_lines<N: TopologyNetwork + ?Sized>(
    substation: &mut Substation,
    network: &N,
) -> bool {
    let mut renamed = Vec::new();
    for eq in substation.equipment_mut() {
        let line = match network.equipment_kind(&eq.id) {
            Some(_) => None,
            None => network.paired_line_id(&eq.id),
        };
        renamed.push(line.is_some());
        if let Some(line) = line {
            eq.id = line;
            eq.index = 0;
        }
    }
    if !renamed.contains(&true) {
        return false;
    }

    let mut taken: HashSet<Equipment> = substation
        .equipment()
        .zip(&renamed)
        .filter(|(_, renamed)| !**renamed)
        .map(|(e, _)| e.clone())
        .collect();
    for (eq, renamed) in substation.equipment_mut().zip(&renamed) {
        if !*renamed {
            continue;
        }
        while taken.contains(eq) {
            eq.index += 1;
        }
        taken.insert(eq.clone());
    }
    true
}

fn remove_unknown_equipment<N: TopologyNetwork + ?Sized>(
    history: &mut TopologyHistory,
    network: &N,
    resolution: &mut Resolution,
) {
    let is_unknown = |e: &Equipment| network.equipment_kind(&e.id).is_none();

    for choice in &mut history.topology_choices {
        let mut idx = 0;
        while idx < choice.possible_topologies.len() {
            let topology = &choice.possible_topologies[idx];
            let has_unknown = topology.meta_substation.equipment().any(is_unknown);
            if has_unknown && choice.possible_topologies.len() > 1 {
                let removed = choice.possible_topologies.remove(idx);
                resolution
                    .removed_topologies
                    .push(topology_label(choice.cluster_id, &removed.topo_hash));
                continue;
            }
            if has_unknown {
                let topology = &mut choice.possible_topologies[idx];
                let mut stripped = BTreeSet::new();
                for substation in &mut topology.meta_substation.substations {
                    for bus in &mut substation.buses {
                        bus.equipment.retain(|e| {
                            let unknown = is_unknown(e);
                            if unknown {
                                stripped.insert(e.id.clone());
                            }
                            !unknown
                        });
                    }
                }
                resolution.unknown.extend(stripped);
            }
            idx += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{bus, choice, history, partition, substation, topology};
    use subtopo_core::Network;

    fn network() -> Network {
        let mut n = Network::new("ref");
        n.add_voltage_level("S1", "P1").add_voltage_level("S2", "P2");
        n.add_bus("S1", "B1").unwrap().add_bus("S2", "B2").unwrap();
        n.add_branch("L1", EquipmentKind::Line, ("S1", "B1"), ("S2", "B2"))
            .unwrap();
        n.add_injection("LOAD1", EquipmentKind::Load, "S1", "B1")
            .unwrap();
        n.add_tie_line("TL", ("DL1", "DL2"), ("S1", "B1"), ("S1", "B1"))
            .unwrap();
        n
    }

    fn fictive() -> Regex {
        Regex::new("^FICT").unwrap()
    }

    #[test]
    fn test_fictive_ids_dropped_and_kinds_resolved() {
        let mut h = history(vec![choice(
            0,
            vec![topology(
                "a",
                1.0,
                vec![substation("S1", vec![bus(&["L1", "LOAD1", "FICT_1"])])],
            )],
        )]);
        let resolution = resolve_against_network(&mut h, &network(), &fictive()).unwrap();
        assert_eq!(resolution.fictive, vec!["S1".to_string()]);
        assert_eq!(partition(&h, 0, 0, "S1"), vec![vec!["L1", "LOAD1"]]);
        let kinds: Vec<_> = h.substations().flat_map(|s| s.equipment()).map(|e| e.kind).collect();
        assert_eq!(kinds, vec![Some(EquipmentKind::Line), Some(EquipmentKind::Load)]);
    }

    #[test]
    fn test_dangling_lines_merged_into_tie_line() {
        let mut h = history(vec![choice(
            0,
            vec![topology(
                "a",
                1.0,
                vec![substation("S1", vec![bus(&["DL1", "L1"]), bus(&["DL2", "LOAD1"])])],
            )],
        )]);
        let resolution = resolve_against_network(&mut h, &network(), &fictive()).unwrap();
        assert_eq!(resolution.merged.len(), 1);
        assert_eq!(
            partition(&h, 0, 0, "S1"),
            vec![vec!["L1", "TL"], vec!["LOAD1", "TL#1"]]
        );
    }

    #[test]
    fn test_unknown_equipment_deletes_topology_but_not_the_last() {
        let mut h = history(vec![
            choice(
                0,
                vec![
                    topology("a", 0.6, vec![substation("S1", vec![bus(&["L1", "GHOST"])])]),
                    topology("b", 0.4, vec![substation("S1", vec![bus(&["L1", "LOAD1"])])]),
                ],
            ),
            choice(1, vec![topology("c", 1.0, vec![substation("S2", vec![bus(&["L1", "GHOST"])])])]),
        ]);
        let resolution = resolve_against_network(&mut h, &network(), &fictive()).unwrap();
        assert_eq!(resolution.removed_topologies, vec!["0/a".to_string()]);
        assert_eq!(resolution.unknown, vec!["GHOST".to_string()]);
        assert_eq!(h.topology_choices[0].possible_topologies.len(), 1);
        assert_eq!(h.topology_choices[0].possible_topologies[0].topo_hash, "b");
        assert_eq!(partition(&h, 1, 0, "S2"), vec![vec!["L1"]]);
    }

    #[test]
    fn test_three_windings_transformer_is_fatal() {
        let mut n = network();
        n.add_voltage_level("S3", "P3");
        n.add_bus("S3", "B3").unwrap();
        n.add_three_windings_transformer("T3", [("S3", "B3"), ("S3", "B3"), ("S3", "B3")])
            .unwrap();
        let mut h = history(vec![choice(
            0,
            vec![topology("a", 1.0, vec![substation("S3", vec![bus(&["T3"])])])],
        )]);
        let err = resolve_against_network(&mut h, &n, &fictive()).unwrap_err();
        assert!(matches!(err, TopoError::UnsupportedThreeWindingsTransformer { .. }));
    }
}
