//! One sided branches.
//!
//! A two-terminal branch recorded twice in substation `S1` (indices 0 and 1) and
//! never anywhere else, while the network puts its second terminal in `S2`, is
//! split: the index 1 occurrence leaves `S1` and the branch is added on a bus of
//! its own to every snapshot of `S2`. When the history never sampled `S2`, a
//! fictive `S2` is added next to each snapshot of `S1`.

use std::collections::{BTreeMap, BTreeSet};

use subtopo_core::{Bus, Equipment, Substation, TopologyHistory, TopologyNetwork};

struct OneSided {
    equipment: Equipment,
    observed: String,
    missing: String,
}

pub fn fix_one_sided_branches<N: TopologyNetwork + ?Sized>(
    history: &mut TopologyHistory,
    network: &N,
) -> Vec<String> {
    let candidates = find_one_sided(history, network);
    if candidates.is_empty() {
        return Vec::new();
    }
    let sampled: BTreeSet<String> = history.substations().map(|s| s.id.clone()).collect();

    let mut fixed = Vec::new();
    for branch in candidates {
        let folded = branch.equipment.sibling(1);
        for topology in history.possible_topologies_mut() {
            let meta = &mut topology.meta_substation;
            let Some(observed) = meta.substation_mut(&branch.observed) else {
                continue;
            };
            observed.remove_equipment(&folded);

            if sampled.contains(&branch.missing) {
                continue;
            }
            match meta.substation_mut(&branch.missing) {
                Some(fictive) => fictive.buses.push(Bus::new(vec![branch.equipment.clone()])),
                None => meta.substations.push(Substation::fictive(
                    branch.missing.clone(),
                    vec![Bus::new(vec![branch.equipment.clone()])],
                )),
            }
        }
        if sampled.contains(&branch.missing) {
            for substation in history.substations_mut() {
                if substation.id == branch.missing && !substation.contains(&branch.equipment) {
                    substation.buses.push(Bus::new(vec![branch.equipment.clone()]));
                }
            }
        }
        fixed.push(branch.equipment.id.clone());
    }
    fixed
}

fn find_one_sided<N: TopologyNetwork + ?Sized>(
    history: &TopologyHistory,
    network: &N,
) -> Vec<OneSided> {
    // branch id -> (substations holding it, sample with kind, folded somewhere)
    let mut seen: BTreeMap<&str, (BTreeSet<&str>, &Equipment, bool)> = BTreeMap::new();
    for substation in history.substations() {
        for eq in substation.equipment() {
            if !eq.kind.is_some_and(|k| k.is_two_sided_branch()) {
                continue;
            }
            let entry = seen
                .entry(eq.id.as_str())
                .or_insert_with(|| (BTreeSet::new(), eq, false));
            entry.0.insert(substation.id.as_str());
            entry.2 |= eq.index == 1;
        }
    }

    let mut found = Vec::new();
    for (id, (substations, sample, folded)) in seen {
        if !folded || substations.len() != 1 {
            continue;
        }
        let Some(observed) = substations.first().copied() else {
            continue;
        };
        let Some(levels) = network.terminal_voltage_levels(id) else {
            continue;
        };
        let [side1, side2] = levels.as_slice() else {
            continue;
        };
        let missing = if side1 == observed && side2 != observed {
            side2
        } else if side2 == observed && side1 != observed {
            side1
        } else {
            continue;
        };
        found.push(OneSided {
            equipment: sample.sibling(0),
            observed: observed.to_string(),
            missing: missing.clone(),
        });
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{bus, choice, history, partition, substation, topology};
    use subtopo_core::{EquipmentKind, Network};

    fn network() -> Network {
        let mut n = Network::new("ref");
        n.add_voltage_level("S1", "P1").add_voltage_level("S2", "P2");
        n.add_bus("S1", "B1").unwrap().add_bus("S2", "B2").unwrap();
        n.add_branch("EQ", EquipmentKind::Line, ("S1", "B1"), ("S2", "B2"))
            .unwrap();
        n.add_branch("L2", EquipmentKind::Line, ("S1", "B1"), ("S2", "B2"))
            .unwrap();
        n
    }

    #[test]
    fn test_branch_added_to_sampled_other_side() {
        let mut h = history(vec![
            choice(
                0,
                vec![
                    topology("a", 0.5, vec![substation("S1", vec![bus(&["EQ", "L2"]), bus(&["EQ#1"])])]),
                    topology("b", 0.5, vec![substation("S1", vec![bus(&["EQ", "EQ#1", "L2"])])]),
                ],
            ),
            choice(1, vec![topology("c", 1.0, vec![substation("S2", vec![bus(&["L2", "LOAD2"])])])]),
        ]);
        let fixed = fix_one_sided_branches(&mut h, &network());
        assert_eq!(fixed, vec!["EQ".to_string()]);
        assert_eq!(partition(&h, 0, 0, "S1"), vec![vec![], vec!["EQ", "L2"]]);
        assert_eq!(partition(&h, 0, 1, "S1"), vec![vec!["EQ", "L2"]]);
        assert_eq!(partition(&h, 1, 0, "S2"), vec![vec!["EQ"], vec!["L2", "LOAD2"]]);

        // second run has nothing left to fix
        assert!(fix_one_sided_branches(&mut h, &network()).is_empty());
    }

    #[test]
    fn test_fictive_substation_when_other_side_never_sampled() {
        let mut h = history(vec![choice(
            0,
            vec![topology("a", 1.0, vec![substation("S1", vec![bus(&["EQ", "EQ#1", "L2"])])])],
        )]);
        fix_one_sided_branches(&mut h, &network());
        let meta = &h.topology_choices[0].possible_topologies[0].meta_substation;
        let s2 = meta.substation("S2").unwrap();
        assert!(s2.fictive);
        assert_eq!(partition(&h, 0, 0, "S2"), vec![vec!["EQ"]]);
        assert!(h.substation_ids().contains("S1"));
        assert!(!h.substation_ids().contains("S2"));
    }

    #[test]
    fn test_branch_folded_in_its_own_substation_is_kept() {
        let mut n = network();
        n.add_bus("S1", "B1b").unwrap();
        n.add_branch("COUPLER", EquipmentKind::Line, ("S1", "B1"), ("S1", "B1b"))
            .unwrap();
        let mut h = history(vec![choice(
            0,
            vec![topology("a", 1.0, vec![substation("S1", vec![bus(&["COUPLER", "L2"]), bus(&["COUPLER#1"])])])],
        )]);
        assert!(fix_one_sided_branches(&mut h, &n).is_empty());
    }
}
