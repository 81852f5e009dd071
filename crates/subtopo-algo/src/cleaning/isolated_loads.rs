//! Buses holding only loads.
//!
//! With [`IsolatedLoadStrategy::Relocate`], each load of an isolated bus moves to
//! the bus of the branch it shares a bus with most often in the sibling topologies
//! of the same choice (ties keep first-seen order). A topology where some load has
//! no such branch is dropped, as is every topology holding an isolated bus under
//! [`IsolatedLoadStrategy::RemoveTopology`]. Dropping the last topology of a choice
//! is fatal.

use subtopo_core::{
    Equipment, PossibleTopology, TopoError, TopoResult, TopologyChoice, TopologyHistory,
};

use super::topology_label;
use crate::config::IsolatedLoadStrategy;

#[derive(Debug, Clone, Default)]
pub struct IsolatedLoadOutcome {
    pub relocated: Vec<String>,
    pub removed_topologies: Vec<String>,
}

struct Move {
    substation: String,
    load: Equipment,
    branch: Equipment,
}

pub fn resolve_isolated_loads(
    history: &mut TopologyHistory,
    strategy: IsolatedLoadStrategy,
) -> TopoResult<IsolatedLoadOutcome> {
    let mut outcome = IsolatedLoadOutcome::default();
    for choice in &mut history.topology_choices {
        let mut idx = 0;
        while idx < choice.possible_topologies.len() {
            let isolated = isolated_loads(&choice.possible_topologies[idx]);
            if isolated.is_empty() {
                idx += 1;
                continue;
            }
            let moves = match strategy {
                IsolatedLoadStrategy::Relocate => plan_moves(choice, idx, &isolated),
                IsolatedLoadStrategy::RemoveTopology => None,
            };
            match moves {
                Some(moves) => {
                    let topology = &mut choice.possible_topologies[idx];
                    for m in moves {
                        relocate(topology, &m);
                        outcome.relocated.push(m.load.to_string());
                    }
                    idx += 1;
                }
                None => {
                    if choice.possible_topologies.len() == 1 {
                        return Err(TopoError::EmptyTopologyChoice {
                            cluster_id: choice.cluster_id,
                        });
                    }
                    let removed = choice.possible_topologies.remove(idx);
                    outcome
                        .removed_topologies
                        .push(topology_label(choice.cluster_id, &removed.topo_hash));
                }
            }
        }
    }
    Ok(outcome)
}

/// `(substation id, load)` for every load sitting on a load-only bus.
fn isolated_loads(topology: &PossibleTopology) -> Vec<(String, Equipment)> {
    topology
        .meta_substation
        .substations
        .iter()
        .flat_map(|s| {
            s.buses
                .iter()
                .filter(|b| b.is_isolated_loads())
                .flat_map(move |b| b.equipment.iter().map(move |e| (s.id.clone(), e.clone())))
        })
        .collect()
}

fn plan_moves(
    choice: &TopologyChoice,
    current: usize,
    isolated: &[(String, Equipment)],
) -> Option<Vec<Move>> {
    isolated
        .iter()
        .map(|(substation, load)| {
            most_probable_branch(choice, current, substation, load).map(|branch| Move {
                substation: substation.clone(),
                load: load.clone(),
                branch,
            })
        })
        .collect()
}

/// Branch of the current snapshot most often sharing a bus with `load` in the
/// other topologies of the choice.
fn most_probable_branch(
    choice: &TopologyChoice,
    current: usize,
    substation_id: &str,
    load: &Equipment,
) -> Option<Equipment> {
    let mut counts: Vec<(&Equipment, usize)> = Vec::new();
    for (i, topology) in choice.possible_topologies.iter().enumerate() {
        if i == current {
            continue;
        }
        let Some(bus) = topology
            .meta_substation
            .substation(substation_id)
            .and_then(|s| s.buses.iter().find(|b| b.contains(load)))
        else {
            continue;
        };
        for eq in bus.equipment.iter().filter(|e| e.is_branch()) {
            match counts.iter_mut().find(|(e, _)| *e == eq) {
                Some((_, n)) => *n += 1,
                None => counts.push((eq, 1)),
            }
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));

    let here = choice.possible_topologies[current]
        .meta_substation
        .substation(substation_id)?;
    counts
        .into_iter()
        .map(|(eq, _)| eq)
        .find(|eq| here.contains(eq))
        .cloned()
}

fn relocate(topology: &mut PossibleTopology, m: &Move) {
    let Some(substation) = topology.meta_substation.substation_mut(&m.substation) else {
        return;
    };
    let Some(target) = substation.bus_of(&m.branch) else {
        return;
    };
    if substation.buses[target].contains(&m.load) {
        return;
    }
    substation.remove_equipment(&m.load);
    substation.buses[target].equipment.push(m.load.clone());
}
