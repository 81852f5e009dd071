//! Unique topology builder.
//!
//! Runs on a cleaned history, one substation id at a time, over its non fictive
//! snapshots:
//!
//! 1. **Canonical buses.** Two equipment stay together when, in every choice
//!    sampling both, they share a bus in every possible topology. The connected
//!    components of that relation are the canonical buses, numbered in equipment
//!    order.
//! 2. **Switches.** Start from the complete graph over canonical buses and visit
//!    its edges in order. An edge between buses that were sometimes connected, per
//!    the [`StackedConnectivityIndex`], is always kept. Any other edge is removed
//!    when it lies on a cycle of the current cycle basis, so the graph never loses
//!    connectivity. The survivors are the switches, numbered in edge order.
//!
//! Every pair of canonical buses met on a historical bus keeps its switch, so
//! closing the switches inside each historical bus and opening the others
//! reproduces every snapshot. [`record_switch_states`] writes that pattern back
//! into the history.

use std::collections::{BTreeSet, HashMap};

use petgraph::graph::{NodeIndex, UnGraph};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use subtopo_core::graph_utils::list_islands;
use subtopo_core::{
    Equipment, Substation, TopoResult, TopologyHistory, UniqueBus, UniqueSubstation,
    UniqueSwitch, UniqueTopology,
};
use tracing::{debug, info};

use crate::connectivity::StackedConnectivityIndex;
use crate::graph::cycles::{cycle_basis, edges_on_cycles, ordered};

/// Derives the unique topology of every non fictive substation of `history`.
pub fn build_unique_topology(history: &TopologyHistory) -> TopoResult<UniqueTopology> {
    let index = StackedConnectivityIndex::build(history);
    debug!("Connectivity index over {} substation(s)", index.len());
    let ids: Vec<String> = history.substation_ids().into_iter().collect();

    #[cfg(feature = "parallel")]
    let substations: Vec<UniqueSubstation> = ids
        .par_iter()
        .map(|id| build_substation(history, &index, id))
        .collect();
    #[cfg(not(feature = "parallel"))]
    let substations: Vec<UniqueSubstation> = ids
        .iter()
        .map(|id| build_substation(history, &index, id))
        .collect();

    let mut unique = UniqueTopology::new();
    for substation in substations {
        debug!(
            "{}: {} bus(es), {} switch(es)",
            substation.id,
            substation.buses.len(),
            substation.switches.len()
        );
        unique.insert(substation);
    }
    info!(
        "Unique topology built: {} substation(s), {} switch(es)",
        unique.len(),
        unique.switch_count()
    );
    Ok(unique)
}

/// Non fictive snapshots of `id`, grouped by choice.
fn snapshots_by_choice<'h>(history: &'h TopologyHistory, id: &str) -> Vec<Vec<&'h Substation>> {
    history
        .topology_choices
        .iter()
        .map(|c| {
            c.possible_topologies
                .iter()
                .filter_map(|t| t.meta_substation.substation(id))
                .filter(|s| !s.fictive)
                .collect::<Vec<_>>()
        })
        .filter(|snapshots| !snapshots.is_empty())
        .collect()
}

pub fn build_substation(
    history: &TopologyHistory,
    index: &StackedConnectivityIndex,
    id: &str,
) -> UniqueSubstation {
    let choices = snapshots_by_choice(history, id);
    let buses = canonical_buses(&choices);
    let switches = derive_switches(id, &buses, index);
    UniqueSubstation {
        id: id.to_string(),
        buses,
        switches,
    }
}

fn canonical_buses(choices: &[Vec<&Substation>]) -> Vec<UniqueBus> {
    let equipment: BTreeSet<&Equipment> = choices
        .iter()
        .flatten()
        .flat_map(|s| s.equipment())
        .collect();

    let mut candidates: BTreeSet<(&Equipment, &Equipment)> = BTreeSet::new();
    for bus in choices.iter().flatten().flat_map(|s| s.buses.iter()) {
        let members = bus.equipment_set();
        for (i, &a) in members.iter().enumerate() {
            for &b in members.iter().skip(i + 1) {
                candidates.insert((a, b));
            }
        }
    }

    // a choice sampling both equipment must keep them together in every topology
    let always_together = |a: &Equipment, b: &Equipment| {
        choices.iter().all(|snapshots| {
            let sampled = snapshots.iter().any(|s| s.contains(a))
                && snapshots.iter().any(|s| s.contains(b));
            !sampled
                || snapshots
                    .iter()
                    .all(|s| s.bus_of(a).is_some() && s.bus_of(a) == s.bus_of(b))
        })
    };

    let mut graph: UnGraph<&Equipment, ()> = UnGraph::new_undirected();
    let nodes: HashMap<&Equipment, NodeIndex> =
        equipment.iter().map(|&e| (e, graph.add_node(e))).collect();
    for &(a, b) in &candidates {
        if always_together(a, b) {
            graph.add_edge(nodes[a], nodes[b], ());
        }
    }

    let mut groups: Vec<BTreeSet<Equipment>> = list_islands(&graph)
        .into_iter()
        .map(|island| island.into_iter().map(|n| graph[n].clone()).collect())
        .collect();
    groups.sort();
    groups
        .into_iter()
        .enumerate()
        .map(|(num, equipment)| UniqueBus { num, equipment })
        .collect()
}

fn derive_switches(
    id: &str,
    buses: &[UniqueBus],
    index: &StackedConnectivityIndex,
) -> Vec<UniqueSwitch> {
    let mut graph: UnGraph<usize, ()> = UnGraph::new_undirected();
    let nodes: Vec<NodeIndex> = buses.iter().map(|b| graph.add_node(b.num)).collect();
    let mut edges: Vec<(usize, usize)> = Vec::new();
    for i in 0..buses.len() {
        for j in (i + 1)..buses.len() {
            graph.add_edge(nodes[i], nodes[j], ());
            edges.push((i, j));
        }
    }

    for &(i, j) in &edges {
        if index.were_sometimes_connected(id, &buses[i].equipment, &buses[j].equipment) {
            continue;
        }
        let on_cycle = edges_on_cycles(&cycle_basis(&graph)).contains(&ordered(nodes[i], nodes[j]));
        if let Some(edge) = graph.find_edge(nodes[i], nodes[j]).filter(|_| on_cycle) {
            graph.remove_edge(edge);
        }
    }

    edges
        .into_iter()
        .filter(|&(i, j)| graph.find_edge(nodes[i], nodes[j]).is_some())
        .enumerate()
        .map(|(num, (bus1, bus2))| UniqueSwitch {
            id: UniqueSubstation::switch_id(id, num),
            bus1,
            bus2,
        })
        .collect()
}

/// Records, in every non fictive snapshot, the open state of each derived switch.
///
/// A switch is closed when its two canonical buses sit on the same historical bus.
pub fn record_switch_states(history: &mut TopologyHistory, unique: &UniqueTopology) {
    for substation in history.substations_mut().filter(|s| !s.fictive) {
        let Some(derived) = unique.get(&substation.id) else {
            continue;
        };
        let host: Vec<Option<usize>> = derived
            .buses
            .iter()
            .map(|b| b.equipment.iter().find_map(|e| substation.bus_of(e)))
            .collect();
        substation.switches = derived
            .switches
            .iter()
            .map(|sw| {
                let closed = matches!(
                    (host[sw.bus1], host[sw.bus2]),
                    (Some(a), Some(b)) if a == b
                );
                (sw.id.clone(), !closed)
            })
            .collect();
    }
}
