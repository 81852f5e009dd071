//! Topology and bus pruning passes.

use subtopo_core::{PossibleTopology, TopologyHistory};

use super::topology_label;

/// Merges identical possible topologies of a choice into the most probable one.
///
/// Probabilities are not summed; on a tie the first one is kept.
pub fn remove_duplicates(history: &mut TopologyHistory) -> Vec<String> {
    let mut removed = Vec::new();
    for choice in &mut history.topology_choices {
        let mut kept: Vec<PossibleTopology> = Vec::new();
        for topology in choice.possible_topologies.drain(..) {
            match kept
                .iter_mut()
                .find(|k| k.meta_substation == topology.meta_substation)
            {
                Some(existing) if topology.probability > existing.probability => {
                    removed.push(topology_label(choice.cluster_id, &existing.topo_hash));
                    *existing = topology;
                }
                Some(_) => removed.push(topology_label(choice.cluster_id, &topology.topo_hash)),
                None => kept.push(topology),
            }
        }
        choice.possible_topologies = kept;
    }
    removed
}

/// Drops topologies below `threshold`, least probable first, never the last one of a choice.
pub fn remove_low_probability(history: &mut TopologyHistory, threshold: f64) -> Vec<String> {
    let mut removed = Vec::new();
    if threshold <= 0.0 {
        return removed;
    }
    for choice in &mut history.topology_choices {
        let mut order: Vec<usize> = (0..choice.possible_topologies.len()).collect();
        order.sort_by(|&a, &b| {
            choice.possible_topologies[a]
                .probability
                .total_cmp(&choice.possible_topologies[b].probability)
        });

        let mut remaining = choice.possible_topologies.len();
        let mut drop = vec![false; remaining];
        for i in order {
            if remaining <= 1 {
                break;
            }
            if choice.possible_topologies[i].probability < threshold {
                drop[i] = true;
                remaining -= 1;
            }
        }

        let mut flags = drop.into_iter();
        let cluster_id = choice.cluster_id;
        choice.possible_topologies.retain(|t| {
            let dropped = flags.next().unwrap_or(false);
            if dropped {
                removed.push(topology_label(cluster_id, &t.topo_hash));
            }
            !dropped
        });
    }
    removed
}

/// Deletes buses left without equipment; returns the ids of their substations.
pub fn remove_empty_buses(history: &mut TopologyHistory) -> Vec<String> {
    let mut removed = Vec::new();
    for substation in history.substations_mut() {
        let before = substation.buses.len();
        substation.buses.retain(|b| !b.is_empty());
        for _ in substation.buses.len()..before {
            removed.push(substation.id.clone());
        }
    }
    removed
}
