//! Cycle basis of an undirected graph (Paton's algorithm).
//!
//! Walks a spanning tree with an explicit stack and closes one fundamental cycle
//! per non-tree edge. Works on disconnected graphs: every component is rooted at
//! its first unvisited node.

use std::collections::{HashMap, HashSet};

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;

/// Fundamental cycles of `graph`, each listed as its sequence of nodes.
///
/// A self-loop yields a single-node cycle.
pub fn cycle_basis<N, E>(graph: &UnGraph<N, E>) -> Vec<Vec<NodeIndex>> {
    let mut cycles = Vec::new();
    let mut visited: HashSet<NodeIndex> = HashSet::new();

    for root in graph.node_indices() {
        if visited.contains(&root) {
            continue;
        }
        let mut stack = vec![root];
        let mut pred: HashMap<NodeIndex, NodeIndex> = HashMap::from([(root, root)]);
        let mut used: HashMap<NodeIndex, HashSet<NodeIndex>> =
            HashMap::from([(root, HashSet::new())]);

        while let Some(z) = stack.pop() {
            let neighbors: Vec<NodeIndex> = graph.edges(z).map(|e| e.target()).collect();
            for nbr in neighbors {
                if !used.contains_key(&nbr) {
                    pred.insert(nbr, z);
                    stack.push(nbr);
                    used.insert(nbr, HashSet::from([z]));
                } else if nbr == z {
                    cycles.push(vec![z]);
                } else if !used[&z].contains(&nbr) {
                    let mut cycle = vec![nbr, z];
                    let mut p = pred[&z];
                    while !used[&nbr].contains(&p) {
                        cycle.push(p);
                        p = pred[&p];
                    }
                    cycle.push(p);
                    cycles.push(cycle);
                    if let Some(set) = used.get_mut(&nbr) {
                        set.insert(z);
                    }
                }
            }
        }
        visited.extend(pred.keys().copied());
    }
    cycles
}

/// Unordered node pairs lying on at least one cycle of the basis.
pub fn edges_on_cycles(cycles: &[Vec<NodeIndex>]) -> HashSet<(NodeIndex, NodeIndex)> {
    let mut edges = HashSet::new();
    for cycle in cycles {
        if cycle.len() < 2 {
            continue;
        }
        for (i, &a) in cycle.iter().enumerate() {
            let b = cycle[(i + 1) % cycle.len()];
            edges.insert(ordered(a, b));
        }
    }
    edges
}

pub(crate) fn ordered(a: NodeIndex, b: NodeIndex) -> (NodeIndex, NodeIndex) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
