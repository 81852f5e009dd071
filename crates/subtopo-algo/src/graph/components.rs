//! Connected components over the stacked history.
//!
//! One undirected graph spans every snapshot. A vertex is an equipment seen in one
//! substation of one possible topology: `(equipment id, substation id, snapshot)`.
//!
//! Edges:
//! 1. Equipment sharing a historical bus are connected (a star per bus is enough
//!    for connectivity).
//! 2. Every occurrence of a branch is connected, on both sides and in every
//!    snapshot, inside a choice and across choices. A branch observed on one side
//!    only has that side repeated. A chain through the occurrences is enough for
//!    connectivity.
//!
//! The largest component, projected on equipment ids, is the main grid. Ties are
//! broken by discovery order: components are listed by breadth-first search
//! from vertices in insertion order.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use petgraph::graph::{NodeIndex, UnGraph};
use subtopo_core::graph_utils::list_islands;
use subtopo_core::{TopoError, TopoResult, TopologyHistory};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Vertex {
    equipment: String,
    substation: String,
    snapshot: usize,
}

/// Result of the components analysis.
#[derive(Debug, Clone, Default)]
pub struct ComponentsAnalysis {
    /// Equipment ids of every component, in discovery order.
    pub components: Vec<BTreeSet<String>>,
    /// Vertex count of every component, same order.
    pub sizes: Vec<usize>,
    /// Position of the main component in `components`.
    pub main: Option<usize>,
}

impl ComponentsAnalysis {
    /// Equipment ids of the main grid.
    pub fn main_equipment(&self) -> BTreeSet<String> {
        self.main
            .and_then(|i| self.components.get(i))
            .cloned()
            .unwrap_or_default()
    }
}

struct StackedGraph {
    graph: UnGraph<Vertex, ()>,
    nodes: HashMap<Vertex, NodeIndex>,
}

impl StackedGraph {
    fn node(&mut self, vertex: Vertex) -> NodeIndex {
        if let Some(&idx) = self.nodes.get(&vertex) {
            return idx;
        }
        let idx = self.graph.add_node(vertex.clone());
        self.nodes.insert(vertex, idx);
        idx
    }
}

/// Builds the stacked graph and lists its connected components.
pub fn analyse_components(history: &TopologyHistory) -> TopoResult<ComponentsAnalysis> {
    let mut stacked = StackedGraph {
        graph: UnGraph::new_undirected(),
        nodes: HashMap::new(),
    };
    let mut snapshot = 0;
    // branch id -> substation id -> snapshots holding that side
    let mut branch_sides: BTreeMap<String, BTreeMap<String, BTreeSet<usize>>> = BTreeMap::new();

    for choice in &history.topology_choices {
        for topology in &choice.possible_topologies {
            for substation in &topology.meta_substation.substations {
                for bus in &substation.buses {
                    let mut hub = None;
                    for eq in &bus.equipment {
                        let idx = stacked.node(Vertex {
                            equipment: eq.id.clone(),
                            substation: substation.id.clone(),
                            snapshot,
                        });
                        match hub {
                            None => hub = Some(idx),
                            Some(h) if h != idx => {
                                stacked.graph.add_edge(h, idx, ());
                            }
                            Some(_) => {}
                        }
                        if eq.is_branch() {
                            branch_sides
                                .entry(eq.id.clone())
                                .or_default()
                                .entry(substation.id.clone())
                                .or_default()
                                .insert(snapshot);
                        }
                    }
                }
            }
            snapshot += 1;
        }
    }

    for (branch, sides) in &branch_sides {
        if sides.len() > 2 {
            return Err(TopoError::InconsistentBranch {
                id: branch.clone(),
                sides: sides.keys().cloned().collect(),
            });
        }
        let occurrences: Vec<NodeIndex> = sides
            .iter()
            .flat_map(|(substation, snapshots)| {
                snapshots.iter().map(move |&snapshot| Vertex {
                    equipment: branch.clone(),
                    substation: substation.clone(),
                    snapshot,
                })
            })
            .filter_map(|vertex| stacked.nodes.get(&vertex).copied())
            .collect();
        for pair in occurrences.windows(2) {
            stacked.graph.add_edge(pair[0], pair[1], ());
        }
    }

    Ok(list_components(&stacked.graph))
}

fn list_components(graph: &UnGraph<Vertex, ()>) -> ComponentsAnalysis {
    let mut analysis = ComponentsAnalysis::default();
    for island in list_islands(graph) {
        let size = island.len();
        let equipment: BTreeSet<String> = island
            .iter()
            .map(|&node| graph[node].equipment.clone())
            .collect();
        let is_larger = analysis
            .main
            .map_or(true, |m| size > analysis.sizes[m]);
        if is_larger {
            analysis.main = Some(analysis.components.len());
        }
        analysis.components.push(equipment);
        analysis.sizes.push(size);
    }
    analysis
}
