use petgraph::graph::{NodeIndex, UnGraph};
use std::collections::{HashMap, HashSet, VecDeque};

/// Group of bus ids merged through closed switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedBus {
    pub members: Vec<String>,
}

/// Merges buses connected by closed switches (breadth-first search over the
/// switch graph). Groups come out in the order of their first bus in `bus_ids`;
/// members keep that order too.
pub fn merge_buses<'a, I>(bus_ids: &[String], closed_switches: I) -> Vec<MergedBus>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut graph: UnGraph<&str, ()> = UnGraph::new_undirected();
    let mut nodes: HashMap<&str, NodeIndex> = HashMap::with_capacity(bus_ids.len());
    for id in bus_ids {
        nodes.insert(id.as_str(), graph.add_node(id.as_str()));
    }
    for (bus1, bus2) in closed_switches {
        if let (Some(&a), Some(&b)) = (nodes.get(bus1), nodes.get(bus2)) {
            graph.add_edge(a, b, ());
        }
    }

    list_islands(&graph)
        .into_iter()
        .map(|mut island| {
            island.sort();
            MergedBus {
                members: island.into_iter().map(|n| graph[n].to_string()).collect(),
            }
        })
        .collect()
}

/// Connected components by breadth-first search, in discovery order.
///
/// Each island lists its nodes in visit order, starting from its lowest index.
pub fn list_islands<N, E>(graph: &UnGraph<N, E>) -> Vec<Vec<NodeIndex>> {
    let mut visited = HashSet::new();
    let mut islands = Vec::new();
    for start in graph.node_indices() {
        if visited.contains(&start) {
            continue;
        }
        let mut queue = VecDeque::from([start]);
        let mut members = Vec::new();
        while let Some(node) = queue.pop_front() {
            if !visited.insert(node) {
                continue;
            }
            members.push(node);
            for neighbor in graph.neighbors(node) {
                if !visited.contains(&neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }
        islands.push(members);
    }
    islands
}
