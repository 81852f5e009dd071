//! Removal of equipment outside the main connected component.

use std::collections::BTreeSet;

use subtopo_core::{TopoResult, TopologyHistory};
use tracing::debug;

use crate::graph::analyse_components;

pub fn keep_main_component(history: &mut TopologyHistory) -> TopoResult<Vec<String>> {
    let analysis = analyse_components(history)?;
    let main = analysis.main_equipment();
    debug!(
        "{} connected component(s), main one holds {} equipment",
        analysis.components.len(),
        main.len()
    );

    let outside: BTreeSet<String> = analysis
        .components
        .iter()
        .flatten()
        .filter(|id| !main.contains(*id))
        .cloned()
        .collect();

    for substation in history.substations_mut() {
        for id in &outside {
            substation.remove_equipment_id(id);
        }
    }
    Ok(outside.into_iter().collect())
}
