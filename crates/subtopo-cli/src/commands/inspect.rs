use std::path::Path;

use anyhow::Result;
use serde::Serialize;
use subtopo_cli::OutputFormat;
use subtopo_core::HistoryStats;
use subtopo_io::{load_history, CacheKeyInputs};

use crate::commands::util::{print_json, print_table};

#[derive(Serialize)]
struct ChoiceSummary {
    cluster_id: usize,
    possible_topologies: usize,
    substations: Vec<String>,
    max_probability: f64,
}

#[derive(Serialize)]
struct InspectReport {
    stats: HistoryStats,
    cache_key: String,
    choices: Vec<ChoiceSummary>,
}

pub fn handle(path: &Path, format: OutputFormat) -> Result<()> {
    let history = load_history(path)?;
    let report = InspectReport {
        stats: history.stats(),
        cache_key: CacheKeyInputs::of_history(&history).key(),
        choices: history
            .topology_choices
            .iter()
            .map(|choice| ChoiceSummary {
                cluster_id: choice.cluster_id,
                possible_topologies: choice.possible_topologies.len(),
                substations: choice.substation_ids().into_iter().map(String::from).collect(),
                max_probability: choice
                    .possible_topologies
                    .iter()
                    .map(|t| t.probability)
                    .fold(0.0, f64::max),
            })
            .collect(),
    };

    match format {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Plain => {
            let stats = &report.stats;
            let mut rows = vec![
                ("choices".to_string(), stats.choices.to_string()),
                ("possible topologies".to_string(), stats.possible_topologies.to_string()),
                ("substation snapshots".to_string(), stats.substations.to_string()),
                ("buses".to_string(), stats.buses.to_string()),
                ("equipment".to_string(), stats.equipment.to_string()),
                ("cache key".to_string(), report.cache_key.clone()),
            ];
            for choice in &report.choices {
                rows.push((
                    format!("cluster {}", choice.cluster_id),
                    format!(
                        "{} topologies over {} (max p={:.3})",
                        choice.possible_topologies,
                        choice.substations.join(","),
                        choice.max_probability
                    ),
                ));
            }
            print_table(("FIELD", "VALUE"), &rows)
        }
    }
}
