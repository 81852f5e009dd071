use std::path::Path;

use anyhow::Result;
use subtopo_algo::{CleaningReport, HistoryCleaner};
use subtopo_cli::{load_config, OutputFormat, RunInputs};
use subtopo_io::{load_history, load_network, save_history};
use tracing::info;

use crate::commands::util::{print_json, print_table, short_ids};

pub fn handle(inputs: &RunInputs, out: &Path, format: OutputFormat) -> Result<()> {
    let config = load_config(inputs.config.as_deref())?;
    let network = load_network(&inputs.network)?;
    let mut history = load_history(&inputs.history)?;
    let dict = short_ids(inputs)?;

    let mut cleaner = HistoryCleaner::new(&network, &config.cleaning);
    if let Some(dict) = dict.as_ref() {
        cleaner = cleaner.with_short_ids(dict);
    }
    let report = cleaner.clean(&mut history)?;

    save_history(out, &history)?;
    info!("Cleaned history written to {}", out.display());

    match format {
        OutputFormat::Plain => print_report(&report),
        OutputFormat::Json => print_json(&report),
    }
}

pub fn print_report(report: &CleaningReport) -> Result<()> {
    let mut rows: Vec<(String, String)> = report
        .rules
        .iter()
        .map(|(rule, r)| (rule.description().to_string(), r.actions.to_string()))
        .collect();
    rows.push(("iterations".to_string(), report.iterations.to_string()));
    print_table(("REPAIR", "COUNT"), &rows)
}
