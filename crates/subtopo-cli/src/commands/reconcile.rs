use std::path::Path;

use anyhow::Result;
use serde::Serialize;
use subtopo_algo::{ApplyReport, CheckReport, CleaningReport, ReconcileOutcome, Reconciliation};
use subtopo_cli::{load_config, OutputFormat, RunInputs};
use subtopo_io::{load_history, load_network, save_history, save_network};
use tracing::info;

use crate::commands::clean::print_report;
use crate::commands::util::{print_json, print_table, short_ids};

#[derive(Serialize)]
struct Summary<'a> {
    substations: usize,
    switches: usize,
    cleaning: &'a CleaningReport,
    applied: &'a ApplyReport,
    check: Option<&'a CheckReport>,
}

pub fn handle(
    inputs: &RunInputs,
    out: &Path,
    history_out: Option<&Path>,
    no_check: bool,
    format: OutputFormat,
) -> Result<()> {
    let mut config = load_config(inputs.config.as_deref())?;
    if no_check {
        config.check.enabled = false;
    }
    let mut network = load_network(&inputs.network)?;
    let mut history = load_history(&inputs.history)?;
    let dict = short_ids(inputs)?;

    let mut run = Reconciliation::new(&mut network).with_config(config);
    if let Some(dict) = dict.as_ref() {
        run = run.with_short_ids(dict);
    }
    let outcome = run.run(&mut history)?;

    save_network(out, &network)?;
    info!("Reconciled network written to {}", out.display());
    if let Some(path) = history_out {
        save_history(path, &history)?;
        info!("History with switch states written to {}", path.display());
    }

    match format {
        OutputFormat::Json => print_json(&summary(&outcome)),
        OutputFormat::Plain => print_plain(&outcome),
    }
}

fn summary(outcome: &ReconcileOutcome) -> Summary<'_> {
    Summary {
        substations: outcome.unique.len(),
        switches: outcome.unique.switch_count(),
        cleaning: &outcome.cleaning,
        applied: &outcome.applied,
        check: outcome.check.as_ref(),
    }
}

fn print_plain(outcome: &ReconcileOutcome) -> Result<()> {
    print_report(&outcome.cleaning)?;
    println!();
    let applied = &outcome.applied;
    let mut rows = vec![
        ("substations".to_string(), outcome.unique.len().to_string()),
        ("switches".to_string(), outcome.unique.switch_count().to_string()),
        ("buses created".to_string(), applied.buses_created.to_string()),
        ("terminals moved".to_string(), applied.terminals_moved.to_string()),
        ("equipment removed".to_string(), applied.removed_equipment.len().to_string()),
        ("terminals disconnected".to_string(), applied.terminals_disconnected.to_string()),
    ];
    rows.push(match &outcome.check {
        Some(check) => (
            "check".to_string(),
            format!("passed ({} topologies replayed)", check.topologies),
        ),
        None => ("check".to_string(), "skipped".to_string()),
    });
    print_table(("RESULT", "VALUE"), &rows)?;
    for issue in &applied.diagnostics.issues {
        println!("{issue}");
    }
    Ok(())
}
