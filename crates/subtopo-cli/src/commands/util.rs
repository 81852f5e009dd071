use std::io::{self, Write};

use anyhow::Result;
use rayon::ThreadPoolBuilder;
use serde::Serialize;
use subtopo_core::ShortIdDictionary;
use subtopo_io::load_short_ids;
use tabwriter::TabWriter;

use subtopo_cli::RunInputs;

pub fn configure_threads(spec: &str) {
    let count = if spec.eq_ignore_ascii_case("auto") {
        num_cpus::get()
    } else {
        spec.parse().unwrap_or_else(|_| num_cpus::get())
    };
    let _ = ThreadPoolBuilder::new().num_threads(count).build_global();
}

pub fn short_ids(inputs: &RunInputs) -> Result<Option<ShortIdDictionary>> {
    inputs.short_ids.as_deref().map(load_short_ids).transpose()
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    serde_json::to_writer_pretty(io::stdout(), value)
        .map_err(|err| anyhow::anyhow!("serializing report to JSON: {err}"))?;
    println!();
    Ok(())
}

/// Two-column aligned table on stdout.
pub fn print_table(header: (&str, &str), rows: &[(String, String)]) -> Result<()> {
    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "{}\t{}", header.0, header.1)?;
    for (key, value) in rows {
        writeln!(writer, "{key}\t{value}")?;
    }
    writer.flush()?;
    Ok(())
}
