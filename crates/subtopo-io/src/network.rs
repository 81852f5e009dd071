//! Reference network and short id documents.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use subtopo_core::{Network, ShortIdDictionary, TopologyNetwork};
use tracing::debug;

pub fn load_network(path: &Path) -> Result<Network> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("reading network {}", path.display()))?;
    let network: Network = serde_json::from_str(&json)
        .with_context(|| format!("parsing network {}", path.display()))?;
    validate_network(&network)?;
    debug!(
        "Loaded network '{}': {} voltage level(s), {} equipment",
        network.id,
        network.voltage_levels.len(),
        network.equipment.len()
    );
    Ok(network)
}

pub fn save_network(path: &Path, network: &Network) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(network)?;
    fs::write(path, json).with_context(|| format!("writing network {}", path.display()))?;
    Ok(())
}

/// Terminals must point at existing voltage levels and buses.
pub fn validate_network(network: &Network) -> Result<()> {
    for (id, equipment) in &network.equipment {
        for terminal in &equipment.terminals {
            let Some(vl) = network.voltage_levels.get(&terminal.voltage_level) else {
                bail!(
                    "equipment '{id}' references unknown voltage level '{}'",
                    terminal.voltage_level
                );
            };
            if !vl.buses.contains(&terminal.bus) {
                bail!(
                    "equipment '{id}' references unknown bus '{}' in voltage level '{}'",
                    terminal.bus,
                    vl.id
                );
            }
        }
    }
    for (dangling, line) in &network.pairings {
        if network.equipment_kind(dangling).is_none() || network.equipment_kind(line).is_none() {
            bail!("pairing '{dangling}' -> '{line}' references unknown equipment");
        }
    }
    Ok(())
}

pub fn load_short_ids(path: &Path) -> Result<ShortIdDictionary> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("reading short ids {}", path.display()))?;
    let dict: ShortIdDictionary = serde_json::from_str(&json)
        .with_context(|| format!("parsing short ids {}", path.display()))?;
    debug!("Loaded {} short id(s) from {}", dict.len(), path.display());
    Ok(dict)
}

pub fn save_short_ids(path: &Path, dict: &ShortIdDictionary) -> Result<()> {
    fs::write(path, serde_json::to_string_pretty(dict)?)
        .with_context(|| format!("writing short ids {}", path.display()))?;
    Ok(())
}
