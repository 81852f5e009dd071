//! TOML settings file.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use subtopo_algo::ReconcileConfig;

/// Settings from `path`, or the defaults when no file is given.
pub fn load_config(path: Option<&Path>) -> Result<ReconcileConfig> {
    let Some(path) = path else {
        return Ok(ReconcileConfig::default());
    };
    let text =
        fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
    let config: ReconcileConfig =
        toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))?;
    config.validate()?;
    Ok(config)
}
