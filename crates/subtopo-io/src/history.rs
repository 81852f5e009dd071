//! History documents with version tracking.
//!
//! A history file is the JSON rendering of [`TopologyHistory`] with a `version`
//! field on top:
//!
//! ```json
//! {
//!   "version": "1.0.0",
//!   "interval": { "start": "2024-01-01T00:00:00Z", "end": "2024-12-31T23:00:00Z" },
//!   "correlationThreshold": 0.9,
//!   "probabilityThreshold": 0.01,
//!   "topologyChoices": [ ... ]
//! }
//! ```

use std::fs;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use subtopo_core::TopologyHistory;
use tracing::debug;

/// Current history document version (semver)
pub const HISTORY_SCHEMA_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryDocument {
    /// Document version for migration support
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(flatten)]
    pub history: TopologyHistory,
}

fn default_version() -> String {
    HISTORY_SCHEMA_VERSION.to_string()
}

impl HistoryDocument {
    pub fn new(history: TopologyHistory) -> Self {
        Self {
            version: default_version(),
            history,
        }
    }

    /// Check the document can be read by this version.
    pub fn is_compatible(&self) -> Result<()> {
        use semver::Version;

        let version = Version::parse(&self.version)
            .map_err(|e| anyhow!("Invalid history document version '{}': {}", self.version, e))?;
        let current = Version::parse(HISTORY_SCHEMA_VERSION)?;

        if version.major > current.major {
            bail!(
                "History document v{} is too new (this version supports up to v{})",
                self.version,
                HISTORY_SCHEMA_VERSION
            );
        }
        Ok(())
    }

    /// Version, thresholds, interval and structural checks.
    pub fn validate(&self) -> Result<()> {
        self.is_compatible()?;
        let history = &self.history;
        for (name, value) in [
            ("correlationThreshold", history.correlation_threshold),
            ("probabilityThreshold", history.probability_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                bail!("{name} {value} outside [0, 1]");
            }
        }
        if history.interval.end < history.interval.start {
            bail!(
                "interval end {} is before start {}",
                history.interval.end,
                history.interval.start
            );
        }
        history.validate()?;
        Ok(())
    }
}

/// Parse and validate a history document.
pub fn parse_history(json: &str) -> Result<TopologyHistory> {
    let document: HistoryDocument =
        serde_json::from_str(json).context("parsing history document")?;
    document.validate()?;
    Ok(document.history)
}

pub fn load_history(path: &Path) -> Result<TopologyHistory> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("reading history {}", path.display()))?;
    let history =
        parse_history(&json).with_context(|| format!("loading history {}", path.display()))?;
    debug!("Loaded {} from {}", history.stats(), path.display());
    Ok(history)
}

pub fn history_to_string(history: &TopologyHistory) -> Result<String> {
    let document = HistoryDocument::new(history.clone());
    Ok(serde_json::to_string_pretty(&document)?)
}

pub fn save_history(path: &Path, history: &TopologyHistory) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }
    fs::write(path, history_to_string(history)?)
        .with_context(|| format!("writing history {}", path.display()))?;
    debug!("Saved {} to {}", history.stats(), path.display());
    Ok(())
}
