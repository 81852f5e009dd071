//! On-disk cache of mined histories.
//!
//! Mining a history is expensive, so histories are stored under a key derived
//! from the mining inputs:
//!
//! ```text
//! <root>/<key>/history.json
//! ```
//!
//! The key is the lower case hex SHA-256 of a canonical rendering of the sorted
//! voltage level ids, both thresholds (17 significant digits) and the interval
//! bounds in RFC 3339 UTC, so it is stable across runs and platforms.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::SecondsFormat;
use sha2::{Digest, Sha256};
use subtopo_core::{TimeInterval, TopologyHistory};
use tracing::{debug, info};

use crate::history::{load_history, save_history};

const HISTORY_FILE: &str = "history.json";

/// Inputs a history was mined from.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheKeyInputs<'a> {
    pub voltage_levels: Vec<&'a str>,
    pub interval: TimeInterval,
    pub correlation_threshold: f64,
    pub probability_threshold: f64,
}

impl<'a> CacheKeyInputs<'a> {
    /// Inputs describing an already mined history.
    pub fn of_history(history: &'a TopologyHistory) -> Self {
        let voltage_levels = history
            .substations()
            .filter(|s| !s.fictive)
            .map(|s| s.id.as_str())
            .collect();
        Self {
            voltage_levels,
            interval: history.interval,
            correlation_threshold: history.correlation_threshold,
            probability_threshold: history.probability_threshold,
        }
    }

    /// Canonical text the key is hashed from.
    pub fn canonical(&self) -> String {
        let mut ids = self.voltage_levels.clone();
        ids.sort_unstable();
        ids.dedup();
        format!(
            "voltageLevels={}\ncorrelationThreshold={:.16e}\nprobabilityThreshold={:.16e}\nstart={}\nend={}\n",
            ids.join(","),
            self.correlation_threshold,
            self.probability_threshold,
            self.interval.start.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            self.interval.end.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        )
    }

    pub fn key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.canonical().as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// Default cache root (`<user cache dir>/subtopo`).
pub fn default_cache_root() -> Result<PathBuf> {
    dirs::cache_dir()
        .ok_or_else(|| anyhow!("Cannot determine cache directory"))
        .map(|d| d.join("subtopo"))
}

#[derive(Debug, Clone)]
pub struct HistoryCache {
    root: PathBuf,
}

impl HistoryCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Cache rooted at [`default_cache_root`].
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(default_cache_root()?))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key).join(HISTORY_FILE)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.path_for(key).is_file()
    }

    /// Cached history for `key`, `None` on a miss.
    pub fn load(&self, key: &str) -> Result<Option<TopologyHistory>> {
        let path = self.path_for(key);
        if !path.is_file() {
            debug!("History cache miss for {key}");
            return Ok(None);
        }
        info!("Loading cached history {}", path.display());
        load_history(&path).map(Some)
    }

    /// Stores `history` under `key`, replacing any previous entry.
    pub fn store(&self, key: &str, history: &TopologyHistory) -> Result<PathBuf> {
        let path = self.path_for(key);
        let dir = self.root.join(key);
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating cache directory {}", dir.display()))?;

        // write then rename so readers never see a partial file
        let partial = dir.join(format!("{HISTORY_FILE}.partial"));
        save_history(&partial, history)?;
        fs::rename(&partial, &path)
            .with_context(|| format!("moving history into {}", path.display()))?;
        info!("Stored history in cache {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn interval() -> TimeInterval {
        TimeInterval::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
        )
        .unwrap()
    }

    fn inputs(ids: Vec<&str>) -> CacheKeyInputs<'_> {
        CacheKeyInputs {
            voltage_levels: ids,
            interval: interval(),
            correlation_threshold: 0.9,
            probability_threshold: 0.01,
        }
    }

    #[test]
    fn test_canonical_rendering() {
        let text = inputs(vec!["VL2", "VL1", "VL2"]).canonical();
        assert_eq!(
            text,
            "voltageLevels=VL1,VL2\n\
             correlationThreshold=9.0000000000000002e-1\n\
             probabilityThreshold=1.0000000000000000e-2\n\
             start=2024-01-01T00:00:00Z\n\
             end=2024-02-01T00:00:00Z\n"
        );
    }

    #[test]
    fn test_key_ignores_voltage_level_order() {
        let a = inputs(vec!["VL1", "VL2"]).key();
        let b = inputs(vec!["VL2", "VL1"]).key();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_key_depends_on_thresholds() {
        let mut other = inputs(vec!["VL1"]);
        other.probability_threshold = 0.02;
        assert_ne!(inputs(vec!["VL1"]).key(), other.key());
    }

    #[test]
    fn test_default_root_ends_with_crate_dir() {
        if let Ok(root) = default_cache_root() {
            assert!(root.ends_with("subtopo"));
        }
    }

    #[test]
    fn test_miss_then_hit() {
        let dir = tempfile::tempdir().unwrap();
        let cache = HistoryCache::new(dir.path());
        let history = TopologyHistory::new(interval(), 0.9, 0.01, vec![]);
        let key = CacheKeyInputs::of_history(&history).key();

        assert!(!cache.contains(&key));
        assert!(cache.load(&key).unwrap().is_none());

        let path = cache.store(&key, &history).unwrap();
        assert_eq!(path, dir.path().join(&key).join("history.json"));
        assert!(cache.contains(&key));
        assert!(!dir.path().join(&key).join("history.json.partial").exists());

        let back = cache.load(&key).unwrap().unwrap();
        assert_eq!(back.interval, history.interval);
        assert_eq!(back.probability_threshold, 0.01);
    }
}
