//! Reconciliation settings.
//!
//! Every section uses `#[serde(default)]`, so a partial TOML file only overrides
//! the keys it names. Without `probability_threshold`, low-probability pruning
//! uses the threshold recorded in the history itself:
//!
//! ```toml
//! [cleaning]
//! probability_threshold = 0.05
//! isolated_load_strategy = "remove-topology"
//!
//! [check]
//! enabled = false
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use subtopo_core::{TopoError, TopoResult, TopologyHistory};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    pub cleaning: CleaningConfig,
    pub check: CheckConfig,
}

/// What to do with a bus that only holds loads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IsolatedLoadStrategy {
    /// Move each load to the bus it most often shares with a branch in sibling topologies.
    #[default]
    Relocate,
    /// Drop the possible topology holding the isolated bus.
    RemoveTopology,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    /// Possible topologies below this probability are dropped (the last one of a choice is
    /// kept). `None` falls back to the history's own threshold.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability_threshold: Option<f64>,
    pub isolated_load_strategy: IsolatedLoadStrategy,
    /// Iteration cap of the fixpoint loop.
    pub max_iterations: usize,
    /// Ids of synthetic equipment, silently removed when unknown to the network.
    pub fictive_equipment_pattern: String,
    pub remove_equipment_out_of_main_component: bool,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            probability_threshold: None,
            isolated_load_strategy: IsolatedLoadStrategy::Relocate,
            max_iterations: 100,
            fictive_equipment_pattern: "^FICT".to_string(),
            remove_equipment_out_of_main_component: true,
        }
    }
}

impl CleaningConfig {
    pub fn fictive_regex(&self) -> TopoResult<Regex> {
        Regex::new(&self.fictive_equipment_pattern).map_err(|e| {
            TopoError::Config(format!(
                "invalid fictive equipment pattern '{}': {e}",
                self.fictive_equipment_pattern
            ))
        })
    }

    /// Threshold of the low-probability pass for `history`.
    pub fn probability_threshold_for(&self, history: &TopologyHistory) -> f64 {
        self.probability_threshold
            .unwrap_or(history.probability_threshold)
    }

    pub fn validate(&self) -> TopoResult<()> {
        if let Some(threshold) = self.probability_threshold {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(TopoError::Config(format!(
                    "probability threshold {threshold} outside [0, 1]"
                )));
            }
        }
        if self.max_iterations == 0 {
            return Err(TopoError::Config("max_iterations must be positive".into()));
        }
        self.fictive_regex().map(|_| ())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    pub enabled: bool,
    /// Name of the disposable network state used while replaying.
    pub scratch_state_id: String,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            scratch_state_id: "topo-check".to_string(),
        }
    }
}

impl ReconcileConfig {
    pub fn validate(&self) -> TopoResult<()> {
        self.cleaning.validate()?;
        if self.check.scratch_state_id.is_empty() {
            return Err(TopoError::Config("scratch_state_id must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ReconcileConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cleaning.max_iterations, 100);
        assert!(config.check.enabled);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ReconcileConfig = toml::from_str(
            r#"
            [cleaning]
            probability_threshold = 0.05
            isolated_load_strategy = "remove-topology"
            "#,
        )
        .unwrap();
        assert_eq!(config.cleaning.probability_threshold, Some(0.05));
        assert_eq!(
            config.cleaning.isolated_load_strategy,
            IsolatedLoadStrategy::RemoveTopology
        );
        assert_eq!(config.cleaning.fictive_equipment_pattern, "^FICT");
        assert_eq!(config.check, CheckConfig::default());
    }

    #[test]
    fn test_threshold_falls_back_to_history() {
        let mut h = crate::test_utils::history(Vec::new());
        h.probability_threshold = 0.1;
        let config = CleaningConfig::default();
        assert_eq!(config.probability_threshold_for(&h), 0.1);
        let config = CleaningConfig {
            probability_threshold: Some(0.3),
            ..CleaningConfig::default()
        };
        assert_eq!(config.probability_threshold_for(&h), 0.3);
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let config = CleaningConfig {
            fictive_equipment_pattern: "(".into(),
            ..CleaningConfig::default()
        };
        assert!(matches!(config.validate(), Err(TopoError::Config(_))));
    }

    #[test]
    fn test_threshold_out_of_range() {
        let config = CleaningConfig {
            probability_threshold: Some(1.5),
            ..CleaningConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
