//! History cleaning pipeline.
//!
//! Before the loop, every equipment is resolved against the reference network
//! ([`reference`]). The loop then runs the repair passes below, in order, until a
//! full iteration changes nothing:
//!
//! | Pass | Rule |
//! |------|------|
//! | 1 | [`reconnect`]: every snapshot of a substation holds the same equipment |
//! | 2 | [`branches`]: branches folded on one substation get their missing side |
//! | 3 | [`main_component`]: equipment outside the main grid is deleted |
//! | 4 | [`isolated_loads`]: load-only buses are relocated or their topology dropped |
//! | 5 | [`pruning::remove_duplicates`]: identical topologies of a choice are merged |
//! | 6 | [`pruning::remove_low_probability`]: unlikely topologies are dropped |
//! | 7 | [`pruning::remove_empty_buses`] |
//!
//! Each pass returns the ids it touched; an empty list means the pass did not fire.
//! Passes only remove equipment and topologies or add single-equipment buses, so
//! the loop converges. A loop still running after `max_iterations` raises
//! [`TopoError::NoConvergence`].

pub mod branches;
pub mod isolated_loads;
pub mod main_component;
pub mod pruning;
pub mod reconnect;
pub mod reference;

use std::collections::BTreeMap;

use serde::Serialize;
use subtopo_core::{ShortIdDictionary, TopoError, TopoResult, TopologyHistory, TopologyNetwork};
use tracing::{debug, info};

use crate::config::CleaningConfig;

/// Repair rules, in the order they are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CleaningRule {
    FictiveEquipment,
    DanglingLineMerge,
    UnknownEquipment,
    UnknownEquipmentTopology,
    Reconnect,
    OneSidedBranch,
    MainComponent,
    IsolatedLoadRelocated,
    IsolatedLoadTopology,
    DuplicateTopology,
    LowProbabilityTopology,
    EmptyBus,
}

impl CleaningRule {
    pub fn description(self) -> &'static str {
        match self {
            CleaningRule::FictiveEquipment => "fictive equipment removed",
            CleaningRule::DanglingLineMerge => "dangling lines merged into their tie line",
            CleaningRule::UnknownEquipment => "equipment unknown to the network removed",
            CleaningRule::UnknownEquipmentTopology => {
                "possible topologies with unknown equipment removed"
            }
            CleaningRule::Reconnect => "disconnected equipment reconnected",
            CleaningRule::OneSidedBranch => "one sided branches fixed",
            CleaningRule::MainComponent => "equipment out of the main component removed",
            CleaningRule::IsolatedLoadRelocated => "isolated loads relocated",
            CleaningRule::IsolatedLoadTopology => "possible topologies with isolated loads removed",
            CleaningRule::DuplicateTopology => "duplicated possible topologies removed",
            CleaningRule::LowProbabilityTopology => "low probability possible topologies removed",
            CleaningRule::EmptyBus => "empty buses removed",
        }
    }
}

/// What one rule did over the whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RuleReport {
    pub actions: usize,
    /// Touched ids, in firing order (may repeat across iterations).
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleaningReport {
    pub iterations: usize,
    pub rules: BTreeMap<CleaningRule, RuleReport>,
}

impl CleaningReport {
    pub fn record(&mut self, rule: CleaningRule, ids: Vec<String>) {
        if ids.is_empty() {
            return;
        }
        let entry = self.rules.entry(rule).or_default();
        entry.actions += ids.len();
        entry.ids.extend(ids);
    }

    pub fn actions(&self, rule: CleaningRule) -> usize {
        self.rules.get(&rule).map_or(0, |r| r.actions)
    }

    pub fn total_actions(&self) -> usize {
        self.rules.values().map(|r| r.actions).sum()
    }

    /// Whether the run repaired nothing.
    pub fn is_clean(&self) -> bool {
        self.total_actions() == 0
    }
}

impl std::fmt::Display for CleaningReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} iteration(s)", self.iterations)?;
        for (rule, report) in &self.rules {
            write!(f, "\n  {}: {}", rule.description(), report.actions)?;
        }
        Ok(())
    }
}

/// Runs the cleaning pipeline on a history, in place.
///
/// ```ignore
/// let report = HistoryCleaner::new(&network, &config.cleaning).clean(&mut history)?;
/// println!("{report}");
/// ```
pub struct HistoryCleaner<'a, N: TopologyNetwork + ?Sized> {
    network: &'a N,
    config: &'a CleaningConfig,
    short_ids: Option<&'a ShortIdDictionary>,
}

impl<'a, N: TopologyNetwork + ?Sized> HistoryCleaner<'a, N> {
    pub fn new(network: &'a N, config: &'a CleaningConfig) -> Self {
        Self {
            network,
            config,
            short_ids: None,
        }
    }

    /// Render equipment ids with their short aliases in log lines.
    pub fn with_short_ids(mut self, short_ids: &'a ShortIdDictionary) -> Self {
        self.short_ids = Some(short_ids);
        self
    }

    pub fn clean(&self, history: &mut TopologyHistory) -> TopoResult<CleaningReport> {
        self.config.validate()?;
        let mut report = CleaningReport::default();
        info!("Cleaning history: {}", history.stats());

        let fictive = self.config.fictive_regex()?;
        let resolved = reference::resolve_against_network(history, self.network, &fictive)?;
        self.apply(&mut report, CleaningRule::FictiveEquipment, resolved.fictive);
        self.apply(&mut report, CleaningRule::DanglingLineMerge, resolved.merged);
        self.apply(&mut report, CleaningRule::UnknownEquipment, resolved.unknown);
        self.apply(
            &mut report,
            CleaningRule::UnknownEquipmentTopology,
            resolved.removed_topologies,
        );

        let threshold = self.config.probability_threshold_for(history);
        loop {
            if report.iterations >= self.config.max_iterations {
                return Err(TopoError::NoConvergence {
                    iterations: report.iterations,
                });
            }
            report.iterations += 1;
            debug!("Cleaning iteration {}", report.iterations);

            let mut changed = false;
            changed |= self.apply(
                &mut report,
                CleaningRule::Reconnect,
                reconnect::reconnect_disconnected_equipment(history),
            );
            changed |= self.apply(
                &mut report,
                CleaningRule::OneSidedBranch,
                branches::fix_one_sided_branches(history, self.network),
            );
            if self.config.remove_equipment_out_of_main_component {
                changed |= self.apply(
                    &mut report,
                    CleaningRule::MainComponent,
                    main_component::keep_main_component(history)?,
                );
            }
            let loads =
                isolated_loads::resolve_isolated_loads(history, self.config.isolated_load_strategy)?;
            changed |= self.apply(&mut report, CleaningRule::IsolatedLoadRelocated, loads.relocated);
            changed |= self.apply(
                &mut report,
                CleaningRule::IsolatedLoadTopology,
                loads.removed_topologies,
            );
            changed |= self.apply(
                &mut report,
                CleaningRule::DuplicateTopology,
                pruning::remove_duplicates(history),
            );
            changed |= self.apply(
                &mut report,
                CleaningRule::LowProbabilityTopology,
                pruning::remove_low_probability(history, threshold),
            );
            changed |= self.apply(
                &mut report,
                CleaningRule::EmptyBus,
                pruning::remove_empty_buses(history),
            );

            history.validate()?;
            if !changed {
                break;
            }
        }

        info!(
            "History cleaned in {} iteration(s), {} repair(s): {}",
            report.iterations,
            report.total_actions(),
            history.stats()
        );
        Ok(report)
    }

    /// Logs and records what a rule did; returns whether it fired.
    fn apply(&self, report: &mut CleaningReport, rule: CleaningRule, ids: Vec<String>) -> bool {
        if ids.is_empty() {
            return false;
        }
        info!("{} {}", ids.len(), rule.description());
        debug!("{}: {}", rule.description(), self.render(&ids));
        report.record(rule, ids);
        true
    }

    fn render(&self, ids: &[String]) -> String {
        match self.short_ids {
            Some(dict) => dict.join(ids.iter().map(String::as_str)),
            None => ids.join(", "),
        }
    }
}

/// Id used in reports for a possible topology.
pub(crate) fn topology_label(cluster_id: usize, topo_hash: &str) -> String {
    format!("{cluster_id}/{topo_hash}")
}
