//! End-to-end reconciliation facade
//!
//! Provides a builder-style API running clean, build, apply and check in order.

use subtopo_core::{ShortIdDictionary, TopoResult, TopologyHistory, TopologyNetwork, UniqueTopology};
use tracing::info;

use crate::apply::{apply_unique_topology, ApplyReport};
use crate::builder::{build_unique_topology, record_switch_states};
use crate::check::{check_topology, CheckReport};
use crate::cleaning::{CleaningReport, HistoryCleaner};
use crate::config::ReconcileConfig;

/// Everything a reconciliation run produced
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    pub cleaning: CleaningReport,
    pub unique: UniqueTopology,
    pub applied: ApplyReport,
    /// `None` when the check is disabled
    pub check: Option<CheckReport>,
}

/// Fluent builder for a reconciliation run
pub struct Reconciliation<'a, N: TopologyNetwork + ?Sized> {
    network: &'a mut N,
    config: ReconcileConfig,
    short_ids: Option<&'a ShortIdDictionary>,
}

impl<'a, N: TopologyNetwork + ?Sized> Reconciliation<'a, N> {
    /// Create a new reconciliation against a network
    pub fn new(network: &'a mut N) -> Self {
        Self {
            network,
            config: ReconcileConfig::default(),
            short_ids: None,
        }
    }

    pub fn with_config(mut self, config: ReconcileConfig) -> Self {
        self.config = config;
        self
    }

    /// Render equipment with short aliases in logs and diagnostics
    pub fn with_short_ids(mut self, short_ids: &'a ShortIdDictionary) -> Self {
        self.short_ids = Some(short_ids);
        self
    }

    /// Clean the history only, leaving the network untouched
    pub fn clean(&self, history: &mut TopologyHistory) -> TopoResult<CleaningReport> {
        let mut cleaner = HistoryCleaner::new(&*self.network, &self.config.cleaning);
        if let Some(dict) = self.short_ids {
            cleaner = cleaner.with_short_ids(dict);
        }
        cleaner.clean(history)
    }

    /// Clean the history, derive the unique topology, apply it and check it
    pub fn run(mut self, history: &mut TopologyHistory) -> TopoResult<ReconcileOutcome> {
        self.config.validate()?;
        let cleaning = self.clean(history)?;

        let unique = build_unique_topology(history)?;
        record_switch_states(history, &unique);
        history.number();

        let applied = apply_unique_topology(&mut *self.network, &unique)?;
        let check = if self.config.check.enabled {
            Some(check_topology(
                &mut *self.network,
                history,
                &self.config.check,
                self.short_ids,
            )?)
        } else {
            None
        };

        info!(
            "Reconciliation done: {} substation(s), {} switch(es)",
            unique.len(),
            unique.switch_count()
        );
        Ok(ReconcileOutcome {
            cleaning,
            unique,
            applied,
            check,
        })
    }
}
