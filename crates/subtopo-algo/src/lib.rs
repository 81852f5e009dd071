//! # subtopo-algo: Topology Reconciliation Engine
//!
//! Turns a history of sampled substation topologies into one switching topology
//! per substation, applies it to a network and checks it against the history.
//!
//! ## Pipeline
//!
//! | Step | Entry point | Mutates |
//! |------|-------------|---------|
//! | Cleaning | [`HistoryCleaner::clean`] | history |
//! | Building | [`build_unique_topology`] | nothing |
//! | Switch states | [`record_switch_states`] | history |
//! | Applying | [`apply_unique_topology`] | network |
//! | Checking | [`check_topology`] | scratch network state |
//!
//! ### Cleaning
//!
//! A fixpoint loop of repair passes (reconnection, one sided branches, main
//! component, isolated loads, duplicate and low probability topologies, empty
//! buses). See [`cleaning`] for the order and the convergence rule.
//!
//! ### Building
//!
//! Canonical buses are the equipment groups that never split in any sample.
//! Switches are the pairs of canonical buses ever merged, pruned along the cycle
//! basis while every sample remains reproducible. With the default `parallel`
//! feature, substations are built on the rayon thread pool.
//!
//! ## Example
//!
//! ```ignore
//! use subtopo_algo::{ReconcileConfig, Reconciliation};
//!
//! let outcome = Reconciliation::new(&mut network)
//!     .with_config(ReconcileConfig::default())
//!     .run(&mut history)?;
//! println!("{}", outcome.cleaning);
//! println!("{} switches", outcome.unique.switch_count());
//! ```

pub mod apply;
pub mod builder;
pub mod check;
pub mod cleaning;
pub mod config;
pub mod connectivity;
pub mod graph;
pub mod test_utils;
pub mod workflows;

pub use apply::{apply_unique_topology, ApplyReport};
pub use builder::{build_unique_topology, record_switch_states};
pub use check::{check_topology, replay_history, CheckReport};
pub use cleaning::{CleaningReport, CleaningRule, HistoryCleaner, RuleReport};
pub use config::{CheckConfig, CleaningConfig, IsolatedLoadStrategy, ReconcileConfig};
pub use connectivity::StackedConnectivityIndex;
pub use graph::{analyse_components, ComponentsAnalysis};
pub use workflows::{ReconcileOutcome, Reconciliation};
