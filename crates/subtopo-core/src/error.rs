//! Unified error types for topology reconciliation.
//!
//! [`TopoError`] carries the structural failures that abort a reconciliation run.
//! Conditions the cleaning pipeline is able to repair on its own (unknown equipment,
//! equipment outside the main grid, isolated loads) never surface here; they are
//! reported through counters and only escalate when repair is impossible.
//!
//! # Example
//!
//! ```ignore
//! use subtopo_core::{TopoError, TopoResult};
//!
//! fn reconcile(history: &mut TopologyHistory) -> TopoResult<()> {
//!     clean(history)?;
//!     let unique = build(history)?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Unified error type for all reconciliation operations.
#[derive(Error, Debug)]
pub enum TopoError {
    /// Data validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors raised by the network collaborator
    #[error("Network error: {0}")]
    Network(String),

    /// A topology choice lost its last possible topology.
    #[error("Topology choice {cluster_id} has no possible topology left")]
    EmptyTopologyChoice { cluster_id: usize },

    /// Three windings transformers cannot be reconciled.
    #[error("Three windings transformer '{id}' is not supported")]
    UnsupportedThreeWindingsTransformer { id: String },

    /// A branch was recorded in more than two substations.
    #[error("More than two topo sets for branch '{id}': {sides:?}")]
    InconsistentBranch { id: String, sides: Vec<String> },

    /// A snapshot references a voltage level the network does not know.
    #[error("Voltage level '{id}' not found")]
    MissingVoltageLevel { id: String },

    /// Replaying the history against the derived topology failed.
    #[error("Topology check failed: {mismatches} mismatch(es)")]
    CheckFailed { mismatches: usize },

    /// The cleaning loop did not reach a fixpoint.
    #[error("History cleaning did not converge after {iterations} iterations")]
    NoConvergence { iterations: usize },
}

/// Convenience type alias for Results using TopoError.
pub type TopoResult<T> = Result<T, TopoError>;
