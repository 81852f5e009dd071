//! High-level workflow facades.
//!
//! These facades chain the engine steps with their usual configuration, for
//! callers that do not need to drive each step themselves.

pub mod reconcile;

pub use reconcile::{ReconcileOutcome, Reconciliation};
