//! # subtopo-io: Documents & History Cache
//!
//! File formats read and written around a reconciliation run.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use subtopo_io::{load_history, load_network};
//!
//! fn main() -> anyhow::Result<()> {
//!     let network = load_network(Path::new("network.json"))?;
//!     let history = load_history(Path::new("history.json"))?;
//!     println!("{} against {}", history.stats(), network.id);
//!     Ok(())
//! }
//! ```
//!
//! ## Documents
//!
//! | Document | Format | Module |
//! |----------|--------|--------|
//! | History | versioned JSON, camelCase | [`history`] |
//! | Reference network | JSON | [`network`] |
//! | Short ids | JSON object, id to alias | [`network`] |
//!
//! Every loader validates what it read and fails with context naming the file.
//!
//! ## Cache ([`cache`])
//!
//! Histories are keyed by a SHA-256 of their mining inputs and stored under
//! `<cache dir>/subtopo/<key>/history.json`.
//!
//! ## Error Handling
//!
//! Loaders return [`anyhow::Result`]; structural errors of the history surface as
//! [`subtopo_core::TopoError`] in the error chain.

pub mod cache;
pub mod history;
pub mod network;

pub use cache::{default_cache_root, CacheKeyInputs, HistoryCache};
pub use history::{
    history_to_string, load_history, parse_history, save_history, HistoryDocument,
    HISTORY_SCHEMA_VERSION,
};
pub use network::{
    load_network, load_short_ids, save_network, save_short_ids, validate_network,
};
