//! Graph algorithms over historical and canonical topologies.
//!
//! - **Components**: the stacked graph of every snapshot and its main component,
//!   used to drop equipment disconnected from the grid
//! - **Cycles**: cycle basis used by the builder to prune redundant switches
//!
//! ```ignore
//! use subtopo_algo::graph::analyse_components;
//!
//! let analysis = analyse_components(&history)?;
//! println!("{} components, main holds {} equipment",
//!     analysis.components.len(), analysis.main_equipment().len());
//! ```

pub mod components;
pub mod cycles;

pub use components::{analyse_components, ComponentsAnalysis};
pub use cycles::{cycle_basis, edges_on_cycles};
