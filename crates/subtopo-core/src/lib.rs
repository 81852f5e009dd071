//! # subtopo-core: Substation Topology Model
//!
//! Data structures shared by the reconciliation engine: the historical snapshots
//! mined from operation data, the canonical topology derived from them, and the
//! network capabilities the engine relies on.
//!
//! ## Design Philosophy
//!
//! The history is a tree of **values**:
//! - **Equipment** is identified by id and duplicate index, never by reference
//! - **Buses** compare as equipment sets, **substations** as bus partitions
//! - Cloning a possible topology deep-copies it down to the equipment
//!
//! Equipment kinds are a closed enum; every behavior that depends on the kind
//! (branch, injection, feeder counting) is a total `match`.
//!
//! ## Quick Start
//!
//! ```rust
//! use subtopo_core::*;
//!
//! let bus = Bus::new(vec![
//!     Equipment::new("LINE1").with_kind(EquipmentKind::Line),
//!     Equipment::new("LOAD1").with_kind(EquipmentKind::Load),
//! ]);
//! let substation = Substation::new("VL1", vec![bus]);
//! let topology = PossibleTopology::new("a1b2", 0.8, MetaSubstation::new(vec![substation]));
//! let choice = TopologyChoice::new(0, vec![topology]);
//! assert!(choice.ensure_non_empty().is_ok());
//! ```
//!
//! ## Modules
//!
//! - [`equipment`] - Equipment identity, kinds and the bus validity rule
//! - [`topology`] - Historical snapshots (choice, possible topology, substation, bus)
//! - [`unique`] - Canonical topology produced by the builder
//! - [`network`] - Network capabilities ([`TopologyNetwork`]) and scratch states
//! - [`grid`] - In-memory bus/breaker network
//! - [`graph_utils`] - Bus merging through closed switches
//! - [`diagnostics`] - Issue collection
//! - [`short_id`] - Short aliases for log output
//! - [`alloc`] - Placeholder id allocation

pub mod alloc;
pub mod diagnostics;
pub mod equipment;
pub mod error;
pub mod graph_utils;
pub mod grid;
pub mod network;
pub mod short_id;
pub mod topology;
pub mod unique;

pub use alloc::FictiveIdAllocator;
pub use diagnostics::{DiagnosticIssue, Diagnostics, Severity, Stage};
pub use equipment::{BusCounts, Equipment, EquipmentKind};
pub use error::{TopoError, TopoResult};
pub use grid::{Network, NetworkEquipment, Terminal, VoltageLevel, INITIAL_STATE};
pub use network::{ComputedBus, ScratchState, TerminalRef, TopologyNetwork, VlTerminal};
pub use short_id::ShortIdDictionary;
pub use topology::{
    Bus, HistoryStats, MetaSubstation, PossibleTopology, Substation, TimeInterval,
    TopologyChoice, TopologyHistory,
};
pub use unique::{UniqueBus, UniqueSubstation, UniqueSwitch, UniqueTopology};
