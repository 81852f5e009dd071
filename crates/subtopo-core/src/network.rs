//! Capabilities the reconciliation engine needs from a network model.
//!
//! The engine never owns the network. It reads voltage levels, buses, switches
//! and terminals through [`TopologyNetwork`] and mutates the topology through the
//! same trait. [`crate::grid::Network`] is the in-memory implementation shipped
//! with this crate.
//!
//! ## Terminals and duplicate indices
//!
//! A terminal is addressed by its equipment id and side (1, 2 or 3). Inside a
//! voltage level, the terminals of one equipment are numbered by ascending side:
//! the first gets duplicate index 0, the second index 1. This is the same
//! convention the history uses for branches folded back on one substation.
//!
//! ## States
//!
//! Switch positions and terminal flows live in named states. [`ScratchState`]
//! clones the working state, makes the clone active, and restores the previous
//! state when dropped, whatever way the scope is left.

use std::collections::BTreeSet;
use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::alloc::FictiveIdAllocator;
use crate::equipment::{Equipment, EquipmentKind};
use crate::error::TopoResult;

/// Terminal address: equipment id and side (1-based).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TerminalRef {
    pub equipment_id: String,
    pub side: u8,
}

impl TerminalRef {
    pub fn new(equipment_id: impl Into<String>, side: u8) -> Self {
        Self {
            equipment_id: equipment_id.into(),
            side,
        }
    }
}

impl std::fmt::Display for TerminalRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.equipment_id, self.side)
    }
}

/// A terminal seen from its voltage level.
#[derive(Debug, Clone, PartialEq)]
pub struct VlTerminal {
    pub terminal: TerminalRef,
    /// Equipment with its kind and the duplicate index of this terminal.
    pub equipment: Equipment,
    pub bus: String,
    pub connected: bool,
}

/// A bus produced by the network's own bus computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputedBus {
    /// Sequential for valid buses, negative placeholder otherwise.
    pub id: i64,
    pub valid: bool,
    pub equipment: BTreeSet<Equipment>,
}

/// Abstract network view consumed by the applier and the checker.
pub trait TopologyNetwork {
    fn voltage_level_ids(&self) -> Vec<String>;

    fn has_voltage_level(&self, id: &str) -> bool;

    fn bus_ids(&self, voltage_level: &str) -> TopoResult<Vec<String>>;

    fn switch_ids(&self, voltage_level: &str) -> TopoResult<Vec<String>>;

    /// Kind of the equipment, `None` if the network does not know the id.
    fn equipment_kind(&self, id: &str) -> Option<EquipmentKind>;

    /// Id of the line a paired dangling line belongs to.
    fn paired_line_id(&self, dangling_line_id: &str) -> Option<String>;

    /// Voltage level of every terminal of the equipment, by ascending side.
    fn terminal_voltage_levels(&self, id: &str) -> Option<Vec<String>>;

    /// Every terminal located in the voltage level.
    fn terminals(&self, voltage_level: &str) -> TopoResult<Vec<VlTerminal>>;

    fn create_bus(&mut self, voltage_level: &str, bus_id: &str) -> TopoResult<()>;

    fn remove_bus(&mut self, voltage_level: &str, bus_id: &str) -> TopoResult<()>;

    fn create_switch(
        &mut self,
        voltage_level: &str,
        switch_id: &str,
        bus1: &str,
        bus2: &str,
        open: bool,
    ) -> TopoResult<()>;

    fn remove_all_switches(&mut self, voltage_level: &str) -> TopoResult<()>;

    fn set_switch_open(
        &mut self,
        voltage_level: &str,
        switch_id: &str,
        open: bool,
    ) -> TopoResult<()>;

    fn move_terminal(&mut self, terminal: &TerminalRef, bus_id: &str) -> TopoResult<()>;

    fn connect_terminal(&mut self, terminal: &TerminalRef) -> TopoResult<()>;

    fn disconnect_terminal(&mut self, terminal: &TerminalRef) -> TopoResult<()>;

    /// Set the computed flow of the terminal to unknown.
    fn reset_flow(&mut self, terminal: &TerminalRef) -> TopoResult<()>;

    fn remove_equipment(&mut self, id: &str) -> TopoResult<()>;

    /// Merge buses through closed switches and classify the result.
    fn compute_buses(
        &self,
        voltage_level: &str,
        ids: &mut FictiveIdAllocator,
    ) -> TopoResult<Vec<ComputedBus>>;

    fn working_state(&self) -> String;

    fn clone_state(&mut self, source: &str, target: &str) -> TopoResult<()>;

    fn set_working_state(&mut self, id: &str) -> TopoResult<()>;

    fn remove_state(&mut self, id: &str) -> TopoResult<()>;
}

/// Disposable copy of the working state, active for the guard's lifetime.
///
/// ```ignore
/// let mut scratch = ScratchState::enter(&mut network, "check")?;
/// scratch.set_switch_open("VL1", "VL1_SW_0", false)?;
/// // dropped: previous working state restored, "check" removed
/// ```
pub struct ScratchState<'a, N: TopologyNetwork + ?Sized> {
    network: &'a mut N,
    previous: String,
    id: String,
}

impl<'a, N: TopologyNetwork + ?Sized> ScratchState<'a, N> {
    pub fn enter(network: &'a mut N, id: &str) -> TopoResult<Self> {
        let previous = network.working_state();
        network.clone_state(&previous, id)?;
        if let Err(err) = network.set_working_state(id) {
            let _ = network.remove_state(id);
            return Err(err);
        }
        Ok(Self {
            network,
            previous,
            id: id.to_string(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl<N: TopologyNetwork + ?Sized> Deref for ScratchState<'_, N> {
    type Target = N;

    fn deref(&self) -> &N {
        self.network
    }
}

impl<N: TopologyNetwork + ?Sized> DerefMut for ScratchState<'_, N> {
    fn deref_mut(&mut self) -> &mut N {
        self.network
    }
}

impl<N: TopologyNetwork + ?Sized> Drop for ScratchState<'_, N> {
    fn drop(&mut self) {
        if let Err(err) = self.network.set_working_state(&self.previous) {
            warn!("could not restore working state '{}': {err}", self.previous);
        }
        if let Err(err) = self.network.remove_state(&self.id) {
            warn!("could not remove scratch state '{}': {err}", self.id);
        }
    }
}
