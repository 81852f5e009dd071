//! In-memory bus/breaker network implementing [`TopologyNetwork`].
//!
//! Voltage levels own buses and switches; equipment owns terminals, each attached
//! to one bus of one voltage level. Switch positions and terminal flows are kept
//! per named state so a scratch copy can be replayed without touching the
//! working data.
//!
//! Paired dangling lines are stored as one line (the tie line) whose two terminals
//! are those of the halves; [`TopologyNetwork::paired_line_id`] maps each half to it.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::alloc::FictiveIdAllocator;
use crate::equipment::{BusCounts, Equipment, EquipmentKind};
use crate::error::{TopoError, TopoResult};
use crate::graph_utils::merge_buses;
use crate::network::{ComputedBus, TerminalRef, TopologyNetwork, VlTerminal};

/// Name of the state every network starts with.
pub const INITIAL_STATE: &str = "InitialState";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Switch {
    pub bus1: String,
    pub bus2: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoltageLevel {
    pub id: String,
    pub substation_id: String,
    pub buses: BTreeSet<String>,
    pub switches: BTreeMap<String, Switch>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Terminal {
    pub voltage_level: String,
    pub bus: String,
    #[serde(default = "connected_by_default")]
    pub connected: bool,
}

fn connected_by_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkEquipment {
    pub id: String,
    pub kind: EquipmentKind,
    /// Terminals by ascending side.
    pub terminals: Vec<Terminal>,
}

/// Mutable per-state data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkState {
    /// Switch id to open flag.
    pub switches: BTreeMap<String, bool>,
    /// Equipment id to active power per side, `None` when unknown.
    pub flows: BTreeMap<String, Vec<Option<f64>>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    pub id: String,
    pub voltage_levels: BTreeMap<String, VoltageLevel>,
    pub equipment: BTreeMap<String, NetworkEquipment>,
    /// Dangling line id to the id of the line it is paired into.
    #[serde(default)]
    pub pairings: BTreeMap<String, String>,
    #[serde(default = "Network::initial_states")]
    states: BTreeMap<String, NetworkState>,
    #[serde(default = "Network::initial_state_id")]
    working_state: String,
}

impl Network {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            voltage_levels: BTreeMap::new(),
            equipment: BTreeMap::new(),
            pairings: BTreeMap::new(),
            states: Self::initial_states(),
            working_state: Self::initial_state_id(),
        }
    }

    fn initial_states() -> BTreeMap<String, NetworkState> {
        BTreeMap::from([(INITIAL_STATE.to_string(), NetworkState::default())])
    }

    fn initial_state_id() -> String {
        INITIAL_STATE.to_string()
    }

    pub fn state_ids(&self) -> Vec<String> {
        self.states.keys().cloned().collect()
    }

    fn state(&self) -> TopoResult<&NetworkState> {
        self.states
            .get(&self.working_state)
            .ok_or_else(|| TopoError::Network(format!("state '{}' not found", self.working_state)))
    }

    fn state_mut(&mut self) -> TopoResult<&mut NetworkState> {
        let id = self.working_state.clone();
        self.states
            .get_mut(&id)
            .ok_or_else(|| TopoError::Network(format!("state '{id}' not found")))
    }

    fn voltage_level(&self, id: &str) -> TopoResult<&VoltageLevel> {
        self.voltage_levels
            .get(id)
            .ok_or_else(|| TopoError::MissingVoltageLevel { id: id.to_string() })
    }

    fn voltage_level_mut(&mut self, id: &str) -> TopoResult<&mut VoltageLevel> {
        self.voltage_levels
            .get_mut(id)
            .ok_or_else(|| TopoError::MissingVoltageLevel { id: id.to_string() })
    }

    fn terminal_mut(&mut self, terminal: &TerminalRef) -> TopoResult<&mut Terminal> {
        self.equipment
            .get_mut(&terminal.equipment_id)
            .and_then(|e| e.terminals.get_mut(usize::from(terminal.side).wrapping_sub(1)))
            .ok_or_else(|| TopoError::Network(format!("terminal {terminal} not found")))
    }

    // ------------------------------------------------------------------
    // Builders
    // ------------------------------------------------------------------

    pub fn add_voltage_level(&mut self, id: &str, substation_id: &str) -> &mut Self {
        self.voltage_levels.insert(
            id.to_string(),
            VoltageLevel {
                id: id.to_string(),
                substation_id: substation_id.to_string(),
                ..VoltageLevel::default()
            },
        );
        self
    }

    pub fn add_bus(&mut self, voltage_level: &str, bus_id: &str) -> TopoResult<&mut Self> {
        self.create_bus(voltage_level, bus_id)?;
        Ok(self)
    }

    /// Adds a single-terminal equipment (injection, busbar section, dangling line).
    pub fn add_injection(
        &mut self,
        id: &str,
        kind: EquipmentKind,
        voltage_level: &str,
        bus: &str,
    ) -> TopoResult<&mut Self> {
        self.add_equipment(id, kind, vec![(voltage_level, bus)])
    }

    pub fn add_branch(
        &mut self,
        id: &str,
        kind: EquipmentKind,
        side1: (&str, &str),
        side2: (&str, &str),
    ) -> TopoResult<&mut Self> {
        self.add_equipment(id, kind, vec![side1, side2])
    }

    pub fn add_three_windings_transformer(
        &mut self,
        id: &str,
        sides: [(&str, &str); 3],
    ) -> TopoResult<&mut Self> {
        self.add_equipment(id, EquipmentKind::ThreeWindingsTransformer, sides.to_vec())
    }

    /// Adds a line made of two paired dangling lines.
    pub fn add_tie_line(
        &mut self,
        id: &str,
        dangling_lines: (&str, &str),
        side1: (&str, &str),
        side2: (&str, &str),
    ) -> TopoResult<&mut Self> {
        self.add_equipment(id, EquipmentKind::Line, vec![side1, side2])?;
        self.pairings
            .insert(dangling_lines.0.to_string(), id.to_string());
        self.pairings
            .insert(dangling_lines.1.to_string(), id.to_string());
        Ok(self)
    }

    fn add_equipment(
        &mut self,
        id: &str,
        kind: EquipmentKind,
        sides: Vec<(&str, &str)>,
    ) -> TopoResult<&mut Self> {
        if sides.len() != kind.terminal_count() {
            return Err(TopoError::Validation(format!(
                "{id}: {kind:?} needs {} terminal(s), got {}",
                kind.terminal_count(),
                sides.len()
            )));
        }
        let mut terminals = Vec::with_capacity(sides.len());
        for (vl, bus) in sides {
            if !self.voltage_level(vl)?.buses.contains(bus) {
                return Err(TopoError::Network(format!("{id}: bus {bus} not in {vl}")));
            }
            terminals.push(Terminal {
                voltage_level: vl.to_string(),
                bus: bus.to_string(),
                connected: true,
            });
        }
        self.equipment.insert(
            id.to_string(),
            NetworkEquipment {
                id: id.to_string(),
                kind,
                terminals,
            },
        );
        Ok(self)
    }

    pub fn switch_open(&self, switch_id: &str) -> Option<bool> {
        self.state().ok()?.switches.get(switch_id).copied()
    }

    pub fn flow(&self, terminal: &TerminalRef) -> Option<f64> {
        self.state()
            .ok()?
            .flows
            .get(&terminal.equipment_id)?
            .get(usize::from(terminal.side).wrapping_sub(1))
            .copied()
            .flatten()
    }

    pub fn set_flow(&mut self, terminal: &TerminalRef, p: f64) -> TopoResult<()> {
        let sides = self
            .equipment
            .get(&terminal.equipment_id)
            .map(|e| e.terminals.len())
            .ok_or_else(|| TopoError::Network(format!("terminal {terminal} not found")))?;
        let flows = self
            .state_mut()?
            .flows
            .entry(terminal.equipment_id.clone())
            .or_insert_with(|| vec![None; sides]);
        if let Some(slot) = flows.get_mut(usize::from(terminal.side).wrapping_sub(1)) {
            *slot = Some(p);
        }
        Ok(())
    }
}

impl TopologyNetwork for Network {
    fn voltage_level_ids(&self) -> Vec<String> {
        self.voltage_levels.keys().cloned().collect()
    }

    fn has_voltage_level(&self, id: &str) -> bool {
        self.voltage_levels.contains_key(id)
    }

    fn bus_ids(&self, voltage_level: &str) -> TopoResult<Vec<String>> {
        Ok(self.voltage_level(voltage_level)?.buses.iter().cloned().collect())
    }

    fn switch_ids(&self, voltage_level: &str) -> TopoResult<Vec<String>> {
        Ok(self
            .voltage_level(voltage_level)?
            .switches
            .keys()
            .cloned()
            .collect())
    }

    fn equipment_kind(&self, id: &str) -> Option<EquipmentKind> {
        self.equipment.get(id).map(|e| e.kind)
    }

    fn paired_line_id(&self, dangling_line_id: &str) -> Option<String> {
        self.pairings.get(dangling_line_id).cloned()
    }

    fn terminal_voltage_levels(&self, id: &str) -> Option<Vec<String>> {
        self.equipment.get(id).map(|e| {
            e.terminals
                .iter()
                .map(|t| t.voltage_level.clone())
                .collect()
        })
    }

    fn terminals(&self, voltage_level: &str) -> TopoResult<Vec<VlTerminal>> {
        self.voltage_level(voltage_level)?;
        let mut terminals = Vec::new();
        for equipment in self.equipment.values() {
            let mut index = 0;
            for (side, terminal) in equipment.terminals.iter().enumerate() {
                if terminal.voltage_level != voltage_level {
                    continue;
                }
                terminals.push(VlTerminal {
                    terminal: TerminalRef::new(equipment.id.clone(), side as u8 + 1),
                    equipment: Equipment::new(equipment.id.clone())
                        .with_index(index)
                        .with_kind(equipment.kind),
                    bus: terminal.bus.clone(),
                    connected: terminal.connected,
                });
                index += 1;
            }
        }
        Ok(terminals)
    }

    fn create_bus(&mut self, voltage_level: &str, bus_id: &str) -> TopoResult<()> {
        let vl = self.voltage_level_mut(voltage_level)?;
        if !vl.buses.insert(bus_id.to_string()) {
            return Err(TopoError::Network(format!(
                "bus {bus_id} already exists in {voltage_level}"
            )));
        }
        Ok(())
    }

    fn remove_bus(&mut self, voltage_level: &str, bus_id: &str) -> TopoResult<()> {
        let attached = self.equipment.values().any(|e| {
            e.terminals
                .iter()
                .any(|t| t.voltage_level == voltage_level && t.bus == bus_id)
        });
        if attached {
            return Err(TopoError::Network(format!(
                "bus {bus_id} of {voltage_level} still has terminals"
            )));
        }
        let vl = self.voltage_level_mut(voltage_level)?;
        if vl
            .switches
            .values()
            .any(|s| s.bus1 == bus_id || s.bus2 == bus_id)
        {
            return Err(TopoError::Network(format!(
                "bus {bus_id} of {voltage_level} still has switches"
            )));
        }
        if !vl.buses.remove(bus_id) {
            return Err(TopoError::Network(format!(
                "bus {bus_id} not found in {voltage_level}"
            )));
        }
        Ok(())
    }

    fn create_switch(
        &mut self,
        voltage_level: &str,
        switch_id: &str,
        bus1: &str,
        bus2: &str,
        open: bool,
    ) -> TopoResult<()> {
        let vl = self.voltage_level_mut(voltage_level)?;
        for bus in [bus1, bus2] {
            if !vl.buses.contains(bus) {
                return Err(TopoError::Network(format!(
                    "switch {switch_id}: bus {bus} not in {voltage_level}"
                )));
            }
        }
        if vl.switches.contains_key(switch_id) {
            return Err(TopoError::Network(format!(
                "switch {switch_id} already exists in {voltage_level}"
            )));
        }
        vl.switches.insert(
            switch_id.to_string(),
            Switch {
                bus1: bus1.to_string(),
                bus2: bus2.to_string(),
            },
        );
        for state in self.states.values_mut() {
            state.switches.insert(switch_id.to_string(), open);
        }
        Ok(())
    }

    fn remove_all_switches(&mut self, voltage_level: &str) -> TopoResult<()> {
        let removed: Vec<String> = std::mem::take(&mut self.voltage_level_mut(voltage_level)?.switches)
            .into_keys()
            .collect();
        for state in self.states.values_mut() {
            for id in &removed {
                state.switches.remove(id);
            }
        }
        Ok(())
    }

    fn set_switch_open(
        &mut self,
        voltage_level: &str,
        switch_id: &str,
        open: bool,
    ) -> TopoResult<()> {
        if !self.voltage_level(voltage_level)?.switches.contains_key(switch_id) {
            return Err(TopoError::Network(format!(
                "switch {switch_id} not found in {voltage_level}"
            )));
        }
        self.state_mut()?
            .switches
            .insert(switch_id.to_string(), open);
        Ok(())
    }

    fn move_terminal(&mut self, terminal: &TerminalRef, bus_id: &str) -> TopoResult<()> {
        let vl = self.terminal_mut(terminal)?.voltage_level.clone();
        if !self.voltage_level(&vl)?.buses.contains(bus_id) {
            return Err(TopoError::Network(format!("bus {bus_id} not in {vl}")));
        }
        self.terminal_mut(terminal)?.bus = bus_id.to_string();
        Ok(())
    }

    fn connect_terminal(&mut self, terminal: &TerminalRef) -> TopoResult<()> {
        self.terminal_mut(terminal)?.connected = true;
        Ok(())
    }

    fn disconnect_terminal(&mut self, terminal: &TerminalRef) -> TopoResult<()> {
        self.terminal_mut(terminal)?.connected = false;
        Ok(())
    }

    fn reset_flow(&mut self, terminal: &TerminalRef) -> TopoResult<()> {
        self.terminal_mut(terminal)?;
        let side = usize::from(terminal.side).wrapping_sub(1);
        let state = self.state_mut()?;
        if let Some(slot) = state
            .flows
            .get_mut(&terminal.equipment_id)
            .and_then(|flows| flows.get_mut(side))
        {
            *slot = None;
        }
        Ok(())
    }

    fn remove_equipment(&mut self, id: &str) -> TopoResult<()> {
        if self.equipment.remove(id).is_none() {
            return Err(TopoError::Network(format!("equipment {id} not found")));
        }
        for state in self.states.values_mut() {
            state.flows.remove(id);
        }
        self.pairings.retain(|_, line| line != id);
        Ok(())
    }

    fn compute_buses(
        &self,
        voltage_level: &str,
        ids: &mut FictiveIdAllocator,
    ) -> TopoResult<Vec<ComputedBus>> {
        let vl = self.voltage_level(voltage_level)?;
        let state = self.state()?;
        let bus_ids: Vec<String> = vl.buses.iter().cloned().collect();
        let closed = vl
            .switches
            .iter()
            .filter(|(id, _)| !state.switches.get(*id).copied().unwrap_or(false))
            .map(|(_, s)| (s.bus1.as_str(), s.bus2.as_str()));
        let merged = merge_buses(&bus_ids, closed);

        let terminals = self.terminals(voltage_level)?;
        let mut computed = Vec::with_capacity(merged.len());
        let mut next_valid = 0;
        for group in merged {
            let equipment: BTreeSet<Equipment> = terminals
                .iter()
                .filter(|t| t.connected && group.members.contains(&t.bus))
                .map(|t| t.equipment.clone())
                .collect();
            let valid = BusCounts::of(equipment.iter().filter_map(|e| e.kind)).is_valid();
            let id = if valid {
                next_valid += 1;
                next_valid - 1
            } else {
                ids.next_id()
            };
            computed.push(ComputedBus {
                id,
                valid,
                equipment,
            });
        }
        Ok(computed)
    }

    fn working_state(&self) -> String {
        self.working_state.clone()
    }

    fn clone_state(&mut self, source: &str, target: &str) -> TopoResult<()> {
        if self.states.contains_key(target) {
            return Err(TopoError::Network(format!("state '{target}' already exists")));
        }
        let copy = self
            .states
            .get(source)
            .cloned()
            .ok_or_else(|| TopoError::Network(format!("state '{source}' not found")))?;
        self.states.insert(target.to_string(), copy);
        Ok(())
    }

    fn set_working_state(&mut self, id: &str) -> TopoResult<()> {
        if !self.states.contains_key(id) {
            return Err(TopoError::Network(format!("state '{id}' not found")));
        }
        self.working_state = id.to_string();
        Ok(())
    }

    fn remove_state(&mut self, id: &str) -> TopoResult<()> {
        if id == INITIAL_STATE {
            return Err(TopoError::Network("the initial state cannot be removed".into()));
        }
        if self.working_state == id {
            return Err(TopoError::Network(format!("state '{id}' is the working state")));
        }
        self.states
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| TopoError::Network(format!("state '{id}' not found")))
    }
}
