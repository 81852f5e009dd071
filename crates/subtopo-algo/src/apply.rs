//! Unique topology applier.
//!
//! For every voltage level of the unique topology, in id order:
//!
//! 1. create one bus per canonical bus (`{vl}_TOPO_{n}`)
//! 2. move each terminal to the bus of its equipment, matched by id and
//!    duplicate index, reconnect it and reset its flow
//! 3. remove equipment held by no canonical bus of any substation (three windings
//!    transformers cannot be removed and abort the run). A terminal without a
//!    canonical bus whose equipment is held elsewhere, on another voltage level or
//!    under another duplicate index, is disconnected and parked on
//!    `{vl}_DISCONNECTED`
//! 4. remove the former switches and buses
//! 5. create the derived switches, all open

use std::collections::BTreeSet;

use serde::Serialize;
use subtopo_core::{
    DiagnosticIssue, Diagnostics, EquipmentKind, Stage, TopoError, TopoResult, TopologyNetwork,
    UniqueSubstation, UniqueTopology,
};
use tracing::{debug, info};

#[derive(Debug, Clone, Default, Serialize)]
pub struct ApplyReport {
    pub voltage_levels: usize,
    pub buses_created: usize,
    pub switches_created: usize,
    pub terminals_moved: usize,
    pub terminals_disconnected: usize,
    pub removed_equipment: Vec<String>,
    /// One warning per removed equipment or disconnected terminal
    pub diagnostics: Diagnostics,
}

pub fn apply_unique_topology<N: TopologyNetwork + ?Sized>(
    network: &mut N,
    unique: &UniqueTopology,
) -> TopoResult<ApplyReport> {
    let mut report = ApplyReport::default();
    for substation in unique.substations.values() {
        apply_substation(network, unique, substation, &mut report)?;
        report.voltage_levels += 1;
    }
    info!(
        "Unique topology applied to {} voltage level(s): {} bus(es), {} switch(es), {} equipment removed",
        report.voltage_levels,
        report.buses_created,
        report.switches_created,
        report.removed_equipment.len()
    );
    if !report.removed_equipment.is_empty() {
        debug!("Removed equipment: {}", report.removed_equipment.join(", "));
    }
    Ok(report)
}

fn apply_substation<N: TopologyNetwork + ?Sized>(
    network: &mut N,
    unique: &UniqueTopology,
    substation: &UniqueSubstation,
    report: &mut ApplyReport,
) -> TopoResult<()> {
    let vl = substation.id.as_str();
    if !network.has_voltage_level(vl) {
        return Err(TopoError::MissingVoltageLevel { id: vl.to_string() });
    }
    let former_buses = network.bus_ids(vl)?;

    for bus in &substation.buses {
        network.create_bus(vl, &UniqueSubstation::bus_id(vl, bus.num))?;
        report.buses_created += 1;
    }

    let mut absent = BTreeSet::new();
    let mut unmatched = Vec::new();
    for terminal in network.terminals(vl)? {
        match substation.bus_of(&terminal.equipment) {
            Some(num) => {
                network.move_terminal(&terminal.terminal, &UniqueSubstation::bus_id(vl, num))?;
                if !terminal.connected {
                    network.connect_terminal(&terminal.terminal)?;
                }
                network.reset_flow(&terminal.terminal)?;
                report.terminals_moved += 1;
            }
            None if unique.contains_id(&terminal.equipment.id) => unmatched.push(terminal),
            None => {
                absent.insert(terminal.equipment.id.clone());
            }
        }
    }

    for id in absent {
        if network.equipment_kind(&id) == Some(EquipmentKind::ThreeWindingsTransformer) {
            return Err(TopoError::UnsupportedThreeWindingsTransformer { id });
        }
        network.remove_equipment(&id)?;
        report.diagnostics.add(
            DiagnosticIssue::warning(Stage::Apply, "equipment on no canonical bus removed")
                .at(format!("{id} in {vl}")),
        );
        report.removed_equipment.push(id);
    }

    if !unmatched.is_empty() {
        let parking = UniqueSubstation::disconnected_bus_id(vl);
        network.create_bus(vl, &parking)?;
        for terminal in unmatched {
            network.move_terminal(&terminal.terminal, &parking)?;
            network.disconnect_terminal(&terminal.terminal)?;
            network.reset_flow(&terminal.terminal)?;
            report.terminals_disconnected += 1;
            report.diagnostics.add(
                DiagnosticIssue::warning(Stage::Apply, "terminal on no canonical bus disconnected")
                    .at(format!("{} in {vl}", terminal.equipment)),
            );
        }
    }

    network.remove_all_switches(vl)?;
    for bus in former_buses {
        network.remove_bus(vl, &bus)?;
    }

    for switch in &substation.switches {
        network.create_switch(
            vl,
            &switch.id,
            &UniqueSubstation::bus_id(vl, switch.bus1),
            &UniqueSubstation::bus_id(vl, switch.bus2),
            true,
        )?;
        report.switches_created += 1;
    }
    Ok(())
}
