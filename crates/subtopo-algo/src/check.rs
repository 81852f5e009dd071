//! Consistency checker.
//!
//! Replays every possible topology on a scratch copy of the network state: the
//! recorded switch pattern is applied to each voltage level, the network computes
//! its buses, and the valid ones must match the valid buses of the snapshot. The
//! working state is restored whatever the outcome.

use std::collections::BTreeSet;

use serde::Serialize;
use subtopo_core::{
    DiagnosticIssue, Diagnostics, Equipment, FictiveIdAllocator, ScratchState, ShortIdDictionary,
    Stage, Substation, TopoError, TopoResult, TopologyHistory, TopologyNetwork,
};
use tracing::{info, warn};

use crate::config::CheckConfig;

#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckReport {
    pub topologies: usize,
    pub voltage_levels: usize,
    pub mismatches: usize,
    pub diagnostics: Diagnostics,
}

impl CheckReport {
    pub fn passed(&self) -> bool {
        self.mismatches == 0
    }
}

type Partition = BTreeSet<BTreeSet<Equipment>>;

/// Replays the history and fails on the first structural error or on any mismatch.
pub fn check_topology<N: TopologyNetwork + ?Sized>(
    network: &mut N,
    history: &TopologyHistory,
    config: &CheckConfig,
    short_ids: Option<&ShortIdDictionary>,
) -> TopoResult<CheckReport> {
    let report = replay_history(network, history, config, short_ids)?;
    if !report.passed() {
        return Err(TopoError::CheckFailed {
            mismatches: report.mismatches,
        });
    }
    Ok(report)
}

/// Replays the history and reports mismatches without failing on them.
pub fn replay_history<N: TopologyNetwork + ?Sized>(
    network: &mut N,
    history: &TopologyHistory,
    config: &CheckConfig,
    short_ids: Option<&ShortIdDictionary>,
) -> TopoResult<CheckReport> {
    let mut scratch = ScratchState::enter(network, &config.scratch_state_id)?;
    let mut ids = FictiveIdAllocator::new();
    let mut report = CheckReport::default();

    for topology in history.possible_topologies() {
        report.topologies += 1;
        for substation in topology.meta_substation.substations.iter().filter(|s| !s.fictive) {
            let vl = substation.id.as_str();
            if !scratch.has_voltage_level(vl) {
                return Err(TopoError::MissingVoltageLevel { id: vl.to_string() });
            }
            for (switch, open) in &substation.switches {
                scratch.set_switch_open(vl, switch, *open)?;
            }
            report.voltage_levels += 1;

            let actual: Partition = scratch
                .compute_buses(vl, &mut ids)?
                .into_iter()
                .filter(|b| b.valid)
                .map(|b| b.equipment)
                .collect();
            let expected = expected_partition(substation);
            if actual != expected {
                report.mismatches += 1;
                let issue = DiagnosticIssue::error(Stage::Check, "bus partition differs")
                    .at(format!("{} in topology {}", vl, topology.topo_hash))
                    .with_detail(format!(
                        "expected: {}\nactual:   {}",
                        render(&expected, short_ids),
                        render(&actual, short_ids)
                    ));
                warn!("{issue}");
                report.diagnostics.add(issue);
            }
        }
    }

    info!(
        "Checked {} possible topologies over {} voltage level snapshot(s): {} mismatch(es)",
        report.topologies, report.voltage_levels, report.mismatches
    );
    Ok(report)
}

fn expected_partition(substation: &Substation) -> Partition {
    substation
        .valid_buses()
        .map(|b| b.equipment.iter().cloned().collect())
        .collect()
}

fn render(partition: &Partition, short_ids: Option<&ShortIdDictionary>) -> String {
    let buses: Vec<String> = partition
        .iter()
        .map(|bus| {
            let names: Vec<String> = bus
                .iter()
                .map(|e| match short_ids {
                    Some(dict) => dict.display(e).to_string(),
                    None => e.to_string(),
                })
                .collect();
            format!("[{}]", names.join(", "))
        })
        .collect();
    buses.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{bus, choice, history, substation, topology};
    use subtopo_core::{Bus, EquipmentKind, Network, PossibleTopology, INITIAL_STATE};

    /// VL1 with two buses joined by one switch.
    fn network() -> Network {
        let mut n = Network::new("test");
        n.add_voltage_level("VL1", "S1").add_voltage_level("VL2", "S2");
        n.add_bus("VL1", "B0").unwrap().add_bus("VL1", "B1").unwrap();
        n.add_bus("VL2", "X").unwrap();
        n.add_branch("L1", EquipmentKind::Line, ("VL1", "B0"), ("VL2", "X"))
            .unwrap();
        n.add_branch("L2", EquipmentKind::Line, ("VL1", "B1"), ("VL2", "X"))
            .unwrap();
        n.add_injection("LOAD1", EquipmentKind::Load, "VL1", "B0")
            .unwrap();
        n.create_switch("VL1", "VL1_SW_0", "B0", "B1", true).unwrap();
        n
    }

    fn snapshot(hash: &str, buses: Vec<Bus>, open: bool) -> PossibleTopology {
        let mut s = substation("VL1", buses);
        s.switches.insert("VL1_SW_0".into(), open);
        topology(hash, 0.5, vec![s])
    }

    #[test]
    fn test_matching_history_passes_and_restores_state() {
        let mut n = network();
        let h = history(vec![choice(
            0,
            vec![
                snapshot("split", vec![bus(&["L1", "LOAD1"]), bus(&["L2"])], true),
                snapshot("merged", vec![bus(&["L1", "LOAD1", "L2"])], false),
            ],
        )]);
        let report = check_topology(&mut n, &h, &CheckConfig::default(), None).unwrap();
        assert!(report.passed());
        assert_eq!(report.topologies, 2);
        assert_eq!(n.working_state(), INITIAL_STATE);
        assert_eq!(n.state_ids(), vec![INITIAL_STATE.to_string()]);
        assert_eq!(n.switch_open("VL1_SW_0"), Some(true));
    }

    #[test]
    fn test_mismatch_fails_and_still_restores_state() {
        let mut n = network();
        // claims L2 joins L1 while the switch stays open
        let h = history(vec![choice(
            0,
            vec![snapshot("wrong", vec![bus(&["L1", "LOAD1", "L2"])], true)],
        )]);
        let report = replay_history(&mut n, &h, &CheckConfig::default(), None).unwrap();
        assert_eq!(report.mismatches, 1);
        assert!(report.diagnostics.has_errors());

        let err = check_topology(&mut n, &h, &CheckConfig::default(), None).unwrap_err();
        assert!(matches!(err, TopoError::CheckFailed { mismatches: 1 }));
        assert_eq!(n.working_state(), INITIAL_STATE);
        assert_eq!(n.state_ids().len(), 1);
    }

    #[test]
    fn test_missing_voltage_level_is_fatal() {
        let mut n = network();
        let h = history(vec![choice(
            0,
            vec![topology("a", 1.0, vec![substation("VL7", vec![bus(&["L1"])])])],
        )]);
        let err = check_topology(&mut n, &h, &CheckConfig::default(), None).unwrap_err();
        assert!(matches!(err, TopoError::MissingVoltageLevel { .. }));
        assert_eq!(n.state_ids().len(), 1);
    }
}
