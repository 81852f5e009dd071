//! Equipment identity and kinds.
//!
//! An [`Equipment`] is identified by its id and a duplicate index. The index
//! separates the two ends of a branch that is folded back on the same bus or
//! substation: the first end is index 0, the second index 1. The kind is resolved
//! against the reference network and does not take part in equality.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// Kind of a network equipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EquipmentKind {
    Line,
    TwoWindingsTransformer,
    ThreeWindingsTransformer,
    DanglingLine,
    Load,
    Generator,
    ShuntCompensator,
    BusbarSection,
}

impl EquipmentKind {
    /// Branches connect two (or three) terminals.
    pub fn is_branch(self) -> bool {
        match self {
            EquipmentKind::Line
            | EquipmentKind::TwoWindingsTransformer
            | EquipmentKind::ThreeWindingsTransformer
            | EquipmentKind::DanglingLine => true,
            EquipmentKind::Load
            | EquipmentKind::Generator
            | EquipmentKind::ShuntCompensator
            | EquipmentKind::BusbarSection => false,
        }
    }

    pub fn is_injection(self) -> bool {
        match self {
            EquipmentKind::Load | EquipmentKind::Generator | EquipmentKind::ShuntCompensator => {
                true
            }
            EquipmentKind::Line
            | EquipmentKind::TwoWindingsTransformer
            | EquipmentKind::ThreeWindingsTransformer
            | EquipmentKind::DanglingLine
            | EquipmentKind::BusbarSection => false,
        }
    }

    /// Whether the equipment counts as a feeder of the bus it is connected to.
    pub fn is_feeder(self) -> bool {
        match self {
            EquipmentKind::BusbarSection => false,
            _ => true,
        }
    }

    /// Number of terminals of the equipment in the network.
    pub fn terminal_count(self) -> usize {
        match self {
            EquipmentKind::Line | EquipmentKind::TwoWindingsTransformer => 2,
            EquipmentKind::ThreeWindingsTransformer => 3,
            EquipmentKind::DanglingLine
            | EquipmentKind::Load
            | EquipmentKind::Generator
            | EquipmentKind::ShuntCompensator
            | EquipmentKind::BusbarSection => 1,
        }
    }

    /// Branch with two sides in (possibly) different substations.
    pub fn is_two_sided_branch(self) -> bool {
        self.terminal_count() == 2
    }
}

/// Feeder and branch counters of a bus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusCounts {
    pub feeders: usize,
    pub branches: usize,
}

impl BusCounts {
    pub fn of<I: IntoIterator<Item = EquipmentKind>>(kinds: I) -> Self {
        let mut counts = BusCounts::default();
        for kind in kinds {
            if kind.is_feeder() {
                counts.feeders += 1;
            }
            if kind.is_branch() {
                counts.branches += 1;
            }
        }
        counts
    }

    /// A bus is kept by the bus computation only with at least one feeder and one branch.
    pub fn is_valid(&self) -> bool {
        self.feeders >= 1 && self.branches >= 1
    }
}

/// Equipment recorded in a historical bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Equipment {
    pub id: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<EquipmentKind>,
}

fn is_zero(value: &u32) -> bool {
    *value == 0
}

impl Equipment {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            index: 0,
            kind: None,
        }
    }

    pub fn with_index(mut self, index: u32) -> Self {
        self.index = index;
        self
    }

    pub fn with_kind(mut self, kind: EquipmentKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn is_branch(&self) -> bool {
        self.kind.is_some_and(EquipmentKind::is_branch)
    }

    pub fn is_load(&self) -> bool {
        self.kind == Some(EquipmentKind::Load)
    }

    /// Same equipment as `self` with a different duplicate index.
    pub fn sibling(&self, index: u32) -> Self {
        Self {
            id: self.id.clone(),
            index,
            kind: self.kind,
        }
    }
}

impl PartialEq for Equipment {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.index == other.index
    }
}

impl Eq for Equipment {}

impl Hash for Equipment {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.index.hash(state);
    }
}

impl PartialOrd for Equipment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Equipment {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id
            .cmp(&other.id)
            .then_with(|| self.index.cmp(&other.index))
    }
}

impl std::fmt::Display for Equipment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.index == 0 {
            write!(f, "{}", self.id)
        } else {
            write!(f, "{}#{}", self.id, self.index)
        }
    }
}
