//! A reading of the host's clocks: combat turn order and world time.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::CombatId;

/// Which clock drives an affliction's save windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimingMode {
    Combat,
    WorldTime,
}

impl fmt::Display for TimingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimingMode::Combat => f.write_str("combat"),
            TimingMode::WorldTime => f.write_str("world time"),
        }
    }
}

/// Snapshot of the table's time at the moment an operation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableTime {
    pub combat_id: Option<CombatId>,
    /// Current combat round (meaningless out of combat)
    pub round: u32,
    /// Initiative of the combatant whose turn it is
    pub initiative: Option<i32>,
    /// World clock, in seconds
    pub world_time: i64,
}

impl TableTime {
    pub fn out_of_combat(world_time: i64) -> Self {
        Self {
            combat_id: None,
            round: 0,
            initiative: None,
            world_time,
        }
    }

    pub fn in_combat(combat_id: CombatId, round: u32, initiative: Option<i32>, world_time: i64) -> Self {
        Self {
            combat_id: Some(combat_id),
            round,
            initiative,
            world_time,
        }
    }

    pub fn is_in_combat(&self) -> bool {
        self.combat_id.is_some()
    }

    pub fn mode(&self) -> TimingMode {
        if self.is_in_combat() {
            TimingMode::Combat
        } else {
            TimingMode::WorldTime
        }
    }
}
