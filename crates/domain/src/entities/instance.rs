//! Active affliction records.
//!
//! An `AfflictionInstance` tracks one affliction on one target: which stage it
//! is at, the onset countdown, when the next save is due, and the treatment and
//! virulence bookkeeping. Instances are owned by their target's record and only
//! mutated by the lifecycle engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::{AfflictionDefinition, StageDefinition};
use crate::error::DomainError;
use crate::ids::{CombatId, InstanceId, TargetId};
use crate::value_objects::{seconds_to_rounds, TableTime, TimingMode, ROUND_SECONDS};

/// `current_stage` while the initial save is outstanding.
pub const AWAITING_INITIAL_SAVE: i32 = -1;

/// When the next stage save is due.
///
/// Exactly one clock is authoritative per save window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum NextSave {
    Combat {
        round: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        initiative: Option<i32>,
    },
    WorldTime { timestamp: i64 },
}

impl NextSave {
    /// Save window that opens `seconds` from now, on whichever clock is live.
    pub fn after(seconds: i64, now: &TableTime, initiative: Option<i32>) -> Self {
        if now.is_in_combat() {
            let rounds = seconds_to_rounds(seconds).max(1);
            NextSave::Combat {
                round: now.round.saturating_add(rounds as u32),
                initiative,
            }
        } else {
            NextSave::WorldTime {
                timestamp: now.world_time + seconds.max(0),
            }
        }
    }

    pub fn mode(&self) -> TimingMode {
        match self {
            NextSave::Combat { .. } => TimingMode::Combat,
            NextSave::WorldTime { .. } => TimingMode::WorldTime,
        }
    }

    /// Whether the save is due at `now`.
    ///
    /// A combat window only comes due during combat; it is migrated to world
    /// time before being checked outside of it.
    pub fn is_due(&self, now: &TableTime) -> bool {
        match *self {
            NextSave::Combat { round, initiative } => {
                if !now.is_in_combat() {
                    return false;
                }
                if now.round != round {
                    return now.round > round;
                }
                // Turn order counts down: the save triggers once the turn
                // reaches the affliction's initiative slot.
                match (now.initiative, initiative) {
                    (Some(current), Some(slot)) => current <= slot,
                    _ => true,
                }
            }
            NextSave::WorldTime { timestamp } => now.world_time >= timestamp,
        }
    }
}

/// Where an instance is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagePhase {
    AwaitingInitialSave,
    Onset,
    Staged(u32),
    /// Stage 0 outside onset: the affliction no longer has a hold
    NotAfflicted,
}

/// Result of applying a stage delta to the current stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageTarget {
    pub stage: u32,
    /// Requested stage before clamping
    pub requested: i32,
    /// The request went past the last stage and was clamped down
    pub clamped_high: bool,
}

impl StageTarget {
    pub fn recovered(&self) -> bool {
        self.stage == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AfflictionInstance {
    pub id: InstanceId,
    pub target_id: TargetId,
    /// Frozen copy of the (possibly overridden) definition
    pub definition: AfflictionDefinition,
    /// -1 awaiting initial save, 0 onset / not afflicted, 1..N staged
    pub current_stage: i32,
    #[serde(default)]
    pub in_onset: bool,
    #[serde(default)]
    pub onset_remaining_seconds: i64,
    /// Stage to enter when onset ends (2 after a critical failure)
    #[serde(default = "default_advancement")]
    pub stage_advancement: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_save: Option<NextSave>,
    /// A due notice was already sent for the current save window
    #[serde(default)]
    pub save_due_notified: bool,
    #[serde(default)]
    pub duration_elapsed_seconds: i64,
    #[serde(default)]
    pub max_duration_elapsed_seconds: i64,
    #[serde(default)]
    pub max_duration_expired: bool,
    #[serde(default)]
    pub treatment_bonus: i32,
    #[serde(default)]
    pub treated_this_stage: bool,
    #[serde(default)]
    pub virulent_consecutive_successes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_effect_handle: Option<String>,
    #[serde(default)]
    pub cleansed_once: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combat_id_at_creation: Option<CombatId>,
    /// Initiative slot the affliction was applied on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_initiative: Option<i32>,
    /// Combat round the current stage began (multiple exposure resets it)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_started_round: Option<u32>,
    /// World time the current stage began
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_started_at: Option<i64>,
    /// Last combat round seen by a tick, used when combat ends mid-window
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen_round: Option<u32>,
}

fn default_advancement() -> u32 {
    1
}

impl AfflictionInstance {
    /// A fresh instance waiting for the target's initial save.
    pub fn awaiting_initial_save(
        target_id: TargetId,
        definition: AfflictionDefinition,
        created_at: DateTime<Utc>,
        now: &TableTime,
    ) -> Self {
        Self {
            id: InstanceId::new(),
            target_id,
            definition,
            current_stage: AWAITING_INITIAL_SAVE,
            in_onset: false,
            onset_remaining_seconds: 0,
            stage_advancement: 1,
            next_save: None,
            save_due_notified: false,
            duration_elapsed_seconds: 0,
            max_duration_elapsed_seconds: 0,
            max_duration_expired: false,
            treatment_bonus: 0,
            treated_this_stage: false,
            virulent_consecutive_successes: 0,
            applied_effect_handle: None,
            cleansed_once: false,
            created_at,
            combat_id_at_creation: now.combat_id,
            applied_initiative: now.initiative,
            stage_started_round: None,
            stage_started_at: None,
            last_seen_round: None,
        }
    }

    pub fn with_id(mut self, id: InstanceId) -> Self {
        self.id = id;
        self
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn phase(&self) -> StagePhase {
        if self.current_stage < 0 {
            StagePhase::AwaitingInitialSave
        } else if self.in_onset {
            StagePhase::Onset
        } else if self.current_stage == 0 {
            StagePhase::NotAfflicted
        } else {
            StagePhase::Staged(self.current_stage as u32)
        }
    }

    /// Past the initial save and still affecting the target.
    pub fn is_active(&self) -> bool {
        matches!(self.phase(), StagePhase::Onset | StagePhase::Staged(_))
    }

    pub fn stage_count(&self) -> u32 {
        self.definition.stage_count()
    }

    pub fn current_stage_number(&self) -> Option<u32> {
        match self.phase() {
            StagePhase::Staged(n) => Some(n),
            _ => None,
        }
    }

    pub fn current_stage_definition(&self) -> Option<&StageDefinition> {
        self.current_stage_number()
            .and_then(|n| self.definition.stage(n))
    }

    pub fn start_onset(&mut self, onset_seconds: i64, advancement: u32) {
        self.current_stage = 0;
        self.in_onset = true;
        self.onset_remaining_seconds = onset_seconds.max(0);
        self.stage_advancement = advancement.max(1);
        self.next_save = None;
    }

    /// Count down onset. Returns the stage to enter once it has elapsed.
    pub fn advance_onset(&mut self, elapsed_seconds: i64) -> Option<u32> {
        if !self.in_onset {
            return None;
        }
        self.onset_remaining_seconds -= elapsed_seconds.max(0);
        if self.onset_remaining_seconds > 0 {
            return None;
        }
        self.in_onset = false;
        self.onset_remaining_seconds = 0;
        let stage = self.stage_advancement.min(self.stage_count()).max(1);
        self.stage_advancement = 1;
        Some(stage)
    }

    /// Apply a stage delta, clamped to `[floor, stage_count]`.
    pub fn plan_stage_change(&self, delta: i32, floor: u32) -> StageTarget {
        let current = self.current_stage.max(0);
        let requested = current + delta;
        let count = self.stage_count() as i32;
        let clamped_high = requested > count;
        let stage = requested.clamp(floor as i32, count.max(floor as i32));
        StageTarget {
            stage: stage as u32,
            requested,
            clamped_high,
        }
    }

    /// Move to a new stage and reset everything tied to the old one.
    pub fn enter_stage(&mut self, stage: u32, now: &TableTime) {
        self.current_stage = stage as i32;
        self.in_onset = false;
        self.onset_remaining_seconds = 0;
        self.duration_elapsed_seconds = 0;
        self.treatment_bonus = 0;
        self.treated_this_stage = false;
        self.next_save = None;
        self.save_due_notified = false;
        self.restart_stage(now);
    }

    /// Count the current stage as starting `now` without leaving it.
    pub fn restart_stage(&mut self, now: &TableTime) {
        self.stage_started_at = Some(now.world_time);
        self.stage_started_round = now.is_in_combat().then_some(now.round);
    }

    pub fn schedule_next_save(&mut self, next: NextSave) {
        self.next_save = Some(next);
        self.save_due_notified = false;
    }

    /// Mark the current window as announced. Returns false if it already was.
    pub fn mark_save_due_notified(&mut self) -> bool {
        !std::mem::replace(&mut self.save_due_notified, true)
    }

    /// Accumulate elapsed time. Returns true the one time the maximum
    /// duration is crossed.
    pub fn record_elapsed(&mut self, elapsed_seconds: i64, max_duration_seconds: Option<i64>) -> bool {
        if self.in_onset || self.current_stage <= 0 || elapsed_seconds <= 0 {
            return false;
        }
        self.duration_elapsed_seconds += elapsed_seconds;
        if self.max_duration_expired {
            return false;
        }
        let Some(max_seconds) = max_duration_seconds else {
            return false;
        };
        self.max_duration_elapsed_seconds += elapsed_seconds;
        if self.max_duration_elapsed_seconds >= max_seconds {
            self.max_duration_expired = true;
            return true;
        }
        false
    }

    /// Stop tracking after the GM accepts max-duration expiry.
    pub fn accept_expiry(&mut self) {
        self.max_duration_expired = true;
        self.next_save = None;
    }

    pub fn apply_treatment(&mut self, bonus: i32) -> Result<(), DomainError> {
        if self.treated_this_stage {
            return Err(DomainError::constraint(format!(
                "{} was already treated at stage {}",
                self.definition.name, self.current_stage
            )));
        }
        self.treatment_bonus = bonus;
        self.treated_this_stage = true;
        Ok(())
    }

    /// Claim the one-time cleanse. Returns the stage to drop to.
    pub fn claim_cleanse(&mut self) -> Result<u32, DomainError> {
        if self.cleansed_once {
            return Err(DomainError::constraint(format!(
                "{} has already been cleansed once",
                self.definition.name
            )));
        }
        let Some(stage) = self.current_stage_number() else {
            return Err(DomainError::invalid_state_transition(
                "only a staged affliction can be cleansed",
            ));
        };
        self.cleansed_once = true;
        Ok(stage.saturating_sub(1).max(1))
    }

    /// Bring a save window onto the live clock.
    ///
    /// World time → combat converts the remaining seconds to rounds. Combat →
    /// world time converts the rounds left after the last observed round back to
    /// seconds. Returns whether anything changed.
    pub fn migrate_next_save(&mut self, now: &TableTime) -> bool {
        let Some(next) = self.next_save else {
            return false;
        };
        match (next, now.is_in_combat()) {
            (NextSave::WorldTime { timestamp }, true) => {
                let remaining = (timestamp - now.world_time).max(0);
                self.next_save = Some(NextSave::Combat {
                    round: now.round.saturating_add(seconds_to_rounds(remaining) as u32),
                    initiative: self.applied_initiative,
                });
                true
            }
            (NextSave::Combat { round, .. }, false) => {
                let seen = self.last_seen_round.unwrap_or(round);
                let remaining_rounds = round.saturating_sub(seen) as i64;
                self.next_save = Some(NextSave::WorldTime {
                    timestamp: now.world_time + remaining_rounds * ROUND_SECONDS,
                });
                self.last_seen_round = None;
                true
            }
            _ => false,
        }
    }

    pub fn is_save_due(&self, now: &TableTime) -> bool {
        !self.max_duration_expired
            && self.current_stage > 0
            && !self.in_onset
            && self.next_save.is_some_and(|next| next.is_due(now))
    }
}
