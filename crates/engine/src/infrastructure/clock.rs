//! Clock and random implementations.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use afflictor_domain::{CombatId, TableTime, TargetId, TimingMode, ROUND_SECONDS};

use crate::infrastructure::ports::{ClockPort, RandomPort, TableClockPort};

/// System clock - uses real time.
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockPort for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// System random - uses real randomness.
pub struct SystemRandom;

impl SystemRandom {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomPort for SystemRandom {
    fn gen_range(&self, min: i32, max: i32) -> i32 {
        use rand::Rng;
        rand::thread_rng().gen_range(min..=max)
    }
}

#[derive(Debug, Default)]
struct TableState {
    combat_id: Option<CombatId>,
    round: u32,
    initiative: Option<i32>,
    world_time: i64,
    initiatives: HashMap<TargetId, i32>,
    last_tick_round: u32,
    last_tick_world: i64,
}

/// Table clock driven explicitly by its owner.
///
/// Stands in for the host's combat tracker and world clock. Advancing a combat
/// round also advances world time by one round.
pub struct ManualTableClock {
    state: RwLock<TableState>,
}

impl ManualTableClock {
    pub fn new(world_time: i64) -> Self {
        Self {
            state: RwLock::new(TableState {
                world_time,
                last_tick_world: world_time,
                ..TableState::default()
            }),
        }
    }

    pub async fn start_combat(&self, combat_id: CombatId) {
        let mut state = self.state.write().await;
        state.combat_id = Some(combat_id);
        state.round = 1;
        state.initiative = None;
        state.last_tick_round = 1;
        tracing::debug!(%combat_id, "Combat started");
    }

    pub async fn end_combat(&self) {
        let mut state = self.state.write().await;
        state.combat_id = None;
        state.initiative = None;
        state.initiatives.clear();
        state.last_tick_world = state.world_time;
    }

    pub async fn set_initiative(&self, target_id: TargetId, initiative: i32) {
        self.state.write().await.initiatives.insert(target_id, initiative);
    }

    /// Move the turn marker to a combatant's initiative within the round.
    pub async fn set_turn(&self, initiative: Option<i32>) {
        self.state.write().await.initiative = initiative;
    }

    pub async fn next_round(&self) {
        let mut state = self.state.write().await;
        state.round += 1;
        state.world_time += ROUND_SECONDS;
        state.initiative = None;
    }

    pub async fn advance_world(&self, seconds: i64) {
        self.state.write().await.world_time += seconds.max(0);
    }
}

impl Default for ManualTableClock {
    fn default() -> Self {
        Self::new(0)
    }
}

#[async_trait]
impl TableClockPort for ManualTableClock {
    async fn current(&self) -> TableTime {
        let state = self.state.read().await;
        match state.combat_id {
            Some(combat_id) => {
                TableTime::in_combat(combat_id, state.round, state.initiative, state.world_time)
            }
            None => TableTime::out_of_combat(state.world_time),
        }
    }

    async fn initiative_of(&self, target_id: TargetId) -> Option<i32> {
        self.state.read().await.initiatives.get(&target_id).copied()
    }

    async fn elapsed_since_last_tick(&self, mode: TimingMode) -> i64 {
        let mut state = self.state.write().await;
        let elapsed = match mode {
            TimingMode::Combat => {
                let rounds = state.round.saturating_sub(state.last_tick_round);
                rounds as i64 * ROUND_SECONDS
            }
            TimingMode::WorldTime => (state.world_time - state.last_tick_world).max(0),
        };
        state.last_tick_round = state.round;
        state.last_tick_world = state.world_time;
        elapsed
    }
}

/// Fixed clock for testing.
#[cfg(test)]
pub struct FixedClock(pub DateTime<Utc>);

#[cfg(test)]
impl ClockPort for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Fixed random for testing.
#[cfg(test)]
pub struct FixedRandom(pub i32);

#[cfg(test)]
impl RandomPort for FixedRandom {
    fn gen_range(&self, min: i32, max: i32) -> i32 {
        self.0.clamp(min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn combat_rounds_count_as_six_seconds() {
        let clock = ManualTableClock::new(100);
        clock.start_combat(CombatId::new()).await;
        clock.next_round().await;
        clock.next_round().await;

        let now = clock.current().await;
        assert!(now.is_in_combat());
        assert_eq!(now.round, 3);
        assert_eq!(now.world_time, 112);
        assert_eq!(clock.elapsed_since_last_tick(TimingMode::Combat).await, 12);
        assert_eq!(clock.elapsed_since_last_tick(TimingMode::Combat).await, 0);
    }

    #[tokio::test]
    async fn combat_elapsed_converts_back_to_whole_rounds() {
        let clock = ManualTableClock::new(0);
        clock.start_combat(CombatId::new()).await;
        for _ in 0..3 {
            clock.next_round().await;
        }
        let elapsed = clock.elapsed_since_last_tick(TimingMode::Combat).await;
        assert_eq!(afflictor_domain::seconds_to_rounds(elapsed), 3);
        assert_eq!(clock.current().await.world_time, 3 * ROUND_SECONDS);
    }

    #[tokio::test]
    async fn world_time_elapsed_is_consumed_per_tick() {
        let clock = ManualTableClock::new(0);
        clock.advance_world(3600).await;
        assert_eq!(clock.elapsed_since_last_tick(TimingMode::WorldTime).await, 3600);
        clock.advance_world(60).await;
        assert_eq!(clock.elapsed_since_last_tick(TimingMode::WorldTime).await, 60);
    }

    #[tokio::test]
    async fn ending_combat_does_not_replay_combat_time() {
        let clock = ManualTableClock::new(0);
        clock.start_combat(CombatId::new()).await;
        clock.next_round().await;
        assert_eq!(clock.elapsed_since_last_tick(TimingMode::Combat).await, 6);
        clock.end_combat().await;
        assert_eq!(clock.elapsed_since_last_tick(TimingMode::WorldTime).await, 0);
        assert!(!clock.current().await.is_in_combat());
    }

    #[tokio::test]
    async fn initiatives_are_per_target() {
        let clock = ManualTableClock::new(0);
        let target = TargetId::new();
        clock.start_combat(CombatId::new()).await;
        clock.set_initiative(target, 17).await;
        assert_eq!(clock.initiative_of(target).await, Some(17));
        assert_eq!(clock.initiative_of(TargetId::new()).await, None);
    }
}
