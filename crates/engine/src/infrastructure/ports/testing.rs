//! Testability ports for injecting time and randomness.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use afflictor_domain::{TableTime, TargetId, TimingMode};

#[cfg_attr(test, mockall::automock)]
pub trait ClockPort: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub trait RandomPort: Send + Sync {
    fn gen_range(&self, min: i32, max: i32) -> i32;
}

/// The host's game clocks: combat turn order and world time.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TableClockPort: Send + Sync {
    async fn current(&self) -> TableTime;

    /// Initiative of a combatant in the running encounter.
    async fn initiative_of(&self, target_id: TargetId) -> Option<i32>;

    /// Seconds of game time since the previous call, measured on `mode`'s
    /// clock. Each call consumes the interval it reports.
    async fn elapsed_since_last_tick(&self, mode: TimingMode) -> i64;
}
