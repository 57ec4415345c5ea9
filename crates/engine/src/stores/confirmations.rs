//! Pending save confirmations and the roll log they read from.
//!
//! Confirmations have no expiry: a GM may leave one pending indefinitely.

use async_trait::async_trait;
use dashmap::DashMap;

use afflictor_domain::{CorrelationId, SaveRoll};

use crate::infrastructure::ports::{ConfirmationStore, PendingConfirmation, RepoError, RollLookup};

pub struct InMemoryConfirmationStore {
    pending: DashMap<CorrelationId, PendingConfirmation>,
}

impl InMemoryConfirmationStore {
    pub fn new() -> Self {
        Self {
            pending: DashMap::new(),
        }
    }
}

impl Default for InMemoryConfirmationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConfirmationStore for InMemoryConfirmationStore {
    async fn get(&self, id: CorrelationId) -> Result<Option<PendingConfirmation>, RepoError> {
        Ok(self.pending.get(&id).map(|entry| entry.value().clone()))
    }

    async fn save(&self, pending: &PendingConfirmation) -> Result<(), RepoError> {
        self.pending.insert(pending.correlation_id, pending.clone());
        Ok(())
    }
}

/// Rolls posted by the host, keyed by the correlation id of the chat card
/// that requested them.
pub struct RollLog {
    rolls: DashMap<CorrelationId, SaveRoll>,
}

impl RollLog {
    pub fn new() -> Self {
        Self {
            rolls: DashMap::new(),
        }
    }

    /// Record a roll, replacing any earlier roll (a reroll).
    pub fn record(&self, correlation_id: CorrelationId, roll: SaveRoll) {
        if self.rolls.insert(correlation_id, roll).is_some() {
            tracing::debug!(%correlation_id, total = roll.total, "Roll replaced by reroll");
        }
    }
}

impl Default for RollLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RollLookup for RollLog {
    async fn current_roll(&self, correlation_id: CorrelationId) -> Result<Option<SaveRoll>, RepoError> {
        Ok(self.rolls.get(&correlation_id).map(|entry| *entry.value()))
    }
}
