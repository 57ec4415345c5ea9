//! Persistence ports: running instances, definition overrides, and pending
//! confirmations.

use std::collections::HashMap;

use async_trait::async_trait;

use afflictor_domain::{
    AfflictionInstance, AfflictionOverride, CorrelationId, InstanceId, SaveRoll, TargetId,
};

use super::error::RepoError;
use super::types::PendingConfirmation;

/// Per-target affliction records.
///
/// Writes replace the whole instance record. Callers follow a single-writer
/// discipline per target, so no optimistic locking is attempted.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AfflictionStore: Send + Sync {
    async fn get(
        &self,
        target_id: TargetId,
    ) -> Result<HashMap<InstanceId, AfflictionInstance>, RepoError>;
    async fn put(&self, instance: &AfflictionInstance) -> Result<(), RepoError>;
    async fn delete(&self, target_id: TargetId, instance_id: InstanceId) -> Result<(), RepoError>;

    /// Every target that currently owns at least one record.
    async fn list_targets(&self) -> Result<Vec<TargetId>, RepoError>;
}

/// GM edits keyed by definition key.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DefinitionCatalog: Send + Sync {
    async fn get_override(&self, key: &str) -> Result<Option<AfflictionOverride>, RepoError>;
    async fn save_override(&self, key: &str, edit: &AfflictionOverride) -> Result<(), RepoError>;
    async fn delete_override(&self, key: &str) -> Result<(), RepoError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConfirmationStore: Send + Sync {
    async fn get(&self, id: CorrelationId) -> Result<Option<PendingConfirmation>, RepoError>;
    async fn save(&self, pending: &PendingConfirmation) -> Result<(), RepoError>;
}

/// Looks up the roll attached to a correlation id as the host currently
/// sees it. A reroll replaces the earlier result.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RollLookup: Send + Sync {
    async fn current_roll(&self, correlation_id: CorrelationId) -> Result<Option<SaveRoll>, RepoError>;
}
