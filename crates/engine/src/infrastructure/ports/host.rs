//! Host collaborator ports: dice, effect application, notifications.

use async_trait::async_trait;

use afflictor_domain::{AfflictionInstance, AfflictionNotice, StageDefinition, TargetId};

use super::error::{DiceError, EffectError};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DicePort: Send + Sync {
    async fn roll_total(&self, formula: &str) -> Result<i32, DiceError>;
}

/// Translates stage definitions into host-side persistent effects.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EffectPort: Send + Sync {
    /// Returns a handle to the created effect, if the host tracks one.
    async fn apply_stage_effects(
        &self,
        target_id: TargetId,
        instance: &AfflictionInstance,
        stage: &StageDefinition,
    ) -> Result<Option<String>, EffectError>;

    async fn remove_stage_effects(
        &self,
        target_id: TargetId,
        instance: &AfflictionInstance,
        old_stage: i32,
        new_stage: u32,
    ) -> Result<(), EffectError>;

    async fn prompt_damage(
        &self,
        target_id: TargetId,
        instance: &AfflictionInstance,
        stage: &StageDefinition,
    ) -> Result<(), EffectError>;

    async fn confirm_death(
        &self,
        target_id: TargetId,
        instance: &AfflictionInstance,
        stage: &StageDefinition,
    ) -> Result<(), EffectError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationPort: Send + Sync {
    async fn notify(&self, notice: AfflictionNotice);
}
