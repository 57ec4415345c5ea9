//! Effect application adapter.

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;

use afflictor_domain::{AfflictionInstance, InstanceId, StageDefinition, TargetId};

use crate::infrastructure::ports::{EffectError, EffectPort};

/// One call made against the effect port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "call", rename_all = "camelCase")]
pub enum EffectCall {
    Apply {
        target_id: TargetId,
        instance_id: InstanceId,
        stage: u32,
    },
    Remove {
        target_id: TargetId,
        instance_id: InstanceId,
        old_stage: i32,
        new_stage: u32,
    },
    PromptDamage {
        target_id: TargetId,
        instance_id: InstanceId,
        stage: u32,
        formulas: Vec<String>,
    },
    ConfirmDeath {
        target_id: TargetId,
        instance_id: InstanceId,
        stage: u32,
    },
}

/// Effect port that logs and records every call instead of touching a host.
///
/// Handles are synthesized as `<instance>:stage-<n>`.
pub struct RecordingEffects {
    calls: RwLock<Vec<EffectCall>>,
}

impl RecordingEffects {
    pub fn new() -> Self {
        Self {
            calls: RwLock::new(Vec::new()),
        }
    }

    pub async fn calls(&self) -> Vec<EffectCall> {
        self.calls.read().await.clone()
    }

    async fn record(&self, call: EffectCall) {
        self.calls.write().await.push(call);
    }
}

impl Default for RecordingEffects {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EffectPort for RecordingEffects {
    async fn apply_stage_effects(
        &self,
        target_id: TargetId,
        instance: &AfflictionInstance,
        stage: &StageDefinition,
    ) -> Result<Option<String>, EffectError> {
        tracing::info!(
            %target_id,
            instance_id = %instance.id,
            stage = stage.number,
            conditions = stage.conditions.len(),
            weaknesses = stage.weaknesses.len(),
            "Applying stage effects"
        );
        self.record(EffectCall::Apply {
            target_id,
            instance_id: instance.id,
            stage: stage.number,
        })
        .await;
        Ok(Some(format!("{}:stage-{}", instance.id, stage.number)))
    }

    async fn remove_stage_effects(
        &self,
        target_id: TargetId,
        instance: &AfflictionInstance,
        old_stage: i32,
        new_stage: u32,
    ) -> Result<(), EffectError> {
        tracing::info!(%target_id, instance_id = %instance.id, old_stage, new_stage, "Removing stage effects");
        self.record(EffectCall::Remove {
            target_id,
            instance_id: instance.id,
            old_stage,
            new_stage,
        })
        .await;
        Ok(())
    }

    async fn prompt_damage(
        &self,
        target_id: TargetId,
        instance: &AfflictionInstance,
        stage: &StageDefinition,
    ) -> Result<(), EffectError> {
        let formulas: Vec<String> = stage
            .damage
            .iter()
            .map(|d| format!("{} {}", d.formula, d.damage_type))
            .collect();
        tracing::info!(%target_id, instance_id = %instance.id, stage = stage.number, damage = ?formulas, "Damage prompt");
        self.record(EffectCall::PromptDamage {
            target_id,
            instance_id: instance.id,
            stage: stage.number,
            formulas,
        })
        .await;
        Ok(())
    }

    async fn confirm_death(
        &self,
        target_id: TargetId,
        instance: &AfflictionInstance,
        stage: &StageDefinition,
    ) -> Result<(), EffectError> {
        tracing::warn!(%target_id, instance_id = %instance.id, stage = stage.number, "Lethal stage reached, death confirmation requested");
        self.record(EffectCall::ConfirmDeath {
            target_id,
            instance_id: instance.id,
            stage: stage.number,
        })
        .await;
        Ok(())
    }
}
