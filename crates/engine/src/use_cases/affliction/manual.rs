//! GM actions: manual stage moves, removal, accepting expiry and cleansing.

use std::sync::Arc;

use afflictor_domain::{
    AfflictionEvent, DegreeOfSuccess, DomainError, InstanceId, RemovalReason, TargetId,
};

use super::progression::{Progression, StageCause};
use super::{load_instance, staged, AfflictionError, StageOutcome};
use crate::infrastructure::ports::{AfflictionStore, TableClockPort};

/// Move a stage by hand as if a save had produced `degree`.
///
/// Uses the non-virulent table and never drops below stage 1.
pub struct ManualStageChange {
    progression: Arc<Progression>,
    store: Arc<dyn AfflictionStore>,
    table_clock: Arc<dyn TableClockPort>,
}

impl ManualStageChange {
    pub fn new(
        progression: Arc<Progression>,
        store: Arc<dyn AfflictionStore>,
        table_clock: Arc<dyn TableClockPort>,
    ) -> Self {
        Self {
            progression,
            store,
            table_clock,
        }
    }

    pub async fn execute(
        &self,
        target_id: TargetId,
        instance_id: InstanceId,
        degree: DegreeOfSuccess,
    ) -> Result<StageOutcome, AfflictionError> {
        let mut instance = load_instance(self.store.as_ref(), target_id, instance_id).await?;
        staged(&instance)?;
        let now = self.table_clock.current().await;
        self.progression
            .change_stage(
                &mut instance,
                degree.stage_delta(),
                1,
                StageCause::Manual(degree),
                &now,
            )
            .await
    }
}

pub struct RemoveAffliction {
    progression: Arc<Progression>,
    store: Arc<dyn AfflictionStore>,
}

impl RemoveAffliction {
    pub fn new(progression: Arc<Progression>, store: Arc<dyn AfflictionStore>) -> Self {
        Self { progression, store }
    }

    pub async fn execute(
        &self,
        target_id: TargetId,
        instance_id: InstanceId,
    ) -> Result<(), AfflictionError> {
        let instance = load_instance(self.store.as_ref(), target_id, instance_id).await?;
        self.progression
            .remove(&instance, RemovalReason::RemovedByGm)
            .await
    }
}

/// Keep the current conditions after maximum duration and stop tracking.
pub struct AcceptExpiry {
    progression: Arc<Progression>,
    store: Arc<dyn AfflictionStore>,
}

impl AcceptExpiry {
    pub fn new(progression: Arc<Progression>, store: Arc<dyn AfflictionStore>) -> Self {
        Self { progression, store }
    }

    pub async fn execute(
        &self,
        target_id: TargetId,
        instance_id: InstanceId,
    ) -> Result<(), AfflictionError> {
        let mut instance = load_instance(self.store.as_ref(), target_id, instance_id).await?;
        let stage = staged(&instance)?;
        if !instance.max_duration_expired {
            return Err(DomainError::invalid_state_transition(format!(
                "{} has not reached its maximum duration",
                instance.name()
            ))
            .into());
        }
        instance.accept_expiry();
        self.store.put(&instance).await?;
        tracing::info!(%target_id, affliction = %instance.name(), stage, "Expiry accepted");
        self.progression
            .notify(&instance, AfflictionEvent::ExpiryAccepted { stage })
            .await;
        Ok(())
    }
}

/// One-time reduction of the stage by one, never below stage 1.
pub struct Cleanse {
    progression: Arc<Progression>,
    store: Arc<dyn AfflictionStore>,
    table_clock: Arc<dyn TableClockPort>,
}

impl Cleanse {
    pub fn new(
        progression: Arc<Progression>,
        store: Arc<dyn AfflictionStore>,
        table_clock: Arc<dyn TableClockPort>,
    ) -> Self {
        Self {
            progression,
            store,
            table_clock,
        }
    }

    pub async fn execute(
        &self,
        target_id: TargetId,
        instance_id: InstanceId,
    ) -> Result<StageOutcome, AfflictionError> {
        let mut instance = load_instance(self.store.as_ref(), target_id, instance_id).await?;
        let current = staged(&instance)?;
        let stage = instance.claim_cleanse()?;
        let now = self.table_clock.current().await;
        self.progression
            .change_stage(
                &mut instance,
                stage as i32 - current as i32,
                1,
                StageCause::Cleanse,
                &now,
            )
            .await
    }
}
