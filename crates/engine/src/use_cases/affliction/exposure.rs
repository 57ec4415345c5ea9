//! Exposure to an affliction the target already has.
//!
//! Afflictions with a multiple-exposure rule raise the stage by the rule's
//! increase once the instance has reached the rule's minimum stage. Otherwise,
//! types enabled for re-exposure raise the stage by 1, or 2 on a critical
//! failure. Anything else becomes an independent instance.

use std::sync::Arc;

use afflictor_domain::{
    AfflictionEvent, AfflictionInstance, DegreeOfSuccess, InstanceId, StagePhase,
    StageTransition, TargetId,
};

use super::progression::{Progression, StageCause};
use super::{load_instance, AfflictionError, StageOutcome};
use crate::infrastructure::ports::{AfflictionStore, TableClockPort};

pub struct ApplyExposure {
    progression: Arc<Progression>,
    store: Arc<dyn AfflictionStore>,
    table_clock: Arc<dyn TableClockPort>,
}

impl ApplyExposure {
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

    /// Whether a failed save against `incoming` should fold into `existing`
    /// instead of creating a new instance.
    pub fn folds_into(&self, incoming: &AfflictionInstance, existing: &AfflictionInstance) -> bool {
        let incoming_def = &incoming.definition;
        let existing_def = &existing.definition;
        let same = if incoming_def.definition_key.is_empty() || existing_def.definition_key.is_empty() {
            incoming_def.name.eq_ignore_ascii_case(&existing_def.name)
        } else {
            incoming_def.definition_key == existing_def.definition_key
        };
        same && (existing_def.active_multiple_exposure().is_some()
            || self
                .progression
                .settings()
                .reexposure_applies_to(existing_def.affliction_type))
    }

    pub async fn execute(
        &self,
        target_id: TargetId,
        existing_id: InstanceId,
        degree: DegreeOfSuccess,
    ) -> Result<StageOutcome, AfflictionError> {
        let existing = load_instance(self.store.as_ref(), target_id, existing_id).await?;
        self.apply(existing, degree).await
    }

    pub(crate) async fn apply(
        &self,
        mut existing: AfflictionInstance,
        degree: DegreeOfSuccess,
    ) -> Result<StageOutcome, AfflictionError> {
        let rule = existing.definition.active_multiple_exposure().cloned();
        let (delta, cause) = match &rule {
            Some(rule) => (rule.stage_increase as i32, StageCause::MultipleExposure),
            None => (
                if degree == DegreeOfSuccess::CriticalFailure { 2 } else { 1 },
                StageCause::ReExposure,
            ),
        };

        // An instance still in onset counts as stage 0 for the minimum gate.
        let stage = match existing.phase() {
            StagePhase::Onset => 0,
            StagePhase::Staged(stage) => stage,
            _ => return Err(AfflictionError::NotStaged(existing.name().to_string())),
        };
        if let Some(min_stage) = rule.and_then(|rule| rule.min_stage) {
            if stage < min_stage {
                tracing::debug!(
                    affliction = %existing.name(),
                    stage,
                    min_stage,
                    "Below the multiple exposure minimum stage"
                );
                self.progression
                    .notify(
                        &existing,
                        AfflictionEvent::MultipleExposure {
                            transition: StageTransition::new(stage as i32, stage),
                            applied: false,
                        },
                    )
                    .await;
                return Ok(StageOutcome::Unchanged { stage });
            }
        }

        if !existing.in_onset {
            let now = self.table_clock.current().await;
            return self
                .progression
                .change_stage(&mut existing, delta, 1, cause, &now)
                .await;
        }

        let before = existing.stage_advancement;
        existing.stage_advancement = (before + delta.max(0) as u32)
            .min(existing.stage_count())
            .max(1);
        self.store.put(&existing).await?;
        let transition = StageTransition::new(before as i32, existing.stage_advancement);
        tracing::info!(
            target_id = %existing.target_id,
            affliction = %existing.name(),
            stage_advancement = existing.stage_advancement,
            "Exposure during onset raised the landing stage"
        );
        let event = match cause {
            StageCause::MultipleExposure => AfflictionEvent::MultipleExposure {
                transition,
                applied: true,
            },
            _ => AfflictionEvent::ReExposure { transition },
        };
        self.progression.notify(&existing, event).await;
        Ok(StageOutcome::Unchanged { stage: 0 })
    }
}
