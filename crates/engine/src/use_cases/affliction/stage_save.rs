//! Stage saves: the periodic save that moves an afflicted target between stages.

use std::sync::Arc;

use afflictor_domain::{
    determine_degree, virulent_step, AfflictionEvent, AfflictionInstance, DomainError,
    InstanceId, SaveRoll, TargetId,
};

use super::progression::{Progression, StageCause};
use super::{load_instance, staged, AfflictionError, ResolvedSave, StageOutcome};
use crate::infrastructure::ports::{AfflictionStore, TableClockPort};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageSaveOutcome {
    pub save: ResolvedSave,
    pub outcome: StageOutcome,
}

pub struct HandleStageSave {
    progression: Arc<Progression>,
    store: Arc<dyn AfflictionStore>,
    table_clock: Arc<dyn TableClockPort>,
}

impl HandleStageSave {
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

    /// Resolve a stage save roll, including any pending treatment bonus.
    pub fn resolve(
        instance: &AfflictionInstance,
        roll: SaveRoll,
    ) -> Result<ResolvedSave, AfflictionError> {
        staged(instance)?;
        if instance.max_duration_expired {
            return Err(DomainError::invalid_state_transition(format!(
                "{} reached its maximum duration and no longer progresses",
                instance.name()
            ))
            .into());
        }
        let dc = instance
            .definition
            .valid_dc()
            .ok_or_else(|| AfflictionError::MissingDc(instance.name().to_string()))?;
        let roll = roll.with_bonus(instance.treatment_bonus);
        Ok(ResolvedSave {
            degree: determine_degree(roll.total, dc, roll.die_face),
            total: roll.total,
            dc,
        })
    }

    pub async fn execute(
        &self,
        target_id: TargetId,
        instance_id: InstanceId,
        roll: SaveRoll,
    ) -> Result<StageSaveOutcome, AfflictionError> {
        let mut instance = load_instance(self.store.as_ref(), target_id, instance_id).await?;
        let save = Self::resolve(&instance, roll)?;
        let stage = staged(&instance)?;

        tracing::debug!(
            %target_id,
            affliction = %instance.name(),
            stage,
            total = save.total,
            dc = save.dc,
            treatment_bonus = instance.treatment_bonus,
            degree = save.degree.display_name(),
            "Resolved stage save"
        );

        // The bonus only modifies the save it was granted for.
        instance.treatment_bonus = 0;

        let now = self.table_clock.current().await;
        let delta = if instance.definition.is_virulent {
            let step = virulent_step(save.degree, instance.virulent_consecutive_successes);
            instance.virulent_consecutive_successes = step.consecutive_successes;
            if step.delta == 0 {
                self.progression.schedule_next_save(&mut instance, &now).await;
                self.store.put(&instance).await?;
                self.progression
                    .notify(
                        &instance,
                        AfflictionEvent::VirulentSuccess {
                            consecutive_successes: step.consecutive_successes,
                        },
                    )
                    .await;
                return Ok(StageSaveOutcome {
                    save,
                    outcome: StageOutcome::Unchanged { stage },
                });
            }
            step.delta
        } else {
            save.degree.stage_delta()
        };

        let outcome = self
            .progression
            .change_stage(&mut instance, delta, 0, StageCause::Save(save.degree), &now)
            .await?;
        Ok(StageSaveOutcome { save, outcome })
    }
}
