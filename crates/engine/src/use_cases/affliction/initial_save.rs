//! Creating an affliction and resolving the target's initial save.

use std::sync::Arc;

use afflictor_domain::{
    determine_degree, AfflictionDefinition, AfflictionEvent, AfflictionInstance, DegreeOfSuccess,
    InstanceId, SaveRoll, StagePhase, TargetId,
};

use super::exposure::ApplyExposure;
use super::progression::Progression;
use super::{AfflictionError, StageOutcome};
use crate::infrastructure::ports::{AfflictionStore, ClockPort, DefinitionCatalog, TableClockPort};

/// Attach an affliction to a target, pending its initial save.
///
/// Any stored GM edit for the definition is merged in first. A DC carried by
/// the roll context fills in for a definition that has none.
pub struct PromptInitialSave {
    store: Arc<dyn AfflictionStore>,
    catalog: Arc<dyn DefinitionCatalog>,
    clock: Arc<dyn ClockPort>,
    table_clock: Arc<dyn TableClockPort>,
}

impl PromptInitialSave {
    pub fn new(
        store: Arc<dyn AfflictionStore>,
        catalog: Arc<dyn DefinitionCatalog>,
        clock: Arc<dyn ClockPort>,
        table_clock: Arc<dyn TableClockPort>,
    ) -> Self {
        Self {
            store,
            catalog,
            clock,
            table_clock,
        }
    }

    pub async fn execute(
        &self,
        target_id: TargetId,
        definition: AfflictionDefinition,
        context_dc: Option<i32>,
    ) -> Result<AfflictionInstance, AfflictionError> {
        let mut definition = if definition.definition_key.is_empty() {
            definition
        } else {
            match self.catalog.get_override(&definition.definition_key).await? {
                Some(edit) => edit.apply_to(&definition),
                None => definition,
            }
        };

        if definition.stages.is_empty() {
            return Err(AfflictionError::Unusable(definition.name));
        }
        if definition.valid_dc().is_none() {
            match context_dc.filter(|dc| *dc > 0) {
                Some(dc) => definition.save_dc = Some(dc),
                None => {
                    tracing::warn!(%target_id, affliction = %definition.name, "No save DC, not prompting");
                    return Err(AfflictionError::MissingDc(definition.name));
                }
            }
        }
        definition.validate()?;

        let now = self.table_clock.current().await;
        let instance =
            AfflictionInstance::awaiting_initial_save(target_id, definition, self.clock.now(), &now);
        self.store.put(&instance).await?;

        tracing::info!(
            %target_id,
            instance_id = %instance.id,
            affliction = %instance.name(),
            "Prompted initial save"
        );
        Ok(instance)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitialSaveOutcome {
    Resisted {
        degree: DegreeOfSuccess,
    },
    Onset {
        degree: DegreeOfSuccess,
        remaining_seconds: i64,
    },
    Afflicted {
        degree: DegreeOfSuccess,
        stage: u32,
    },
    /// Folded into an instance the target already had
    Exposure {
        degree: DegreeOfSuccess,
        existing: InstanceId,
        outcome: StageOutcome,
    },
}

pub struct HandleInitialSave {
    progression: Arc<Progression>,
    exposure: Arc<ApplyExposure>,
    store: Arc<dyn AfflictionStore>,
    table_clock: Arc<dyn TableClockPort>,
}

impl HandleInitialSave {
    pub fn new(
        progression: Arc<Progression>,
        exposure: Arc<ApplyExposure>,
        store: Arc<dyn AfflictionStore>,
        table_clock: Arc<dyn TableClockPort>,
    ) -> Self {
        Self {
            progression,
            exposure,
            store,
            table_clock,
        }
    }

    /// Degree of success for an instance's initial save, without applying it.
    pub fn degree_for(
        instance: &AfflictionInstance,
        roll: SaveRoll,
    ) -> Result<DegreeOfSuccess, AfflictionError> {
        if instance.phase() != StagePhase::AwaitingInitialSave {
            return Err(AfflictionError::NotAwaitingInitialSave(
                instance.name().to_string(),
            ));
        }
        let dc = instance
            .definition
            .valid_dc()
            .ok_or_else(|| AfflictionError::MissingDc(instance.name().to_string()))?;
        Ok(determine_degree(roll.total, dc, roll.die_face))
    }

    pub async fn execute(
        &self,
        target_id: TargetId,
        instance_id: InstanceId,
        roll: SaveRoll,
    ) -> Result<InitialSaveOutcome, AfflictionError> {
        let mut records = self.store.get(target_id).await?;
        let mut instance = records
            .remove(&instance_id)
            .ok_or(AfflictionError::InstanceNotFound(instance_id))?;
        let degree = Self::degree_for(&instance, roll)?;

        tracing::debug!(
            %target_id,
            affliction = %instance.name(),
            total = roll.total,
            degree = degree.display_name(),
            "Resolved initial save"
        );

        if degree.is_success() {
            self.store.delete(target_id, instance_id).await?;
            self.progression
                .notify(&instance, AfflictionEvent::Resisted { degree })
                .await;
            return Ok(InitialSaveOutcome::Resisted { degree });
        }

        let existing = records
            .into_values()
            .find(|other| other.is_active() && self.exposure.folds_into(&instance, other));
        if let Some(existing) = existing {
            let existing_id = existing.id;
            let outcome = self.exposure.apply(existing, degree).await?;
            self.store.delete(target_id, instance_id).await?;
            return Ok(InitialSaveOutcome::Exposure {
                degree,
                existing: existing_id,
                outcome,
            });
        }

        let advancement = if degree == DegreeOfSuccess::CriticalFailure { 2 } else { 1 };
        let now = self.table_clock.current().await;

        if let Some(onset) = self.progression.onset_seconds(&mut instance).await {
            if onset > 0 {
                instance.start_onset(onset, advancement);
                self.store.put(&instance).await?;
                self.progression
                    .notify(
                        &instance,
                        AfflictionEvent::OnsetStarted {
                            degree,
                            remaining_seconds: onset,
                            stage_advancement: advancement,
                        },
                    )
                    .await;
                return Ok(InitialSaveOutcome::Onset {
                    degree,
                    remaining_seconds: onset,
                });
            }
        }

        let stage = advancement.min(instance.stage_count()).max(1);
        self.progression.enter_stage(&mut instance, stage, &now).await?;
        self.store.put(&instance).await?;
        self.progression
            .notify(&instance, AfflictionEvent::Afflicted { degree, stage })
            .await;
        Ok(InitialSaveOutcome::Afflicted { degree, stage })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use afflictor_domain::{
        AfflictionOverride, AfflictionType, StageDefinition, TableTime, UserId,
    };
    use chrono::Utc;

    use crate::infrastructure::clock::FixedClock;
    use crate::infrastructure::ports::{
        MockAfflictionStore, MockDefinitionCatalog, MockTableClockPort,
    };

    fn definition() -> AfflictionDefinition {
        AfflictionDefinition::new("Arsenic", AfflictionType::Poison)
            .with_stage(StageDefinition::new(1, "sickened 1"))
            .with_key("arsenic")
    }

    fn table() -> MockTableClockPort {
        let mut table = MockTableClockPort::new();
        table
            .expect_current()
            .returning(|| TableTime::out_of_combat(0));
        table
    }

    #[tokio::test]
    async fn missing_dc_is_rejected_before_anything_is_stored() {
        let mut store = MockAfflictionStore::new();
        store.expect_put().never();
        let mut catalog = MockDefinitionCatalog::new();
        catalog.expect_get_override().returning(|_| Ok(None));

        let prompt = PromptInitialSave::new(
            Arc::new(store),
            Arc::new(catalog),
            Arc::new(FixedClock(Utc::now())),
            Arc::new(table()),
        );
        let err = prompt
            .execute(TargetId::new(), definition(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AfflictionError::MissingDc(name) if name == "Arsenic"));
    }

    #[tokio::test]
    async fn roll_context_dc_and_override_are_used() {
        let mut store = MockAfflictionStore::new();
        store
            .expect_put()
            .withf(|instance| instance.definition.save_dc == Some(16))
            .times(1)
            .returning(|_| Ok(()));

        let mut catalog = MockDefinitionCatalog::new();
        catalog
            .expect_get_override()
            .withf(|key| key == "arsenic")
            .returning(|_| {
                let mut edited = definition();
                edited.name = "Refined Arsenic".to_string();
                Ok(Some(AfflictionOverride::from_definition(
                    &edited,
                    Some(UserId::new()),
                    Utc::now(),
                )))
            });

        let prompt = PromptInitialSave::new(
            Arc::new(store),
            Arc::new(catalog),
            Arc::new(FixedClock(Utc::now())),
            Arc::new(table()),
        );
        let instance = prompt
            .execute(TargetId::new(), definition(), Some(16))
            .await
            .unwrap();
        assert_eq!(instance.name(), "Refined Arsenic");
        assert_eq!(instance.current_stage, -1);
    }

    #[test]
    fn degree_requires_a_pending_instance() {
        let mut instance = AfflictionInstance::awaiting_initial_save(
            TargetId::new(),
            definition().with_dc(18),
            Utc::now(),
            &TableTime::out_of_combat(0),
        );
        assert_eq!(
            HandleInitialSave::degree_for(&instance, SaveRoll::new(28)).unwrap(),
            DegreeOfSuccess::CriticalSuccess
        );
        assert_eq!(
            HandleInitialSave::degree_for(&instance, SaveRoll::new(17).with_die_face(20)).unwrap(),
            DegreeOfSuccess::Success
        );

        instance.current_stage = 1;
        assert!(matches!(
            HandleInitialSave::degree_for(&instance, SaveRoll::new(10)),
            Err(AfflictionError::NotAwaitingInitialSave(_))
        ));
    }
}
