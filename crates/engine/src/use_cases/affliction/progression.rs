//! Stage progression shared by every use case that moves an instance.

use std::sync::Arc;

use afflictor_domain::{
    AfflictionEvent, AfflictionInstance, AfflictionNotice, DegreeOfSuccess, DurationValue,
    NextSave, RemovalReason, StageDefinition, StageTransition, TableTime,
};

use super::{AfflictionError, StageOutcome};
use crate::infrastructure::dice::fallback_roll;
use crate::infrastructure::ports::{
    AfflictionStore, DicePort, EffectPort, NotificationPort, RandomPort, TableClockPort,
};
use crate::infrastructure::settings::EngineSettings;

/// Why a stage move is happening; decides which notice is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageCause {
    Save(DegreeOfSuccess),
    Manual(DegreeOfSuccess),
    ReExposure,
    MultipleExposure,
    Cleanse,
}

impl StageCause {
    fn degree(&self) -> Option<DegreeOfSuccess> {
        match self {
            StageCause::Save(degree) | StageCause::Manual(degree) => Some(*degree),
            _ => None,
        }
    }

    fn event(&self, transition: StageTransition) -> Option<AfflictionEvent> {
        match self {
            StageCause::Save(degree) | StageCause::Manual(degree) => transition
                .is_change()
                .then_some(AfflictionEvent::StageChanged {
                    transition,
                    degree: Some(*degree),
                }),
            StageCause::ReExposure => Some(AfflictionEvent::ReExposure { transition }),
            StageCause::MultipleExposure => Some(AfflictionEvent::MultipleExposure {
                transition,
                applied: true,
            }),
            StageCause::Cleanse => Some(AfflictionEvent::Cleansed { transition }),
        }
    }
}

/// Moves instances between stages and keeps their effects, save windows and
/// notices in step.
pub struct Progression {
    store: Arc<dyn AfflictionStore>,
    effects: Arc<dyn EffectPort>,
    notifier: Arc<dyn NotificationPort>,
    dice: Arc<dyn DicePort>,
    random: Arc<dyn RandomPort>,
    table_clock: Arc<dyn TableClockPort>,
    settings: EngineSettings,
}

impl Progression {
    pub fn new(
        store: Arc<dyn AfflictionStore>,
        effects: Arc<dyn EffectPort>,
        notifier: Arc<dyn NotificationPort>,
        dice: Arc<dyn DicePort>,
        random: Arc<dyn RandomPort>,
        table_clock: Arc<dyn TableClockPort>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            store,
            effects,
            notifier,
            dice,
            random,
            table_clock,
            settings,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub async fn notify(&self, instance: &AfflictionInstance, event: AfflictionEvent) {
        self.notifier
            .notify(AfflictionNotice::new(
                instance.target_id,
                instance.id,
                instance.name(),
                event,
            ))
            .await;
    }

    async fn roll(&self, formula: &str) -> i32 {
        match self.dice.roll_total(formula).await {
            Ok(total) => total,
            Err(e) => {
                tracing::warn!(formula, error = %e, "Dice roll failed, using fallback roll");
                fallback_roll(formula, self.random.as_ref())
            }
        }
    }

    /// Seconds in a duration, rolling its dice the first time they are needed.
    async fn resolve_duration(
        &self,
        instance: &AfflictionInstance,
        mut duration: DurationValue,
    ) -> (i64, DurationValue) {
        let total = match duration.formula.clone() {
            Some(formula) if duration.needs_roll() => Some(self.roll(&formula).await),
            _ => None,
        };
        let (seconds, rolled) = duration.resolve_with(|_| total.unwrap_or(0));
        if let (Some(value), Some(formula)) = (rolled, duration.formula.clone()) {
            tracing::info!(
                target_id = %instance.target_id,
                affliction = %instance.name(),
                formula = %formula,
                value,
                "Rolled affliction duration"
            );
            self.notify(instance, AfflictionEvent::DurationRolled { formula, value })
                .await;
        }
        (seconds, duration)
    }

    /// Seconds until the save for `stage`, or `None` if the stage has no
    /// duration. The rolled value is kept on the instance's definition.
    pub async fn stage_seconds(&self, instance: &mut AfflictionInstance, stage: u32) -> Option<i64> {
        let duration = instance.definition.stage(stage)?.duration.clone()?;
        let (seconds, resolved) = self.resolve_duration(instance, duration).await;
        if let Some(definition) = instance.definition.stage_mut(stage) {
            definition.duration = Some(resolved);
        }
        Some(seconds)
    }

    pub async fn onset_seconds(&self, instance: &mut AfflictionInstance) -> Option<i64> {
        let onset = instance.definition.onset.clone()?;
        let (seconds, resolved) = self.resolve_duration(instance, onset).await;
        instance.definition.onset = Some(resolved);
        Some(seconds)
    }

    pub async fn max_duration_seconds(&self, instance: &mut AfflictionInstance) -> Option<i64> {
        let max_duration = instance.definition.max_duration.clone()?;
        let (seconds, resolved) = self.resolve_duration(instance, max_duration).await;
        instance.definition.max_duration = Some(resolved);
        Some(seconds)
    }

    /// Initiative a combat save window opens on.
    async fn save_initiative(&self, instance: &AfflictionInstance) -> Option<i32> {
        if self.settings.use_application_initiative {
            return instance.applied_initiative;
        }
        self.table_clock
            .initiative_of(instance.target_id)
            .await
            .or(instance.applied_initiative)
    }

    /// Open the save window for the instance's current stage.
    pub async fn schedule_next_save(&self, instance: &mut AfflictionInstance, now: &TableTime) {
        let Some(stage) = instance.current_stage_number() else {
            return;
        };
        let Some(seconds) = self.stage_seconds(instance, stage).await else {
            tracing::debug!(affliction = %instance.name(), stage, "Stage has no duration, no save scheduled");
            instance.next_save = None;
            return;
        };
        let initiative = self.save_initiative(instance).await;
        let next = NextSave::after(seconds, now, initiative);
        tracing::debug!(affliction = %instance.name(), stage, ?next, "Scheduled stage save");
        instance.schedule_next_save(next);
    }

    async fn apply_stage_effects(
        &self,
        instance: &mut AfflictionInstance,
        stage: &StageDefinition,
    ) -> Result<(), AfflictionError> {
        let target_id = instance.target_id;
        if stage.is_lethal {
            tracing::warn!(%target_id, affliction = %instance.name(), stage = stage.number, "Lethal stage reached");
            self.effects.confirm_death(target_id, instance, stage).await?;
            return Ok(());
        }
        if stage.requires_manual_handling {
            tracing::warn!(%target_id, affliction = %instance.name(), stage = stage.number, "Stage needs manual handling");
            self.notify(
                instance,
                AfflictionEvent::ManualHandlingRequired {
                    stage: stage.number,
                },
            )
            .await;
        } else if self.settings.auto_apply_effects {
            let handle = self
                .effects
                .apply_stage_effects(target_id, instance, stage)
                .await?;
            instance.applied_effect_handle = handle;
        }
        if stage.has_damage() {
            self.effects.prompt_damage(target_id, instance, stage).await?;
        }
        Ok(())
    }

    /// Put the instance on `stage`: swap effects, reset per-stage state and
    /// open the next save window. Nothing changes if the stage is missing.
    pub async fn enter_stage(
        &self,
        instance: &mut AfflictionInstance,
        stage: u32,
        now: &TableTime,
    ) -> Result<(), AfflictionError> {
        let Some(definition) = instance.definition.stage(stage).cloned() else {
            return Err(AfflictionError::MissingStage {
                affliction: instance.name().to_string(),
                stage,
            });
        };

        let old_stage = instance.current_stage;
        if old_stage > 0 {
            self.effects
                .remove_stage_effects(instance.target_id, instance, old_stage, stage)
                .await?;
            instance.applied_effect_handle = None;
        }

        instance.enter_stage(stage, now);
        self.apply_stage_effects(instance, &definition).await?;
        self.schedule_next_save(instance, now).await;

        tracing::info!(
            target_id = %instance.target_id,
            affliction = %instance.name(),
            old_stage,
            new_stage = stage,
            "Affliction entered stage"
        );
        Ok(())
    }

    /// Swap the applied effects for the current stage's (edited) definition.
    ///
    /// `applied_stage` is the stage whose effects are on the target now; it
    /// differs from the current stage when an edit dropped stages. Save windows
    /// and per-stage bookkeeping are left alone, and nothing is prompted again.
    pub async fn reapply_stage(
        &self,
        instance: &mut AfflictionInstance,
        applied_stage: i32,
    ) -> Result<(), AfflictionError> {
        let Some(stage) = instance.current_stage_number() else {
            return Ok(());
        };
        let Some(definition) = instance.definition.stage(stage).cloned() else {
            return Err(AfflictionError::MissingStage {
                affliction: instance.name().to_string(),
                stage,
            });
        };
        self.effects
            .remove_stage_effects(instance.target_id, instance, applied_stage, stage)
            .await?;
        instance.applied_effect_handle = None;
        if self.settings.auto_apply_effects
            && !definition.is_lethal
            && !definition.requires_manual_handling
        {
            instance.applied_effect_handle = self
                .effects
                .apply_stage_effects(instance.target_id, instance, &definition)
                .await?;
        }
        Ok(())
    }

    /// Move by `delta` stages within `[floor, stage count]` and persist.
    ///
    /// Landing on stage 0 removes the instance as recovered.
    pub async fn change_stage(
        &self,
        instance: &mut AfflictionInstance,
        delta: i32,
        floor: u32,
        cause: StageCause,
        now: &TableTime,
    ) -> Result<StageOutcome, AfflictionError> {
        let target = instance.plan_stage_change(delta, floor);
        if target.clamped_high {
            tracing::warn!(
                affliction = %instance.name(),
                requested = target.requested,
                stage = target.stage,
                "Requested stage is past the last stage, clamping"
            );
            self.notify(
                instance,
                AfflictionEvent::StageClamped {
                    requested: target.requested,
                    stage: target.stage,
                },
            )
            .await;
        }

        if target.recovered() {
            self.notify(
                instance,
                AfflictionEvent::Recovered {
                    degree: cause.degree(),
                },
            )
            .await;
            self.remove(instance, RemovalReason::Recovered).await?;
            return Ok(StageOutcome::Removed(RemovalReason::Recovered));
        }

        let transition = StageTransition::new(instance.current_stage, target.stage);
        if transition.is_change() {
            self.enter_stage(instance, target.stage, now).await?;
        } else {
            match cause {
                StageCause::Save(_) => self.schedule_next_save(instance, now).await,
                StageCause::MultipleExposure => {
                    instance.restart_stage(now);
                    self.schedule_next_save(instance, now).await;
                }
                _ => {}
            }
        }
        self.store.put(instance).await?;

        if let Some(event) = cause.event(transition) {
            self.notify(instance, event).await;
        }
        Ok(if transition.is_change() {
            StageOutcome::Changed(transition)
        } else {
            StageOutcome::Unchanged {
                stage: target.stage,
            }
        })
    }

    /// Strip effects, delete the record and report why.
    pub async fn remove(
        &self,
        instance: &AfflictionInstance,
        reason: RemovalReason,
    ) -> Result<(), AfflictionError> {
        if instance.current_stage > 0 {
            self.effects
                .remove_stage_effects(instance.target_id, instance, instance.current_stage, 0)
                .await?;
        }
        self.store.delete(instance.target_id, instance.id).await?;
        tracing::info!(
            target_id = %instance.target_id,
            affliction = %instance.name(),
            ?reason,
            "Affliction removed"
        );
        self.notify(instance, AfflictionEvent::Removed { reason }).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use afflictor_domain::{
        AfflictionDefinition, AfflictionType, DamageEntry, DurationUnit, TargetId,
    };
    use chrono::Utc;

    use crate::infrastructure::clock::FixedRandom;
    use crate::infrastructure::ports::{
        DiceError, MockAfflictionStore, MockDicePort, MockEffectPort, MockNotificationPort,
        MockTableClockPort,
    };

    fn definition() -> AfflictionDefinition {
        AfflictionDefinition::new("Spider Venom", AfflictionType::Poison)
            .with_dc(18)
            .with_stage(
                StageDefinition::new(1, "1d6 poison")
                    .with_duration(DurationValue::dice("1d4", DurationUnit::Round))
                    .with_damage(DamageEntry::new("1d6", "poison")),
            )
            .with_stage(StageDefinition::new(2, "death").lethal())
    }

    fn instance() -> AfflictionInstance {
        AfflictionInstance::awaiting_initial_save(
            TargetId::new(),
            definition(),
            Utc::now(),
            &TableTime::out_of_combat(0),
        )
    }

    fn progression(
        store: MockAfflictionStore,
        effects: MockEffectPort,
        notifier: MockNotificationPort,
        dice: MockDicePort,
    ) -> Progression {
        let mut table = MockTableClockPort::new();
        table.expect_initiative_of().returning(|_| None);
        Progression::new(
            Arc::new(store),
            Arc::new(effects),
            Arc::new(notifier),
            Arc::new(dice),
            Arc::new(FixedRandom(3)),
            Arc::new(table),
            EngineSettings::default(),
        )
    }

    #[tokio::test]
    async fn entering_a_stage_applies_effects_and_rolls_duration_once() {
        let mut effects = MockEffectPort::new();
        effects
            .expect_apply_stage_effects()
            .times(1)
            .returning(|_, _, _| Ok(Some("handle".to_string())));
        effects.expect_prompt_damage().times(1).returning(|_, _, _| Ok(()));

        let mut dice = MockDicePort::new();
        dice.expect_roll_total()
            .withf(|formula| formula == "1d4")
            .times(1)
            .returning(|_| Ok(2));

        let mut notifier = MockNotificationPort::new();
        notifier
            .expect_notify()
            .withf(|notice| {
                notice.event
                    == AfflictionEvent::DurationRolled {
                        formula: "1d4".to_string(),
                        value: 2,
                    }
            })
            .times(1)
            .returning(|_| ());

        let progression = progression(MockAfflictionStore::new(), effects, notifier, dice);
        let mut instance = instance();
        progression
            .enter_stage(&mut instance, 1, &TableTime::out_of_combat(100))
            .await
            .unwrap();

        assert_eq!(instance.current_stage, 1);
        assert_eq!(instance.applied_effect_handle.as_deref(), Some("handle"));
        assert_eq!(instance.next_save, Some(NextSave::WorldTime { timestamp: 112 }));

        // The rolled value is frozen on the instance.
        assert_eq!(progression.stage_seconds(&mut instance, 1).await, Some(12));
    }

    #[tokio::test]
    async fn dice_failure_falls_back_to_local_roll() {
        let mut dice = MockDicePort::new();
        dice.expect_roll_total()
            .returning(|_| Err(DiceError::Evaluator("offline".to_string())));
        let mut notifier = MockNotificationPort::new();
        notifier.expect_notify().returning(|_| ());

        let progression = progression(
            MockAfflictionStore::new(),
            MockEffectPort::new(),
            notifier,
            dice,
        );
        let mut instance = instance();
        // FixedRandom(3) on a single d4 rolls 3.
        assert_eq!(progression.stage_seconds(&mut instance, 1).await, Some(18));
    }

    #[tokio::test]
    async fn lethal_stage_confirms_death_instead_of_applying_effects() {
        let mut effects = MockEffectPort::new();
        effects.expect_remove_stage_effects().returning(|_, _, _, _| Ok(()));
        effects.expect_confirm_death().times(1).returning(|_, _, _| Ok(()));
        effects.expect_apply_stage_effects().never();

        let progression = progression(
            MockAfflictionStore::new(),
            effects,
            MockNotificationPort::new(),
            MockDicePort::new(),
        );
        let mut instance = instance();
        instance.current_stage = 1;
        progression
            .enter_stage(&mut instance, 2, &TableTime::out_of_combat(0))
            .await
            .unwrap();
        assert_eq!(instance.current_stage, 2);
        assert_eq!(instance.next_save, None);
    }

    #[tokio::test]
    async fn missing_stage_aborts_without_side_effects() {
        let progression = progression(
            MockAfflictionStore::new(),
            MockEffectPort::new(),
            MockNotificationPort::new(),
            MockDicePort::new(),
        );
        let mut instance = instance();
        instance.definition.stages.retain(|s| s.number != 2);
        instance.definition.stages.push(StageDefinition::new(3, "gap"));
        instance.current_stage = 1;

        let err = progression
            .enter_stage(&mut instance, 2, &TableTime::out_of_combat(0))
            .await
            .unwrap_err();
        assert!(matches!(err, AfflictionError::MissingStage { stage: 2, .. }));
        assert_eq!(instance.current_stage, 1);
    }

    #[tokio::test]
    async fn recovering_removes_the_record() {
        let mut store = MockAfflictionStore::new();
        store.expect_delete().times(1).returning(|_, _| Ok(()));
        store.expect_put().never();
        let mut effects = MockEffectPort::new();
        effects
            .expect_remove_stage_effects()
            .withf(|_, _, old, new| *old == 1 && *new == 0)
            .times(1)
            .returning(|_, _, _, _| Ok(()));
        let mut notifier = MockNotificationPort::new();
        notifier.expect_notify().times(2).returning(|_| ());

        let progression = progression(store, effects, notifier, MockDicePort::new());
        let mut instance = instance();
        instance.current_stage = 1;
        let outcome = progression
            .change_stage(
                &mut instance,
                -2,
                0,
                StageCause::Save(DegreeOfSuccess::CriticalSuccess),
                &TableTime::out_of_combat(0),
            )
            .await
            .unwrap();
        assert_eq!(outcome, StageOutcome::Removed(RemovalReason::Recovered));
    }
}
