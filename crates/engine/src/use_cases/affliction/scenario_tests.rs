//! End-to-end affliction scenarios against the in-memory adapters.

use std::sync::Arc;

use afflictor_domain::{
    AfflictionDefinition, AfflictionEvent, AfflictionType, CombatId, CorrelationId,
    DegreeOfSuccess, DurationUnit, DurationValue, InstanceId, RemovalReason, SaveRoll,
    StageDefinition, TargetId,
};

use super::{
    AfflictionError, DefinitionEdit, InitialSaveOutcome, SaveOutcome, StageOutcome, SubmitOutcome,
};
use crate::app::{App, InMemoryHost};
use crate::infrastructure::clock::FixedRandom;
use crate::infrastructure::effects::EffectCall;
use crate::infrastructure::ports::{AfflictionStore, ConfirmationKind};
use crate::infrastructure::settings::EngineSettings;

fn app(settings: EngineSettings) -> (App, InMemoryHost) {
    App::in_memory_with_random(settings, Arc::new(FixedRandom(2)))
}

fn poison(stage_duration: DurationValue) -> AfflictionDefinition {
    AfflictionDefinition::new("Black Adder Venom", AfflictionType::Poison)
        .with_dc(18)
        .with_stage(StageDefinition::new(1, "1d6 poison").with_duration(stage_duration.clone()))
        .with_stage(StageDefinition::new(2, "1d8 poison").with_duration(stage_duration.clone()))
        .with_stage(StageDefinition::new(3, "2d6 poison").with_duration(stage_duration))
        .with_key("black-adder-venom")
}

fn one_round() -> DurationValue {
    DurationValue::fixed(1, DurationUnit::Round)
}

async fn afflict(
    app: &App,
    target_id: TargetId,
    definition: AfflictionDefinition,
    total: i32,
) -> InstanceId {
    let instance = app
        .afflictions
        .prompt_initial_save
        .execute(target_id, definition, None)
        .await
        .unwrap();
    app.afflictions
        .initial_save
        .execute(target_id, instance.id, SaveRoll::new(total))
        .await
        .unwrap();
    instance.id
}

async fn stage_of(host: &InMemoryHost, target_id: TargetId, id: InstanceId) -> i32 {
    host.store.get(target_id).await.unwrap()[&id].current_stage
}

#[tokio::test]
async fn basic_poison_progresses_and_recovers() {
    let (app, host) = app(EngineSettings::default());
    let target_id = TargetId::new();

    let instance = app
        .afflictions
        .prompt_initial_save
        .execute(target_id, poison(one_round()), None)
        .await
        .unwrap();
    let outcome = app
        .afflictions
        .initial_save
        .execute(target_id, instance.id, SaveRoll::new(10))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        InitialSaveOutcome::Afflicted {
            degree: DegreeOfSuccess::Failure,
            stage: 1
        }
    );
    assert_eq!(stage_of(&host, target_id, instance.id).await, 1);

    let result = app
        .afflictions
        .stage_save
        .execute(target_id, instance.id, SaveRoll::new(30))
        .await
        .unwrap();
    assert_eq!(result.save.degree, DegreeOfSuccess::CriticalSuccess);
    assert_eq!(result.outcome, StageOutcome::Removed(RemovalReason::Recovered));
    assert_eq!(host.store.instance_count(), 0);

    let events = host.notifier.event_types().await;
    assert_eq!(events, vec!["afflicted", "recovered", "removed"]);
}

#[tokio::test]
async fn successful_initial_save_leaves_nothing_behind() {
    let (app, host) = app(EngineSettings::default());
    let target_id = TargetId::new();
    afflict(&app, target_id, poison(one_round()), 25).await;

    assert_eq!(host.store.instance_count(), 0);
    assert_eq!(host.notifier.event_types().await, vec!["resisted"]);
}

#[tokio::test]
async fn virulent_needs_two_consecutive_successes() {
    let (app, host) = app(EngineSettings::default());
    let target_id = TargetId::new();
    let id = afflict(&app, target_id, poison(one_round()).virulent(), 5).await;
    assert_eq!(stage_of(&host, target_id, id).await, 2);

    let first = app
        .afflictions
        .stage_save
        .execute(target_id, id, SaveRoll::new(18))
        .await
        .unwrap();
    assert_eq!(first.outcome, StageOutcome::Unchanged { stage: 2 });

    let second = app
        .afflictions
        .stage_save
        .execute(target_id, id, SaveRoll::new(19))
        .await
        .unwrap();
    assert_eq!(second.outcome.stage(), Some(1));

    let stored = &host.store.get(target_id).await.unwrap()[&id];
    assert_eq!(stored.virulent_consecutive_successes, 0);
}

#[tokio::test]
async fn onset_then_critical_failure_lands_on_stage_two() {
    let (app, host) = app(EngineSettings::default());
    let target_id = TargetId::new();
    host.table_clock.start_combat(CombatId::new()).await;

    let definition = poison(one_round()).with_onset(DurationValue::fixed(2, DurationUnit::Round));
    let instance = app
        .afflictions
        .prompt_initial_save
        .execute(target_id, definition, None)
        .await
        .unwrap();
    let outcome = app
        .afflictions
        .initial_save
        .execute(target_id, instance.id, SaveRoll::new(5))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        InitialSaveOutcome::Onset {
            degree: DegreeOfSuccess::CriticalFailure,
            remaining_seconds: 12
        }
    );

    host.table_clock.next_round().await;
    let report = app.afflictions.tick.execute().await.unwrap();
    assert_eq!(report.onset_ended, 0);
    assert_eq!(stage_of(&host, target_id, instance.id).await, 0);

    host.table_clock.next_round().await;
    let report = app.afflictions.tick.execute().await.unwrap();
    assert_eq!(report.onset_ended, 1);
    assert_eq!(stage_of(&host, target_id, instance.id).await, 2);
}

#[tokio::test]
async fn counteract_respects_the_rank_boundary() {
    let (app, host) = app(EngineSettings::default());
    let target_id = TargetId::new();
    let mut definition = poison(one_round());
    definition.level = Some(9);

    let id = afflict(&app, target_id, definition, 10).await;
    let failed = app
        .afflictions
        .counteract
        .execute(target_id, id, SaveRoll::new(20), 26, 4)
        .await
        .unwrap();
    assert!(!failed.success);
    assert_eq!(failed.affliction_rank, 5);
    assert_eq!(host.store.instance_count(), 1);

    let succeeded = app
        .afflictions
        .counteract
        .execute(target_id, id, SaveRoll::new(27), 26, 4)
        .await
        .unwrap();
    assert!(succeeded.success);
    assert_eq!(host.store.instance_count(), 0);
}

#[tokio::test]
async fn poison_reexposure_raises_the_existing_instance() {
    let (app, host) = app(EngineSettings::default());
    let target_id = TargetId::new();
    let first = afflict(&app, target_id, poison(one_round()), 10).await;
    assert_eq!(stage_of(&host, target_id, first).await, 1);

    let second = app
        .afflictions
        .prompt_initial_save
        .execute(target_id, poison(one_round()), None)
        .await
        .unwrap();
    let outcome = app
        .afflictions
        .initial_save
        .execute(target_id, second.id, SaveRoll::new(10))
        .await
        .unwrap();

    assert!(matches!(outcome, InitialSaveOutcome::Exposure { existing, .. } if existing == first));
    assert_eq!(host.store.instance_count(), 1);
    assert_eq!(stage_of(&host, target_id, first).await, 2);
    assert!(host.notifier.event_types().await.contains(&"re_exposure"));
}

#[tokio::test]
async fn disease_exposure_creates_a_separate_instance() {
    let (app, host) = app(EngineSettings::default());
    let target_id = TargetId::new();
    let mut disease = poison(one_round());
    disease.affliction_type = AfflictionType::Disease;

    afflict(&app, target_id, disease.clone(), 10).await;
    afflict(&app, target_id, disease, 10).await;
    assert_eq!(host.store.instance_count(), 2);
}

#[tokio::test]
async fn max_duration_fires_exactly_once() {
    let (app, host) = app(EngineSettings::default());
    let target_id = TargetId::new();
    let definition = poison(DurationValue::fixed(10, DurationUnit::Minute))
        .with_max_duration(DurationValue::fixed(1, DurationUnit::Minute));
    let id = afflict(&app, target_id, definition, 10).await;

    let mut expired = 0;
    for seconds in [30, 40, 60, 60] {
        host.table_clock.advance_world(seconds).await;
        expired += app.afflictions.tick.execute().await.unwrap().expired;
    }
    assert_eq!(expired, 1);

    let notices = host.notifier.notices().await;
    let expiry_notices = notices
        .iter()
        .filter(|n| matches!(n.event, AfflictionEvent::MaxDurationExpired { .. }))
        .count();
    assert_eq!(expiry_notices, 1);

    let stored = &host.store.get(target_id).await.unwrap()[&id];
    assert!(stored.max_duration_expired);
    assert_eq!(stored.current_stage, 1);

    app.afflictions
        .accept_expiry
        .execute(target_id, id)
        .await
        .unwrap();
    assert!(host.notifier.event_types().await.contains(&"expiry_accepted"));
}

#[tokio::test]
async fn combat_save_comes_due_on_the_next_round() {
    let (app, host) = app(EngineSettings::default());
    let target_id = TargetId::new();
    host.table_clock.start_combat(CombatId::new()).await;
    host.table_clock.set_initiative(target_id, 15).await;
    let id = afflict(&app, target_id, poison(one_round()), 10).await;

    let report = app.afflictions.tick.execute().await.unwrap();
    assert!(report.due.is_empty());

    host.table_clock.next_round().await;
    let report = app.afflictions.tick.execute().await.unwrap();
    assert_eq!(report.due.len(), 1);
    assert_eq!(report.due[0].instance_id, id);

    // Same window, no second notice.
    app.afflictions.tick.execute().await.unwrap();
    let due_notices = host
        .notifier
        .event_types()
        .await
        .into_iter()
        .filter(|event| *event == "stage_save_due")
        .count();
    assert_eq!(due_notices, 1);
}

#[tokio::test]
async fn confirmation_uses_the_reroll_and_applies_once() {
    let settings = EngineSettings {
        require_confirmation: true,
        ..EngineSettings::default()
    };
    let (app, host) = app(settings);
    let target_id = TargetId::new();
    let instance = app
        .afflictions
        .prompt_initial_save
        .execute(target_id, poison(one_round()), None)
        .await
        .unwrap();

    let correlation_id = CorrelationId::new();
    host.rolls.record(correlation_id, SaveRoll::new(8));
    let submitted = app
        .afflictions
        .submit_save
        .execute(correlation_id, target_id, instance.id, ConfirmationKind::InitialSave)
        .await
        .unwrap();
    assert!(matches!(
        submitted,
        SubmitOutcome::Pending(preview) if preview.save.degree == DegreeOfSuccess::Failure
    ));
    assert_eq!(stage_of(&host, target_id, instance.id).await, -1);

    // A reroll lands before the GM confirms.
    host.rolls.record(correlation_id, SaveRoll::new(28));
    let applied = app
        .afflictions
        .confirm_save
        .execute(correlation_id)
        .await
        .unwrap();
    assert_eq!(
        applied,
        SaveOutcome::Initial(InitialSaveOutcome::Resisted {
            degree: DegreeOfSuccess::CriticalSuccess
        })
    );
    assert_eq!(host.store.instance_count(), 0);

    let again = app.afflictions.confirm_save.execute(correlation_id).await;
    assert!(matches!(again, Err(AfflictionError::ConfirmationConsumed(_))));
}

#[tokio::test]
async fn edited_definition_reaches_running_instances() {
    let (app, host) = app(EngineSettings::default());
    let target_id = TargetId::new();
    let id = afflict(&app, target_id, poison(one_round()), 5).await;
    assert_eq!(stage_of(&host, target_id, id).await, 2);

    app.afflictions
        .edit_definition
        .execute(
            poison(one_round()),
            vec![DefinitionEdit::RemoveStage(3), DefinitionEdit::RemoveStage(2)],
            None,
        )
        .await
        .unwrap();
    let updated = app
        .afflictions
        .apply_edited_definition
        .execute("black-adder-venom")
        .await
        .unwrap();
    assert_eq!(updated, 1);

    let stored = &host.store.get(target_id).await.unwrap()[&id];
    assert_eq!(stored.stage_count(), 1);
    assert_eq!(stored.current_stage, 1);

    let calls = host.effects.calls().await;
    assert!(calls.contains(&EffectCall::Remove {
        target_id,
        instance_id: id,
        old_stage: 2,
        new_stage: 1,
    }));
    assert_eq!(
        calls.last(),
        Some(&EffectCall::Apply {
            target_id,
            instance_id: id,
            stage: 1,
        })
    );
}
