//! Treatment checks (Treat Poison, Treat Disease) against an active affliction.

use std::sync::Arc;

use afflictor_domain::{
    determine_degree, treatment_bonus, AfflictionEvent, DegreeOfSuccess, DomainError, InstanceId,
    SaveRoll, TargetId,
};

use super::progression::Progression;
use super::{load_instance, staged, AfflictionError};
use crate::infrastructure::ports::AfflictionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreatmentOutcome {
    pub degree: DegreeOfSuccess,
    /// Modifier applied to the next stage save
    pub bonus: i32,
}

pub struct ApplyTreatment {
    progression: Arc<Progression>,
    store: Arc<dyn AfflictionStore>,
}

impl ApplyTreatment {
    pub fn new(progression: Arc<Progression>, store: Arc<dyn AfflictionStore>) -> Self {
        Self { progression, store }
    }

    pub async fn execute(
        &self,
        target_id: TargetId,
        instance_id: InstanceId,
        check: SaveRoll,
        dc: i32,
    ) -> Result<TreatmentOutcome, AfflictionError> {
        let mut instance = load_instance(self.store.as_ref(), target_id, instance_id).await?;
        let stage = staged(&instance)?;

        let degree = determine_degree(check.total, dc, check.die_face);
        let bonus = treatment_bonus(degree);
        if let Err(e) = instance.apply_treatment(bonus) {
            return Err(match e {
                DomainError::Constraint(_) => {
                    AfflictionError::AlreadyTreated(instance.name().to_string())
                }
                other => other.into(),
            });
        }
        self.store.put(&instance).await?;

        tracing::info!(
            %target_id,
            affliction = %instance.name(),
            stage,
            degree = degree.display_name(),
            bonus,
            "Treatment applied"
        );
        self.progression
            .notify(&instance, AfflictionEvent::TreatmentApplied { degree, bonus })
            .await;
        Ok(TreatmentOutcome { degree, bonus })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use afflictor_domain::{
        AfflictionDefinition, AfflictionInstance, AfflictionType, StageDefinition, TableTime,
    };
    use chrono::Utc;
    use std::collections::HashMap;

    use crate::infrastructure::clock::FixedRandom;
    use crate::infrastructure::ports::{
        MockAfflictionStore, MockDicePort, MockEffectPort, MockNotificationPort,
        MockTableClockPort,
    };
    use crate::infrastructure::settings::EngineSettings;

    fn treatment(
        stored: AfflictionInstance,
        mut store: MockAfflictionStore,
        notifier: MockNotificationPort,
    ) -> ApplyTreatment {
        let id = stored.id;
        store
            .expect_get()
            .returning(move |_| Ok(HashMap::from([(id, stored.clone())])));
        let store: Arc<dyn AfflictionStore> = Arc::new(store);
        let progression = Progression::new(
            store.clone(),
            Arc::new(MockEffectPort::new()),
            Arc::new(notifier),
            Arc::new(MockDicePort::new()),
            Arc::new(FixedRandom(1)),
            Arc::new(MockTableClockPort::new()),
            EngineSettings::default(),
        );
        ApplyTreatment::new(Arc::new(progression), store)
    }

    fn staged_instance() -> AfflictionInstance {
        let definition = AfflictionDefinition::new("Goblin Pox", AfflictionType::Disease)
            .with_dc(17)
            .with_stage(StageDefinition::new(1, "sickened 1"));
        let mut instance = AfflictionInstance::awaiting_initial_save(
            TargetId::new(),
            definition,
            Utc::now(),
            &TableTime::out_of_combat(0),
        );
        instance.current_stage = 1;
        instance
    }

    #[tokio::test]
    async fn critical_success_grants_four() {
        let stored = staged_instance();
        let (target_id, id) = (stored.target_id, stored.id);
        let mut store = MockAfflictionStore::new();
        store
            .expect_put()
            .withf(|instance| instance.treatment_bonus == 4 && instance.treated_this_stage)
            .times(1)
            .returning(|_| Ok(()));
        let mut notifier = MockNotificationPort::new();
        notifier
            .expect_notify()
            .withf(|notice| {
                notice.event
                    == AfflictionEvent::TreatmentApplied {
                        degree: DegreeOfSuccess::CriticalSuccess,
                        bonus: 4,
                    }
            })
            .times(1)
            .returning(|_| ());

        let outcome = treatment(stored, store, notifier)
            .execute(target_id, id, SaveRoll::new(27), 17)
            .await
            .unwrap();
        assert_eq!(outcome.bonus, 4);
    }

    #[tokio::test]
    async fn second_treatment_on_a_stage_is_rejected() {
        let mut stored = staged_instance();
        stored.apply_treatment(2).unwrap();
        let (target_id, id) = (stored.target_id, stored.id);
        let mut store = MockAfflictionStore::new();
        store.expect_put().never();
        let mut notifier = MockNotificationPort::new();
        notifier.expect_notify().never();

        let err = treatment(stored, store, notifier)
            .execute(target_id, id, SaveRoll::new(5), 17)
            .await
            .unwrap_err();
        assert!(matches!(err, AfflictionError::AlreadyTreated(name) if name == "Goblin Pox"));
    }
}
