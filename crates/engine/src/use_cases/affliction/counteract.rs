//! Attempts to counteract an affliction outright (spells, alchemical cures).

use std::sync::Arc;

use afflictor_domain::{
    affliction_rank, counteract_succeeds, determine_degree, AfflictionEvent, DegreeOfSuccess,
    InstanceId, RemovalReason, SaveRoll, TargetId,
};

use super::progression::Progression;
use super::{load_instance, AfflictionError};
use crate::infrastructure::ports::AfflictionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounteractOutcome {
    pub success: bool,
    pub degree: DegreeOfSuccess,
    pub counteract_rank: u32,
    pub affliction_rank: u32,
}

pub struct Counteract {
    progression: Arc<Progression>,
    store: Arc<dyn AfflictionStore>,
}

impl Counteract {
    pub fn new(progression: Arc<Progression>, store: Arc<dyn AfflictionStore>) -> Self {
        Self { progression, store }
    }

    /// Roll a counteract check of `counteract_rank` against the affliction's
    /// DC. Success removes it; failure only reports.
    pub async fn execute(
        &self,
        target_id: TargetId,
        instance_id: InstanceId,
        check: SaveRoll,
        dc: i32,
        counteract_rank: u32,
    ) -> Result<CounteractOutcome, AfflictionError> {
        let instance = load_instance(self.store.as_ref(), target_id, instance_id).await?;
        let definition = &instance.definition;
        let target_rank = affliction_rank(definition.level, definition.valid_dc());
        let degree = determine_degree(check.total, dc, check.die_face);
        let success = counteract_succeeds(degree, counteract_rank, target_rank);

        tracing::info!(
            %target_id,
            affliction = %instance.name(),
            degree = degree.display_name(),
            counteract_rank,
            affliction_rank = target_rank,
            success,
            "Counteract attempted"
        );
        self.progression
            .notify(
                &instance,
                AfflictionEvent::CounteractResult {
                    success,
                    degree,
                    counteract_rank,
                    affliction_rank: target_rank,
                },
            )
            .await;
        if success {
            self.progression
                .remove(&instance, RemovalReason::Counteracted)
                .await?;
        }
        Ok(CounteractOutcome {
            success,
            degree,
            counteract_rank,
            affliction_rank: target_rank,
        })
    }
}
