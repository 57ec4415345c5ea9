//! Two-phase save resolution.
//!
//! Phase one computes and shows the outcome of a save without touching the
//! instance. Phase two applies it, re-reading the roll so a reroll made in
//! between is the one that counts. A correlation id applies at most once.

use std::sync::Arc;

use afflictor_domain::{CorrelationId, InstanceId, SaveRoll, TargetId};

use super::initial_save::{HandleInitialSave, InitialSaveOutcome};
use super::stage_save::{HandleStageSave, StageSaveOutcome};
use super::{load_instance, AfflictionError, ResolvedSave};
use crate::infrastructure::ports::{
    AfflictionStore, ClockPort, ConfirmationKind, ConfirmationStore, PendingConfirmation,
    RollLookup,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavePreview {
    pub correlation_id: CorrelationId,
    pub kind: ConfirmationKind,
    pub save: ResolvedSave,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Initial(InitialSaveOutcome),
    Stage(StageSaveOutcome),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Waiting for an explicit confirmation
    Pending(SavePreview),
    Applied(SaveOutcome),
}

async fn current_roll(
    rolls: &dyn RollLookup,
    correlation_id: CorrelationId,
) -> Result<SaveRoll, AfflictionError> {
    rolls
        .current_roll(correlation_id)
        .await?
        .ok_or(AfflictionError::NoRoll(correlation_id))
}

pub struct PreviewSave {
    store: Arc<dyn AfflictionStore>,
    confirmations: Arc<dyn ConfirmationStore>,
    rolls: Arc<dyn RollLookup>,
    clock: Arc<dyn ClockPort>,
}

impl PreviewSave {
    pub fn new(
        store: Arc<dyn AfflictionStore>,
        confirmations: Arc<dyn ConfirmationStore>,
        rolls: Arc<dyn RollLookup>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            store,
            confirmations,
            rolls,
            clock,
        }
    }

    pub async fn execute(
        &self,
        correlation_id: CorrelationId,
        target_id: TargetId,
        instance_id: InstanceId,
        kind: ConfirmationKind,
    ) -> Result<SavePreview, AfflictionError> {
        let instance = load_instance(self.store.as_ref(), target_id, instance_id).await?;
        let roll = current_roll(self.rolls.as_ref(), correlation_id).await?;
        let save = match kind {
            ConfirmationKind::InitialSave => {
                let degree = HandleInitialSave::degree_for(&instance, roll)?;
                ResolvedSave {
                    degree,
                    total: roll.total,
                    dc: instance.definition.valid_dc().unwrap_or_default(),
                }
            }
            ConfirmationKind::StageSave => HandleStageSave::resolve(&instance, roll)?,
        };

        self.confirmations
            .save(&PendingConfirmation {
                correlation_id,
                computed_at: self.clock.now(),
                target_id,
                instance_id,
                kind,
                consumed: false,
            })
            .await?;
        tracing::debug!(
            %correlation_id,
            affliction = %instance.name(),
            ?kind,
            degree = save.degree.display_name(),
            "Save outcome awaiting confirmation"
        );
        Ok(SavePreview {
            correlation_id,
            kind,
            save,
        })
    }
}

pub struct ConfirmSave {
    confirmations: Arc<dyn ConfirmationStore>,
    rolls: Arc<dyn RollLookup>,
    initial_save: Arc<HandleInitialSave>,
    stage_save: Arc<HandleStageSave>,
}

impl ConfirmSave {
    pub fn new(
        confirmations: Arc<dyn ConfirmationStore>,
        rolls: Arc<dyn RollLookup>,
        initial_save: Arc<HandleInitialSave>,
        stage_save: Arc<HandleStageSave>,
    ) -> Self {
        Self {
            confirmations,
            rolls,
            initial_save,
            stage_save,
        }
    }

    pub async fn execute(&self, correlation_id: CorrelationId) -> Result<SaveOutcome, AfflictionError> {
        let mut pending = self
            .confirmations
            .get(correlation_id)
            .await?
            .ok_or(AfflictionError::ConfirmationNotFound(correlation_id))?;
        if pending.consumed {
            tracing::warn!(%correlation_id, "Ignoring confirmation that was already applied");
            return Err(AfflictionError::ConfirmationConsumed(correlation_id));
        }

        let roll = current_roll(self.rolls.as_ref(), correlation_id).await?;
        let outcome = dispatch(
            &self.initial_save,
            &self.stage_save,
            pending.kind,
            pending.target_id,
            pending.instance_id,
            roll,
        )
        .await?;

        pending.consumed = true;
        self.confirmations.save(&pending).await?;
        tracing::info!(%correlation_id, kind = ?pending.kind, "Confirmed save applied");
        Ok(outcome)
    }
}

async fn dispatch(
    initial_save: &HandleInitialSave,
    stage_save: &HandleStageSave,
    kind: ConfirmationKind,
    target_id: TargetId,
    instance_id: InstanceId,
    roll: SaveRoll,
) -> Result<SaveOutcome, AfflictionError> {
    Ok(match kind {
        ConfirmationKind::InitialSave => {
            SaveOutcome::Initial(initial_save.execute(target_id, instance_id, roll).await?)
        }
        ConfirmationKind::StageSave => {
            SaveOutcome::Stage(stage_save.execute(target_id, instance_id, roll).await?)
        }
    })
}

/// Entry point for a save rolled at the table. Applies it at once, or holds
/// it for confirmation when the table requires one.
pub struct SubmitSave {
    require_confirmation: bool,
    rolls: Arc<dyn RollLookup>,
    preview: Arc<PreviewSave>,
    initial_save: Arc<HandleInitialSave>,
    stage_save: Arc<HandleStageSave>,
}

impl SubmitSave {
    pub fn new(
        require_confirmation: bool,
        rolls: Arc<dyn RollLookup>,
        preview: Arc<PreviewSave>,
        initial_save: Arc<HandleInitialSave>,
        stage_save: Arc<HandleStageSave>,
    ) -> Self {
        Self {
            require_confirmation,
            rolls,
            preview,
            initial_save,
            stage_save,
        }
    }

    pub async fn execute(
        &self,
        correlation_id: CorrelationId,
        target_id: TargetId,
        instance_id: InstanceId,
        kind: ConfirmationKind,
    ) -> Result<SubmitOutcome, AfflictionError> {
        if self.require_confirmation {
            let preview = self
                .preview
                .execute(correlation_id, target_id, instance_id, kind)
                .await?;
            return Ok(SubmitOutcome::Pending(preview));
        }
        let roll = current_roll(self.rolls.as_ref(), correlation_id).await?;
        let outcome = dispatch(
            &self.initial_save,
            &self.stage_save,
            kind,
            target_id,
            instance_id,
            roll,
        )
        .await?;
        Ok(SubmitOutcome::Applied(outcome))
    }
}
