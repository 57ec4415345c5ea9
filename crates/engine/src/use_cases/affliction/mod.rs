//! Affliction lifecycle use cases.
//!
//! An affliction instance moves through these phases:
//! 1. `PromptInitialSave` creates it, awaiting the target's initial save
//! 2. `HandleInitialSave` resists it, starts onset, or enters a stage
//! 3. `Tick` counts down onset and maximum duration and flags due saves
//! 4. `HandleStageSave` moves it between stages until recovery
//!
//! Treatment, counteracting, exposure and GM actions mutate it along the way.
//! Every transition is reported through the notification port.

use std::sync::Arc;

use afflictor_domain::{
    AfflictionInstance, CorrelationId, DegreeOfSuccess, DomainError, InstanceId, RemovalReason,
    StageTransition, TargetId,
};

use crate::infrastructure::ports::{AfflictionStore, EffectError, RepoError};
use crate::parsing::ParseError;

mod catalog;
mod confirmation;
mod counteract;
mod exposure;
mod initial_save;
mod manual;
mod progression;
mod stage_save;
mod tick;
mod treatment;

#[cfg(test)]
mod scenario_tests;

pub use catalog::{ApplyEditedDefinition, DefinitionEdit, EditDefinition, ResolveDefinition};
pub use confirmation::{ConfirmSave, PreviewSave, SaveOutcome, SavePreview, SubmitOutcome, SubmitSave};
pub use counteract::{Counteract, CounteractOutcome};
pub use exposure::ApplyExposure;
pub use initial_save::{HandleInitialSave, InitialSaveOutcome, PromptInitialSave};
pub use manual::{AcceptExpiry, Cleanse, ManualStageChange, RemoveAffliction};
pub use progression::{Progression, StageCause};
pub use stage_save::{HandleStageSave, StageSaveOutcome};
pub use tick::{DueSave, Tick, TickReport};
pub use treatment::{ApplyTreatment, TreatmentOutcome};

/// Container for affliction use cases.
pub struct AfflictionUseCases {
    pub prompt_initial_save: Arc<PromptInitialSave>,
    pub initial_save: Arc<HandleInitialSave>,
    pub stage_save: Arc<HandleStageSave>,
    pub tick: Arc<Tick>,
    pub exposure: Arc<ApplyExposure>,
    pub manual_change: Arc<ManualStageChange>,
    pub remove: Arc<RemoveAffliction>,
    pub accept_expiry: Arc<AcceptExpiry>,
    pub cleanse: Arc<Cleanse>,
    pub treatment: Arc<ApplyTreatment>,
    pub counteract: Arc<Counteract>,
    pub preview_save: Arc<PreviewSave>,
    pub confirm_save: Arc<ConfirmSave>,
    pub submit_save: Arc<SubmitSave>,
    pub resolve_definition: Arc<ResolveDefinition>,
    pub edit_definition: Arc<EditDefinition>,
    pub apply_edited_definition: Arc<ApplyEditedDefinition>,
}

#[derive(Debug, thiserror::Error)]
pub enum AfflictionError {
    #[error("{0} has no usable save DC")]
    MissingDc(String),
    #[error("{affliction} has no stage {stage}")]
    MissingStage { affliction: String, stage: u32 },
    #[error("{0} has no stages and cannot afflict anyone")]
    Unusable(String),
    #[error("Affliction instance not found: {0}")]
    InstanceNotFound(InstanceId),
    #[error("{0} is not awaiting an initial save")]
    NotAwaitingInitialSave(String),
    #[error("{0} is not at a stage")]
    NotStaged(String),
    #[error("{0} was already treated at this stage")]
    AlreadyTreated(String),
    #[error("Confirmation not found: {0}")]
    ConfirmationNotFound(CorrelationId),
    #[error("Confirmation {0} was already applied")]
    ConfirmationConsumed(CorrelationId),
    #[error("No roll recorded for {0}")]
    NoRoll(CorrelationId),
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
    #[error("Effect error: {0}")]
    Effect(#[from] EffectError),
}

/// What a stage move did to an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    Changed(StageTransition),
    Unchanged { stage: u32 },
    Removed(RemovalReason),
}

impl StageOutcome {
    /// Stage the instance is at afterwards, or `None` once removed.
    pub fn stage(&self) -> Option<u32> {
        match self {
            StageOutcome::Changed(transition) => Some(transition.new_stage),
            StageOutcome::Unchanged { stage } => Some(*stage),
            StageOutcome::Removed(_) => None,
        }
    }
}

/// A save result as the table reports it, with the DC it was made against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedSave {
    pub degree: DegreeOfSuccess,
    pub total: i32,
    pub dc: i32,
}

pub(crate) async fn load_instance(
    store: &dyn AfflictionStore,
    target_id: TargetId,
    instance_id: InstanceId,
) -> Result<AfflictionInstance, AfflictionError> {
    store
        .get(target_id)
        .await?
        .remove(&instance_id)
        .ok_or(AfflictionError::InstanceNotFound(instance_id))
}

/// Stage number of a staged instance, or `NotStaged`.
pub(crate) fn staged(instance: &AfflictionInstance) -> Result<u32, AfflictionError> {
    instance
        .current_stage_number()
        .ok_or_else(|| AfflictionError::NotStaged(instance.name().to_string()))
}
