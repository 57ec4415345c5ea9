//! Domain entities - Core business objects with identity

mod affliction;
mod instance;

pub use affliction::{
    AfflictionDefinition, AfflictionOverride, AfflictionType, ConditionEntry, DamageEntry,
    MultipleExposure, StageDefinition, WeaknessEntry, DEFAULT_SAVE_ABILITY,
};
pub use instance::{AfflictionInstance, NextSave, StagePhase, StageTarget, AWAITING_INITIAL_SAVE};
