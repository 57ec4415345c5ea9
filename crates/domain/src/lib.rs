//! Affliction domain: definitions, running instances, and the Pathfinder 2e
//! rules that move them between stages.
//!
//! This crate is pure. It performs no I/O, holds no clocks, and takes
//! randomness as closures so every rule can be tested deterministically.

pub mod entities;
pub mod error;
pub mod events;
pub mod game_systems;
pub mod ids;
pub mod value_objects;

pub use entities::{
    AfflictionDefinition, AfflictionInstance, AfflictionOverride, AfflictionType,
    ConditionEntry, DamageEntry, MultipleExposure, NextSave, StageDefinition, StagePhase,
    StageTarget, WeaknessEntry, AWAITING_INITIAL_SAVE, DEFAULT_SAVE_ABILITY,
};

pub use error::DomainError;
pub use events::{AfflictionEvent, AfflictionNotice, RemovalReason, StageTransition};

pub use game_systems::{
    affliction_rank, base_degree, counteract_allowance, counteract_succeeds, determine_degree,
    level_from_dc, treatment_bonus, virulent_step, DegreeOfSuccess, VirulentStep,
    NATURAL_MAX_FACE, NATURAL_MIN_FACE,
};

pub use ids::{CombatId, CorrelationId, InstanceId, TargetId, UserId};

pub use value_objects::{
    seconds_to_rounds, DiceFormula, DiceParseError, DiceRollResult, DurationUnit,
    DurationValue, SaveRoll, TableTime, TimingMode, ROUND_SECONDS,
};
