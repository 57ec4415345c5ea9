//! Game system rules.
//!
//! Afflictions follow Pathfinder 2e resolution: four degrees of success,
//! rank-based counteracting, and treatment bonuses.

mod pf2e;

pub use pf2e::{
    affliction_rank, base_degree, counteract_allowance, counteract_succeeds, determine_degree,
    level_from_dc, treatment_bonus, virulent_step, DegreeOfSuccess, VirulentStep,
    NATURAL_MAX_FACE, NATURAL_MIN_FACE,
};
