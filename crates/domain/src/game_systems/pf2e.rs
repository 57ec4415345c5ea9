//! Pathfinder 2nd Edition resolution rules used by afflictions.
//!
//! PF2e uses a total vs DC comparison with four degrees of success.
//! Afflictions build on that:
//! - Stage saves move the affliction up or down by a degree-dependent amount
//! - Virulent afflictions need two consecutive successes to improve
//! - Counteracting compares ranks with a degree-dependent allowance
//! - Treatment grants a bonus or penalty to the next stage save

use serde::{Deserialize, Serialize};
use std::fmt;

/// Natural d20 face that upgrades the degree by one step.
pub const NATURAL_MAX_FACE: i32 = 20;
/// Natural d20 face that downgrades the degree by one step.
pub const NATURAL_MIN_FACE: i32 = 1;

/// Four degrees of success in PF2e.
///
/// Ordered worst to best so `CriticalFailure < Failure < Success < CriticalSuccess`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DegreeOfSuccess {
    /// Miss DC by more than 10, or natural 1 on a failure
    CriticalFailure,
    /// Below DC
    Failure,
    /// Meet or beat DC
    Success,
    /// Beat DC by 10+, or natural 20 on a success
    CriticalSuccess,
}

impl DegreeOfSuccess {
    /// Upgrade the degree by one step (e.g., nat 20).
    pub fn upgrade(self) -> Self {
        match self {
            DegreeOfSuccess::CriticalFailure => DegreeOfSuccess::Failure,
            DegreeOfSuccess::Failure => DegreeOfSuccess::Success,
            DegreeOfSuccess::Success => DegreeOfSuccess::CriticalSuccess,
            DegreeOfSuccess::CriticalSuccess => DegreeOfSuccess::CriticalSuccess,
        }
    }

    /// Downgrade the degree by one step (e.g., nat 1).
    pub fn downgrade(self) -> Self {
        match self {
            DegreeOfSuccess::CriticalSuccess => DegreeOfSuccess::Success,
            DegreeOfSuccess::Success => DegreeOfSuccess::Failure,
            DegreeOfSuccess::Failure => DegreeOfSuccess::CriticalFailure,
            DegreeOfSuccess::CriticalFailure => DegreeOfSuccess::CriticalFailure,
        }
    }

    pub fn is_success(self) -> bool {
        matches!(
            self,
            DegreeOfSuccess::Success | DegreeOfSuccess::CriticalSuccess
        )
    }

    pub fn display_name(self) -> &'static str {
        match self {
            DegreeOfSuccess::CriticalSuccess => "Critical Success",
            DegreeOfSuccess::Success => "Success",
            DegreeOfSuccess::Failure => "Failure",
            DegreeOfSuccess::CriticalFailure => "Critical Failure",
        }
    }

    /// Stage change for an ordinary (non-virulent) stage save.
    ///
    /// Also used for GM-forced progression regardless of virulence.
    pub fn stage_delta(self) -> i32 {
        match self {
            DegreeOfSuccess::CriticalSuccess => -2,
            DegreeOfSuccess::Success => -1,
            DegreeOfSuccess::Failure => 1,
            DegreeOfSuccess::CriticalFailure => 2,
        }
    }
}

impl fmt::Display for DegreeOfSuccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Degree from the total/DC difference alone, before any natural-face shift.
pub fn base_degree(total: i32, dc: i32) -> DegreeOfSuccess {
    let diff = total - dc;
    if diff >= 10 {
        DegreeOfSuccess::CriticalSuccess
    } else if diff >= 0 {
        DegreeOfSuccess::Success
    } else if diff >= -10 {
        DegreeOfSuccess::Failure
    } else {
        DegreeOfSuccess::CriticalFailure
    }
}

/// Determine the degree of success for a check against a DC.
///
/// A natural 20 shifts the result one step up and a natural 1 one step down;
/// any other face (or an unknown face) leaves it alone.
pub fn determine_degree(total: i32, dc: i32, die_face: Option<i32>) -> DegreeOfSuccess {
    let base = base_degree(total, dc);
    match die_face {
        Some(NATURAL_MAX_FACE) => base.upgrade(),
        Some(NATURAL_MIN_FACE) => base.downgrade(),
        _ => base,
    }
}

/// Result of a virulent stage save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirulentStep {
    /// Stage change to apply
    pub delta: i32,
    /// New consecutive-success counter
    pub consecutive_successes: u32,
}

/// Stage change for a virulent affliction.
///
/// A plain success only counts toward improvement; the second consecutive
/// success reduces the stage by one and resets the counter. Every other
/// degree resets the counter.
pub fn virulent_step(degree: DegreeOfSuccess, consecutive_successes: u32) -> VirulentStep {
    match degree {
        DegreeOfSuccess::CriticalSuccess => VirulentStep {
            delta: -1,
            consecutive_successes: 0,
        },
        DegreeOfSuccess::Success if consecutive_successes >= 1 => VirulentStep {
            delta: -1,
            consecutive_successes: 0,
        },
        DegreeOfSuccess::Success => VirulentStep {
            delta: 0,
            consecutive_successes: consecutive_successes + 1,
        },
        DegreeOfSuccess::Failure => VirulentStep {
            delta: 1,
            consecutive_successes: 0,
        },
        DegreeOfSuccess::CriticalFailure => VirulentStep {
            delta: 2,
            consecutive_successes: 0,
        },
    }
}

/// Bonus granted to the next stage save by a treatment check.
pub fn treatment_bonus(degree: DegreeOfSuccess) -> i32 {
    match degree {
        DegreeOfSuccess::CriticalSuccess => 4,
        DegreeOfSuccess::Success => 2,
        DegreeOfSuccess::Failure => 0,
        DegreeOfSuccess::CriticalFailure => -2,
    }
}

/// Level implied by a DC when the source gives no level.
pub fn level_from_dc(dc: i32) -> u32 {
    (dc / 2).max(1) as u32
}

/// Counteract rank of an affliction: half its level, rounded up.
pub fn affliction_rank(level: Option<u32>, dc: Option<i32>) -> u32 {
    let level = level.or_else(|| dc.map(level_from_dc)).unwrap_or(1).max(1);
    level.div_ceil(2)
}

/// How many ranks above the counteract rank a degree can still reach.
///
/// `None` means the attempt can never succeed.
pub fn counteract_allowance(degree: DegreeOfSuccess) -> Option<i32> {
    match degree {
        DegreeOfSuccess::CriticalSuccess => Some(3),
        DegreeOfSuccess::Success => Some(1),
        DegreeOfSuccess::Failure => Some(-1),
        DegreeOfSuccess::CriticalFailure => None,
    }
}

/// Whether a counteract attempt removes an affliction of the given rank.
pub fn counteract_succeeds(degree: DegreeOfSuccess, counteract_rank: u32, target_rank: u32) -> bool {
    match counteract_allowance(degree) {
        Some(allowance) => target_rank as i32 - counteract_rank as i32 <= allowance,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degree_of_success_determination() {
        assert_eq!(determine_degree(20, 18, None), DegreeOfSuccess::Success);
        assert_eq!(determine_degree(10, 18, None), DegreeOfSuccess::Failure);
        assert_eq!(determine_degree(30, 18, None), DegreeOfSuccess::CriticalSuccess);
        assert_eq!(determine_degree(6, 18, None), DegreeOfSuccess::CriticalFailure);
        // Boundaries
        assert_eq!(determine_degree(28, 18, None), DegreeOfSuccess::CriticalSuccess);
        assert_eq!(determine_degree(27, 18, None), DegreeOfSuccess::Success);
        assert_eq!(determine_degree(18, 18, None), DegreeOfSuccess::Success);
        assert_eq!(determine_degree(8, 18, None), DegreeOfSuccess::Failure);
        assert_eq!(determine_degree(7, 18, None), DegreeOfSuccess::CriticalFailure);
    }

    #[test]
    fn natural_faces_shift_one_step() {
        assert_eq!(determine_degree(15, 18, Some(20)), DegreeOfSuccess::Success);
        assert_eq!(determine_degree(20, 18, Some(20)), DegreeOfSuccess::CriticalSuccess);
        assert_eq!(determine_degree(30, 18, Some(20)), DegreeOfSuccess::CriticalSuccess);
        assert_eq!(determine_degree(0, 18, Some(20)), DegreeOfSuccess::Failure);

        assert_eq!(determine_degree(20, 18, Some(1)), DegreeOfSuccess::Failure);
        assert_eq!(determine_degree(30, 18, Some(1)), DegreeOfSuccess::Success);
        assert_eq!(determine_degree(10, 18, Some(1)), DegreeOfSuccess::CriticalFailure);
        assert_eq!(determine_degree(0, 18, Some(1)), DegreeOfSuccess::CriticalFailure);

        assert_eq!(determine_degree(20, 18, Some(12)), DegreeOfSuccess::Success);
    }

    #[test]
    fn degree_is_monotonic_in_total() {
        for dc in [5, 14, 18, 25, 40] {
            for total in -10..60 {
                assert!(base_degree(total, dc) <= base_degree(total + 1, dc));
            }
        }
    }

    #[test]
    fn natural_shift_never_exceeds_one_step() {
        let rank = |d: DegreeOfSuccess| d as i32;
        for dc in [10, 18, 30] {
            for total in -5..50 {
                let base = rank(base_degree(total, dc));
                let up = rank(determine_degree(total, dc, Some(NATURAL_MAX_FACE)));
                let down = rank(determine_degree(total, dc, Some(NATURAL_MIN_FACE)));
                assert!(up >= base && up - base <= 1);
                assert!(down <= base && base - down <= 1);
            }
        }
    }

    #[test]
    fn stage_delta_table() {
        assert_eq!(DegreeOfSuccess::CriticalSuccess.stage_delta(), -2);
        assert_eq!(DegreeOfSuccess::Success.stage_delta(), -1);
        assert_eq!(DegreeOfSuccess::Failure.stage_delta(), 1);
        assert_eq!(DegreeOfSuccess::CriticalFailure.stage_delta(), 2);
    }

    #[test]
    fn virulent_needs_two_consecutive_successes() {
        let first = virulent_step(DegreeOfSuccess::Success, 0);
        assert_eq!(first, VirulentStep { delta: 0, consecutive_successes: 1 });

        let second = virulent_step(DegreeOfSuccess::Success, first.consecutive_successes);
        assert_eq!(second, VirulentStep { delta: -1, consecutive_successes: 0 });

        assert_eq!(virulent_step(DegreeOfSuccess::CriticalSuccess, 1).delta, -1);
        assert_eq!(virulent_step(DegreeOfSuccess::Failure, 1).consecutive_successes, 0);
        assert_eq!(virulent_step(DegreeOfSuccess::CriticalFailure, 0).delta, 2);
    }

    #[test]
    fn treatment_table() {
        assert_eq!(treatment_bonus(DegreeOfSuccess::CriticalSuccess), 4);
        assert_eq!(treatment_bonus(DegreeOfSuccess::Success), 2);
        assert_eq!(treatment_bonus(DegreeOfSuccess::Failure), 0);
        assert_eq!(treatment_bonus(DegreeOfSuccess::CriticalFailure), -2);
    }

    #[test]
    fn affliction_rank_from_level_or_dc() {
        assert_eq!(affliction_rank(Some(9), None), 5);
        assert_eq!(affliction_rank(Some(1), Some(40)), 1);
        // DC 19 -> level 9 -> rank 5
        assert_eq!(affliction_rank(None, Some(19)), 5);
        assert_eq!(affliction_rank(None, Some(1)), 1);
        assert_eq!(affliction_rank(None, None), 1);
    }

    #[test]
    fn counteract_rank_boundary() {
        assert!(counteract_succeeds(DegreeOfSuccess::Success, 4, 5));
        assert!(!counteract_succeeds(DegreeOfSuccess::Failure, 4, 5));
        assert!(counteract_succeeds(DegreeOfSuccess::Failure, 4, 3));
        assert!(counteract_succeeds(DegreeOfSuccess::CriticalSuccess, 4, 7));
        assert!(!counteract_succeeds(DegreeOfSuccess::CriticalSuccess, 4, 8));
        assert!(!counteract_succeeds(DegreeOfSuccess::CriticalFailure, 10, 1));
    }
}
