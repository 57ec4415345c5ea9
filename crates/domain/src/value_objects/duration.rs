//! Semantic durations ("1 round", "1d4 hours", "6 days").
//!
//! A duration is either a fixed amount or a dice formula. Dice formulas stay
//! unrolled until the engine actually needs the length, then the rolled value
//! is frozen onto the duration so later reads never re-roll.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Seconds in one combat round.
pub const ROUND_SECONDS: i64 = 6;

/// Units an affliction duration may be expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationUnit {
    Round,
    Minute,
    Hour,
    Day,
    Week,
}

impl DurationUnit {
    /// Fixed multiplier table.
    pub fn seconds(&self) -> i64 {
        match self {
            DurationUnit::Round => ROUND_SECONDS,
            DurationUnit::Minute => 60,
            DurationUnit::Hour => 3_600,
            DurationUnit::Day => 86_400,
            DurationUnit::Week => 604_800,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DurationUnit::Round => "round",
            DurationUnit::Minute => "minute",
            DurationUnit::Hour => "hour",
            DurationUnit::Day => "day",
            DurationUnit::Week => "week",
        }
    }
}

impl fmt::Display for DurationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DurationUnit {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let singular = lower.strip_suffix('s').unwrap_or(&lower);
        match singular {
            "round" | "rd" => Ok(DurationUnit::Round),
            "minute" | "min" => Ok(DurationUnit::Minute),
            "hour" | "hr" => Ok(DurationUnit::Hour),
            "day" => Ok(DurationUnit::Day),
            "week" | "wk" => Ok(DurationUnit::Week),
            _ => Err(DomainError::parse(format!("Unknown duration unit: {}", s))),
        }
    }
}

/// Convert seconds into whole combat rounds, rounding up.
pub fn seconds_to_rounds(seconds: i64) -> i64 {
    if seconds <= 0 {
        return 0;
    }
    (seconds + ROUND_SECONDS - 1) / ROUND_SECONDS
}

/// A duration that may still be waiting for its dice to be rolled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DurationValue {
    /// Authoritative amount for fixed durations, and for dice durations
    /// once resolved.
    pub value: Option<u32>,
    pub unit: DurationUnit,
    /// Dice formula, authoritative only while `value` is unset.
    pub formula: Option<String>,
    /// Whether the duration came from a dice formula.
    pub is_dice: bool,
}

impl DurationValue {
    pub fn fixed(value: u32, unit: DurationUnit) -> Self {
        Self {
            value: Some(value),
            unit,
            formula: None,
            is_dice: false,
        }
    }

    pub fn dice(formula: impl Into<String>, unit: DurationUnit) -> Self {
        Self {
            value: None,
            unit,
            formula: Some(formula.into()),
            is_dice: true,
        }
    }

    /// True while a dice formula has not been rolled yet.
    pub fn needs_roll(&self) -> bool {
        self.value.is_none() && self.formula.is_some()
    }

    /// Length in seconds, or `None` if the dice have not been rolled.
    pub fn to_seconds(&self) -> Option<i64> {
        self.value.map(|v| v as i64 * self.unit.seconds())
    }

    /// Length in seconds, rolling the formula at most once.
    ///
    /// `roll` receives the formula and returns its total; it is never called
    /// when the value is already known. Returns the seconds and, if a roll
    /// happened, the rolled amount.
    pub fn resolve_with<F>(&mut self, roll: F) -> (i64, Option<u32>)
    where
        F: FnOnce(&str) -> i32,
    {
        if let Some(seconds) = self.to_seconds() {
            return (seconds, None);
        }
        let rolled = self
            .formula
            .as_deref()
            .map(|formula| roll(formula).max(0) as u32)
            .unwrap_or(0);
        self.value = Some(rolled);
        (rolled as i64 * self.unit.seconds(), Some(rolled))
    }
}

impl fmt::Display for DurationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.value, self.formula.as_deref()) {
            (Some(value), _) => {
                let plural = if value == 1 { "" } else { "s" };
                write!(f, "{} {}{}", value, self.unit, plural)
            }
            (None, Some(formula)) => write!(f, "{} {}s", formula, self.unit),
            (None, None) => write!(f, "? {}s", self.unit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_multipliers() {
        assert_eq!(DurationUnit::Round.seconds(), 6);
        assert_eq!(DurationUnit::Minute.seconds(), 60);
        assert_eq!(DurationUnit::Hour.seconds(), 3600);
        assert_eq!(DurationUnit::Day.seconds(), 86400);
        assert_eq!(DurationUnit::Week.seconds(), 604800);
    }

    #[test]
    fn unit_parsing_accepts_plurals() {
        assert_eq!("rounds".parse::<DurationUnit>().unwrap(), DurationUnit::Round);
        assert_eq!("Hour".parse::<DurationUnit>().unwrap(), DurationUnit::Hour);
        assert_eq!(" days ".parse::<DurationUnit>().unwrap(), DurationUnit::Day);
        assert!("fortnight".parse::<DurationUnit>().is_err());
    }

    #[test]
    fn fixed_duration_converts_without_rolling() {
        let mut duration = DurationValue::fixed(2, DurationUnit::Round);
        let (seconds, rolled) = duration.resolve_with(|_| panic!("must not roll"));
        assert_eq!(seconds, 12);
        assert_eq!(rolled, None);
    }

    #[test]
    fn dice_duration_rolls_exactly_once() {
        let mut duration = DurationValue::dice("1d4", DurationUnit::Hour);
        assert!(duration.needs_roll());
        assert_eq!(duration.to_seconds(), None);

        let (seconds, rolled) = duration.resolve_with(|formula| {
            assert_eq!(formula, "1d4");
            3
        });
        assert_eq!(seconds, 3 * 3600);
        assert_eq!(rolled, Some(3));
        assert!(duration.is_dice);
        assert!(!duration.needs_roll());

        let (again, rolled_again) = duration.resolve_with(|_| panic!("must not re-roll"));
        assert_eq!(again, seconds);
        assert_eq!(rolled_again, None);
    }

    #[test]
    fn rounds_round_up() {
        assert_eq!(seconds_to_rounds(0), 0);
        assert_eq!(seconds_to_rounds(6), 1);
        assert_eq!(seconds_to_rounds(7), 2);
        assert_eq!(seconds_to_rounds(60), 10);
        assert_eq!(seconds_to_rounds(-5), 0);
    }

    #[test]
    fn display_formats() {
        assert_eq!(DurationValue::fixed(1, DurationUnit::Round).to_string(), "1 round");
        assert_eq!(DurationValue::fixed(6, DurationUnit::Day).to_string(), "6 days");
        assert_eq!(DurationValue::dice("1d4", DurationUnit::Hour).to_string(), "1d4 hours");
    }
}
