//! Dice formulas found in affliction text ("1d4 rounds", "2d6 poison damage").
//!
//! Rolling takes the random source as a closure so results are reproducible.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiceParseError {
    #[error("Empty dice formula")]
    Empty,
    #[error("Invalid dice format: {0}")]
    InvalidFormat(String),
    #[error("Dice count must be at least 1")]
    InvalidDiceCount,
    #[error("Die size must be at least 2")]
    InvalidDieSize,
}

/// `count`d`size` plus a flat modifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiceFormula {
    pub dice_count: u8,
    pub die_size: u8,
    pub modifier: i32,
}

fn number<T: std::str::FromStr>(text: &str, what: &str) -> Result<T, DiceParseError> {
    text.parse()
        .map_err(|_| DiceParseError::InvalidFormat(format!("{what} '{text}'")))
}

impl DiceFormula {
    pub fn new(dice_count: u8, die_size: u8, modifier: i32) -> Result<Self, DiceParseError> {
        match (dice_count, die_size) {
            (0, _) => Err(DiceParseError::InvalidDiceCount),
            (_, 0 | 1) => Err(DiceParseError::InvalidDieSize),
            _ => Ok(Self {
                dice_count,
                die_size,
                modifier,
            }),
        }
    }

    /// Parses `1d4`, `d6`, `2d6+3` or `1d10-1`, ignoring case and whitespace.
    pub fn parse(input: &str) -> Result<Self, DiceParseError> {
        let compact: String = input
            .chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect();
        if compact.is_empty() {
            return Err(DiceParseError::Empty);
        }

        let (count, rest) = compact
            .split_once('d')
            .ok_or_else(|| DiceParseError::InvalidFormat(format!("no 'd' in '{compact}'")))?;
        let dice_count = if count.is_empty() {
            1
        } else {
            number(count, "dice count")?
        };

        let (size, modifier) = match rest.find(['+', '-']) {
            None => (rest, 0),
            Some(0) => {
                return Err(DiceParseError::InvalidFormat(format!("die size '{rest}'")));
            }
            Some(at) => {
                let magnitude: i32 = number(&rest[at + 1..], "modifier")?;
                let sign = if rest[at..].starts_with('-') { -1 } else { 1 };
                (&rest[..at], sign * magnitude)
            }
        };

        Self::new(dice_count, number(size, "die size")?, modifier)
    }

    /// Rolls each die through `rng(1, die_size)`; out-of-range faces are clamped.
    pub fn roll<F>(&self, mut rng: F) -> DiceRollResult
    where
        F: FnMut(i32, i32) -> i32,
    {
        let faces = i32::from(self.die_size);
        let individual_rolls: Vec<i32> = (0..self.dice_count)
            .map(|_| rng(1, faces).clamp(1, faces))
            .collect();
        let dice_total = individual_rolls.iter().sum::<i32>();

        DiceRollResult {
            formula: self.clone(),
            total: dice_total + self.modifier,
            individual_rolls,
            dice_total,
        }
    }

    pub fn min_roll(&self) -> i32 {
        i32::from(self.dice_count) + self.modifier
    }

    pub fn max_roll(&self) -> i32 {
        i32::from(self.dice_count) * i32::from(self.die_size) + self.modifier
    }
}

impl fmt::Display for DiceFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.dice_count, self.die_size)?;
        match self.modifier {
            0 => Ok(()),
            m => write!(f, "{m:+}"),
        }
    }
}

/// Faces rolled for one formula.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiceRollResult {
    pub formula: DiceFormula,
    pub individual_rolls: Vec<i32>,
    pub dice_total: i32,
    pub total: i32,
}

impl DiceRollResult {
    /// Human readable roll, e.g. `2d6[4, 5] + 3 = 12`.
    pub fn breakdown(&self) -> String {
        let faces = self
            .individual_rolls
            .iter()
            .map(i32::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let DiceFormula {
            dice_count,
            die_size,
            modifier,
        } = &self.formula;
        let sign = if *modifier < 0 { '-' } else { '+' };
        match modifier {
            0 => format!("{dice_count}d{die_size}[{faces}] = {}", self.total),
            m => format!("{dice_count}d{die_size}[{faces}] {sign} {} = {}", m.abs(), self.total),
        }
    }
}

/// A completed saving throw or skill check, as read from the host.
///
/// `die_face` is the natural d20 result when the host knows it; it drives the
/// natural 20 / natural 1 degree shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRoll {
    pub total: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub die_face: Option<i32>,
}

impl SaveRoll {
    pub fn new(total: i32) -> Self {
        Self {
            total,
            die_face: None,
        }
    }

    pub fn with_die_face(mut self, face: i32) -> Self {
        self.die_face = Some(face);
        self
    }

    /// Apply a flat bonus or penalty (treatment) to the total.
    pub fn with_bonus(mut self, bonus: i32) -> Self {
        self.total += bonus;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let formula = DiceFormula::parse("1d4").unwrap();
        assert_eq!(formula.dice_count, 1);
        assert_eq!(formula.die_size, 4);
        assert_eq!(formula.modifier, 0);
    }

    #[test]
    fn test_parse_shorthand_and_case() {
        let formula = DiceFormula::parse("D6").unwrap();
        assert_eq!(formula.dice_count, 1);
        assert_eq!(formula.die_size, 6);
    }

    #[test]
    fn test_parse_modifiers_with_spaces() {
        assert_eq!(DiceFormula::parse("2d6 + 3").unwrap().modifier, 3);
        assert_eq!(DiceFormula::parse("1d10-1").unwrap().modifier, -1);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(DiceFormula::parse(""), Err(DiceParseError::Empty)));
        assert!(matches!(
            DiceFormula::parse("20"),
            Err(DiceParseError::InvalidFormat(_))
        ));
        assert!(matches!(
            DiceFormula::parse("0d6"),
            Err(DiceParseError::InvalidDiceCount)
        ));
        assert!(matches!(
            DiceFormula::parse("1d1"),
            Err(DiceParseError::InvalidDieSize)
        ));
    }

    #[test]
    fn test_roll_uses_injected_rng_per_die() {
        let formula = DiceFormula::parse("3d6+2").unwrap();
        let mut calls = 0;
        let result = formula.roll(|_, max| {
            calls += 1;
            max
        });
        assert_eq!(calls, 3);
        assert_eq!(result.dice_total, 18);
        assert_eq!(result.total, 20);
        assert_eq!(result.total, formula.max_roll());
    }

    #[test]
    fn test_roll_clamps_out_of_range_rng() {
        let formula = DiceFormula::parse("2d4").unwrap();
        let result = formula.roll(|_, _| 99);
        assert_eq!(result.individual_rolls, vec![4, 4]);
    }

    #[test]
    fn test_breakdown() {
        let formula = DiceFormula::new(2, 6, 3).unwrap();
        let mut faces = vec![4, 5].into_iter();
        let result = formula.roll(|_, _| faces.next().unwrap_or(1));
        assert_eq!(result.breakdown(), "2d6[4, 5] + 3 = 12");
    }

    #[test]
    fn test_display() {
        assert_eq!(DiceFormula::new(1, 4, 0).unwrap().to_string(), "1d4");
        assert_eq!(DiceFormula::new(1, 20, -3).unwrap().to_string(), "1d20-3");
    }

    #[test]
    fn test_save_roll_bonus() {
        let roll = SaveRoll::new(15).with_die_face(12).with_bonus(2);
        assert_eq!(roll.total, 17);
        assert_eq!(roll.die_face, Some(12));
    }
}
