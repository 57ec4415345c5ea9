//! Value objects - Immutable objects defined by their attributes

mod dice;
mod duration;
mod table_time;

pub use dice::{DiceFormula, DiceParseError, DiceRollResult, SaveRoll};
pub use duration::{seconds_to_rounds, DurationUnit, DurationValue, ROUND_SECONDS};
pub use table_time::{TableTime, TimingMode};
