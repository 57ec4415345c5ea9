//! Dice adapter.

use std::sync::Arc;

use async_trait::async_trait;

use afflictor_domain::DiceFormula;

use crate::infrastructure::ports::{DiceError, DicePort, RandomPort};

/// Rolls dice formulas with the injected random source.
pub struct RandomDice {
    random: Arc<dyn RandomPort>,
}

impl RandomDice {
    pub fn new(random: Arc<dyn RandomPort>) -> Self {
        Self { random }
    }
}

#[async_trait]
impl DicePort for RandomDice {
    async fn roll_total(&self, formula: &str) -> Result<i32, DiceError> {
        let parsed = DiceFormula::parse(formula)?;
        let result = parsed.roll(|min, max| self.random.gen_range(min, max));
        tracing::debug!(formula, breakdown = %result.breakdown(), "Rolled dice");
        Ok(result.total)
    }
}

/// Local per-die summation used when the host's dice evaluator fails.
///
/// Anything that does not parse as a formula is read as a flat number, and
/// as 1 when even that fails, so resolution always produces a value.
pub fn fallback_roll(formula: &str, random: &dyn RandomPort) -> i32 {
    match DiceFormula::parse(formula) {
        Ok(parsed) => {
            let mut total = parsed.modifier;
            for _ in 0..parsed.dice_count {
                total += random.gen_range(1, parsed.die_size as i32);
            }
            total
        }
        Err(_) => formula.trim().parse::<i32>().unwrap_or(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::FixedRandom;

    #[tokio::test]
    async fn rolls_with_injected_random() {
        let dice = RandomDice::new(Arc::new(FixedRandom(3)));
        assert_eq!(dice.roll_total("2d6+1").await.unwrap(), 7);
    }

    #[tokio::test]
    async fn malformed_formula_is_an_error() {
        let dice = RandomDice::new(Arc::new(FixedRandom(3)));
        assert!(matches!(
            dice.roll_total("lots").await,
            Err(DiceError::Formula(_))
        ));
    }

    #[test]
    fn fallback_sums_each_die() {
        let random = FixedRandom(4);
        assert_eq!(fallback_roll("3d6-2", &random), 10);
        assert_eq!(fallback_roll("5", &random), 5);
        assert_eq!(fallback_roll("??", &random), 1);
    }
}
