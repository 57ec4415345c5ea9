//! Port traits for infrastructure boundaries.
//!
//! These are the ONLY abstractions in the engine. Everything else is concrete types.
//! Ports exist for:
//! - Instance, override and confirmation storage (host documents)
//! - Dice, effect application and notifications (host collaborators)
//! - Clock/Random (for testing)

mod error;
mod host;
mod store;
mod testing;
pub mod types;

pub use host::{DicePort, EffectPort, NotificationPort};
pub use store::{AfflictionStore, ConfirmationStore, DefinitionCatalog, RollLookup};
pub use types::{ConfirmationKind, PendingConfirmation};

#[cfg(test)]
pub use host::{MockDicePort, MockEffectPort, MockNotificationPort};
#[cfg(test)]
pub use store::{
    MockAfflictionStore, MockConfirmationStore, MockDefinitionCatalog, MockRollLookup,
};
#[cfg(test)]
pub use testing::{MockClockPort, MockTableClockPort};

pub use testing::{ClockPort, RandomPort, TableClockPort};

pub use error::{DiceError, EffectError, RepoError};
