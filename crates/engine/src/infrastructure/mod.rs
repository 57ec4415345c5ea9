//! Infrastructure implementations.
//!
//! Contains port trait implementations for external dependencies.

pub mod clock;
pub mod dice;
pub mod effects;
pub mod notifier;
pub mod ports;
pub mod settings;
