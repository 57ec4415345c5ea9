//! Use cases - User story orchestration.
//!
//! Use cases orchestrate the domain rules against the infrastructure ports.

pub mod affliction;

pub use affliction::AfflictionUseCases;
