//! In-memory state storage modules.
//!
//! Stores stand in for the host's document storage:
//! - `InMemoryAfflictionStore` - per-target affliction records
//! - `InMemoryDefinitionCatalog` - GM definition overrides
//! - `InMemoryConfirmationStore` - pending two-phase confirmations
//! - `RollLog` - host rolls by correlation id (rerolls replace)

pub mod afflictions;
pub mod catalog;
pub mod confirmations;

pub use afflictions::InMemoryAfflictionStore;
pub use catalog::InMemoryDefinitionCatalog;
pub use confirmations::{InMemoryConfirmationStore, RollLog};
