//! Afflictor engine library.
//!
//! Parses affliction text into structured definitions and runs the
//! affliction lifecycle against host-provided ports.
//!
//! ## Structure
//!
//! - `parsing/` - Locale grammars and the definition parser
//! - `use_cases/` - Affliction lifecycle orchestration
//! - `infrastructure/` - Ports, settings and adapters
//! - `stores/` - In-memory stand-ins for host storage
//! - `app` - Application composition

pub mod app;
pub mod infrastructure;
pub mod parsing;
pub mod stores;
pub mod use_cases;

pub use app::{App, HostPorts, InMemoryHost};
