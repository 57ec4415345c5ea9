//! Engine configuration.
//!
//! Settings come from `AFFLICTOR_*` environment variables (a `.env` file is
//! honoured by the binary). Anything missing or unparsable falls back to the
//! default and is logged.

use serde::{Deserialize, Serialize};

use afflictor_domain::AfflictionType;

use crate::parsing::Locale;

pub const ENV_LOCALE: &str = "AFFLICTOR_LOCALE";
pub const ENV_USE_APPLICATION_INITIATIVE: &str = "AFFLICTOR_USE_APPLICATION_INITIATIVE";
pub const ENV_REEXPOSURE_TYPES: &str = "AFFLICTOR_REEXPOSURE_TYPES";
pub const ENV_REQUIRE_CONFIRMATION: &str = "AFFLICTOR_REQUIRE_CONFIRMATION";
pub const ENV_AUTO_APPLY_EFFECTS: &str = "AFFLICTOR_AUTO_APPLY_EFFECTS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSettings {
    /// Grammar used to parse affliction text
    #[serde(default)]
    pub locale: Locale,
    /// Combat saves trigger on the initiative the affliction was applied at
    /// instead of the target's own turn
    #[serde(default)]
    pub use_application_initiative: bool,
    /// Affliction types whose repeat exposure raises the existing stage
    #[serde(default = "default_reexposure_types")]
    pub reexposure_types: Vec<AfflictionType>,
    /// Apply stage effects through the effect port automatically
    #[serde(default = "default_true")]
    pub auto_apply_effects: bool,
    /// Save results need an explicit confirmation before they mutate state
    #[serde(default)]
    pub require_confirmation: bool,
}

fn default_reexposure_types() -> Vec<AfflictionType> {
    vec![AfflictionType::Poison]
}

fn default_true() -> bool {
    true
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            locale: Locale::default(),
            use_application_initiative: false,
            reexposure_types: default_reexposure_types(),
            auto_apply_effects: true,
            require_confirmation: false,
        }
    }
}

impl EngineSettings {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(raw) = lookup(ENV_LOCALE) {
            match raw.parse::<Locale>() {
                Ok(locale) => settings.locale = locale,
                Err(e) => tracing::warn!(key = ENV_LOCALE, value = %raw, error = %e, "Ignoring invalid setting"),
            }
        }
        if let Some(value) = parse_flag(&lookup, ENV_USE_APPLICATION_INITIATIVE) {
            settings.use_application_initiative = value;
        }
        if let Some(value) = parse_flag(&lookup, ENV_REQUIRE_CONFIRMATION) {
            settings.require_confirmation = value;
        }
        if let Some(value) = parse_flag(&lookup, ENV_AUTO_APPLY_EFFECTS) {
            settings.auto_apply_effects = value;
        }
        if let Some(raw) = lookup(ENV_REEXPOSURE_TYPES) {
            let mut types = Vec::new();
            for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                match part.parse::<AfflictionType>() {
                    Ok(kind) => types.push(kind),
                    Err(e) => tracing::warn!(key = ENV_REEXPOSURE_TYPES, value = %part, error = %e, "Ignoring unknown affliction type"),
                }
            }
            settings.reexposure_types = types;
        }

        settings
    }

    pub fn reexposure_applies_to(&self, kind: AfflictionType) -> bool {
        self.reexposure_types.contains(&kind)
    }
}

fn parse_flag<F>(lookup: &F, key: &str) -> Option<bool>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            tracing::warn!(key, value = %raw, "Ignoring invalid boolean setting");
            None
        }
    }
}
