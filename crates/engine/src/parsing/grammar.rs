//! Locale grammars: the pattern and vocabulary bundle the parser runs on.
//!
//! A locale is described by static `GrammarTables` (pattern templates plus
//! lookup tables) and compiled once into a `LocaleGrammar`. Templates may use
//! these placeholders, each of which introduces one capture group:
//!
//! - `{amount}` - a number or dice formula
//! - `{unit}` - any duration unit word of the locale
//! - `{dtype}` - any damage type word of the locale
//! - `{atype}` - any affliction type word of the locale
//! - `{name}` - a condition display name (condition template only)

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex_lite::{Captures, Regex};
use serde::{Deserialize, Serialize};

use afflictor_domain::{AfflictionType, DurationUnit};

use super::{en, zh};

const AMOUNT_PATTERN: &str = r"(\d+\s*[dD]\s*\d+(?:\s*[+-]\s*\d+)?|\d+)";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GrammarError {
    #[error("Unknown locale: {0}")]
    UnknownLocale(String),
    #[error("Invalid {name} pattern for locale {locale}: {message}")]
    InvalidPattern {
        locale: &'static str,
        name: &'static str,
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "en")]
    English,
    #[serde(rename = "zh")]
    Chinese,
}

impl Locale {
    pub fn code(&self) -> &'static str {
        match self {
            Locale::English => "en",
            Locale::Chinese => "zh",
        }
    }

    pub fn tables(&self) -> &'static GrammarTables {
        match self {
            Locale::English => &en::TABLES,
            Locale::Chinese => &zh::TABLES,
        }
    }

    /// Compiled grammar, built on first use and cached for the process.
    pub fn grammar(&self) -> Result<&'static LocaleGrammar, GrammarError> {
        static ENGLISH: OnceLock<Result<LocaleGrammar, GrammarError>> = OnceLock::new();
        static CHINESE: OnceLock<Result<LocaleGrammar, GrammarError>> = OnceLock::new();

        let cell = match self {
            Locale::English => &ENGLISH,
            Locale::Chinese => &CHINESE,
        };
        cell.get_or_init(|| LocaleGrammar::compile(self.tables()))
            .as_ref()
            .map_err(Clone::clone)
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Locale {
    type Err = GrammarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" | "en-us" | "en-gb" | "english" => Ok(Locale::English),
            "zh" | "zh-cn" | "zh-tw" | "cn" | "chinese" => Ok(Locale::Chinese),
            other => Err(GrammarError::UnknownLocale(other.to_string())),
        }
    }
}

/// A weakness pattern and which capture groups hold the type and the value.
///
/// Word order differs between languages, so each rule names its own groups.
#[derive(Debug, Clone, Copy)]
pub struct WeaknessRule {
    pub pattern: &'static str,
    pub type_group: usize,
    pub value_group: usize,
}

/// Static description of a locale.
#[derive(Debug, Clone, Copy)]
pub struct GrammarTables {
    pub locale: Locale,
    pub case_insensitive: bool,
    /// Stage header wrapped in bold markup; group 1 is the stage number
    pub stage_header_markup: &'static str,
    pub stage_header_plain: &'static str,
    pub onset: &'static str,
    pub max_duration: &'static str,
    pub duration: &'static str,
    /// "for 2 rounds" style trailing duration
    pub trailing_duration: &'static str,
    pub dc: &'static str,
    /// Any capture group may hold the ability word
    pub save_ability: &'static str,
    pub save_abilities: &'static [(&'static str, &'static str)],
    pub damage_choice: &'static str,
    pub damage_plain: &'static str,
    pub persistent_damage: &'static str,
    pub damage_types: &'static [(&'static str, &'static str)],
    pub condition_template: &'static str,
    /// Display name to condition slug
    pub conditions: &'static [(&'static str, &'static str)],
    pub weaknesses: &'static [WeaknessRule],
    pub manual_handling: &'static str,
    pub death: &'static str,
    pub stage_reference: &'static str,
    pub multiple_exposure_label: &'static str,
    /// Any capture group may hold the increase
    pub multiple_exposure_increase: &'static str,
    pub multiple_exposure_min_stage: &'static str,
    /// Labels that end a stage's text in unstructured sources
    pub section_labels: &'static str,
    pub virulent: &'static str,
    pub affliction_type: &'static str,
    pub affliction_types: &'static [(&'static str, AfflictionType)],
    pub unit_words: &'static [(&'static str, DurationUnit)],
}

pub(crate) struct ConditionMatcher {
    pub slug: &'static str,
    pub pattern: Regex,
}

pub(crate) struct CompiledWeakness {
    pub pattern: Regex,
    pub type_group: usize,
    pub value_group: usize,
}

/// A compiled locale grammar.
pub struct LocaleGrammar {
    locale: Locale,
    pub(crate) stage_header_markup: Regex,
    pub(crate) stage_header_plain: Regex,
    pub(crate) onset: Regex,
    pub(crate) max_duration: Regex,
    pub(crate) duration: Regex,
    pub(crate) trailing_duration: Regex,
    pub(crate) dc: Regex,
    pub(crate) save_ability: Regex,
    pub(crate) damage_choice: Regex,
    pub(crate) damage_plain: Regex,
    pub(crate) persistent_damage: Regex,
    pub(crate) conditions: Vec<ConditionMatcher>,
    pub(crate) weaknesses: Vec<CompiledWeakness>,
    pub(crate) manual_handling: Regex,
    pub(crate) death: Regex,
    pub(crate) stage_reference: Regex,
    pub(crate) multiple_exposure_label: Regex,
    pub(crate) multiple_exposure_increase: Regex,
    pub(crate) multiple_exposure_min_stage: Regex,
    pub(crate) section_labels: Regex,
    pub(crate) virulent: Regex,
    pub(crate) affliction_type: Regex,
    save_abilities: HashMap<String, &'static str>,
    damage_types: HashMap<String, &'static str>,
    condition_names: HashMap<String, &'static str>,
    affliction_types: HashMap<String, AfflictionType>,
    unit_words: HashMap<String, DurationUnit>,
}

impl fmt::Debug for LocaleGrammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocaleGrammar")
            .field("locale", &self.locale)
            .field("conditions", &self.conditions.len())
            .finish_non_exhaustive()
    }
}

fn alternation<'a>(words: impl Iterator<Item = &'a str>) -> String {
    let mut words: Vec<&str> = words.collect();
    // Longest first so "minutes" wins over "minute".
    words.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    words.dedup();
    let escaped: Vec<String> = words.into_iter().map(regex_lite::escape).collect();
    format!("({})", escaped.join("|"))
}

struct Compiler<'t> {
    tables: &'t GrammarTables,
    units: String,
    damage_types: String,
    affliction_types: String,
}

impl<'t> Compiler<'t> {
    fn new(tables: &'t GrammarTables) -> Self {
        Self {
            tables,
            units: alternation(tables.unit_words.iter().map(|(w, _)| *w)),
            damage_types: alternation(tables.damage_types.iter().map(|(w, _)| *w)),
            affliction_types: alternation(tables.affliction_types.iter().map(|(w, _)| *w)),
        }
    }

    fn expand(&self, template: &str) -> String {
        template
            .replace("{amount}", AMOUNT_PATTERN)
            .replace("{unit}", &self.units)
            .replace("{dtype}", &self.damage_types)
            .replace("{atype}", &self.affliction_types)
    }

    fn compile(&self, name: &'static str, template: &str) -> Result<Regex, GrammarError> {
        let expanded = self.expand(template);
        let pattern = if self.tables.case_insensitive {
            format!("(?i){}", expanded)
        } else {
            expanded
        };
        Regex::new(&pattern).map_err(|e| GrammarError::InvalidPattern {
            locale: self.tables.locale.code(),
            name,
            message: e.to_string(),
        })
    }
}

fn lowercase_map<V: Copy>(entries: &[(&'static str, V)]) -> HashMap<String, V> {
    entries
        .iter()
        .map(|(word, value)| (word.to_lowercase(), *value))
        .collect()
}

impl LocaleGrammar {
    pub fn compile(tables: &GrammarTables) -> Result<Self, GrammarError> {
        let c = Compiler::new(tables);

        let conditions = tables
            .conditions
            .iter()
            .map(|(display, slug)| {
                let template = tables
                    .condition_template
                    .replace("{name}", &regex_lite::escape(display));
                Ok(ConditionMatcher {
                    slug,
                    pattern: c.compile("condition", &template)?,
                })
            })
            .collect::<Result<Vec<_>, GrammarError>>()?;

        let weaknesses = tables
            .weaknesses
            .iter()
            .map(|rule| {
                Ok(CompiledWeakness {
                    pattern: c.compile("weakness", rule.pattern)?,
                    type_group: rule.type_group,
                    value_group: rule.value_group,
                })
            })
            .collect::<Result<Vec<_>, GrammarError>>()?;

        let grammar = Self {
            locale: tables.locale,
            stage_header_markup: c.compile("stage header", tables.stage_header_markup)?,
            stage_header_plain: c.compile("plain stage header", tables.stage_header_plain)?,
            onset: c.compile("onset", tables.onset)?,
            max_duration: c.compile("maximum duration", tables.max_duration)?,
            duration: c.compile("duration", tables.duration)?,
            trailing_duration: c.compile("trailing duration", tables.trailing_duration)?,
            dc: c.compile("dc", tables.dc)?,
            save_ability: c.compile("save ability", tables.save_ability)?,
            damage_choice: c.compile("damage choice", tables.damage_choice)?,
            damage_plain: c.compile("damage", tables.damage_plain)?,
            persistent_damage: c.compile("persistent damage", tables.persistent_damage)?,
            conditions,
            weaknesses,
            manual_handling: c.compile("manual handling", tables.manual_handling)?,
            death: c.compile("death", tables.death)?,
            stage_reference: c.compile("stage reference", tables.stage_reference)?,
            multiple_exposure_label: c.compile("multiple exposure", tables.multiple_exposure_label)?,
            multiple_exposure_increase: c
                .compile("multiple exposure increase", tables.multiple_exposure_increase)?,
            multiple_exposure_min_stage: c
                .compile("multiple exposure minimum", tables.multiple_exposure_min_stage)?,
            section_labels: c.compile("section labels", tables.section_labels)?,
            virulent: c.compile("virulent", tables.virulent)?,
            affliction_type: c.compile("affliction type", tables.affliction_type)?,
            save_abilities: lowercase_map(tables.save_abilities),
            damage_types: lowercase_map(tables.damage_types),
            condition_names: lowercase_map(tables.conditions),
            affliction_types: lowercase_map(tables.affliction_types),
            unit_words: lowercase_map(tables.unit_words),
        };
        tracing::debug!(locale = %grammar.locale, "Compiled locale grammar");
        Ok(grammar)
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn unit(&self, word: &str) -> Option<DurationUnit> {
        let key = word.trim().to_lowercase();
        self.unit_words
            .get(&key)
            .copied()
            .or_else(|| key.parse::<DurationUnit>().ok())
    }

    /// Canonical damage type for a localized word.
    pub fn damage_type(&self, word: &str) -> Option<&'static str> {
        self.damage_types.get(&word.trim().to_lowercase()).copied()
    }

    pub fn save_ability_slug(&self, word: &str) -> Option<&'static str> {
        self.save_abilities.get(&word.trim().to_lowercase()).copied()
    }

    pub fn affliction_type_for(&self, word: &str) -> Option<AfflictionType> {
        self.affliction_types.get(&word.trim().to_lowercase()).copied()
    }

    /// Resolve a markup link label such as "Enfeebled 2" to a condition slug
    /// and its value.
    pub fn condition_for_label(&self, label: &str) -> Option<(&'static str, Option<i32>)> {
        let label = label.trim();
        let name_end = label
            .trim_end_matches(|c: char| c.is_ascii_digit())
            .trim_end()
            .len();
        let (name, digits) = label.split_at(name_end);
        let value = digits.trim().parse::<i32>().ok();
        self.condition_names
            .get(&name.to_lowercase())
            .map(|slug| (*slug, value))
    }
}

/// First capture group that participated in the match.
pub(crate) fn first_group<'h>(caps: &Captures<'h>) -> Option<&'h str> {
    (1..caps.len()).find_map(|i| caps.get(i)).map(|m| m.as_str())
}
