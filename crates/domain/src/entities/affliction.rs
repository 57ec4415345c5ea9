//! Affliction definitions: the parsed, structured form of a poison, disease or
//! curse.
//!
//! A definition is catalog data. Running afflictions hold their own frozen
//! copy (see `AfflictionInstance`), so editing a definition only reaches
//! active instances through an explicit re-apply.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::ids::UserId;
use crate::value_objects::DurationValue;

/// Default save for afflictions that do not name one.
pub const DEFAULT_SAVE_ABILITY: &str = "fortitude";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AfflictionType {
    #[default]
    Poison,
    Disease,
    Curse,
}

impl AfflictionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AfflictionType::Poison => "poison",
            AfflictionType::Disease => "disease",
            AfflictionType::Curse => "curse",
        }
    }
}

impl fmt::Display for AfflictionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AfflictionType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "poison" => Ok(AfflictionType::Poison),
            "disease" => Ok(AfflictionType::Disease),
            "curse" => Ok(AfflictionType::Curse),
            other => Err(DomainError::parse(format!("Unknown affliction type: {}", other))),
        }
    }
}

/// Damage dealt when a stage is entered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DamageEntry {
    pub formula: String,
    pub damage_type: String,
    /// "2d6 cold or fire damage": the victim (or GM) picks a type
    #[serde(default)]
    pub is_choice: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative_type: Option<String>,
}

impl DamageEntry {
    pub fn new(formula: impl Into<String>, damage_type: impl Into<String>) -> Self {
        Self {
            formula: formula.into(),
            damage_type: damage_type.into(),
            is_choice: false,
            alternative_type: None,
        }
    }

    pub fn choice(
        formula: impl Into<String>,
        damage_type: impl Into<String>,
        alternative: impl Into<String>,
    ) -> Self {
        Self {
            formula: formula.into(),
            damage_type: damage_type.into(),
            is_choice: true,
            alternative_type: Some(alternative.into()),
        }
    }
}

/// A condition a stage imposes (e.g. enfeebled 2, persistent bleed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionEntry {
    /// Canonical (slug) name, e.g. "enfeebled"
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistent_formula: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistent_type: Option<String>,
}

impl ConditionEntry {
    pub fn new(name: impl Into<String>, value: Option<i32>) -> Self {
        Self {
            name: name.into(),
            value,
            persistent_formula: None,
            persistent_type: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeaknessEntry {
    #[serde(rename = "type")]
    pub weakness_type: String,
    pub value: i32,
}

/// One severity level of an affliction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageDefinition {
    pub number: u32,
    pub effects_text: String,
    /// Time until the next stage save
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<DurationValue>,
    #[serde(default)]
    pub damage: Vec<DamageEntry>,
    #[serde(default)]
    pub conditions: Vec<ConditionEntry>,
    #[serde(default)]
    pub weaknesses: Vec<WeaknessEntry>,
    /// Secret rolls, GM judgment, branching choices or permanent effects
    #[serde(default)]
    pub requires_manual_handling: bool,
    #[serde(default)]
    pub is_lethal: bool,
}

impl StageDefinition {
    pub fn new(number: u32, effects_text: impl Into<String>) -> Self {
        Self {
            number,
            effects_text: effects_text.into(),
            duration: None,
            damage: Vec::new(),
            conditions: Vec::new(),
            weaknesses: Vec::new(),
            requires_manual_handling: false,
            is_lethal: false,
        }
    }

    pub fn with_duration(mut self, duration: DurationValue) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_damage(mut self, damage: DamageEntry) -> Self {
        self.damage.push(damage);
        self
    }

    pub fn with_condition(mut self, condition: ConditionEntry) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn lethal(mut self) -> Self {
        self.is_lethal = true;
        self
    }

    pub fn manual(mut self) -> Self {
        self.requires_manual_handling = true;
        self
    }

    pub fn has_damage(&self) -> bool {
        !self.damage.is_empty()
    }

    /// Copy mechanical effects from another stage ("functions as stage 1").
    pub fn inherit_effects(&mut self, other: &StageDefinition) {
        self.damage = other.damage.clone();
        self.conditions = other.conditions.clone();
        self.weaknesses = other.weaknesses.clone();
        self.requires_manual_handling = other.requires_manual_handling;
        self.is_lethal = other.is_lethal;
    }
}

/// How repeated exposure while afflicted raises the stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultipleExposure {
    pub enabled: bool,
    pub stage_increase: u32,
    /// Re-exposure below this stage has no effect
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_stage: Option<u32>,
    #[serde(default)]
    pub raw_text: String,
}

/// Structured affliction definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AfflictionDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub affliction_type: AfflictionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_dc: Option<i32>,
    pub save_ability: String,
    /// Item level, used for counteract rank
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onset: Option<DurationValue>,
    pub stages: Vec<StageDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_duration: Option<DurationValue>,
    #[serde(default)]
    pub is_virulent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple_exposure: Option<MultipleExposure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_ref: Option<String>,
    /// Stable key for catalog overrides
    #[serde(default)]
    pub definition_key: String,
}

impl AfflictionDefinition {
    pub fn new(name: impl Into<String>, affliction_type: AfflictionType) -> Self {
        Self {
            name: name.into(),
            affliction_type,
            save_dc: None,
            save_ability: DEFAULT_SAVE_ABILITY.to_string(),
            level: None,
            onset: None,
            stages: Vec::new(),
            max_duration: None,
            is_virulent: false,
            multiple_exposure: None,
            source_ref: None,
            definition_key: String::new(),
        }
    }

    pub fn with_dc(mut self, dc: i32) -> Self {
        self.save_dc = Some(dc);
        self
    }

    pub fn with_stage(mut self, stage: StageDefinition) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn with_onset(mut self, onset: DurationValue) -> Self {
        self.onset = Some(onset);
        self
    }

    pub fn with_max_duration(mut self, max_duration: DurationValue) -> Self {
        self.max_duration = Some(max_duration);
        self
    }

    pub fn virulent(mut self) -> Self {
        self.is_virulent = true;
        self
    }

    pub fn with_multiple_exposure(mut self, rule: MultipleExposure) -> Self {
        self.multiple_exposure = Some(rule);
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.definition_key = key.into();
        self
    }

    /// Highest stage number; stage saves are clamped to this.
    pub fn stage_count(&self) -> u32 {
        self.stages.iter().map(|s| s.number).max().unwrap_or(0)
    }

    pub fn stage(&self, number: u32) -> Option<&StageDefinition> {
        self.stages.iter().find(|s| s.number == number)
    }

    pub fn stage_mut(&mut self, number: u32) -> Option<&mut StageDefinition> {
        self.stages.iter_mut().find(|s| s.number == number)
    }

    /// Save DC, if it is a usable positive number.
    pub fn valid_dc(&self) -> Option<i32> {
        self.save_dc.filter(|dc| *dc > 0)
    }

    /// The multiple-exposure rule, only when it is switched on.
    pub fn active_multiple_exposure(&self) -> Option<&MultipleExposure> {
        self.multiple_exposure.as_ref().filter(|m| m.enabled)
    }

    /// Check the definition can be instantiated.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.stages.is_empty() {
            return Err(DomainError::validation(format!(
                "Affliction '{}' has no stages",
                self.name
            )));
        }
        if self.valid_dc().is_none() {
            return Err(DomainError::validation(format!(
                "Affliction '{}' has no valid save DC",
                self.name
            )));
        }
        Ok(())
    }

    pub fn is_usable(&self) -> bool {
        self.validate().is_ok()
    }

    /// Sort stages and renumber them 1..N.
    pub fn renumber_stages(&mut self) {
        self.stages.sort_by_key(|s| s.number);
        for (index, stage) in self.stages.iter_mut().enumerate() {
            stage.number = index as u32 + 1;
        }
    }

    /// Append a stage after the current last stage.
    pub fn add_stage(&mut self, mut stage: StageDefinition) {
        stage.number = self.stage_count() + 1;
        self.stages.push(stage);
        self.renumber_stages();
    }

    /// Replace the stage with the given number, keeping its position.
    pub fn replace_stage(&mut self, number: u32, mut stage: StageDefinition) -> Result<(), DomainError> {
        let slot = self
            .stage_mut(number)
            .ok_or_else(|| DomainError::not_found("Stage", number.to_string()))?;
        stage.number = number;
        *slot = stage;
        self.renumber_stages();
        Ok(())
    }

    /// Delete a stage; later stages move down to close the gap.
    pub fn remove_stage(&mut self, number: u32) -> Result<StageDefinition, DomainError> {
        let index = self
            .stages
            .iter()
            .position(|s| s.number == number)
            .ok_or_else(|| DomainError::not_found("Stage", number.to_string()))?;
        let removed = self.stages.remove(index);
        self.renumber_stages();
        Ok(removed)
    }
}

/// A GM edit of a definition, stored in the override catalog.
///
/// Every field is optional; present fields win over the freshly parsed
/// definition when merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AfflictionOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub affliction_type: Option<AfflictionType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_dc: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_ability: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onset: Option<DurationValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stages: Option<Vec<StageDefinition>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_duration: Option<DurationValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_virulent: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple_exposure: Option<MultipleExposure>,
    pub edited_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_by: Option<UserId>,
}

impl AfflictionOverride {
    /// An override that pins every field of an edited definition.
    ///
    /// Stages are renumbered so the stored edit is always contiguous.
    pub fn from_definition(
        definition: &AfflictionDefinition,
        edited_by: Option<UserId>,
        edited_at: DateTime<Utc>,
    ) -> Self {
        let mut edited = definition.clone();
        edited.renumber_stages();
        Self {
            name: Some(edited.name),
            affliction_type: Some(edited.affliction_type),
            save_dc: edited.save_dc,
            save_ability: Some(edited.save_ability),
            level: edited.level,
            onset: edited.onset,
            stages: Some(edited.stages),
            max_duration: edited.max_duration,
            is_virulent: Some(edited.is_virulent),
            multiple_exposure: edited.multiple_exposure,
            edited_at,
            edited_by,
        }
    }

    /// Merge onto a parsed definition, field by field.
    pub fn apply_to(&self, base: &AfflictionDefinition) -> AfflictionDefinition {
        let mut merged = base.clone();
        if let Some(name) = &self.name {
            merged.name = name.clone();
        }
        if let Some(kind) = self.affliction_type {
            merged.affliction_type = kind;
        }
        if let Some(dc) = self.save_dc {
            merged.save_dc = Some(dc);
        }
        if let Some(ability) = &self.save_ability {
            merged.save_ability = ability.clone();
        }
        if let Some(level) = self.level {
            merged.level = Some(level);
        }
        if let Some(onset) = &self.onset {
            merged.onset = Some(onset.clone());
        }
        if let Some(stages) = &self.stages {
            merged.stages = stages.clone();
        }
        if let Some(max_duration) = &self.max_duration {
            merged.max_duration = Some(max_duration.clone());
        }
        if let Some(virulent) = self.is_virulent {
            merged.is_virulent = virulent;
        }
        if let Some(rule) = &self.multiple_exposure {
            merged.multiple_exposure = Some(rule.clone());
        }
        merged
    }
}
