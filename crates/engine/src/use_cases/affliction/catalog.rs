//! Definition resolution and GM edits of the override catalog.

use std::sync::Arc;

use afflictor_domain::{
    AfflictionDefinition, AfflictionOverride, DomainError, DurationValue, StageDefinition, UserId,
};

use super::progression::Progression;
use super::AfflictionError;
use crate::infrastructure::ports::{AfflictionStore, ClockPort, DefinitionCatalog};
use crate::parsing::{parse_with_locale, Locale, ParseOutcome, StructuredHints};

/// Parse an item's text and merge any stored GM edit.
///
/// Returns `None` for text that is not an affliction.
pub struct ResolveDefinition {
    catalog: Arc<dyn DefinitionCatalog>,
    locale: Locale,
}

impl ResolveDefinition {
    pub fn new(catalog: Arc<dyn DefinitionCatalog>, locale: Locale) -> Self {
        Self { catalog, locale }
    }

    pub async fn execute(
        &self,
        raw: &str,
        hints: Option<&StructuredHints>,
    ) -> Result<Option<AfflictionDefinition>, AfflictionError> {
        let definition = match parse_with_locale(raw, self.locale, hints)? {
            ParseOutcome::Parsed(definition) => definition,
            ParseOutcome::Skip => {
                tracing::debug!(locale = %self.locale, "No stages found, skipping source");
                return Ok(None);
            }
        };
        match self.catalog.get_override(&definition.definition_key).await? {
            Some(edit) => {
                tracing::debug!(key = %definition.definition_key, "Merging stored definition edit");
                Ok(Some(edit.apply_to(&definition)))
            }
            None => Ok(Some(definition)),
        }
    }
}

/// One change made in the definition editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefinitionEdit {
    Rename(String),
    SetDc(i32),
    SetOnset(DurationValue),
    SetMaxDuration(DurationValue),
    SetVirulent(bool),
    AddStage(StageDefinition),
    ReplaceStage { number: u32, stage: StageDefinition },
    RemoveStage(u32),
}

impl DefinitionEdit {
    fn apply(self, definition: &mut AfflictionDefinition) -> Result<(), DomainError> {
        match self {
            DefinitionEdit::Rename(name) => {
                let name = name.trim();
                if name.is_empty() {
                    return Err(DomainError::validation("Affliction name cannot be empty"));
                }
                definition.name = name.to_string();
            }
            DefinitionEdit::SetDc(dc) => {
                if dc <= 0 {
                    return Err(DomainError::validation("Save DC must be positive"));
                }
                definition.save_dc = Some(dc);
            }
            DefinitionEdit::SetOnset(onset) => definition.onset = Some(onset),
            DefinitionEdit::SetMaxDuration(max) => definition.max_duration = Some(max),
            DefinitionEdit::SetVirulent(virulent) => definition.is_virulent = virulent,
            DefinitionEdit::AddStage(stage) => definition.add_stage(stage),
            DefinitionEdit::ReplaceStage { number, stage } => {
                definition.replace_stage(number, stage)?
            }
            DefinitionEdit::RemoveStage(number) => {
                definition.remove_stage(number)?;
            }
        }
        Ok(())
    }
}

/// Apply editor changes to a definition and store the result as its override.
pub struct EditDefinition {
    catalog: Arc<dyn DefinitionCatalog>,
    clock: Arc<dyn ClockPort>,
}

impl EditDefinition {
    pub fn new(catalog: Arc<dyn DefinitionCatalog>, clock: Arc<dyn ClockPort>) -> Self {
        Self { catalog, clock }
    }

    pub async fn execute(
        &self,
        mut definition: AfflictionDefinition,
        edits: Vec<DefinitionEdit>,
        edited_by: Option<UserId>,
    ) -> Result<AfflictionDefinition, AfflictionError> {
        if definition.definition_key.is_empty() {
            return Err(DomainError::validation(format!(
                "{} has no definition key to store edits under",
                definition.name
            ))
            .into());
        }
        for edit in edits {
            edit.apply(&mut definition)?;
        }
        definition.renumber_stages();
        if definition.stages.is_empty() {
            return Err(AfflictionError::Unusable(definition.name));
        }

        let edit = AfflictionOverride::from_definition(&definition, edited_by, self.clock.now());
        self.catalog
            .save_override(&definition.definition_key, &edit)
            .await?;
        tracing::info!(
            key = %definition.definition_key,
            affliction = %definition.name,
            stages = definition.stages.len(),
            "Saved definition edit"
        );
        Ok(definition)
    }
}

/// Push a stored edit onto every running instance of that definition.
pub struct ApplyEditedDefinition {
    progression: Arc<Progression>,
    store: Arc<dyn AfflictionStore>,
    catalog: Arc<dyn DefinitionCatalog>,
}

impl ApplyEditedDefinition {
    pub fn new(
        progression: Arc<Progression>,
        store: Arc<dyn AfflictionStore>,
        catalog: Arc<dyn DefinitionCatalog>,
    ) -> Self {
        Self {
            progression,
            store,
            catalog,
        }
    }

    /// Returns how many instances were updated.
    pub async fn execute(&self, definition_key: &str) -> Result<usize, AfflictionError> {
        let Some(edit) = self.catalog.get_override(definition_key).await? else {
            tracing::debug!(key = definition_key, "No stored edit, nothing to apply");
            return Ok(0);
        };

        let mut updated = 0;
        for target_id in self.store.list_targets().await? {
            let records = self.store.get(target_id).await?;
            for mut instance in records
                .into_values()
                .filter(|instance| instance.definition.definition_key == definition_key)
            {
                instance.definition = edit.apply_to(&instance.definition);
                let applied_stage = instance.current_stage;
                let count = instance.stage_count();
                if instance.current_stage > count as i32 {
                    tracing::warn!(
                        %target_id,
                        affliction = %instance.name(),
                        stage = instance.current_stage,
                        count,
                        "Edited definition has fewer stages, clamping"
                    );
                    instance.current_stage = count as i32;
                }
                self.progression
                    .reapply_stage(&mut instance, applied_stage)
                    .await?;
                self.store.put(&instance).await?;
                updated += 1;
            }
        }

        tracing::info!(key = definition_key, updated, "Applied edited definition to active afflictions");
        Ok(updated)
    }
}
