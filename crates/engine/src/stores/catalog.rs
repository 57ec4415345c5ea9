//! In-memory override catalog.

use async_trait::async_trait;
use dashmap::DashMap;

use afflictor_domain::AfflictionOverride;

use crate::infrastructure::ports::{DefinitionCatalog, RepoError};

/// GM edits keyed by definition key.
///
/// Entries round-trip through JSON so the stored shape matches what a host
/// would persist.
pub struct InMemoryDefinitionCatalog {
    overrides: DashMap<String, String>,
}

impl InMemoryDefinitionCatalog {
    pub fn new() -> Self {
        Self {
            overrides: DashMap::new(),
        }
    }

    /// Raw stored JSON for a key.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.overrides.get(key).map(|entry| entry.value().clone())
    }
}

impl Default for InMemoryDefinitionCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DefinitionCatalog for InMemoryDefinitionCatalog {
    async fn get_override(&self, key: &str) -> Result<Option<AfflictionOverride>, RepoError> {
        match self.overrides.get(key) {
            Some(entry) => serde_json::from_str(entry.value())
                .map(Some)
                .map_err(RepoError::serialization),
            None => Ok(None),
        }
    }

    async fn save_override(&self, key: &str, edit: &AfflictionOverride) -> Result<(), RepoError> {
        let json = serde_json::to_string(edit).map_err(RepoError::serialization)?;
        self.overrides.insert(key.to_string(), json);
        Ok(())
    }

    async fn delete_override(&self, key: &str) -> Result<(), RepoError> {
        self.overrides.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use afflictor_domain::{AfflictionDefinition, AfflictionType, StageDefinition, UserId};

    use super::*;

    #[tokio::test]
    async fn stores_override_as_json() {
        let catalog = InMemoryDefinitionCatalog::new();
        let definition = AfflictionDefinition::new("Filth Fever", AfflictionType::Disease)
            .with_dc(16)
            .with_stage(StageDefinition::new(1, "sickened 1"));
        let edit = AfflictionOverride::from_definition(&definition, Some(UserId::new()), Utc::now());

        catalog.save_override("filth-fever", &edit).await.unwrap();
        assert_eq!(catalog.get_override("filth-fever").await.unwrap(), Some(edit));
        assert!(catalog.raw("filth-fever").unwrap().contains("\"editedAt\""));

        catalog.delete_override("filth-fever").await.unwrap();
        assert!(catalog.get_override("filth-fever").await.unwrap().is_none());
    }
}
