//! In-memory affliction records, grouped by target.

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;

use afflictor_domain::{AfflictionInstance, InstanceId, TargetId};

use crate::infrastructure::ports::{AfflictionStore, RepoError};

/// Affliction store backed by a concurrent map.
///
/// Each target owns a map of its instances; a target with no instances left
/// is dropped so `list_targets` only reports afflicted targets.
pub struct InMemoryAfflictionStore {
    records: DashMap<TargetId, HashMap<InstanceId, AfflictionInstance>>,
}

impl InMemoryAfflictionStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    pub fn instance_count(&self) -> usize {
        self.records.iter().map(|entry| entry.value().len()).sum()
    }
}

impl Default for InMemoryAfflictionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AfflictionStore for InMemoryAfflictionStore {
    async fn get(
        &self,
        target_id: TargetId,
    ) -> Result<HashMap<InstanceId, AfflictionInstance>, RepoError> {
        Ok(self
            .records
            .get(&target_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default())
    }

    async fn put(&self, instance: &AfflictionInstance) -> Result<(), RepoError> {
        self.records
            .entry(instance.target_id)
            .or_default()
            .insert(instance.id, instance.clone());
        Ok(())
    }

    async fn delete(&self, target_id: TargetId, instance_id: InstanceId) -> Result<(), RepoError> {
        let removed = self
            .records
            .get_mut(&target_id)
            .and_then(|mut entry| entry.value_mut().remove(&instance_id));
        self.records.remove_if(&target_id, |_, instances| instances.is_empty());
        match removed {
            Some(_) => Ok(()),
            None => Err(RepoError::not_found("AfflictionInstance", instance_id)),
        }
    }

    async fn list_targets(&self) -> Result<Vec<TargetId>, RepoError> {
        Ok(self.records.iter().map(|entry| *entry.key()).collect())
    }
}
