//! In-memory collaborator implementations
//!
//! Back the CLI demo and the test suite. Entities live in a map keyed by
//! (kind, id); the index keeps exact-value postings plus a log of reindex
//! events so tests can assert on emission.

use async_trait::async_trait;
use sdx_common::types::{EntityKey, Principal};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{EntityStore, ReindexEvent, SaveOutcome, SearchIndex, StoreError};

/// Map-backed entity store
#[derive(Debug, Clone, Default)]
pub struct MemoryEntityStore {
    entities: Arc<RwLock<HashMap<(String, String), Value>>>,
    saves: Arc<RwLock<Vec<(String, Principal)>>>,
}

impl MemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an entity directly, bypassing save bookkeeping
    pub async fn insert(&self, kind: &str, id: &str, entity: Value) {
        self.entities
            .write()
            .await
            .insert((kind.to_string(), id.to_string()), entity);
    }

    pub async fn len(&self) -> usize {
        self.entities.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entities.read().await.is_empty()
    }

    /// Successful saves in order, as (entity id, acting principal)
    pub async fn saves(&self) -> Vec<(String, Principal)> {
        self.saves.read().await.clone()
    }
}

/// Identifier used when storing an entity: its own "uuid" or "id" field if
/// present, otherwise a fresh UUID.
fn entity_id(entity: &Value) -> String {
    entity
        .get("uuid")
        .or_else(|| entity.get("id"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

#[async_trait]
impl EntityStore for MemoryEntityStore {
    async fn find(&self, kind: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let entities = self.entities.read().await;
        Ok(entities.get(&(kind.to_string(), id.to_string())).cloned())
    }

    async fn save(
        &self,
        kind: &str,
        entity: Value,
        is_new: bool,
        principal: &Principal,
    ) -> SaveOutcome {
        let id = entity_id(&entity);
        let mut entities = self.entities.write().await;

        if is_new && entities.contains_key(&(kind.to_string(), id.clone())) {
            return SaveOutcome::failed(
                entity,
                format!("entity {}/{} already exists", kind, id),
            );
        }

        tracing::debug!(kind = %kind, id = %id, user = %principal, is_new, "Saving entity");
        entities.insert((kind.to_string(), id.clone()), entity.clone());
        self.saves.write().await.push((id, principal.clone()));
        SaveOutcome::saved(entity)
    }
}

/// Exact-value posting index with a reindex event log
#[derive(Debug, Clone, Default)]
pub struct MemoryIndex {
    postings: Arc<RwLock<HashMap<(String, String, String), Vec<EntityKey>>>>,
    events: Arc<RwLock<Vec<ReindexEvent>>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity under kind/key/value
    pub async fn index_tuple(&self, kind: &str, key: &str, value: &str, entity: EntityKey) {
        let mut postings = self.postings.write().await;
        let bucket = postings
            .entry((kind.to_string(), key.to_string(), value.to_string()))
            .or_default();
        if !bucket.contains(&entity) {
            bucket.push(entity);
        }
    }

    /// Reindex events received so far, oldest first
    pub async fn events(&self) -> Vec<ReindexEvent> {
        self.events.read().await.clone()
    }
}

#[async_trait]
impl SearchIndex for MemoryIndex {
    async fn probe(
        &self,
        kind: &str,
        key: &str,
        value: &str,
    ) -> Result<Vec<EntityKey>, StoreError> {
        let postings = self.postings.read().await;
        Ok(postings
            .get(&(kind.to_string(), key.to_string(), value.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn reindex(&self, event: ReindexEvent) -> Result<(), StoreError> {
        self.events.write().await.push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_save_and_find() {
        let store = MemoryEntityStore::new();
        let principal = Principal::new("tester");

        let outcome = store
            .save("substance", json!({"uuid": "e-1", "name": "aspirin"}), true, &principal)
            .await;
        assert!(outcome.saved);

        let found = store.find("substance", "e-1").await.unwrap();
        assert_eq!(found.unwrap()["name"], "aspirin");

        assert!(store.find("substance", "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_new_rejects_existing_id() {
        let store = MemoryEntityStore::new();
        let principal = Principal::new("tester");

        store.insert("substance", "e-1", json!({"uuid": "e-1"})).await;
        let outcome = store
            .save("substance", json!({"uuid": "e-1"}), true, &principal)
            .await;
        assert!(!outcome.saved);
        assert!(outcome.error.unwrap().contains("already exists"));

        // Overwrite is allowed when not marked new
        let outcome = store
            .save("substance", json!({"uuid": "e-1", "v": 2}), false, &principal)
            .await;
        assert!(outcome.saved);
    }

    #[tokio::test]
    async fn test_save_generates_id_when_absent() {
        let store = MemoryEntityStore::new();
        let principal = Principal::new("tester");

        let outcome = store.save("substance", json!({"name": "x"}), true, &principal).await;
        assert!(outcome.saved);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_probe_and_reindex_log() {
        let index = MemoryIndex::new();
        index
            .index_tuple("substance", "CAS", "50-78-2", EntityKey::new("substance", "e-1"))
            .await;
        index
            .index_tuple("substance", "CAS", "50-78-2", EntityKey::new("substance", "e-1"))
            .await;

        let hits = index.probe("substance", "CAS", "50-78-2").await.unwrap();
        assert_eq!(hits, vec![EntityKey::new("substance", "e-1")]);

        let miss = index.probe("substance", "CAS", "0-00-0").await.unwrap();
        assert!(miss.is_empty());

        index
            .reindex(ReindexEvent::new(EntityKey::new("staging-metadata", "r-1")))
            .await
            .unwrap();
        assert_eq!(index.events().await.len(), 1);
    }
}
