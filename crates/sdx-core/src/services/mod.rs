//! Narrow contracts for external collaborators
//!
//! The staging subsystem does not own entity persistence, search, field
//! derivation, or identity. Hosts embedding this crate supply implementations
//! of these traits; the in-memory versions in [`memory`] back the CLI demo
//! and the test suite.

pub mod extractor;
pub mod memory;

use async_trait::async_trait;
use sdx_common::types::{EntityKey, Principal};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::models::MatchableKeyValue;

/// Failure reported by a collaborator backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("entity store failure: {0}")]
    Entity(String),

    #[error("search index failure: {0}")]
    Index(String),
}

/// Result of asking the entity store to persist a processed object.
///
/// Mirrors the store's own success/failure report: a failed save carries the
/// backend's message and never panics the caller.
#[derive(Debug, Clone)]
pub struct SaveOutcome {
    pub saved: bool,
    pub entity: Value,
    pub error: Option<String>,
}

impl SaveOutcome {
    pub fn saved(entity: Value) -> Self {
        Self {
            saved: true,
            entity,
            error: None,
        }
    }

    pub fn failed(entity: Value, error: impl Into<String>) -> Self {
        Self {
            saved: false,
            entity,
            error: Some(error.into()),
        }
    }
}

/// Request to refresh the index for one key.
///
/// Reindexing is fire-and-forget: the emitter logs failures and moves on.
#[derive(Debug, Clone)]
pub struct ReindexEvent {
    pub event_id: Uuid,
    pub key: EntityKey,
}

impl ReindexEvent {
    pub fn new(key: EntityKey) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            key,
        }
    }
}

/// Authoritative entity persistence.
///
/// `save` runs under the given principal; identity travels as a parameter so
/// batch workers spawned on other tasks never consult ambient security state.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Fetch an entity by kind and store identifier
    async fn find(&self, kind: &str, id: &str) -> Result<Option<Value>, StoreError>;

    /// Persist a processed object, creating (`is_new`) or overwriting
    async fn save(
        &self,
        kind: &str,
        entity: Value,
        is_new: bool,
        principal: &Principal,
    ) -> SaveOutcome;
}

/// The search engine used for matching probes and metadata reindexing
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Exact-value probe: entities of `kind` indexed under `key` = `value`
    async fn probe(&self, kind: &str, key: &str, value: &str)
        -> Result<Vec<EntityKey>, StoreError>;

    /// Queue an index refresh for the given key
    async fn reindex(&self, event: ReindexEvent) -> Result<(), StoreError>;
}

/// Derives matchable tuples from a record payload.
///
/// Derivation for arbitrary domain classes belongs to the host; the in-crate
/// [`extractor::PointerExtractor`] covers configured JSON-pointer rules.
pub trait MatchableExtractor: Send + Sync {
    fn extract(&self, kind: &str, payload: &Value) -> Vec<MatchableKeyValue>;
}

/// Source of the current caller identity
pub trait IdentityProvider: Send + Sync {
    fn current_principal(&self) -> Principal;
}

/// Fixed-identity provider for unattended runs
#[derive(Debug, Clone)]
pub struct SystemIdentity {
    username: String,
}

impl SystemIdentity {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }
}

impl Default for SystemIdentity {
    fn default() -> Self {
        Self::new("system")
    }
}

impl IdentityProvider for SystemIdentity {
    fn current_principal(&self) -> Principal {
        Principal::new(self.username.clone())
    }
}
