//! Test fixtures for feature handler tests
//!
//! Builds an [`AppContext`] over a fresh in-memory database with the memory
//! collaborators, plus builders for staged records and seeded entities.
//! Everything here is test-only.

use std::collections::HashMap;
use std::sync::Arc;

use sdx_common::types::EntityKey;
use serde_json::{json, Value};

use crate::config::{
    DatabaseConfig, ExtractionRule, MatchingConfig, ProcessingConfig, StagingConfig,
};
use crate::context::AppContext;
use crate::db;
use crate::features::staging::commands::create_record::{
    self, CreateRecordCommand, CreateRecordResponse,
};
use crate::models::{FindingLevel, ValidationFinding};
use crate::services::extractor::PointerExtractor;
use crate::services::memory::{MemoryEntityStore, MemoryIndex};

/// Configuration used by handler tests: two registered kinds with pointer
/// extraction rules over name, CAS code, and synonyms.
pub fn test_config() -> StagingConfig {
    let mut extraction = HashMap::new();
    extraction.insert(
        "substance".to_string(),
        vec![
            rule("Name", "/name"),
            rule("CAS", "/codes/cas"),
            rule("Synonym", "/synonyms"),
        ],
    );
    extraction.insert("product".to_string(), vec![rule("Name", "/name")]);

    StagingConfig {
        database: DatabaseConfig {
            path: ":memory:".to_string(),
            max_connections: 1,
        },
        processing: ProcessingConfig {
            worker_count: 1,
            context_name: "default".to_string(),
        },
        matching: MatchingConfig {
            registered_kinds: vec!["substance".to_string(), "product".to_string()],
            extraction,
        },
    }
}

fn rule(key: &str, pointer: &str) -> ExtractionRule {
    ExtractionRule {
        key: key.to_string(),
        pointer: pointer.to_string(),
    }
}

/// A wired context plus direct handles to the memory collaborators so tests
/// can seed entities and assert on index traffic.
pub struct TestHarness {
    pub ctx: AppContext,
    pub entities: Arc<MemoryEntityStore>,
    pub index: Arc<MemoryIndex>,
}

/// Context over a fresh in-memory database with [`test_config`]
pub async fn test_context() -> TestHarness {
    test_context_with(test_config()).await
}

/// Context over a fresh in-memory database with the given configuration
pub async fn test_context_with(config: StagingConfig) -> TestHarness {
    let pool = db::open_in_memory().await.expect("in-memory database");
    let entities = Arc::new(MemoryEntityStore::new());
    let index = Arc::new(MemoryIndex::new());
    let extractor = Arc::new(PointerExtractor::from_config(&config));
    let ctx = AppContext::new(pool, config, entities.clone(), index.clone(), extractor);
    TestHarness {
        ctx,
        entities,
        index,
    }
}

/// Seed an entity into the store and index it under the given tuples
pub async fn seed_entity(
    harness: &TestHarness,
    kind: &str,
    id: &str,
    entity: Value,
    tuples: &[(&str, &str)],
) {
    harness.entities.insert(kind, id, entity).await;
    for (key, value) in tuples {
        harness
            .index
            .index_tuple(kind, key, value, EntityKey::new(kind, id))
            .await;
    }
}

/// Builder for staged records
pub struct TestRecord {
    kind: String,
    payload: Value,
    validations: Vec<ValidationFinding>,
}

impl TestRecord {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            payload: json!({"name": "aspirin"}),
            validations: Vec::new(),
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_finding(mut self, level: FindingLevel, message: &str) -> Self {
        self.validations.push(ValidationFinding::new(level, message));
        self
    }

    /// Create the record through the create handler
    pub async fn create(self, ctx: &AppContext) -> CreateRecordResponse {
        create_record::handle(
            ctx.clone(),
            CreateRecordCommand {
                kind: self.kind,
                payload: self.payload.to_string(),
                validations: self.validations,
            },
        )
        .await
        .expect("create staged record")
    }
}
