//! Common utilities for staging integration tests
//!
//! Builds a fully wired [`AppContext`] over a fresh in-memory SQLite
//! database with the in-memory entity store and search index, so tests can
//! drive the real feature handlers end to end without external services.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::TestEnv;
//!
//! #[tokio::test]
//! async fn test_staging() {
//!     let env = TestEnv::start().await;
//!     let record_id = env.stage("substance", serde_json::json!({"name": "aspirin"})).await;
//!     // Drive handlers through env.ctx
//! }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use sdx_common::types::EntityKey;
use sdx_core::config::{
    DatabaseConfig, ExtractionRule, MatchingConfig, ProcessingConfig, StagingConfig,
};
use sdx_core::db;
use sdx_core::features::staging::commands::create_record::{self, CreateRecordCommand};
use sdx_core::processing::ActionRegistry;
use sdx_core::services::extractor::PointerExtractor;
use sdx_core::services::memory::{MemoryEntityStore, MemoryIndex};
use sdx_core::AppContext;
use serde_json::Value;
use uuid::Uuid;

/// Context name actions are registered under in tests
pub const TEST_CONTEXT: &str = "default";

/// A wired application context plus direct handles to the in-memory
/// collaborators, so tests can seed entities and inspect index traffic.
pub struct TestEnv {
    pub ctx: AppContext,
    pub entities: Arc<MemoryEntityStore>,
    pub index: Arc<MemoryIndex>,
}

impl TestEnv {
    /// Environment over a fresh in-memory database with [`standard_config`]
    pub async fn start() -> TestEnv {
        Self::start_with(standard_config()).await
    }

    /// Environment over a fresh in-memory database with the given config
    pub async fn start_with(config: StagingConfig) -> TestEnv {
        let pool = db::open_in_memory().await.expect("in-memory database");
        let entities = Arc::new(MemoryEntityStore::new());
        let index = Arc::new(MemoryIndex::new());
        let extractor = Arc::new(PointerExtractor::from_config(&config));
        let ctx = AppContext::new(pool, config, entities.clone(), index.clone(), extractor);
        TestEnv {
            ctx,
            entities,
            index,
        }
    }

    /// Swap in a custom action registry
    pub fn install_actions(&mut self, registry: ActionRegistry) {
        self.ctx = self.ctx.clone().with_actions(registry);
    }

    /// Stage a record through the create handler, returning its id
    pub async fn stage(&self, kind: &str, payload: Value) -> Uuid {
        let response = create_record::handle(
            self.ctx.clone(),
            CreateRecordCommand {
                kind: kind.to_string(),
                payload: payload.to_string(),
                validations: Vec::new(),
            },
        )
        .await
        .expect("stage record");
        response.record_id
    }

    /// Seed an entity into the store and index it under the given tuples
    pub async fn seed_entity(&self, kind: &str, id: &str, entity: Value, tuples: &[(&str, &str)]) {
        self.entities.insert(kind, id, entity).await;
        for (key, value) in tuples {
            self.index
                .index_tuple(kind, key, value, EntityKey::new(kind, id))
                .await;
        }
    }
}

/// Two registered kinds with pointer extraction over name, CAS code, and
/// synonyms. Worker pool of one so batch completion order is deterministic.
pub fn standard_config() -> StagingConfig {
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
            context_name: TEST_CONTEXT.to_string(),
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
