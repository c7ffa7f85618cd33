//! Shared application context passed to every feature handler

use sqlx::SqlitePool;
use std::sync::Arc;

use crate::config::StagingConfig;
use crate::processing::ActionRegistry;
use crate::runner::BatchRunner;
use crate::services::{
    EntityStore, IdentityProvider, MatchableExtractor, SearchIndex, SystemIdentity,
};

/// Everything the feature handlers need, cheap to clone.
///
/// Collaborator implementations are chosen by the host at startup; handlers
/// only ever see the trait objects.
#[derive(Clone)]
pub struct AppContext {
    pub pool: SqlitePool,
    pub config: Arc<StagingConfig>,
    pub entities: Arc<dyn EntityStore>,
    pub index: Arc<dyn SearchIndex>,
    pub extractor: Arc<dyn MatchableExtractor>,
    pub identity: Arc<dyn IdentityProvider>,
    pub actions: Arc<ActionRegistry>,
    pub runner: BatchRunner,
}

impl AppContext {
    /// Wire a context from config plus the host's collaborators. The action
    /// registry starts with the built-in roster; the identity provider
    /// defaults to the system principal.
    pub fn new(
        pool: SqlitePool,
        config: StagingConfig,
        entities: Arc<dyn EntityStore>,
        index: Arc<dyn SearchIndex>,
        extractor: Arc<dyn MatchableExtractor>,
    ) -> Self {
        let runner = BatchRunner::new(config.processing.worker_count);
        let actions = ActionRegistry::with_builtins(&config.processing.context_name);
        Self {
            pool,
            config: Arc::new(config),
            entities,
            index,
            extractor,
            identity: Arc::new(SystemIdentity::default()),
            actions: Arc::new(actions),
            runner,
        }
    }

    pub fn with_identity(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_actions(mut self, actions: ActionRegistry) -> Self {
        self.actions = Arc::new(actions);
        self
    }
}
