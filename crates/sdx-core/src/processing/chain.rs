//! Sequential chain execution

use serde_json::Value;

use super::registry::ActionRegistry;
use super::{ActionContext, ActionError, ChainLog};
use crate::models::{ProcessingActionConfig, RecordStatus};

/// Result of running a full chain over one staging payload
#[derive(Debug)]
pub struct ChainOutcome {
    /// Final working value after every action ran
    pub output: Value,
    /// Status inferred from the last non-neutral action category
    pub status: RecordStatus,
    /// True when any applied action created a brand new entity
    pub is_new: bool,
    /// Messages appended by the actions, in order
    pub log: ChainLog,
}

/// Runs configured actions in order against a working value
pub struct ChainRunner<'a> {
    registry: &'a ActionRegistry,
    context: &'a str,
}

impl<'a> ChainRunner<'a> {
    pub fn new(registry: &'a ActionRegistry, context: &'a str) -> Self {
        Self { registry, context }
    }

    /// Thread `seed` through every configured action.
    ///
    /// A name the registry cannot resolve is logged and skipped; the chain
    /// continues with the next step. A failing action aborts the chain at
    /// that step and the partial output is discarded by the caller.
    pub async fn run(
        &self,
        configs: &[ProcessingActionConfig],
        seed: Value,
        base: Option<&Value>,
    ) -> Result<ChainOutcome, ActionError> {
        let mut log = ChainLog::default();
        let mut current = seed;
        let mut status = RecordStatus::Staged;
        let mut is_new = false;

        for config in configs {
            let Some(action) = self.registry.resolve(self.context, &config.action_name) else {
                tracing::error!(action = %config.action_name, "action not found");
                log.push(format!("action {} not found; skipped", config.action_name));
                continue;
            };

            tracing::debug!(action = action.stable_key(), "applying processing action");
            current = action
                .apply(ActionContext {
                    current,
                    base,
                    parameters: &config.parameters,
                    log: &mut log,
                })
                .await?;
            if let Some(inferred) = action.category().inferred_status() {
                status = inferred;
            }
            if action.creates_entity() {
                is_new = true;
            }
        }

        Ok(ChainOutcome {
            output: current,
            status,
            is_new,
            log,
        })
    }
}
