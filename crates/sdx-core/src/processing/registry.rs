//! Action registry with two-phase name resolution

use std::collections::HashMap;
use std::sync::Arc;

use super::{actions, ProcessingAction};

/// Processing actions grouped by deployment context.
///
/// A configuration references an action by a single string, which may be
/// either of the action's two keys. Resolution is deterministic and
/// two-phase: an exact match on `display_name` across the context's actions
/// first, then an exact match on `stable_key`. Within a phase the earliest
/// registration wins; there is no partial or fuzzy matching.
pub struct ActionRegistry {
    contexts: HashMap<String, Vec<Arc<dyn ProcessingAction>>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self {
            contexts: HashMap::new(),
        }
    }

    /// Registry with every built-in action registered under `context`
    pub fn with_builtins(context: &str) -> Self {
        let mut registry = Self::new();
        for action in actions::builtins() {
            registry.register(context, action);
        }
        registry
    }

    pub fn register(&mut self, context: &str, action: Arc<dyn ProcessingAction>) {
        self.contexts
            .entry(context.to_string())
            .or_default()
            .push(action);
    }

    /// Look up an action by display name, then by stable key.
    ///
    /// Returns `None` when the context is unknown or neither key matches;
    /// callers decide whether that is a skip or an error.
    pub fn resolve(&self, context: &str, name: &str) -> Option<Arc<dyn ProcessingAction>> {
        let actions = self.contexts.get(context)?;
        if let Some(action) = actions.iter().find(|a| a.display_name() == name) {
            return Some(action.clone());
        }
        tracing::trace!(context, name, "no display name match, trying stable key");
        actions.iter().find(|a| a.stable_key() == name).cloned()
    }

    pub fn contains(&self, context: &str, name: &str) -> bool {
        self.resolve(context, name).is_some()
    }

    /// Stable keys of every action registered under `context`, sorted
    pub fn stable_keys(&self, context: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .contexts
            .get(context)
            .map(|actions| actions.iter().map(|a| a.stable_key().to_string()).collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::{ActionCategory, ActionContext, ActionError};
    use async_trait::async_trait;
    use serde_json::Value;

    struct FakeAction {
        display: &'static str,
        key: &'static str,
    }

    #[async_trait]
    impl ProcessingAction for FakeAction {
        fn display_name(&self) -> &str {
            self.display
        }

        fn stable_key(&self) -> &str {
            self.key
        }

        fn category(&self) -> ActionCategory {
            ActionCategory::Neutral
        }

        async fn apply(&self, ctx: ActionContext<'_>) -> Result<Value, ActionError> {
            Ok(ctx.current)
        }
    }

    #[test]
    fn test_resolves_by_display_name() {
        let registry = ActionRegistry::with_builtins("default");
        let action = registry.resolve("default", "Create Batch").unwrap();
        assert_eq!(action.stable_key(), "create_batch");
    }

    #[test]
    fn test_resolves_by_stable_key() {
        let registry = ActionRegistry::with_builtins("default");
        let action = registry.resolve("default", "create_batch").unwrap();
        assert_eq!(action.display_name(), "Create Batch");
    }

    #[test]
    fn test_display_name_phase_runs_first() {
        let mut registry = ActionRegistry::new();
        registry.register(
            "ctx",
            Arc::new(FakeAction {
                display: "shared",
                key: "first",
            }),
        );
        registry.register(
            "ctx",
            Arc::new(FakeAction {
                display: "other",
                key: "shared",
            }),
        );
        // "shared" is the first action's display name and the second's
        // stable key; the display phase must win.
        let action = registry.resolve("ctx", "shared").unwrap();
        assert_eq!(action.stable_key(), "first");
    }

    #[test]
    fn test_unknown_name_and_context() {
        let registry = ActionRegistry::with_builtins("default");
        assert!(registry.resolve("default", "frobnicate").is_none());
        assert!(registry.resolve("elsewhere", "merge").is_none());
        assert!(!registry.contains("default", "frobnicate"));
        assert!(registry.contains("default", "merge"));
    }

    #[test]
    fn test_builtin_roster() {
        let registry = ActionRegistry::with_builtins("default");
        assert_eq!(
            registry.stable_keys("default"),
            vec![
                "create",
                "create_batch",
                "ignore",
                "merge",
                "reject",
                "replace",
                "require_field",
                "set_field",
            ]
        );
        assert!(registry.stable_keys("elsewhere").is_empty());
    }
}
