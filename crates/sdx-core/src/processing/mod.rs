//! Processing action chain
//!
//! A processing run threads a staging payload through an ordered list of
//! configured actions. Each action transforms the working value and declares
//! a [`ActionCategory`] describing its effect; the record's final status is
//! inferred from the last non-neutral category in the chain.

pub mod actions;
pub mod chain;
pub mod registry;

pub use chain::{ChainOutcome, ChainRunner};
pub use registry::ActionRegistry;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::RecordStatus;

/// Broad effect class of a processing action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionCategory {
    /// Folds staged data into a matched entity
    Merge,
    /// Replaces a matched entity, or creates a new one, from staged data
    Replace,
    /// Leaves the matched entity untouched
    Ignore,
    /// Declines the staged record
    Reject,
    /// No status effect (field fixups, checks)
    Neutral,
}

impl ActionCategory {
    /// Record status this category implies, if any
    pub fn inferred_status(self) -> Option<RecordStatus> {
        match self {
            ActionCategory::Merge => Some(RecordStatus::Merged),
            ActionCategory::Replace => Some(RecordStatus::Imported),
            ActionCategory::Ignore | ActionCategory::Reject => Some(RecordStatus::Rejected),
            ActionCategory::Neutral => None,
        }
    }
}

/// Ordered human-readable messages collected while a chain runs
#[derive(Debug, Clone, Default)]
pub struct ChainLog {
    entries: Vec<String>,
}

impl ChainLog {
    pub fn push(&mut self, entry: impl Into<String>) {
        self.entries.push(entry.into());
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}

/// Error raised by a single action application
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("invalid parameters for '{action}': {message}")]
    InvalidParameters { action: String, message: String },
    #[error("action '{action}' failed: {message}")]
    Failed { action: String, message: String },
}

impl ActionError {
    pub fn invalid(action: &str, message: impl Into<String>) -> Self {
        ActionError::InvalidParameters {
            action: action.to_string(),
            message: message.into(),
        }
    }

    pub fn failed(action: &str, message: impl Into<String>) -> Self {
        ActionError::Failed {
            action: action.to_string(),
            message: message.into(),
        }
    }
}

/// What one action sees for a single application
pub struct ActionContext<'a> {
    /// Working value threaded through the chain
    pub current: Value,
    /// Matched existing entity, when the target named one
    pub base: Option<&'a Value>,
    /// Free-form parameters from the action configuration
    pub parameters: &'a Map<String, Value>,
    /// Log the action may append progress messages to
    pub log: &'a mut ChainLog,
}

/// One step in a processing chain.
///
/// Implementations must be pure with respect to the staging store: they
/// transform the working value and report through the returned value and the
/// chain log only.
///
/// Actions carry two lookup keys. [`display_name`] is the human-facing label
/// shown in configuration UIs; [`stable_key`] is the machine identifier that
/// stays fixed across renames. [`ActionRegistry::resolve`] tries the display
/// name first and falls back to the stable key.
///
/// [`display_name`]: ProcessingAction::display_name
/// [`stable_key`]: ProcessingAction::stable_key
#[async_trait]
pub trait ProcessingAction: Send + Sync {
    /// Human-facing label, e.g. `"Create Batch"`
    fn display_name(&self) -> &str;

    /// Stable machine identifier, e.g. `"create_batch"`
    fn stable_key(&self) -> &str;

    /// Effect class used for status inference
    fn category(&self) -> ActionCategory;

    /// Whether applying this action makes the outcome a brand new entity.
    /// Once any action in a chain returns true, the save is performed as a
    /// create rather than an update.
    fn creates_entity(&self) -> bool {
        false
    }

    /// Apply the action, returning the next working value
    async fn apply(&self, ctx: ActionContext<'_>) -> Result<Value, ActionError>;
}
