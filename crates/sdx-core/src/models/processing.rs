//! Processing action configuration

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One named, parameterized step in a processing chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingActionConfig {
    /// Name resolved against the action registry
    pub action_name: String,
    /// Free-form parameters interpreted by the action
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

impl ProcessingActionConfig {
    pub fn new(action_name: impl Into<String>) -> Self {
        Self {
            action_name: action_name.into(),
            parameters: Map::new(),
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: Value) -> Self {
        self.parameters.insert(name.into(), value);
        self
    }
}

/// One staged record targeted by a batch submission.
///
/// The record id stays a string here: a malformed id in a submitted batch
/// becomes a per-record outcome when the worker reaches it, never a parse
/// failure for the whole submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingTarget {
    /// Staged record to process
    pub staging_record_id: String,
    /// Entity in the authoritative store this record was matched to, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_entity_id: Option<String>,
}

impl ProcessingTarget {
    pub fn new(staging_record_id: impl Into<String>) -> Self {
        Self {
            staging_record_id: staging_record_id.into(),
            matched_entity_id: None,
        }
    }

    pub fn matched_to(mut self, entity_id: impl Into<String>) -> Self {
        self.matched_entity_id = Some(entity_id.into());
        self
    }
}

/// A batch submission: one shared action chain applied to a list of targets
/// in order.
///
/// This is the JSON body clients submit.
///
/// # Examples
///
/// ```rust
/// use sdx_core::models::ProcessingActionConfigSet;
///
/// let body = r#"{
///     "processingActions": [
///         {"actionName": "merge", "parameters": {"concatArrays": true}}
///     ],
///     "targets": [
///         {"stagingRecordId": "8f2fceb0-79a3-4d27-bc16-62f6e1e61a2b", "matchedEntityId": "e-77"}
///     ]
/// }"#;
/// let set: ProcessingActionConfigSet = serde_json::from_str(body).unwrap();
/// assert_eq!(set.processing_actions.len(), 1);
/// assert_eq!(set.targets.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingActionConfigSet {
    #[serde(default)]
    pub processing_actions: Vec<ProcessingActionConfig>,
    #[serde(default)]
    pub targets: Vec<ProcessingTarget>,
}
