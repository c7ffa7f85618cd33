//! Built-in processing actions
//!
//! The stock roster mirrors what staging deployments need day to day:
//! `merge`, `replace`, `create`, `create_batch`, `ignore`, `reject`, plus the
//! neutral fixups `set_field` and `require_field`. Deployments register
//! additional actions on the [`ActionRegistry`](super::ActionRegistry) at
//! startup.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

use super::{ActionCategory, ActionContext, ActionError, ProcessingAction};

/// Every built-in action, in registration order
pub fn builtins() -> Vec<Arc<dyn ProcessingAction>> {
    let actions: Vec<Arc<dyn ProcessingAction>> = vec![
        Arc::new(MergeAction),
        Arc::new(ReplaceAction),
        Arc::new(CreateAction),
        Arc::new(BatchCreateAction),
        Arc::new(IgnoreAction),
        Arc::new(RejectAction),
        Arc::new(SetFieldAction),
        Arc::new(RequireFieldAction),
    ];
    actions
}

/// True when the parameter is boolean `true` or the string `"true"` in any
/// case. Configurations arrive from JSON written by hand, so both spellings
/// show up in practice.
fn param_is_true(parameters: &Map<String, Value>, key: &str) -> bool {
    match parameters.get(key) {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

/// String-valued parameter; empty strings count as absent
fn param_str<'a>(parameters: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    parameters
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Overlay `patch` onto `base`. Objects merge recursively with patch keys
/// winning. Arrays concatenate when `concat_arrays` is set, otherwise the
/// patch array replaces the base array. Scalars are replaced.
fn deep_merge(base: Value, patch: Value, concat_arrays: bool) -> Value {
    match (base, patch) {
        (Value::Object(mut base_map), Value::Object(patch_map)) => {
            for (key, patch_value) in patch_map {
                match base_map.remove(&key) {
                    Some(base_value) => {
                        base_map.insert(key, deep_merge(base_value, patch_value, concat_arrays));
                    },
                    None => {
                        base_map.insert(key, patch_value);
                    },
                }
            }
            Value::Object(base_map)
        },
        (Value::Array(mut base_items), Value::Array(patch_items)) if concat_arrays => {
            base_items.extend(patch_items);
            Value::Array(base_items)
        },
        (_, patch) => patch,
    }
}

/// Set `value` at `pointer`, creating intermediate objects along the way.
/// Scalars sitting in the path are replaced by objects. Array indexing is not
/// supported for writes.
fn set_pointer(target: &mut Value, pointer: &str, value: Value) -> Result<(), String> {
    if pointer.is_empty() {
        *target = value;
        return Ok(());
    }
    let Some(path) = pointer.strip_prefix('/') else {
        return Err(format!("pointer '{pointer}' must start with '/'"));
    };
    let tokens: Vec<String> = path
        .split('/')
        .map(|token| token.replace("~1", "/").replace("~0", "~"))
        .collect();
    let Some((last, parents)) = tokens.split_last() else {
        return Err(format!("pointer '{pointer}' has no tokens"));
    };

    let mut current = target;
    for token in parents {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let Value::Object(map) = current else {
            return Err(format!("cannot descend into '{token}'"));
        };
        current = map
            .entry(token.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    if !current.is_object() {
        *current = Value::Object(Map::new());
    }
    let Value::Object(map) = current else {
        return Err(format!("cannot set '{last}'"));
    };
    map.insert(last.clone(), value);
    Ok(())
}

/// Folds the staged payload into the matched entity
pub struct MergeAction;

#[async_trait]
impl ProcessingAction for MergeAction {
    fn display_name(&self) -> &str {
        "Merge"
    }

    fn stable_key(&self) -> &str {
        "merge"
    }

    fn category(&self) -> ActionCategory {
        ActionCategory::Merge
    }

    async fn apply(&self, ctx: ActionContext<'_>) -> Result<Value, ActionError> {
        let base = ctx
            .base
            .ok_or_else(|| ActionError::failed("merge", "no matched entity to merge into"))?;
        let concat = param_is_true(ctx.parameters, "concatArrays");
        ctx.log.push("merged staged data into matched entity");
        Ok(deep_merge(base.clone(), ctx.current, concat))
    }
}

/// Replaces the matched entity wholesale with the staged payload, keeping
/// the entity's identity fields so the save targets the same entity
pub struct ReplaceAction;

#[async_trait]
impl ProcessingAction for ReplaceAction {
    fn display_name(&self) -> &str {
        "Replace"
    }

    fn stable_key(&self) -> &str {
        "replace"
    }

    fn category(&self) -> ActionCategory {
        ActionCategory::Replace
    }

    async fn apply(&self, ctx: ActionContext<'_>) -> Result<Value, ActionError> {
        let base = ctx
            .base
            .ok_or_else(|| ActionError::failed("replace", "no matched entity to replace"))?;
        let mut output = ctx.current;
        if let (Value::Object(out), Value::Object(existing)) = (&mut output, base) {
            for key in ["uuid", "id"] {
                if let Some(identity) = existing.get(key) {
                    out.insert(key.to_string(), identity.clone());
                }
            }
        }
        ctx.log.push("replaced matched entity with staged data");
        Ok(output)
    }
}

/// Imports the staged payload as a brand new entity
pub struct CreateAction;

#[async_trait]
impl ProcessingAction for CreateAction {
    fn display_name(&self) -> &str {
        "Create"
    }

    fn stable_key(&self) -> &str {
        "create"
    }

    fn category(&self) -> ActionCategory {
        ActionCategory::Replace
    }

    fn creates_entity(&self) -> bool {
        true
    }

    async fn apply(&self, ctx: ActionContext<'_>) -> Result<Value, ActionError> {
        ctx.log.push("creating new entity from staged data");
        Ok(ctx.current)
    }
}

/// Marks the staged payload for creation as part of a bulk load. Unlike
/// [`CreateAction`] the save stays an update-style write, matching how bulk
/// loaders reconcile against entities they created earlier in the same run.
pub struct BatchCreateAction;

#[async_trait]
impl ProcessingAction for BatchCreateAction {
    fn display_name(&self) -> &str {
        "Create Batch"
    }

    fn stable_key(&self) -> &str {
        "create_batch"
    }

    fn category(&self) -> ActionCategory {
        ActionCategory::Merge
    }

    async fn apply(&self, ctx: ActionContext<'_>) -> Result<Value, ActionError> {
        ctx.log.push("queued staged data for batch creation");
        Ok(ctx.current)
    }
}

/// Leaves the matched entity untouched and marks the record rejected
pub struct IgnoreAction;

#[async_trait]
impl ProcessingAction for IgnoreAction {
    fn display_name(&self) -> &str {
        "Ignore"
    }

    fn stable_key(&self) -> &str {
        "ignore"
    }

    fn category(&self) -> ActionCategory {
        ActionCategory::Ignore
    }

    async fn apply(&self, ctx: ActionContext<'_>) -> Result<Value, ActionError> {
        ctx.log.push("ignored staged record");
        Ok(ctx.current)
    }
}

/// Declines the staged record, with an optional operator-supplied reason
pub struct RejectAction;

#[async_trait]
impl ProcessingAction for RejectAction {
    fn display_name(&self) -> &str {
        "Reject"
    }

    fn stable_key(&self) -> &str {
        "reject"
    }

    fn category(&self) -> ActionCategory {
        ActionCategory::Reject
    }

    async fn apply(&self, ctx: ActionContext<'_>) -> Result<Value, ActionError> {
        match param_str(ctx.parameters, "message") {
            Some(message) => ctx.log.push(format!("rejected staged record: {message}")),
            None => ctx.log.push("rejected staged record"),
        }
        Ok(ctx.current)
    }
}

/// Writes a fixed value into the working payload at a JSON pointer
pub struct SetFieldAction;

#[async_trait]
impl ProcessingAction for SetFieldAction {
    fn display_name(&self) -> &str {
        "Set Field"
    }

    fn stable_key(&self) -> &str {
        "set_field"
    }

    fn category(&self) -> ActionCategory {
        ActionCategory::Neutral
    }

    async fn apply(&self, ctx: ActionContext<'_>) -> Result<Value, ActionError> {
        let pointer = param_str(ctx.parameters, "pointer")
            .ok_or_else(|| ActionError::invalid("set_field", "missing 'pointer' parameter"))?;
        let value = ctx.parameters.get("value").cloned().unwrap_or(Value::Null);

        let mut output = ctx.current;
        set_pointer(&mut output, pointer, value)
            .map_err(|message| ActionError::invalid("set_field", message))?;
        ctx.log.push(format!("set {pointer}"));
        Ok(output)
    }
}

/// Fails the chain when a field is absent or null in the working payload
pub struct RequireFieldAction;

#[async_trait]
impl ProcessingAction for RequireFieldAction {
    fn display_name(&self) -> &str {
        "Require Field"
    }

    fn stable_key(&self) -> &str {
        "require_field"
    }

    fn category(&self) -> ActionCategory {
        ActionCategory::Neutral
    }

    async fn apply(&self, ctx: ActionContext<'_>) -> Result<Value, ActionError> {
        let pointer = param_str(ctx.parameters, "pointer")
            .ok_or_else(|| ActionError::invalid("require_field", "missing 'pointer' parameter"))?;

        let present = ctx
            .current
            .pointer(pointer)
            .is_some_and(|value| !value.is_null());
        if !present {
            return Err(ActionError::failed(
                "require_field",
                format!("required field {pointer} is missing"),
            ));
        }
        ctx.log.push(format!("verified {pointer}"));
        Ok(ctx.current)
    }
}
