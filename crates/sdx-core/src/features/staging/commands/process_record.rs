//! Process staged record command
//!
//! Runs the full processing sequence for one staged record: guard checks,
//! the configured action chain, and (when persisting) the entity save, the
//! status transition, and the metadata reindex event.
//!
//! Record-scoped problems come back as a [`RecordOutcome`], never as an
//! error: the same handler runs inside batch workers, and a bad record must
//! not abort its batch. The `Err` side is reserved for infrastructure
//! failures.

use chrono::Utc;
use mediator::Request;
use sdx_common::types::{EntityKey, Principal, RecordOutcome, RecordStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::AppContext;
use crate::db::{records, DbError};
use crate::features::shared::validation::validate_record_id;
use crate::models::ProcessingActionConfig;
use crate::processing::ChainRunner;
use crate::services::{ReindexEvent, StoreError};

/// Command to process one staged record against an optional matched entity
///
/// `staging_record_id` stays a string so a malformed id surfaces as a
/// per-record outcome. `version` of zero or below (or `None`) selects the
/// latest stored version. When `persist` is false the chain runs as a dry
/// run and nothing is written anywhere.
///
/// # Examples
///
/// ```rust,ignore
/// use sdx_core::features::staging::commands::ProcessRecordCommand;
/// use sdx_core::models::ProcessingActionConfig;
///
/// let command = ProcessRecordCommand {
///     staging_record_id: record_id.to_string(),
///     matched_entity_id: Some("e-77".to_string()),
///     version: None,
///     persist: true,
///     actions: vec![ProcessingActionConfig::new("merge")],
///     principal: None,
/// };
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessRecordCommand {
    pub staging_record_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_entity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    pub persist: bool,
    pub actions: Vec<ProcessingActionConfig>,
    /// Identity the save runs under; defaults to the context's provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal: Option<Principal>,
}

/// Errors that can occur while processing a record
///
/// Only infrastructure failures land here; everything scoped to the record
/// itself becomes an outcome.
#[derive(Debug, thiserror::Error)]
pub enum ProcessRecordError {
    /// The entity store or search backend failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    /// A database error occurred
    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl Request<Result<RecordOutcome, ProcessRecordError>> for ProcessRecordCommand {}

impl crate::cqrs::middleware::Command for ProcessRecordCommand {}

/// Handles the process record command
///
/// Sequence:
/// 1. Parse the record id; blank or malformed ids become `BAD_REQUEST`
///    outcomes
/// 2. Load the requested payload version and the metadata; a record already
///    in `imported` status is refused before any action runs
/// 3. Load the matched entity as the chain's base value, when an id was given
/// 4. Run the action chain; a failing action aborts this record with an
///    `INTERNAL_SERVER_ERROR` outcome and persists nothing
/// 5. When `persist` is set and the inferred status requires a save, write
///    the entity, move the record's status, and emit a metadata reindex
///    event; a failed save leaves the record untouched
///
/// # Errors
///
/// - `Store` - The entity store backend failed
/// - `Database` - A database error occurred
#[tracing::instrument(skip(ctx, command), fields(record = %command.staging_record_id))]
pub async fn handle(
    ctx: AppContext,
    command: ProcessRecordCommand,
) -> Result<RecordOutcome, ProcessRecordError> {
    let record_id = match validate_record_id(&command.staging_record_id) {
        Ok(id) => id,
        Err(e) => return Ok(RecordOutcome::bad_request(e.to_string())),
    };

    let mut conn = ctx.pool.acquire().await.map_err(DbError::from)?;

    let version = command.version.filter(|v| *v > 0);
    let Some(record) = records::find_record(&mut conn, record_id, version).await? else {
        return Ok(RecordOutcome::bad_request(format!(
            "Error retrieving staging area object with ID {}",
            command.staging_record_id
        ))
        .with_staging_area_id(command.staging_record_id.as_str()));
    };

    let metadata = records::find_metadata(&mut conn, record_id)
        .await?
        .ok_or_else(|| DbError::not_found("staging metadata", &record_id.to_string()))?;

    if metadata.status == RecordStatus::Imported {
        return Ok(RecordOutcome::bad_request(format!(
            "Error: staging area record with ID {} has already been imported",
            command.staging_record_id
        ))
        .with_staging_area_id(command.staging_record_id.as_str()));
    }

    let Ok(seed) = serde_json::from_str::<Value>(&record.payload) else {
        return Ok(RecordOutcome::bad_request(format!(
            "Error deserializing staged payload with ID {}",
            command.staging_record_id
        ))
        .with_staging_area_id(command.staging_record_id.as_str()));
    };

    // The pool is small and actions may block; hand the connection back
    // while the chain runs.
    drop(conn);

    let base = match command.matched_entity_id.as_deref() {
        Some(id) if !id.is_empty() => ctx.entities.find(&record.kind, id).await?,
        _ => None,
    };

    let runner = ChainRunner::new(&ctx.actions, &ctx.config.processing.context_name);
    let chain = match runner.run(&command.actions, seed, base.as_ref()).await {
        Ok(chain) => chain,
        Err(e) => {
            tracing::error!(record_id = %record_id, error = %e, "processing chain failed");
            return Ok(RecordOutcome::internal_error(e.to_string())
                .with_staging_area_id(command.staging_record_id.as_str()));
        },
    };

    if command.persist && chain.status.requires_save() {
        let principal = command
            .principal
            .clone()
            .unwrap_or_else(|| ctx.identity.current_principal());
        let saved = ctx
            .entities
            .save(&record.kind, chain.output, chain.is_new, &principal)
            .await;
        if !saved.saved {
            let reason = saved.error.unwrap_or_else(|| "unknown".to_string());
            tracing::error!(record_id = %record_id, error = %reason, "entity save failed");
            return Ok(RecordOutcome::internal_error(format!(
                "Object failed to save: {}",
                reason
            )));
        }

        let mut conn = ctx.pool.acquire().await.map_err(DbError::from)?;
        records::update_status(&mut conn, record_id, chain.status, Utc::now()).await?;

        let event = ReindexEvent::new(EntityKey::new(&record.kind, record_id.to_string()));
        if let Err(e) = ctx.index.reindex(event).await {
            tracing::warn!(record_id = %record_id, error = %e, "reindex request failed");
        }
    } else {
        tracing::debug!(
            record_id = %record_id,
            status = %chain.status,
            persist = command.persist,
            "skipped saving"
        );
    }

    Ok(RecordOutcome::ok(
        command.staging_record_id,
        "Import record processed successfully",
    ))
}
