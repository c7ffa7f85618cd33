//! Update staged record command
//!
//! Replaces a staged record's payload by inserting the next version. Stored
//! versions are immutable; an update never rewrites an existing row. The
//! matchable tuples are re-extracted from the new payload, the lifecycle
//! status is left alone.

use chrono::Utc;
use mediator::Request;
use sdx_common::checksum::payload_checksum;
use sdx_common::types::{EntityKey, RecordStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::AppContext;
use crate::db::{records, DbError};
use crate::features::shared::validation::{validate_payload, PayloadError};
use crate::models::StagingRecord;
use crate::services::ReindexEvent;

/// Command to store a new payload version for an existing record
///
/// # Examples
///
/// ```rust,ignore
/// use sdx_core::features::staging::commands::UpdateRecordCommand;
/// use uuid::Uuid;
///
/// let command = UpdateRecordCommand {
///     record_id: record_id,
///     payload: r#"{"name": "aspirin", "codes": {"cas": "50-78-2"}}"#.to_string(),
/// };
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRecordCommand {
    pub record_id: Uuid,
    pub payload: String,
}

/// Response from updating a record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRecordResponse {
    pub record_id: Uuid,
    pub version: i64,
    pub status: RecordStatus,
}

/// Errors that can occur when updating a record
#[derive(Debug, thiserror::Error)]
pub enum UpdateRecordError {
    /// The record does not exist
    #[error("Staging record with ID '{0}' not found")]
    NotFound(Uuid),
    /// The payload is empty, malformed, or not a JSON object
    #[error("Payload validation failed: {0}")]
    Payload(#[from] PayloadError),
    /// A database error occurred
    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl Request<Result<UpdateRecordResponse, UpdateRecordError>> for UpdateRecordCommand {}

impl crate::cqrs::middleware::Command for UpdateRecordCommand {}

impl UpdateRecordCommand {
    /// Validates the command parameters
    ///
    /// # Errors
    ///
    /// - `Payload` - Payload is empty, malformed, or not a JSON object
    pub fn validate(&self) -> Result<(), UpdateRecordError> {
        validate_payload(&self.payload)?;
        Ok(())
    }
}

/// Handles the update record command
///
/// In one transaction:
/// 1. Loads the latest version and the metadata row
/// 2. Inserts the new payload as version latest + 1
/// 3. Replaces the matchable tuples with ones extracted from the new payload
///
/// The record keeps whatever lifecycle status it had. After commit a reindex
/// event for the metadata is emitted; index failures are logged only.
///
/// # Errors
///
/// - `NotFound` - No record exists under this id
/// - `Payload` - The payload is empty, malformed, or not a JSON object
/// - `Database` - A database error occurred
#[tracing::instrument(skip(ctx, command), fields(record_id = %command.record_id))]
pub async fn handle(
    ctx: AppContext,
    command: UpdateRecordCommand,
) -> Result<UpdateRecordResponse, UpdateRecordError> {
    command.validate()?;
    let payload = validate_payload(&command.payload)?;

    let mut tx = ctx.pool.begin().await.map_err(DbError::from)?;

    let current = records::find_record(&mut tx, command.record_id, None)
        .await?
        .ok_or(UpdateRecordError::NotFound(command.record_id))?;
    let metadata = records::find_metadata(&mut tx, command.record_id)
        .await?
        .ok_or(UpdateRecordError::NotFound(command.record_id))?;

    let now = Utc::now();
    let version = current.version + 1;
    let record = StagingRecord {
        record_id: command.record_id,
        version,
        kind: current.kind.clone(),
        payload: command.payload.clone(),
        payload_checksum: payload_checksum(command.payload.as_bytes()),
        created_at: now,
    };
    let mappings = ctx.extractor.extract(&current.kind, &payload);

    records::insert_record(&mut tx, &record).await?;
    records::replace_mappings(&mut tx, command.record_id, &mappings).await?;
    records::update_status(&mut tx, command.record_id, metadata.status, now).await?;

    tx.commit().await.map_err(DbError::from)?;

    let event = ReindexEvent::new(EntityKey::new(&current.kind, command.record_id.to_string()));
    if let Err(e) = ctx.index.reindex(event).await {
        tracing::warn!(record_id = %command.record_id, error = %e, "reindex request failed");
    }

    tracing::info!(record_id = %command.record_id, version, "record updated");

    Ok(UpdateRecordResponse {
        record_id: command.record_id,
        version,
        status: metadata.status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::shared::test_helpers::{test_context, TestRecord};
    use serde_json::json;

    #[tokio::test]
    async fn test_update_appends_next_version() {
        let harness = test_context().await;
        let created = TestRecord::new("substance").create(&harness.ctx).await;

        let response = handle(
            harness.ctx.clone(),
            UpdateRecordCommand {
                record_id: created.record_id,
                payload: json!({"name": "aspirin", "codes": {"cas": "50-78-2"}}).to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(response.version, 2);
        assert_eq!(response.status, RecordStatus::Staged);

        let mut conn = harness.ctx.pool.acquire().await.unwrap();
        let latest = records::find_record(&mut conn, created.record_id, None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.version, 2);
        assert!(latest.payload.contains("50-78-2"));

        // version 1 is still there, untouched
        let first = records::find_record(&mut conn, created.record_id, Some(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.payload, json!({"name": "aspirin"}).to_string());
    }

    #[tokio::test]
    async fn test_update_replaces_mappings() {
        let harness = test_context().await;
        let created = TestRecord::new("substance").create(&harness.ctx).await;

        handle(
            harness.ctx.clone(),
            UpdateRecordCommand {
                record_id: created.record_id,
                payload: json!({"name": "ibuprofen"}).to_string(),
            },
        )
        .await
        .unwrap();

        let mut conn = harness.ctx.pool.acquire().await.unwrap();
        let metadata = records::find_metadata(&mut conn, created.record_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(metadata.key_value_mappings.len(), 1);
        assert_eq!(metadata.key_value_mappings[0].value, "ibuprofen");
    }

    #[tokio::test]
    async fn test_update_missing_record() {
        let harness = test_context().await;
        let err = handle(
            harness.ctx.clone(),
            UpdateRecordCommand {
                record_id: Uuid::new_v4(),
                payload: json!({"name": "x"}).to_string(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, UpdateRecordError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_rejects_bad_payload() {
        let harness = test_context().await;
        let created = TestRecord::new("substance").create(&harness.ctx).await;

        let err = handle(
            harness.ctx.clone(),
            UpdateRecordCommand {
                record_id: created.record_id,
                payload: "not json".to_string(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, UpdateRecordError::Payload(PayloadError::Malformed(_))));
    }
}
