//! Create staged record command
//!
//! Accepts a raw JSON payload into the staging area. The record gets a fresh
//! id and starts at version 1 in `staged` status, with its matchable tuples
//! extracted and stored alongside the metadata.

use chrono::Utc;
use mediator::Request;
use sdx_common::checksum::payload_checksum;
use sdx_common::types::{EntityKey, RecordStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::AppContext;
use crate::db::{records, DbError};
use crate::features::shared::validation::{
    validate_kind, validate_payload, KindError, PayloadError,
};
use crate::models::{RecordMetadata, StagingRecord, ValidationFinding};
use crate::services::ReindexEvent;

/// Command to stage a new record
///
/// The payload travels as raw JSON text and is stored verbatim; validation
/// findings supplied by the caller are recorded against the new record.
///
/// # Examples
///
/// ```rust,ignore
/// use sdx_core::features::staging::commands::CreateRecordCommand;
///
/// let command = CreateRecordCommand {
///     kind: "substance".to_string(),
///     payload: r#"{"name": "aspirin", "codes": {"cas": "50-78-2"}}"#.to_string(),
///     validations: Vec::new(),
/// };
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRecordCommand {
    pub kind: String,
    pub payload: String,
    #[serde(default)]
    pub validations: Vec<ValidationFinding>,
}

/// Response from staging a record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecordResponse {
    pub record_id: Uuid,
    pub version: i64,
    pub status: RecordStatus,
}

/// Errors that can occur when staging a record
#[derive(Debug, thiserror::Error)]
pub enum CreateRecordError {
    /// The kind is missing or not registered for this deployment
    #[error("Kind validation failed: {0}")]
    Kind(#[from] KindError),
    /// The payload is empty, malformed, or not a JSON object
    #[error("Payload validation failed: {0}")]
    Payload(#[from] PayloadError),
    /// A database error occurred
    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl Request<Result<CreateRecordResponse, CreateRecordError>> for CreateRecordCommand {}

impl crate::cqrs::middleware::Command for CreateRecordCommand {}

impl CreateRecordCommand {
    /// Validates the command parameters
    ///
    /// # Errors
    ///
    /// - `Kind` - Kind is empty
    /// - `Payload` - Payload is empty, malformed, or not a JSON object
    pub fn validate(&self) -> Result<(), CreateRecordError> {
        if self.kind.is_empty() {
            return Err(KindError::Required.into());
        }
        validate_payload(&self.payload)?;
        Ok(())
    }
}

/// Handles the create record command
///
/// Stages the payload in a transaction:
/// 1. Validates the kind is registered and the payload parses
/// 2. Inserts version 1 of the record with its sha256 checksum
/// 3. Extracts matchable tuples and writes the metadata row in `staged` status
///
/// After commit a reindex event for the new metadata is emitted; index
/// failures are logged and do not fail the command.
///
/// # Errors
///
/// - `Kind` - The kind is empty or not registered
/// - `Payload` - The payload is empty, malformed, or not a JSON object
/// - `Database` - A database error occurred
#[tracing::instrument(skip(ctx, command), fields(kind = %command.kind))]
pub async fn handle(
    ctx: AppContext,
    command: CreateRecordCommand,
) -> Result<CreateRecordResponse, CreateRecordError> {
    command.validate()?;
    validate_kind(&command.kind, &ctx.config.matching.registered_kinds)?;
    let payload = validate_payload(&command.payload)?;

    let record_id = Uuid::new_v4();
    let now = Utc::now();
    let checksum = payload_checksum(command.payload.as_bytes());
    let mappings = ctx.extractor.extract(&command.kind, &payload);

    let record = StagingRecord {
        record_id,
        version: 1,
        kind: command.kind.clone(),
        payload: command.payload.clone(),
        payload_checksum: checksum.clone(),
        created_at: now,
    };
    let metadata = RecordMetadata {
        record_id,
        status: RecordStatus::Staged,
        key_value_mappings: mappings,
        validations: command.validations.clone(),
        created_at: now,
        updated_at: now,
    };

    let mut tx = ctx.pool.begin().await.map_err(DbError::from)?;

    let duplicates: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM staging_records WHERE kind = ?1 AND payload_checksum = ?2",
    )
    .bind(&command.kind)
    .bind(&checksum)
    .fetch_one(&mut *tx)
    .await
    .map_err(DbError::from)?;
    if duplicates > 0 {
        tracing::debug!(
            kind = %command.kind,
            checksum = %checksum,
            duplicates,
            "payload checksum already staged"
        );
    }

    records::insert_record(&mut tx, &record).await?;
    records::insert_metadata(&mut tx, &metadata).await?;

    tx.commit().await.map_err(DbError::from)?;

    let event = ReindexEvent::new(EntityKey::new(&command.kind, record_id.to_string()));
    if let Err(e) = ctx.index.reindex(event).await {
        tracing::warn!(record_id = %record_id, error = %e, "reindex request failed");
    }

    tracing::info!(record_id = %record_id, "record staged");

    Ok(CreateRecordResponse {
        record_id,
        version: 1,
        status: RecordStatus::Staged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::shared::test_helpers::test_context;
    use serde_json::json;

    fn command(kind: &str, payload: &str) -> CreateRecordCommand {
        CreateRecordCommand {
            kind: kind.to_string(),
            payload: payload.to_string(),
            validations: Vec::new(),
        }
    }

    #[test]
    fn test_validation_success() {
        assert!(command("substance", r#"{"name": "aspirin"}"#).validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_input() {
        let err = command("", r#"{"name": "aspirin"}"#).validate().unwrap_err();
        assert!(matches!(err, CreateRecordError::Kind(KindError::Required)));

        let err = command("substance", "").validate().unwrap_err();
        assert!(matches!(err, CreateRecordError::Payload(PayloadError::Required)));

        let err = command("substance", "[1, 2]").validate().unwrap_err();
        assert!(matches!(err, CreateRecordError::Payload(PayloadError::NotAnObject)));
    }

    #[tokio::test]
    async fn test_create_stages_version_one() {
        let harness = test_context().await;
        let payload = r#"{"name": "aspirin", "codes": {"cas": "50-78-2"}}"#;

        let response = handle(harness.ctx.clone(), command("substance", payload))
            .await
            .unwrap();
        assert_eq!(response.version, 1);
        assert_eq!(response.status, RecordStatus::Staged);

        let mut conn = harness.ctx.pool.acquire().await.unwrap();
        let stored = records::find_record(&mut conn, response.record_id, None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.payload, payload);
        assert_eq!(stored.payload_checksum, payload_checksum(payload.as_bytes()));

        let metadata = records::find_metadata(&mut conn, response.record_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(metadata.status, RecordStatus::Staged);
    }

    #[tokio::test]
    async fn test_create_extracts_mappings_in_rule_order() {
        let harness = test_context().await;
        let payload = json!({
            "name": "aspirin",
            "codes": {"cas": "50-78-2"},
            "synonyms": ["ASA", "acetylsalicylic acid"]
        });

        let response = handle(harness.ctx.clone(), command("substance", &payload.to_string()))
            .await
            .unwrap();

        let mut conn = harness.ctx.pool.acquire().await.unwrap();
        let metadata = records::find_metadata(&mut conn, response.record_id)
            .await
            .unwrap()
            .unwrap();
        let tuples: Vec<(String, String)> = metadata
            .key_value_mappings
            .into_iter()
            .map(|m| (m.key, m.value))
            .collect();
        assert_eq!(
            tuples,
            vec![
                ("Name".to_string(), "aspirin".to_string()),
                ("CAS".to_string(), "50-78-2".to_string()),
                ("Synonym".to_string(), "ASA".to_string()),
                ("Synonym".to_string(), "acetylsalicylic acid".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_create_stores_validation_findings() {
        use crate::features::shared::test_helpers::TestRecord;
        use crate::models::FindingLevel;

        let harness = test_context().await;
        let created = TestRecord::new("substance")
            .with_finding(FindingLevel::Warning, "name differs from preferred term")
            .create(&harness.ctx)
            .await;

        let mut conn = harness.ctx.pool.acquire().await.unwrap();
        let metadata = records::find_metadata(&mut conn, created.record_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(metadata.validations.len(), 1);
        assert_eq!(metadata.validations[0].level, FindingLevel::Warning);
        assert_eq!(
            metadata.validations[0].message,
            "name differs from preferred term"
        );
    }

    #[tokio::test]
    async fn test_create_rejects_unregistered_kind() {
        let harness = test_context().await;
        let err = handle(harness.ctx.clone(), command("mixture", r#"{"name": "x"}"#))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CreateRecordError::Kind(KindError::Unregistered(_))
        ));
    }

    #[tokio::test]
    async fn test_create_emits_reindex_event() {
        let harness = test_context().await;
        let response = handle(harness.ctx.clone(), command("substance", r#"{"name": "x"}"#))
            .await
            .unwrap();

        let events = harness.index.events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].key, EntityKey::new("substance", response.record_id.to_string()));
    }

    #[tokio::test]
    async fn test_duplicate_checksum_is_only_a_hint() {
        let harness = test_context().await;
        let payload = r#"{"name": "aspirin"}"#;

        let first = handle(harness.ctx.clone(), command("substance", payload))
            .await
            .unwrap();
        let second = handle(harness.ctx.clone(), command("substance", payload))
            .await
            .unwrap();
        assert_ne!(first.record_id, second.record_id);
    }
}
