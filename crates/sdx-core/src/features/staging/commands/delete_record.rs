//! Delete staged record version command
//!
//! Removes one stored version of a staged record. When the last version goes,
//! the record's metadata, mappings, and findings go with it.

use mediator::Request;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::AppContext;
use crate::db::{records, DbError};

/// Command to delete one version of a staged record
///
/// A `version` of zero or below selects the latest stored version, the same
/// convention retrieval uses.
///
/// # Examples
///
/// ```rust,ignore
/// use sdx_core::features::staging::commands::DeleteRecordCommand;
///
/// // drop the latest version
/// let command = DeleteRecordCommand { record_id, version: 0 };
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteRecordCommand {
    pub record_id: Uuid,
    pub version: i64,
}

/// Response from deleting a record version
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRecordResponse {
    pub record_id: Uuid,
    /// The version that was removed
    pub version: i64,
    /// True when no versions remain and the whole record is gone
    pub record_removed: bool,
}

/// Errors that can occur when deleting a record version
#[derive(Debug, thiserror::Error)]
pub enum DeleteRecordError {
    /// The record, or the requested version of it, does not exist
    #[error("Staging record with ID '{0}' version {1} not found")]
    NotFound(Uuid, i64),
    /// A database error occurred
    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl Request<Result<DeleteRecordResponse, DeleteRecordError>> for DeleteRecordCommand {}

impl crate::cqrs::middleware::Command for DeleteRecordCommand {}

/// Handles the delete record command
///
/// In one transaction:
/// 1. Resolves version zero or below to the latest stored version
/// 2. Deletes that version row
/// 3. Purges metadata, mappings, and findings if no versions remain
///
/// # Errors
///
/// - `NotFound` - No record exists under this id, or the requested version
///   does not exist
/// - `Database` - A database error occurred
#[tracing::instrument(skip(ctx))]
pub async fn handle(
    ctx: AppContext,
    command: DeleteRecordCommand,
) -> Result<DeleteRecordResponse, DeleteRecordError> {
    let mut tx = ctx.pool.begin().await.map_err(DbError::from)?;

    let version = if command.version > 0 {
        command.version
    } else {
        records::latest_version(&mut tx, command.record_id)
            .await?
            .ok_or(DeleteRecordError::NotFound(command.record_id, command.version))?
    };

    let deleted = records::delete_version(&mut tx, command.record_id, version).await?;
    if deleted == 0 {
        return Err(DeleteRecordError::NotFound(command.record_id, version));
    }

    let record_removed = records::latest_version(&mut tx, command.record_id)
        .await?
        .is_none();
    if record_removed {
        records::purge_metadata(&mut tx, command.record_id).await?;
    }

    tx.commit().await.map_err(DbError::from)?;

    tracing::info!(
        record_id = %command.record_id,
        version,
        record_removed,
        "record version deleted"
    );

    Ok(DeleteRecordResponse {
        record_id: command.record_id,
        version,
        record_removed,
    })
}
