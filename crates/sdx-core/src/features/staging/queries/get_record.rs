//! Get staged record query
//!
//! Returns one payload version of a staged record together with its metadata.

use mediator::Request;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::AppContext;
use crate::db::{records, DbError};
use crate::models::{RecordMetadata, StagingRecord};

/// Query to fetch a staged record
///
/// `version` of zero or below (or `None`) selects the latest stored version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetRecordQuery {
    pub record_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
}

/// One record version plus the record's metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetRecordResponse {
    pub record: StagingRecord,
    pub metadata: RecordMetadata,
}

/// Error type for get record query
#[derive(Debug, thiserror::Error)]
pub enum GetRecordError {
    /// The record, or the requested version of it, does not exist
    #[error("Staging record with ID '{0}' not found")]
    NotFound(Uuid),
    /// A database error occurred
    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl Request<Result<GetRecordResponse, GetRecordError>> for GetRecordQuery {}

impl crate::cqrs::middleware::Query for GetRecordQuery {}

/// Handles the get record query
///
/// # Errors
///
/// - `NotFound` - No record exists under this id, or the requested version
///   does not exist
/// - `Database` - A database error occurred
#[tracing::instrument(skip(ctx))]
pub async fn handle(
    ctx: AppContext,
    query: GetRecordQuery,
) -> Result<GetRecordResponse, GetRecordError> {
    let mut conn = ctx.pool.acquire().await.map_err(DbError::from)?;

    let version = query.version.filter(|v| *v > 0);
    let record = records::find_record(&mut conn, query.record_id, version)
        .await?
        .ok_or(GetRecordError::NotFound(query.record_id))?;
    let metadata = records::find_metadata(&mut conn, query.record_id)
        .await?
        .ok_or(GetRecordError::NotFound(query.record_id))?;

    Ok(GetRecordResponse { record, metadata })
}
