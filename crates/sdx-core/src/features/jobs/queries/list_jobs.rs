//! List jobs query
//!
//! Pages through processing jobs, most recently started first.

use mediator::Request;
use serde::{Deserialize, Serialize};

use crate::context::AppContext;
use crate::db::{jobs, DbError};
use crate::models::ProcessingJob;

/// Query to list processing jobs
///
/// # Examples
///
/// ```rust,ignore
/// use sdx_core::features::jobs::queries::ListJobsQuery;
///
/// let query = ListJobsQuery {
///     limit: Some(20),
///     offset: None,
/// };
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListJobsQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
}

/// Response containing a page of jobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListJobsResponse {
    pub jobs: Vec<ProcessingJob>,
    pub total: i64,
}

/// Errors that can occur when listing jobs
#[derive(Debug, thiserror::Error)]
pub enum ListJobsError {
    /// A database error occurred
    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl Request<Result<ListJobsResponse, ListJobsError>> for ListJobsQuery {}

impl crate::cqrs::middleware::Query for ListJobsQuery {}

/// Handles the list jobs query
///
/// # Errors
///
/// - `Database` - A database error occurred
#[tracing::instrument(skip(ctx, query))]
pub async fn handle(ctx: AppContext, query: ListJobsQuery) -> Result<ListJobsResponse, ListJobsError> {
    let limit = query.limit.unwrap_or(100).min(1000); // Max 1000
    let offset = query.offset.unwrap_or(0);

    let mut conn = ctx.pool.acquire().await.map_err(DbError::from)?;
    let jobs = jobs::list_jobs(&mut conn, limit, offset).await?;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM processing_jobs")
        .fetch_one(&mut *conn)
        .await
        .map_err(DbError::from)?;

    Ok(ListJobsResponse { jobs, total })
}
