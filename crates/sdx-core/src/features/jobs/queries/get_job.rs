//! Get job query
//!
//! Looks up a single processing job by id. This is the polling endpoint for
//! batch submitters: a job read back while the worker is still running shows
//! `starting` with no results, and shows `completed` with the full outcome
//! list afterwards.

use mediator::Request;
use uuid::Uuid;

use crate::context::AppContext;
use crate::db::{jobs, DbError};
use crate::models::ProcessingJob;

/// Query to get a processing job by id
///
/// The id stays a string so a malformed value reads as an absent job rather
/// than a parse failure.
///
/// # Examples
///
/// ```rust,ignore
/// use sdx_core::features::jobs::queries::GetJobQuery;
///
/// let query = GetJobQuery {
///     job_id: "0b7f9d08-2a2f-46a7-af37-0edc2e6c9f5d".to_string(),
/// };
/// ```
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct GetJobQuery {
    pub job_id: String,
}

/// Errors that can occur when getting a job
#[derive(Debug, thiserror::Error)]
pub enum GetJobError {
    /// No job exists for the given input
    #[error("No processing job found for input")]
    NotFound,
    /// A database error occurred
    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl Request<Result<ProcessingJob, GetJobError>> for GetJobQuery {}

impl crate::cqrs::middleware::Query for GetJobQuery {}

/// Handles the get job query
///
/// # Errors
///
/// - `NotFound` - The id is malformed or no job row exists for it
/// - `Database` - A database error occurred
#[tracing::instrument(skip(ctx, query), fields(job_id = %query.job_id))]
pub async fn handle(ctx: AppContext, query: GetJobQuery) -> Result<ProcessingJob, GetJobError> {
    let Ok(job_id) = Uuid::parse_str(query.job_id.trim()) else {
        return Err(GetJobError::NotFound);
    };

    let mut conn = ctx.pool.acquire().await.map_err(DbError::from)?;
    jobs::find_job(&mut conn, job_id)
        .await?
        .ok_or(GetJobError::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::shared::test_helpers::test_context;
    use chrono::Utc;
    use sdx_common::types::{JobStatus, RecordOutcome};

    #[tokio::test]
    async fn test_reads_back_completed_job() {
        let harness = test_context().await;
        let job = crate::models::ProcessingJob::starting(Uuid::new_v4(), r#"{"targets":[]}"#);
        let mut conn = harness.ctx.pool.acquire().await.unwrap();
        jobs::insert_job(&mut conn, &job).await.unwrap();
        let outcomes = vec![RecordOutcome::ok("r-1", "Import record processed successfully")];
        jobs::complete_job(&mut conn, job.id, "Processing completed", &outcomes, Utc::now())
            .await
            .unwrap();
        drop(conn);

        let found = handle(
            harness.ctx.clone(),
            GetJobQuery {
                job_id: job.id.to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(found.job_status, JobStatus::Completed);
        assert_eq!(found.status_message, "Processing completed");
        assert_eq!(found.results, outcomes);
        assert_eq!(found.job_data, r#"{"targets":[]}"#);
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let harness = test_context().await;
        let err = handle(
            harness.ctx.clone(),
            GetJobQuery {
                job_id: Uuid::new_v4().to_string(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, GetJobError::NotFound));
    }

    #[tokio::test]
    async fn test_malformed_id_is_not_found() {
        let harness = test_context().await;
        let err = handle(
            harness.ctx.clone(),
            GetJobQuery {
                job_id: "definitely-not-a-uuid".to_string(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, GetJobError::NotFound));
        assert_eq!(err.to_string(), "No processing job found for input");
    }
}
