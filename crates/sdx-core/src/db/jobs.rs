//! Processing job queries
//!
//! A job row is written exactly twice: inserted when the batch is accepted
//! and updated once when it finishes. `results` holds the per-record
//! outcomes as a JSON array, NULL until completion.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use uuid::Uuid;

use super::{DbError, DbResult};
use crate::models::ProcessingJob;
use sdx_common::types::{JobStatus, RecordOutcome};

#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: String,
    start_date: DateTime<Utc>,
    job_data: String,
    job_status: String,
    status_message: String,
    results: Option<String>,
    completed_at: Option<DateTime<Utc>>,
}

impl JobRow {
    fn into_job(self) -> DbResult<ProcessingJob> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| DbError::Corrupt(format!("job id '{}': {}", self.id, e)))?;
        let job_status: JobStatus = self
            .job_status
            .parse()
            .map_err(|e: String| DbError::Corrupt(e))?;
        let results: Vec<RecordOutcome> = match self.results {
            Some(json) => serde_json::from_str(&json)
                .map_err(|e| DbError::Corrupt(format!("job '{}' results: {}", id, e)))?,
            None => Vec::new(),
        };
        Ok(ProcessingJob {
            id,
            start_date: self.start_date,
            job_data: self.job_data,
            job_status,
            status_message: self.status_message,
            results,
            completed_at: self.completed_at,
        })
    }
}

const SELECT_JOB: &str = r#"
    SELECT id, start_date, job_data, job_status, status_message, results, completed_at
    FROM processing_jobs
"#;

pub(crate) async fn insert_job(conn: &mut SqliteConnection, job: &ProcessingJob) -> DbResult<()> {
    let results = if job.results.is_empty() {
        None
    } else {
        Some(encode_results(&job.results)?)
    };

    sqlx::query(
        r#"
        INSERT INTO processing_jobs
            (id, start_date, job_data, job_status, status_message, results, completed_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(job.id.to_string())
    .bind(job.start_date)
    .bind(&job.job_data)
    .bind(job.job_status.as_str())
    .bind(&job.status_message)
    .bind(results)
    .bind(job.completed_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Mark a job completed and attach its per-record outcomes
pub(crate) async fn complete_job(
    conn: &mut SqliteConnection,
    job_id: Uuid,
    status_message: &str,
    results: &[RecordOutcome],
    completed_at: DateTime<Utc>,
) -> DbResult<()> {
    let updated = sqlx::query(
        r#"
        UPDATE processing_jobs
        SET job_status = ?2, status_message = ?3, results = ?4, completed_at = ?5
        WHERE id = ?1
        "#,
    )
    .bind(job_id.to_string())
    .bind(JobStatus::Completed.as_str())
    .bind(status_message)
    .bind(encode_results(results)?)
    .bind(completed_at)
    .execute(&mut *conn)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(DbError::not_found("processing job", &job_id.to_string()));
    }
    Ok(())
}

pub(crate) async fn find_job(
    conn: &mut SqliteConnection,
    job_id: Uuid,
) -> DbResult<Option<ProcessingJob>> {
    let row: Option<JobRow> = sqlx::query_as(&format!("{} WHERE id = ?1", SELECT_JOB))
        .bind(job_id.to_string())
        .fetch_optional(&mut *conn)
        .await?;
    row.map(JobRow::into_job).transpose()
}

/// Jobs newest first
pub(crate) async fn list_jobs(
    conn: &mut SqliteConnection,
    limit: i64,
    offset: i64,
) -> DbResult<Vec<ProcessingJob>> {
    let rows: Vec<JobRow> = sqlx::query_as(&format!(
        "{} ORDER BY start_date DESC, id LIMIT ?1 OFFSET ?2",
        SELECT_JOB
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(&mut *conn)
    .await?;
    rows.into_iter().map(JobRow::into_job).collect()
}

fn encode_results(results: &[RecordOutcome]) -> DbResult<String> {
    serde_json::to_string(results)
        .map_err(|e| DbError::Corrupt(format!("encoding job results: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;

    #[tokio::test]
    async fn test_job_round_trip() {
        let pool = open_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let job = ProcessingJob::starting(Uuid::new_v4(), r#"{"targets":[]}"#);
        insert_job(&mut conn, &job).await.unwrap();

        let loaded = find_job(&mut conn, job.id).await.unwrap().unwrap();
        assert_eq!(loaded.job_status, JobStatus::Starting);
        assert_eq!(loaded.status_message, "Processing started");
        assert!(loaded.results.is_empty());
        assert!(loaded.completed_at.is_none());

        assert!(find_job(&mut conn, Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_complete_job_attaches_results() {
        let pool = open_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let job = ProcessingJob::starting(Uuid::new_v4(), "{}");
        insert_job(&mut conn, &job).await.unwrap();

        let results = vec![
            RecordOutcome::ok("r-1", "Import record processed successfully"),
            RecordOutcome::bad_request("blank input"),
        ];
        complete_job(&mut conn, job.id, "Processing completed", &results, Utc::now())
            .await
            .unwrap();

        let loaded = find_job(&mut conn, job.id).await.unwrap().unwrap();
        assert_eq!(loaded.job_status, JobStatus::Completed);
        assert_eq!(loaded.status_message, "Processing completed");
        assert_eq!(loaded.results, results);
        assert!(loaded.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_complete_unknown_job_errors() {
        let pool = open_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let err = complete_job(&mut conn, Uuid::new_v4(), "done", &[], Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_jobs_newest_first() {
        let pool = open_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let mut first = ProcessingJob::starting(Uuid::new_v4(), "{}");
        first.start_date = Utc::now() - chrono::Duration::seconds(10);
        let second = ProcessingJob::starting(Uuid::new_v4(), "{}");

        insert_job(&mut conn, &first).await.unwrap();
        insert_job(&mut conn, &second).await.unwrap();

        let jobs = list_jobs(&mut conn, 10, 0).await.unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].id, second.id);
        assert_eq!(jobs[1].id, first.id);

        let paged = list_jobs(&mut conn, 1, 1).await.unwrap();
        assert_eq!(paged.len(), 1);
        assert_eq!(paged[0].id, first.id);
    }
}
