//! Batch processing job state

use chrono::{DateTime, Utc};
use sdx_common::types::{JobStatus, RecordOutcome};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Durable state of one batch submission.
///
/// A job row is written exactly twice: once at submission (status
/// `starting`) and once on completion (status `completed`, with the
/// per-record outcomes attached). The raw submitted JSON is kept in
/// `job_data` for replay and audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingJob {
    pub id: Uuid,
    pub start_date: DateTime<Utc>,
    pub job_data: String,
    pub job_status: JobStatus,
    pub status_message: String,
    #[serde(default)]
    pub results: Vec<RecordOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl ProcessingJob {
    /// New job in the `starting` state
    pub fn starting(id: Uuid, job_data: impl Into<String>) -> Self {
        Self {
            id,
            start_date: Utc::now(),
            job_data: job_data.into(),
            job_status: JobStatus::Starting,
            status_message: "Processing started".to_string(),
            results: Vec::new(),
            completed_at: None,
        }
    }
}
