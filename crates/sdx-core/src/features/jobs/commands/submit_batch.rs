//! Submit batch command
//!
//! Accepts a processing configuration set, records a job in `starting`
//! status, and hands the work to the batch runner. The call returns as soon
//! as the job row is written; per-record outcomes appear on the job when the
//! worker finishes.
//!
//! A payload that does not parse is the one hard failure here. Once the
//! submission is accepted, every problem downstream is per-record: the
//! worker converts failures into outcomes and keeps going, and the job
//! always ends `completed`.

use chrono::Utc;
use mediator::Request;
use sdx_common::types::{JobStatus, Principal, RecordOutcome};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::AppContext;
use crate::db::{jobs, DbError};
use crate::features::staging::commands::process_record::{self, ProcessRecordCommand};
use crate::models::{ProcessingActionConfigSet, ProcessingJob};

/// Command to submit a batch of records for asynchronous processing
///
/// `processing_json` is the raw [`ProcessingActionConfigSet`] body: one
/// action chain applied to every target, in target order. `version` and
/// `persist` apply to every record in the batch.
///
/// # Examples
///
/// ```rust,ignore
/// use sdx_core::features::jobs::commands::SubmitBatchCommand;
///
/// let command = SubmitBatchCommand {
///     processing_json: r#"{
///         "processingActions": [{"actionName": "create"}],
///         "targets": [{"stagingRecordId": "8f2fceb0-79a3-4d27-bc16-62f6e1e61a2b"}]
///     }"#.to_string(),
///     version: None,
///     persist: true,
///     principal: None,
/// };
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitBatchCommand {
    pub processing_json: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    pub persist: bool,
    /// Identity the batch runs under; captured at submission, defaults to
    /// the context's provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal: Option<Principal>,
}

/// Response from submitting a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitBatchResponse {
    pub job_id: Uuid,
    pub job_status: JobStatus,
    pub status_message: String,
}

/// Errors that can occur when submitting a batch
#[derive(Debug, thiserror::Error)]
pub enum SubmitBatchError {
    /// The submitted payload is not a valid processing configuration set
    #[error("Invalid processing payload: {0}")]
    InvalidPayload(String),
    /// A database error occurred
    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl Request<Result<SubmitBatchResponse, SubmitBatchError>> for SubmitBatchCommand {}

impl crate::cqrs::middleware::Command for SubmitBatchCommand {}

/// Handles the submit batch command
///
/// 1. Parses the configuration set; a malformed payload fails the call
/// 2. Writes the job row in `starting` status
/// 3. Captures the submitting principal and spawns the worker
///
/// The worker processes targets in order, converts every per-record error
/// into an `INTERNAL_SERVER_ERROR` outcome, and writes the job row exactly
/// once more with status `completed` and the collected results.
///
/// # Errors
///
/// - `InvalidPayload` - The payload is not a valid processing configuration
/// - `Database` - A database error occurred
#[tracing::instrument(skip(ctx, command))]
pub async fn handle(
    ctx: AppContext,
    command: SubmitBatchCommand,
) -> Result<SubmitBatchResponse, SubmitBatchError> {
    let set: ProcessingActionConfigSet = serde_json::from_str(&command.processing_json)
        .map_err(|e| SubmitBatchError::InvalidPayload(e.to_string()))?;

    let job = ProcessingJob::starting(Uuid::new_v4(), command.processing_json.clone());
    let job_id = job.id;

    let mut conn = ctx.pool.acquire().await.map_err(DbError::from)?;
    jobs::insert_job(&mut conn, &job).await?;
    drop(conn);

    let principal = command
        .principal
        .clone()
        .unwrap_or_else(|| ctx.identity.current_principal());

    tracing::info!(
        %job_id,
        targets = set.targets.len(),
        actions = set.processing_actions.len(),
        user = %principal,
        "batch accepted"
    );

    let worker_ctx = ctx.clone();
    let version = command.version;
    let persist = command.persist;
    ctx.runner
        .spawn(job_id, async move {
            let mut results = Vec::with_capacity(set.targets.len());
            for target in &set.targets {
                let processed = process_record::handle(
                    worker_ctx.clone(),
                    ProcessRecordCommand {
                        staging_record_id: target.staging_record_id.clone(),
                        matched_entity_id: target.matched_entity_id.clone(),
                        version,
                        persist,
                        actions: set.processing_actions.clone(),
                        principal: Some(principal.clone()),
                    },
                )
                .await;

                match processed {
                    Ok(outcome) => results.push(outcome),
                    Err(e) => {
                        tracing::error!(
                            %job_id,
                            record = %target.staging_record_id,
                            error = %e,
                            "record processing failed"
                        );
                        results.push(
                            RecordOutcome::internal_error(format!("error: {}", e))
                                .with_staging_area_id(target.staging_record_id.as_str()),
                        );
                    },
                }
            }

            match worker_ctx.pool.acquire().await {
                Ok(mut conn) => {
                    if let Err(e) = jobs::complete_job(
                        &mut conn,
                        job_id,
                        "Processing completed",
                        &results,
                        Utc::now(),
                    )
                    .await
                    {
                        tracing::error!(%job_id, error = %e, "failed to record job completion");
                    }
                },
                Err(e) => {
                    tracing::error!(%job_id, error = %e, "failed to record job completion");
                },
            }
        })
        .await;

    Ok(SubmitBatchResponse {
        job_id,
        job_status: job.job_status,
        status_message: job.status_message,
    })
}
