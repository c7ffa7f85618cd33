//! Batch processing jobs feature
//!
//! A submission writes a job row in `starting` status and returns
//! immediately. A bounded worker pool runs the batch, producing one outcome
//! per target in submission order, and writes the row exactly once more as
//! `completed`. Queries poll job state by id or page through history.

pub mod commands;
pub mod queries;

pub use commands::{SubmitBatchCommand, SubmitBatchError, SubmitBatchResponse};
pub use queries::{GetJobError, GetJobQuery, ListJobsError, ListJobsQuery, ListJobsResponse};
