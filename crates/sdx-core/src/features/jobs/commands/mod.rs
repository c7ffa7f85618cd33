//! Job commands

pub mod submit_batch;

pub use submit_batch::{SubmitBatchCommand, SubmitBatchError, SubmitBatchResponse};
