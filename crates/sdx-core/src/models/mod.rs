//! Domain models
//!
//! Staged records and their metadata, matching tuples and summaries,
//! processing action configuration, and batch job state. Serde attributes on
//! the wire-facing types keep the camelCase field names existing clients
//! depend on.

pub mod job;
pub mod matching;
pub mod processing;
pub mod record;

pub use job::ProcessingJob;
pub use matching::{MatchableKeyValue, MatchedKeyValue, MatchedRecordSummary};
pub use processing::{ProcessingActionConfig, ProcessingActionConfigSet, ProcessingTarget};
pub use record::{FindingLevel, RecordMetadata, StagingRecord, ValidationFinding};

pub use sdx_common::types::RecordStatus;
