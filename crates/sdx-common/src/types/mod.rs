//! Common types used across SDX
//!
//! Wire-level types shared between the core staging library, embedding hosts,
//! and the CLI. Serde renames on these types are load-bearing: existing
//! clients consume the camelCase field names and the uppercase status strings.

use serde::{Deserialize, Serialize};

// ============================================================================
// Record Lifecycle
// ============================================================================

/// Lifecycle status of a staged record.
///
/// Every record enters as `Staged`. Processing moves it to `Merged`,
/// `Imported`, or `Rejected`. `Imported` is terminal: further processing
/// attempts are refused before any action runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    #[default]
    Staged,
    Merged,
    Imported,
    Rejected,
}

impl RecordStatus {
    /// True when a processed object with this status must be written to the
    /// authoritative entity store.
    pub fn requires_save(self) -> bool {
        matches!(self, RecordStatus::Imported | RecordStatus::Merged)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RecordStatus::Staged => "staged",
            RecordStatus::Merged => "merged",
            RecordStatus::Imported => "imported",
            RecordStatus::Rejected => "rejected",
        }
    }
}

impl std::str::FromStr for RecordStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "staged" => Ok(RecordStatus::Staged),
            "merged" => Ok(RecordStatus::Merged),
            "imported" => Ok(RecordStatus::Imported),
            "rejected" => Ok(RecordStatus::Rejected),
            other => Err(format!("unknown record status: {}", other)),
        }
    }
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Processing Outcomes
// ============================================================================

/// Status code attached to a per-record processing outcome.
///
/// Serialized as the uppercase strings clients already parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeStatus {
    Ok,
    BadRequest,
    InternalServerError,
}

impl std::fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutcomeStatus::Ok => write!(f, "OK"),
            OutcomeStatus::BadRequest => write!(f, "BAD_REQUEST"),
            OutcomeStatus::InternalServerError => write!(f, "INTERNAL_SERVER_ERROR"),
        }
    }
}

/// Structured result of processing one staged record.
///
/// Record-scoped failures become outcomes with `BadRequest` or
/// `InternalServerError` status; they never abort a surrounding batch.
///
/// # Examples
///
/// ```rust
/// use sdx_common::types::{OutcomeStatus, RecordOutcome};
///
/// let outcome = RecordOutcome::ok("abc-123", "Import record processed successfully");
/// assert_eq!(outcome.status, OutcomeStatus::Ok);
/// assert_eq!(outcome.staging_area_id.as_deref(), Some("abc-123"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordOutcome {
    /// Identifier of the staged record this outcome belongs to
    #[serde(rename = "stagingAreaId", skip_serializing_if = "Option::is_none")]
    pub staging_area_id: Option<String>,

    /// Outcome status code
    pub status: OutcomeStatus,

    /// Human-readable description of what happened
    pub message: String,
}

impl RecordOutcome {
    pub fn ok(staging_area_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            staging_area_id: Some(staging_area_id.into()),
            status: OutcomeStatus::Ok,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            staging_area_id: None,
            status: OutcomeStatus::BadRequest,
            message: message.into(),
        }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self {
            staging_area_id: None,
            status: OutcomeStatus::InternalServerError,
            message: message.into(),
        }
    }

    pub fn with_staging_area_id(mut self, id: impl Into<String>) -> Self {
        self.staging_area_id = Some(id.into());
        self
    }
}

// ============================================================================
// Batch Jobs
// ============================================================================

/// Status of an asynchronous batch processing job.
///
/// Jobs move through exactly one transition: `Starting` at submission,
/// `Completed` when every target has an outcome. Per-record failures do not
/// produce a failed job status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Starting,
    Completed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Starting => "starting",
            JobStatus::Completed => "completed",
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "starting" => Ok(JobStatus::Starting),
            "completed" => Ok(JobStatus::Completed),
            other => Err(format!("unknown job status: {}", other)),
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Entities and Identity
// ============================================================================

/// Identity of an entity in the authoritative store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityKey {
    /// Entity kind (e.g., "substance")
    pub kind: String,

    /// Store-assigned identifier within the kind
    pub id: String,
}

impl EntityKey {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
        }
    }
}

impl std::fmt::Display for EntityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

/// Identity on whose behalf processing runs.
///
/// Captured once at submission and passed explicitly through the batch
/// pipeline, so spawned workers never consult ambient security state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub username: String,
}

impl Principal {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.username)
    }
}
