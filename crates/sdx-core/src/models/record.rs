//! Staged records and their metadata

use chrono::{DateTime, Utc};
use sdx_common::types::RecordStatus;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::matching::MatchableKeyValue;

/// One immutable version of a staged record.
///
/// Updates never modify a stored version; they insert the next version under
/// the same `record_id`. The payload is kept verbatim as submitted, with a
/// sha256 checksum for duplicate spotting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagingRecord {
    pub record_id: Uuid,
    pub version: i64,
    pub kind: String,
    pub payload: String,
    pub payload_checksum: String,
    pub created_at: DateTime<Utc>,
}

/// Mutable bookkeeping attached to a staged record.
///
/// There is one metadata row per `record_id` regardless of how many payload
/// versions exist. The key/value mappings are the matchable tuples extracted
/// from the latest payload, in extraction order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub record_id: Uuid,
    pub status: RecordStatus,
    pub key_value_mappings: Vec<MatchableKeyValue>,
    pub validations: Vec<ValidationFinding>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Severity of a validation finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingLevel {
    Info,
    Warning,
    Error,
}

impl FindingLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            FindingLevel::Info => "info",
            FindingLevel::Warning => "warning",
            FindingLevel::Error => "error",
        }
    }
}

impl std::str::FromStr for FindingLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(FindingLevel::Info),
            "warning" => Ok(FindingLevel::Warning),
            "error" => Ok(FindingLevel::Error),
            other => Err(format!("unknown finding level: {}", other)),
        }
    }
}

/// One validation message recorded against a staged record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationFinding {
    pub level: FindingLevel,
    pub message: String,
}

impl ValidationFinding {
    pub fn new(level: FindingLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}
