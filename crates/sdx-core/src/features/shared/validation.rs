//! Shared validation utilities
//!
//! Common input checks used across commands and queries. The record id
//! messages are part of the processing outcome contract and must not drift.
//!
//! # Examples
//!
//! ```rust,ignore
//! use sdx_core::features::shared::validation::{validate_record_id, validate_payload};
//!
//! let id = validate_record_id("8f2fceb0-79a3-4d27-bc16-62f6e1e61a2b")?;
//! let payload = validate_payload(r#"{"name": "aspirin"}"#)?;
//! ```

use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur when validating a staged record id
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordIdError {
    #[error("blank input")]
    Blank,

    #[error("input is not a valid id")]
    InvalidFormat,
}

/// Errors that can occur when validating a record payload
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("Payload is required and cannot be empty")]
    Required,

    #[error("Payload is not valid JSON: {0}")]
    Malformed(String),

    #[error("Payload must be a JSON object")]
    NotAnObject,
}

/// Errors that can occur when validating a record kind
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KindError {
    #[error("Kind is required and cannot be empty")]
    Required,

    #[error("Kind '{0}' is not registered")]
    Unregistered(String),
}

/// Validate a caller-supplied staged record id.
///
/// # Rules
/// - Must not be empty
/// - Must be a hyphenated UUID, optionally wrapped in braces
///
/// # Returns
/// The parsed UUID, or a RecordIdError whose display text is the exact
/// per-record outcome message.
pub fn validate_record_id(input: &str) -> Result<Uuid, RecordIdError> {
    if input.is_empty() {
        return Err(RecordIdError::Blank);
    }

    let bare = input
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .unwrap_or(input);

    // Only the hyphenated form is accepted; the 32-character compact form
    // never appears in staged data and is treated as invalid.
    if bare.len() != 36 {
        return Err(RecordIdError::InvalidFormat);
    }
    Uuid::try_parse(bare).map_err(|_| RecordIdError::InvalidFormat)
}

/// Validate a record payload submitted as raw JSON text.
///
/// # Rules
/// - Must not be empty or whitespace
/// - Must parse as JSON
/// - The top level must be an object
///
/// # Returns
/// The parsed value, or a PayloadError
pub fn validate_payload(payload: &str) -> Result<Value, PayloadError> {
    if payload.trim().is_empty() {
        return Err(PayloadError::Required);
    }

    let value: Value =
        serde_json::from_str(payload).map_err(|e| PayloadError::Malformed(e.to_string()))?;

    if !value.is_object() {
        return Err(PayloadError::NotAnObject);
    }
    Ok(value)
}

/// Validate a record kind against the deployment's registered kinds
pub fn validate_kind(kind: &str, registered: &[String]) -> Result<(), KindError> {
    if kind.is_empty() {
        return Err(KindError::Required);
    }
    if !registered.iter().any(|k| k == kind) {
        return Err(KindError::Unregistered(kind.to_string()));
    }
    Ok(())
}
