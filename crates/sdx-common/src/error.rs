//! Error types for SDX

use thiserror::Error;

/// Result type alias for SDX operations
pub type Result<T> = std::result::Result<T, SdxError>;

/// Main error type for SDX
///
/// Record-scoped variants (`BadInput`, `NotFound`, `ActionFailed`,
/// `Persistence`) are converted into structured per-record outcomes at the
/// processing boundary. `Configuration` is the only category that propagates
/// out of batch processing as a hard error.
#[derive(Error, Debug)]
pub enum SdxError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Bad input: {0}")]
    BadInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Processing action failed: {0}")]
    ActionFailed(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl SdxError {
    /// True when the error is scoped to a single record and should surface as
    /// a structured outcome rather than abort the enclosing call.
    pub fn is_record_scoped(&self) -> bool {
        matches!(
            self,
            SdxError::BadInput(_)
                | SdxError::NotFound(_)
                | SdxError::ActionFailed(_)
                | SdxError::Persistence(_)
        )
    }
}
