//! Find matches for JSON query
//!
//! Convenience wrapper over [`find_matches`](super::find_matches): extracts
//! the matchable tuples from a raw JSON payload first, then probes with them.
//! This is how callers match a candidate record they have not staged yet.

use mediator::Request;
use serde::{Deserialize, Serialize};

use crate::context::AppContext;
use crate::features::matching::queries::find_matches::{self, FindMatchesError, FindMatchesQuery};
use crate::features::shared::validation::{validate_payload, PayloadError};
use crate::models::MatchedRecordSummary;

/// Query to match a raw JSON payload against the entity index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindMatchesForJsonQuery {
    pub kind: String,
    pub payload: String,
}

/// Error type for find matches for JSON query
#[derive(Debug, thiserror::Error)]
pub enum FindMatchesForJsonError {
    /// The payload is empty, malformed, or not a JSON object
    #[error("Payload validation failed: {0}")]
    Payload(#[from] PayloadError),
    /// Kind resolution or the index probe failed
    #[error(transparent)]
    Matches(#[from] FindMatchesError),
}

impl Request<Result<MatchedRecordSummary, FindMatchesForJsonError>> for FindMatchesForJsonQuery {}

impl crate::cqrs::middleware::Query for FindMatchesForJsonQuery {}

/// Handles the find matches for JSON query
///
/// # Errors
///
/// - `Payload` - The payload is empty, malformed, or not a JSON object
/// - `Matches` - The kind is not registered, or the index probe failed
#[tracing::instrument(skip(ctx, query), fields(kind = %query.kind))]
pub async fn handle(
    ctx: AppContext,
    query: FindMatchesForJsonQuery,
) -> Result<MatchedRecordSummary, FindMatchesForJsonError> {
    let payload = validate_payload(&query.payload)?;
    let tuples = ctx.extractor.extract(&query.kind, &payload);

    let summary = find_matches::handle(
        ctx.clone(),
        FindMatchesQuery {
            kind: query.kind,
            query: tuples,
        },
    )
    .await?;
    Ok(summary)
}
