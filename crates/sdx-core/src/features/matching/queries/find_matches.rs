//! Find matches query
//!
//! Probes the search index with a list of matchable tuples and summarizes
//! which tuples resolved to existing entities.

use mediator::Request;
use serde::{Deserialize, Serialize};

use crate::context::AppContext;
use crate::features::shared::validation::{validate_kind, KindError};
use crate::models::{MatchableKeyValue, MatchedKeyValue, MatchedRecordSummary};
use crate::services::StoreError;

/// Query to match a set of tuples against the entity index
///
/// Tuples are probed in list order and the summary preserves that order.
///
/// # Examples
///
/// ```rust,ignore
/// use sdx_core::features::matching::queries::FindMatchesQuery;
/// use sdx_core::models::MatchableKeyValue;
///
/// let query = FindMatchesQuery {
///     kind: "substance".to_string(),
///     query: vec![
///         MatchableKeyValue::new("CAS", "50-78-2"),
///         MatchableKeyValue::new("Name", "aspirin"),
///     ],
/// };
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindMatchesQuery {
    pub kind: String,
    pub query: Vec<MatchableKeyValue>,
}

/// Error type for find matches query
///
/// An unregistered kind is a configuration error of the call itself and is
/// never converted into a per-record outcome.
#[derive(Debug, thiserror::Error)]
pub enum FindMatchesError {
    /// The kind is missing or not registered for this deployment
    #[error("Kind validation failed: {0}")]
    Kind(#[from] KindError),
    /// The search index backend failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl Request<Result<MatchedRecordSummary, FindMatchesError>> for FindMatchesQuery {}

impl crate::cqrs::middleware::Query for FindMatchesQuery {}

/// Handles the find matches query
///
/// Probes the index once per tuple, in query order. Only tuples with at
/// least one hit contribute a match entry; the summary's derived views
/// (multiply matched keys, entities per key) are computed by the caller from
/// the returned snapshot.
///
/// # Errors
///
/// - `Kind` - The kind is empty or not registered
/// - `Store` - The search index backend failed
#[tracing::instrument(skip(ctx, query), fields(kind = %query.kind, tuples = query.query.len()))]
pub async fn handle(
    ctx: AppContext,
    query: FindMatchesQuery,
) -> Result<MatchedRecordSummary, FindMatchesError> {
    validate_kind(&query.kind, &ctx.config.matching.registered_kinds)?;

    let mut matches = Vec::new();
    for tuple in &query.query {
        let hits = ctx.index.probe(&query.kind, &tuple.key, &tuple.value).await?;
        if !hits.is_empty() {
            matches.push(MatchedKeyValue::new(tuple.clone(), hits));
        }
    }

    tracing::debug!(matched = matches.len(), "matching probe finished");
    Ok(MatchedRecordSummary::new(query.query, matches))
}
