//! Matching engine feature
//!
//! Probes the entity index with extracted key/value tuples and reports which
//! tuples resolved to existing entities. The summary is a pure snapshot; its
//! derived views never touch the store again.

pub mod queries;

pub use queries::{
    FindMatchesError, FindMatchesForJsonError, FindMatchesForJsonQuery, FindMatchesQuery,
};
