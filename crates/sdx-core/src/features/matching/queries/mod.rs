//! Matching queries

pub mod find_matches;
pub mod find_matches_for_json;

pub use find_matches::{FindMatchesError, FindMatchesQuery};
pub use find_matches_for_json::{FindMatchesForJsonError, FindMatchesForJsonQuery};
