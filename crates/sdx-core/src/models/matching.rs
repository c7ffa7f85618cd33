//! Matchable tuples and match summaries

use sdx_common::types::EntityKey;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One key/value field a record can be matched on
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchableKeyValue {
    pub key: String,
    pub value: String,
}

impl MatchableKeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl std::fmt::Display for MatchableKeyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// One query tuple together with the entities it matched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedKeyValue {
    /// The query tuple that produced these hits
    pub tuple_used_in_matching: MatchableKeyValue,
    /// Entities the tuple resolved to, in index order
    pub matching_records: Vec<EntityKey>,
}

impl MatchedKeyValue {
    pub fn new(tuple: MatchableKeyValue, matching_records: Vec<EntityKey>) -> Self {
        Self {
            tuple_used_in_matching: tuple,
            matching_records,
        }
    }
}

/// Result of probing the index with a record's matchable tuples.
///
/// `query` holds every tuple probed, in probe order; `matches` holds an entry
/// per tuple that produced at least one hit, in the same order. Every
/// `tuple_used_in_matching` is a member of `query`. The derived queries below
/// are pure views over this snapshot and never touch the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchedRecordSummary {
    pub query: Vec<MatchableKeyValue>,
    pub matches: Vec<MatchedKeyValue>,
}

impl MatchedRecordSummary {
    pub fn new(query: Vec<MatchableKeyValue>, matches: Vec<MatchedKeyValue>) -> Self {
        Self { query, matches }
    }

    /// True when no tuple matched anything
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Keys that participated in an ambiguous match.
    ///
    /// A key counts as multiply matched when it appears among the matches and
    /// the summary holds more than one match entry overall. The count is over
    /// match entries, not over distinct entities: two tuples resolving to the
    /// same entity still flag ambiguity. Keys come back deduplicated in query
    /// order.
    pub fn multiply_matched_keys(&self) -> Vec<String> {
        if self.matches.len() <= 1 {
            return Vec::new();
        }

        let matched: HashSet<&str> = self
            .matches
            .iter()
            .map(|m| m.tuple_used_in_matching.key.as_str())
            .collect();

        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        for tuple in &self.query {
            if matched.contains(tuple.key.as_str()) && seen.insert(tuple.key.as_str()) {
                keys.push(tuple.key.clone());
            }
        }
        keys
    }

    /// Distinct keys of the query, in order of first occurrence
    pub fn unique_matching_keys(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        for tuple in &self.query {
            if seen.insert(tuple.key.as_str()) {
                keys.push(tuple.key.clone());
            }
        }
        keys
    }

    /// Entities reachable through any match whose tuple key is in `keys`,
    /// deduplicated, in match order
    pub fn entities_matching_keys(&self, keys: &[String]) -> Vec<EntityKey> {
        let mut seen = HashSet::new();
        let mut entities = Vec::new();
        for matched in &self.matches {
            if !keys.contains(&matched.tuple_used_in_matching.key) {
                continue;
            }
            for entity in &matched.matching_records {
                if seen.insert((entity.kind.clone(), entity.id.clone())) {
                    entities.push(entity.clone());
                }
            }
        }
        entities
    }

    /// All matched entities regardless of key, deduplicated
    pub fn all_matched_entities(&self) -> Vec<EntityKey> {
        self.entities_matching_keys(&self.unique_matching_keys())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuple(key: &str, value: &str) -> MatchableKeyValue {
        MatchableKeyValue::new(key, value)
    }

    fn entity(id: &str) -> EntityKey {
        EntityKey::new("substance", id)
    }

    #[test]
    fn test_multiply_matched_requires_more_than_one_match() {
        let summary = MatchedRecordSummary::new(
            vec![tuple("CAS", "50-78-2"), tuple("Name", "aspirin")],
            vec![MatchedKeyValue::new(tuple("CAS", "50-78-2"), vec![entity("e1")])],
        );
        assert!(summary.multiply_matched_keys().is_empty());
    }

    #[test]
    fn test_multiply_matched_counts_matches_not_entities() {
        // Two match entries that resolve to the same single entity still
        // count as ambiguity.
        let summary = MatchedRecordSummary::new(
            vec![tuple("CAS", "50-78-2"), tuple("Name", "aspirin")],
            vec![
                MatchedKeyValue::new(tuple("CAS", "50-78-2"), vec![entity("e1")]),
                MatchedKeyValue::new(tuple("Name", "aspirin"), vec![entity("e1")]),
            ],
        );
        assert_eq!(summary.multiply_matched_keys(), vec!["CAS", "Name"]);
    }

    #[test]
    fn test_multiply_matched_preserves_query_order() {
        let summary = MatchedRecordSummary::new(
            vec![tuple("Name", "aspirin"), tuple("CAS", "50-78-2")],
            vec![
                MatchedKeyValue::new(tuple("CAS", "50-78-2"), vec![entity("e1")]),
                MatchedKeyValue::new(tuple("Name", "aspirin"), vec![entity("e2")]),
            ],
        );
        assert_eq!(summary.multiply_matched_keys(), vec!["Name", "CAS"]);
    }

    #[test]
    fn test_unique_matching_keys_dedup_first_occurrence() {
        let summary = MatchedRecordSummary::new(
            vec![
                tuple("Name", "aspirin"),
                tuple("CAS", "50-78-2"),
                tuple("Name", "acetylsalicylic acid"),
                tuple("UNII", "R16CO5Y76E"),
            ],
            vec![],
        );
        assert_eq!(summary.unique_matching_keys(), vec!["Name", "CAS", "UNII"]);
    }

    #[test]
    fn test_entities_matching_keys_dedups_entities() {
        let summary = MatchedRecordSummary::new(
            vec![tuple("Name", "aspirin"), tuple("CAS", "50-78-2")],
            vec![
                MatchedKeyValue::new(tuple("Name", "aspirin"), vec![entity("e1"), entity("e2")]),
                MatchedKeyValue::new(tuple("CAS", "50-78-2"), vec![entity("e1")]),
            ],
        );

        let hits = summary.entities_matching_keys(&["Name".to_string(), "CAS".to_string()]);
        assert_eq!(hits, vec![entity("e1"), entity("e2")]);

        let name_only = summary.entities_matching_keys(&["CAS".to_string()]);
        assert_eq!(name_only, vec![entity("e1")]);
    }

    #[test]
    fn test_all_matched_entities_spans_every_key() {
        let summary = MatchedRecordSummary::new(
            vec![tuple("Name", "aspirin"), tuple("CAS", "50-78-2")],
            vec![
                MatchedKeyValue::new(tuple("Name", "aspirin"), vec![entity("e1")]),
                MatchedKeyValue::new(tuple("CAS", "50-78-2"), vec![entity("e2"), entity("e1")]),
            ],
        );
        assert_eq!(summary.all_matched_entities(), vec![entity("e1"), entity("e2")]);
    }

    #[test]
    fn test_entities_matching_unknown_key_is_empty() {
        let summary = MatchedRecordSummary::new(
            vec![tuple("Name", "aspirin")],
            vec![MatchedKeyValue::new(tuple("Name", "aspirin"), vec![entity("e1")])],
        );
        assert!(summary.entities_matching_keys(&["UNII".to_string()]).is_empty());
    }

    #[test]
    fn test_wire_shape_uses_camel_case() {
        let summary = MatchedRecordSummary::new(
            vec![tuple("Name", "aspirin")],
            vec![MatchedKeyValue::new(tuple("Name", "aspirin"), vec![entity("e1")])],
        );
        let value = serde_json::to_value(&summary).unwrap();
        assert!(value["matches"][0].get("tupleUsedInMatching").is_some());
        assert!(value["matches"][0].get("matchingRecords").is_some());
    }
}
