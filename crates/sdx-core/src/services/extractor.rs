//! Configured JSON-pointer field extraction

use serde_json::Value;
use std::collections::HashMap;

use super::MatchableExtractor;
use crate::config::{ExtractionRule, StagingConfig};
use crate::models::MatchableKeyValue;

/// Extracts matchable tuples by following configured JSON pointers.
///
/// A pointer resolving to a scalar yields one tuple; a pointer resolving to
/// an array yields one tuple per scalar element. Objects, nulls, and missing
/// paths are skipped. Values are trimmed strings.
#[derive(Debug, Clone, Default)]
pub struct PointerExtractor {
    rules: HashMap<String, Vec<ExtractionRule>>,
}

impl PointerExtractor {
    pub fn new(rules: HashMap<String, Vec<ExtractionRule>>) -> Self {
        Self { rules }
    }

    pub fn from_config(config: &StagingConfig) -> Self {
        Self::new(config.matching.extraction.clone())
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        },
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

impl MatchableExtractor for PointerExtractor {
    fn extract(&self, kind: &str, payload: &Value) -> Vec<MatchableKeyValue> {
        let Some(rules) = self.rules.get(kind) else {
            return Vec::new();
        };

        let mut tuples = Vec::new();
        for rule in rules {
            match payload.pointer(&rule.pointer) {
                Some(Value::Array(items)) => {
                    for item in items {
                        if let Some(value) = scalar_to_string(item) {
                            tuples.push(MatchableKeyValue::new(rule.key.clone(), value));
                        }
                    }
                },
                Some(value) => {
                    if let Some(value) = scalar_to_string(value) {
                        tuples.push(MatchableKeyValue::new(rule.key.clone(), value));
                    }
                },
                None => {},
            }
        }
        tuples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn extractor() -> PointerExtractor {
        let mut rules = HashMap::new();
        rules.insert(
            "substance".to_string(),
            vec![
                ExtractionRule {
                    key: "Name".to_string(),
                    pointer: "/name".to_string(),
                },
                ExtractionRule {
                    key: "CAS".to_string(),
                    pointer: "/codes/cas".to_string(),
                },
                ExtractionRule {
                    key: "Synonym".to_string(),
                    pointer: "/synonyms".to_string(),
                },
            ],
        );
        PointerExtractor::new(rules)
    }

    #[test]
    fn test_extracts_in_rule_order() {
        let payload = json!({
            "name": " aspirin ",
            "codes": {"cas": "50-78-2"},
            "synonyms": ["ASA", "acetylsalicylic acid"]
        });

        let tuples = extractor().extract("substance", &payload);
        assert_eq!(
            tuples,
            vec![
                MatchableKeyValue::new("Name", "aspirin"),
                MatchableKeyValue::new("CAS", "50-78-2"),
                MatchableKeyValue::new("Synonym", "ASA"),
                MatchableKeyValue::new("Synonym", "acetylsalicylic acid"),
            ]
        );
    }

    #[test]
    fn test_missing_paths_and_unknown_kind() {
        let payload = json!({"name": "aspirin"});
        let tuples = extractor().extract("substance", &payload);
        assert_eq!(tuples, vec![MatchableKeyValue::new("Name", "aspirin")]);

        assert!(extractor().extract("product", &payload).is_empty());
    }

    #[test]
    fn test_numbers_and_empty_strings() {
        let payload = json!({"name": "  ", "codes": {"cas": 50782}});
        let tuples = extractor().extract("substance", &payload);
        assert_eq!(tuples, vec![MatchableKeyValue::new("CAS", "50782")]);
    }
}
