//! Configuration management

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// Staging Configuration Constants
// ============================================================================

/// Default SQLite database path.
pub const DEFAULT_DATABASE_PATH: &str = "sdx.db";

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 5;

/// Default number of batch workers. One worker serializes all submissions,
/// which is the safe default for stores without cross-record transactions.
pub const DEFAULT_WORKER_COUNT: usize = 1;

/// Default action registry context.
pub const DEFAULT_CONTEXT: &str = "default";

/// Staging subsystem configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagingConfig {
    pub database: DatabaseConfig,
    pub processing: ProcessingConfig,
    pub matching: MatchingConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file, or ":memory:" for an in-memory store
    pub path: String,
    pub max_connections: u32,
}

/// Batch processing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Size of the bounded worker pool for batch submissions
    pub worker_count: usize,
    /// Action registry context used when resolving action names
    pub context_name: String,
}

/// Matching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Entity kinds this deployment accepts
    pub registered_kinds: Vec<String>,
    /// Per-kind extraction rules: match key and the JSON pointer it is read from
    pub extraction: HashMap<String, Vec<ExtractionRule>>,
}

/// One matchable field extraction rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionRule {
    /// Key the extracted value is indexed and matched under
    pub key: String,
    /// JSON pointer into the record payload (e.g., "/names/0/name")
    pub pointer: String,
}

impl StagingConfig {
    /// Load configuration from environment and defaults
    ///
    /// Environment variables:
    /// - `SDX_DATABASE_PATH`: SQLite file path (":memory:" allowed)
    /// - `SDX_DATABASE_MAX_CONNECTIONS`: pool size
    /// - `SDX_WORKER_COUNT`: batch worker pool size
    /// - `SDX_CONTEXT`: action registry context name
    /// - `SDX_KINDS`: comma-separated list of registered kinds
    /// - `SDX_EXTRACT_<KIND>`: extraction rules as `key=/pointer,key2=/pointer2`
    ///   (kind uppercased, e.g. `SDX_EXTRACT_SUBSTANCE`)
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let registered_kinds: Vec<String> = std::env::var("SDX_KINDS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let mut extraction = HashMap::new();
        for kind in &registered_kinds {
            let var = format!("SDX_EXTRACT_{}", kind.to_uppercase().replace('-', "_"));
            if let Ok(spec) = std::env::var(&var) {
                extraction.insert(kind.clone(), parse_extraction_spec(&spec)?);
            }
        }

        let config = StagingConfig {
            database: DatabaseConfig {
                path: std::env::var("SDX_DATABASE_PATH")
                    .unwrap_or_else(|_| DEFAULT_DATABASE_PATH.to_string()),
                max_connections: std::env::var("SDX_DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DATABASE_MAX_CONNECTIONS),
            },
            processing: ProcessingConfig {
                worker_count: std::env::var("SDX_WORKER_COUNT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_WORKER_COUNT),
                context_name: std::env::var("SDX_CONTEXT")
                    .unwrap_or_else(|_| DEFAULT_CONTEXT.to_string()),
            },
            matching: MatchingConfig {
                registered_kinds,
                extraction,
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database.path.is_empty() {
            anyhow::bail!("Database path cannot be empty");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be greater than 0");
        }

        if self.processing.worker_count == 0 {
            anyhow::bail!("Worker count must be greater than 0");
        }

        if self.processing.context_name.is_empty() {
            anyhow::bail!("Action context name cannot be empty");
        }

        for kind in self.matching.extraction.keys() {
            if !self.kind_registered(kind) {
                anyhow::bail!("Extraction rules configured for unregistered kind '{}'", kind);
            }
        }

        Ok(())
    }

    /// Whether a record kind is known to this deployment
    pub fn kind_registered(&self, kind: &str) -> bool {
        self.matching.registered_kinds.iter().any(|k| k == kind)
    }
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                path: DEFAULT_DATABASE_PATH.to_string(),
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
            },
            processing: ProcessingConfig {
                worker_count: DEFAULT_WORKER_COUNT,
                context_name: DEFAULT_CONTEXT.to_string(),
            },
            matching: MatchingConfig {
                registered_kinds: Vec::new(),
                extraction: HashMap::new(),
            },
        }
    }
}

fn parse_extraction_spec(spec: &str) -> anyhow::Result<Vec<ExtractionRule>> {
    let mut rules = Vec::new();
    for part in spec.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (key, pointer) = part
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("Invalid extraction rule '{}', expected key=/pointer", part))?;
        if !pointer.starts_with('/') {
            anyhow::bail!("Invalid extraction pointer '{}', expected a JSON pointer", pointer);
        }
        rules.push(ExtractionRule {
            key: key.trim().to_string(),
            pointer: pointer.trim().to_string(),
        });
    }
    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = StagingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.processing.worker_count, 1);
        assert_eq!(config.database.path, "sdx.db");
    }

    #[test]
    fn test_zero_workers_rejected() {
        let mut config = StagingConfig::default();
        config.processing.worker_count = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_extraction_for_unregistered_kind_rejected() {
        let mut config = StagingConfig::default();
        config.matching.extraction.insert(
            "substance".to_string(),
            vec![ExtractionRule {
                key: "CAS".to_string(),
                pointer: "/codes/cas".to_string(),
            }],
        );
        assert!(config.validate().is_err());

        config.matching.registered_kinds.push("substance".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_extraction_spec() {
        let rules = parse_extraction_spec("Name=/names/0/name, CAS=/codes/cas").unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].key, "Name");
        assert_eq!(rules[0].pointer, "/names/0/name");
        assert_eq!(rules[1].key, "CAS");
    }

    #[test]
    fn test_parse_extraction_spec_rejects_bare_path() {
        assert!(parse_extraction_spec("Name=names.name").is_err());
        assert!(parse_extraction_spec("no-equals-sign").is_err());
    }

    #[test]
    fn test_kind_registered() {
        let mut config = StagingConfig::default();
        config.matching.registered_kinds = vec!["substance".to_string(), "product".to_string()];
        assert!(config.kind_registered("substance"));
        assert!(!config.kind_registered("protein"));
    }
}
