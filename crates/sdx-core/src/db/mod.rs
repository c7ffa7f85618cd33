//! SQLite persistence for staged records, metadata, and processing jobs
//!
//! Connection pooling and schema live here; the query helpers are split by
//! topic into [`records`] and [`jobs`]. Helpers take `&mut SqliteConnection`
//! so callers can compose them into one transaction.

pub mod jobs;
pub mod records;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::config::DatabaseConfig;

/// Database operation errors with contextual information
#[derive(Error, Debug)]
pub enum DbError {
    /// SQL query or connection error
    #[error("Database query failed: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Database configuration is invalid or missing
    #[error("Database configuration error: {0}")]
    Config(String),

    /// Requested row does not exist
    #[error("{0}")]
    NotFound(String),

    /// Row already exists (unique constraint violation)
    #[error("{0}")]
    Duplicate(String),

    /// Stored row no longer maps onto the domain model
    #[error("Database row corrupt: {0}")]
    Corrupt(String),
}

impl DbError {
    /// Create a not found error with resource context
    pub fn not_found(resource_type: &str, identifier: &str) -> Self {
        Self::NotFound(format!(
            "{} '{}' not found in database",
            resource_type, identifier
        ))
    }

    /// Create a duplicate error with resource context
    pub fn duplicate(resource_type: &str, identifier: &str) -> Self {
        Self::Duplicate(format!("{} '{}' already exists", resource_type, identifier))
    }
}

pub type DbResult<T> = Result<T, DbError>;

/// Open a connection pool for the configured database.
///
/// File databases get WAL journaling and a busy timeout. An in-memory
/// database is pinned to a single connection that never expires, because
/// every `:memory:` connection is a separate empty database.
pub async fn create_pool(config: &DatabaseConfig) -> DbResult<SqlitePool> {
    let in_memory = config.path == ":memory:";

    let mut options = SqliteConnectOptions::from_str(&format!("sqlite:{}", config.path))
        .map_err(|e| DbError::Config(e.to_string()))?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    if !in_memory {
        options = options.journal_mode(SqliteJournalMode::Wal);
    }

    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(config.max_connections)
    };

    let pool = pool_options.connect_with(options).await?;

    tracing::info!(
        path = %config.path,
        max_connections = if in_memory { 1 } else { config.max_connections },
        "Database connection pool created"
    );

    Ok(pool)
}

/// Fresh in-memory database with the schema applied. Test and demo helper.
pub async fn open_in_memory() -> DbResult<SqlitePool> {
    let config = DatabaseConfig {
        path: ":memory:".to_string(),
        max_connections: 1,
    };
    let pool = create_pool(&config).await?;
    init_schema(&pool).await?;
    Ok(pool)
}

/// Create every table and index if missing. Safe to call on every startup.
pub async fn init_schema(pool: &SqlitePool) -> DbResult<()> {
    create_staging_records_table(pool).await?;
    create_staging_metadata_table(pool).await?;
    create_key_value_mappings_table(pool).await?;
    create_validation_findings_table(pool).await?;
    create_processing_jobs_table(pool).await?;
    Ok(())
}

async fn create_staging_records_table(pool: &SqlitePool) -> DbResult<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS staging_records (
            record_id        TEXT    NOT NULL,
            version          INTEGER NOT NULL,
            kind             TEXT    NOT NULL,
            payload          TEXT    NOT NULL,
            payload_checksum TEXT    NOT NULL,
            created_at       TEXT    NOT NULL,
            PRIMARY KEY (record_id, version)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_staging_records_kind ON staging_records (kind)",
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_staging_metadata_table(pool: &SqlitePool) -> DbResult<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS staging_metadata (
            record_id  TEXT PRIMARY KEY,
            status     TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_staging_metadata_status ON staging_metadata (status)",
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_key_value_mappings_table(pool: &SqlitePool) -> DbResult<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS key_value_mappings (
            record_id TEXT    NOT NULL,
            position  INTEGER NOT NULL,
            key       TEXT    NOT NULL,
            value     TEXT    NOT NULL,
            PRIMARY KEY (record_id, position)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_key_value_mappings_key ON key_value_mappings (key, value)",
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_validation_findings_table(pool: &SqlitePool) -> DbResult<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS validation_findings (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            record_id  TEXT NOT NULL,
            level      TEXT NOT NULL,
            message    TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_validation_findings_record ON validation_findings (record_id)",
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_processing_jobs_table(pool: &SqlitePool) -> DbResult<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS processing_jobs (
            id             TEXT PRIMARY KEY,
            start_date     TEXT NOT NULL,
            job_data       TEXT NOT NULL,
            job_status     TEXT NOT NULL,
            status_message TEXT NOT NULL,
            results        TEXT,
            completed_at   TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_processing_jobs_start ON processing_jobs (start_date)",
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Verify database connectivity
pub async fn health_check(pool: &SqlitePool) -> DbResult<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map(|_| ())
        .map_err(DbError::from)
}
