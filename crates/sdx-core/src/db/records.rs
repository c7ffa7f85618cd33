//! Queries over staged records, metadata, mappings, and findings
//!
//! Record versions are insert-only; metadata is one mutable row per record.
//! Mappings carry a `position` column so extraction order survives storage.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use uuid::Uuid;

use super::{DbError, DbResult};
use crate::models::{
    FindingLevel, MatchableKeyValue, RecordMetadata, StagingRecord, ValidationFinding,
};
use sdx_common::types::RecordStatus;

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct RecordRow {
    pub record_id: String,
    pub version: i64,
    pub kind: String,
    pub payload: String,
    pub payload_checksum: String,
    pub created_at: DateTime<Utc>,
}

impl RecordRow {
    pub(crate) fn into_record(self) -> DbResult<StagingRecord> {
        let record_id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Corrupt(format!("record_id '{}': {}", self.record_id, e)))?;
        Ok(StagingRecord {
            record_id,
            version: self.version,
            kind: self.kind,
            payload: self.payload,
            payload_checksum: self.payload_checksum,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MetadataRow {
    record_id: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

pub(crate) async fn insert_record(
    conn: &mut SqliteConnection,
    record: &StagingRecord,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO staging_records (record_id, version, kind, payload, payload_checksum, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(record.record_id.to_string())
    .bind(record.version)
    .bind(&record.kind)
    .bind(&record.payload)
    .bind(&record.payload_checksum)
    .bind(record.created_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Highest stored version for a record, if any version exists
pub(crate) async fn latest_version(
    conn: &mut SqliteConnection,
    record_id: Uuid,
) -> DbResult<Option<i64>> {
    let version: Option<i64> = sqlx::query_scalar(
        "SELECT MAX(version) FROM staging_records WHERE record_id = ?1",
    )
    .bind(record_id.to_string())
    .fetch_one(&mut *conn)
    .await?;
    Ok(version)
}

/// Fetch one version of a record. `None` selects the latest version.
pub(crate) async fn find_record(
    conn: &mut SqliteConnection,
    record_id: Uuid,
    version: Option<i64>,
) -> DbResult<Option<StagingRecord>> {
    let row: Option<RecordRow> = match version {
        Some(version) => {
            sqlx::query_as(
                r#"
                SELECT record_id, version, kind, payload, payload_checksum, created_at
                FROM staging_records
                WHERE record_id = ?1 AND version = ?2
                "#,
            )
            .bind(record_id.to_string())
            .bind(version)
            .fetch_optional(&mut *conn)
            .await?
        },
        None => {
            sqlx::query_as(
                r#"
                SELECT record_id, version, kind, payload, payload_checksum, created_at
                FROM staging_records
                WHERE record_id = ?1
                ORDER BY version DESC
                LIMIT 1
                "#,
            )
            .bind(record_id.to_string())
            .fetch_optional(&mut *conn)
            .await?
        },
    };
    row.map(RecordRow::into_record).transpose()
}

/// Insert the metadata row plus its mappings and findings
pub(crate) async fn insert_metadata(
    conn: &mut SqliteConnection,
    metadata: &RecordMetadata,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO staging_metadata (record_id, status, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4)
        "#,
    )
    .bind(metadata.record_id.to_string())
    .bind(metadata.status.as_str())
    .bind(metadata.created_at)
    .bind(metadata.updated_at)
    .execute(&mut *conn)
    .await?;

    replace_mappings(conn, metadata.record_id, &metadata.key_value_mappings).await?;
    append_findings(conn, metadata.record_id, &metadata.validations, metadata.created_at).await?;
    Ok(())
}

pub(crate) async fn find_metadata(
    conn: &mut SqliteConnection,
    record_id: Uuid,
) -> DbResult<Option<RecordMetadata>> {
    let row: Option<MetadataRow> = sqlx::query_as(
        "SELECT record_id, status, created_at, updated_at FROM staging_metadata WHERE record_id = ?1",
    )
    .bind(record_id.to_string())
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let record_id = Uuid::parse_str(&row.record_id)
        .map_err(|e| DbError::Corrupt(format!("record_id '{}': {}", row.record_id, e)))?;
    let status: RecordStatus = row
        .status
        .parse()
        .map_err(|e: String| DbError::Corrupt(e))?;

    Ok(Some(RecordMetadata {
        record_id,
        status,
        key_value_mappings: load_mappings(conn, record_id).await?,
        validations: load_findings(conn, record_id).await?,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }))
}

/// Move a record's metadata to a new status
pub(crate) async fn update_status(
    conn: &mut SqliteConnection,
    record_id: Uuid,
    status: RecordStatus,
    updated_at: DateTime<Utc>,
) -> DbResult<()> {
    let result = sqlx::query(
        "UPDATE staging_metadata SET status = ?2, updated_at = ?3 WHERE record_id = ?1",
    )
    .bind(record_id.to_string())
    .bind(status.as_str())
    .bind(updated_at)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("staging metadata", &record_id.to_string()));
    }
    Ok(())
}

/// Replace a record's matchable tuples, keeping extraction order
pub(crate) async fn replace_mappings(
    conn: &mut SqliteConnection,
    record_id: Uuid,
    mappings: &[MatchableKeyValue],
) -> DbResult<()> {
    sqlx::query("DELETE FROM key_value_mappings WHERE record_id = ?1")
        .bind(record_id.to_string())
        .execute(&mut *conn)
        .await?;

    for (position, mapping) in mappings.iter().enumerate() {
        sqlx::query(
            "INSERT INTO key_value_mappings (record_id, position, key, value) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(record_id.to_string())
        .bind(position as i64)
        .bind(&mapping.key)
        .bind(&mapping.value)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

pub(crate) async fn load_mappings(
    conn: &mut SqliteConnection,
    record_id: Uuid,
) -> DbResult<Vec<MatchableKeyValue>> {
    let rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT key, value FROM key_value_mappings WHERE record_id = ?1 ORDER BY position",
    )
    .bind(record_id.to_string())
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows
        .into_iter()
        .map(|(key, value)| MatchableKeyValue::new(key, value))
        .collect())
}

pub(crate) async fn append_findings(
    conn: &mut SqliteConnection,
    record_id: Uuid,
    findings: &[ValidationFinding],
    created_at: DateTime<Utc>,
) -> DbResult<()> {
    for finding in findings {
        sqlx::query(
            "INSERT INTO validation_findings (record_id, level, message, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(record_id.to_string())
        .bind(finding.level.as_str())
        .bind(&finding.message)
        .bind(created_at)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

pub(crate) async fn load_findings(
    conn: &mut SqliteConnection,
    record_id: Uuid,
) -> DbResult<Vec<ValidationFinding>> {
    let rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT level, message FROM validation_findings WHERE record_id = ?1 ORDER BY id",
    )
    .bind(record_id.to_string())
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter()
        .map(|(level, message)| {
            let level: FindingLevel = level.parse().map_err(|e: String| DbError::Corrupt(e))?;
            Ok(ValidationFinding { level, message })
        })
        .collect()
}

/// Delete one version row. Returns how many rows went away (0 or 1).
pub(crate) async fn delete_version(
    conn: &mut SqliteConnection,
    record_id: Uuid,
    version: i64,
) -> DbResult<u64> {
    let result = sqlx::query("DELETE FROM staging_records WHERE record_id = ?1 AND version = ?2")
        .bind(record_id.to_string())
        .bind(version)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

/// Drop a record's metadata, mappings, and findings. Used once the last
/// version row is gone.
pub(crate) async fn purge_metadata(
    conn: &mut SqliteConnection,
    record_id: Uuid,
) -> DbResult<()> {
    let id = record_id.to_string();

    sqlx::query("DELETE FROM staging_metadata WHERE record_id = ?1")
        .bind(&id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM key_value_mappings WHERE record_id = ?1")
        .bind(&id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM validation_findings WHERE record_id = ?1")
        .bind(&id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Delete every version of a record along with its metadata, mappings, and
/// findings. Returns how many version rows went away.
pub(crate) async fn delete_record(
    conn: &mut SqliteConnection,
    record_id: Uuid,
) -> DbResult<u64> {
    let result = sqlx::query("DELETE FROM staging_records WHERE record_id = ?1")
        .bind(record_id.to_string())
        .execute(&mut *conn)
        .await?;

    purge_metadata(conn, record_id).await?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;
    use sdx_common::checksum::payload_checksum;

    fn record(id: Uuid, version: i64, payload: &str) -> StagingRecord {
        StagingRecord {
            record_id: id,
            version,
            kind: "substance".to_string(),
            payload: payload.to_string(),
            payload_checksum: payload_checksum(payload.as_bytes()),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_versions_accumulate_and_latest_wins() {
        let pool = open_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let id = Uuid::new_v4();

        insert_record(&mut conn, &record(id, 1, r#"{"name":"a"}"#)).await.unwrap();
        insert_record(&mut conn, &record(id, 2, r#"{"name":"b"}"#)).await.unwrap();

        assert_eq!(latest_version(&mut conn, id).await.unwrap(), Some(2));

        let latest = find_record(&mut conn, id, None).await.unwrap().unwrap();
        assert_eq!(latest.version, 2);
        assert_eq!(latest.payload, r#"{"name":"b"}"#);

        let first = find_record(&mut conn, id, Some(1)).await.unwrap().unwrap();
        assert_eq!(first.payload, r#"{"name":"a"}"#);

        assert!(find_record(&mut conn, id, Some(9)).await.unwrap().is_none());
        assert_eq!(latest_version(&mut conn, Uuid::new_v4()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_metadata_round_trip_keeps_mapping_order() {
        let pool = open_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let id = Uuid::new_v4();
        let now = Utc::now();

        let metadata = RecordMetadata {
            record_id: id,
            status: RecordStatus::Staged,
            key_value_mappings: vec![
                MatchableKeyValue::new("Name", "aspirin"),
                MatchableKeyValue::new("CAS", "50-78-2"),
                MatchableKeyValue::new("Name", "ASA"),
            ],
            validations: vec![ValidationFinding::new(FindingLevel::Warning, "no UNII code")],
            created_at: now,
            updated_at: now,
        };
        insert_metadata(&mut conn, &metadata).await.unwrap();

        let loaded = find_metadata(&mut conn, id).await.unwrap().unwrap();
        assert_eq!(loaded.status, RecordStatus::Staged);
        assert_eq!(loaded.key_value_mappings, metadata.key_value_mappings);
        assert_eq!(loaded.validations.len(), 1);
        assert_eq!(loaded.validations[0].level, FindingLevel::Warning);
    }

    #[tokio::test]
    async fn test_update_status_requires_existing_metadata() {
        let pool = open_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let err = update_status(&mut conn, Uuid::new_v4(), RecordStatus::Merged, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_clears_everything() {
        let pool = open_in_memory().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let id = Uuid::new_v4();
        let now = Utc::now();

        insert_record(&mut conn, &record(id, 1, "{}")).await.unwrap();
        insert_record(&mut conn, &record(id, 2, "{}")).await.unwrap();
        insert_metadata(
            &mut conn,
            &RecordMetadata {
                record_id: id,
                status: RecordStatus::Staged,
                key_value_mappings: vec![MatchableKeyValue::new("Name", "x")],
                validations: vec![],
                created_at: now,
                updated_at: now,
            },
        )
        .await
        .unwrap();

        assert_eq!(delete_record(&mut conn, id).await.unwrap(), 2);
        assert!(find_record(&mut conn, id, None).await.unwrap().is_none());
        assert!(find_metadata(&mut conn, id).await.unwrap().is_none());
        assert!(load_mappings(&mut conn, id).await.unwrap().is_empty());
    }
}
