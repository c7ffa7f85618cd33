//! List staged records query
//!
//! Staging inventory view: one row per record at its latest version, with
//! optional kind and status filters.

use chrono::{DateTime, Utc};
use mediator::Request;
use sdx_common::types::RecordStatus;
use serde::{Deserialize, Serialize};

use crate::context::AppContext;
use crate::db::DbError;

/// Query to list staged records
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListRecordsQuery {
    /// Filter by record kind (e.g., "substance")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Filter by lifecycle status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RecordStatus>,
    /// Limit number of results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    /// Offset for pagination
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
}

/// Record list item
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RecordListItem {
    pub record_id: String,
    pub version: i64,
    pub kind: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Response for list records query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListRecordsResponse {
    pub records: Vec<RecordListItem>,
    pub total: i64,
}

/// Error type for list records query
#[derive(Debug, thiserror::Error)]
pub enum ListRecordsError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl Request<Result<ListRecordsResponse, ListRecordsError>> for ListRecordsQuery {}

impl crate::cqrs::middleware::Query for ListRecordsQuery {}

/// Handles the list records query
///
/// # Errors
///
/// - `Database` - A database error occurred
#[tracing::instrument(skip(ctx))]
pub async fn handle(
    ctx: AppContext,
    query: ListRecordsQuery,
) -> Result<ListRecordsResponse, ListRecordsError> {
    let limit = query.limit.unwrap_or(100).min(1000); // Max 1000
    let offset = query.offset.unwrap_or(0);
    let status = query.status.map(RecordStatus::as_str);

    let records = sqlx::query_as::<_, RecordListItem>(
        r#"
        SELECT r.record_id, r.version, r.kind, m.status, r.created_at, m.updated_at
        FROM staging_records r
        JOIN staging_metadata m ON m.record_id = r.record_id
        WHERE r.version = (SELECT MAX(version) FROM staging_records WHERE record_id = r.record_id)
          AND (?1 IS NULL OR r.kind = ?1)
          AND (?2 IS NULL OR m.status = ?2)
        ORDER BY r.created_at DESC, r.record_id
        LIMIT ?3 OFFSET ?4
        "#,
    )
    .bind(query.kind.as_deref())
    .bind(status)
    .bind(limit)
    .bind(offset)
    .fetch_all(&ctx.pool)
    .await
    .map_err(DbError::from)?;

    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(DISTINCT r.record_id)
        FROM staging_records r
        JOIN staging_metadata m ON m.record_id = r.record_id
        WHERE (?1 IS NULL OR r.kind = ?1)
          AND (?2 IS NULL OR m.status = ?2)
        "#,
    )
    .bind(query.kind.as_deref())
    .bind(status)
    .fetch_one(&ctx.pool)
    .await
    .map_err(DbError::from)?;

    Ok(ListRecordsResponse { records, total })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::records;
    use crate::features::shared::test_helpers::{test_context, TestRecord};
    use crate::features::staging::commands::update_record::{self, UpdateRecordCommand};
    use serde_json::json;

    fn all() -> ListRecordsQuery {
        ListRecordsQuery {
            kind: None,
            status: None,
            limit: None,
            offset: None,
        }
    }

    #[tokio::test]
    async fn test_list_filters_by_kind_and_status() {
        let harness = test_context().await;
        let first = TestRecord::new("substance").create(&harness.ctx).await;
        TestRecord::new("substance")
            .with_payload(json!({"name": "ibuprofen"}))
            .create(&harness.ctx)
            .await;
        TestRecord::new("product")
            .with_payload(json!({"name": "aspirin 100mg"}))
            .create(&harness.ctx)
            .await;

        let mut conn = harness.ctx.pool.acquire().await.unwrap();
        records::update_status(&mut conn, first.record_id, RecordStatus::Imported, chrono::Utc::now())
            .await
            .unwrap();
        drop(conn);

        let everything = handle(harness.ctx.clone(), all()).await.unwrap();
        assert_eq!(everything.total, 3);
        assert_eq!(everything.records.len(), 3);

        let substances = handle(
            harness.ctx.clone(),
            ListRecordsQuery {
                kind: Some("substance".to_string()),
                ..all()
            },
        )
        .await
        .unwrap();
        assert_eq!(substances.total, 2);
        assert!(substances.records.iter().all(|r| r.kind == "substance"));

        let imported = handle(
            harness.ctx.clone(),
            ListRecordsQuery {
                status: Some(RecordStatus::Imported),
                ..all()
            },
        )
        .await
        .unwrap();
        assert_eq!(imported.total, 1);
        assert_eq!(imported.records[0].record_id, first.record_id.to_string());
    }

    #[tokio::test]
    async fn test_list_shows_latest_version_once() {
        let harness = test_context().await;
        let created = TestRecord::new("substance").create(&harness.ctx).await;
        update_record::handle(
            harness.ctx.clone(),
            UpdateRecordCommand {
                record_id: created.record_id,
                payload: json!({"name": "v2"}).to_string(),
            },
        )
        .await
        .unwrap();

        let listed = handle(harness.ctx.clone(), all()).await.unwrap();
        assert_eq!(listed.total, 1);
        assert_eq!(listed.records.len(), 1);
        assert_eq!(listed.records[0].version, 2);
    }

    #[tokio::test]
    async fn test_list_pagination() {
        let harness = test_context().await;
        for i in 0..5 {
            TestRecord::new("substance")
                .with_payload(json!({"name": format!("sub-{}", i)}))
                .create(&harness.ctx)
                .await;
        }

        let page = handle(
            harness.ctx.clone(),
            ListRecordsQuery {
                limit: Some(2),
                offset: Some(4),
                ..all()
            },
        )
        .await
        .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.records.len(), 1);
    }
}
