//! Repository for the `workflows_record_sources` table.

use bibflow_core::source::SourceLabel;
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::models::record_source::RecordSource;

const COLUMNS: &str = "record_uuid, source, json, created_at, updated_at";

/// Stores one as-submitted snapshot per (record, source).
pub struct RecordSourceRepo;

impl RecordSourceRepo {
    /// Insert a snapshot, or overwrite the JSON of the existing one.
    pub async fn upsert<'e, E: PgExecutor<'e>>(
        executor: E,
        record_uuid: Uuid,
        source: SourceLabel,
        json: &serde_json::Value,
    ) -> Result<RecordSource, sqlx::Error> {
        let query = format!(
            "INSERT INTO workflows_record_sources (record_uuid, source, json) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (record_uuid, source) DO UPDATE SET json = EXCLUDED.json \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RecordSource>(&query)
            .bind(record_uuid)
            .bind(source.as_str())
            .bind(json)
            .fetch_one(executor)
            .await
    }

    pub async fn find<'e, E: PgExecutor<'e>>(
        executor: E,
        record_uuid: Uuid,
        source: SourceLabel,
    ) -> Result<Option<RecordSource>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM workflows_record_sources \
             WHERE record_uuid = $1 AND source = $2"
        );
        sqlx::query_as::<_, RecordSource>(&query)
            .bind(record_uuid)
            .bind(source.as_str())
            .fetch_optional(executor)
            .await
    }

    /// All snapshots of a record, ordered by source label.
    pub async fn list_by_record<'e, E: PgExecutor<'e>>(
        executor: E,
        record_uuid: Uuid,
    ) -> Result<Vec<RecordSource>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM workflows_record_sources \
             WHERE record_uuid = $1 ORDER BY source ASC"
        );
        sqlx::query_as::<_, RecordSource>(&query)
            .bind(record_uuid)
            .fetch_all(executor)
            .await
    }

    /// Delete one snapshot. Returns `true` if a row was removed.
    pub async fn delete<'e, E: PgExecutor<'e>>(
        executor: E,
        record_uuid: Uuid,
        source: SourceLabel,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM workflows_record_sources WHERE record_uuid = $1 AND source = $2",
        )
        .bind(record_uuid)
        .bind(source.as_str())
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
