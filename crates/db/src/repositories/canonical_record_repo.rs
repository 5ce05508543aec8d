//! Repository for the `canonical_records` table.

use bibflow_core::types::VersionId;
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::models::canonical_record::{CanonicalRecord, CreateCanonicalRecord};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, control_number, record_kind, json, version_id, created_at, updated_at";

/// Reads and writes canonical records. Every write bumps `version_id`.
pub struct CanonicalRecordRepo;

impl CanonicalRecordRepo {
    /// Insert a new record at version 1.
    ///
    /// Mints a control number from `control_number_seq` unless the input
    /// carries one, and stamps it into the stored JSON.
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        input: &CreateCanonicalRecord,
    ) -> Result<CanonicalRecord, sqlx::Error> {
        let query = format!(
            "WITH minted AS (
                SELECT COALESCE($2::BIGINT, nextval('control_number_seq')) AS cn
             )
             INSERT INTO canonical_records (id, control_number, record_kind, json)
             SELECT $1, minted.cn, $3, jsonb_set($4::jsonb, '{{control_number}}', to_jsonb(minted.cn))
             FROM minted
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CanonicalRecord>(&query)
            .bind(input.id)
            .bind(input.control_number)
            .bind(input.kind.data_type())
            .bind(&input.json)
            .fetch_one(executor)
            .await
    }

    /// Find a record by its internal UUID.
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<CanonicalRecord>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM canonical_records WHERE id = $1");
        sqlx::query_as::<_, CanonicalRecord>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Find a record by UUID and lock its row until the transaction ends.
    pub async fn find_by_id_for_update<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<CanonicalRecord>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM canonical_records WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, CanonicalRecord>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Current version of a record, without loading its content.
    pub async fn version_of<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<VersionId>, sqlx::Error> {
        let row: Option<(VersionId,)> =
            sqlx::query_as("SELECT version_id FROM canonical_records WHERE id = $1")
                .bind(id)
                .fetch_optional(executor)
                .await?;
        Ok(row.map(|r| r.0))
    }

    /// Replace a record's content wholesale and bump its version.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn replace_json<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
        json: &serde_json::Value,
    ) -> Result<Option<CanonicalRecord>, sqlx::Error> {
        let query = format!(
            "UPDATE canonical_records SET json = $2, version_id = version_id + 1 \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CanonicalRecord>(&query)
            .bind(id)
            .bind(json)
            .fetch_optional(executor)
            .await
    }
}
