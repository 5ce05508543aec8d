//! Repository for the `workflow_objects` table.

use bibflow_core::types::DbId;
use bibflow_core::{ObjectStatus, WorkflowObject};
use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool};

use crate::models::workflow_object::{CreateWorkflowObject, WorkflowObjectRow};

const COLUMNS: &str =
    "id, workflow_name, data_type, status, position, data, extra_data, created_at, updated_at";

/// Persists workflow objects between steps.
pub struct WorkflowObjectRepo;

impl WorkflowObjectRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateWorkflowObject,
    ) -> Result<WorkflowObjectRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO workflow_objects (workflow_name, data_type, status, data, extra_data) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WorkflowObjectRow>(&query)
            .bind(&input.workflow_name)
            .bind(&input.data_type)
            .bind(input.status.as_str())
            .bind(&input.data)
            .bind(Json(&input.extra_data))
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
    ) -> Result<Option<WorkflowObjectRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM workflow_objects WHERE id = $1");
        sqlx::query_as::<_, WorkflowObjectRow>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Write back data type, status, position, payload and extra data.
    ///
    /// Returns `false` if the object no longer exists.
    pub async fn save<'e, E: PgExecutor<'e>>(
        executor: E,
        object: &WorkflowObject,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE workflow_objects SET \
                 status = $2, position = $3, data = $4, extra_data = $5, data_type = $6 \
             WHERE id = $1",
        )
        .bind(object.id)
        .bind(object.status.as_str())
        .bind(object.position)
        .bind(&object.data)
        .bind(Json(&object.extra_data))
        .bind(&object.data_type)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Claim the oldest `ready` object and mark it `running`.
    ///
    /// Concurrent workers never claim the same object.
    pub async fn claim_next_ready(pool: &PgPool) -> Result<Option<WorkflowObjectRow>, sqlx::Error> {
        let query = format!(
            "UPDATE workflow_objects SET status = 'running' \
             WHERE id = ( \
                 SELECT id FROM workflow_objects \
                 WHERE status = 'ready' \
                 ORDER BY id ASC \
                 FOR UPDATE SKIP LOCKED \
                 LIMIT 1 \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WorkflowObjectRow>(&query)
            .fetch_optional(pool)
            .await
    }

    /// Move an object to `error`, recording `message` as `_error_msg` when
    /// its extra data is a JSON object. Other extra data is left as is.
    pub async fn mark_failed<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
        message: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE workflow_objects SET status = 'error', \
                 extra_data = CASE WHEN jsonb_typeof(extra_data) = 'object' \
                     THEN extra_data || jsonb_build_object('_error_msg', $2::TEXT) \
                     ELSE extra_data END \
             WHERE id = $1",
        )
        .bind(id)
        .bind(message)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Move an object to `status`. Returns `true` if a row was updated.
    pub async fn set_status<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
        status: ObjectStatus,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE workflow_objects SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
