//! Local store: canonical record and workflow committed together.

use async_trait::async_trait;
use bibflow_core::types::{ControlNumber, VersionId};
use bibflow_core::{CoreError, RecordKind, WorkflowObject};
use bibflow_db::models::canonical_record::CreateCanonicalRecord;
use bibflow_db::models::record_document::NewRecordDocument;
use bibflow_db::repositories::{CanonicalRecordRepo, RecordDocumentRepo, WorkflowObjectRepo};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::{RecordStore, StoreOutcome};
use crate::error::PipelineError;

pub struct TransactionalStore {
    pool: PgPool,
}

impl TransactionalStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Overwrite the head record with the payload, keeping its identifier.
    ///
    /// The head row is locked first; a head that moved past the version the
    /// workflow observed is a conflict.
    async fn update(
        conn: &mut PgConnection,
        object: &mut WorkflowObject,
    ) -> Result<StoreOutcome, PipelineError> {
        let head_uuid = object.require_head_uuid()?;
        let head = CanonicalRecordRepo::find_by_id_for_update(&mut *conn, head_uuid)
            .await?
            .ok_or_else(|| not_found(head_uuid))?;
        if let Some(expected) = object.extra_data.head_version_id {
            if head.version_id != expected {
                return Err(CoreError::Conflict(format!(
                    "canonical record {head_uuid} is at version {}, workflow expected {expected}",
                    head.version_id
                ))
                .into());
            }
        }

        object.stamp_control_number(head.control_number)?;
        let updated = CanonicalRecordRepo::replace_json(&mut *conn, head_uuid, &object.data)
            .await?
            .ok_or_else(|| not_found(head_uuid))?;
        RecordDocumentRepo::replace_for_record(
            conn,
            head_uuid,
            &NewRecordDocument::from_payload(&object.data),
        )
        .await?;

        tracing::info!(
            workflow_id = object.id,
            head_uuid = %head_uuid,
            control_number = updated.control_number,
            version_id = updated.version_id,
            "Canonical record updated",
        );
        Ok(StoreOutcome::Updated {
            control_number: updated.control_number,
        })
    }

    /// Create a record, then attach its files once the identity exists.
    async fn create(
        conn: &mut PgConnection,
        kind: RecordKind,
        object: &mut WorkflowObject,
    ) -> Result<StoreOutcome, PipelineError> {
        let id = Uuid::new_v4();
        let record = CanonicalRecordRepo::create(
            &mut *conn,
            &CreateCanonicalRecord {
                id,
                kind,
                control_number: object.control_number(),
                json: object.data.clone(),
            },
        )
        .await?;
        RecordDocumentRepo::replace_for_record(
            conn,
            id,
            &NewRecordDocument::from_payload(&object.data),
        )
        .await?;

        object.stamp_control_number(record.control_number)?;
        object.extra_data.head_uuid = Some(id);

        tracing::info!(
            workflow_id = object.id,
            head_uuid = %id,
            control_number = record.control_number,
            "Canonical record created",
        );
        Ok(StoreOutcome::Created {
            control_number: record.control_number,
            head_uuid: id,
        })
    }
}

#[async_trait]
impl RecordStore for TransactionalStore {
    fn name(&self) -> &'static str {
        "transactional"
    }

    async fn store(&self, object: &mut WorkflowObject) -> Result<StoreOutcome, PipelineError> {
        let kind = object.record_kind()?;
        // Mutations are staged so a rolled-back write leaves the object untouched.
        let mut staged = object.clone();

        let mut tx = self.pool.begin().await?;
        let outcome = if staged.is_update() {
            Self::update(&mut tx, &mut staged).await?
        } else {
            Self::create(&mut tx, kind, &mut staged).await?
        };
        WorkflowObjectRepo::save(&mut *tx, &staged).await?;
        tx.commit().await?;

        *object = staged;
        Ok(outcome)
    }

    async fn current_version(
        &self,
        _kind: RecordKind,
        head_uuid: Uuid,
        _control_number: Option<ControlNumber>,
    ) -> Result<VersionId, PipelineError> {
        let version = CanonicalRecordRepo::version_of(&self.pool, head_uuid)
            .await?
            .ok_or_else(|| not_found(head_uuid))?;
        Ok(version)
    }
}

fn not_found(id: Uuid) -> CoreError {
    CoreError::NotFound {
        entity: "canonical record",
        id: id.to_string(),
    }
}
