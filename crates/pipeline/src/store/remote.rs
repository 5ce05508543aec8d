//! Remote store: writes go through the record API, only the workflow is
//! persisted locally.

use std::sync::Arc;

use async_trait::async_trait;
use bibflow_core::retry::{retry, RetryPolicy};
use bibflow_core::types::{ControlNumber, VersionId};
use bibflow_core::{CoreError, RecordKind, WorkflowObject};
use bibflow_db::repositories::WorkflowObjectRepo;
use bibflow_remote::{RecordsApi, RemoteError};
use sqlx::PgPool;
use uuid::Uuid;

use super::{RecordStore, StoreOutcome};
use crate::error::PipelineError;

pub struct RemoteApiStore {
    api: Arc<RecordsApi>,
    pool: PgPool,
    retry: RetryPolicy,
}

impl RemoteApiStore {
    pub fn new(api: Arc<RecordsApi>, pool: PgPool, retry: RetryPolicy) -> Self {
        Self { api, pool, retry }
    }
}

#[async_trait]
impl RecordStore for RemoteApiStore {
    fn name(&self) -> &'static str {
        "remote_api"
    }

    async fn store(&self, object: &mut WorkflowObject) -> Result<StoreOutcome, PipelineError> {
        let kind = object.record_kind()?;
        let control_number = object.control_number();
        if object.is_update() && control_number.is_none() {
            return Err(CoreError::missing("control_number").into());
        }

        let api = &self.api;
        let data = &object.data;
        let expected_version = object.extra_data.head_version_id;

        let outcome = match control_number {
            Some(control_number) => {
                let response = retry(
                    &self.retry,
                    "replace_record",
                    move || api.replace(kind, control_number, data, expected_version),
                    RemoteError::is_transient,
                )
                .await?;
                StoreOutcome::Updated {
                    control_number: response.control_number,
                }
            }
            None => {
                let response = retry(
                    &self.retry,
                    "create_record",
                    move || api.create(kind, data),
                    RemoteError::is_transient,
                )
                .await?;
                StoreOutcome::Created {
                    control_number: response.control_number,
                    head_uuid: response.uuid,
                }
            }
        };

        match &outcome {
            StoreOutcome::Created {
                control_number,
                head_uuid,
            } => {
                object.stamp_control_number(*control_number)?;
                object.extra_data.head_uuid = Some(*head_uuid);
                tracing::info!(
                    workflow_id = object.id,
                    head_uuid = %head_uuid,
                    control_number,
                    "Record created through remote API",
                );
            }
            StoreOutcome::Updated { control_number } => {
                object.stamp_control_number(*control_number)?;
                tracing::info!(
                    workflow_id = object.id,
                    control_number,
                    "Record replaced through remote API",
                );
            }
            StoreOutcome::Skipped => {}
        }

        WorkflowObjectRepo::save(&self.pool, object).await?;
        Ok(outcome)
    }

    async fn current_version(
        &self,
        kind: RecordKind,
        head_uuid: Uuid,
        control_number: Option<ControlNumber>,
    ) -> Result<VersionId, PipelineError> {
        let control_number = control_number.ok_or_else(|| CoreError::missing("control_number"))?;
        let api = &self.api;
        let record = retry(
            &self.retry,
            "get_record",
            move || api.get(kind, control_number),
            RemoteError::is_transient,
        )
        .await?;

        let version = record.version.ok_or_else(|| {
            RemoteError::MalformedResponse(format!("record {control_number} has no ETag"))
        })?;
        tracing::debug!(head_uuid = %head_uuid, control_number, version, "Remote record version read");
        Ok(version)
    }
}
