//! Record stores: where reconciled records are written.
//!
//! [`TransactionalStore`] writes canonical records to the local database;
//! [`RemoteApiStore`] delegates to the remote record API. Which one runs is
//! decided once at startup by `ENABLE_REST_RECORD_MANAGEMENT`.

mod remote;
mod transactional;

use std::sync::Arc;

use async_trait::async_trait;
use bibflow_core::types::{ControlNumber, VersionId};
use bibflow_core::{RecordKind, WorkflowObject};
use bibflow_remote::RecordsApi;
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::error::PipelineError;

pub use remote::RemoteApiStore;
pub use transactional::TransactionalStore;

/// What a store did with a workflow's record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOutcome {
    Created {
        control_number: ControlNumber,
        head_uuid: Uuid,
    },
    Updated {
        control_number: ControlNumber,
    },
    /// Nothing was written because the path is disabled.
    Skipped,
}

/// Persists a workflow's record as a canonical record.
///
/// On success the payload's `control_number` and `recid` are stamped, a
/// created record's identity is stored in `head_uuid`, and the workflow
/// object itself is persisted.
#[async_trait]
pub trait RecordStore: Send + Sync {
    fn name(&self) -> &'static str;

    async fn store(&self, object: &mut WorkflowObject) -> Result<StoreOutcome, PipelineError>;

    /// Current version of an existing canonical record, read from wherever
    /// this store keeps it.
    ///
    /// The local store looks the record up by `head_uuid`; the remote store
    /// needs its `control_number`.
    async fn current_version(
        &self,
        kind: RecordKind,
        head_uuid: Uuid,
        control_number: Option<ControlNumber>,
    ) -> Result<VersionId, PipelineError>;
}

/// Pick the store implementation for the configured feature flags.
pub fn build_store(
    pool: &PgPool,
    config: &PipelineConfig,
) -> Result<Arc<dyn RecordStore>, PipelineError> {
    if config.flags.rest_record_management {
        let api = RecordsApi::new(&config.records_api)?;
        tracing::info!(base_url = %api.base_url(), "Records written through the remote record API");
        Ok(Arc::new(RemoteApiStore::new(
            Arc::new(api),
            pool.clone(),
            config.retry.clone(),
        )))
    } else {
        tracing::info!("Records written to the local database");
        Ok(Arc::new(TransactionalStore::new(pool.clone())))
    }
}
