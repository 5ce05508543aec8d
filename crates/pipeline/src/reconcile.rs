//! Record reconciliation engine.

use std::sync::Arc;

use bibflow_core::source::{declared_source, SourceLabel};
use bibflow_core::WorkflowObject;

use crate::config::FeatureFlags;
use crate::error::PipelineError;
use crate::snapshot::SnapshotStore;
use crate::store::{RecordStore, StoreOutcome};

/// Decides create versus update and writes through the configured store.
pub struct Reconciler {
    store: Arc<dyn RecordStore>,
    snapshots: SnapshotStore,
    flags: FeatureFlags,
}

impl Reconciler {
    pub fn new(store: Arc<dyn RecordStore>, snapshots: SnapshotStore, flags: FeatureFlags) -> Self {
        Self {
            store,
            snapshots,
            flags,
        }
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    /// Store the workflow's record.
    ///
    /// Updates are skipped, not failed, while the merger is disabled, except
    /// for author records.
    pub async fn reconcile(&self, object: &mut WorkflowObject) -> Result<StoreOutcome, PipelineError> {
        let kind = object.record_kind()?;
        if object.is_update() && !self.flags.merger && !kind.is_authors() {
            tracing::info!(
                workflow_id = object.id,
                record_kind = %kind,
                "Merger disabled, update not stored",
            );
            return Ok(StoreOutcome::Skipped);
        }

        tracing::debug!(
            workflow_id = object.id,
            store = self.store.name(),
            is_update = object.is_update(),
            "Storing record",
        );
        self.store.store(object).await
    }

    /// Persist the snapshot of the record's declared source under
    /// `head_uuid`.
    ///
    /// The snapshot is taken from `merger_root`, or from the payload when no
    /// root was recorded. Does nothing while the merger is disabled.
    pub async fn store_root(
        &self,
        object: &WorkflowObject,
    ) -> Result<Option<SourceLabel>, PipelineError> {
        if !self.flags.merger {
            return Ok(None);
        }

        let root = match object.extra_data.merger_root_record()? {
            Some(root) => root,
            None => object.data.clone(),
        };
        let source = declared_source(&root);
        if source.is_empty() {
            tracing::debug!(workflow_id = object.id, "No declared source, snapshot skipped");
            return Ok(None);
        }

        let head_uuid = object.require_head_uuid()?;
        self.snapshots.upsert_snapshot(head_uuid, &source, &root).await
    }
}
