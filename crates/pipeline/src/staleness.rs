//! Detects workflows that read a canonical record which has since changed.

use bibflow_core::WorkflowObject;

use crate::error::PipelineError;
use crate::store::RecordStore;

/// Whether the canonical record targeted by `object` moved past the version
/// the workflow last observed.
///
/// Objects that are not updates, or never recorded a version, are never
/// stale. The current version comes from `store`, so it is read from the
/// same place the update will be written to. This is a read-only check and
/// does not lock the record.
pub async fn is_stale(store: &dyn RecordStore, object: &WorkflowObject) -> Result<bool, PipelineError> {
    let Some(expected) = object.extra_data.head_version_id else {
        return Ok(false);
    };
    if !object.is_update() {
        return Ok(false);
    }

    let head_uuid = object.require_head_uuid()?;
    let control_number = object.control_number().or(object.extra_data.recid);
    let current = store
        .current_version(object.record_kind()?, head_uuid, control_number)
        .await?;

    let stale = current != expected;
    if stale {
        tracing::warn!(
            workflow_id = object.id,
            head_uuid = %head_uuid,
            store = store.name(),
            expected,
            current,
            "Workflow holds stale data",
        );
    }
    Ok(stale)
}
