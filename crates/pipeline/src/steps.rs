//! Individual workflow steps.
//!
//! Each step mutates the workflow object in memory and reports whether the
//! workflow should continue, halt for a curator, or finish. Persisting the
//! object between steps is the runner's job.

use std::sync::Arc;

use bibflow_core::merger::merge;
use bibflow_core::schema::{normalize_schema, SchemaResolver};
use bibflow_core::{CoreError, WorkflowObject};
use serde_json::{json, Value};
use sqlx::PgPool;

use crate::error::PipelineError;
use crate::reconcile::Reconciler;
use crate::staleness::is_stale;

/// Halt action for a workflow whose target record changed underneath it.
pub const ACTION_RESOLVE_MERGE_CONFLICTS: &str = "resolve_merge_conflicts";
/// Halt action for a manual merge awaiting curator approval.
pub const ACTION_MERGE_APPROVAL: &str = "merge_approval";

/// The steps built-in workflows are assembled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    SetSchema,
    StopIfStale,
    StoreRecord,
    StoreRoot,
    StoreHeadVersion,
    MergeRecords,
    HaltForMergeApproval,
    SaveRoots,
    StoreRecords,
    MarkCompleted,
}

impl Step {
    pub fn name(self) -> &'static str {
        match self {
            Self::SetSchema => "set_schema",
            Self::StopIfStale => "stop_if_stale",
            Self::StoreRecord => "store_record",
            Self::StoreRoot => "store_root",
            Self::StoreHeadVersion => "store_head_version",
            Self::MergeRecords => "merge_records",
            Self::HaltForMergeApproval => "halt_for_merge_approval",
            Self::SaveRoots => "save_roots",
            Self::StoreRecords => "store_records",
            Self::MarkCompleted => "mark_completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Continue,
    /// Pause the workflow until `action` is taken.
    Halt { action: &'static str, message: String },
    /// Finish the workflow without running the remaining steps.
    Complete,
}

/// Shared dependencies of the steps.
pub struct StepContext {
    pub pool: PgPool,
    pub schemas: Arc<dyn SchemaResolver>,
    pub reconciler: Reconciler,
    /// Base URL used in `$ref` links to merged-away records.
    pub records_base_url: String,
    pub merge_conflicts_callback_url: Option<String>,
}

impl StepContext {
    pub async fn run(
        &self,
        step: Step,
        object: &mut WorkflowObject,
    ) -> Result<StepOutcome, PipelineError> {
        match step {
            Step::SetSchema => self.set_schema(object),
            Step::StopIfStale => self.stop_if_stale(object).await,
            Step::StoreRecord => {
                self.reconciler.reconcile(object).await?;
                Ok(StepOutcome::Continue)
            }
            Step::StoreRoot => {
                self.reconciler.store_root(object).await?;
                Ok(StepOutcome::Continue)
            }
            Step::StoreHeadVersion => self.store_head_version(object).await,
            Step::MergeRecords => merge_records(object),
            Step::HaltForMergeApproval => Ok(StepOutcome::Halt {
                action: ACTION_MERGE_APPROVAL,
                message: "Merge requires curator approval".into(),
            }),
            Step::SaveRoots => self.save_roots(object).await,
            Step::StoreRecords => self.store_records(object).await,
            Step::MarkCompleted => Ok(StepOutcome::Complete),
        }
    }

    fn set_schema(&self, object: &mut WorkflowObject) -> Result<StepOutcome, PipelineError> {
        normalize_schema(&mut object.data, &object.data_type, self.schemas.as_ref())?;
        Ok(StepOutcome::Continue)
    }

    async fn stop_if_stale(&self, object: &mut WorkflowObject) -> Result<StepOutcome, PipelineError> {
        if is_stale(self.reconciler.store(), object).await? {
            return Ok(StepOutcome::Halt {
                action: ACTION_RESOLVE_MERGE_CONFLICTS,
                message: "Record changed since this workflow read it".into(),
            });
        }
        Ok(StepOutcome::Continue)
    }

    async fn store_head_version(
        &self,
        object: &mut WorkflowObject,
    ) -> Result<StepOutcome, PipelineError> {
        let head_uuid = object.require_head_uuid()?;
        let version = self
            .reconciler
            .store()
            .current_version(
                object.record_kind()?,
                head_uuid,
                object.extra_data.head_control_number,
            )
            .await?;

        object.extra_data.head_version_id = Some(version);
        if let Some(url) = &self.merge_conflicts_callback_url {
            object.extra_data.callback_url = Some(url.clone());
        }
        Ok(StepOutcome::Continue)
    }

    async fn save_roots(&self, object: &mut WorkflowObject) -> Result<StepOutcome, PipelineError> {
        let head_uuid = object.require_head_uuid()?;
        let update_uuid = object
            .extra_data
            .update_uuid
            .ok_or_else(|| CoreError::missing("update_uuid"))?;
        self.reconciler
            .snapshots()
            .save_roots(head_uuid, update_uuid)
            .await?;
        Ok(StepOutcome::Continue)
    }

    /// Write the merged record over the head, recording the update record
    /// as deleted into it.
    async fn store_records(&self, object: &mut WorkflowObject) -> Result<StepOutcome, PipelineError> {
        let head_control_number = object
            .extra_data
            .head_control_number
            .ok_or_else(|| CoreError::missing("head_control_number"))?;
        let update_control_number = object
            .extra_data
            .update_control_number
            .ok_or_else(|| CoreError::missing("update_control_number"))?;
        let kind = object.record_kind()?;

        let reference = json!({
            "$ref": format!(
                "{}/{}/{update_control_number}",
                self.records_base_url.trim_end_matches('/'),
                kind.collection(),
            )
        });
        let data = object.data_object_mut()?;
        let deleted = data
            .entry("deleted_records")
            .or_insert_with(|| Value::Array(Vec::new()));
        match deleted.as_array_mut() {
            Some(refs) => {
                if !refs.contains(&reference) {
                    refs.push(reference);
                }
            }
            None => {
                return Err(CoreError::Validation("deleted_records must be an array".into()).into())
            }
        }

        object.stamp_control_number(head_control_number)?;
        object.extra_data.is_update = Some(true);
        self.reconciler.store().store(object).await?;
        Ok(StepOutcome::Continue)
    }
}

/// Three-way merge of the head and update records carried in extra data.
fn merge_records(object: &mut WorkflowObject) -> Result<StepOutcome, PipelineError> {
    let head = object
        .extra_data
        .head
        .as_ref()
        .ok_or_else(|| CoreError::missing("head"))?;
    let update = object
        .extra_data
        .update
        .as_ref()
        .ok_or_else(|| CoreError::missing("update"))?;

    let (merged, conflicts) = merge(&json!({}), head, update);
    tracing::info!(
        workflow_id = object.id,
        conflicts = conflicts.len(),
        "Records merged",
    );
    object.data = merged;
    object.extra_data.conflicts = Some(conflicts);
    Ok(StepOutcome::Continue)
}
