//! Workflow definitions and the runner that drives objects through them.
//!
//! The runner resumes at the object's persisted `position`, persists the
//! object after every step, and records halts and failures on the object
//! itself so nothing is lost when a workflow stops early.

use std::sync::Arc;

use bibflow_core::record_kind::{DATA_TYPE_AUTHORS, DATA_TYPE_HEP};
use bibflow_core::{ObjectStatus, WorkflowObject};
use bibflow_db::repositories::WorkflowObjectRepo;
use sqlx::PgPool;

use crate::config::PipelineConfig;
use crate::error::{ErrorKind, PipelineError};
use crate::reconcile::Reconciler;
use crate::snapshot::SnapshotStore;
use crate::steps::{Step, StepContext, StepOutcome};
use crate::store::build_store;

// ---------------------------------------------------------------------------
// Definitions
// ---------------------------------------------------------------------------

/// A named, ordered list of steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowDefinition {
    pub name: &'static str,
    /// Data types this workflow accepts; empty means any. The first one is
    /// assigned to objects that arrive without a data type.
    pub data_types: &'static [&'static str],
    pub steps: &'static [Step],
}

/// Normalize, guard against stale data, store the record and its source
/// snapshot.
pub const STORE_RECORD: WorkflowDefinition = WorkflowDefinition {
    name: "store_record",
    data_types: &[DATA_TYPE_HEP, DATA_TYPE_AUTHORS],
    steps: &[
        Step::SetSchema,
        Step::StopIfStale,
        Step::StoreRecord,
        Step::StoreRoot,
    ],
};

/// Curator-driven merge of two literature records into the head.
pub const MANUAL_MERGE: WorkflowDefinition = WorkflowDefinition {
    name: "manual_merge",
    data_types: &[DATA_TYPE_HEP],
    steps: &[
        Step::StoreHeadVersion,
        Step::MergeRecords,
        Step::HaltForMergeApproval,
        Step::SaveRoots,
        Step::StoreRecords,
    ],
};

/// Bookkeeping for records a curator marked non-core.
pub const NON_CORE_SELECTION: WorkflowDefinition = WorkflowDefinition {
    name: "non_core_selection",
    data_types: &[DATA_TYPE_HEP],
    steps: &[Step::MarkCompleted],
};

pub const DEFINITIONS: &[WorkflowDefinition] = &[STORE_RECORD, MANUAL_MERGE, NON_CORE_SELECTION];

pub fn definition(name: &str) -> Option<&'static WorkflowDefinition> {
    DEFINITIONS.iter().find(|d| d.name == name)
}

impl WorkflowDefinition {
    pub fn accepts(&self, data_type: &str) -> bool {
        self.data_types.is_empty() || self.data_types.contains(&data_type)
    }

    pub fn default_data_type(&self) -> Option<&'static str> {
        self.data_types.first().copied()
    }
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Halted { action: String },
    Failed { kind: ErrorKind, message: String },
}

pub struct WorkflowRunner {
    context: StepContext,
}

impl WorkflowRunner {
    pub fn new(context: StepContext) -> Self {
        Self { context }
    }

    /// Wire up schemas, snapshots and the record store from configuration.
    pub fn from_config(pool: PgPool, config: &PipelineConfig) -> Result<Self, PipelineError> {
        let store = build_store(&pool, config)?;
        let snapshots = SnapshotStore::new(pool.clone(), config.vocabulary());
        let reconciler = Reconciler::new(store, snapshots, config.flags);

        Ok(Self::new(StepContext {
            pool,
            schemas: Arc::new(config.schema_registry()?),
            reconciler,
            records_base_url: config.records_api.base_url.clone(),
            merge_conflicts_callback_url: config.merge_conflicts_callback_url.clone(),
        }))
    }

    /// Run `object` from its current position until it completes, halts or
    /// fails.
    ///
    /// Step failures are recorded on the object and reported through
    /// [`RunOutcome::Failed`]; only failing to persist the object is an
    /// `Err`.
    pub async fn run(&self, object: &mut WorkflowObject) -> Result<RunOutcome, sqlx::Error> {
        let definition = match definition(&object.workflow_name) {
            Some(d) => d,
            None => return self.reject(object).await,
        };
        if object.data_type.is_empty() {
            if let Some(default) = definition.default_data_type() {
                object.data_type = default.to_string();
            }
        }
        if !definition.accepts(&object.data_type) {
            return self.reject(object).await;
        }

        object.status = ObjectStatus::Running;
        object.extra_data.error_msg = None;

        while let Some(step) = usize::try_from(object.position)
            .ok()
            .and_then(|pos| definition.steps.get(pos).copied())
        {
            tracing::debug!(
                workflow_id = object.id,
                workflow = definition.name,
                step = step.name(),
                position = object.position,
                "Running step",
            );

            match self.context.run(step, object).await {
                Ok(StepOutcome::Continue) => {
                    object.position += 1;
                    WorkflowObjectRepo::save(&self.context.pool, object).await?;
                }
                Ok(StepOutcome::Halt { action, message }) => {
                    object.position += 1;
                    object.halt(action, &message);
                    WorkflowObjectRepo::save(&self.context.pool, object).await?;
                    tracing::info!(
                        workflow_id = object.id,
                        step = step.name(),
                        action,
                        "Workflow halted",
                    );
                    return Ok(RunOutcome::Halted {
                        action: action.to_string(),
                    });
                }
                Ok(StepOutcome::Complete) => {
                    object.position = definition.steps.len() as i32;
                    break;
                }
                Err(e) => return self.fail(object, Some(step), e).await,
            }
        }

        object.status = ObjectStatus::Completed;
        WorkflowObjectRepo::save(&self.context.pool, object).await?;
        tracing::info!(workflow_id = object.id, workflow = definition.name, "Workflow completed");
        Ok(RunOutcome::Completed)
    }

    async fn reject(&self, object: &mut WorkflowObject) -> Result<RunOutcome, sqlx::Error> {
        let err = PipelineError::UnknownWorkflow(format!(
            "{} ({})",
            object.workflow_name, object.data_type
        ));
        self.fail(object, None, err).await
    }

    async fn fail(
        &self,
        object: &mut WorkflowObject,
        step: Option<Step>,
        err: PipelineError,
    ) -> Result<RunOutcome, sqlx::Error> {
        let kind = err.kind();
        let message = err.to_string();
        tracing::error!(
            workflow_id = object.id,
            step = step.map(Step::name),
            error_kind = %kind,
            error = %err,
            "Workflow step failed",
        );

        object.status = ObjectStatus::Error;
        object.extra_data.error_msg = Some(message.clone());
        WorkflowObjectRepo::save(&self.context.pool, object).await?;
        Ok(RunOutcome::Failed { kind, message })
    }
}
