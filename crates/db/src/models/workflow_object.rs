//! Workflow object entity model and DTOs.

use bibflow_core::types::{DbId, Timestamp};
use bibflow_core::{CoreError, ObjectStatus, WorkflowExtraData, WorkflowObject};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `workflow_objects` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WorkflowObjectRow {
    pub id: DbId,
    pub workflow_name: String,
    pub data_type: String,
    pub status: String,
    pub position: i32,
    pub data: serde_json::Value,
    /// Decoded in [`WorkflowObjectRow::into_object`] so a malformed value
    /// does not fail the query that loaded the row.
    pub extra_data: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl WorkflowObjectRow {
    /// Convert the row into the domain object the pipeline works on.
    ///
    /// Fails if `status` is unknown or `extra_data` does not decode.
    pub fn into_object(self) -> Result<WorkflowObject, CoreError> {
        Ok(WorkflowObject {
            id: self.id,
            workflow_name: self.workflow_name,
            data_type: self.data_type,
            status: ObjectStatus::parse(&self.status)?,
            position: self.position,
            data: self.data,
            extra_data: WorkflowExtraData::from_value(self.extra_data)?,
        })
    }
}

/// DTO for creating a workflow object.
#[derive(Debug, Clone)]
pub struct CreateWorkflowObject {
    pub workflow_name: String,
    pub data_type: String,
    pub status: ObjectStatus,
    pub data: serde_json::Value,
    pub extra_data: WorkflowExtraData,
}
