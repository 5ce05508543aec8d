//! In-flight workflow objects and their typed extra data.
//!
//! A [`WorkflowObject`] carries the candidate record (`data`) through the
//! step pipeline. Cross-step bookkeeping lives in [`WorkflowExtraData`],
//! which serializes to the same flat JSON map the workflow engine persists
//! (`is-update`, `head_uuid`, `head_version_id`, `recid`, `merger_root`, ...).
//! Keys that no built-in step understands survive round-trips through
//! [`WorkflowExtraData::extensions`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::CoreError;
use crate::merger::Conflict;
use crate::record_kind::RecordKind;
use crate::types::{ControlNumber, DbId, VersionId};

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status of a workflow object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectStatus {
    /// Created, not yet scheduled.
    Initial,
    /// Waiting for a worker to pick it up.
    Ready,
    /// Claimed by a worker.
    Running,
    /// Paused by a step; needs an external action to resume.
    Halted,
    /// All steps ran.
    Completed,
    /// A step failed; state is preserved for inspection and replay.
    Error,
}

impl ObjectStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Ready => "ready",
            Self::Running => "running",
            Self::Halted => "halted",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "initial" => Ok(Self::Initial),
            "ready" => Ok(Self::Ready),
            "running" => Ok(Self::Running),
            "halted" => Ok(Self::Halted),
            "completed" => Ok(Self::Completed),
            "error" => Ok(Self::Error),
            other => Err(CoreError::Validation(format!(
                "Unknown workflow status: {other}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Extra data
// ---------------------------------------------------------------------------

/// Typed view of a workflow's extra-data map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowExtraData {
    /// Set by matching: the payload targets an existing canonical record.
    #[serde(rename = "is-update", default, skip_serializing_if = "Option::is_none")]
    pub is_update: Option<bool>,
    /// Identity of the canonical record being targeted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_uuid: Option<Uuid>,
    /// Canonical version last observed by this workflow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_version_id: Option<VersionId>,
    /// Public identifier of the canonical record; mirrors `data.control_number`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recid: Option<ControlNumber>,
    /// Record used to derive snapshot provenance. Either a JSON object or
    /// the same object serialized to a string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merger_root: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_uuid: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_control_number: Option<ControlNumber>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_control_number: Option<ControlNumber>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflicts: Option<Vec<Conflict>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,

    /// Action a curator must take to resume a halted workflow.
    #[serde(rename = "_action", default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// Human-readable reason for the last halt.
    #[serde(rename = "_message", default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Message of the error that moved the workflow to `error`.
    #[serde(rename = "_error_msg", default, skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,

    /// Step-specific keys not modelled above.
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

impl WorkflowExtraData {
    /// Decode the persisted JSON map.
    pub fn from_value(value: Value) -> Result<Self, CoreError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Encode back into the persisted JSON map.
    pub fn to_value(&self) -> Result<Value, CoreError> {
        Ok(serde_json::to_value(self)?)
    }

    /// The merger root as a JSON object, decoding the string form if needed.
    pub fn merger_root_record(&self) -> Result<Option<Value>, CoreError> {
        match &self.merger_root {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(raw)) => Ok(Some(serde_json::from_str(raw)?)),
            Some(other) => Ok(Some(other.clone())),
        }
    }
}

// ---------------------------------------------------------------------------
// Workflow object
// ---------------------------------------------------------------------------

/// A record travelling through a workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowObject {
    pub id: DbId,
    /// Name of the workflow definition driving this object.
    pub workflow_name: String,
    /// Schema family of `data` (`hep`, `authors`).
    pub data_type: String,
    pub status: ObjectStatus,
    /// Index of the next step to run.
    pub position: i32,
    /// The candidate record.
    pub data: Value,
    pub extra_data: WorkflowExtraData,
}

impl WorkflowObject {
    pub fn record_kind(&self) -> Result<RecordKind, CoreError> {
        RecordKind::from_data_type(&self.data_type)
    }

    pub fn is_update(&self) -> bool {
        self.extra_data.is_update.unwrap_or(false)
    }

    /// `data.control_number`, if the payload carries one.
    pub fn control_number(&self) -> Option<ControlNumber> {
        self.data.get("control_number").and_then(Value::as_i64)
    }

    /// Assign the public identifier to both the payload and `recid`.
    pub fn stamp_control_number(&mut self, control_number: ControlNumber) -> Result<(), CoreError> {
        self.data_object_mut()?
            .insert("control_number".into(), Value::from(control_number));
        self.extra_data.recid = Some(control_number);
        Ok(())
    }

    pub fn require_head_uuid(&self) -> Result<Uuid, CoreError> {
        self.extra_data
            .head_uuid
            .ok_or_else(|| CoreError::missing("head_uuid"))
    }

    /// The payload as a JSON object.
    pub fn data_object_mut(&mut self) -> Result<&mut Map<String, Value>, CoreError> {
        self.data
            .as_object_mut()
            .ok_or_else(|| CoreError::Validation("workflow data must be a JSON object".into()))
    }

    /// Record a halt request on the object.
    pub fn halt(&mut self, action: &str, message: &str) {
        self.status = ObjectStatus::Halted;
        self.extra_data.action = Some(action.to_string());
        self.extra_data.message = Some(message.to_string());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
