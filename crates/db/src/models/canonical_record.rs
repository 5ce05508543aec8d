//! Canonical record entity model and DTOs.

use bibflow_core::types::{ControlNumber, Timestamp, VersionId};
use bibflow_core::RecordKind;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// A row from the `canonical_records` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CanonicalRecord {
    pub id: Uuid,
    pub control_number: ControlNumber,
    pub record_kind: String,
    pub json: serde_json::Value,
    /// Incremented on every successful write.
    pub version_id: VersionId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a canonical record.
#[derive(Debug, Clone)]
pub struct CreateCanonicalRecord {
    pub id: Uuid,
    pub kind: RecordKind,
    /// Identifier to keep; a fresh one is minted when `None`.
    pub control_number: Option<ControlNumber>,
    pub json: serde_json::Value,
}
