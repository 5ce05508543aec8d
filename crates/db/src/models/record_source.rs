//! Source snapshot entity model.

use bibflow_core::source::SourceLabel;
use bibflow_core::types::Timestamp;
use bibflow_core::CoreError;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// A row from the `workflows_record_sources` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RecordSource {
    pub record_uuid: Uuid,
    pub source: String,
    pub json: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl RecordSource {
    pub fn label(&self) -> Result<SourceLabel, CoreError> {
        SourceLabel::parse(&self.source)
    }
}
