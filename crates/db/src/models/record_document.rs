//! Document and figure descriptors attached to canonical records.

use bibflow_core::types::{DbId, Timestamp};
use serde::Serialize;
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// A row from the `record_documents` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RecordDocument {
    pub id: DbId,
    pub record_id: Uuid,
    pub kind: String,
    pub key: String,
    pub url: Option<String>,
    pub description: Option<String>,
    pub created_at: Timestamp,
}

/// DTO for attaching a document or figure.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecordDocument {
    /// `document` or `figure`.
    pub kind: &'static str,
    pub key: String,
    pub url: Option<String>,
    pub description: Option<String>,
}

impl NewRecordDocument {
    /// Collect the `documents` and `figures` entries of a record payload.
    ///
    /// Entries without a `key` are skipped.
    pub fn from_payload(payload: &Value) -> Vec<Self> {
        [("documents", "document"), ("figures", "figure")]
            .into_iter()
            .flat_map(|(field, kind)| {
                payload
                    .get(field)
                    .and_then(Value::as_array)
                    .into_iter()
                    .flatten()
                    .filter_map(move |entry| {
                        let key = entry.get("key").and_then(Value::as_str)?;
                        Some(Self {
                            kind,
                            key: key.to_string(),
                            url: entry.get("url").and_then(Value::as_str).map(str::to_string),
                            description: entry
                                .get("description")
                                .and_then(Value::as_str)
                                .map(str::to_string),
                        })
                    })
            })
            .collect()
    }
}
