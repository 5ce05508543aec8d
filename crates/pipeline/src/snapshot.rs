//! Source-snapshot store.
//!
//! Keeps the as-submitted JSON of a record per provenance label so later
//! merges can start from what each source last said.

use bibflow_core::source::{SourceLabel, SourceVocabulary};
use bibflow_db::models::record_source::RecordSource;
use bibflow_db::repositories::RecordSourceRepo;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::PipelineError;

pub struct SnapshotStore {
    pool: PgPool,
    vocabulary: SourceVocabulary,
}

impl SnapshotStore {
    pub fn new(pool: PgPool, vocabulary: SourceVocabulary) -> Self {
        Self { pool, vocabulary }
    }

    /// Upsert the snapshot of `json` from raw source `source`.
    ///
    /// Returns the label it was stored under, or `None` when the source is
    /// empty or outside the vocabulary and nothing was written.
    pub async fn upsert_snapshot(
        &self,
        record_uuid: Uuid,
        source: &str,
        json: &Value,
    ) -> Result<Option<SourceLabel>, PipelineError> {
        let Some(label) = self.vocabulary.resolve(source) else {
            if !source.trim().is_empty() {
                tracing::info!(record_uuid = %record_uuid, source, "Unmapped source, snapshot skipped");
            }
            return Ok(None);
        };

        RecordSourceRepo::upsert(&self.pool, record_uuid, label, json).await?;
        tracing::debug!(record_uuid = %record_uuid, source = %label, "Source snapshot stored");
        Ok(Some(label))
    }

    pub async fn list(&self, record_uuid: Uuid) -> Result<Vec<RecordSource>, PipelineError> {
        Ok(RecordSourceRepo::list_by_record(&self.pool, record_uuid).await?)
    }

    /// Move the snapshots of a merged-away record onto the surviving one.
    ///
    /// For each source the more recently written snapshot wins. All
    /// snapshots of `update_uuid` are removed. Returns how many snapshots
    /// were written to `head_uuid`.
    pub async fn save_roots(&self, head_uuid: Uuid, update_uuid: Uuid) -> Result<usize, PipelineError> {
        let mut tx = self.pool.begin().await?;
        let head_roots = RecordSourceRepo::list_by_record(&mut *tx, head_uuid).await?;
        let update_roots = RecordSourceRepo::list_by_record(&mut *tx, update_uuid).await?;

        let mut moved = 0;
        for root in update_roots {
            let label = root.label()?;
            let newer = head_roots
                .iter()
                .find(|head| head.source == root.source)
                .map_or(true, |head| root.updated_at > head.updated_at);
            if newer {
                RecordSourceRepo::upsert(&mut *tx, head_uuid, label, &root.json).await?;
                moved += 1;
            }
            RecordSourceRepo::delete(&mut *tx, update_uuid, label).await?;
        }
        tx.commit().await?;

        tracing::info!(
            head_uuid = %head_uuid,
            update_uuid = %update_uuid,
            moved,
            "Source snapshots merged",
        );
        Ok(moved)
    }
}
