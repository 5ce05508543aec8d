//! Repository for the `record_documents` table.

use sqlx::{PgConnection, PgExecutor};
use uuid::Uuid;

use crate::models::record_document::{NewRecordDocument, RecordDocument};

const COLUMNS: &str = "id, record_id, kind, key, url, description, created_at";

pub struct RecordDocumentRepo;

impl RecordDocumentRepo {
    /// Replace every attachment of `record_id` with `documents`.
    ///
    /// Run inside the transaction that writes the record so attachments
    /// never outlive a rolled-back write.
    pub async fn replace_for_record(
        conn: &mut PgConnection,
        record_id: Uuid,
        documents: &[NewRecordDocument],
    ) -> Result<Vec<RecordDocument>, sqlx::Error> {
        sqlx::query("DELETE FROM record_documents WHERE record_id = $1")
            .bind(record_id)
            .execute(&mut *conn)
            .await?;

        let query = format!(
            "INSERT INTO record_documents (record_id, kind, key, url, description) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (record_id, kind, key) DO UPDATE SET \
                 url = EXCLUDED.url, \
                 description = EXCLUDED.description \
             RETURNING {COLUMNS}"
        );
        let mut attached = Vec::with_capacity(documents.len());
        for doc in documents {
            let row = sqlx::query_as::<_, RecordDocument>(&query)
                .bind(record_id)
                .bind(doc.kind)
                .bind(&doc.key)
                .bind(&doc.url)
                .bind(&doc.description)
                .fetch_one(&mut *conn)
                .await?;
            attached.push(row);
        }
        Ok(attached)
    }

    /// List attachments of a record, documents first, then by key.
    pub async fn list_by_record<'e, E: PgExecutor<'e>>(
        executor: E,
        record_id: Uuid,
    ) -> Result<Vec<RecordDocument>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM record_documents \
             WHERE record_id = $1 ORDER BY kind ASC, key ASC"
        );
        sqlx::query_as::<_, RecordDocument>(&query)
            .bind(record_id)
            .fetch_all(executor)
            .await
    }
}
