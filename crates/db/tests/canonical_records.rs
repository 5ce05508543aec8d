//! Integration tests for canonical records and their attachments.

use bibflow_core::RecordKind;
use bibflow_db::models::canonical_record::CreateCanonicalRecord;
use bibflow_db::models::record_document::NewRecordDocument;
use bibflow_db::repositories::{CanonicalRecordRepo, RecordDocumentRepo};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

fn new_record(control_number: Option<i64>) -> CreateCanonicalRecord {
    CreateCanonicalRecord {
        id: Uuid::new_v4(),
        kind: RecordKind::Literature,
        control_number,
        json: json!({"titles": [{"title": "Axion searches"}]}),
    }
}

fn document(key: &str) -> NewRecordDocument {
    NewRecordDocument {
        kind: "document",
        key: key.to_string(),
        url: Some(format!("https://example.org/{key}")),
        description: None,
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_mints_control_number(pool: PgPool) {
    let first = CanonicalRecordRepo::create(&pool, &new_record(None)).await.unwrap();
    let second = CanonicalRecordRepo::create(&pool, &new_record(None)).await.unwrap();

    assert_eq!(first.version_id, 1);
    assert_eq!(first.record_kind, "hep");
    assert!(second.control_number > first.control_number);
    assert_eq!(first.json["control_number"], json!(first.control_number));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_keeps_given_control_number(pool: PgPool) {
    let record = CanonicalRecordRepo::create(&pool, &new_record(Some(4242)))
        .await
        .unwrap();
    assert_eq!(record.control_number, 4242);
    assert_eq!(record.json["control_number"], json!(4242));

    let found = CanonicalRecordRepo::find_by_id(&pool, record.id)
        .await
        .unwrap()
        .expect("record should be found");
    assert_eq!(found.control_number, 4242);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_duplicate_control_number_rejected(pool: PgPool) {
    CanonicalRecordRepo::create(&pool, &new_record(Some(7))).await.unwrap();
    let result = CanonicalRecordRepo::create(&pool, &new_record(Some(7))).await;
    assert!(result.is_err());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_replace_bumps_version(pool: PgPool) {
    let record = CanonicalRecordRepo::create(&pool, &new_record(None)).await.unwrap();

    let replaced = CanonicalRecordRepo::replace_json(&pool, record.id, &json!({"titles": []}))
        .await
        .unwrap()
        .expect("record should exist");
    assert_eq!(replaced.version_id, 2);
    assert_eq!(replaced.json, json!({"titles": []}));

    let version = CanonicalRecordRepo::version_of(&pool, record.id).await.unwrap();
    assert_eq!(version, Some(2));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_missing_record_lookups(pool: PgPool) {
    let id = Uuid::new_v4();
    assert!(CanonicalRecordRepo::find_by_id(&pool, id).await.unwrap().is_none());
    assert!(CanonicalRecordRepo::version_of(&pool, id).await.unwrap().is_none());
    assert!(CanonicalRecordRepo::replace_json(&pool, id, &json!({}))
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_find_for_update_inside_transaction(pool: PgPool) {
    let record = CanonicalRecordRepo::create(&pool, &new_record(None)).await.unwrap();

    let mut tx = pool.begin().await.unwrap();
    let locked = CanonicalRecordRepo::find_by_id_for_update(&mut *tx, record.id)
        .await
        .unwrap()
        .expect("record should exist");
    assert_eq!(locked.version_id, 1);
    CanonicalRecordRepo::replace_json(&mut *tx, record.id, &json!({"titles": [{"title": "B"}]}))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let found = CanonicalRecordRepo::find_by_id(&pool, record.id).await.unwrap().unwrap();
    assert_eq!(found.version_id, 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_documents_replaced_on_reattach(pool: PgPool) {
    let record = CanonicalRecordRepo::create(&pool, &new_record(None)).await.unwrap();
    let mut conn = pool.acquire().await.unwrap();

    RecordDocumentRepo::replace_for_record(&mut conn, record.id, &[document("a.pdf"), document("b.pdf")])
        .await
        .unwrap();
    let attached = RecordDocumentRepo::replace_for_record(&mut conn, record.id, &[document("c.pdf")])
        .await
        .unwrap();
    assert_eq!(attached.len(), 1);

    let listed = RecordDocumentRepo::list_by_record(&pool, record.id).await.unwrap();
    let keys: Vec<&str> = listed.iter().map(|d| d.key.as_str()).collect();
    assert_eq!(keys, vec!["c.pdf"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_documents_cascade_with_record(pool: PgPool) {
    let record = CanonicalRecordRepo::create(&pool, &new_record(None)).await.unwrap();
    let mut conn = pool.acquire().await.unwrap();
    RecordDocumentRepo::replace_for_record(&mut conn, record.id, &[document("a.pdf")])
        .await
        .unwrap();

    sqlx::query("DELETE FROM canonical_records WHERE id = $1")
        .bind(record.id)
        .execute(&pool)
        .await
        .unwrap();

    let listed = RecordDocumentRepo::list_by_record(&pool, record.id).await.unwrap();
    assert!(listed.is_empty());
}
