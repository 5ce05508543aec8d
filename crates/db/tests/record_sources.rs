//! Integration tests for source snapshots.

use bibflow_core::source::SourceLabel;
use bibflow_db::repositories::RecordSourceRepo;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_upsert_is_idempotent(pool: PgPool) {
    let record_uuid = Uuid::new_v4();
    let j1 = json!({"titles": [{"title": "first"}]});
    let j2 = json!({"titles": [{"title": "second"}]});

    RecordSourceRepo::upsert(&pool, record_uuid, SourceLabel::Publisher, &j1)
        .await
        .unwrap();
    RecordSourceRepo::upsert(&pool, record_uuid, SourceLabel::Publisher, &j2)
        .await
        .unwrap();

    let rows = RecordSourceRepo::list_by_record(&pool, record_uuid).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].json, j2);
    assert_eq!(rows[0].label().unwrap(), SourceLabel::Publisher);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_sources_are_kept_apart(pool: PgPool) {
    let record_uuid = Uuid::new_v4();
    RecordSourceRepo::upsert(&pool, record_uuid, SourceLabel::Arxiv, &json!({"a": 1}))
        .await
        .unwrap();
    RecordSourceRepo::upsert(&pool, record_uuid, SourceLabel::Submitter, &json!({"s": 1}))
        .await
        .unwrap();

    let rows = RecordSourceRepo::list_by_record(&pool, record_uuid).await.unwrap();
    let sources: Vec<&str> = rows.iter().map(|r| r.source.as_str()).collect();
    assert_eq!(sources, vec!["arxiv", "submitter"]);

    let arxiv = RecordSourceRepo::find(&pool, record_uuid, SourceLabel::Arxiv)
        .await
        .unwrap()
        .expect("arxiv snapshot should exist");
    assert_eq!(arxiv.json, json!({"a": 1}));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_delete_snapshot(pool: PgPool) {
    let record_uuid = Uuid::new_v4();
    RecordSourceRepo::upsert(&pool, record_uuid, SourceLabel::Arxiv, &json!({}))
        .await
        .unwrap();

    assert!(RecordSourceRepo::delete(&pool, record_uuid, SourceLabel::Arxiv).await.unwrap());
    assert!(!RecordSourceRepo::delete(&pool, record_uuid, SourceLabel::Arxiv).await.unwrap());
    assert!(RecordSourceRepo::find(&pool, record_uuid, SourceLabel::Arxiv)
        .await
        .unwrap()
        .is_none());
}
