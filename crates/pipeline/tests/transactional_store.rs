//! Integration tests for reconciliation through the local transactional store.

mod common;

use bibflow_core::source::SourceLabel;
use bibflow_core::{RecordKind, WorkflowExtraData};
use bibflow_db::models::canonical_record::CreateCanonicalRecord;
use bibflow_db::repositories::{CanonicalRecordRepo, RecordDocumentRepo, RecordSourceRepo};
use bibflow_pipeline::StoreOutcome;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

async fn existing_record(pool: &PgPool, kind: RecordKind, json: serde_json::Value) -> (Uuid, i64) {
    let id = Uuid::new_v4();
    let record = CanonicalRecordRepo::create(
        pool,
        &CreateCanonicalRecord {
            id,
            kind,
            control_number: None,
            json,
        },
    )
    .await
    .unwrap();
    (id, record.control_number)
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_stamps_identity(pool: PgPool) {
    let reconciler = common::transactional_reconciler(&pool, false);
    let mut data = common::literature("Higgs couplings");
    data["documents"] = json!([{"key": "fulltext.pdf", "url": "https://arxiv.org/pdf/1"}]);
    let mut object =
        common::insert_object(&pool, "store_record", "hep", data, WorkflowExtraData::default())
            .await;

    let outcome = reconciler.reconcile(&mut object).await.unwrap();

    let StoreOutcome::Created {
        control_number,
        head_uuid,
    } = outcome.clone()
    else {
        panic!("expected a created record, got {outcome:?}");
    };
    assert_eq!(object.data["control_number"], json!(control_number));
    assert_eq!(object.extra_data.recid, Some(control_number));
    assert_eq!(object.extra_data.head_uuid, Some(head_uuid));

    let record = CanonicalRecordRepo::find_by_id(&pool, head_uuid).await.unwrap().unwrap();
    assert_eq!(record.control_number, control_number);
    assert_eq!(record.version_id, 1);

    let documents = RecordDocumentRepo::list_by_record(&pool, head_uuid).await.unwrap();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].key, "fulltext.pdf");

    let persisted = common::reload(&pool, &object).await;
    assert_eq!(persisted.extra_data.recid, Some(control_number));
    assert_eq!(persisted.extra_data.head_uuid, Some(head_uuid));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_update_transplants_control_number(pool: PgPool) {
    let reconciler = common::transactional_reconciler(&pool, true);
    let (head_uuid, control_number) =
        existing_record(&pool, RecordKind::Literature, common::literature("Old")).await;

    let mut object = common::insert_object(
        &pool,
        "store_record",
        "hep",
        common::literature("New"),
        WorkflowExtraData {
            is_update: Some(true),
            head_uuid: Some(head_uuid),
            ..Default::default()
        },
    )
    .await;

    let outcome = reconciler.reconcile(&mut object).await.unwrap();
    assert_eq!(outcome, StoreOutcome::Updated { control_number });

    let record = CanonicalRecordRepo::find_by_id(&pool, head_uuid).await.unwrap().unwrap();
    assert_eq!(record.version_id, 2);
    assert_eq!(record.json["titles"][0]["title"], json!("New"));
    assert_eq!(record.json["control_number"], json!(control_number));
    assert_eq!(object.extra_data.recid, Some(control_number));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_update_skipped_while_merger_disabled(pool: PgPool) {
    let reconciler = common::transactional_reconciler(&pool, false);
    let (head_uuid, _) =
        existing_record(&pool, RecordKind::Literature, common::literature("Old")).await;

    let mut object = common::insert_object(
        &pool,
        "store_record",
        "hep",
        common::literature("New"),
        WorkflowExtraData {
            is_update: Some(true),
            head_uuid: Some(head_uuid),
            ..Default::default()
        },
    )
    .await;
    let before = object.clone();

    let outcome = reconciler.reconcile(&mut object).await.unwrap();
    assert_eq!(outcome, StoreOutcome::Skipped);
    assert_eq!(object, before);

    let record = CanonicalRecordRepo::find_by_id(&pool, head_uuid).await.unwrap().unwrap();
    assert_eq!(record.version_id, 1);
    assert_eq!(record.json["titles"][0]["title"], json!("Old"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_author_updates_ignore_merger_flag(pool: PgPool) {
    let reconciler = common::transactional_reconciler(&pool, false);
    let (head_uuid, control_number) = existing_record(
        &pool,
        RecordKind::Authors,
        json!({"name": {"value": "Smith, J."}}),
    )
    .await;

    let mut object = common::insert_object(
        &pool,
        "store_record",
        "authors",
        json!({"name": {"value": "Smith, Jane"}}),
        WorkflowExtraData {
            is_update: Some(true),
            head_uuid: Some(head_uuid),
            ..Default::default()
        },
    )
    .await;

    let outcome = reconciler.reconcile(&mut object).await.unwrap();
    assert_eq!(outcome, StoreOutcome::Updated { control_number });
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_update_of_missing_record_leaves_object_untouched(pool: PgPool) {
    let reconciler = common::transactional_reconciler(&pool, true);
    let mut object = common::insert_object(
        &pool,
        "store_record",
        "hep",
        common::literature("Orphan"),
        WorkflowExtraData {
            is_update: Some(true),
            head_uuid: Some(Uuid::new_v4()),
            ..Default::default()
        },
    )
    .await;
    let before = object.clone();

    assert!(reconciler.reconcile(&mut object).await.is_err());
    assert_eq!(object, before);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_store_root_uses_merger_root(pool: PgPool) {
    let reconciler = common::transactional_reconciler(&pool, true);
    let head_uuid = Uuid::new_v4();
    let root = json!({
        "titles": [{"title": "As published"}],
        "acquisition_source": {"source": "Elsevier"}
    });

    let object = common::insert_object(
        &pool,
        "store_record",
        "hep",
        common::literature("Merged"),
        WorkflowExtraData {
            head_uuid: Some(head_uuid),
            merger_root: Some(json!(root.to_string())),
            ..Default::default()
        },
    )
    .await;

    let label = reconciler.store_root(&object).await.unwrap();
    assert_eq!(label, Some(SourceLabel::Publisher));

    let snapshot = RecordSourceRepo::find(&pool, head_uuid, SourceLabel::Publisher)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(snapshot.json, root);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_store_root_disabled_without_merger(pool: PgPool) {
    let reconciler = common::transactional_reconciler(&pool, false);
    let head_uuid = Uuid::new_v4();
    let object = common::insert_object(
        &pool,
        "store_record",
        "hep",
        common::literature("Paper"),
        WorkflowExtraData {
            head_uuid: Some(head_uuid),
            ..Default::default()
        },
    )
    .await;

    assert_eq!(reconciler.store_root(&object).await.unwrap(), None);
    assert!(RecordSourceRepo::list_by_record(&pool, head_uuid).await.unwrap().is_empty());
}
