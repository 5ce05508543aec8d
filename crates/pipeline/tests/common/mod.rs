//! Fixtures shared by the pipeline integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use bibflow_core::retry::RetryPolicy;
use bibflow_core::schema::SchemaRegistry;
use bibflow_core::source::SourceVocabulary;
use bibflow_core::{ObjectStatus, WorkflowExtraData, WorkflowObject};
use bibflow_db::models::workflow_object::CreateWorkflowObject;
use bibflow_db::repositories::WorkflowObjectRepo;
use bibflow_pipeline::config::FeatureFlags;
use bibflow_pipeline::snapshot::SnapshotStore;
use bibflow_pipeline::steps::StepContext;
use bibflow_pipeline::store::{RemoteApiStore, TransactionalStore};
use bibflow_pipeline::{Reconciler, WorkflowRunner};
use bibflow_remote::{RecordsApi, RecordsApiConfig};
use serde_json::{json, Value};
use sqlx::PgPool;

pub const SCHEMAS_BASE: &str = "https://inspirehep.net/schemas/records";
pub const RECORDS_BASE: &str = "https://inspirehep.net/api";

pub fn literature(title: &str) -> Value {
    json!({
        "titles": [{"title": title}],
        "acquisition_source": {"source": "arXiv", "method": "hepcrawl"},
    })
}

pub async fn insert_object(
    pool: &PgPool,
    workflow_name: &str,
    data_type: &str,
    data: Value,
    extra_data: WorkflowExtraData,
) -> WorkflowObject {
    WorkflowObjectRepo::create(
        pool,
        &CreateWorkflowObject {
            workflow_name: workflow_name.to_string(),
            data_type: data_type.to_string(),
            status: ObjectStatus::Ready,
            data,
            extra_data,
        },
    )
    .await
    .unwrap()
    .into_object()
    .unwrap()
}

pub async fn reload(pool: &PgPool, object: &WorkflowObject) -> WorkflowObject {
    WorkflowObjectRepo::find_by_id(pool, object.id)
        .await
        .unwrap()
        .expect("workflow object should exist")
        .into_object()
        .unwrap()
}

pub fn flags(merger: bool) -> FeatureFlags {
    FeatureFlags {
        rest_record_management: false,
        merger,
    }
}

pub fn snapshots(pool: &PgPool) -> SnapshotStore {
    SnapshotStore::new(pool.clone(), SourceVocabulary::default())
}

pub fn transactional_reconciler(pool: &PgPool, merger: bool) -> Reconciler {
    Reconciler::new(
        Arc::new(TransactionalStore::new(pool.clone())),
        snapshots(pool),
        flags(merger),
    )
}

pub fn records_api(base_url: &str) -> Arc<RecordsApi> {
    Arc::new(
        RecordsApi::new(&RecordsApiConfig {
            base_url: base_url.to_string(),
            token: None,
            timeout: Duration::from_secs(5),
        })
        .unwrap(),
    )
}

pub fn remote_store(pool: &PgPool, base_url: &str) -> RemoteApiStore {
    RemoteApiStore::new(records_api(base_url), pool.clone(), RetryPolicy::immediate(5))
}

pub fn remote_reconciler(pool: &PgPool, base_url: &str, merger: bool) -> Reconciler {
    Reconciler::new(
        Arc::new(remote_store(pool, base_url)),
        snapshots(pool),
        FeatureFlags {
            rest_record_management: true,
            merger,
        },
    )
}

pub fn runner(pool: &PgPool, reconciler: Reconciler) -> WorkflowRunner {
    WorkflowRunner::new(StepContext {
        pool: pool.clone(),
        schemas: Arc::new(SchemaRegistry::builtin(SCHEMAS_BASE).unwrap()),
        reconciler,
        records_base_url: RECORDS_BASE.to_string(),
        merge_conflicts_callback_url: Some("https://editor.example.org/callback".to_string()),
    })
}
