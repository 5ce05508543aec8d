//! Claims ready workflow objects and runs them one at a time.

use std::time::Duration;

use bibflow_db::repositories::WorkflowObjectRepo;
use bibflow_pipeline::{RunOutcome, WorkflowRunner};
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

/// Poll for ready workflows until `cancel` is triggered.
///
/// A running workflow is always finished before the loop checks for
/// cancellation again.
pub async fn run(
    pool: PgPool,
    runner: WorkflowRunner,
    poll_interval: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(poll_interval_secs = poll_interval.as_secs(), "Workflow poller started");

    while !cancel.is_cancelled() {
        let worked = match process_next(&pool, &runner).await {
            Ok(worked) => worked,
            Err(e) => {
                tracing::error!(error = %e, "Failed to process workflow");
                false
            }
        };
        if worked {
            continue;
        }

        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = tokio::time::sleep(poll_interval) => {}
        }
    }

    tracing::info!("Workflow poller stopped");
}

/// Claim and run the next ready workflow. Returns `false` when none was
/// ready.
///
/// A claimed object that cannot be decoded is moved to `error` instead of
/// being left `running`.
async fn process_next(pool: &PgPool, runner: &WorkflowRunner) -> anyhow::Result<bool> {
    let Some(row) = WorkflowObjectRepo::claim_next_ready(pool).await? else {
        return Ok(false);
    };
    let id = row.id;
    let mut object = match row.into_object() {
        Ok(object) => object,
        Err(e) => {
            tracing::error!(workflow_id = id, error = %e, "Claimed workflow object is malformed");
            WorkflowObjectRepo::mark_failed(pool, id, &e.to_string()).await?;
            return Ok(true);
        }
    };
    tracing::info!(
        workflow_id = object.id,
        workflow = %object.workflow_name,
        position = object.position,
        "Workflow claimed",
    );

    match runner.run(&mut object).await? {
        RunOutcome::Completed => {}
        RunOutcome::Halted { action } => {
            tracing::info!(workflow_id = object.id, action = %action, "Waiting for curator action");
        }
        RunOutcome::Failed { kind, message } => {
            tracing::warn!(
                workflow_id = object.id,
                error_kind = %kind,
                error = %message,
                "Workflow moved to error",
            );
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bibflow_pipeline::PipelineConfig;

    fn local_runner(pool: &PgPool) -> WorkflowRunner {
        let config = PipelineConfig::from_lookup(|_| None).unwrap();
        WorkflowRunner::from_config(pool.clone(), &config).unwrap()
    }

    #[sqlx::test(migrations = "../../db/migrations")]
    async fn malformed_extra_data_moves_object_to_error(pool: PgPool) {
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO workflow_objects (workflow_name, data_type, status, extra_data) \
             VALUES ('store_record', 'hep', 'ready', '{\"recid\": \"abc\"}'::jsonb) \
             RETURNING id",
        )
        .fetch_one(&pool)
        .await
        .unwrap();

        assert!(process_next(&pool, &local_runner(&pool)).await.unwrap());

        let (status, recid, error_msg): (String, Option<String>, Option<String>) = sqlx::query_as(
            "SELECT status, extra_data->>'recid', extra_data->>'_error_msg' \
             FROM workflow_objects WHERE id = $1",
        )
        .bind(id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(status, "error");
        assert_eq!(recid.as_deref(), Some("abc"));
        assert!(error_msg.unwrap().contains("Malformed extra data"));
    }

    #[sqlx::test(migrations = "../../db/migrations")]
    async fn nothing_ready_reports_idle(pool: PgPool) {
        assert!(!process_next(&pool, &local_runner(&pool)).await.unwrap());
    }
}
