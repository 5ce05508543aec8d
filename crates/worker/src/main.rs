mod config;
mod poller;

use anyhow::Context;
use bibflow_pipeline::{PipelineConfig, WorkflowRunner};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = WorkerConfig::from_env()?;
    init_tracing(config.json_logs);

    let pipeline_config = PipelineConfig::from_env()?;
    tracing::info!(
        rest_record_management = pipeline_config.flags.rest_record_management,
        merger = pipeline_config.flags.merger,
        "Worker starting",
    );

    let pool = bibflow_db::create_pool(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    bibflow_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    bibflow_db::run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;

    let runner = WorkflowRunner::from_config(pool.clone(), &pipeline_config)
        .context("Failed to build workflow runner")?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            shutdown_signal().await;
            cancel.cancel();
        }
    });

    poller::run(pool.clone(), runner, config.poll_interval, cancel).await;

    pool.close().await;
    tracing::info!("Graceful shutdown complete");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bibflow_worker=debug,bibflow_pipeline=debug".into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Wait for SIGINT or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), finishing current workflow");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, finishing current workflow");
        }
    }
}
