use std::time::Duration;

use anyhow::Context;

/// Worker process configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    /// Sleep between polls while no workflow is ready.
    pub poll_interval: Duration,
    /// Emit JSON log lines instead of human-readable ones.
    pub json_logs: bool,
}

impl WorkerConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                      | Default     |
    /// |------------------------------|-------------|
    /// | `DATABASE_URL`               | required    |
    /// | `WORKER_POLL_INTERVAL_SECS`  | `5`         |
    /// | `LOG_FORMAT`                 | `text`      |
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL must be set")?;

        let poll_interval_secs: u64 = match lookup("WORKER_POLL_INTERVAL_SECS") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("WORKER_POLL_INTERVAL_SECS must be a valid u64, got {raw:?}"))?,
            None => 5,
        };

        let json_logs = lookup("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json"));

        Ok(Self {
            database_url,
            poll_interval: Duration::from_secs(poll_interval_secs),
            json_logs,
        })
    }
}
