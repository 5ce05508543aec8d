//! Pipeline configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use bibflow_core::retry::RetryPolicy;
use bibflow_core::schema::{SchemaError, SchemaRegistry};
use bibflow_core::source::SourceVocabulary;
use bibflow_remote::RecordsApiConfig;

#[derive(Debug, thiserror::Error)]
#[error("Invalid value for {var}: {value:?}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
}

/// Feature toggles read once at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Write records through the remote record API instead of the local store.
    pub rest_record_management: bool,
    /// Apply updates to existing records and keep source snapshots.
    pub merger: bool,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub flags: FeatureFlags,
    pub records_api: RecordsApiConfig,
    /// Prefix of canonical schema identifiers.
    pub schemas_base_url: String,
    /// Directory of `<name>.json` schema files; built-in schemas when unset.
    pub schemas_dir: Option<PathBuf>,
    /// Publisher feed names mapped to the `publisher` snapshot label.
    pub publisher_sources: Option<Vec<String>>,
    /// Stored on manual merges so the editor can report back.
    pub merge_conflicts_callback_url: Option<String>,
    pub retry: RetryPolicy,
}

impl PipelineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                          | Default                                   |
    /// |----------------------------------|-------------------------------------------|
    /// | `ENABLE_REST_RECORD_MANAGEMENT`  | `false`                                   |
    /// | `ENABLE_MERGER`                  | `false`                                   |
    /// | `RECORDS_API_URL`                | `http://localhost:8000/api`               |
    /// | `RECORDS_API_TOKEN`              | unset                                     |
    /// | `RECORDS_API_TIMEOUT_SECS`       | `30`                                      |
    /// | `SCHEMAS_BASE_URL`               | `https://inspirehep.net/schemas/records`  |
    /// | `SCHEMAS_DIR`                    | unset                                     |
    /// | `SNAPSHOT_PUBLISHER_SOURCES`     | built-in list                             |
    /// | `MERGE_CONFLICTS_CALLBACK_URL`   | unset                                     |
    /// | `RETRY_MAX_ATTEMPTS`             | `5`                                       |
    /// | `RETRY_INITIAL_DELAY_MS`         | `1000`                                    |
    /// | `RETRY_MULTIPLIER`               | `4.0`                                     |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let flags = FeatureFlags {
            rest_record_management: parse_flag(
                "ENABLE_REST_RECORD_MANAGEMENT",
                var("ENABLE_REST_RECORD_MANAGEMENT"),
            )?,
            merger: parse_flag("ENABLE_MERGER", var("ENABLE_MERGER"))?,
        };

        let records_api = RecordsApiConfig {
            base_url: var("RECORDS_API_URL").unwrap_or_else(|| "http://localhost:8000/api".into()),
            token: var("RECORDS_API_TOKEN"),
            timeout: Duration::from_secs(parse_or(
                "RECORDS_API_TIMEOUT_SECS",
                var("RECORDS_API_TIMEOUT_SECS"),
                30,
            )?),
        };

        let publisher_sources = var("SNAPSHOT_PUBLISHER_SOURCES").map(|raw| {
            raw.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        });

        let defaults = RetryPolicy::default();
        let retry = RetryPolicy {
            max_attempts: parse_or(
                "RETRY_MAX_ATTEMPTS",
                var("RETRY_MAX_ATTEMPTS"),
                defaults.max_attempts,
            )?,
            initial_delay: Duration::from_millis(parse_or(
                "RETRY_INITIAL_DELAY_MS",
                var("RETRY_INITIAL_DELAY_MS"),
                defaults.initial_delay.as_millis() as u64,
            )?),
            multiplier: parse_or("RETRY_MULTIPLIER", var("RETRY_MULTIPLIER"), defaults.multiplier)?,
            ..defaults
        };

        Ok(Self {
            flags,
            records_api,
            schemas_base_url: var("SCHEMAS_BASE_URL")
                .unwrap_or_else(|| "https://inspirehep.net/schemas/records".into()),
            schemas_dir: var("SCHEMAS_DIR").map(PathBuf::from),
            publisher_sources,
            merge_conflicts_callback_url: var("MERGE_CONFLICTS_CALLBACK_URL"),
            retry,
        })
    }

    pub fn vocabulary(&self) -> SourceVocabulary {
        match &self.publisher_sources {
            Some(sources) => SourceVocabulary::new(sources),
            None => SourceVocabulary::default(),
        }
    }

    /// Schema registry from `schemas_dir`, or the built-in schemas.
    pub fn schema_registry(&self) -> Result<SchemaRegistry, SchemaError> {
        match &self.schemas_dir {
            Some(dir) => SchemaRegistry::load_dir(&self.schemas_base_url, dir),
            None => SchemaRegistry::builtin(&self.schemas_base_url),
        }
    }
}

fn parse_flag(name: &'static str, value: Option<String>) -> Result<bool, ConfigError> {
    let Some(value) = value else {
        return Ok(false);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError { var: name, value }),
    }
}

fn parse_or<T: std::str::FromStr>(
    name: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError { var: name, value: raw }),
    }
}
