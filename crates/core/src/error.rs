#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Malformed extra data: {0}")]
    ExtraData(#[from] serde_json::Error),
}

impl CoreError {
    /// Shorthand for a workflow missing a bookkeeping key a step depends on.
    pub fn missing(key: &str) -> Self {
        Self::Validation(format!("{key} is missing"))
    }
}
