//! Record kinds handled by the ingestion workflows.
//!
//! A workflow's `data_type` names the schema family of its payload
//! (`hep`, `authors`); the remote record API addresses the same records
//! through a short pid type (`lit`, `aut`).

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Data type of literature workflows.
pub const DATA_TYPE_HEP: &str = "hep";

/// Data type of author workflows.
pub const DATA_TYPE_AUTHORS: &str = "authors";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Literature,
    Authors,
}

impl RecordKind {
    /// Resolve a workflow data type into a record kind.
    pub fn from_data_type(data_type: &str) -> Result<Self, CoreError> {
        match data_type {
            DATA_TYPE_HEP => Ok(Self::Literature),
            DATA_TYPE_AUTHORS => Ok(Self::Authors),
            other => Err(CoreError::Validation(format!(
                "Unsupported data type: {other}"
            ))),
        }
    }

    /// Schema family name (also the default `$schema` stem).
    pub fn data_type(self) -> &'static str {
        match self {
            Self::Literature => DATA_TYPE_HEP,
            Self::Authors => DATA_TYPE_AUTHORS,
        }
    }

    /// Path segment used by the remote record API.
    pub fn pid_type(self) -> &'static str {
        match self {
            Self::Literature => "lit",
            Self::Authors => "aut",
        }
    }

    /// Public collection name used when building record references.
    pub fn collection(self) -> &'static str {
        match self {
            Self::Literature => "literature",
            Self::Authors => "authors",
        }
    }

    /// Author updates are stored even when the merger is disabled.
    pub fn is_authors(self) -> bool {
        matches!(self, Self::Authors)
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.data_type())
    }
}
