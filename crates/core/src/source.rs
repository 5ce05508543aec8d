//! Provenance labels for source snapshots.
//!
//! Records arrive with a free-text `acquisition_source.source` (`arXiv`,
//! `Elsevier`, `submitter`, ...). Snapshots are stored under a small fixed
//! vocabulary so that later merges compare like with like. Sources outside
//! the vocabulary resolve to `None` and are never stored.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;

/// Publisher feeds recognised when no explicit list is configured.
pub const DEFAULT_PUBLISHER_SOURCES: &[&str] = &[
    "aps", "cds", "crossref", "desy", "elsevier", "hindawi", "iop", "jstage", "oup", "pos",
    "ptep", "sissa", "springer", "wsp",
];

/// Canonical snapshot source label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceLabel {
    Arxiv,
    Submitter,
    Publisher,
}

impl SourceLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Arxiv => "arxiv",
            Self::Submitter => "submitter",
            Self::Publisher => "publisher",
        }
    }

    /// Parse a label exactly as stored in the database.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "arxiv" => Ok(Self::Arxiv),
            "submitter" => Ok(Self::Submitter),
            "publisher" => Ok(Self::Publisher),
            other => Err(CoreError::Validation(format!(
                "Unknown source label: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for SourceLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps raw source strings onto [`SourceLabel`]s.
#[derive(Debug, Clone)]
pub struct SourceVocabulary {
    publishers: HashSet<String>,
}

impl SourceVocabulary {
    /// Build a vocabulary with the given publisher feed names.
    pub fn new<I, S>(publishers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            publishers: publishers
                .into_iter()
                .map(|p| normalize(p.as_ref()))
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// Resolve a raw source. Empty or unmapped sources yield `None`.
    pub fn resolve(&self, raw: &str) -> Option<SourceLabel> {
        let source = normalize(raw);
        match source.as_str() {
            "" => None,
            "arxiv" => Some(SourceLabel::Arxiv),
            "submitter" => Some(SourceLabel::Submitter),
            s if self.publishers.contains(s) => Some(SourceLabel::Publisher),
            _ => None,
        }
    }
}

impl Default for SourceVocabulary {
    fn default() -> Self {
        Self::new(DEFAULT_PUBLISHER_SOURCES)
    }
}

/// The record's declared `acquisition_source.source`, lower-cased.
///
/// Returns an empty string when the record declares no source.
pub fn declared_source(record: &Value) -> String {
    record
        .pointer("/acquisition_source/source")
        .and_then(Value::as_str)
        .map(normalize)
        .unwrap_or_default()
}

fn normalize(raw: &str) -> String {
    raw.trim().to_lowercase()
}
