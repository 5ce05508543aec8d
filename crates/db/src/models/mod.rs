//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A create DTO for inserts where rows are created from application input

pub mod canonical_record;
pub mod record_document;
pub mod record_source;
pub mod workflow_object;
