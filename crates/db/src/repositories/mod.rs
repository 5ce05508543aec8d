//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods. Single
//! statements accept any `PgExecutor` (a `&PgPool` or `&mut *tx`), so the
//! same call works inside or outside a transaction; multi-statement
//! operations take a `&mut PgConnection`.

pub mod canonical_record_repo;
pub mod record_document_repo;
pub mod record_source_repo;
pub mod workflow_object_repo;

pub use canonical_record_repo::CanonicalRecordRepo;
pub use record_document_repo::RecordDocumentRepo;
pub use record_source_repo::RecordSourceRepo;
pub use workflow_object_repo::WorkflowObjectRepo;
