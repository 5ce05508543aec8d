/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// Public integer identifier of a canonical record (`control_number` / `recid`).
pub type ControlNumber = i64;

/// Optimistic-concurrency token of a canonical record. Starts at 1.
pub type VersionId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
