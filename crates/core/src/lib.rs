//! Domain types shared by every bibflow crate.
//!
//! No I/O lives here: workflow objects and their typed extra data, record
//! kinds, snapshot source labels, schema normalization, the retry policy
//! and the JSON merger.

pub mod error;
pub mod merger;
pub mod record_kind;
pub mod retry;
pub mod schema;
pub mod source;
pub mod types;
pub mod workflow;

pub use error::CoreError;
pub use record_kind::RecordKind;
pub use workflow::{ObjectStatus, WorkflowExtraData, WorkflowObject};
