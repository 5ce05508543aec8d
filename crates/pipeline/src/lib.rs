//! Record reconciliation pipeline.
//!
//! Workflow objects are driven through a fixed list of steps by
//! [`workflow::WorkflowRunner`]. The heart of it is the
//! [`reconcile::Reconciler`], which decides create versus update and hands
//! the write to one of two [`store::RecordStore`] implementations: a local
//! transactional store or the remote record API.

pub mod config;
pub mod error;
pub mod reconcile;
pub mod snapshot;
pub mod staleness;
pub mod steps;
pub mod store;
pub mod workflow;

pub use config::{FeatureFlags, PipelineConfig};
pub use error::{ErrorKind, PipelineError};
pub use reconcile::Reconciler;
pub use store::{RecordStore, StoreOutcome};
pub use workflow::{RunOutcome, WorkflowRunner};
