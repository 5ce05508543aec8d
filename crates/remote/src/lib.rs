//! HTTP client for the remote record-management service.
//!
//! Records are created with `POST /<pid_type>` and replaced with
//! `PUT /<pid_type>/<control_number>` guarded by an `If-Match` precondition.
//! Non-success responses are translated into [`RemoteError`] variants the
//! pipeline can classify.

pub mod client;
pub mod error;

pub use client::{CreateResponse, RecordsApi, RecordsApiConfig, RemoteRecord, ReplaceResponse};
pub use error::RemoteError;
