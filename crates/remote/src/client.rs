//! REST client for record create, replace and read.

use std::time::Duration;

use bibflow_core::types::{ControlNumber, VersionId};
use bibflow_core::RecordKind;
use reqwest::header::{HeaderMap, ETAG, IF_MATCH};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::RemoteError;

/// Connection settings for [`RecordsApi`].
#[derive(Debug, Clone)]
pub struct RecordsApiConfig {
    /// Base URL, e.g. `http://localhost:8000/api`.
    pub base_url: String,
    /// Sent as `Authorization: Bearer <token>` when set.
    pub token: Option<String>,
    pub timeout: Duration,
}

/// Result of `POST /<pid_type>`.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateResponse {
    pub control_number: ControlNumber,
    pub uuid: Uuid,
    /// Version of the new record, when the service reports one.
    pub version: Option<VersionId>,
}

/// Result of `PUT /<pid_type>/<control_number>`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceResponse {
    pub control_number: ControlNumber,
    pub version: Option<VersionId>,
}

/// A record as read back from the service.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRecord {
    pub control_number: ControlNumber,
    pub uuid: Option<Uuid>,
    pub metadata: Value,
    pub version: Option<VersionId>,
}

#[derive(Debug, Deserialize)]
struct RecordBody {
    #[serde(default)]
    uuid: Option<Uuid>,
    #[serde(default)]
    id: Option<Value>,
    metadata: Value,
}

impl RecordBody {
    fn control_number(&self) -> Result<ControlNumber, RemoteError> {
        self.metadata
            .get("control_number")
            .and_then(Value::as_i64)
            .or_else(|| self.id.as_ref().and_then(Value::as_i64))
            .ok_or_else(|| {
                RemoteError::MalformedResponse("metadata.control_number is missing".into())
            })
    }
}

/// HTTP client for the remote record-management service.
pub struct RecordsApi {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl RecordsApi {
    pub fn new(config: &RecordsApiConfig) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self::with_client(client, config))
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, config: &RecordsApiConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Create a new record and return its assigned identity.
    pub async fn create(
        &self,
        kind: RecordKind,
        payload: &Value,
    ) -> Result<CreateResponse, RemoteError> {
        let request = self
            .client
            .post(format!("{}/{}", self.base_url, kind.pid_type()))
            .json(payload);
        let response = self.authorize(request).send().await?;
        let (body, version) = Self::parse_record(response).await?;

        let uuid = body
            .uuid
            .ok_or_else(|| RemoteError::MalformedResponse("uuid is missing".into()))?;
        let control_number = body.control_number()?;
        tracing::debug!(control_number, %uuid, "Remote record created");
        Ok(CreateResponse {
            control_number,
            uuid,
            version,
        })
    }

    /// Replace a record wholesale.
    ///
    /// With `expected_version` set to a non-zero version the request carries
    /// `If-Match: "<expected_version - 1>"`, the service's revision id for
    /// that version. Otherwise the write is unconditional.
    pub async fn replace(
        &self,
        kind: RecordKind,
        control_number: ControlNumber,
        payload: &Value,
        expected_version: Option<VersionId>,
    ) -> Result<ReplaceResponse, RemoteError> {
        let mut request = self
            .client
            .put(self.record_url(kind, control_number))
            .json(payload);
        if let Some(value) = if_match_value(expected_version) {
            request = request.header(IF_MATCH, value);
        }
        let response = self.authorize(request).send().await?;
        let (body, version) = Self::parse_record(response).await?;

        let control_number = body.control_number()?;
        tracing::debug!(control_number, "Remote record replaced");
        Ok(ReplaceResponse {
            control_number,
            version,
        })
    }

    /// Read a record by its public identifier.
    pub async fn get(
        &self,
        kind: RecordKind,
        control_number: ControlNumber,
    ) -> Result<RemoteRecord, RemoteError> {
        let request = self.client.get(self.record_url(kind, control_number));
        let response = self.authorize(request).send().await?;
        let (body, version) = Self::parse_record(response).await?;

        Ok(RemoteRecord {
            control_number: body.control_number()?,
            uuid: body.uuid,
            metadata: body.metadata,
            version,
        })
    }

    // ---- private helpers ----

    fn record_url(&self, kind: RecordKind, control_number: ControlNumber) -> String {
        format!("{}/{}/{}", self.base_url, kind.pid_type(), control_number)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Ensure the response has a success status code, translating failures
    /// into the matching [`RemoteError`] variant.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            tracing::debug!(status = status.as_u16(), body = %text, "Remote call failed");
            return Err(RemoteError::from_response(status.as_u16(), &text));
        }
        Ok(response)
    }

    /// Decode a record body plus the version advertised in `ETag`.
    async fn parse_record(
        response: reqwest::Response,
    ) -> Result<(RecordBody, Option<VersionId>), RemoteError> {
        let response = Self::ensure_success(response).await?;
        let version = version_from_etag(response.headers());
        let body = response.json::<RecordBody>().await?;
        Ok((body, version))
    }
}

/// `If-Match` value for an expected version; `None` for unset or zero.
fn if_match_value(expected_version: Option<VersionId>) -> Option<String> {
    match expected_version {
        Some(version) if version != 0 => Some(format!("\"{}\"", version - 1)),
        _ => None,
    }
}

/// Version carried by an `ETag` of the form `"<revision>"` or `W/"<revision>"`.
fn version_from_etag(headers: &HeaderMap) -> Option<VersionId> {
    let raw = headers.get(ETAG)?.to_str().ok()?;
    let revision: VersionId = raw
        .trim()
        .trim_start_matches("W/")
        .trim_matches('"')
        .parse()
        .ok()?;
    Some(revision + 1)
}
