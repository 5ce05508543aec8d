//! Errors from the remote record API.

use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// The `If-Match` precondition did not hold (409 or 412).
    #[error("Remote record changed concurrently ({status}): {body}")]
    Conflict { status: u16, body: Value },

    /// The service answered 502.
    #[error("Remote record service unavailable (502 Bad Gateway)")]
    BadGateway,

    /// Any other non-2xx status. `body` is the decoded JSON, or the raw
    /// text as a JSON string when the body is not JSON.
    #[error("Remote record service error ({status}): {body}")]
    Api { status: u16, body: Value },

    /// The request never produced a response (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// A success response lacked a field the client needs.
    #[error("Malformed response from remote record service: {0}")]
    MalformedResponse(String),
}

impl RemoteError {
    /// Errors worth retrying under the backoff policy.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::BadGateway)
    }

    /// The request failed before a response arrived.
    pub fn is_connection(&self) -> bool {
        match self {
            Self::Request(e) => e.is_connect() || e.is_timeout(),
            _ => false,
        }
    }

    /// Build the error for a non-success status and its body text.
    pub fn from_response(status: u16, text: &str) -> Self {
        match status {
            502 => Self::BadGateway,
            409 | 412 => Self::Conflict {
                status,
                body: decode_body(text),
            },
            _ => Self::Api {
                status,
                body: decode_body(text),
            },
        }
    }
}

fn decode_body(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}
