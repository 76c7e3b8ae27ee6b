//! The gateway: the only component that talks to the gitserver API.
//!
//! Every request goes through [`Gateway`], which:
//!
//! - resolves paths against the configured base address
//! - sends JSON with a fixed per-request timeout
//! - attaches the session's bearer credential when one is present
//! - returns only the decoded response payload on success
//! - on a 401 response, tears the session down and navigates to the login
//!   entry point before failing the call
//!
//! Calls are attempted exactly once. There is no retry, coalescing, or
//! cancellation; a call runs until it settles or times out.

pub mod client;

pub use client::Gateway;

use std::sync::Arc;

use thiserror::Error;

/// Errors surfaced by [`Gateway`] calls.
///
/// Cloneable so a resource store can record the failure in its state and
/// still return it to the caller.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// No response reached us (network unreachable, timeout). This is the
    /// transport error exactly as `reqwest` reported it.
    #[error("Transport error: {0}")]
    Transport(#[source] Arc<reqwest::Error>),

    /// The server rejected the credential (HTTP 401). The session has already
    /// been torn down when this is returned.
    #[error("Unauthorized: {0}")]
    Unauthorized(ErrorPayload),

    /// The server rejected the request with any other non-success status.
    #[error("API error: {status} - {payload}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error body provided by the server.
        payload: ErrorPayload,
    },

    /// A success response whose body did not match the expected shape.
    #[error("Decode error: {0}")]
    Decode(#[source] Arc<serde_json::Error>),

    /// The HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    Client(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(Arc::new(err))
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(Arc::new(err))
    }
}

impl GatewayError {
    /// HTTP status of the server response, if one was received.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized(_) => Some(401),
            Self::Api { status, .. } => Some(*status),
            Self::Transport(_) | Self::Decode(_) | Self::Client(_) => None,
        }
    }

    /// Server-provided error body, if the failure carried a response.
    #[must_use]
    pub const fn payload(&self) -> Option<&ErrorPayload> {
        match self {
            Self::Unauthorized(payload) | Self::Api { payload, .. } => Some(payload),
            Self::Transport(_) | Self::Decode(_) | Self::Client(_) => None,
        }
    }

    /// Returns true if the request timed out before a response arrived.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(err) if err.is_timeout())
    }

    /// Returns true if the failure forced a session teardown.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}

/// Error body returned by the server alongside a non-success status.
///
/// The API answers with `{"error": "..."}`; anything else is kept verbatim.
/// Bodies that are not JSON become a JSON string, empty bodies `null`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorPayload(serde_json::Value);

impl ErrorPayload {
    /// Wrap an already-decoded body.
    #[must_use]
    pub const fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// Build a payload from raw response bytes.
    #[must_use]
    pub fn from_bytes(body: &[u8]) -> Self {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Self(serde_json::Value::Null);
        }
        serde_json::from_slice(body).map_or_else(
            |_| Self(serde_json::Value::String(String::from_utf8_lossy(body).into_owned())),
            Self,
        )
    }

    /// Human-readable message: the `error` or `message` field when present,
    /// or the whole body when it is a bare string.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match &self.0 {
            serde_json::Value::String(s) => Some(s.as_str()),
            serde_json::Value::Object(map) => map
                .get("error")
                .or_else(|| map.get("message"))
                .and_then(serde_json::Value::as_str),
            _ => None,
        }
    }

    /// The raw body.
    #[must_use]
    pub const fn as_value(&self) -> &serde_json::Value {
        &self.0
    }
}

impl std::fmt::Display for ErrorPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.message() {
            Some(message) => f.write_str(message),
            None if self.0.is_null() => f.write_str("(empty response)"),
            None => write!(f, "{}", self.0),
        }
    }
}
