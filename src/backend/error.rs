//! Backend error types
//!
//! Every failure of an outbound call ends up as exactly one [`ErrorKind`],
//! checked in this order: timeout, server error, network unreachable,
//! unknown.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_CHAT_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Message for an unknown failure that has no description of its own
const UNKNOWN_ERROR: &str = "Unknown error occurred";

/// Outbound calls made against the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Upload,
    Chat,
    Health,
}

impl Operation {
    pub fn default_timeout(self) -> Duration {
        match self {
            Operation::Upload => DEFAULT_UPLOAD_TIMEOUT,
            Operation::Chat => DEFAULT_CHAT_TIMEOUT,
            Operation::Health => DEFAULT_HEALTH_TIMEOUT,
        }
    }

    /// Guidance shown when the call exceeded its bound
    pub fn timeout_message(self) -> &'static str {
        match self {
            Operation::Upload => {
                "Upload timeout - file might be too large. Please try a smaller file."
            }
            Operation::Chat => "Request timeout. The server is taking too long to respond.",
            Operation::Health => "Health check timeout. The server did not answer in time.",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Upload => "upload",
            Operation::Chat => "chat",
            Operation::Health => "health",
        }
    }
}

/// Error classification shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Aborted locally after exceeding the operation's bound
    Timeout,
    /// A response arrived with a non-success status
    ServerError,
    /// Sent, but no response ever came back
    NetworkUnreachable,
    /// Anything else (request construction, undecodable success body, ...)
    Unknown,
}

/// Classified backend error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ClientError {
    pub kind: ErrorKind,
    pub message: String,
    /// HTTP status, when a response was received
    pub status: Option<u16>,
}

impl ClientError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    pub fn timeout(operation: Operation) -> Self {
        Self::new(ErrorKind::Timeout, operation.timeout_message())
    }

    /// Build a server error from a non-success response body
    pub fn server(operation: Operation, status: u16, body: &str) -> Self {
        let message = ErrorBody::parse(body)
            .detail_for(operation)
            .unwrap_or_else(|| format!("Server error: {status}"));
        Self {
            kind: ErrorKind::ServerError,
            message,
            status: Some(status),
        }
    }

    pub fn unreachable(base_url: &str) -> Self {
        Self::new(
            ErrorKind::NetworkUnreachable,
            format!("Cannot connect to server. Please make sure the backend is running on {base_url}"),
        )
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.trim().is_empty() {
            Self::new(ErrorKind::Unknown, UNKNOWN_ERROR)
        } else {
            Self::new(ErrorKind::Unknown, message)
        }
    }

    /// Classify a transport error that carried no readable response body
    pub fn from_reqwest(operation: Operation, base_url: &str, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout(operation)
        } else if let Some(status) = err.status() {
            Self::server(operation, status.as_u16(), "")
        } else if err.is_connect() || err.is_request() {
            Self::unreachable(base_url)
        } else {
            Self::unknown(err.to_string())
        }
    }
}

/// Error payload returned by the backend on failure
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    /// Parse a body, treating anything undecodable as carrying no detail
    pub fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }

    /// Human-readable detail, if the body had one.
    ///
    /// Uploads also accept a `message` field.
    pub fn detail_for(self, operation: Operation) -> Option<String> {
        let non_empty = |s: &String| !s.trim().is_empty();
        let detail = self.detail.filter(non_empty);
        match operation {
            Operation::Upload => detail.or_else(|| self.message.filter(non_empty)),
            Operation::Chat | Operation::Health => detail,
        }
    }
}
