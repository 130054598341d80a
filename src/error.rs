//! Error types.
//!
//! Application plumbing (config files, storage, the CLI) uses `anyhow`. Failures that cross the
//! API of the sync core are reported as a typed `ApiError` so that callers can inspect the HTTP
//! status and the raw response body.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type Error = anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// The message used when a failed response does not carry a `message` field of its own.
pub const FALLBACK_MESSAGE: &str = "Unexpected server error.";

/// A failure reported by the transport, the entity mappers, or the session gate.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    /// The exchange with the server could not be completed.
    #[error("Unable to reach the server: {0}")]
    Network(String),

    /// The server answered with a non-success status.
    #[error("{message}")]
    Status {
        /// The server's `message` field, or `FALLBACK_MESSAGE`.
        message: String,
        /// The numeric HTTP status.
        status: u16,
        /// The parsed response body. Non-JSON bodies are kept as a JSON string.
        body: Value,
    },

    /// The server answered with a success status but the body could not be mapped.
    #[error("Unexpected response from the server: {0}")]
    Malformed(String),

    /// A data operation was attempted without an authenticated session.
    #[error("You are not signed in")]
    NoSession,
}

/// The classification of an `ApiError`, used by callers to decide how to surface it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Network,
    Validation,
    Authorization,
    SessionExpired,
    Server,
    MalformedResponse,
    NoSession,
}

serde_plain::derive_display_from_serialize!(ErrorKind);

impl ApiError {
    /// Builds a `Status` error from a failed response, extracting the server's message.
    pub fn from_status(status: u16, body: Value) -> Self {
        let message = match body.get("message") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => FALLBACK_MESSAGE.to_string(),
            Some(other) => other.to_string(),
        };
        ApiError::Status {
            message,
            status,
            body,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Network(_) => ErrorKind::Network,
            ApiError::Malformed(_) => ErrorKind::MalformedResponse,
            ApiError::NoSession => ErrorKind::NoSession,
            ApiError::Status { status, .. } => match *status {
                401 => ErrorKind::SessionExpired,
                403 => ErrorKind::Authorization,
                400..=499 => ErrorKind::Validation,
                _ => ErrorKind::Server,
            },
        }
    }

    /// The HTTP status, when the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The raw response body, when the server answered with a failure.
    pub fn body(&self) -> Option<&Value> {
        match self {
            ApiError::Status { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Malformed responses are handled like network failures: generic and retryable.
    pub fn is_network_class(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Network | ErrorKind::MalformedResponse
        )
    }

    pub fn is_session_expired(&self) -> bool {
        self.kind() == ErrorKind::SessionExpired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_from_body() {
        let e = ApiError::from_status(422, json!({"message": "The amount field is required."}));
        assert_eq!(e.to_string(), "The amount field is required.");
        assert_eq!(e.status(), Some(422));
        assert_eq!(e.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_fallback_message() {
        let e = ApiError::from_status(500, Value::String("<html>oops</html>".into()));
        assert_eq!(e.to_string(), FALLBACK_MESSAGE);
        assert_eq!(e.body(), Some(&Value::String("<html>oops</html>".into())));
        assert_eq!(e.kind(), ErrorKind::Server);

        let e = ApiError::from_status(400, Value::Null);
        assert_eq!(e.to_string(), FALLBACK_MESSAGE);
    }

    #[test]
    fn test_non_string_message() {
        let e = ApiError::from_status(400, json!({"message": 42}));
        assert_eq!(e.to_string(), "42");
    }

    #[test]
    fn test_kinds() {
        assert_eq!(
            ApiError::from_status(401, Value::Null).kind(),
            ErrorKind::SessionExpired
        );
        assert_eq!(
            ApiError::from_status(403, Value::Null).kind(),
            ErrorKind::Authorization
        );
        assert!(ApiError::Malformed("x".into()).is_network_class());
        assert!(ApiError::Network("x".into()).is_network_class());
        assert!(!ApiError::from_status(404, Value::Null).is_network_class());
        assert_eq!(ErrorKind::SessionExpired.to_string(), "session_expired");
    }
}
