//! Task API error types.

use thiserror::Error;

/// Failures talking to the task API.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum TaskApiError {
    #[error("network error: {message}")]
    Network { message: String },

    #[error("request timed out")]
    Timeout,

    #[error("task not found: {id}")]
    NotFound { id: String },

    #[error("not authorized: {message}")]
    Unauthorized { message: String },

    #[error("server returned {status}: {message}")]
    Server { status: u16, message: String },

    #[error("malformed response: {message}")]
    Decode { message: String },

    #[error("invalid request: {message}")]
    InvalidRequest { message: String },
}

impl TaskApiError {
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server {
            status,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Returns whether the request never reached a decision on the server.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Timeout)
            || matches!(self, Self::Server { status, .. } if *status >= 500)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(TaskApiError::Timeout.is_transient());
        assert!(TaskApiError::network("reset").is_transient());
        assert!(TaskApiError::server(503, "busy").is_transient());
        assert!(!TaskApiError::server(400, "bad").is_transient());
        assert!(
            !TaskApiError::NotFound {
                id: "x".to_string()
            }
            .is_transient()
        );
    }
}
