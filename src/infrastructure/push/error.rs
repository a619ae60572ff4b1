use std::io;
use thiserror::Error;

pub type PushResult<T> = Result<T, PushError>;

#[derive(Debug, Error)]
pub enum PushError {
    #[error("connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("connection closed with code {code}: {reason}")]
    ConnectionClosed { code: u16, reason: String },

    #[error("websocket error: {message}")]
    WebSocket { message: String },

    #[error("server refused namespace connection: {message}")]
    ConnectRejected { message: String },

    #[error("server closed the session: {reason}")]
    ServerDisconnect { reason: String },

    #[error("no ping from server within {timeout_ms}ms")]
    PingTimeout { timeout_ms: u64 },

    #[error("reconnection limit exceeded after {attempts} attempts")]
    ReconnectionLimitExceeded { attempts: u32 },

    #[error("invalid push URL: {message}")]
    InvalidUrl { message: String },

    #[error("protocol error: {message}")]
    ProtocolError { message: String },

    #[error("unsupported packet: {message}")]
    Unsupported { message: String },

    #[error("timeout waiting for {operation}")]
    Timeout { operation: String },

    #[error("not connected")]
    NotConnected,

    #[error("already connecting or connected")]
    AlreadyConnected,

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl PushError {
    #[must_use]
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn websocket(message: impl Into<String>) -> Self {
        Self::WebSocket {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::ProtocolError {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    /// Errors that only affect a single frame; the connection stays usable.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }

    /// Whether the client should dial again after this error.
    #[must_use]
    pub const fn should_reconnect(&self) -> bool {
        match self {
            Self::ConnectionFailed { .. }
            | Self::ConnectionClosed { .. }
            | Self::WebSocket { .. }
            | Self::PingTimeout { .. }
            | Self::ProtocolError { .. }
            | Self::Timeout { .. }
            | Self::Io(_) => true,

            Self::ConnectRejected { .. }
            | Self::ServerDisconnect { .. }
            | Self::ReconnectionLimitExceeded { .. }
            | Self::InvalidUrl { .. }
            | Self::Unsupported { .. }
            | Self::NotConnected
            | Self::AlreadyConnected => false,
        }
    }
}
