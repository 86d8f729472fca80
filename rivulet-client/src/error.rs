//! Client error types.

use rivulet_protocol::{ErrorCode, ProtocolError, ValidationError};
use thiserror::Error;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error("server error: {0}")]
    Server(ErrorCode),

    #[error("not connected")]
    NotConnected,

    #[error("connection closed")]
    ConnectionClosed,

    #[error("request timeout")]
    Timeout,

    #[error("TLS configuration error: {0}")]
    TlsConfig(String),

    #[error("TLS handshake failed: {0}")]
    TlsHandshake(String),
}

impl From<ErrorCode> for ClientError {
    fn from(code: ErrorCode) -> Self {
        ClientError::Server(code)
    }
}

impl ClientError {
    /// Returns the server error code, if this is a server error.
    pub fn server_code(&self) -> Option<ErrorCode> {
        match self {
            ClientError::Server(code) => Some(*code),
            _ => None,
        }
    }

    /// Returns whether the server reported a missing stream, topic or other
    /// resource.
    pub fn is_not_found(&self) -> bool {
        self.server_code().is_some_and(|code| code.is_not_found())
    }

    /// Returns whether this error concerns the connection rather than the
    /// request. A new session is needed to continue.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            ClientError::Io(_)
                | ClientError::NotConnected
                | ClientError::ConnectionClosed
                | ClientError::Timeout
                | ClientError::TlsHandshake(_)
        )
    }

    /// Errors after which the transport can no longer be trusted to be in
    /// sync with the server.
    pub(crate) fn is_terminal(&self) -> bool {
        matches!(
            self,
            ClientError::Io(_)
                | ClientError::Protocol(_)
                | ClientError::ConnectionClosed
                | ClientError::Timeout
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found() {
        assert!(ClientError::Server(ErrorCode::StreamIdNotFound).is_not_found());
        assert!(ClientError::Server(ErrorCode::TopicNameNotFound).is_not_found());
        assert!(!ClientError::Server(ErrorCode::InvalidCredentials).is_not_found());
        assert!(!ClientError::Timeout.is_not_found());
    }

    #[test]
    fn test_server_code_is_preserved() {
        let err: ClientError = ErrorCode::from_code(1011).into();
        assert_eq!(err.server_code(), Some(ErrorCode::StreamIdAlreadyExists));
        assert!(err.to_string().contains("1011"));
    }

    #[test]
    fn test_error_classes() {
        assert!(ClientError::ConnectionClosed.is_connection_error());
        assert!(ClientError::Timeout.is_terminal());
        assert!(!ClientError::Server(ErrorCode::Unauthenticated).is_connection_error());
        assert!(!ClientError::Server(ErrorCode::Unauthenticated).is_terminal());
        assert!(!ClientError::Validation(ValidationError::EmptyBatch).is_terminal());
        assert!(ClientError::Protocol(ProtocolError::UnknownCommand(1)).is_terminal());
    }
}
