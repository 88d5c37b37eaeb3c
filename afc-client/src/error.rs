//! Client error types.

use crate::config::ConfigError;
use afc_protocol::{Opcode, ProtocolError, StatusCode};
use thiserror::Error;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed or desynchronized frame on the wire.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("connection closed")]
    ConnectionClosed,

    #[error("connection faulted, reconnect required")]
    Faulted,

    #[error("connect timeout")]
    Timeout,

    #[error("{opcode} failed: object not found")]
    FileNotFound { opcode: Opcode },

    #[error("{opcode} failed with status {status}")]
    OperationFailed { opcode: Opcode, status: StatusCode },

    /// The request could not be encoded; nothing was sent.
    #[error("invalid request: {0}")]
    InvalidRequest(#[source] ProtocolError),

    /// A complete response arrived but its payload could not be interpreted.
    #[error("malformed response: {0}")]
    MalformedResponse(#[source] ProtocolError),

    #[error("file handle {handle} was opened on a previous connection")]
    StaleHandle { handle: u64 },

    #[error("TLS configuration error: {0}")]
    TlsConfig(String),

    #[error("TLS handshake failed: {0}")]
    TlsHandshake(String),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl ClientError {
    /// Returns whether this error left the connection unusable.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ClientError::Io(_)
                | ClientError::Protocol(_)
                | ClientError::ConnectionClosed
                | ClientError::Faulted
        )
    }

    /// Returns whether the device reported `OBJECT_NOT_FOUND`.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::FileNotFound { .. })
    }

    /// Status code reported by the device, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::FileNotFound { .. } => Some(StatusCode::ObjectNotFound),
            ClientError::OperationFailed { status, .. } => Some(*status),
            _ => None,
        }
    }
}
