//! Error types shared by the flakeless client and server.
//!
//! ## Error Cases
//! - `ConnectionTimeout`: the server could not be reached within the connect
//!   budget, or refused the connection.
//! - `InvalidNamespace`: the server has no channel bound to the namespace.
//! - `ConnectionClosed`: the connection ended with requests in flight.
//! - `InvalidRequest`: the server refused a request, e.g. oversized amount.
//! - `ChannelError`: an internal task channel closed unexpectedly.
//! - `ServiceShutdown`: a request arrived while the server was stopping.
//!
//! Sequence exhaustion is not an error anywhere in this crate: it travels as
//! `null` inside a batch.

use crate::CodecError;

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the flakeless network layer.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("Timeout connecting to {address}")]
    ConnectionTimeout { address: String },

    #[error("Invalid namespace: {namespace}")]
    InvalidNamespace { namespace: String },

    #[error("Invalid address: {address:?}")]
    InvalidAddress { address: String },

    #[error("Connection closed")]
    ConnectionClosed,

    /// The peer sent something the protocol does not allow here.
    #[error("Protocol error: {context}")]
    Protocol { context: String },

    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// Internal channel send/receive failure.
    #[error("Channel error: {context}")]
    ChannelError { context: String },

    #[error("Service is shutting down")]
    ServiceShutdown,

    #[error("Generator error: {0}")]
    Generator(#[from] flakeless::Error),

    #[error("I/O error: {context}")]
    Io { context: String },
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            context: err.to_string(),
        }
    }
}

impl From<CodecError> for Error {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Io(e) => e.into(),
            CodecError::Json(e) => Self::Protocol {
                context: e.to_string(),
            },
        }
    }
}
