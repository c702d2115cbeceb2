//! Error types for exaquery.
//!
//! Errors are layered the same way the crate is: the transport reports
//! [`TransportError`], the connection lifecycle reports [`ConnectionError`],
//! and statement execution reports [`QueryError`]. [`ExasolError`] unifies
//! all three for callers that do not care which layer failed.

use thiserror::Error;

/// Top-level error type.
#[derive(Error, Debug)]
pub enum ExasolError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Query(#[from] QueryError),
}

/// Failures of a single protocol round-trip.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    /// Socket could not be opened or the WebSocket upgrade failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Login was rejected or the login exchange was malformed.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Frame-level failure while sending or receiving.
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// The response could not be decoded into the expected shape.
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// The server answered with `status: "error"`.
    #[error("Server error [{sql_code}]: {message}")]
    ServerError { sql_code: String, message: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The connection (or the command queue worker that owns it) is gone.
    #[error("Connection is closed")]
    ConnectionClosed,
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::SerializationError(err.to_string())
    }
}

/// Failures of the connection lifecycle.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConnectionError {
    #[error("Failed to connect to {host}:{port}: {message}")]
    ConnectionFailed {
        host: String,
        port: u16,
        message: String,
    },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Handshake succeeded but `setAttributes` was rejected.
    #[error("Failed to apply session attributes: {0}")]
    AttributesRejected(String),

    #[error("Invalid connection parameter '{parameter}': {message}")]
    InvalidParameter { parameter: String, message: String },

    #[error("Failed to close connection: {0}")]
    CloseFailed(String),
}

/// Failures while executing a statement or a metadata lookup.
///
/// Every variant that concerns a statement carries its text so the caller
/// can locate the failing part of a multi-statement script.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// A round-trip for the statement failed before any rows were read.
    #[error("Statement failed: {source} (statement: {statement})")]
    Transport {
        statement: String,
        #[source]
        source: TransportError,
    },

    /// The server answered with a shape this client does not understand.
    #[error("Protocol violation: {message} (statement: {statement})")]
    ProtocolViolation { statement: String, message: String },

    /// The fetch loop failed after `execute` succeeded; rows read so far were discarded.
    #[error(
        "Fetching results failed after {rows_discarded} rows: {source} (statement: {statement})"
    )]
    PartialResult {
        statement: String,
        rows_discarded: usize,
        #[source]
        source: TransportError,
    },

    /// A metadata lookup failed; `query` is the rendered query text.
    #[error("Metadata query failed: {source}")]
    Metadata {
        query: String,
        #[source]
        source: Box<QueryError>,
    },

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("Unexpected result: {0}")]
    UnexpectedResult(String),
}

impl QueryError {
    /// Statement text the error refers to, if any.
    pub fn statement(&self) -> Option<&str> {
        match self {
            QueryError::Transport { statement, .. }
            | QueryError::ProtocolViolation { statement, .. }
            | QueryError::PartialResult { statement, .. } => Some(statement),
            QueryError::Metadata { source, .. } => source.statement(),
            QueryError::Connection(_) | QueryError::UnexpectedResult(_) => None,
        }
    }
}
