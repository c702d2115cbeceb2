//! Transport layer for Exasol database communication.
//!
//! - `protocol` - the [`TransportProtocol`] trait, one method per round-trip
//! - `messages` - wire message types and response decoding
//! - `websocket` - WebSocket implementation of the trait
//! - `tls` - rustls configuration for `wss://`

pub mod messages;
pub mod protocol;
pub mod tls;
pub mod websocket;

pub use messages::{
    ColumnInfo, DataType, RawResult, ResultChunk, ResultSetData, ResultSetHandle,
    SessionAttributes, SessionInfo,
};
pub use protocol::{Credentials, TransportFactory, TransportProtocol};
pub use websocket::WebSocketTransport;
