//! Transport protocol abstraction.
//!
//! [`TransportProtocol`] is the only seam between the engine and the wire.
//! Each method is one request/response round-trip; implementations are not
//! required to support concurrent calls, which is why all access goes through
//! the command queue.

use crate::connection::params::ConnectionParams;
use crate::error::TransportError;
use crate::transport::messages::{
    RawResult, ResultChunk, ResultSetHandle, SessionAttributes, SessionInfo,
};
use async_trait::async_trait;

/// Login credentials.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// One request/response exchange per method.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransportProtocol: Send {
    /// Open the socket (no authentication yet).
    async fn connect(&mut self, params: &ConnectionParams) -> Result<(), TransportError>;

    /// Log in and return the session details.
    async fn authenticate(&mut self, credentials: &Credentials)
        -> Result<SessionInfo, TransportError>;

    /// `setAttributes`.
    async fn set_attributes(&mut self, attributes: &SessionAttributes)
        -> Result<(), TransportError>;

    /// `execute` for exactly one statement.
    async fn execute(&mut self, sql: &str) -> Result<RawResult, TransportError>;

    /// `fetch` the rows of `handle` starting at `start_position`.
    async fn fetch(
        &mut self,
        handle: ResultSetHandle,
        start_position: u64,
        num_bytes: u64,
    ) -> Result<ResultChunk, TransportError>;

    /// `closeResultSet` for one handle.
    async fn close_result_set(&mut self, handle: ResultSetHandle) -> Result<(), TransportError>;

    /// `disconnect` and drop the socket.
    async fn close(&mut self) -> Result<(), TransportError>;

    fn is_connected(&self) -> bool;
}

/// Creates fresh, unconnected transports for the connection manager.
pub type TransportFactory = std::sync::Arc<dyn Fn() -> Box<dyn TransportProtocol> + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_debug_redacts_password() {
        let credentials = Credentials::new("sys", "exasol");
        let debug = format!("{:?}", credentials);
        assert!(debug.contains("sys"));
        assert!(!debug.contains("exasol"));
        assert_eq!(credentials.password(), "exasol");
    }
}
