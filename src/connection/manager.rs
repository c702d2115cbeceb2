//! Connection lifecycle.
//!
//! [`ConnectionManager`] is the only place a connection is created or torn
//! down. Opening is lazy and idempotent: the first caller performs the
//! handshake and applies the session attributes, later callers get the same
//! command queue back.

use crate::connection::params::ConnectionParams;
use crate::connection::queue::CommandQueue;
use crate::error::{ConnectionError, TransportError};
use crate::transport::protocol::TransportFactory;
use crate::transport::WebSocketTransport;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub struct ConnectionManager {
    params: ConnectionParams,
    factory: TransportFactory,
    queue: Mutex<Option<CommandQueue>>,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl ConnectionManager {
    /// Manager that connects with [`WebSocketTransport`].
    pub fn new(params: ConnectionParams) -> Self {
        Self::with_factory(params, Arc::new(|| Box::new(WebSocketTransport::new())))
    }

    /// Manager with a custom transport factory.
    pub fn with_factory(params: ConnectionParams, factory: TransportFactory) -> Self {
        Self {
            params,
            factory,
            queue: Mutex::new(None),
        }
    }

    /// Return the open connection, opening it first if needed.
    ///
    /// Concurrent callers wait for a single handshake. If either the
    /// handshake or `setAttributes` fails, nothing is cached.
    pub async fn open(&self) -> Result<CommandQueue, ConnectionError> {
        let mut slot = self.queue.lock().await;

        if let Some(queue) = slot.as_ref() {
            if queue.is_open() {
                return Ok(queue.clone());
            }
            debug!("cached connection is gone, reconnecting");
            *slot = None;
        }

        info!(host = %self.params.host, port = self.params.port, "opening connection");

        let mut transport = (self.factory)();
        transport
            .connect(&self.params)
            .await
            .map_err(|e| ConnectionError::ConnectionFailed {
                host: self.params.host.clone(),
                port: self.params.port,
                message: e.to_string(),
            })?;

        if let Err(e) = transport.authenticate(&self.params.credentials()).await {
            if let Err(close_err) = transport.close().await {
                debug!(error = %close_err, "closing after failed login");
            }
            return Err(match e {
                TransportError::AuthenticationFailed(message) => {
                    ConnectionError::AuthenticationFailed(message)
                }
                e @ TransportError::ServerError { .. } => {
                    ConnectionError::AuthenticationFailed(e.to_string())
                }
                other => ConnectionError::ConnectionFailed {
                    host: self.params.host.clone(),
                    port: self.params.port,
                    message: other.to_string(),
                },
            });
        }

        let queue = CommandQueue::spawn(transport);
        if let Err(e) = queue.set_attributes(self.params.session_attributes()).await {
            if let Err(close_err) = queue.disconnect().await {
                warn!(error = %close_err, "failed to disconnect after rejected attributes");
            }
            return Err(ConnectionError::AttributesRejected(e.to_string()));
        }

        info!(
            host = %self.params.host,
            autocommit = self.params.autocommit,
            query_timeout = self.params.query_timeout,
            "connection ready"
        );
        *slot = Some(queue.clone());
        Ok(queue)
    }

    /// Disconnect and forget the connection. A no-op when nothing is open.
    ///
    /// The handle is dropped even if the disconnect round-trip fails, so the
    /// next [`open`](Self::open) always starts fresh.
    pub async fn close(&self) -> Result<(), ConnectionError> {
        let Some(queue) = self.queue.lock().await.take() else {
            return Ok(());
        };

        info!(host = %self.params.host, "closing connection");
        match queue.disconnect().await {
            Ok(()) | Err(TransportError::ConnectionClosed) => Ok(()),
            Err(e) => Err(ConnectionError::CloseFailed(e.to_string())),
        }
    }

    pub async fn is_open(&self) -> bool {
        self.queue
            .lock()
            .await
            .as_ref()
            .is_some_and(CommandQueue::is_open)
    }
}
