//! Single-worker command queue.
//!
//! The Exasol protocol cannot interleave requests on one connection, so the
//! transport is owned by a worker task and every round-trip is sent to it as
//! a [`Command`] over an unbounded channel. The worker handles one job at a
//! time, in the order jobs were submitted, and answers each on its own
//! oneshot channel. A failed job does not affect the ones behind it.

use crate::error::TransportError;
use crate::transport::messages::{
    RawResult, ResultChunk, ResultSetHandle, SessionAttributes,
};
use crate::transport::protocol::TransportProtocol;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace, warn};

/// One protocol round-trip.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetAttributes(SessionAttributes),
    Execute(String),
    Fetch {
        handle: ResultSetHandle,
        start_position: u64,
        num_bytes: u64,
    },
    CloseResultSet(ResultSetHandle),
    /// Ends the session; the worker stops after answering it.
    Disconnect,
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::SetAttributes(_) => "setAttributes",
            Command::Execute(_) => "execute",
            Command::Fetch { .. } => "fetch",
            Command::CloseResultSet(_) => "closeResultSet",
            Command::Disconnect => "disconnect",
        }
    }
}

/// Worker answer to a [`Command`].
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Ack,
    Executed(RawResult),
    Fetched(ResultChunk),
}

struct Job {
    command: Command,
    reply_tx: oneshot::Sender<Result<Reply, TransportError>>,
}

/// Handle to the worker that owns the transport. Cheap to clone.
#[derive(Clone)]
pub struct CommandQueue {
    job_tx: mpsc::UnboundedSender<Job>,
    connected: Arc<AtomicBool>,
}

impl std::fmt::Debug for CommandQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandQueue")
            .field("open", &self.is_open())
            .finish()
    }
}

impl CommandQueue {
    /// Start a worker that takes ownership of an already connected transport.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(transport: Box<dyn TransportProtocol>) -> Self {
        let (job_tx, job_rx) = mpsc::unbounded_channel();
        let connected = Arc::new(AtomicBool::new(transport.is_connected()));

        tokio::spawn(run_worker(transport, job_rx, Arc::clone(&connected)));

        Self { job_tx, connected }
    }

    /// Enqueue a command.
    ///
    /// The job is enqueued before this returns, so call order is wire order
    /// regardless of when the returned future is first polled.
    pub fn submit(
        &self,
        command: Command,
    ) -> impl Future<Output = Result<Reply, TransportError>> + Send + 'static {
        let (reply_tx, reply_rx) = oneshot::channel();
        let enqueued = self.job_tx.send(Job { command, reply_tx }).is_ok();

        async move {
            if !enqueued {
                return Err(TransportError::ConnectionClosed);
            }
            // A dropped sender means the worker stopped before reaching this job.
            reply_rx
                .await
                .unwrap_or(Err(TransportError::ConnectionClosed))
        }
    }

    pub async fn set_attributes(&self, attributes: SessionAttributes) -> Result<(), TransportError> {
        expect_ack("setAttributes", self.submit(Command::SetAttributes(attributes)).await?)
    }

    /// Enqueue an `execute`. Like [`submit`](Self::submit), the job is queued
    /// immediately.
    pub fn execute(
        &self,
        sql: &str,
    ) -> impl Future<Output = Result<RawResult, TransportError>> + Send + 'static {
        let reply = self.submit(Command::Execute(sql.to_string()));
        async move {
            match reply.await? {
                Reply::Executed(result) => Ok(result),
                other => Err(unexpected_reply("execute", &other)),
            }
        }
    }

    pub async fn fetch(
        &self,
        handle: ResultSetHandle,
        start_position: u64,
        num_bytes: u64,
    ) -> Result<ResultChunk, TransportError> {
        let command = Command::Fetch {
            handle,
            start_position,
            num_bytes,
        };
        match self.submit(command).await? {
            Reply::Fetched(chunk) => Ok(chunk),
            other => Err(unexpected_reply("fetch", &other)),
        }
    }

    pub async fn close_result_set(&self, handle: ResultSetHandle) -> Result<(), TransportError> {
        expect_ack("closeResultSet", self.submit(Command::CloseResultSet(handle)).await?)
    }

    pub async fn disconnect(&self) -> Result<(), TransportError> {
        expect_ack("disconnect", self.submit(Command::Disconnect).await?)
    }

    /// Worker is running and its transport still reports a live connection.
    pub fn is_open(&self) -> bool {
        !self.job_tx.is_closed() && self.connected.load(Ordering::Acquire)
    }
}

fn expect_ack(command: &str, reply: Reply) -> Result<(), TransportError> {
    match reply {
        Reply::Ack => Ok(()),
        other => Err(unexpected_reply(command, &other)),
    }
}

fn unexpected_reply(command: &str, reply: &Reply) -> TransportError {
    TransportError::ProtocolError(format!("Unexpected reply to {command}: {reply:?}"))
}

async fn run_worker(
    mut transport: Box<dyn TransportProtocol>,
    mut job_rx: mpsc::UnboundedReceiver<Job>,
    connected: Arc<AtomicBool>,
) {
    while let Some(Job { command, reply_tx }) = job_rx.recv().await {
        let name = command.name();
        let stop = command == Command::Disconnect;

        debug!(command = name, "dispatching");
        let result = dispatch(transport.as_mut(), command).await;
        connected.store(transport.is_connected() && !stop, Ordering::Release);

        if let Err(ref e) = result {
            debug!(command = name, error = %e, "command failed");
        }
        if let Err(unclaimed) = reply_tx.send(result) {
            trace!(command = name, "caller went away before the reply");
            if let Some(handle) = orphaned_cursor(&unclaimed) {
                debug!(%handle, "closing cursor of abandoned statement");
                if let Err(e) = transport.close_result_set(handle).await {
                    warn!(%handle, error = %e, "failed to close abandoned cursor");
                }
            }
        }
        if stop {
            break;
        }
    }

    connected.store(false, Ordering::Release);
    debug!("command queue worker stopped");
}

/// Cursor opened by an `execute` whose caller is no longer listening.
fn orphaned_cursor(unclaimed: &Result<Reply, TransportError>) -> Option<ResultSetHandle> {
    match unclaimed {
        Ok(Reply::Executed(RawResult::ResultSet(result_set))) => result_set.result_set_handle,
        _ => None,
    }
}

async fn dispatch(
    transport: &mut dyn TransportProtocol,
    command: Command,
) -> Result<Reply, TransportError> {
    match command {
        Command::SetAttributes(attributes) => {
            transport.set_attributes(&attributes).await?;
            Ok(Reply::Ack)
        }
        Command::Execute(sql) => transport.execute(&sql).await.map(Reply::Executed),
        Command::Fetch {
            handle,
            start_position,
            num_bytes,
        } => transport
            .fetch(handle, start_position, num_bytes)
            .await
            .map(Reply::Fetched),
        Command::CloseResultSet(handle) => {
            transport.close_result_set(handle).await?;
            Ok(Reply::Ack)
        }
        Command::Disconnect => {
            transport.close().await?;
            Ok(Reply::Ack)
        }
    }
}
