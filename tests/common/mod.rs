//! Shared test helpers.
//!
//! [`FakeServer`] is a scripted in-memory Exasol: statements are answered
//! from canned replies, result sets are served in fixed-size chunks, and
//! every round-trip is recorded so tests can assert on wire order and cursor
//! handling. The live helpers at the bottom connect to a real database.

#![allow(dead_code)]

use async_trait::async_trait;
use exaquery::connection::ConnectionParams;
use exaquery::transport::messages::{ColumnInfo, DataType};
use exaquery::transport::{
    Credentials, RawResult, ResultChunk, ResultSetData, ResultSetHandle, SessionAttributes,
    SessionInfo, TransportFactory, TransportProtocol,
};
use exaquery::{Driver, DriverConfig, TransportError};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// One recorded round-trip.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Connect,
    Login(String),
    SetAttributes(SessionAttributes),
    Execute(String),
    Fetch {
        handle: i64,
        start: u64,
        num_bytes: u64,
    },
    Close(i64),
    Disconnect,
}

/// Canned answer to an `execute`.
#[derive(Debug, Clone)]
pub enum Reply {
    RowCount(u64),
    /// `total` rows of a single `ID` column valued `0..total`. `inline` rows
    /// come with the execute response, each fetch returns at most `chunk`.
    Rows { total: u64, inline: u64, chunk: u64 },
    /// Small inline result without a cursor; rows are row-major.
    Table {
        columns: Vec<&'static str>,
        rows: Vec<Vec<Value>>,
    },
    Error(&'static str),
    Unrecognized(&'static str),
}

#[derive(Debug, Clone, Copy)]
struct Cursor {
    total: u64,
    chunk: u64,
}

#[derive(Default)]
struct State {
    replies: HashMap<String, Reply>,
    events: Vec<Event>,
    cursors: HashMap<i64, Cursor>,
    fail_fetch: bool,
    fail_close: bool,
    reject_attributes: bool,
    connections: usize,
}

/// Scripted server shared by every transport created from [`factory`](Self::factory).
#[derive(Clone, Default)]
pub struct FakeServer {
    state: Arc<Mutex<State>>,
    next_handle: Arc<AtomicU64>,
}

impl FakeServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_execute(&self, sql: &str, reply: Reply) -> &Self {
        self.state
            .lock()
            .unwrap()
            .replies
            .insert(sql.to_string(), reply);
        self
    }

    pub fn fail_fetches(&self) {
        self.state.lock().unwrap().fail_fetch = true;
    }

    pub fn fail_closes(&self) {
        self.state.lock().unwrap().fail_close = true;
    }

    pub fn reject_attributes(&self) {
        self.state.lock().unwrap().reject_attributes = true;
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn executions(&self, sql: &str) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, Event::Execute(s) if s == sql))
            .count()
    }

    pub fn fetches(&self) -> Vec<(i64, u64)> {
        self.events()
            .iter()
            .filter_map(|e| match e {
                Event::Fetch { handle, start, .. } => Some((*handle, *start)),
                _ => None,
            })
            .collect()
    }

    pub fn closes(&self) -> Vec<i64> {
        self.events()
            .iter()
            .filter_map(|e| match e {
                Event::Close(handle) => Some(*handle),
                _ => None,
            })
            .collect()
    }

    /// Cursors handed out and not closed yet.
    pub fn open_cursors(&self) -> usize {
        self.state.lock().unwrap().cursors.len()
    }

    pub fn connections(&self) -> usize {
        self.state.lock().unwrap().connections
    }

    pub fn factory(&self) -> TransportFactory {
        let server = self.clone();
        Arc::new(move || {
            Box::new(FakeTransport {
                server: server.clone(),
                connected: false,
            }) as Box<dyn TransportProtocol>
        })
    }

    /// Driver with default limits talking to this server.
    pub fn driver(&self) -> Driver {
        self.driver_with(|config| config)
    }

    pub fn driver_with(&self, configure: impl FnOnce(DriverConfig) -> DriverConfig) -> Driver {
        let params = ConnectionParams::builder()
            .host("fake.exasol")
            .password("exasol")
            .build()
            .unwrap();
        Driver::with_transport_factory(configure(DriverConfig::new(params)), self.factory())
    }

    fn record(&self, event: Event) {
        self.state.lock().unwrap().events.push(event);
    }

    fn execute(&self, sql: &str) -> Result<RawResult, TransportError> {
        self.record(Event::Execute(sql.to_string()));
        let reply = self.state.lock().unwrap().replies.get(sql).cloned();

        match reply {
            None => Err(server_error(&format!("syntax error in '{sql}'"))),
            Some(Reply::Error(message)) => Err(server_error(message)),
            Some(Reply::RowCount(count)) => Ok(RawResult::RowCount { count }),
            Some(Reply::Unrecognized(tag)) => Ok(RawResult::Unrecognized {
                result_type: tag.to_string(),
            }),
            Some(Reply::Table { columns, rows }) => {
                let data = (0..columns.len())
                    .map(|c| rows.iter().map(|r| r.get(c).cloned().unwrap_or(Value::Null)).collect())
                    .collect();
                Ok(RawResult::ResultSet(ResultSetData {
                    result_set_handle: None,
                    num_columns: columns.len(),
                    num_rows: rows.len() as u64,
                    num_rows_in_message: rows.len() as u64,
                    columns: columns.iter().map(|c| column(c)).collect(),
                    data,
                }))
            }
            Some(Reply::Rows {
                total,
                inline,
                chunk,
            }) => {
                let inline = inline.min(total);
                let handle = if inline < total {
                    let handle = self.next_handle.fetch_add(1, Ordering::SeqCst) as i64 + 1;
                    self.state
                        .lock()
                        .unwrap()
                        .cursors
                        .insert(handle, Cursor { total, chunk });
                    Some(ResultSetHandle::new(handle))
                } else {
                    None
                };
                Ok(RawResult::ResultSet(ResultSetData {
                    result_set_handle: handle,
                    num_columns: 1,
                    num_rows: total,
                    num_rows_in_message: inline,
                    columns: vec![column("ID")],
                    data: vec![ids(0, inline)],
                }))
            }
        }
    }

    fn fetch(&self, handle: ResultSetHandle, start: u64, num_bytes: u64) -> Result<ResultChunk, TransportError> {
        self.record(Event::Fetch {
            handle: handle.as_i64(),
            start,
            num_bytes,
        });
        let state = self.state.lock().unwrap();
        if state.fail_fetch {
            return Err(TransportError::WebSocketError("connection reset".to_string()));
        }
        let cursor = state
            .cursors
            .get(&handle.as_i64())
            .copied()
            .ok_or_else(|| server_error("invalid result set handle"))?;

        let count = cursor.chunk.min(cursor.total.saturating_sub(start));
        Ok(ResultChunk {
            num_rows: count,
            data: vec![ids(start, count)],
        })
    }

    fn close(&self, handle: ResultSetHandle) -> Result<(), TransportError> {
        self.record(Event::Close(handle.as_i64()));
        let mut state = self.state.lock().unwrap();
        let known = state.cursors.remove(&handle.as_i64()).is_some();
        if state.fail_close {
            return Err(server_error("close failed"));
        }
        if !known {
            return Err(server_error("result set closed twice"));
        }
        Ok(())
    }
}

struct FakeTransport {
    server: FakeServer,
    connected: bool,
}

#[async_trait]
impl TransportProtocol for FakeTransport {
    async fn connect(&mut self, _params: &ConnectionParams) -> Result<(), TransportError> {
        self.server.record(Event::Connect);
        self.server.state.lock().unwrap().connections += 1;
        self.connected = true;
        Ok(())
    }

    async fn authenticate(&mut self, credentials: &Credentials) -> Result<SessionInfo, TransportError> {
        self.server.record(Event::Login(credentials.username.clone()));
        Ok(SessionInfo::default())
    }

    async fn set_attributes(&mut self, attributes: &SessionAttributes) -> Result<(), TransportError> {
        self.server.record(Event::SetAttributes(*attributes));
        if self.server.state.lock().unwrap().reject_attributes {
            return Err(server_error("attribute rejected"));
        }
        Ok(())
    }

    async fn execute(&mut self, sql: &str) -> Result<RawResult, TransportError> {
        // Yield so concurrently submitted work gets a chance to interleave.
        tokio::task::yield_now().await;
        self.server.execute(sql)
    }

    async fn fetch(
        &mut self,
        handle: ResultSetHandle,
        start_position: u64,
        num_bytes: u64,
    ) -> Result<ResultChunk, TransportError> {
        tokio::task::yield_now().await;
        self.server.fetch(handle, start_position, num_bytes)
    }

    async fn close_result_set(&mut self, handle: ResultSetHandle) -> Result<(), TransportError> {
        self.server.close(handle)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.server.record(Event::Disconnect);
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

fn server_error(message: &str) -> TransportError {
    TransportError::ServerError {
        sql_code: "42000".to_string(),
        message: message.to_string(),
    }
}

fn column(name: &str) -> ColumnInfo {
    ColumnInfo {
        name: name.to_string(),
        data_type: DataType {
            type_name: "DECIMAL".to_string(),
            precision: Some(18),
            scale: Some(0),
            ..Default::default()
        },
    }
}

fn ids(from: u64, count: u64) -> Vec<Value> {
    (from..from + count).map(|i| json!(i)).collect()
}

// ============================================================================
// Live database helpers
// ============================================================================

/// Skip the current test when no Exasol host is configured.
#[macro_export]
macro_rules! skip_if_no_exasol {
    () => {
        if std::env::var("EXASOL_HOST").is_err() {
            eprintln!("EXASOL_HOST not set, skipping");
            return;
        }
    };
}

/// Driver for the database described by the `EXASOL_*` variables.
pub fn live_driver() -> Driver {
    let config = DriverConfig::from_env().expect("EXASOL_* variables should be valid");
    Driver::new(config)
}

/// Unique schema name for one test run.
pub fn generate_test_schema_name() -> String {
    format!("EXAQUERY_TEST_{}", uuid::Uuid::new_v4().simple()).to_uppercase()
}
