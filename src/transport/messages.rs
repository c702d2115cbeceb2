//! Wire message types for the Exasol WebSocket protocol.
//!
//! Requests are serialized from strongly typed structs. Responses are decoded
//! right here, at the transport boundary, into [`RawResult`] and
//! [`ResultChunk`]; only cell values stay as untyped JSON.

use crate::error::TransportError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol version requested at login.
pub const PROTOCOL_VERSION: u32 = 3;

/// Server-side cursor handle for the unread rows of a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultSetHandle(i64);

impl ResultSetHandle {
    pub fn new(handle: i64) -> Self {
        Self(handle)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for ResultSetHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Session attributes applied right after login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionAttributes {
    pub autocommit: bool,
    /// Query timeout in seconds, 0 disables it.
    pub query_timeout: u64,
}

impl Default for SessionAttributes {
    fn default() -> Self {
        Self {
            autocommit: true,
            query_timeout: 0,
        }
    }
}

/// Command frames sent to the server.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "command", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Request<'a> {
    Login {
        protocol_version: u32,
    },
    SetAttributes {
        attributes: SessionAttributes,
    },
    Execute {
        sql_text: &'a str,
    },
    Fetch {
        result_set_handle: ResultSetHandle,
        start_position: u64,
        num_bytes: u64,
    },
    CloseResultSet {
        result_set_handles: Vec<ResultSetHandle>,
    },
    Disconnect,
}

/// Second login frame, sent after the server handed out its public key.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginCredentials<'a> {
    pub username: &'a str,
    /// RSA-encrypted, base64-encoded password.
    pub password: String,
    pub use_compression: bool,
    pub client_name: &'a str,
    pub driver_name: &'a str,
    pub client_os: &'a str,
    pub client_version: &'a str,
}

/// Response envelope shared by every command.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub status: String,
    #[serde(default)]
    pub response_data: Option<Value>,
    #[serde(default)]
    pub exception: Option<ExceptionInfo>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionInfo {
    pub text: String,
    #[serde(default)]
    pub sql_code: String,
}

impl Response {
    /// Parse a text frame into a response envelope.
    pub fn parse(text: &str) -> Result<Self, TransportError> {
        serde_json::from_str(text)
            .map_err(|e| TransportError::ProtocolError(format!("Malformed response frame: {e}")))
    }

    /// Unwrap `responseData`, turning `status: "error"` into a server error.
    pub fn into_data(self) -> Result<Option<Value>, TransportError> {
        match self.status.as_str() {
            "ok" => Ok(self.response_data),
            "error" => {
                let exception = self.exception.unwrap_or(ExceptionInfo {
                    text: "Unknown server error".to_string(),
                    sql_code: String::new(),
                });
                Err(TransportError::ServerError {
                    sql_code: exception.sql_code,
                    message: exception.text,
                })
            }
            other => Err(TransportError::ProtocolError(format!(
                "Unknown response status '{other}'"
            ))),
        }
    }

    /// Like [`Response::into_data`] but requires `responseData` to be present.
    pub fn into_required_data(self) -> Result<Value, TransportError> {
        self.into_data()?.ok_or_else(|| {
            TransportError::ProtocolError("Response is missing responseData".to_string())
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyData {
    pub public_key_pem: String,
}

/// Session details returned by a successful login.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    #[serde(default)]
    pub session_id: u64,
    #[serde(default)]
    pub protocol_version: u32,
    #[serde(default)]
    pub release_version: String,
    #[serde(default)]
    pub database_name: String,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub max_data_message_size: u64,
    #[serde(default)]
    pub time_zone: Option<String>,
}

/// Exasol data type descriptor of a result column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataType {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_set: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub with_local_time_zone: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fraction: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: DataType,
}

/// Result-set outcome of an `execute` command.
///
/// `data` is column-oriented: one array per column, each holding
/// `num_rows_in_message` values.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSetData {
    #[serde(default)]
    pub result_set_handle: Option<ResultSetHandle>,
    #[serde(default)]
    pub num_columns: usize,
    /// Total rows available on the server.
    pub num_rows: u64,
    /// Rows included inline in this message.
    pub num_rows_in_message: u64,
    #[serde(default)]
    pub columns: Vec<ColumnInfo>,
    #[serde(default)]
    pub data: Vec<Vec<Value>>,
}

impl ResultSetData {
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

/// Response to a `fetch` command; `data` is column-oriented.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultChunk {
    pub num_rows: u64,
    #[serde(default)]
    pub data: Vec<Vec<Value>>,
}

/// Decoded response to an `execute` command.
#[derive(Debug, Clone, PartialEq)]
pub enum RawResult {
    /// DML/DDL acknowledgement.
    RowCount { count: u64 },
    /// Query result, possibly with a cursor for more rows.
    ResultSet(ResultSetData),
    /// A `resultType` this client does not know.
    Unrecognized { result_type: String },
}

impl RawResult {
    /// Decode the `responseData` of a single-statement `execute`.
    pub fn from_response_data(mut data: Value) -> Result<Self, TransportError> {
        let results = data
            .get_mut("results")
            .and_then(Value::as_array_mut)
            .ok_or_else(|| {
                TransportError::ProtocolError("Execute response has no results".to_string())
            })?;

        if results.len() != 1 {
            return Err(TransportError::ProtocolError(format!(
                "Expected exactly one result, got {}",
                results.len()
            )));
        }

        Self::from_result(results.remove(0))
    }

    /// Decode one entry of the `results` array.
    pub fn from_result(mut result: Value) -> Result<Self, TransportError> {
        let result_type = result
            .get("resultType")
            .and_then(Value::as_str)
            .ok_or_else(|| TransportError::ProtocolError("Result has no resultType".to_string()))?
            .to_string();

        match result_type.as_str() {
            "rowCount" => {
                let count = result
                    .get("rowCount")
                    .and_then(Value::as_u64)
                    .ok_or_else(|| {
                        TransportError::ProtocolError("rowCount result without count".to_string())
                    })?;
                Ok(RawResult::RowCount { count })
            }
            "resultSet" => {
                let result_set = result.get_mut("resultSet").map(Value::take).ok_or_else(|| {
                    TransportError::ProtocolError("resultSet result without resultSet".to_string())
                })?;
                let data: ResultSetData = serde_json::from_value(result_set).map_err(|e| {
                    TransportError::ProtocolError(format!("Malformed resultSet: {e}"))
                })?;
                Ok(RawResult::ResultSet(data))
            }
            _ => Ok(RawResult::Unrecognized { result_type }),
        }
    }
}
