//! WebSocket transport implementation.
//!
//! Speaks Exasol's JSON-over-WebSocket protocol (version 3): every command is
//! one text frame and is answered by exactly one text frame.

use crate::connection::params::ConnectionParams;
use crate::error::TransportError;
use crate::transport::messages::{
    LoginCredentials, PublicKeyData, RawResult, Request, Response, ResultChunk, ResultSetHandle,
    SessionAttributes, SessionInfo, PROTOCOL_VERSION,
};
use crate::transport::protocol::{Credentials, TransportProtocol};
use crate::transport::tls;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use futures::{SinkExt, StreamExt};
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::{Pkcs1v15Encrypt, RsaPublicKey};
use serde::Serialize;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async_tls_with_config, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const DRIVER_NAME: &str = concat!("exaquery ", env!("CARGO_PKG_VERSION"));

/// WebSocket transport to a single Exasol node.
pub struct WebSocketTransport {
    stream: Option<WsStream>,
    session: Option<SessionInfo>,
    client_name: String,
}

impl WebSocketTransport {
    pub fn new() -> Self {
        Self {
            stream: None,
            session: None,
            client_name: "exaquery".to_string(),
        }
    }

    /// Session details of the last successful login.
    pub fn session_info(&self) -> Option<&SessionInfo> {
        self.session.as_ref()
    }

    async fn round_trip<T: Serialize + Sync>(
        &mut self,
        request: &T,
    ) -> Result<Response, TransportError> {
        let stream = self
            .stream
            .as_mut()
            .ok_or(TransportError::ConnectionClosed)?;

        let payload = serde_json::to_string(request)?;
        stream
            .send(Message::Text(payload))
            .await
            .map_err(|e| TransportError::WebSocketError(format!("Failed to send frame: {e}")))?;

        let response = receive(stream).await;
        if matches!(response, Err(TransportError::ConnectionClosed)) {
            self.stream = None;
        }
        response
    }
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self::new()
    }
}

/// Wait for the next response frame, skipping control frames.
async fn receive(stream: &mut WsStream) -> Result<Response, TransportError> {
    loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => return Response::parse(&text),
            Some(Ok(Message::Binary(bytes))) => {
                let text = std::str::from_utf8(&bytes).map_err(|e| {
                    TransportError::ProtocolError(format!("Binary frame is not UTF-8: {e}"))
                })?;
                return Response::parse(text);
            }
            Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => continue,
            Some(Ok(Message::Close(_))) | None => return Err(TransportError::ConnectionClosed),
            Some(Err(e)) => {
                return Err(TransportError::WebSocketError(format!(
                    "Failed to receive frame: {e}"
                )))
            }
        }
    }
}

/// Encrypt the password with the server's RSA public key (PKCS#1 v1.5), base64-encoded.
fn encrypt_password(public_key_pem: &str, password: &str) -> Result<String, TransportError> {
    let key = RsaPublicKey::from_pkcs1_pem(public_key_pem)
        .or_else(|_| RsaPublicKey::from_public_key_pem(public_key_pem))
        .map_err(|e| {
            TransportError::AuthenticationFailed(format!("Invalid server public key: {e}"))
        })?;

    let mut rng = rand::thread_rng();
    let encrypted = key
        .encrypt(&mut rng, Pkcs1v15Encrypt, password.as_bytes())
        .map_err(|e| TransportError::AuthenticationFailed(format!("Password encryption: {e}")))?;

    Ok(BASE64_STANDARD.encode(encrypted))
}

#[async_trait]
impl TransportProtocol for WebSocketTransport {
    async fn connect(&mut self, params: &ConnectionParams) -> Result<(), TransportError> {
        let url = params.websocket_url();
        let connector = if params.use_tls {
            tls::connector(params.validate_server_certificate)
        } else {
            None
        };

        debug!(%url, "opening websocket");
        let connecting = connect_async_tls_with_config(url.as_str(), None, false, connector);
        let (stream, _) = tokio::time::timeout(params.connection_timeout, connecting)
            .await
            .map_err(|_| TransportError::Timeout {
                timeout_ms: params.connection_timeout.as_millis() as u64,
            })?
            .map_err(|e| TransportError::ConnectionFailed(format!("{url}: {e}")))?;

        self.stream = Some(stream);
        Ok(())
    }

    async fn authenticate(
        &mut self,
        credentials: &Credentials,
    ) -> Result<SessionInfo, TransportError> {
        let login = Request::Login {
            protocol_version: PROTOCOL_VERSION,
        };
        let key_data = self
            .round_trip(&login)
            .await?
            .into_required_data()
            .map_err(|e| TransportError::AuthenticationFailed(e.to_string()))?;
        let key: PublicKeyData = serde_json::from_value(key_data)
            .map_err(|e| TransportError::AuthenticationFailed(format!("Login response: {e}")))?;

        let client_name = self.client_name.clone();
        let frame = LoginCredentials {
            username: &credentials.username,
            password: encrypt_password(&key.public_key_pem, credentials.password())?,
            use_compression: false,
            client_name: &client_name,
            driver_name: DRIVER_NAME,
            client_os: std::env::consts::OS,
            client_version: env!("CARGO_PKG_VERSION"),
        };
        let session_data = self
            .round_trip(&frame)
            .await?
            .into_required_data()
            .map_err(|e| TransportError::AuthenticationFailed(e.to_string()))?;
        let session: SessionInfo = serde_json::from_value(session_data)?;

        info!(
            session_id = session.session_id,
            release = %session.release_version,
            "logged in"
        );
        self.session = Some(session.clone());
        Ok(session)
    }

    async fn set_attributes(
        &mut self,
        attributes: &SessionAttributes,
    ) -> Result<(), TransportError> {
        let request = Request::SetAttributes {
            attributes: *attributes,
        };
        self.round_trip(&request).await?.into_data()?;
        Ok(())
    }

    async fn execute(&mut self, sql: &str) -> Result<RawResult, TransportError> {
        let data = self
            .round_trip(&Request::Execute { sql_text: sql })
            .await?
            .into_required_data()?;
        RawResult::from_response_data(data)
    }

    async fn fetch(
        &mut self,
        handle: ResultSetHandle,
        start_position: u64,
        num_bytes: u64,
    ) -> Result<ResultChunk, TransportError> {
        let request = Request::Fetch {
            result_set_handle: handle,
            start_position,
            num_bytes,
        };
        let data = self.round_trip(&request).await?.into_required_data()?;
        serde_json::from_value(data)
            .map_err(|e| TransportError::ProtocolError(format!("Malformed fetch response: {e}")))
    }

    async fn close_result_set(&mut self, handle: ResultSetHandle) -> Result<(), TransportError> {
        let request = Request::CloseResultSet {
            result_set_handles: vec![handle],
        };
        self.round_trip(&request).await?.into_data()?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if self.stream.is_none() {
            return Ok(());
        }

        let disconnect = self
            .round_trip(&Request::Disconnect)
            .await
            .and_then(Response::into_data);

        let closed = match self.stream.take() {
            Some(mut stream) => stream
                .close(None)
                .await
                .map_err(|e| TransportError::WebSocketError(format!("Failed to close: {e}"))),
            None => Ok(()),
        };
        self.session = None;

        disconnect?;
        closed
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::params::ConnectionBuilder;
    use rsa::pkcs1::{EncodeRsaPublicKey, LineEnding};
    use rsa::RsaPrivateKey;
    use serde_json::{json, Value};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    async fn next_frame(ws: &mut WebSocketStream<TcpStream>) -> Value {
        loop {
            match ws.next().await.unwrap().unwrap() {
                Message::Text(text) => return serde_json::from_str(&text).unwrap(),
                _ => continue,
            }
        }
    }

    async fn reply(ws: &mut WebSocketStream<TcpStream>, body: Value) {
        ws.send(Message::Text(body.to_string())).await.unwrap();
    }

    /// Accept one connection, answer the two login frames and hand back the
    /// credentials frame with its password decrypted.
    async fn login_server() -> (u16, JoinHandle<Value>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();

            let private_key = {
                let mut rng = rand::thread_rng();
                RsaPrivateKey::new(&mut rng, 1024).unwrap()
            };
            let pem = private_key
                .to_public_key()
                .to_pkcs1_pem(LineEnding::LF)
                .unwrap();

            let login = next_frame(&mut ws).await;
            assert_eq!(login["command"], "login");
            reply(
                &mut ws,
                json!({"status": "ok", "responseData": {"publicKeyPem": pem}}),
            )
            .await;

            let mut credentials = next_frame(&mut ws).await;
            reply(
                &mut ws,
                json!({
                    "status": "ok",
                    "responseData": {"sessionId": 42, "releaseVersion": "8.29.1"}
                }),
            )
            .await;

            let encrypted = BASE64_STANDARD
                .decode(credentials["password"].as_str().unwrap())
                .unwrap();
            let password = private_key.decrypt(Pkcs1v15Encrypt, &encrypted).unwrap();
            credentials["password"] = json!(String::from_utf8(password).unwrap());
            credentials
        });

        (port, server)
    }

    #[tokio::test]
    async fn test_login_against_local_server() {
        let (port, server) = login_server().await;
        let params = ConnectionBuilder::new()
            .host("127.0.0.1")
            .port(port)
            .username("sys")
            .password("exasol")
            .build()
            .unwrap();

        let mut transport = WebSocketTransport::new();
        transport.connect(&params).await.unwrap();
        let session = transport
            .authenticate(&params.credentials())
            .await
            .unwrap();

        assert_eq!(session.session_id, 42);
        assert_eq!(transport.session_info().unwrap().release_version, "8.29.1");

        let credentials = server.await.unwrap();
        assert_eq!(credentials["username"], "sys");
        assert_eq!(credentials["password"], "exasol");
        assert_eq!(credentials["clientName"], "exaquery");
        assert_eq!(credentials["useCompression"], false);
    }

    #[test]
    fn test_new_transport_is_disconnected() {
        let transport = WebSocketTransport::new();
        assert!(!transport.is_connected());
        assert!(transport.session_info().is_none());
    }

    #[test]
    fn test_encrypt_password_round_trip() {
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, 1024).unwrap();
        let pem = private_key
            .to_public_key()
            .to_pkcs1_pem(LineEnding::LF)
            .unwrap();

        let encrypted = encrypt_password(&pem, "exasol").unwrap();
        let bytes = BASE64_STANDARD.decode(encrypted).unwrap();
        let decrypted = private_key.decrypt(Pkcs1v15Encrypt, &bytes).unwrap();
        assert_eq!(decrypted, b"exasol");
    }

    #[test]
    fn test_encrypt_password_rejects_garbage_key() {
        let err = encrypt_password("not a key", "exasol").unwrap_err();
        assert!(matches!(err, TransportError::AuthenticationFailed(_)));
    }

    #[tokio::test]
    async fn test_execute_without_connection_fails() {
        let mut transport = WebSocketTransport::new();
        let err = transport.execute("SELECT 1").await.unwrap_err();
        assert_eq!(err, TransportError::ConnectionClosed);
    }

    #[tokio::test]
    async fn test_close_without_connection_is_noop() {
        let mut transport = WebSocketTransport::new();
        assert!(transport.close().await.is_ok());
    }
}
