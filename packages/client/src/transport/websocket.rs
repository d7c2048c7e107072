//! WebSocket transport.
//!
//! Connects to `<endpoint>/ws` with the bearer token in the `Authorization`
//! header and waits for the server's `connect` handshake frame before the
//! session counts as established.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use kibun_shared::protocol::ServerEvent;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{
        Error as WsError,
        client::IntoClientRequest,
        http::{HeaderValue, StatusCode, header::AUTHORIZATION},
        protocol::Message,
    },
};

use crate::{
    config::{ClientConfig, TransportKind},
    domain::DisconnectReason,
    error::ClientError,
};

use super::{Transport, TransportEvent};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Established WebSocket session
pub struct WebSocketTransport {
    sid: String,
    stream: WsStream,
}

/// Open a WebSocket session and complete the handshake
pub async fn connect(config: &ClientConfig, token: &str) -> Result<WebSocketTransport, ClientError> {
    let url = config.websocket_url();
    let mut request = url
        .as_str()
        .into_client_request()
        .map_err(|e| ClientError::Config(format!("invalid WebSocket URL '{}': {}", url, e)))?;
    let bearer = HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|_| ClientError::Config("token contains invalid characters".to_string()))?;
    request.headers_mut().insert(AUTHORIZATION, bearer);

    tracing::debug!("Opening WebSocket session to {}", url);
    let (mut stream, _response) = connect_async(request).await.map_err(map_connect_error)?;

    let sid = read_handshake(&mut stream).await?;
    tracing::debug!("WebSocket session '{}' established", sid);

    Ok(WebSocketTransport { sid, stream })
}

fn map_connect_error(error: WsError) -> ClientError {
    match error {
        WsError::Http(response) if response.status() == StatusCode::UNAUTHORIZED => {
            ClientError::Unauthorized
        }
        other => ClientError::ConnectionError(other.to_string()),
    }
}

/// Wait for the `connect` frame carrying the session id
async fn read_handshake(stream: &mut WsStream) -> Result<String, ClientError> {
    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => {
                return match ServerEvent::decode(text.as_str())? {
                    ServerEvent::Connect(payload) => Ok(payload.sid),
                    other => Err(ClientError::Handshake(format!(
                        "expected 'connect', got '{}'",
                        other.name()
                    ))),
                };
            }
            Ok(Message::Close(_)) => {
                return Err(ClientError::Handshake(
                    "server closed the stream during the handshake".to_string(),
                ));
            }
            Ok(_) => {}
            Err(e) => return Err(ClientError::ConnectionError(e.to_string())),
        }
    }
    Err(ClientError::Handshake(
        "stream ended before the handshake".to_string(),
    ))
}

#[async_trait]
impl Transport for WebSocketTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::WebSocket
    }

    fn session_id(&self) -> &str {
        &self.sid
    }

    async fn send(&mut self, frame: String) -> Result<(), ClientError> {
        self.stream
            .send(Message::Text(frame.into()))
            .await
            .map_err(|e| ClientError::ConnectionError(e.to_string()))
    }

    async fn recv(&mut self) -> TransportEvent {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    return TransportEvent::Frame(text.as_str().to_string());
                }
                Some(Ok(Message::Binary(data))) => {
                    tracing::debug!("Ignoring {} bytes of binary data", data.len());
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!("Server closed the WebSocket session: {:?}", frame);
                    return TransportEvent::Closed(DisconnectReason::ServerDisconnect);
                }
                // ping/pong are answered by tungstenite
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    return TransportEvent::Closed(DisconnectReason::TransportError(e.to_string()));
                }
                None => return TransportEvent::Closed(DisconnectReason::TransportClose),
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            tracing::debug!("WebSocket close failed: {}", e);
        }
    }
}
