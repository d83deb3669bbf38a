//! WebSocket connector and stream.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use gateway_core::{GatewayError, GatewayResult, StreamConnector, TextStream};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderValue, StatusCode};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

/// Streaming connection configuration.
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// WebSocket URL of the ingest endpoint.
    pub url: String,
    /// Tenant/zone identifier sent as the `Predix-Zone-Id` header.
    pub zone_id: String,
    /// Client id, sent as the `Origin: sensor://<id>` header.
    pub client_id: String,
    /// Timeout applied to connect, send and receive individually.
    pub timeout: Duration,
}

/// Opens authenticated websocket connections to the ingest endpoint.
pub struct WsConnector {
    config: WsConfig,
}

impl WsConnector {
    /// Create a connector for the configured endpoint.
    pub fn new(config: WsConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl StreamConnector for WsConnector {
    type Stream = WsStream;

    async fn connect(&self, bearer_token: &str) -> GatewayResult<WsStream> {
        info!(url = %self.config.url, "connecting to the time-series ingest endpoint");

        let mut request = self
            .config
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| GatewayError::Generic(format!("invalid ingest URL: {e}")))?;
        let headers = request.headers_mut();
        headers.insert("Authorization", header_value(&format!("Bearer {bearer_token}"))?);
        headers.insert("Predix-Zone-Id", header_value(&self.config.zone_id)?);
        headers.insert(
            "Origin",
            header_value(&format!("sensor://{}", self.config.client_id))?,
        );

        let connect = connect_async(request);
        let (stream, _response) = tokio::time::timeout(self.config.timeout, connect)
            .await
            .map_err(|_| GatewayError::Timeout)?
            .map_err(classify_connect_error)?;

        info!("connected to the time-series ingest endpoint");
        Ok(WsStream {
            inner: stream,
            timeout: self.config.timeout,
        })
    }
}

/// An established text-frame connection.
pub struct WsStream {
    inner: WebSocketStream<MaybeTlsStream<TcpStream>>,
    timeout: Duration,
}

#[async_trait]
impl TextStream for WsStream {
    async fn send_text(&mut self, text: &str) -> GatewayResult<()> {
        let send = self.inner.send(Message::Text(text.to_string()));
        match tokio::time::timeout(self.timeout, send).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                warn!(error = %e, "error sending text frame");
                Err(GatewayError::Connection(e.to_string()))
            }
            Err(_) => {
                warn!("timed out sending text frame");
                Err(GatewayError::Timeout)
            }
        }
    }

    async fn receive_text(&mut self) -> GatewayResult<String> {
        let receive = async {
            loop {
                match self.inner.next().await {
                    Some(Ok(Message::Text(text))) => return Ok(text),
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                        // Keepalive control frames; tungstenite answers pings itself.
                        debug!("skipping control frame");
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        return Err(GatewayError::Connection(
                            "connection closed by server".to_string(),
                        ));
                    }
                    Some(Ok(other)) => {
                        // Anything but a text data frame here is undefined behavior.
                        return Err(GatewayError::InvalidRequest(format!(
                            "unexpected non-text frame: {other:?}"
                        )));
                    }
                    Some(Err(e)) => return Err(GatewayError::Connection(e.to_string())),
                }
            }
        };
        match tokio::time::timeout(self.timeout, receive).await {
            Ok(result) => result,
            Err(_) => {
                warn!("timed out waiting for text frame");
                Err(GatewayError::Timeout)
            }
        }
    }
}

fn header_value(value: &str) -> GatewayResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| GatewayError::Generic(format!("invalid header value: {e}")))
}

/// Map a websocket handshake failure into the gateway classification.
///
/// An authorization rejection at upgrade time is distinct from other
/// failures: the token is refreshable, so it must not abort the process.
fn classify_connect_error(err: tungstenite::Error) -> GatewayError {
    match err {
        tungstenite::Error::Http(response) => {
            let status = response.status();
            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                GatewayError::InvalidToken(format!("handshake rejected with HTTP {status}"))
            } else {
                GatewayError::Generic(format!("unexpected handshake response: HTTP {status}"))
            }
        }
        tungstenite::Error::Io(e) => GatewayError::Connection(e.to_string()),
        other => GatewayError::Generic(format!("websocket connect failed: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_hdr_async;
    use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};

    fn connector(url: String) -> WsConnector {
        WsConnector::new(WsConfig {
            url,
            zone_id: "zone-ts".to_string(),
            client_id: "sensor-1".to_string(),
            timeout: Duration::from_millis(500),
        })
    }

    #[tokio::test]
    async fn connect_sends_auth_headers_and_exchanges_text_frames() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let captured: Arc<Mutex<Vec<(String, String)>>> = Arc::new(Mutex::new(Vec::new()));
        let captured_server = captured.clone();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let callback = |request: &Request, response: Response| {
                let mut headers = captured_server.lock().unwrap();
                for name in ["authorization", "predix-zone-id", "origin"] {
                    if let Some(value) = request.headers().get(name) {
                        headers.push((name.to_string(), value.to_str().unwrap().to_string()));
                    }
                }
                Ok(response)
            };
            let mut ws = accept_hdr_async(stream, callback).await.unwrap();
            if let Some(Ok(Message::Text(text))) = ws.next().await {
                ws.send(Message::Text(format!("echo:{text}"))).await.unwrap();
            }
        });

        let mut stream = connector(format!("ws://{addr}"))
            .connect("tok-abc")
            .await
            .unwrap();
        stream.send_text("hello").await.unwrap();
        assert_eq!(stream.receive_text().await.unwrap(), "echo:hello");

        let headers = captured.lock().unwrap();
        assert!(headers.contains(&("authorization".to_string(), "Bearer tok-abc".to_string())));
        assert!(headers.contains(&("predix-zone-id".to_string(), "zone-ts".to_string())));
        assert!(headers.contains(&("origin".to_string(), "sensor://sensor-1".to_string())));
    }

    #[tokio::test]
    async fn unauthorized_upgrade_classifies_as_invalid_token() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf).await;
            let _ = stream
                .write_all(b"HTTP/1.1 401 Unauthorized\r\ncontent-length: 0\r\n\r\n")
                .await;
        });

        match connector(format!("ws://{addr}")).connect("stale-token").await {
            Err(GatewayError::InvalidToken(msg)) => assert!(msg.contains("401")),
            other => panic!("expected InvalidToken, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn refused_connection_classifies_as_connection_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        match connector(format!("ws://{addr}")).connect("tok").await {
            Err(GatewayError::Connection(_)) => {}
            other => panic!("expected Connection, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn silent_server_classifies_receive_as_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            // Hold the connection open without sending anything.
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(ws);
        });

        let mut stream = connector(format!("ws://{addr}")).connect("tok").await.unwrap();
        assert_eq!(
            stream.receive_text().await.unwrap_err(),
            GatewayError::Timeout
        );
    }

    #[tokio::test]
    async fn binary_frame_classifies_as_invalid_request() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            ws.send(Message::Binary(vec![1, 2, 3])).await.unwrap();
            tokio::time::sleep(Duration::from_secs(1)).await;
        });

        let mut stream = connector(format!("ws://{addr}")).connect("tok").await.unwrap();
        match stream.receive_text().await {
            Err(GatewayError::InvalidRequest(_)) => {}
            other => panic!("expected InvalidRequest, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn ping_frames_are_skipped_before_the_ack() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            ws.send(Message::Ping(vec![])).await.unwrap();
            ws.send(Message::Text("ack".to_string())).await.unwrap();
            tokio::time::sleep(Duration::from_secs(1)).await;
        });

        let mut stream = connector(format!("ws://{addr}")).connect("tok").await.unwrap();
        assert_eq!(stream.receive_text().await.unwrap(), "ack");
    }
}
