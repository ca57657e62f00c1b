use crate::error::TransportError;
use crate::services::notification::transport::{Connector, Transport};
use async_trait::async_trait;
use futures::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

#[derive(Debug, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &Url) -> Result<Box<dyn Transport>, TransportError> {
        let (stream, response) = tokio_tungstenite::connect_async(url.as_str()).await?;
        tracing::debug!(status = %response.status(), "WebSocket handshake complete");
        Ok(Box::new(WsTransport { stream }))
    }
}

struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Transport for WsTransport {
    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.as_str().to_owned())),
                Ok(Message::Binary(bytes)) => return Some(Ok(String::from_utf8_lossy(&bytes).into_owned())),
                Ok(Message::Close(frame)) => {
                    tracing::debug!(?frame, "Push endpoint closed the connection");
                    return None;
                }
                Ok(Message::Ping(_) | Message::Pong(_)) => {
                    tracing::trace!("Received heartbeat frame");
                }
                Ok(Message::Frame(_)) => {}
                Err(e) => return Some(Err(e.into())),
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            tracing::debug!(error = %e, "Error while closing WebSocket");
        }
    }
}
