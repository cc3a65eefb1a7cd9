use anyhow::{Context, Result};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use crate::messages::{ControllerMessage, DashboardMessage};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket client bridging this controller to the cloud dashboard. The
/// dashboard service and its protocol internals live on the other side of
/// the socket; this side only exchanges JSON frames.
pub struct DashboardClient {
    write: SplitSink<WsStream, Message>,
    read: SplitStream<WsStream>,
}

impl DashboardClient {
    /// Connect to the dashboard and authenticate with the controller token.
    pub async fn connect(host: &str, port: u16, token: &str) -> Result<Self> {
        let url = format!("ws://{}:{}/controller", host, port);
        let (ws, _) = connect_async(&url)
            .await
            .with_context(|| format!("Failed to connect to dashboard at {}", url))?;
        tracing::info!("Connected to dashboard at {}:{}", host, port);

        let (write, read) = ws.split();
        let mut client = Self { write, read };

        client
            .send(&ControllerMessage::Auth {
                token: token.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            })
            .await
            .context("Failed to authenticate with dashboard")?;

        Ok(client)
    }

    /// Send a message to the dashboard.
    pub async fn send(&mut self, message: &ControllerMessage) -> Result<()> {
        let json = serde_json::to_string(message)?;
        self.write
            .send(Message::Text(json))
            .await
            .context("Failed to send message to dashboard")
    }

    /// Next inbound dashboard frame. Returns `None` when the transport has
    /// closed; a malformed frame is an `Err` the caller can log and skip.
    pub async fn next_message(&mut self) -> Option<Result<DashboardMessage>> {
        loop {
            match self.read.next().await? {
                Ok(Message::Text(text)) => {
                    return Some(
                        serde_json::from_str(&text).context("Invalid frame from dashboard"),
                    )
                }
                Ok(Message::Close(_)) => return None,
                // Pings are answered by the transport; nothing else inbound
                // carries commands.
                Ok(_) => continue,
                Err(e) => return Some(Err(e).context("Dashboard transport error")),
            }
        }
    }
}
