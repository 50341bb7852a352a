//! WebSocket client connection

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::ws::protocol::{ClientMsg, ServerMsg};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Capacity of the inbound event and outbound message channels
const CHANNEL_CAPACITY: usize = 256;

/// Everything the game loop hears from the transport
#[derive(Debug, Clone, PartialEq)]
pub enum NetEvent {
    Connected,
    Disconnected { reason: String },
    Message(ServerMsg),
}

/// Transport errors
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("WebSocket connect failed: {0}")]
    Connect(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Live connection: channels for the game loop plus the I/O tasks
pub struct Connection {
    pub outbound: mpsc::Sender<ClientMsg>,
    pub events: mpsc::Receiver<NetEvent>,
    reader_handle: JoinHandle<()>,
    writer_handle: JoinHandle<()>,
}

impl Connection {
    /// Split into the channel ends the game loop owns
    pub fn into_parts(self) -> (mpsc::Sender<ClientMsg>, mpsc::Receiver<NetEvent>, ConnectionTasks) {
        (
            self.outbound,
            self.events,
            ConnectionTasks {
                reader_handle: self.reader_handle,
                writer_handle: self.writer_handle,
            },
        )
    }
}

/// Background I/O task handles
pub struct ConnectionTasks {
    reader_handle: JoinHandle<()>,
    writer_handle: JoinHandle<()>,
}

impl ConnectionTasks {
    /// Let the writer flush what is queued, then stop the reader
    pub async fn shutdown(self) {
        if let Err(e) = self.writer_handle.await {
            debug!(error = %e, "Writer task ended abnormally");
        }
        self.reader_handle.abort();
    }
}

/// Connect to the game server and start the read/write tasks
pub async fn connect(url: &str) -> Result<Connection, TransportError> {
    let (socket, _response) = tokio_tungstenite::connect_async(url).await?;
    info!(url = %url, "Connected to game server");

    let (ws_sink, ws_stream) = socket.split();
    let (outbound_tx, outbound_rx) = mpsc::channel::<ClientMsg>(CHANNEL_CAPACITY);
    let (event_tx, event_rx) = mpsc::channel::<NetEvent>(CHANNEL_CAPACITY);

    // Buffered before either task runs, so it is always the first event
    let _ = event_tx.send(NetEvent::Connected).await;

    let writer_handle = tokio::spawn(run_writer(ws_sink, outbound_rx));
    let reader_handle = tokio::spawn(run_reader(ws_stream, event_tx));

    Ok(Connection {
        outbound: outbound_tx,
        events: event_rx,
        reader_handle,
        writer_handle,
    })
}

/// Writer task: outbound channel -> WebSocket
async fn run_writer(mut ws_sink: SplitSink<WsStream, Message>, mut outbound_rx: mpsc::Receiver<ClientMsg>) {
    while let Some(msg) = outbound_rx.recv().await {
        if let Err(e) = send_msg(&mut ws_sink, &msg).await {
            warn!(kind = msg.kind(), error = %e, "WebSocket send failed");
            break;
        }
        debug!(kind = msg.kind(), "Sent message");
    }

    // Game loop dropped its sender: close politely
    let _ = ws_sink.send(Message::Close(None)).await;
    let _ = ws_sink.close().await;
}

/// Reader task: WebSocket -> game loop
async fn run_reader(mut ws_stream: SplitStream<WsStream>, event_tx: mpsc::Sender<NetEvent>) {
    let reason = loop {
        match ws_stream.next().await {
            Some(Ok(Message::Text(text))) => match serde_json::from_str::<ServerMsg>(&text) {
                Ok(msg) => {
                    if event_tx.send(NetEvent::Message(msg)).await.is_err() {
                        debug!("Event channel closed");
                        return;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Failed to parse server message");
                }
            },
            Some(Ok(Message::Binary(_))) => {
                warn!("Received binary message, ignoring");
            }
            Some(Ok(Message::Ping(_))) => {
                debug!("Received ping");
            }
            Some(Ok(Message::Pong(_))) => {
                debug!("Received pong");
            }
            Some(Ok(Message::Close(frame))) => {
                info!("Server closed the connection");
                break frame
                    .map(|f| f.reason.to_string())
                    .filter(|r| !r.is_empty())
                    .unwrap_or_else(|| "closed by server".to_string());
            }
            Some(Ok(Message::Frame(_))) => {}
            Some(Err(e)) => {
                error!(error = %e, "WebSocket error");
                break e.to_string();
            }
            None => break "connection lost".to_string(),
        }
    };

    let _ = event_tx.send(NetEvent::Disconnected { reason }).await;
}

/// Send a message over WebSocket
async fn send_msg(sink: &mut SplitSink<WsStream, Message>, msg: &ClientMsg) -> Result<(), String> {
    let json = encode(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json)).await.map_err(|e| e.to_string())
}

/// JSON text frame for a client message
pub fn encode(msg: &ClientMsg) -> Result<String, TransportError> {
    Ok(serde_json::to_string(msg)?)
}
