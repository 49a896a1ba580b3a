//! Relay protocol and WebSocket client.
//!
//! Frames are JSON text messages tagged by `type`. Element payloads travel
//! as plain JSON arrays; the relay never looks inside them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Messages sent to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Subscribe to a canvas room.
    JoinCanvas {
        #[serde(rename = "canvasId")]
        canvas_id: String,
    },
    /// Unsubscribe from a canvas room.
    LeaveCanvas {
        #[serde(rename = "canvasId")]
        canvas_id: String,
    },
    /// Publish a full snapshot to the other members of a room.
    CanvasUpdate {
        #[serde(rename = "canvasId")]
        canvas_id: String,
        elements: Value,
    },
}

impl ClientMessage {
    pub fn canvas_id(&self) -> &str {
        match self {
            ClientMessage::JoinCanvas { canvas_id }
            | ClientMessage::LeaveCanvas { canvas_id }
            | ClientMessage::CanvasUpdate { canvas_id, .. } => canvas_id,
        }
    }
}

/// Messages received from the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Join acknowledgement.
    Joined {
        #[serde(rename = "canvasId")]
        canvas_id: String,
        #[serde(rename = "peerCount")]
        peer_count: usize,
    },
    /// Leave acknowledgement.
    Left {
        #[serde(rename = "canvasId")]
        canvas_id: String,
    },
    /// Snapshot published by another member.
    CanvasUpdate {
        #[serde(rename = "canvasId")]
        canvas_id: String,
        elements: Value,
    },
    PeerJoined {
        #[serde(rename = "canvasId")]
        canvas_id: String,
        #[serde(rename = "peerId")]
        peer_id: String,
    },
    PeerLeft {
        #[serde(rename = "canvasId")]
        canvas_id: String,
        #[serde(rename = "peerId")]
        peer_id: String,
    },
    Error { message: String },
}

impl ServerMessage {
    /// Room the message belongs to, `None` for connection-level errors.
    pub fn canvas_id(&self) -> Option<&str> {
        match self {
            ServerMessage::Joined { canvas_id, .. }
            | ServerMessage::Left { canvas_id }
            | ServerMessage::CanvasUpdate { canvas_id, .. }
            | ServerMessage::PeerJoined { canvas_id, .. }
            | ServerMessage::PeerLeft { canvas_id, .. } => Some(canvas_id),
            ServerMessage::Error { .. } => None,
        }
    }
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Events from the WebSocket client
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// Connected to the relay
    Connected,
    /// Disconnected from the relay
    Disconnected,
    /// A frame from the relay
    Message(ServerMessage),
    /// Transport error
    Error { message: String },
}

mod native_client {
    use super::*;
    use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
    use std::thread::{self, JoinHandle};
    use std::time::Duration;
    use tungstenite::{connect, Message};
    use url::Url;

    /// Commands sent to the WebSocket thread.
    enum WsCommand {
        Send(String),
        Close,
    }

    /// Blocking WebSocket client for the relay.
    ///
    /// Runs the socket on a background thread; events are collected and
    /// must be polled via [`RelayClient::poll_events`].
    pub struct RelayClient {
        state: ConnectionState,
        events: Vec<SyncEvent>,
        cmd_tx: Option<Sender<WsCommand>>,
        event_rx: Option<Receiver<SyncEvent>>,
        _thread: Option<JoinHandle<()>>,
    }

    impl RelayClient {
        /// Create a new disconnected client.
        pub fn new() -> Self {
            Self {
                state: ConnectionState::Disconnected,
                events: Vec::new(),
                cmd_tx: None,
                event_rx: None,
                _thread: None,
            }
        }

        /// Connect to a relay at a `ws://` or `wss://` URL.
        pub fn connect(&mut self, url: &str) -> Result<(), String> {
            if self.cmd_tx.is_some() {
                return Err("Already connected".to_string());
            }

            let parsed_url = Url::parse(url).map_err(|e| format!("Invalid URL: {}", e))?;
            if parsed_url.scheme() != "ws" && parsed_url.scheme() != "wss" {
                return Err(format!("Invalid WebSocket URL scheme: {}", parsed_url.scheme()));
            }

            self.state = ConnectionState::Connecting;

            let (cmd_tx, cmd_rx) = channel::<WsCommand>();
            let (event_tx, event_rx) = channel::<SyncEvent>();
            let url = url.to_string();

            let handle = thread::spawn(move || run_socket(&url, cmd_rx, event_tx));

            self.cmd_tx = Some(cmd_tx);
            self.event_rx = Some(event_rx);
            self._thread = Some(handle);
            Ok(())
        }

        /// Disconnect from the relay.
        pub fn disconnect(&mut self) {
            if let Some(tx) = self.cmd_tx.take() {
                let _ = tx.send(WsCommand::Close);
            }
            self.event_rx = None;
            self._thread = None;
            self.state = ConnectionState::Disconnected;
        }

        /// Queue a raw text frame.
        pub fn send(&self, msg: &str) -> Result<(), String> {
            match self.cmd_tx {
                Some(ref tx) => tx
                    .send(WsCommand::Send(msg.to_string()))
                    .map_err(|e| format!("Send failed: {}", e)),
                None => Err("Not connected".to_string()),
            }
        }

        /// Serialize and queue a protocol message.
        pub fn send_message(&self, msg: &ClientMessage) -> Result<(), String> {
            let json = serde_json::to_string(msg).map_err(|e| format!("Encode failed: {}", e))?;
            self.send(&json)
        }

        /// Poll for pending events (non-blocking).
        pub fn poll_events(&mut self) -> Vec<SyncEvent> {
            if let Some(ref rx) = self.event_rx {
                while let Ok(event) = rx.try_recv() {
                    match &event {
                        SyncEvent::Connected => self.state = ConnectionState::Connected,
                        SyncEvent::Disconnected => self.state = ConnectionState::Disconnected,
                        SyncEvent::Error { .. } => self.state = ConnectionState::Error,
                        SyncEvent::Message(_) => {}
                    }
                    self.events.push(event);
                }
            }
            std::mem::take(&mut self.events)
        }

        pub fn state(&self) -> ConnectionState {
            self.state
        }

        pub fn is_connected(&self) -> bool {
            self.state == ConnectionState::Connected
        }
    }

    impl Default for RelayClient {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Drop for RelayClient {
        fn drop(&mut self) {
            self.disconnect();
        }
    }

    fn run_socket(url: &str, cmd_rx: Receiver<WsCommand>, event_tx: Sender<SyncEvent>) {
        log::info!("Relay thread: connecting to {}", url);

        let (mut socket, response) = match connect(url) {
            Ok(ok) => ok,
            Err(e) => {
                log::error!("Relay connection failed: {}", e);
                let _ = event_tx.send(SyncEvent::Error {
                    message: format!("Connection failed: {}", e),
                });
                return;
            }
        };
        log::info!("Relay connected, status: {}", response.status());
        let _ = event_tx.send(SyncEvent::Connected);

        // Short read timeout so outgoing commands are not starved.
        match socket.get_mut() {
            tungstenite::stream::MaybeTlsStream::Plain(tcp) => {
                let _ = tcp.set_read_timeout(Some(Duration::from_millis(50)));
                let _ = tcp.set_write_timeout(Some(Duration::from_secs(5)));
            }
            #[allow(unreachable_patterns)]
            _ => log::debug!("TLS stream, using default timeouts"),
        }

        loop {
            match cmd_rx.try_recv() {
                Ok(WsCommand::Send(msg)) => {
                    log::debug!("Relay sending: {}", msg.chars().take(100).collect::<String>());
                    if let Err(e) = socket.send(Message::Text(msg)) {
                        log::error!("Relay send error: {}", e);
                        break;
                    }
                }
                Ok(WsCommand::Close) => {
                    log::info!("Relay close requested");
                    let _ = socket.close(None);
                    break;
                }
                Err(TryRecvError::Disconnected) => break,
                Err(TryRecvError::Empty) => {}
            }

            match socket.read() {
                Ok(Message::Text(txt)) => match serde_json::from_str::<ServerMessage>(&txt) {
                    Ok(msg) => {
                        let _ = event_tx.send(SyncEvent::Message(msg));
                    }
                    Err(e) => log::warn!("Failed to parse relay message: {}", e),
                },
                Ok(Message::Ping(data)) => {
                    let _ = socket.send(Message::Pong(data));
                }
                Ok(Message::Close(_)) => {
                    log::info!("Relay sent close frame");
                    break;
                }
                Ok(_) => {}
                Err(tungstenite::Error::Io(ref e))
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    continue;
                }
                Err(e) => {
                    log::error!("Relay read error: {}", e);
                    break;
                }
            }
        }

        log::info!("Relay thread exiting");
        let _ = event_tx.send(SyncEvent::Disconnected);
    }
}

pub use native_client::RelayClient;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_message_wire_format() {
        let msg = ClientMessage::JoinCanvas {
            canvas_id: "c1".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"type": "joinCanvas", "canvasId": "c1"})
        );

        let msg = ClientMessage::CanvasUpdate {
            canvas_id: "c1".to_string(),
            elements: json!([]),
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"type": "canvasUpdate", "canvasId": "c1", "elements": []})
        );
    }

    #[test]
    fn test_server_message_deserialize() {
        let json = r#"{"type":"joined","canvasId":"test","peerCount":2}"#;
        let msg: ServerMessage = serde_json::from_str(json).unwrap();
        assert_eq!(
            msg,
            ServerMessage::Joined {
                canvas_id: "test".to_string(),
                peer_count: 2
            }
        );
        assert_eq!(msg.canvas_id(), Some("test"));

        let json = r#"{"type":"peerLeft","canvasId":"test","peerId":"p1"}"#;
        let msg: ServerMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(msg, ServerMessage::PeerLeft { .. }));
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let json = r#"{"type":"sync","data":"abc"}"#;
        assert!(serde_json::from_str::<ClientMessage>(json).is_err());
    }

    #[test]
    fn test_client_rejects_bad_url() {
        let mut client = RelayClient::new();
        assert!(client.connect("http://localhost:3030").is_err());
        assert!(client.connect("not a url").is_err());
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert!(client.send("x").is_err());
    }
}
