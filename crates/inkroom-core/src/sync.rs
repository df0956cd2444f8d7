//! WebSocket client for the drawing relay.
//!
//! The relay speaks one event, `draw`, whose payload it never inspects.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Frames exchanged with the relay server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelayMessage {
    /// A drawing delta, forwarded verbatim to every other peer.
    Draw { data: serde_json::Value },
    /// Sent by the server in reply to a frame it could not parse.
    Error { message: String },
}

impl RelayMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Where the relay client is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// What the relay client reports back to the board.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    Connected,
    Disconnected,
    /// Another peer drew something.
    DrawReceived { data: serde_json::Value },
    Error { message: String },
}

impl From<RelayMessage> for SyncEvent {
    fn from(msg: RelayMessage) -> Self {
        match msg {
            RelayMessage::Draw { data } => SyncEvent::DrawReceived { data },
            RelayMessage::Error { message } => SyncEvent::Error { message },
        }
    }
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Already connected")]
    AlreadyConnected,
    #[error("Not connected")]
    NotConnected,
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Invalid WebSocket URL scheme: {0}")]
    InvalidScheme(String),
    #[error("Send failed: connection thread has exited")]
    SendFailed,
    #[error("Failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

#[cfg(not(target_arch = "wasm32"))]
mod native_client {
    use super::*;
    use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};
    use std::thread::{self, JoinHandle};
    use std::time::Duration;
    use tungstenite::{Message, connect};
    use url::Url;

    /// Work for the socket thread.
    enum WsCommand {
        Send(String),
        Close,
    }

    /// Relay client backed by a blocking tungstenite socket.
    ///
    /// The socket is owned by a worker thread. Frames go out through a
    /// command channel and inbound events wait until `poll_events()`.
    pub struct NativeWebSocket {
        state: ConnectionState,
        events: Vec<SyncEvent>,
        cmd_tx: Option<Sender<WsCommand>>,
        event_rx: Option<Receiver<SyncEvent>>,
        _thread: Option<JoinHandle<()>>,
    }

    impl NativeWebSocket {
        /// A client with no socket yet.
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
        pub fn connect(&mut self, url: &str) -> Result<(), RelayError> {
            if self.cmd_tx.is_some() {
                return Err(RelayError::AlreadyConnected);
            }

            let parsed_url = Url::parse(url).map_err(|e| RelayError::InvalidUrl(e.to_string()))?;
            if parsed_url.scheme() != "ws" && parsed_url.scheme() != "wss" {
                return Err(RelayError::InvalidScheme(parsed_url.scheme().to_string()));
            }

            self.state = ConnectionState::Connecting;

            let (cmd_tx, cmd_rx) = channel::<WsCommand>();
            let (event_tx, event_rx) = channel::<SyncEvent>();
            let url = url.to_string();

            let handle = thread::spawn(move || {
                log::info!("Opening relay socket to {}", url);
                match connect(&url) {
                    Ok((mut socket, response)) => {
                        log::info!("Relay socket open ({})", response.status());
                        let _ = event_tx.send(SyncEvent::Connected);

                        // Reads time out after 50ms so queued sends are not starved.
                        match socket.get_mut() {
                            tungstenite::stream::MaybeTlsStream::Plain(tcp) => {
                                let _ = tcp.set_read_timeout(Some(Duration::from_millis(50)));
                                let _ = tcp.set_write_timeout(Some(Duration::from_secs(5)));
                            }
                            #[allow(unreachable_patterns)]
                            _ => log::debug!("Relay socket is TLS; keeping blocking reads"),
                        }

                        loop {
                            match cmd_rx.try_recv() {
                                Ok(WsCommand::Send(msg)) => {
                                    log::debug!("-> relay: {}", msg.chars().take(100).collect::<String>());
                                    if let Err(e) = socket.send(Message::Text(msg)) {
                                        log::error!("Failed to write relay frame: {}", e);
                                        break;
                                    }
                                }
                                Ok(WsCommand::Close) => {
                                    log::info!("Closing relay socket");
                                    let _ = socket.close(None);
                                    break;
                                }
                                Err(TryRecvError::Disconnected) => {
                                    log::info!("Client handle dropped; stopping relay loop");
                                    break;
                                }
                                Err(TryRecvError::Empty) => {}
                            }

                            match socket.read() {
                                Ok(Message::Text(txt)) => match RelayMessage::from_json(&txt) {
                                    Ok(msg) => {
                                        let _ = event_tx.send(msg.into());
                                    }
                                    Err(e) => log::warn!("Dropping unparseable relay frame: {}", e),
                                },
                                Ok(Message::Ping(data)) => {
                                    let _ = socket.send(Message::Pong(data));
                                }
                                Ok(Message::Close(_)) => {
                                    log::info!("Relay closed the socket");
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
                                    log::error!("Failed to read relay frame: {}", e);
                                    break;
                                }
                            }
                        }

                        log::info!("Relay loop stopped");
                        let _ = event_tx.send(SyncEvent::Disconnected);
                    }
                    Err(e) => {
                        log::error!("Could not reach relay: {}", e);
                        let _ = event_tx.send(SyncEvent::Error {
                            message: format!("Connection failed: {}", e),
                        });
                    }
                }
            });

            self.cmd_tx = Some(cmd_tx);
            self.event_rx = Some(event_rx);
            self._thread = Some(handle);
            Ok(())
        }

        /// Ask the worker to close the socket and forget it.
        pub fn disconnect(&mut self) {
            if let Some(tx) = self.cmd_tx.take() {
                let _ = tx.send(WsCommand::Close);
            }
            self.event_rx = None;
            self._thread = None;
            self.state = ConnectionState::Disconnected;
        }

        /// Queue a text frame.
        pub fn send(&self, msg: &str) -> Result<(), RelayError> {
            let tx = self.cmd_tx.as_ref().ok_or(RelayError::NotConnected)?;
            tx.send(WsCommand::Send(msg.to_string()))
                .map_err(|_| RelayError::SendFailed)
        }

        /// Drain events received since the last call. Never blocks.
        pub fn poll_events(&mut self) -> Vec<SyncEvent> {
            if let Some(ref rx) = self.event_rx {
                while let Ok(event) = rx.try_recv() {
                    match &event {
                        SyncEvent::Connected => self.state = ConnectionState::Connected,
                        SyncEvent::Disconnected => self.state = ConnectionState::Disconnected,
                        SyncEvent::Error { .. } => self.state = ConnectionState::Error,
                        SyncEvent::DrawReceived { .. } => {}
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

    impl Default for NativeWebSocket {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Drop for NativeWebSocket {
        fn drop(&mut self) {
            self.disconnect();
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use native_client::NativeWebSocket;
