//! Collaboration glue between a [`Board`] and the drawing relay.
//!
//! The relay is best-effort broadcast: frames are delivered at most once,
//! never acknowledged or retried, and peers that connect later get no
//! history.

use crate::board::Board;
use crate::delta::Delta;
use crate::sync::{RelayError, RelayMessage, SyncEvent};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

/// A connection that can carry relay frames.
pub trait RelayTransport {
    /// Queue one text frame for the relay.
    fn send(&mut self, frame: &str) -> Result<(), RelayError>;

    /// Drain events received since the last poll.
    fn poll(&mut self) -> Vec<SyncEvent>;
}

#[cfg(not(target_arch = "wasm32"))]
impl RelayTransport for crate::sync::NativeWebSocket {
    fn send(&mut self, frame: &str) -> Result<(), RelayError> {
        crate::sync::NativeWebSocket::send(self, frame)
    }

    fn poll(&mut self) -> Vec<SyncEvent> {
        self.poll_events()
    }
}

/// Publishes a board's local deltas and applies deltas from other peers.
pub struct SyncRelay<T: RelayTransport> {
    transport: T,
    /// Deltas published so far.
    published: usize,
    /// Remote deltas applied so far.
    applied: usize,
}

impl<T: RelayTransport> SyncRelay<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            published: 0,
            applied: 0,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn published(&self) -> usize {
        self.published
    }

    pub fn applied(&self) -> usize {
        self.applied
    }

    /// Send one delta to every other peer.
    pub fn publish(&mut self, delta: &Delta) -> Result<(), RelayError> {
        let frame = RelayMessage::Draw {
            data: serde_json::to_value(delta)?,
        }
        .to_json()?;
        self.transport.send(&frame)?;
        self.published += 1;
        Ok(())
    }

    /// Publish the board's pending deltas, then apply whatever arrived.
    ///
    /// Returns the number of remote deltas applied.
    pub fn pump(&mut self, board: &mut Board) -> usize {
        for delta in board.take_outgoing() {
            if let Err(e) = self.publish(&delta) {
                log::warn!("Dropping local delta: {}", e);
            }
        }

        let mut applied = 0;
        for event in self.transport.poll() {
            match event {
                SyncEvent::DrawReceived { data } => match serde_json::from_value::<Delta>(data) {
                    Ok(delta) => {
                        board.apply_remote(&delta);
                        applied += 1;
                    }
                    Err(e) => log::warn!("Dropping malformed draw payload: {}", e),
                },
                SyncEvent::Connected => log::info!("Relay connected"),
                SyncEvent::Disconnected => log::info!("Relay disconnected"),
                SyncEvent::Error { message } => log::warn!("Relay error: {}", message),
            }
        }
        self.applied += applied;
        applied
    }
}

#[derive(Debug, Default)]
struct HubInner {
    next_peer: u64,
    queues: HashMap<u64, VecDeque<SyncEvent>>,
}

/// In-process relay with the same delivery rules as the relay server.
///
/// Useful for driving several boards against each other without sockets.
#[derive(Debug, Clone, Default)]
pub struct LoopbackHub {
    inner: Arc<Mutex<HubInner>>,
}

impl LoopbackHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HubInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Connect a new peer. It only receives frames sent from now on.
    pub fn connect(&self) -> LoopbackPeer {
        let mut inner = self.lock();
        let id = inner.next_peer;
        inner.next_peer += 1;
        inner.queues.insert(id, VecDeque::from([SyncEvent::Connected]));
        LoopbackPeer {
            id,
            hub: self.clone(),
        }
    }

    pub fn peer_count(&self) -> usize {
        self.lock().queues.len()
    }
}

/// One connection to a [`LoopbackHub`]. Disconnects on drop.
#[derive(Debug)]
pub struct LoopbackPeer {
    id: u64,
    hub: LoopbackHub,
}

impl LoopbackPeer {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl RelayTransport for LoopbackPeer {
    fn send(&mut self, frame: &str) -> Result<(), RelayError> {
        let mut inner = self.hub.lock();
        match RelayMessage::from_json(frame) {
            Ok(RelayMessage::Draw { data }) => {
                for (_, queue) in inner.queues.iter_mut().filter(|(peer, _)| **peer != self.id) {
                    queue.push_back(SyncEvent::DrawReceived { data: data.clone() });
                }
            }
            Ok(RelayMessage::Error { .. }) | Err(_) => {
                if let Some(queue) = inner.queues.get_mut(&self.id) {
                    queue.push_back(SyncEvent::Error {
                        message: "Invalid message".to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    fn poll(&mut self) -> Vec<SyncEvent> {
        self.hub
            .lock()
            .queues
            .get_mut(&self.id)
            .map(|queue| queue.drain(..).collect())
            .unwrap_or_default()
    }
}

impl Drop for LoopbackPeer {
    fn drop(&mut self) {
        self.hub.lock().queues.remove(&self.id);
    }
}
