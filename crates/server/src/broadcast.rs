//! Fan-out of engine events to connected sessions.

use crate::events::GameEvent;
use crate::registry::SessionId;
use bytes::Bytes;
use tokio::sync::broadcast;
use tracing::trace;

/// An encoded packet on its way to one or all sessions.
#[derive(Debug, Clone)]
pub struct Outbound {
    /// `None` means every session.
    pub target: Option<SessionId>,
    pub packet: Bytes,
}

impl Outbound {
    /// Whether `session` should receive this packet.
    #[inline]
    pub fn is_for(&self, session: SessionId) -> bool {
        self.target.is_none_or(|target| target == session)
    }
}

/// Relays events to every subscriber in the order they were dispatched.
///
/// Delivery is fire-and-forget: a send with no subscribers, or a subscriber
/// that lags and loses packets, never reports back to the caller.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    tx: broadcast::Sender<Outbound>,
}

impl Broadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Outbound> {
        self.tx.subscribe()
    }

    /// Encode each event once and send it to all sessions, preserving order.
    pub fn broadcast(&self, events: &[GameEvent]) {
        for event in events {
            let packet = event.encode();
            trace!("Broadcasting {} ({} bytes)", event.kind(), packet.len());
            let _ = self.tx.send(Outbound {
                target: None,
                packet,
            });
        }
    }

    /// Send a packet to a single session.
    pub fn send_to(&self, session: SessionId, packet: Bytes) {
        let _ = self.tx.send(Outbound {
            target: Some(session),
            packet,
        });
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
