//! Client session state.

use crate::registry::SessionId;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// A connected session, joined or not.
#[derive(Debug)]
pub struct Client {
    /// Session handle.
    pub id: SessionId,
    /// Remote address.
    pub addr: SocketAddr,
    /// When the transport connected.
    pub connected_at: Instant,
    /// Last inbound message.
    pub last_activity: Instant,
    /// Number of inbound messages handled.
    pub messages: u64,
}

impl Client {
    /// Create a new client session.
    pub fn new(id: SessionId, addr: SocketAddr) -> Self {
        let now = Instant::now();
        Self {
            id,
            addr,
            connected_at: now,
            last_activity: now,
            messages: 0,
        }
    }

    /// Record an inbound message.
    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
        self.messages += 1;
    }

    /// Time since the transport connected.
    pub fn connected_for(&self) -> Duration {
        self.connected_at.elapsed()
    }

    /// Time since the last inbound message (or the connect, if none).
    pub fn idle_for(&self) -> Duration {
        self.last_activity.elapsed()
    }
}
