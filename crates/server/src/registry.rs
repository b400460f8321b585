//! Connection registry: active players keyed by session.

use glam::Vec2;
use indexmap::IndexMap;
use std::fmt;

/// Handle for one connected session.
///
/// Allocated by the game state when a transport connects; independent of any
/// socket or address type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u32);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An active player. The radius is derived from `score`, never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: SessionId,
    pub name: String,
    pub position: Vec2,
    pub score: u32,
}

impl Player {
    pub fn new(id: SessionId, name: String, position: Vec2) -> Self {
        Self {
            id,
            name,
            position,
            score: 0,
        }
    }
}

/// Active players in join order.
#[derive(Debug, Default)]
pub struct Registry {
    players: IndexMap<SessionId, Player>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new player unless `name` is already held by an active player
    /// or the session already owns one. Returns the new player, or `None` when
    /// nothing changed.
    pub fn join(&mut self, id: SessionId, name: &str, position: Vec2) -> Option<&Player> {
        if self.name_taken(name) || self.players.contains_key(&id) {
            return None;
        }
        self.players.insert(id, Player::new(id, name.to_string(), position));
        self.players.get(&id)
    }

    /// Whether an active player currently holds `name` (exact match).
    pub fn name_taken(&self, name: &str) -> bool {
        self.players.values().any(|p| p.name == name)
    }

    pub fn get(&self, id: SessionId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn get_mut(&mut self, id: SessionId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    /// Players in insertion order.
    pub fn list(&self) -> impl ExactSizeIterator<Item = &Player> {
        self.players.values()
    }

    /// Remove a player, keeping the order of the rest.
    pub fn remove(&mut self, id: SessionId) -> Option<Player> {
        self.players.shift_remove(&id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
