//! Game state: the single serialization point for every mutation.

use crate::arena::Arena;
use crate::broadcast::{Broadcaster, Outbound};
use crate::chat::ChatLog;
use crate::collision;
use crate::config::Config;
use crate::events::{GameEvent, PlayerSnapshot};
use crate::food::FoodSpawner;
use crate::movement;
use crate::registry::{Registry, SessionId};
use bytes::Bytes;
use glam::Vec2;
use protocol::packets::{self, ClientPacket};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info, warn};

use super::client::Client;

/// Game state shared between connection tasks.
///
/// Each inbound message is handled to completion, broadcasts included, while
/// the lock is held.
pub type SharedGame = Arc<Mutex<GameState>>;

/// Capacity of the outbound channel per subscriber.
const OUTBOUND_CAPACITY: usize = 1024;

/// Why a join request was refused.
#[derive(Debug, Error, PartialEq)]
pub enum JoinError {
    #[error("name must not be empty")]
    EmptyName,
    #[error("session {0} is not connected")]
    UnknownSession(SessionId),
}

/// Main game state.
pub struct GameState {
    pub config: Config,
    pub arena: Arena,

    // ID counter
    next_session_id: u32,

    // Connected sessions, joined or not
    pub clients: HashMap<SessionId, Client>,

    // Active players
    pub registry: Registry,

    // The singleton food item
    pub food: FoodSpawner,

    // Retained chat history
    pub chat: ChatLog,

    broadcaster: Broadcaster,
    rng: StdRng,
}

impl GameState {
    /// Create a new game state.
    pub fn new(config: &Config) -> Self {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    /// Create a game state with a fixed random seed.
    pub fn with_seed(config: &Config, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: &Config, mut rng: StdRng) -> Self {
        let arena = Arena::new(&config.arena);
        let food = FoodSpawner::new(&arena, &mut rng);

        Self {
            config: config.clone(),
            arena,
            next_session_id: 1,
            clients: HashMap::new(),
            registry: Registry::new(),
            food,
            chat: ChatLog::new(config.chat.history_limit),
            broadcaster: Broadcaster::new(OUTBOUND_CAPACITY),
            rng,
        }
    }

    /// Wrap into the shared handle used by connection tasks.
    pub fn shared(self) -> SharedGame {
        Arc::new(Mutex::new(self))
    }

    /// Register a new transport connection.
    ///
    /// The receiver is created before the session becomes visible, so the
    /// session sees every broadcast from here on.
    pub fn connect(&mut self, addr: SocketAddr) -> (SessionId, broadcast::Receiver<Outbound>) {
        let id = SessionId(self.next_session_id);
        self.next_session_id = self.next_session_id.wrapping_add(1).max(1);
        let rx = self.broadcaster.subscribe();
        self.clients.insert(id, Client::new(id, addr));
        info!("Client {} connected from {}", id, addr);
        (id, rx)
    }

    /// Subscribe to broadcasts without a session (observers, tests).
    pub fn subscribe(&self) -> broadcast::Receiver<Outbound> {
        self.broadcaster.subscribe()
    }

    /// Remove a session and its player, announcing the new roster if a player
    /// left. Returns the broadcast events.
    pub fn disconnect(&mut self, session: SessionId) -> Vec<GameEvent> {
        if let Some(client) = self.clients.remove(&session) {
            info!(
                "Client {} ({}) disconnected after {:.1?} ({} messages, idle {:.1?})",
                client.id,
                client.addr,
                client.connected_for(),
                client.messages,
                client.idle_for()
            );
        }

        let events = match self.registry.remove(session) {
            Some(player) => {
                info!("Player '{}' left ({} players remain)", player.name, self.registry.len());
                vec![self.roster()]
            }
            None => Vec::new(),
        };
        self.broadcaster.broadcast(&events);
        events
    }

    /// Handle a packet from a client and dispatch the resulting events.
    pub fn handle_packet(&mut self, session: SessionId, data: &[u8]) -> anyhow::Result<()> {
        let client = self
            .clients
            .get_mut(&session)
            .ok_or_else(|| anyhow::anyhow!("Client {} not found", session))?;
        client.touch();

        let packet = ClientPacket::parse(data)?;
        if !matches!(packet, ClientPacket::Move { .. }) {
            // Moves are very frequent; avoid logging them
            debug!("Client {} sent {:?}", session, packet);
        }

        let events = match packet {
            ClientPacket::Join { name } => match self.handle_join(session, &name) {
                Ok(events) => events,
                Err(e) => {
                    warn!("Join from {} rejected: {}", session, e);
                    let reason = packets::build_join_rejected(&e.to_string()).finish();
                    self.broadcaster.send_to(session, reason);
                    return Ok(());
                }
            },
            ClientPacket::Move { delta_x, delta_y } => {
                self.handle_move(session, Vec2::new(delta_x, delta_y))
            }
            ClientPacket::Chat { payload } => self.handle_chat(session, payload),
        };

        self.broadcaster.broadcast(&events);
        Ok(())
    }

    /// Handle a join request.
    ///
    /// The name is trimmed and truncated to the configured length. A name
    /// already held by an active player, or a session that already has a
    /// player, leaves the registry untouched; the roster and food are sent
    /// either way.
    pub fn handle_join(&mut self, session: SessionId, name: &str) -> Result<Vec<GameEvent>, JoinError> {
        if !self.clients.contains_key(&session) {
            return Err(JoinError::UnknownSession(session));
        }

        let name: String = name
            .trim()
            .chars()
            .take(self.config.arena.max_name_length)
            .collect();
        if name.is_empty() {
            return Err(JoinError::EmptyName);
        }

        let position = self.arena.spawn_position(&mut self.rng);
        match self.registry.join(session, &name, position) {
            Some(player) => info!(
                "Client {} joined as '{}' at ({:.1}, {:.1})",
                session, player.name, player.position.x, player.position.y
            ),
            None => debug!("Join as '{}' from {} ignored: name in use or already joined", name, session),
        }

        Ok(vec![self.roster(), GameEvent::Food(self.food.current())])
    }

    /// Handle a movement request.
    ///
    /// Events come out in the order clients rely on: food eaten and the new
    /// food, player eaten, then the roster. A session without a player
    /// produces nothing.
    pub fn handle_move(&mut self, session: SessionId, delta: Vec2) -> Vec<GameEvent> {
        if movement::apply_move(&mut self.registry, &self.arena, session, delta).is_none() {
            debug!("Move from {} ignored: not joined", session);
            return Vec::new();
        }

        let collisions = collision::resolve_collisions(
            &mut self.registry,
            &mut self.food,
            &self.arena,
            session,
            &mut self.rng,
        );

        let mut events = Vec::with_capacity(4);
        if let Some(eaten) = collisions.food_eaten {
            info!("{} ate food! Score: {}", eaten.player_name, eaten.new_score);
            let new_food = eaten.new_food;
            events.push(GameEvent::FoodEaten(eaten));
            events.push(GameEvent::Food(new_food));
        }
        if let Some(eaten) = collisions.player_eaten {
            info!(
                "{} ate {} ({} points), score now {}",
                eaten.eater_name, eaten.victim_name, eaten.victim_old_score, eaten.eater_new_score
            );
            events.push(GameEvent::PlayerEaten(eaten));
        }
        events.push(self.roster());
        events
    }

    /// Handle a chat message: append it and rebroadcast the retained log.
    pub fn handle_chat(&mut self, session: SessionId, payload: Bytes) -> Vec<GameEvent> {
        let limit = self.config.chat.max_message_bytes;
        if payload.len() > limit {
            warn!("Chat from {} dropped: {} bytes exceeds {}", session, payload.len(), limit);
            return Vec::new();
        }

        self.chat.push(payload);
        vec![GameEvent::Chat(self.chat.entries().cloned().collect())]
    }

    /// Snapshot of every active player in registry order.
    pub fn roster(&self) -> GameEvent {
        GameEvent::Roster(self.registry.list().map(PlayerSnapshot::from).collect())
    }
}
