//! Domain events emitted by the engine.
//!
//! Each event maps to exactly one server packet.

use crate::registry::{Player, SessionId};
use bytes::Bytes;
use glam::Vec2;
use protocol::packets::{self, RosterEntry};

/// A player as broadcast in a roster update.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSnapshot {
    pub id: SessionId,
    pub name: String,
    pub position: Vec2,
    pub score: u32,
}

impl From<&Player> for PlayerSnapshot {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id,
            name: player.name.clone(),
            position: player.position,
            score: player.score,
        }
    }
}

/// A player reached the food.
#[derive(Debug, Clone, PartialEq)]
pub struct FoodEaten {
    pub player_id: SessionId,
    pub player_name: String,
    pub new_score: u32,
    pub new_food: Vec2,
}

/// One player consumed another.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerEaten {
    pub eater_id: SessionId,
    pub eater_name: String,
    pub eater_new_score: u32,
    pub victim_id: SessionId,
    pub victim_name: String,
    pub victim_old_score: u32,
}

/// Events fanned out to every connected session.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    Roster(Vec<PlayerSnapshot>),
    Food(Vec2),
    FoodEaten(FoodEaten),
    PlayerEaten(PlayerEaten),
    Chat(Vec<Bytes>),
}

impl GameEvent {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            GameEvent::Roster(_) => "roster",
            GameEvent::Food(_) => "food",
            GameEvent::FoodEaten(_) => "food_eaten",
            GameEvent::PlayerEaten(_) => "player_eaten",
            GameEvent::Chat(_) => "chat",
        }
    }

    /// Encode the event into its wire packet.
    pub fn encode(&self) -> Bytes {
        let packet = match self {
            GameEvent::Roster(players) => {
                let entries: Vec<RosterEntry> = players
                    .iter()
                    .map(|p| RosterEntry {
                        id: p.id.0,
                        name: p.name.clone(),
                        x: p.position.x,
                        y: p.position.y,
                        score: p.score,
                    })
                    .collect();
                packets::build_roster(&entries)
            }
            GameEvent::Food(position) => packets::build_food_update(*position),
            GameEvent::FoodEaten(e) => {
                packets::build_food_eaten(e.player_id.0, &e.player_name, e.new_score, e.new_food)
            }
            GameEvent::PlayerEaten(e) => packets::build_player_eaten(
                e.eater_id.0,
                &e.eater_name,
                e.eater_new_score,
                e.victim_id.0,
                &e.victim_name,
                e.victim_old_score,
            ),
            GameEvent::Chat(entries) => packets::build_chat_log(entries.iter().map(|e| e.as_ref())),
        };
        packet.finish()
    }
}
