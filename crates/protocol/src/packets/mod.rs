//! Packet definitions for the arena protocol.
//!
//! This module contains both client->server and server->client packet types.

mod client;
mod server;

pub use client::*;
pub use server::*;

/// Opcodes for client -> server packets.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientOpcode {
    /// Join the game under a display name.
    Join = 0x00,
    /// Relative movement.
    Move = 0x10,
    /// Chat message (opaque payload).
    Chat = 0x63,
}

/// Opcodes for server -> client packets.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerOpcode {
    /// Full roster of active players.
    Roster = 0x10,
    /// Current food position.
    FoodUpdate = 0x11,
    /// A player ate the food.
    FoodEaten = 0x12,
    /// A player ate another player.
    PlayerEaten = 0x13,
    /// Join request was rejected (sent only to the requester).
    JoinRejected = 0x20,
    /// Full retained chat log.
    ChatLog = 0x63,
}
