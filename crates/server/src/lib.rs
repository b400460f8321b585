//! Bubble arena game server library.
//!
//! The engine is a set of plain modules (arena, registry, food, movement,
//! collision, chat) tied together by [`GameState`], which is shared behind a
//! single mutex so every inbound message is processed to completion before
//! the next one.

pub mod arena;
pub mod broadcast;
pub mod chat;
pub mod collision;
pub mod config;
pub mod events;
pub mod food;
pub mod identity;
pub mod movement;
pub mod registry;
pub mod server;

// Re-export commonly used types
pub use arena::Arena;
pub use config::Config;
pub use events::GameEvent;
pub use registry::{Player, SessionId};
pub use server::{ConnectionLimiter, Frame, GameState, SharedGame, drive_session, run};
