//! Client-submitted movement.

use crate::arena::Arena;
use crate::registry::{Registry, SessionId};
use glam::Vec2;

/// Apply a movement delta to the session's player and clamp it to the arena.
///
/// The delta is taken verbatim from the client; only the boundary clamp is
/// enforced. The clamp uses the radius for the score held before the move.
/// Returns the committed position, or `None` if the session has no player.
pub fn apply_move(registry: &mut Registry, arena: &Arena, session: SessionId, delta: Vec2) -> Option<Vec2> {
    let player = registry.get_mut(session)?;
    let radius = arena.radius(player.score);
    player.position = arena.clamp_position(player.position + delta, radius);
    Some(player.position)
}
