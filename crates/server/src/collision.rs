//! Collision detection and resolution.
//!
//! Runs once per accepted movement against the mover's post-move position:
//! - Food collision (fixed eat radius, independent of player size)
//! - Player-vs-player eating (bodies must overlap by the proximity multiplier)

use crate::arena::Arena;
use crate::events::{FoodEaten, PlayerEaten};
use crate::food::FoodSpawner;
use crate::registry::{Registry, SessionId};
use glam::Vec2;
use rand::Rng;

/// Distance data between two bodies.
#[derive(Debug, Clone, Copy)]
pub struct ProximityCheck {
    /// Threshold the distance is compared against.
    pub threshold: f32,
    /// Actual distance.
    pub d: f32,
}

impl ProximityCheck {
    /// Inclusive: a body exactly on the threshold collides.
    #[inline]
    pub fn is_colliding(&self) -> bool {
        self.d <= self.threshold
    }
}

/// Check two positions against a distance threshold.
#[inline]
pub fn check_proximity(a: Vec2, b: Vec2, threshold: f32) -> ProximityCheck {
    ProximityCheck {
        threshold,
        d: a.distance(b),
    }
}

/// Whether a player at `position` reaches the food.
#[inline]
pub fn food_collision(arena: &Arena, position: Vec2, food: Vec2) -> bool {
    check_proximity(position, food, arena.eat_radius).is_colliding()
}

/// A qualifying eat between the mover and another player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EatPair {
    pub eater: SessionId,
    pub victim: SessionId,
}

/// Scan the other players in registry order and return the first pair that
/// qualifies for an eat. Equal scores never qualify.
pub fn find_player_eat(registry: &Registry, arena: &Arena, mover: SessionId) -> Option<EatPair> {
    let me = registry.get(mover)?;
    let my_radius = arena.radius(me.score);

    registry
        .list()
        .filter(|other| other.id != mover && other.score != me.score)
        .find(|other| {
            let threshold = (my_radius + arena.radius(other.score)) * arena.proximity_multiplier;
            check_proximity(me.position, other.position, threshold).is_colliding()
        })
        .map(|other| {
            if me.score > other.score {
                EatPair { eater: mover, victim: other.id }
            } else {
                EatPair { eater: other.id, victim: mover }
            }
        })
}

/// Apply an eat: the eater gains the victim's current score, the victim is
/// reset to score 0 at a fresh spawn position.
pub fn resolve_player_eat<R: Rng + ?Sized>(
    registry: &mut Registry,
    arena: &Arena,
    pair: EatPair,
    rng: &mut R,
) -> Option<PlayerEaten> {
    let victim = registry.get_mut(pair.victim)?;
    let victim_old_score = victim.score;
    let victim_name = victim.name.clone();
    victim.score = 0;
    victim.position = arena.spawn_position(rng);

    let eater = registry.get_mut(pair.eater)?;
    eater.score = eater.score.saturating_add(victim_old_score);

    Some(PlayerEaten {
        eater_id: eater.id,
        eater_name: eater.name.clone(),
        eater_new_score: eater.score,
        victim_id: pair.victim,
        victim_name,
        victim_old_score,
    })
}

/// Outcome of the collision pass for one movement.
#[derive(Debug, Default, PartialEq)]
pub struct Collisions {
    pub food_eaten: Option<FoodEaten>,
    pub player_eaten: Option<PlayerEaten>,
}

/// Resolve food first, then at most one player-vs-player eat.
pub fn resolve_collisions<R: Rng + ?Sized>(
    registry: &mut Registry,
    food: &mut FoodSpawner,
    arena: &Arena,
    mover: SessionId,
    rng: &mut R,
) -> Collisions {
    let mut collisions = Collisions::default();

    if let Some(player) = registry.get_mut(mover) {
        if food_collision(arena, player.position, food.current()) {
            player.score = player.score.saturating_add(1);
            let new_food = food.respawn(arena, rng);
            collisions.food_eaten = Some(FoodEaten {
                player_id: mover,
                player_name: player.name.clone(),
                new_score: player.score,
                new_food,
            });
        }
    }

    if let Some(pair) = find_player_eat(registry, arena, mover) {
        collisions.player_eaten = resolve_player_eat(registry, arena, pair, rng);
    }

    collisions
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn add(registry: &mut Registry, id: u32, name: &str, x: f32, y: f32, score: u32) {
        registry.join(SessionId(id), name, Vec2::new(x, y));
        registry.get_mut(SessionId(id)).unwrap().score = score;
    }

    fn setup() -> (Registry, FoodSpawner, Arena, StdRng) {
        let arena = Arena::default();
        let mut rng = StdRng::seed_from_u64(42);
        let mut food = FoodSpawner::new(&arena, &mut rng);
        // Park the food in a corner no test player touches.
        food.place(Vec2::new(0.0, 0.0));
        (Registry::new(), food, arena, rng)
    }

    #[test]
    fn test_proximity_is_inclusive() {
        let check = check_proximity(Vec2::ZERO, Vec2::new(20.0, 0.0), 20.0);
        assert!(check.is_colliding());
        assert_eq!(check.d, 20.0);
        assert!(!check_proximity(Vec2::ZERO, Vec2::new(20.5, 0.0), 20.0).is_colliding());
    }

    #[test]
    fn test_food_eaten_within_radius() {
        let (mut registry, mut food, arena, mut rng) = setup();
        add(&mut registry, 1, "alice", 300.0, 300.0, 0);
        food.place(Vec2::new(312.0, 316.0)); // distance 20

        let collisions = resolve_collisions(&mut registry, &mut food, &arena, SessionId(1), &mut rng);
        let eaten = collisions.food_eaten.expect("food should be eaten");
        assert_eq!(eaten.new_score, 1);
        assert_eq!(registry.get(SessionId(1)).unwrap().score, 1);
        assert_eq!(eaten.new_food, food.current());
        assert_ne!(food.current(), Vec2::new(312.0, 316.0));
        assert!(collisions.player_eaten.is_none());
    }

    #[test]
    fn test_food_radius_ignores_player_size() {
        let (mut registry, mut food, arena, mut rng) = setup();
        // Radius 100 at the cap, but food needs distance <= 20.
        add(&mut registry, 1, "big", 300.0, 300.0, 500);
        food.place(Vec2::new(330.0, 300.0));

        let collisions = resolve_collisions(&mut registry, &mut food, &arena, SessionId(1), &mut rng);
        assert!(collisions.food_eaten.is_none());
        assert_eq!(food.current(), Vec2::new(330.0, 300.0));
    }

    #[test]
    fn test_higher_score_eats_lower() {
        let (mut registry, mut food, arena, mut rng) = setup();
        add(&mut registry, 1, "big", 300.0, 300.0, 5);
        add(&mut registry, 2, "small", 320.0, 300.0, 3);

        let collisions = resolve_collisions(&mut registry, &mut food, &arena, SessionId(1), &mut rng);
        let eaten = collisions.player_eaten.expect("player should be eaten");
        assert_eq!(eaten.eater_id, SessionId(1));
        assert_eq!(eaten.eater_new_score, 8);
        assert_eq!(eaten.victim_id, SessionId(2));
        assert_eq!(eaten.victim_old_score, 3);

        let victim = registry.get(SessionId(2)).unwrap();
        assert_eq!(victim.score, 0);
        assert!(arena.contains(victim.position, arena.radius(0)));
        assert_eq!(registry.get(SessionId(1)).unwrap().score, 8);
    }

    #[test]
    fn test_mover_can_be_the_victim() {
        let (mut registry, mut food, arena, mut rng) = setup();
        add(&mut registry, 1, "big", 300.0, 300.0, 10);
        add(&mut registry, 2, "small", 310.0, 300.0, 2);

        let collisions = resolve_collisions(&mut registry, &mut food, &arena, SessionId(2), &mut rng);
        let eaten = collisions.player_eaten.unwrap();
        assert_eq!(eaten.eater_id, SessionId(1));
        assert_eq!(eaten.victim_id, SessionId(2));
        assert_eq!(registry.get(SessionId(1)).unwrap().score, 12);
        assert_eq!(registry.get(SessionId(2)).unwrap().score, 0);
    }

    #[test]
    fn test_equal_scores_never_eat() {
        let (mut registry, mut food, arena, mut rng) = setup();
        add(&mut registry, 1, "a", 300.0, 300.0, 4);
        add(&mut registry, 2, "b", 300.0, 300.0, 4);

        let collisions = resolve_collisions(&mut registry, &mut food, &arena, SessionId(1), &mut rng);
        assert!(collisions.player_eaten.is_none());
        assert_eq!(registry.get(SessionId(1)).unwrap().score, 4);
        assert_eq!(registry.get(SessionId(2)).unwrap().score, 4);
    }

    #[test]
    fn test_touching_edges_is_not_enough() {
        let (mut registry, mut food, arena, mut rng) = setup();
        // radius(5) = 33, radius(3) = 31: edges touch at 64, threshold is 51.2.
        add(&mut registry, 1, "big", 300.0, 300.0, 5);
        add(&mut registry, 2, "small", 364.0, 300.0, 3);
        assert!(resolve_collisions(&mut registry, &mut food, &arena, SessionId(1), &mut rng)
            .player_eaten
            .is_none());

        registry.get_mut(SessionId(2)).unwrap().position = Vec2::new(351.0, 300.0);
        assert!(resolve_collisions(&mut registry, &mut food, &arena, SessionId(1), &mut rng)
            .player_eaten
            .is_some());
    }

    #[test]
    fn test_first_match_in_registry_order_wins() {
        let (mut registry, mut food, arena, mut rng) = setup();
        add(&mut registry, 1, "first", 310.0, 300.0, 1);
        add(&mut registry, 2, "mover", 300.0, 300.0, 20);
        add(&mut registry, 3, "juicier", 290.0, 300.0, 15);

        let eaten = resolve_collisions(&mut registry, &mut food, &arena, SessionId(2), &mut rng)
            .player_eaten
            .unwrap();
        assert_eq!(eaten.victim_id, SessionId(1));
        assert_eq!(eaten.eater_new_score, 21);
        // Only one eat per movement.
        assert_eq!(registry.get(SessionId(3)).unwrap().score, 15);
    }

    #[test]
    fn test_food_score_counts_before_player_scan() {
        let (mut registry, mut food, arena, mut rng) = setup();
        add(&mut registry, 1, "a", 300.0, 300.0, 4);
        add(&mut registry, 2, "b", 310.0, 300.0, 5);
        food.place(Vec2::new(300.0, 300.0));

        // Mover goes 4 -> 5 on the food, now ties with b: no eat.
        let collisions = resolve_collisions(&mut registry, &mut food, &arena, SessionId(1), &mut rng);
        assert_eq!(collisions.food_eaten.unwrap().new_score, 5);
        assert!(collisions.player_eaten.is_none());
    }
}
