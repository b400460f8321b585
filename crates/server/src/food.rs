//! The singleton food pellet.

use crate::arena::Arena;
use glam::Vec2;
use rand::Rng;

/// Holds the one food item currently in the arena.
///
/// Consuming the food replaces it with a new item at a fresh position; the
/// old position is never updated in place.
#[derive(Debug, Clone)]
pub struct FoodSpawner {
    current: Vec2,
    /// Number of items spawned so far, including the current one.
    generation: u64,
}

impl FoodSpawner {
    /// Create the first food item at a random point.
    pub fn new<R: Rng + ?Sized>(arena: &Arena, rng: &mut R) -> Self {
        Self {
            current: arena.random_point(rng),
            generation: 1,
        }
    }

    /// Position of the current food item.
    #[inline]
    pub fn current(&self) -> Vec2 {
        self.current
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Replace the food with a new item anywhere in the arena, walls included.
    pub fn respawn<R: Rng + ?Sized>(&mut self, arena: &Arena, rng: &mut R) -> Vec2 {
        self.current = arena.random_point(rng);
        self.generation += 1;
        self.current
    }

    #[cfg(test)]
    pub(crate) fn place(&mut self, position: Vec2) {
        self.current = position;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_respawn_replaces_item() {
        let arena = Arena::default();
        let mut rng = StdRng::seed_from_u64(3);
        let mut food = FoodSpawner::new(&arena, &mut rng);
        assert_eq!(food.generation(), 1);

        let before = food.current();
        let after = food.respawn(&arena, &mut rng);
        assert_eq!(food.current(), after);
        assert_ne!(before, after);
        assert_eq!(food.generation(), 2);
        assert!((0.0..=arena.width).contains(&after.x));
        assert!((0.0..=arena.height).contains(&after.y));
    }
}
