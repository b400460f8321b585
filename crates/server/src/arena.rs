//! Arena geometry and the score -> size function.

use crate::config::ArenaConfig;
use glam::Vec2;
use rand::Rng;

/// Immutable arena constants shared by every engine component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arena {
    pub width: f32,
    pub height: f32,
    pub min_size: f32,
    pub max_size: f32,
    pub growth_rate: f32,
    pub eat_radius: f32,
    pub proximity_multiplier: f32,
}

impl Arena {
    pub fn new(config: &ArenaConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            min_size: config.min_size,
            max_size: config.max_size,
            growth_rate: config.growth_rate,
            eat_radius: config.eat_radius,
            proximity_multiplier: config.proximity_multiplier,
        }
    }

    /// Visual size (diameter) for a score, capped at `max_size`.
    #[inline]
    pub fn size(&self, score: u32) -> f32 {
        (self.min_size + score as f32 * self.growth_rate).min(self.max_size)
    }

    /// Collision radius for a score.
    #[inline]
    pub fn radius(&self, score: u32) -> f32 {
        self.size(score) / 2.0
    }

    /// Clamp a position so a body of `radius` stays fully inside the arena.
    #[inline]
    pub fn clamp_position(&self, position: Vec2, radius: f32) -> Vec2 {
        Vec2::new(
            position.x.clamp(radius, self.width - radius),
            position.y.clamp(radius, self.height - radius),
        )
    }

    /// Uniform position for a freshly spawned (score 0) player.
    pub fn spawn_position<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec2 {
        let r = self.radius(0);
        Vec2::new(
            rng.random_range(r..=self.width - r),
            rng.random_range(r..=self.height - r),
        )
    }

    /// Uniform point over the whole rectangle, walls included.
    pub fn random_point<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec2 {
        Vec2::new(
            rng.random_range(0.0..=self.width),
            rng.random_range(0.0..=self.height),
        )
    }

    /// Whether a body of `radius` at `position` is fully inside the arena.
    pub fn contains(&self, position: Vec2, radius: f32) -> bool {
        position.x >= radius
            && position.x <= self.width - radius
            && position.y >= radius
            && position.y <= self.height - radius
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new(&ArenaConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_size_at_zero_is_min_size() {
        let arena = Arena::default();
        assert_eq!(arena.size(0), arena.min_size);
        assert_eq!(arena.radius(0), arena.min_size / 2.0);
    }

    #[test]
    fn test_size_saturates() {
        let arena = Arena::default();
        // (200 - 56) / 2 = 72 points to reach the cap.
        assert!(arena.size(71) < arena.max_size);
        assert_eq!(arena.size(72), arena.max_size);
        assert_eq!(arena.size(u32::MAX), arena.max_size);
    }

    #[test]
    fn test_clamp_against_walls() {
        let arena = Arena::default();
        let clamped = arena.clamp_position(Vec2::new(-50.0, 5000.0), 28.0);
        assert_eq!(clamped, Vec2::new(28.0, 600.0 - 28.0));
    }

    #[test]
    fn test_spawn_positions_are_inset() {
        let arena = Arena::default();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let p = arena.spawn_position(&mut rng);
            assert!(arena.contains(p, arena.radius(0)), "{p:?} outside bounds");
        }
    }

    #[test]
    fn test_random_point_covers_full_rectangle() {
        let arena = Arena::default();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..1000 {
            let p = arena.random_point(&mut rng);
            assert!((0.0..=arena.width).contains(&p.x));
            assert!((0.0..=arena.height).contains(&p.y));
        }
    }

    proptest! {
        #[test]
        fn size_is_monotonic_and_capped(a in 0u32..10_000, b in 0u32..10_000) {
            let arena = Arena::default();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(arena.size(lo) <= arena.size(hi));
            prop_assert!(arena.size(hi) <= arena.max_size);
            if arena.size(lo) < arena.max_size && lo < hi {
                prop_assert!(arena.size(lo) < arena.size(hi));
            }
        }

        #[test]
        fn clamp_always_lands_inside(
            x in -1e6f32..1e6,
            y in -1e6f32..1e6,
            score in 0u32..500,
        ) {
            let arena = Arena::default();
            let r = arena.radius(score);
            let p = arena.clamp_position(Vec2::new(x, y), r);
            prop_assert!(arena.contains(p, r));
        }
    }
}
