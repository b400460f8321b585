//! Many sessions driving one shared game state at once.
//!
//! These assert correctness under contention, not speed.

use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use server::config::Config;
use server::events::GameEvent;
use server::{GameState, SessionId};
use std::net::SocketAddr;
use std::sync::Arc;

const PLAYERS: usize = 32;
const MOVES: usize = 200;

fn crowded_config() -> Config {
    let mut config = Config::default();
    // Small enough that players and food collide constantly.
    config.arena.width = 240.0;
    config.arena.height = 240.0;
    config.arena.max_size = 120.0;
    config.validate().expect("test arena is valid");
    config
}

fn addr(i: usize) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 10_000 + i as u16))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_moves_preserve_invariants() {
    let game = GameState::with_seed(&crowded_config(), 99).shared();

    let mut tasks = Vec::new();
    for i in 0..PLAYERS {
        let game = Arc::clone(&game);
        tasks.push(tokio::spawn(async move {
            let mut rng = StdRng::seed_from_u64(i as u64);
            let session = {
                let mut state = game.lock().await;
                let (session, _rx) = state.connect(addr(i));
                state.handle_join(session, &format!("player-{i}")).unwrap();
                session
            };

            let mut food_eaten = 0usize;
            for _ in 0..MOVES {
                let delta = Vec2::new(rng.random_range(-40.0..40.0), rng.random_range(-40.0..40.0));
                let events = {
                    let mut state = game.lock().await;
                    let score_before = state.registry.get(session).unwrap().score;
                    let events = state.handle_move(session, delta);

                    // The clamp uses the radius held before the move; a mover that
                    // was eaten instead sits at a fresh score-0 spawn point.
                    let was_eaten = events
                        .iter()
                        .any(|e| matches!(e, GameEvent::PlayerEaten(p) if p.victim_id == session));
                    let radius = state.arena.radius(if was_eaten { 0 } else { score_before });
                    let position = state.registry.get(session).unwrap().position;
                    assert!(
                        state.arena.contains(position, radius),
                        "{session} at {position:?} outside arena for radius {radius}"
                    );
                    events
                };

                // Roster always closes the sequence; food precedes player-eat.
                let kinds: Vec<&str> = events.iter().map(GameEvent::kind).collect();
                assert!(
                    matches!(
                        kinds.as_slice(),
                        ["roster"]
                            | ["food_eaten", "food", "roster"]
                            | ["player_eaten", "roster"]
                            | ["food_eaten", "food", "player_eaten", "roster"]
                    ),
                    "unexpected event order {kinds:?}"
                );
                for event in &events {
                    match event {
                        GameEvent::FoodEaten(_) => food_eaten += 1,
                        GameEvent::PlayerEaten(e) => {
                            assert_ne!(e.eater_id, e.victim_id);
                            assert!(e.eater_new_score >= e.victim_old_score);
                        }
                        GameEvent::Roster(players) => assert!(players.len() <= PLAYERS),
                        _ => {}
                    }
                }
                tokio::task::yield_now().await;
            }
            (session, food_eaten)
        }));
    }

    let mut total_food = 0;
    let mut sessions = Vec::new();
    for task in tasks {
        let (session, food) = task.await.unwrap();
        total_food += food;
        sessions.push(session);
    }

    let state = game.lock().await;
    assert_eq!(state.registry.len(), PLAYERS);

    // Food is the only source of score; eating a player transfers it.
    let total_score: u64 = state.registry.list().map(|p| p.score as u64).sum();
    assert_eq!(total_score, total_food as u64);
    assert_eq!(state.food.generation() - 1, total_food as u64);

    let mut unique: Vec<SessionId> = sessions.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), PLAYERS);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_disconnects_leave_consistent_roster() {
    let game = GameState::with_seed(&crowded_config(), 7).shared();

    let mut sessions = Vec::new();
    {
        let mut state = game.lock().await;
        for i in 0..PLAYERS {
            let (session, _rx) = state.connect(addr(i));
            state.handle_join(session, &format!("player-{i}")).unwrap();
            sessions.push(session);
        }
    }

    let mut tasks = Vec::new();
    for (i, session) in sessions.iter().copied().enumerate() {
        let game = Arc::clone(&game);
        tasks.push(tokio::spawn(async move {
            if i % 2 == 0 {
                game.lock().await.disconnect(session);
            } else {
                let events = game.lock().await.handle_move(session, Vec2::new(3.0, -3.0));
                assert!(matches!(events.last(), Some(GameEvent::Roster(_))));
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let mut state = game.lock().await;
    assert_eq!(state.registry.len(), PLAYERS / 2);
    assert_eq!(state.clients.len(), PLAYERS / 2);

    // A late move from a departed session has no effect.
    assert!(state.handle_move(sessions[0], Vec2::new(1.0, 1.0)).is_empty());

    match state.roster() {
        GameEvent::Roster(players) => {
            assert!(players.iter().all(|p| sessions.iter().position(|s| *s == p.id).unwrap() % 2 == 1));
        }
        other => panic!("expected roster, got {:?}", other),
    }
}
