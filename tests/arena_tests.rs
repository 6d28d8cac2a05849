// Integration tests for the arena host
//
// Drives episodes through the same calls the HTTP surface uses: reset,
// observation, submitted moves and step. Recorded episodes are replayed to
// check that the log reproduces every turn.

use snake_arena::arena::Arena;
use snake_arena::config::{Config, GameConfig, InteropConfig};
use snake_arena::debug_logger::DebugLogger;
use snake_arena::error::EngineError;
use snake_arena::replay::ReplayEngine;
use snake_arena::scheduler::Phase;
use snake_arena::types::Direction;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

fn config(move_timeout_ms: u64) -> Config {
    Config {
        game: GameConfig {
            width: 7,
            height: 7,
            snake_count: 2,
            seed: Some(5),
            ..GameConfig::default()
        },
        interop: InteropConfig { move_timeout_ms },
        ..Config::default_hardcoded()
    }
}

fn temp_log(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("snake_arena_{}_{}.jsonl", name, std::process::id()))
}

#[tokio::test]
async fn test_submitted_moves_resolve_the_turn() {
    let arena = Arena::new(config(50), DebugLogger::disabled());
    assert_eq!(arena.phase(), Phase::Idle);
    assert!(matches!(
        arena.submit_move("agent_0", Direction::Up),
        Err(EngineError::InvalidEpisodeState { .. })
    ));

    let observations = arena.reset(None).await.unwrap();
    assert_eq!(observations.len(), 2);
    assert_eq!(arena.phase(), Phase::AwaitingMoves);
    assert_eq!(arena.observation("agent_1").unwrap().you, "agent_1");

    let ack = arena.submit_move("agent_0", Direction::Up).unwrap();
    assert_eq!(ack.turn, 0);
    assert_eq!(
        arena.submit_move("agent_0", Direction::Down),
        Err(EngineError::DuplicateMove {
            snake_id: "agent_0".to_string(),
            turn: 0,
        })
    );
    arena.submit_move("agent_1", Direction::Up).unwrap();

    let step = arena.step().await.unwrap();
    assert_eq!(step.turn, 1);
    assert!(step.fallbacks.is_empty());
    assert_eq!(step.observations.len(), 2);
    assert_eq!(arena.observation("agent_0").unwrap().turn, 1);
    assert_eq!(arena.stats().moves_received, 2);
}

#[tokio::test]
async fn test_rejected_reset_keeps_running_episode() {
    let arena = Arena::new(config(50), DebugLogger::disabled());
    arena.reset(None).await.unwrap();
    arena.submit_move("agent_0", Direction::Up).unwrap();

    let err = arena
        .reset(Some(GameConfig {
            width: 0,
            ..config(50).game
        }))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidConfig(_)));
    assert!(!err.is_fatal());
    assert_eq!(arena.phase(), Phase::AwaitingMoves);
    assert_eq!(
        arena.submit_move("agent_0", Direction::Up),
        Err(EngineError::DuplicateMove {
            snake_id: "agent_0".to_string(),
            turn: 0,
        }),
        "The open turn still holds its submitted move"
    );
}

#[tokio::test]
async fn test_silent_agent_times_out() {
    let arena = Arena::new(config(50), DebugLogger::disabled());
    arena.reset(None).await.unwrap();
    arena.submit_move("agent_0", Direction::Up).unwrap();

    let step = arena.step().await.unwrap();
    assert!(step.fallbacks["agent_1"].contains("timed out"));
    assert!(!step.fallbacks.contains_key("agent_0"));

    let stats = arena.stats();
    assert_eq!(stats.timeouts, 1);
    assert_eq!(stats.fallbacks, 1);

    // The next turn starts with an empty mailbox
    let ack = arena.submit_move("agent_1", Direction::Up).unwrap();
    assert_eq!(ack.turn, 1);
}

#[tokio::test]
async fn test_step_waits_for_moves_submitted_while_pending() {
    let arena = Arc::new(Arena::new(config(2_000), DebugLogger::disabled()));
    arena.reset(None).await.unwrap();

    let stepper = arena.clone();
    let pending = tokio::spawn(async move { stepper.step().await });

    tokio::time::sleep(Duration::from_millis(20)).await;
    // Observations are served while the step is waiting
    assert_eq!(arena.observation("agent_0").unwrap().turn, 0);
    arena.submit_move("agent_0", Direction::Up).unwrap();
    arena.submit_move("agent_1", Direction::Up).unwrap();

    let step = pending.await.unwrap().unwrap();
    assert_eq!(step.turn, 1);
    assert!(step.fallbacks.is_empty(), "Both moves arrived before the timeout");
}

#[tokio::test]
async fn test_recorded_episode_replays_exactly() {
    let path = temp_log("replay");
    let logger = DebugLogger::new(true, path.to_str().unwrap()).await;
    let arena = Arena::new(config(20), logger);

    arena
        .reset(Some(GameConfig {
            seed: None,
            max_turns: 40,
            ..config(20).game
        }))
        .await
        .unwrap();
    let mut turns = 0;
    while arena.phase() == Phase::AwaitingMoves {
        // Agents stay silent: every snake keeps its heading until it hits something
        arena.step().await.unwrap();
        turns += 1;
    }
    arena.close().await;

    let engine = ReplayEngine::new(false);
    let records = engine.load_log_file(&path).unwrap();
    assert_eq!(records.len(), turns + 1, "One reset record plus one per turn");
    assert!(records[0].setup.as_ref().unwrap().game.seed.is_some(), "Drawn seed is recorded");

    let results = engine.replay_all(&records).unwrap();
    assert!(
        results.iter().all(|r| r.matches),
        "Mismatch: {:?}",
        results.iter().find(|r| !r.matches)
    );
    let stats = engine.generate_stats(&records, &results);
    assert_eq!(stats.episodes, 1);
    assert_eq!(stats.mismatches, 0);

    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_tampered_log_is_reported() {
    let path = temp_log("tampered");
    let logger = DebugLogger::new(true, path.to_str().unwrap()).await;
    let arena = Arena::new(config(20), logger);
    arena.reset(None).await.unwrap();
    arena.step().await.unwrap();
    arena.step().await.unwrap();
    arena.close().await;

    let engine = ReplayEngine::new(false);
    let mut records = engine.load_log_file(&path).unwrap();
    if let Some(snake) = records[1].state.board.snakes.first_mut() {
        snake.health += 7;
    }

    let results = engine.replay_all(&records).unwrap();
    assert!(results[0].matches);
    assert!(!results[1].matches);
    assert!(results[1].detail.is_some());
    assert_eq!(results.len(), 3, "Replay carries on past a mismatch");

    let _ = std::fs::remove_file(&path);
}
