//! Headless batch simulator
//!
//! Runs independent episodes in parallel with random agents and prints how
//! they ended. Every episode owns its scheduler and RNG, so the batch is
//! reproducible from the base seed regardless of thread scheduling.
//!
//! Usage: simulate [--episodes N] [--seed S] [--config path] [--log path]
//!   --log writes the first episode as a JSONL log readable by `replay`

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use snake_arena::config::Config;
use snake_arena::debug_logger::{DebugLogger, EpisodeSetup, TurnRecord};
use snake_arena::scheduler::{Phase, TurnScheduler};
use snake_arena::types::{BoardState, Direction, EliminationReason};
use std::collections::{BTreeMap, HashMap};
use std::env;
use std::process;

struct EpisodeSummary {
    seed: u64,
    turns: u32,
    winner: Option<String>,
    eliminations: Vec<EliminationReason>,
    records: Vec<TurnRecord>,
}

/// Uniform over the directions that do not reverse onto the neck
fn random_move(state: &BoardState, snake_id: &str, rng: &mut ChaCha8Rng) -> Direction {
    let facing_back = state
        .snake(snake_id)
        .and_then(|s| s.facing())
        .map(|dir| match dir {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        });
    let options: Vec<Direction> = Direction::all()
        .into_iter()
        .filter(|d| Some(*d) != facing_back)
        .collect();
    options[rng.random_range(0..options.len())]
}

fn run_episode(config: &Config, seed: u64, record: bool) -> Result<EpisodeSummary, String> {
    let mut scheduler = TurnScheduler::new(config.rules.clone(), &config.interop);
    let mut game = config.game.clone();
    game.seed = Some(seed);
    scheduler.reset(&game).map_err(|e| e.to_string())?;

    let mut agents = ChaCha8Rng::seed_from_u64(seed ^ 0x5EED);
    let mut eliminations = Vec::new();
    let mut records = Vec::new();
    if let (true, Some(state)) = (record, scheduler.state()) {
        records.push(TurnRecord::reset(
            EpisodeSetup {
                game: game.clone(),
                rules: config.rules.clone(),
            },
            state.clone(),
        ));
    }

    while scheduler.phase() == Phase::AwaitingMoves {
        let state = match scheduler.state() {
            Some(state) => state,
            None => break,
        };
        let moves: HashMap<String, Direction> = state
            .alive_ids()
            .into_iter()
            .map(|id| {
                let dir = random_move(state, &id, &mut agents);
                (id, dir)
            })
            .collect();

        let outcome = scheduler.advance(moves).map_err(|e| e.to_string())?;
        eliminations.extend(outcome.outcomes.values().filter_map(|o| o.reason()));
        if let (true, Some(state)) = (record, scheduler.state()) {
            records.push(TurnRecord::turn(outcome.moves, state.clone()));
        }
    }

    let final_state = scheduler.state().ok_or("episode has no state")?;
    let winner = match final_state.alive_ids().as_slice() {
        [only] => Some(only.clone()),
        _ => None,
    };

    Ok(EpisodeSummary {
        seed,
        turns: final_state.turn,
        winner,
        eliminations,
        records,
    })
}

fn parse_arg<T: std::str::FromStr>(args: &[String], i: usize, name: &str) -> T {
    match args.get(i + 1).and_then(|v| v.parse().ok()) {
        Some(v) => v,
        None => {
            eprintln!("Error: {} requires a valid value", name);
            process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = env::args().collect();
    let mut episodes: u64 = 8;
    let mut base_seed: u64 = 1;
    let mut config_path: Option<String> = None;
    let mut log_path: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--episodes" => episodes = parse_arg(&args, i, "--episodes"),
            "--seed" => base_seed = parse_arg(&args, i, "--seed"),
            "--config" => config_path = Some(parse_arg(&args, i, "--config")),
            "--log" => log_path = Some(parse_arg(&args, i, "--log")),
            "--help" => {
                eprintln!("Usage: {} [--episodes N] [--seed S] [--config path] [--log path]", args[0]);
                process::exit(0);
            }
            other => {
                eprintln!("Error: Unknown option '{}'", other);
                process::exit(1);
            }
        }
        i += 2;
    }

    let config = match &config_path {
        Some(path) => Config::from_file(path).unwrap_or_else(|e| {
            eprintln!("Error: Could not load config from '{}': {}", path, e);
            process::exit(1);
        }),
        None => Config::load_or_default(),
    };

    println!("\n═══════════════════════════════════════════════════════════");
    println!("                 SNAKE ARENA SIMULATION");
    println!("═══════════════════════════════════════════════════════════");
    println!("Episodes:   {}", episodes);
    println!("Base Seed:  {}", base_seed);
    println!(
        "Board:      {}x{}, {} snakes, ruleset {:?}",
        config.game.width, config.game.height, config.game.snake_count, config.rules.ruleset
    );
    println!("═══════════════════════════════════════════════════════════\n");

    let record_first = log_path.is_some();
    let summaries: Vec<Result<EpisodeSummary, String>> = (0..episodes)
        .into_par_iter()
        .map(|n| run_episode(&config, base_seed.wrapping_add(n), record_first && n == 0))
        .collect();

    let mut turns_total = 0u64;
    let mut wins: BTreeMap<String, usize> = BTreeMap::new();
    let mut draws = 0;
    let mut reasons: BTreeMap<String, usize> = BTreeMap::new();
    let mut first_records = Vec::new();

    for summary in summaries {
        let summary = match summary {
            Ok(summary) => summary,
            Err(e) => {
                eprintln!("Episode failed: {}", e);
                process::exit(1);
            }
        };
        println!(
            "seed {:>6}: {:>4} turns, winner {}",
            summary.seed,
            summary.turns,
            summary.winner.as_deref().unwrap_or("-")
        );
        turns_total += summary.turns as u64;
        match summary.winner {
            Some(winner) => *wins.entry(winner).or_default() += 1,
            None => draws += 1,
        }
        for reason in summary.eliminations {
            *reasons.entry(reason.to_string()).or_default() += 1;
        }
        if !summary.records.is_empty() {
            first_records = summary.records;
        }
    }

    println!("\nAverage Length:  {:.1} turns", turns_total as f64 / episodes.max(1) as f64);
    println!("Draws:           {}", draws);
    for (snake, count) in &wins {
        println!("Wins {:<10}  {}", snake, count);
    }
    for (reason, count) in &reasons {
        println!("Eliminated by {:<24} {}", reason, count);
    }

    if let Some(path) = log_path {
        let logger = DebugLogger::new(true, &path).await;
        for record in first_records {
            logger.log(record);
        }
        logger.close().await;
        println!("\nFirst episode written to {}", path);
    }
}
