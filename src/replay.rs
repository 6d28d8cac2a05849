// Replay module for checking recorded episodes against the rules engine
//
// This module provides functionality to:
// 1. Parse JSONL episode logs written by the debug logger
// 2. Re-resolve every recorded turn from its predecessor
// 3. Compare the recomputed state with the recorded one
// 4. Generate summary reports

use log::{info, warn};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Instant;
use thiserror::Error;

use crate::debug_logger::TurnRecord;
use crate::error::EngineError;
use crate::rules::{build_ruleset, Ruleset, SnakeOutcome};
use crate::types::BoardState;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("failed to read log file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse JSON on line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("turn {0} appears before any episode reset record")]
    MissingSetup(u32),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Result of replaying a single record
#[derive(Debug, Clone)]
pub struct ReplayResult {
    pub turn: u32,
    pub matches: bool,
    pub outcomes: BTreeMap<String, SnakeOutcome>,
    /// First difference found, when the states disagree
    pub detail: Option<String>,
    pub computation_time_us: u128,
}

/// Statistics for a complete replay session
#[derive(Debug, Default)]
pub struct ReplayStats {
    pub episodes: usize,
    pub total_turns: usize,
    pub matches: usize,
    pub mismatches: usize,
    pub match_rate: f64,
}

/// Replay engine for recorded episodes
pub struct ReplayEngine {
    verbose: bool,
}

impl ReplayEngine {
    pub fn new(verbose: bool) -> Self {
        ReplayEngine { verbose }
    }

    /// Loads all records from a JSONL file
    pub fn load_log_file<P: AsRef<Path>>(&self, log_path: P) -> Result<Vec<TurnRecord>, ReplayError> {
        let file = File::open(log_path.as_ref())?;
        let reader = BufReader::new(file);
        let mut records = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: TurnRecord = serde_json::from_str(&line).map_err(|source| ReplayError::Parse {
                line: line_num + 1,
                source,
            })?;
            records.push(record);
        }

        info!("Loaded {} log records", records.len());
        Ok(records)
    }

    /// Replays every record. Reset records regenerate the initial state from
    /// their setup; turn records are resolved from the preceding recorded state.
    pub fn replay_all(&self, records: &[TurnRecord]) -> Result<Vec<ReplayResult>, ReplayError> {
        let mut results = Vec::with_capacity(records.len());
        let mut ruleset: Option<Box<dyn Ruleset>> = None;
        let mut previous: Option<&BoardState> = None;

        for record in records {
            let start = Instant::now();
            let (replayed, outcomes) = match &record.setup {
                Some(setup) => {
                    let rules = build_ruleset(&setup.rules, &setup.game);
                    let initial = rules.create_initial_state(&setup.game)?;
                    ruleset = Some(rules);
                    (initial, BTreeMap::new())
                }
                None => {
                    let (rules, prev) = match (&ruleset, previous) {
                        (Some(rules), Some(prev)) => (rules, prev),
                        _ => return Err(ReplayError::MissingSetup(record.turn)),
                    };
                    let moves: HashMap<_, _> = record.moves.clone().into_iter().collect();
                    let resolution = rules.resolve(prev, &moves)?;
                    (resolution.state, resolution.outcomes)
                }
            };

            let detail = describe_mismatch(&record.state, &replayed);
            let result = ReplayResult {
                turn: record.turn,
                matches: detail.is_none(),
                outcomes,
                detail,
                computation_time_us: start.elapsed().as_micros(),
            };

            if self.verbose {
                match &result.detail {
                    None => info!("Turn {}: ✓ MATCH", result.turn),
                    Some(detail) => warn!("Turn {}: ✗ MISMATCH - {}", result.turn, detail),
                }
            }

            results.push(result);
            // Continue from the recorded state so one divergence does not cascade
            previous = Some(&record.state);
        }

        Ok(results)
    }

    /// Replays the whole log but keeps only the requested turns
    pub fn replay_turns(
        &self,
        records: &[TurnRecord],
        turn_numbers: &[u32],
    ) -> Result<Vec<ReplayResult>, ReplayError> {
        let results = self.replay_all(records)?;
        Ok(results
            .into_iter()
            .filter(|r| turn_numbers.contains(&r.turn))
            .collect())
    }

    /// Generates statistics from replay results
    pub fn generate_stats(&self, records: &[TurnRecord], results: &[ReplayResult]) -> ReplayStats {
        let total_turns = results.len();
        let matches = results.iter().filter(|r| r.matches).count();
        let match_rate = if total_turns > 0 {
            (matches as f64 / total_turns as f64) * 100.0
        } else {
            0.0
        };

        ReplayStats {
            episodes: records.iter().filter(|r| r.setup.is_some()).count(),
            total_turns,
            matches,
            mismatches: total_turns - matches,
            match_rate,
        }
    }

    /// Prints a detailed report of replay results
    pub fn print_report(&self, records: &[TurnRecord], results: &[ReplayResult]) {
        let stats = self.generate_stats(records, results);

        println!("\n═══════════════════════════════════════════════════════════");
        println!("                    REPLAY REPORT");
        println!("═══════════════════════════════════════════════════════════");
        println!("Episodes:       {}", stats.episodes);
        println!("Total Turns:    {}", stats.total_turns);
        println!("Matches:        {} ({:.1}%)", stats.matches, stats.match_rate);
        println!("Mismatches:     {}", stats.mismatches);
        println!("═══════════════════════════════════════════════════════════\n");

        if !results.is_empty() {
            let avg_time: f64 = results.iter().map(|r| r.computation_time_us as f64).sum::<f64>()
                / results.len() as f64;
            println!("Average Resolution Time:    {:.1}µs\n", avg_time);
        }

        let eliminations: Vec<_> = results
            .iter()
            .flat_map(|r| {
                r.outcomes
                    .iter()
                    .filter_map(move |(id, outcome)| outcome.reason().map(|reason| (r.turn, id, reason)))
            })
            .collect();
        if !eliminations.is_empty() {
            println!("Eliminations:");
            for (turn, id, reason) in eliminations {
                println!("  Turn {}: {} ({})", turn, id, reason);
            }
            println!();
        }

        let mismatches: Vec<_> = results.iter().filter(|r| !r.matches).collect();
        if !mismatches.is_empty() {
            println!("═══════════════════════════════════════════════════════════");
            println!("                  DETAILED MISMATCHES");
            println!("═══════════════════════════════════════════════════════════");
            for result in mismatches {
                println!(
                    "Turn {}: {}",
                    result.turn,
                    result.detail.as_deref().unwrap_or("states differ")
                );
            }
            println!();
        }
    }
}

/// First field in which two states differ, or `None` when they are equal
pub fn describe_mismatch(recorded: &BoardState, replayed: &BoardState) -> Option<String> {
    if recorded == replayed {
        return None;
    }
    if recorded.turn != replayed.turn {
        return Some(format!("turn {} vs {}", recorded.turn, replayed.turn));
    }
    if recorded.terminal != replayed.terminal {
        return Some(format!("terminal {} vs {}", recorded.terminal, replayed.terminal));
    }
    if recorded.board.food != replayed.board.food {
        return Some(format!(
            "food {:?} vs {:?}",
            recorded.board.food, replayed.board.food
        ));
    }
    for (a, b) in recorded.board.snakes.iter().zip(&replayed.board.snakes) {
        if a != b {
            return Some(format!("snake {} differs: {:?} vs {:?}", a.id, a, b));
        }
    }
    if recorded.board.snakes.len() != replayed.board.snakes.len() {
        return Some("snake count differs".to_string());
    }
    if recorded.rng != replayed.rng {
        return Some(format!(
            "rng {:?} vs {:?}",
            recorded.rng.state(),
            replayed.rng.state()
        ));
    }
    Some("board dimensions differ".to_string())
}
