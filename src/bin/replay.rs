// Standalone replay tool for checking recorded arena episodes
//
// Usage:
//   cargo run --bin replay -- <log_file> [options]
//
// Options:
//   --all                  Replay all turns
//   --turns <turn1,turn2>  Report specific turns (comma-separated)
//   --verbose              Show detailed output for each turn
//
// Exits with status 2 when any recomputed state differs from the log.

use std::env;
use std::process;

use snake_arena::replay::ReplayEngine;

fn print_usage() {
    eprintln!("Snake Arena Replay Tool");
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("  replay <log_file> [OPTIONS]");
    eprintln!();
    eprintln!("OPTIONS:");
    eprintln!("  --all                   Replay all turns in the log");
    eprintln!("  --turns <T1,T2,...>     Report specific turns (comma-separated)");
    eprintln!("  --verbose               Show detailed output for each turn");
    eprintln!("  --help                  Show this help message");
    eprintln!();
    eprintln!("EXAMPLES:");
    eprintln!("  # Check a whole recorded episode");
    eprintln!("  replay arena_debug.jsonl --all");
    eprintln!();
    eprintln!("  # Check specific turns");
    eprintln!("  replay arena_debug.jsonl --turns 5,10,15");
}

fn parse_turns(s: &str) -> Result<Vec<u32>, String> {
    s.split(',')
        .map(|t| {
            t.trim()
                .parse::<u32>()
                .map_err(|e| format!("Invalid turn number '{}': {}", t, e))
        })
        .collect()
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args.contains(&"--help".to_string()) {
        print_usage();
        process::exit(if args.contains(&"--help".to_string()) { 0 } else { 1 });
    }

    let log_file = &args[1];
    let mut verbose = false;
    let mut turns: Option<Vec<u32>> = None;
    let mut all = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--all" => all = true,
            "--turns" => {
                let value = match args.get(i + 1) {
                    Some(value) => value,
                    None => {
                        eprintln!("Error: --turns requires an argument");
                        process::exit(1);
                    }
                };
                turns = match parse_turns(value) {
                    Ok(t) => Some(t),
                    Err(e) => {
                        eprintln!("Error parsing turns: {}", e);
                        process::exit(1);
                    }
                };
                i += 1;
            }
            "--verbose" => verbose = true,
            _ => {
                eprintln!("Error: Unknown option '{}'", args[i]);
                print_usage();
                process::exit(1);
            }
        }
        i += 1;
    }

    if !all && turns.is_none() {
        eprintln!("Error: Must specify --all or --turns");
        print_usage();
        process::exit(1);
    }

    println!("Replay log file: {}", log_file);

    let engine = ReplayEngine::new(verbose);
    let records = match engine.load_log_file(log_file) {
        Ok(records) => records,
        Err(e) => {
            eprintln!("Error loading log file: {}", e);
            process::exit(1);
        }
    };

    if records.is_empty() {
        eprintln!("Error: Log file is empty");
        process::exit(1);
    }

    println!("Loaded {} log records\n", records.len());

    let results = match &turns {
        Some(turns) => engine.replay_turns(&records, turns),
        None => engine.replay_all(&records),
    };
    let results = match results {
        Ok(results) => results,
        Err(e) => {
            eprintln!("Error during replay: {}", e);
            process::exit(1);
        }
    };

    engine.print_report(&records, &results);

    if results.iter().any(|r| !r.matches) {
        process::exit(2);
    }
}
