// Debug logging module for recording episodes as JSONL
//
// Callers hand records to a channel and return immediately; a single writer
// task appends them to the file in submission order, which the replay tool
// relies on. One line per reset and per resolved turn.

use log::{error, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;

use crate::config::{GameConfig, RulesConfig};
use crate::types::{BoardState, Direction};

/// Settings needed to rebuild the ruleset when replaying an episode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeSetup {
    pub game: GameConfig,
    pub rules: RulesConfig,
}

/// Represents a single log line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnRecord {
    pub turn: u32,
    /// Present on the record written at reset
    #[serde(default)]
    pub setup: Option<EpisodeSetup>,
    /// Moves applied to the previous state, empty at reset
    pub moves: BTreeMap<String, Direction>,
    pub state: BoardState,
    pub timestamp: String,
}

impl TurnRecord {
    pub fn reset(setup: EpisodeSetup, state: BoardState) -> Self {
        TurnRecord {
            turn: state.turn,
            setup: Some(setup),
            moves: BTreeMap::new(),
            state,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn turn(moves: BTreeMap<String, Direction>, state: BoardState) -> Self {
        TurnRecord {
            turn: state.turn,
            setup: None,
            moves,
            state,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Ordered, non-blocking JSONL episode log
pub struct DebugLogger {
    sender: Option<UnboundedSender<TurnRecord>>,
    writer: Option<JoinHandle<()>>,
}

impl DebugLogger {
    /// Creates a new debug logger
    /// If enabled is true, initializes the log file (truncating if it exists)
    pub async fn new(enabled: bool, log_file_path: &str) -> Self {
        if !enabled {
            return Self::disabled();
        }

        let mut file = match OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(log_file_path)
            .await
        {
            Ok(file) => file,
            Err(e) => {
                error!("Failed to create debug log file '{}': {}", log_file_path, e);
                return Self::disabled();
            }
        };
        info!("Debug logging enabled: {}", log_file_path);

        let (sender, mut receiver) = mpsc::unbounded_channel::<TurnRecord>();
        let writer = tokio::spawn(async move {
            while let Some(record) = receiver.recv().await {
                let line = match serde_json::to_string(&record) {
                    Ok(json) => format!("{}\n", json),
                    Err(e) => {
                        error!("Failed to serialize debug log entry: {}", e);
                        continue;
                    }
                };
                if let Err(e) = file.write_all(line.as_bytes()).await {
                    error!("Failed to write debug log entry: {}", e);
                } else if let Err(e) = file.flush().await {
                    error!("Failed to flush debug log: {}", e);
                }
            }
        });

        DebugLogger {
            sender: Some(sender),
            writer: Some(writer),
        }
    }

    /// Creates a disabled debug logger (no-op)
    pub fn disabled() -> Self {
        DebugLogger {
            sender: None,
            writer: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.sender.is_some()
    }

    /// Queues a record; safe to call from any thread
    pub fn log(&self, record: TurnRecord) {
        if let Some(sender) = &self.sender {
            if sender.send(record).is_err() {
                error!("Debug log writer has stopped");
            }
        }
    }

    /// Flushes queued records and stops the writer
    pub async fn close(mut self) {
        self.sender.take();
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.await {
                error!("Debug log writer failed: {}", e);
            }
        }
    }
}
