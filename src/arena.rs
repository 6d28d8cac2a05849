// Arena: hosts one episode behind the external call surface
//
// Reset, GetObservation, SubmitMove and Step map onto the scheduler and the
// move mailbox. Observations are served from a snapshot so they stay
// available while a step is waiting for agents.

use log::info;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::{Config, GameConfig};
use crate::debug_logger::{DebugLogger, EpisodeSetup, TurnRecord};
use crate::error::EngineError;
use crate::interop::{InteropStats, MoveMailbox, MoveProvider, ProviderMap, StatsSnapshot};
use crate::rules::SnakeOutcome;
use crate::scheduler::{Phase, StepOutcome, TurnScheduler};
use crate::types::{BoardState, Direction, GameInfo, Observation};

/// Acknowledgement of an accepted move
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveAck {
    pub snake_id: String,
    pub turn: u32,
    #[serde(rename = "move")]
    pub direction: Direction,
}

/// Step result as seen by external callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepResponse {
    pub turn: u32,
    pub observations: BTreeMap<String, Observation>,
    pub events: BTreeMap<String, SnakeOutcome>,
    pub terminal: bool,
    pub fallbacks: BTreeMap<String, String>,
}

impl From<StepOutcome> for StepResponse {
    fn from(outcome: StepOutcome) -> Self {
        StepResponse {
            turn: outcome.turn,
            observations: outcome
                .observations
                .into_iter()
                .map(|o| (o.you.clone(), o))
                .collect(),
            events: outcome.outcomes,
            terminal: outcome.terminal,
            fallbacks: outcome
                .fallbacks
                .into_iter()
                .map(|(id, e)| (id, e.to_string()))
                .collect(),
        }
    }
}

#[derive(Clone)]
struct Snapshot {
    game: GameInfo,
    state: BoardState,
    phase: Phase,
}

/// Single-episode host
pub struct Arena {
    config: Config,
    scheduler: Mutex<TurnScheduler>,
    mailbox: MoveMailbox,
    snapshot: RwLock<Option<Snapshot>>,
    stats: Arc<InteropStats>,
    logger: DebugLogger,
}

impl Arena {
    pub fn new(config: Config, logger: DebugLogger) -> Self {
        let stats = Arc::new(InteropStats::new());
        let scheduler =
            TurnScheduler::new(config.rules.clone(), &config.interop).with_stats(stats.clone());
        Arena {
            config,
            scheduler: Mutex::new(scheduler),
            mailbox: MoveMailbox::new(),
            snapshot: RwLock::new(None),
            stats,
            logger,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Current phase as of the last completed call
    pub fn phase(&self) -> Phase {
        self.snapshot
            .read()
            .as_ref()
            .map_or(Phase::Idle, |s| s.phase)
    }

    /// Starts a new episode from `game`, or from the configured game when `None`.
    /// Invalid settings are rejected and leave the current episode running.
    pub async fn reset(&self, game: Option<GameConfig>) -> Result<Vec<Observation>, EngineError> {
        let mut game = game.unwrap_or_else(|| self.config.game.clone());
        let mut scheduler = self.scheduler.lock().await;
        let observations = scheduler.reset(&game)?;

        if let Some(state) = scheduler.state() {
            game.seed = Some(state.rng.seed());
            self.logger.log(TurnRecord::reset(
                EpisodeSetup {
                    game,
                    rules: self.config.rules.clone(),
                },
                state.clone(),
            ));
        }
        self.publish(&scheduler);
        Ok(observations)
    }

    /// Read-only view for one snake, never blocked by a pending step
    pub fn observation(&self, snake_id: &str) -> Result<Observation, EngineError> {
        let snapshot = self.snapshot.read();
        let snapshot = snapshot.as_ref().ok_or_else(|| EngineError::InvalidEpisodeState {
            operation: "observation",
            phase: Phase::Idle.to_string(),
        })?;
        if snapshot.state.snake(snake_id).is_none() {
            return Err(EngineError::UnknownSnake(snake_id.to_string()));
        }
        Ok(Observation::from_state(&snapshot.game, &snapshot.state, snake_id))
    }

    /// Records one snake's move for the open turn
    pub fn submit_move(&self, snake_id: &str, direction: Direction) -> Result<MoveAck, EngineError> {
        let turn = self.mailbox.submit(snake_id, direction)?;
        Ok(MoveAck {
            snake_id: snake_id.to_string(),
            turn,
            direction,
        })
    }

    /// Waits for every alive snake's move (or its timeout) and resolves the turn
    pub async fn step(&self) -> Result<StepResponse, EngineError> {
        let mut scheduler = self.scheduler.lock().await;
        let providers: ProviderMap = scheduler
            .state()
            .map(|state| {
                state
                    .alive_ids()
                    .into_iter()
                    .map(|id| (id, Arc::new(self.mailbox.clone()) as Arc<dyn MoveProvider>))
                    .collect()
            })
            .unwrap_or_default();

        let result = scheduler.step(&providers).await;
        self.publish(&scheduler);
        let outcome = result?;

        if let Some(state) = scheduler.state() {
            self.logger
                .log(TurnRecord::turn(outcome.moves.clone(), state.clone()));
        }
        Ok(outcome.into())
    }

    /// Stops accepting moves and flushes the episode log
    pub async fn close(self) {
        self.mailbox.close();
        self.logger.close().await;
    }

    /// Publishes the scheduler's state and reopens the mailbox for the next turn
    fn publish(&self, scheduler: &TurnScheduler) {
        let phase = scheduler.phase();
        match (scheduler.game(), scheduler.state()) {
            (Some(game), Some(state)) => {
                if phase == Phase::AwaitingMoves {
                    self.mailbox.open_turn(state.turn, state.alive_ids());
                } else {
                    self.mailbox.close();
                }
                *self.snapshot.write() = Some(Snapshot {
                    game: game.clone(),
                    state: state.clone(),
                    phase,
                });
            }
            _ => self.mailbox.close(),
        }
        if phase == Phase::Terminal {
            info!("Arena episode reached a terminal state");
        }
    }
}
