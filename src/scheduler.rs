// Turn scheduler: owns one episode's state and drives it one turn at a time
//
// Phases: Idle -> AwaitingMoves <-> Resolving -> Terminal, with Aborted for
// episodes ended by an engine invariant failure. Waiting for agent moves is
// the only suspension point; resolution itself runs synchronously and is
// never observable half-done.

use log::{error, info, warn};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{GameConfig, InteropConfig, RulesConfig};
use crate::error::{EngineError, ProtocolError};
use crate::interop::{gather_moves, InteropStats, ProviderMap};
use crate::rules::{build_ruleset, default_move, Ruleset, SnakeOutcome};
use crate::types::{BoardState, Direction, GameInfo, Observation};

/// Scheduler lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Idle,
    AwaitingMoves,
    Resolving,
    Terminal,
    /// Ended by an invariant violation rather than by the rules
    Aborted,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::AwaitingMoves => "awaiting-moves",
            Phase::Resolving => "resolving",
            Phase::Terminal => "terminal",
            Phase::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Everything a caller learns from one resolved turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    /// Turn number of the new state
    pub turn: u32,
    /// Moves actually applied, defaults included
    pub moves: BTreeMap<String, Direction>,
    /// One observation per snake, eliminated snakes included
    pub observations: Vec<Observation>,
    pub outcomes: BTreeMap<String, SnakeOutcome>,
    pub terminal: bool,
    /// Snakes whose agent failed and got the default move
    pub fallbacks: BTreeMap<String, ProtocolError>,
}

/// Drives a single episode
pub struct TurnScheduler {
    rules: RulesConfig,
    move_timeout: Duration,
    stats: Arc<InteropStats>,
    phase: Phase,
    ruleset: Option<Box<dyn Ruleset>>,
    game: Option<GameInfo>,
    state: Option<BoardState>,
    episodes: u64,
}

impl TurnScheduler {
    pub fn new(rules: RulesConfig, interop: &InteropConfig) -> Self {
        TurnScheduler {
            rules,
            move_timeout: Duration::from_millis(interop.move_timeout_ms),
            stats: Arc::new(InteropStats::new()),
            phase: Phase::Idle,
            ruleset: None,
            game: None,
            state: None,
            episodes: 0,
        }
    }

    /// Shares boundary counters with the host
    pub fn with_stats(mut self, stats: Arc<InteropStats>) -> Self {
        self.stats = stats;
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> Option<&BoardState> {
        self.state.as_ref()
    }

    pub fn game(&self) -> Option<&GameInfo> {
        self.game.as_ref()
    }

    pub fn stats(&self) -> &Arc<InteropStats> {
        &self.stats
    }

    pub fn move_timeout(&self) -> Duration {
        self.move_timeout
    }

    /// Starts a fresh episode and returns one observation per snake
    pub fn reset(&mut self, game: &GameConfig) -> Result<Vec<Observation>, EngineError> {
        if self.phase == Phase::Resolving {
            return Err(self.out_of_turn("reset"));
        }

        let ruleset = build_ruleset(&self.rules, game);
        let state = ruleset.create_initial_state(game)?;
        self.episodes += 1;
        let info = GameInfo {
            id: format!("episode-{}-{}", self.episodes, state.rng.seed()),
            ruleset: ruleset.name().to_string(),
            timeout_ms: self.move_timeout.as_millis() as u64,
        };
        info!(
            "Reset {}: {} snakes, {}x{}, ruleset {}",
            info.id,
            state.board.snakes.len(),
            state.board.width,
            state.board.height,
            info.ruleset
        );

        self.phase = if state.terminal { Phase::Terminal } else { Phase::AwaitingMoves };
        self.ruleset = Some(ruleset);
        self.game = Some(info);
        self.state = Some(state);
        Ok(self.observations())
    }

    /// Gathers one move per alive snake through the providers, then resolves the turn
    pub async fn step(&mut self, providers: &ProviderMap) -> Result<StepOutcome, EngineError> {
        self.ensure_awaiting("step")?;
        let (game, state) = match (&self.game, &self.state) {
            (Some(game), Some(state)) => (game, state),
            _ => return Err(self.out_of_turn("step")),
        };

        let gathered = gather_moves(game, state, providers, self.move_timeout, &self.stats).await;
        let mut outcome = self.advance(gathered.moves)?;
        outcome.fallbacks = gathered.fallbacks;
        Ok(outcome)
    }

    /// Resolves the current turn with the given moves.
    ///
    /// Alive snakes without a move get the default move. Moves for unknown or
    /// eliminated snakes are dropped with a warning; they never end the episode.
    pub fn advance(
        &mut self,
        mut moves: HashMap<String, Direction>,
    ) -> Result<StepOutcome, EngineError> {
        self.ensure_awaiting("advance")?;
        let state = match &self.state {
            Some(state) => state,
            None => return Err(self.out_of_turn("advance")),
        };

        moves.retain(|id, direction| match state.snake(id) {
            Some(snake) if snake.is_alive() => true,
            _ => {
                warn!(
                    "Turn {}: dropping {} for {}: {}",
                    state.turn,
                    direction,
                    id,
                    EngineError::InvalidMove {
                        snake_id: id.clone(),
                        reason: "snake is unknown or eliminated".to_string(),
                    }
                );
                false
            }
        });
        for snake in state.board.alive_snakes() {
            moves
                .entry(snake.id.clone())
                .or_insert_with(|| default_move(snake));
        }

        self.phase = Phase::Resolving;
        let resolved = match &self.ruleset {
            Some(ruleset) => ruleset.resolve(state, &moves),
            None => Err(EngineError::InvalidState("no ruleset for episode".to_string())),
        };
        let resolution = match resolved {
            Ok(resolution) => resolution,
            Err(e) => {
                error!("Aborting episode on turn {}: {}", state.turn, e);
                self.phase = Phase::Aborted;
                return Err(e);
            }
        };

        let terminal = resolution.state.terminal;
        let turn = resolution.state.turn;
        self.state = Some(resolution.state);
        self.phase = if terminal { Phase::Terminal } else { Phase::AwaitingMoves };
        if terminal {
            info!("Episode finished on turn {}", turn);
        }

        Ok(StepOutcome {
            turn,
            moves: moves.into_iter().collect(),
            observations: self.observations(),
            outcomes: resolution.outcomes,
            terminal,
            fallbacks: BTreeMap::new(),
        })
    }

    /// Abandons the current episode at a turn boundary
    pub fn abort(&mut self) -> Result<(), EngineError> {
        if self.phase == Phase::Resolving {
            return Err(self.out_of_turn("abort"));
        }
        if self.phase != Phase::Idle {
            info!("Episode aborted in phase {}", self.phase);
        }
        self.phase = Phase::Aborted;
        Ok(())
    }

    /// Read-only view for one snake
    pub fn observation(&self, snake_id: &str) -> Result<Observation, EngineError> {
        let (game, state) = match (&self.game, &self.state) {
            (Some(game), Some(state)) => (game, state),
            _ => return Err(self.out_of_turn("observation")),
        };
        if state.snake(snake_id).is_none() {
            return Err(EngineError::UnknownSnake(snake_id.to_string()));
        }
        Ok(Observation::from_state(game, state, snake_id))
    }

    /// Observations for every snake in spawn order
    pub fn observations(&self) -> Vec<Observation> {
        match (&self.game, &self.state) {
            (Some(game), Some(state)) => state
                .board
                .snakes
                .iter()
                .map(|s| Observation::from_state(game, state, &s.id))
                .collect(),
            _ => Vec::new(),
        }
    }

    fn ensure_awaiting(&self, operation: &'static str) -> Result<(), EngineError> {
        if self.phase == Phase::AwaitingMoves {
            Ok(())
        } else {
            Err(self.out_of_turn(operation))
        }
    }

    fn out_of_turn(&self, operation: &'static str) -> EngineError {
        EngineError::InvalidEpisodeState {
            operation,
            phase: self.phase.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn scheduler() -> TurnScheduler {
        let config = Config::default_hardcoded();
        TurnScheduler::new(config.rules, &config.interop)
    }

    fn game() -> GameConfig {
        GameConfig {
            seed: Some(11),
            ..GameConfig::default()
        }
    }

    #[test]
    fn test_advance_before_reset_is_rejected() {
        let mut s = scheduler();
        assert_eq!(s.phase(), Phase::Idle);
        assert!(matches!(
            s.advance(HashMap::new()),
            Err(EngineError::InvalidEpisodeState { operation: "advance", .. })
        ));
    }

    #[test]
    fn test_reset_enters_awaiting_moves() {
        let mut s = scheduler();
        let observations = s.reset(&game()).unwrap();
        assert_eq!(observations.len(), 4);
        assert_eq!(observations[0].you, "agent_0");
        assert_eq!(s.phase(), Phase::AwaitingMoves);
        assert_eq!(s.state().unwrap().turn, 0);
    }

    #[test]
    fn test_advance_fills_defaults_and_drops_unknown() {
        let mut s = scheduler();
        s.reset(&game()).unwrap();
        let moves = HashMap::from([("ghost".to_string(), Direction::Up)]);
        let outcome = s.advance(moves).unwrap();
        assert_eq!(outcome.turn, 1);
        assert_eq!(outcome.moves.len(), 4);
        assert!(!outcome.moves.contains_key("ghost"));
        // fresh spawns have no neck, so the default is up
        assert!(outcome.moves.values().all(|d| *d == Direction::Up));
    }

    #[test]
    fn test_observation_of_unknown_snake() {
        let mut s = scheduler();
        assert!(matches!(
            s.observation("agent_0"),
            Err(EngineError::InvalidEpisodeState { .. })
        ));
        s.reset(&game()).unwrap();
        assert!(matches!(s.observation("nobody"), Err(EngineError::UnknownSnake(_))));
        assert_eq!(s.observation("agent_2").unwrap().you, "agent_2");
    }

    #[test]
    fn test_abort_then_reset() {
        let mut s = scheduler();
        s.reset(&game()).unwrap();
        s.abort().unwrap();
        assert_eq!(s.phase(), Phase::Aborted);
        assert!(s.advance(HashMap::new()).is_err());
        s.reset(&game()).unwrap();
        assert_eq!(s.phase(), Phase::AwaitingMoves);
    }

    #[test]
    fn test_corrupt_state_aborts_episode() {
        let mut s = scheduler();
        s.reset(&game()).unwrap();
        if let Some(state) = s.state.as_mut() {
            state.board.snakes[0].health = -5;
        }
        let err = s.advance(HashMap::new()).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(s.phase(), Phase::Aborted, "Aborted, not Terminal");
        assert_eq!(s.state().unwrap().turn, 0);
    }
}
