//! Interop boundary between the engine and agent-decision processes.
//!
//! Agents see the board only through [`Observation`] values and answer with a
//! JSON move response (`{"move": "up"}`), the same shape a Battlesnake server
//! returns from `POST /move`. Transport is left to the [`MoveProvider`]: an
//! in-process policy, the [`MoveMailbox`] fed by HTTP submissions, or anything
//! else that can produce a response future.
//!
//! Every failure to get a valid move in time is a [`ProtocolError`]. It is
//! logged and counted by kind, then replaced by the default move so the turn
//! always resolves.

use log::{debug, warn};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinSet;

use crate::error::{EngineError, ProtocolError};
use crate::rules::default_move;
use crate::types::{BoardState, Direction, GameInfo, Observation};

/// Response future returned by a provider
pub type MoveFuture = Pin<Box<dyn Future<Output = Result<Value, ProtocolError>> + Send + 'static>>;

/// Anything that can choose a move for one snake from an observation
pub trait MoveProvider: Send + Sync {
    fn decide(&self, observation: Observation) -> MoveFuture;
}

/// Providers keyed by snake id
pub type ProviderMap = HashMap<String, Arc<dyn MoveProvider>>;

/// Adapts a synchronous policy function into a provider.
///
/// The policy runs on the blocking pool so a slow decision never stalls the
/// runtime; the boundary's timeout still bounds how long the turn waits.
pub struct PolicyFn<F> {
    policy: Arc<F>,
}

impl<F> PolicyFn<F>
where
    F: Fn(&Observation) -> Direction + Send + Sync + 'static,
{
    pub fn new(policy: F) -> Self {
        PolicyFn {
            policy: Arc::new(policy),
        }
    }
}

impl<F> MoveProvider for PolicyFn<F>
where
    F: Fn(&Observation) -> Direction + Send + Sync + 'static,
{
    fn decide(&self, observation: Observation) -> MoveFuture {
        let policy = self.policy.clone();
        Box::pin(async move {
            let direction = tokio::task::spawn_blocking(move || policy(&observation))
                .await
                .map_err(|e| ProtocolError::Agent(e.to_string()))?;
            Ok(json!({ "move": direction.as_str() }))
        })
    }
}

/// Extracts the direction from a move response
pub fn parse_move_response(response: &Value) -> Result<Direction, ProtocolError> {
    let field = response
        .get("move")
        .ok_or_else(|| ProtocolError::Malformed(format!("missing 'move' field in {}", response)))?;
    let text = field
        .as_str()
        .ok_or_else(|| ProtocolError::Malformed(format!("'move' must be a string, got {}", field)))?;
    text.parse()
}

/// Boundary counters, shared across turns and episodes of one host
#[derive(Debug, Default)]
pub struct InteropStats {
    moves_received: AtomicU64,
    timeouts: AtomicU64,
    malformed: AtomicU64,
    agent_errors: AtomicU64,
    fallbacks: AtomicU64,
}

/// Point-in-time copy of [`InteropStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub moves_received: u64,
    pub timeouts: u64,
    pub malformed: u64,
    pub agent_errors: u64,
    pub fallbacks: u64,
}

impl InteropStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn record_move(&self) {
        self.moves_received.fetch_add(1, Ordering::Relaxed);
    }

    fn record_failure(&self, error: &ProtocolError) {
        let counter = match error {
            ProtocolError::Timeout(_) => &self.timeouts,
            ProtocolError::Malformed(_) | ProtocolError::InvalidDirection(_) => &self.malformed,
            ProtocolError::Agent(_) | ProtocolError::MissingProvider(_) => &self.agent_errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            moves_received: self.moves_received.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            agent_errors: self.agent_errors.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
        }
    }
}

/// Moves collected for one turn
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatheredMoves {
    /// One entry per alive snake, defaults included
    pub moves: HashMap<String, Direction>,
    /// Snakes whose move was replaced by the default, and why
    pub fallbacks: BTreeMap<String, ProtocolError>,
}

/// Asks every alive snake's provider for a move, concurrently.
///
/// One task per snake, each bounded by `timeout`, joined at a single
/// barrier. Tasks still running when the set is dropped are aborted, so a
/// late answer can never leak into a later turn.
pub async fn gather_moves(
    game: &GameInfo,
    state: &BoardState,
    providers: &ProviderMap,
    timeout: Duration,
    stats: &InteropStats,
) -> GatheredMoves {
    let timeout_ms = timeout.as_millis() as u64;
    let mut results: HashMap<String, Result<Direction, ProtocolError>> = HashMap::new();
    let mut tasks = JoinSet::new();

    for snake in state.board.alive_snakes() {
        let id = snake.id.clone();
        let provider = match providers.get(&id) {
            Some(provider) => provider,
            None => {
                results.insert(id.clone(), Err(ProtocolError::MissingProvider(id)));
                continue;
            }
        };
        let response = provider.decide(Observation::from_state(game, state, &id));
        tasks.spawn(async move {
            let result = match tokio::time::timeout(timeout, response).await {
                Ok(Ok(value)) => parse_move_response(&value),
                Ok(Err(e)) => Err(e),
                Err(_) => Err(ProtocolError::Timeout(timeout_ms)),
            };
            (id, result)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((id, result)) => {
                results.insert(id, result);
            }
            Err(e) => warn!("Move task failed to join: {}", e),
        }
    }

    let mut gathered = GatheredMoves::default();
    for snake in state.board.alive_snakes() {
        let result = results
            .remove(&snake.id)
            .unwrap_or_else(|| Err(ProtocolError::Agent("move task panicked".to_string())));
        match result {
            Ok(direction) => {
                stats.record_move();
                gathered.moves.insert(snake.id.clone(), direction);
            }
            Err(error) => {
                let fallback = default_move(snake);
                if error.is_timeout() {
                    warn!(
                        "Turn {}: {} timed out ({}), using default move {}",
                        state.turn, snake.id, error, fallback
                    );
                } else {
                    warn!(
                        "Turn {}: {} protocol error ({}), using default move {}",
                        state.turn, snake.id, error, fallback
                    );
                }
                stats.record_failure(&error);
                gathered.moves.insert(snake.id.clone(), fallback);
                gathered.fallbacks.insert(snake.id.clone(), error);
            }
        }
    }

    debug!(
        "Turn {}: gathered {} moves ({} fallbacks)",
        state.turn,
        gathered.moves.len(),
        gathered.fallbacks.len()
    );
    gathered
}

#[derive(Debug, Default)]
struct MailboxState {
    /// Turn currently accepting moves, `None` between episodes
    turn: Option<u32>,
    open: HashSet<String>,
    moves: HashMap<String, Direction>,
}

/// Sink for moves submitted by remote agents.
///
/// Moves are keyed to the open turn. Opening the next turn discards anything
/// left over, so a move that arrives after its turn resolved is never applied
/// to the following one. Cloning yields another handle to the same mailbox.
#[derive(Clone, Default)]
pub struct MoveMailbox {
    state: Arc<Mutex<MailboxState>>,
    notify: Arc<Notify>,
}

impl MoveMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts accepting moves for `turn` from the given snakes
    pub fn open_turn(&self, turn: u32, alive: impl IntoIterator<Item = String>) {
        {
            let mut state = self.state.lock();
            state.turn = Some(turn);
            state.open = alive.into_iter().collect();
            state.moves.clear();
        }
        self.notify.notify_waiters();
    }

    /// Stops accepting moves until the next `open_turn`
    pub fn close(&self) {
        {
            let mut state = self.state.lock();
            state.turn = None;
            state.open.clear();
            state.moves.clear();
        }
        self.notify.notify_waiters();
    }

    pub fn open_turn_number(&self) -> Option<u32> {
        self.state.lock().turn
    }

    /// Records one move for the open turn. Returns the turn it was accepted for.
    pub fn submit(&self, snake_id: &str, direction: Direction) -> Result<u32, EngineError> {
        let turn = {
            let mut state = self.state.lock();
            let turn = state.turn.ok_or_else(|| EngineError::InvalidEpisodeState {
                operation: "submit_move",
                phase: "no turn open".to_string(),
            })?;
            if !state.open.contains(snake_id) {
                return Err(EngineError::InvalidMove {
                    snake_id: snake_id.to_string(),
                    reason: "snake is unknown or eliminated".to_string(),
                });
            }
            if state.moves.contains_key(snake_id) {
                return Err(EngineError::DuplicateMove {
                    snake_id: snake_id.to_string(),
                    turn,
                });
            }
            state.moves.insert(snake_id.to_string(), direction);
            turn
        };
        self.notify.notify_waiters();
        debug!("Turn {}: accepted {} from {}", turn, direction, snake_id);
        Ok(turn)
    }

    fn lookup(&self, snake_id: &str, turn: u32) -> Result<Option<Direction>, ProtocolError> {
        let state = self.state.lock();
        if state.turn != Some(turn) {
            return Err(ProtocolError::Agent(format!("turn {} is no longer open", turn)));
        }
        Ok(state.moves.get(snake_id).copied())
    }
}

impl MoveProvider for MoveMailbox {
    fn decide(&self, observation: Observation) -> MoveFuture {
        let mailbox = self.clone();
        Box::pin(async move {
            loop {
                // Registered before the check so a submission in between still wakes us
                let notified = mailbox.notify.notified();
                if let Some(direction) = mailbox.lookup(&observation.you, observation.turn)? {
                    return Ok(json!({ "move": direction.as_str() }));
                }
                notified.await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_move_response() {
        assert_eq!(parse_move_response(&json!({"move": "left"})), Ok(Direction::Left));
        assert!(matches!(
            parse_move_response(&json!({"shout": "hi"})),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(matches!(
            parse_move_response(&json!({"move": 3})),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(matches!(
            parse_move_response(&json!({"move": "sideways"})),
            Err(ProtocolError::InvalidDirection(_))
        ));
    }

    #[test]
    fn test_mailbox_rejects_duplicates_and_closed_turns() {
        let mailbox = MoveMailbox::new();
        assert!(matches!(
            mailbox.submit("a", Direction::Up),
            Err(EngineError::InvalidEpisodeState { .. })
        ));

        mailbox.open_turn(0, vec!["a".to_string()]);
        assert_eq!(mailbox.submit("a", Direction::Up), Ok(0));
        assert!(matches!(
            mailbox.submit("a", Direction::Down),
            Err(EngineError::DuplicateMove { turn: 0, .. })
        ));
        assert!(matches!(
            mailbox.submit("b", Direction::Down),
            Err(EngineError::InvalidMove { .. })
        ));
    }

    #[test]
    fn test_opening_next_turn_discards_stale_moves() {
        let mailbox = MoveMailbox::new();
        mailbox.open_turn(3, vec!["a".to_string()]);
        mailbox.submit("a", Direction::Left).unwrap();
        mailbox.open_turn(4, vec!["a".to_string()]);
        assert_eq!(mailbox.lookup("a", 4), Ok(None));
        assert!(mailbox.lookup("a", 3).is_err());
    }

    #[test]
    fn test_stats_count_by_kind() {
        let stats = InteropStats::new();
        stats.record_move();
        stats.record_failure(&ProtocolError::Timeout(10));
        stats.record_failure(&ProtocolError::InvalidDirection("x".into()));
        let snap = stats.snapshot();
        assert_eq!(snap.moves_received, 1);
        assert_eq!(snap.timeouts, 1);
        assert_eq!(snap.malformed, 1);
        assert_eq!(snap.agent_errors, 0);
        assert_eq!(snap.fallbacks, 2);
    }

    #[tokio::test]
    async fn test_mailbox_provider_waits_for_submission() {
        let mailbox = MoveMailbox::new();
        mailbox.open_turn(0, vec!["a".to_string()]);
        let observation = Observation {
            game: GameInfo {
                id: "g".into(),
                ruleset: "standard".into(),
                timeout_ms: 100,
            },
            turn: 0,
            board: crate::types::Board {
                width: 3,
                height: 3,
                food: vec![],
                snakes: vec![],
            },
            you: "a".into(),
        };
        let pending = mailbox.decide(observation);
        let submitter = mailbox.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            submitter.submit("a", Direction::Right).unwrap();
        });
        let response = tokio::time::timeout(Duration::from_secs(2), pending)
            .await
            .expect("mailbox should answer")
            .unwrap();
        assert_eq!(parse_move_response(&response), Ok(Direction::Right));
    }
}
