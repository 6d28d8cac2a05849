// Error taxonomy for the engine, the interop boundary, and configuration

use serde::Serialize;
use thiserror::Error;

/// Errors raised by the rules engine, the scheduler, and move submission
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Move for an unknown or already eliminated snake. Rejected locally;
    /// the episode continues.
    #[error("invalid move for snake '{snake_id}': {reason}")]
    InvalidMove { snake_id: String, reason: String },

    /// Observation requested for a snake that is not in the episode
    #[error("unknown snake '{0}'")]
    UnknownSnake(String),

    /// Second move submitted for the same snake in the same turn
    #[error("duplicate move for snake '{snake_id}' on turn {turn}")]
    DuplicateMove { snake_id: String, turn: u32 },

    /// Board invariants violated on entry to the ruleset. Fatal to the episode.
    #[error("invalid board state: {0}")]
    InvalidState(String),

    /// Scheduler call made in the wrong phase
    #[error("{operation} not allowed while {phase}")]
    InvalidEpisodeState { operation: &'static str, phase: String },

    /// Episode settings rejected at reset. The current episode is untouched.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl From<ConfigError> for EngineError {
    fn from(error: ConfigError) -> Self {
        EngineError::InvalidConfig(error.to_string())
    }
}

impl EngineError {
    /// Whether the error ends the episode rather than a single request
    pub fn is_fatal(&self) -> bool {
        matches!(self, EngineError::InvalidState(_))
    }

    /// Stable machine-readable kind used in HTTP error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::InvalidMove { .. } => "invalid_move",
            EngineError::UnknownSnake(_) => "unknown_snake",
            EngineError::DuplicateMove { .. } => "duplicate_move",
            EngineError::InvalidState(_) => "invalid_state",
            EngineError::InvalidEpisodeState { .. } => "invalid_episode_state",
            EngineError::InvalidConfig(_) => "invalid_config",
            EngineError::Protocol(_) => "protocol_error",
        }
    }
}

/// Failures of a single agent response across the interop boundary.
///
/// Every variant is recovered with the default move; the kinds are kept apart
/// so that logs and counters can tell a slow agent from a broken one.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ProtocolError {
    #[error("agent timed out after {0}ms")]
    Timeout(u64),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("invalid direction '{0}'")]
    InvalidDirection(String),

    #[error("agent failed: {0}")]
    Agent(String),

    #[error("no move provider registered for snake '{0}'")]
    MissingProvider(String),
}

impl ProtocolError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProtocolError::Timeout(_))
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_invalid_state_is_fatal() {
        assert!(EngineError::InvalidState("empty body".into()).is_fatal());
        assert!(!EngineError::InvalidMove {
            snake_id: "a".into(),
            reason: "eliminated".into()
        }
        .is_fatal());
        assert!(!EngineError::Protocol(ProtocolError::Timeout(500)).is_fatal());
    }

    #[test]
    fn test_config_error_is_not_fatal() {
        let err: EngineError = ConfigError::InvalidValue {
            field: "game.width".into(),
            message: "too wide".into(),
        }
        .into();
        assert_eq!(err.kind(), "invalid_config");
        assert!(!err.is_fatal());
        assert_eq!(
            err.to_string(),
            "invalid configuration: Invalid value for game.width: too wide"
        );
    }

    #[test]
    fn test_protocol_error_converts() {
        let err: EngineError = ProtocolError::Malformed("no move".into()).into();
        assert_eq!(err.kind(), "protocol_error");
        assert_eq!(err.to_string(), "malformed response: no move");
    }
}
