// Configuration module for reading Arena.toml
// Holds the episode defaults, rule settings, interop timing and debug logging options

use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ConfigError;

/// Main configuration structure containing all tunable parameters
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    pub game: GameConfig,
    pub rules: RulesConfig,
    pub interop: InteropConfig,
    pub debug: DebugConfig,
}

/// Largest accepted board side. Keeps every coordinate well inside `i32`
/// and the per-turn free-cell scan small.
pub const MAX_BOARD_DIMENSION: u32 = 255;

/// Per-episode settings, also the body of a reset request
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct GameConfig {
    pub width: u32,
    pub height: u32,
    pub snake_count: usize,
    /// Forces a terminal state once this many turns have resolved. 0 disables the limit.
    #[serde(default)]
    pub max_turns: u32,
    /// Starting health, also the value restored when a snake eats
    pub start_health: i32,
    /// Food RNG seed. A fresh seed is drawn when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            width: 11,
            height: 11,
            snake_count: 4,
            max_turns: 0,
            start_health: 100,
            seed: None,
        }
    }
}

/// Which rule set drives the episode
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RulesetKind {
    Standard,
    Solo,
}

/// Food and spawn settings shared by the built-in rule sets
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct RulesConfig {
    pub ruleset: RulesetKind,
    /// Percent chance (0-100) of one extra food spawning per turn
    pub food_spawn_chance: u8,
    /// Food count topped up every turn
    pub minimum_food: usize,
    pub snake_start_length: usize,
    /// Place starting food at reset
    pub initial_food: bool,
}

impl Default for RulesConfig {
    fn default() -> Self {
        RulesConfig {
            ruleset: RulesetKind::Standard,
            food_spawn_chance: 15,
            minimum_food: 1,
            snake_start_length: 3,
            initial_food: true,
        }
    }
}

/// Interop boundary timing
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct InteropConfig {
    /// Per-agent deadline for one move
    pub move_timeout_ms: u64,
}

/// Debug configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct DebugConfig {
    pub enabled: bool,
    pub log_file_path: String,
}

impl Config {
    /// Loads configuration from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the Arena.toml configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    /// Parses and validates configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads default configuration from Arena.toml in the project root
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::from_file("Arena.toml")
    }

    /// Creates a configuration with hardcoded default values as fallback
    /// This should match the values in Arena.toml
    pub fn default_hardcoded() -> Self {
        Config {
            game: GameConfig::default(),
            rules: RulesConfig::default(),
            interop: InteropConfig { move_timeout_ms: 500 },
            debug: DebugConfig {
                enabled: false,
                log_file_path: "arena_debug.jsonl".to_string(),
            },
        }
    }

    /// Attempts to load from file, falls back to hardcoded defaults on error
    pub fn load_or_default() -> Self {
        Self::load_default().unwrap_or_else(|e| {
            warn!("Could not load Arena.toml ({}), using hardcoded defaults", e);
            Self::default_hardcoded()
        })
    }

    /// Rejects settings the engine cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.game.validate()?;
        if self.rules.food_spawn_chance > 100 {
            return Err(invalid("rules.food_spawn_chance", "must be between 0 and 100"));
        }
        if self.rules.snake_start_length == 0 {
            return Err(invalid("rules.snake_start_length", "must be at least 1"));
        }
        if self.interop.move_timeout_ms == 0 {
            return Err(invalid("interop.move_timeout_ms", "must be positive"));
        }
        Ok(())
    }
}

impl GameConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(invalid("game.width/height", "board dimensions must be positive"));
        }
        if self.width > MAX_BOARD_DIMENSION || self.height > MAX_BOARD_DIMENSION {
            return Err(ConfigError::InvalidValue {
                field: "game.width/height".to_string(),
                message: format!(
                    "board {}x{} exceeds the {} cell limit per side",
                    self.width, self.height, MAX_BOARD_DIMENSION
                ),
            });
        }
        if self.snake_count == 0 {
            return Err(invalid("game.snake_count", "at least one snake is required"));
        }
        if self.snake_count as u64 > self.width as u64 * self.height as u64 {
            return Err(invalid("game.snake_count", "more snakes than board cells"));
        }
        if self.start_health <= 0 {
            return Err(invalid("game.start_health", "must be positive"));
        }
        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.to_string(),
    }
}
