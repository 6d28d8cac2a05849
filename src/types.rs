// Board and wire types shared by the rules engine and the interop boundary
// Naming follows the Battlesnake API, see https://docs.battlesnake.com/api

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ProtocolError;
use crate::rng::FoodRng;

/// 2D coordinate on the board, origin at the bottom-left corner
#[derive(Deserialize, Serialize, Debug, PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
}

impl Coord {
    pub const fn new(x: i32, y: i32) -> Self {
        Coord { x, y }
    }

    /// Whether this coordinate lies inside a `width` x `height` board
    pub fn in_bounds(&self, width: u32, height: u32) -> bool {
        self.x >= 0 && self.y >= 0 && (self.x as i64) < width as i64 && (self.y as i64) < height as i64
    }
}

/// Represents the four possible movement directions for a snake
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Returns all possible directions
    pub fn all() -> [Direction; 4] {
        [Direction::Up, Direction::Down, Direction::Left, Direction::Right]
    }

    /// Converts direction to string representation for API responses
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }

    /// Calculates the next coordinate when moving in this direction
    pub fn apply(&self, coord: &Coord) -> Coord {
        match self {
            Direction::Up => Coord { x: coord.x, y: coord.y + 1 },
            Direction::Down => Coord { x: coord.x, y: coord.y - 1 },
            Direction::Left => Coord { x: coord.x - 1, y: coord.y },
            Direction::Right => Coord { x: coord.x + 1, y: coord.y },
        }
    }

    /// Direction that leads from `from` to an adjacent `to`, if they are adjacent
    pub fn between(from: &Coord, to: &Coord) -> Option<Direction> {
        Direction::all().into_iter().find(|dir| dir.apply(from) == *to)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            "left" => Ok(Direction::Left),
            "right" => Ok(Direction::Right),
            _ => Err(ProtocolError::InvalidDirection(s.to_string())),
        }
    }
}

/// Why a snake left the game
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum EliminationReason {
    /// Health reached zero from the per-turn decay
    Starvation,
    WallCollision,
    SelfCollision,
    OtherCollision,
    HeadToHeadCollision,
    /// Health drained by a ruleset-specific damage source. Never produced by
    /// the standard rules.
    OutOfHealth,
}

impl EliminationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EliminationReason::Starvation => "starvation",
            EliminationReason::WallCollision => "wall-collision",
            EliminationReason::SelfCollision => "self-collision",
            EliminationReason::OtherCollision => "other-collision",
            EliminationReason::HeadToHeadCollision => "head-to-head-collision",
            EliminationReason::OutOfHealth => "out-of-health",
        }
    }
}

impl fmt::Display for EliminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Permanent record of a snake's elimination
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Elimination {
    pub cause: EliminationReason,
    /// Turn number produced by the resolution that eliminated the snake
    pub turn: u32,
    /// The other snake involved, for body and head-to-head collisions
    pub by: Option<String>,
}

/// Snake representation with all state information
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Snake {
    pub id: String,
    pub name: String,
    pub health: i32,
    /// Head first. Stacked duplicate segments mean pending growth or a fresh spawn.
    pub body: Vec<Coord>,
    pub eliminated: Option<Elimination>,
}

impl Snake {
    pub fn is_alive(&self) -> bool {
        self.eliminated.is_none()
    }

    pub fn head(&self) -> Option<Coord> {
        self.body.first().copied()
    }

    pub fn length(&self) -> usize {
        self.body.len()
    }

    /// The direction the snake is currently facing, if its neck is distinct from its head
    pub fn facing(&self) -> Option<Direction> {
        let head = self.body.first()?;
        let neck = self.body.iter().skip(1).find(|segment| *segment != head)?;
        Direction::between(neck, head)
    }
}

/// Board state including dimensions, food, and snakes
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Board {
    pub width: u32,
    pub height: u32,
    pub food: Vec<Coord>,
    /// Spawn order
    pub snakes: Vec<Snake>,
}

impl Board {
    pub fn snake(&self, id: &str) -> Option<&Snake> {
        self.snakes.iter().find(|s| s.id == id)
    }

    pub fn alive_snakes(&self) -> impl Iterator<Item = &Snake> {
        self.snakes.iter().filter(|s| s.is_alive())
    }

    pub fn alive_count(&self) -> usize {
        self.alive_snakes().count()
    }

    pub fn in_bounds(&self, coord: &Coord) -> bool {
        coord.in_bounds(self.width, self.height)
    }

    /// Whether any alive snake body or food occupies `coord`
    pub fn is_occupied(&self, coord: &Coord) -> bool {
        self.food.contains(coord) || self.alive_snakes().any(|s| s.body.contains(coord))
    }

    /// All cells not covered by food or an alive snake, in row-major order
    pub fn unoccupied_cells(&self) -> Vec<Coord> {
        let mut cells = Vec::new();
        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                let coord = Coord::new(x, y);
                if !self.is_occupied(&coord) {
                    cells.push(coord);
                }
            }
        }
        cells
    }
}

/// Authoritative snapshot of one episode at a turn boundary.
///
/// Values are never mutated in place; the ruleset produces a new `BoardState`
/// per resolved turn. The food RNG travels with the state so that an episode
/// is fully reproducible from any serialized snapshot.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct BoardState {
    pub turn: u32,
    pub board: Board,
    pub terminal: bool,
    pub rng: FoodRng,
}

impl BoardState {
    pub fn snake(&self, id: &str) -> Option<&Snake> {
        self.board.snake(id)
    }

    pub fn alive_ids(&self) -> Vec<String> {
        self.board.alive_snakes().map(|s| s.id.clone()).collect()
    }
}

/// Game metadata included in every observation
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct GameInfo {
    pub id: String,
    pub ruleset: String,
    pub timeout_ms: u64,
}

/// Per-agent view of a `BoardState`, the payload sent across the interop boundary
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub game: GameInfo,
    pub turn: u32,
    pub board: Board,
    /// Id of the snake this observation is addressed to
    pub you: String,
}

impl Observation {
    pub fn from_state(game: &GameInfo, state: &BoardState, you: &str) -> Self {
        Observation {
            game: game.clone(),
            turn: state.turn,
            board: state.board.clone(),
            you: you.to_string(),
        }
    }

    /// The addressed snake, if it is on the board
    pub fn you(&self) -> Option<&Snake> {
        self.board.snake(&self.you)
    }
}
