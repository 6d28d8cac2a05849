// Rules engine: turns a BoardState plus one move per live snake into the next BoardState
//
// Resolution order for a turn (all snakes move against the pre-turn state):
// 1. Move heads, drop tails
// 2. Reduce health
// 3. Starvation (takes precedence over every spatial check)
// 4. Wall, 5. self, 6. other-body, 7. head-to-head collisions
// 8. Feed surviving snakes
// 9. Spawn food from the state's RNG
// 10. Terminal check
//
// Eliminations inside one turn are simultaneous: a snake eliminated this turn
// is still an obstacle for the others, snakes eliminated earlier are not.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::config::{GameConfig, RulesConfig, RulesetKind};
use crate::error::EngineError;
use crate::rng::FoodRng;
use crate::types::{Board, BoardState, Coord, Direction, Elimination, EliminationReason, Snake};

/// What happened to one snake that was alive when the turn started
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SnakeOutcome {
    Survived,
    Eliminated(EliminationReason),
}

impl SnakeOutcome {
    pub fn reason(&self) -> Option<EliminationReason> {
        match self {
            SnakeOutcome::Survived => None,
            SnakeOutcome::Eliminated(reason) => Some(*reason),
        }
    }
}

/// Result of resolving one turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub state: BoardState,
    /// One entry per snake alive at the start of the turn
    pub outcomes: BTreeMap<String, SnakeOutcome>,
}

/// Settings every built-in rule set reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleParams {
    pub settings: RulesConfig,
    pub start_health: i32,
    /// 0 disables the limit
    pub max_turns: u32,
}

impl RuleParams {
    pub fn new(settings: &RulesConfig, game: &GameConfig) -> Self {
        RuleParams {
            settings: settings.clone(),
            start_health: game.start_health,
            max_turns: game.max_turns,
        }
    }

    fn turn_limit_reached(&self, turn: u32) -> bool {
        self.max_turns > 0 && turn >= self.max_turns
    }
}

/// A pluggable rule set over the shared board model.
///
/// Variants supply their parameters and end condition; spawning and the
/// turn pipeline are shared and may be overridden.
pub trait Ruleset: Send + Sync {
    fn name(&self) -> &'static str;

    fn params(&self) -> &RuleParams;

    /// Whether the game is over after `turn` has resolved
    fn is_game_over(&self, board: &Board, turn: u32) -> bool;

    /// Builds the turn-0 state for a fresh episode
    fn create_initial_state(&self, game: &GameConfig) -> Result<BoardState, EngineError> {
        let (board, rng) = spawn_board(game, self.params())?;
        let terminal = self.is_game_over(&board, 0);
        Ok(BoardState {
            turn: 0,
            board,
            terminal,
            rng,
        })
    }

    /// Resolves one turn. Snakes without an entry in `moves` use [`default_move`].
    fn resolve(
        &self,
        state: &BoardState,
        moves: &HashMap<String, Direction>,
    ) -> Result<Resolution, EngineError> {
        validate_state(state)?;
        validate_moves(state, moves)?;

        let params = self.params();
        let next_turn = state.turn + 1;
        let mut board = state.board.clone();
        let mut rng = state.rng.clone();

        let moved: Vec<usize> = board
            .snakes
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_alive())
            .map(|(i, _)| i)
            .collect();

        move_snakes(&mut board, &moved, moves);
        reduce_health(&mut board, &moved);

        let eliminations = find_eliminations(&board, &moved, next_turn);
        let mut outcomes = BTreeMap::new();
        for &i in &moved {
            let snake = &mut board.snakes[i];
            match eliminations.get(&i) {
                Some(elimination) => {
                    info!(
                        "Turn {}: {} eliminated ({}{})",
                        next_turn,
                        snake.id,
                        elimination.cause,
                        elimination
                            .by
                            .as_ref()
                            .map(|by| format!(" by {}", by))
                            .unwrap_or_default()
                    );
                    outcomes.insert(snake.id.clone(), SnakeOutcome::Eliminated(elimination.cause));
                    snake.eliminated = Some(elimination.clone());
                }
                None => {
                    outcomes.insert(snake.id.clone(), SnakeOutcome::Survived);
                }
            }
        }

        feed_snakes(&mut board, params.start_health);
        spawn_food(&mut board, &mut rng, &params.settings, next_turn);

        let terminal = self.is_game_over(&board, next_turn);
        debug!(
            "Turn {} resolved: {} alive, {} food, terminal={}",
            next_turn,
            board.alive_count(),
            board.food.len(),
            terminal
        );

        Ok(Resolution {
            state: BoardState {
                turn: next_turn,
                board,
                terminal,
                rng,
            },
            outcomes,
        })
    }
}

/// Standard multi-snake rules: last snake standing wins
#[derive(Debug, Clone)]
pub struct StandardRuleset {
    params: RuleParams,
}

impl StandardRuleset {
    pub fn new(params: RuleParams) -> Self {
        StandardRuleset { params }
    }
}

impl Ruleset for StandardRuleset {
    fn name(&self) -> &'static str {
        "standard"
    }

    fn params(&self) -> &RuleParams {
        &self.params
    }

    /// Over when at most one snake remains in a multi-snake game, or when
    /// the only snake of a single-snake game is gone
    fn is_game_over(&self, board: &Board, turn: u32) -> bool {
        let alive = board.alive_count();
        let last_standing = if board.snakes.len() >= 2 { alive <= 1 } else { alive == 0 };
        last_standing || self.params.turn_limit_reached(turn)
    }
}

/// Solo rules: the game runs until every snake is gone
#[derive(Debug, Clone)]
pub struct SoloRuleset {
    params: RuleParams,
}

impl SoloRuleset {
    pub fn new(params: RuleParams) -> Self {
        SoloRuleset { params }
    }
}

impl Ruleset for SoloRuleset {
    fn name(&self) -> &'static str {
        "solo"
    }

    fn params(&self) -> &RuleParams {
        &self.params
    }

    fn is_game_over(&self, board: &Board, turn: u32) -> bool {
        board.alive_count() == 0 || self.params.turn_limit_reached(turn)
    }
}

/// Builds the rule set selected in the configuration
pub fn build_ruleset(settings: &RulesConfig, game: &GameConfig) -> Box<dyn Ruleset> {
    let params = RuleParams::new(settings, game);
    match settings.ruleset {
        RulesetKind::Standard => Box::new(StandardRuleset::new(params)),
        RulesetKind::Solo => Box::new(SoloRuleset::new(params)),
    }
}

/// Move applied when a snake has no valid move this turn: keep going the way
/// the snake faces, or `up` when it has no distinct neck yet (fresh spawn).
pub fn default_move(snake: &Snake) -> Direction {
    snake.facing().unwrap_or(Direction::Up)
}

/// Checks the invariants a state must hold before it can be resolved
pub fn validate_state(state: &BoardState) -> Result<(), EngineError> {
    let board = &state.board;
    if board.width == 0 || board.height == 0 {
        return Err(EngineError::InvalidState(format!(
            "board dimensions {}x{} must be positive",
            board.width, board.height
        )));
    }
    if state.terminal {
        return Err(EngineError::InvalidState(format!(
            "turn {} is already terminal",
            state.turn
        )));
    }

    let mut ids = HashSet::new();
    for snake in &board.snakes {
        if !ids.insert(snake.id.as_str()) {
            return Err(EngineError::InvalidState(format!("duplicate snake id '{}'", snake.id)));
        }
        if !snake.is_alive() {
            continue;
        }
        if snake.body.is_empty() {
            return Err(EngineError::InvalidState(format!("snake '{}' has an empty body", snake.id)));
        }
        if snake.health < 0 {
            return Err(EngineError::InvalidState(format!(
                "snake '{}' has negative health {}",
                snake.id, snake.health
            )));
        }
        if let Some(segment) = snake.body.iter().find(|c| !board.in_bounds(c)) {
            return Err(EngineError::InvalidState(format!(
                "snake '{}' has a segment outside the board at ({}, {})",
                snake.id, segment.x, segment.y
            )));
        }
    }

    if let Some(food) = board.food.iter().find(|c| !board.in_bounds(c)) {
        return Err(EngineError::InvalidState(format!(
            "food outside the board at ({}, {})",
            food.x, food.y
        )));
    }
    Ok(())
}

/// Rejects moves addressed to unknown or eliminated snakes
pub fn validate_moves(
    state: &BoardState,
    moves: &HashMap<String, Direction>,
) -> Result<(), EngineError> {
    let mut ids: Vec<&String> = moves.keys().collect();
    ids.sort();
    for id in ids {
        match state.snake(id) {
            None => {
                return Err(EngineError::InvalidMove {
                    snake_id: id.clone(),
                    reason: "unknown snake".to_string(),
                })
            }
            Some(snake) if !snake.is_alive() => {
                return Err(EngineError::InvalidMove {
                    snake_id: id.clone(),
                    reason: "snake is already eliminated".to_string(),
                })
            }
            Some(_) => {}
        }
    }
    Ok(())
}

fn move_snakes(board: &mut Board, moved: &[usize], moves: &HashMap<String, Direction>) {
    for &i in moved {
        let snake = &mut board.snakes[i];
        let direction = moves
            .get(&snake.id)
            .copied()
            .unwrap_or_else(|| default_move(snake));
        if let Some(head) = snake.head() {
            snake.body.insert(0, direction.apply(&head));
            snake.body.pop();
        }
    }
}

fn reduce_health(board: &mut Board, moved: &[usize]) {
    for &i in moved {
        board.snakes[i].health -= 1;
    }
}

/// Elimination per moved snake, first matching check wins
fn find_eliminations(board: &Board, moved: &[usize], turn: u32) -> HashMap<usize, Elimination> {
    let mut eliminations = HashMap::new();
    let eliminate = |cause, by: Option<&Snake>| Elimination {
        cause,
        turn,
        by: by.map(|s| s.id.clone()),
    };

    for &i in moved {
        let snake = &board.snakes[i];
        let head = match snake.head() {
            Some(head) => head,
            None => continue,
        };

        let elimination = if snake.health <= 0 {
            Some(eliminate(EliminationReason::Starvation, None))
        } else if !board.in_bounds(&head) {
            Some(eliminate(EliminationReason::WallCollision, None))
        } else if snake.body[1..].contains(&head) {
            Some(eliminate(EliminationReason::SelfCollision, None))
        } else if let Some(other) = moved
            .iter()
            .map(|&j| &board.snakes[j])
            .filter(|other| other.id != snake.id)
            .find(|other| other.body.len() > 1 && other.body[1..].contains(&head))
        {
            Some(eliminate(EliminationReason::OtherCollision, Some(other)))
        } else if let Some(other) = moved
            .iter()
            .map(|&j| &board.snakes[j])
            .filter(|other| other.id != snake.id)
            .find(|other| other.head() == Some(head) && other.length() >= snake.length())
        {
            Some(eliminate(EliminationReason::HeadToHeadCollision, Some(other)))
        } else {
            None
        };

        if let Some(elimination) = elimination {
            eliminations.insert(i, elimination);
        }
    }
    eliminations
}

/// Surviving snakes on food eat it: health restored, tail held for one turn
fn feed_snakes(board: &mut Board, start_health: i32) {
    let mut eaten = Vec::new();
    for snake in board.snakes.iter_mut().filter(|s| s.is_alive()) {
        let head = match snake.head() {
            Some(head) => head,
            None => continue,
        };
        if board.food.contains(&head) {
            snake.health = start_health;
            if let Some(&tail) = snake.body.last() {
                snake.body.push(tail);
            }
            eaten.push(head);
        }
    }
    board.food.retain(|f| !eaten.contains(f));
}

/// Tops food up to the minimum, otherwise rolls the per-turn spawn chance
fn spawn_food(board: &mut Board, rng: &mut FoodRng, settings: &RulesConfig, turn: u32) {
    let count = if board.food.len() < settings.minimum_food {
        settings.minimum_food - board.food.len()
    } else if rng.percent(settings.food_spawn_chance) {
        1
    } else {
        0
    };

    for _ in 0..count {
        let free = free_cells(board, turn);
        match rng.choose(&free) {
            Some(cell) => board.food.push(cell),
            None => break,
        }
    }
}

/// Cells without food or the body of a snake that was alive this turn.
/// Bodies of snakes eliminated on earlier turns are only shown to observers
/// and do not block food.
fn free_cells(board: &Board, turn: u32) -> Vec<Coord> {
    let blocking: HashSet<Coord> = board
        .snakes
        .iter()
        .filter(|s| s.eliminated.as_ref().map_or(true, |e| e.turn == turn))
        .flat_map(|s| s.body.iter().copied())
        .chain(board.food.iter().copied())
        .collect();

    let mut cells = Vec::new();
    for y in 0..board.height as i32 {
        for x in 0..board.width as i32 {
            let coord = Coord::new(x, y);
            if !blocking.contains(&coord) {
                cells.push(coord);
            }
        }
    }
    cells
}

fn spawn_board(game: &GameConfig, params: &RuleParams) -> Result<(Board, FoodRng), EngineError> {
    game.validate()?;

    let mut rng = match game.seed {
        Some(seed) => FoodRng::new(seed),
        None => FoodRng::from_entropy(),
    };
    let settings = &params.settings;
    let fixed = uses_fixed_start_points(game);
    let starts = start_points(game, fixed, &mut rng);

    let snakes: Vec<Snake> = starts
        .iter()
        .enumerate()
        .map(|(i, &start)| Snake {
            id: format!("agent_{}", i),
            name: format!("agent_{}", i),
            health: params.start_health,
            body: vec![start; settings.snake_start_length],
            eliminated: None,
        })
        .collect();

    let mut board = Board {
        width: game.width,
        height: game.height,
        food: Vec::new(),
        snakes,
    };

    if settings.initial_food {
        if fixed {
            place_food_near_starts(&mut board, &starts, &mut rng);
        } else {
            for _ in 0..settings.minimum_food {
                let free = board.unoccupied_cells();
                match rng.choose(&free) {
                    Some(cell) => board.food.push(cell),
                    None => break,
                }
            }
        }
    }

    info!(
        "Spawned {} snakes on {}x{} board (seed {}, {} food)",
        board.snakes.len(),
        board.width,
        board.height,
        rng.seed(),
        board.food.len()
    );
    Ok((board, rng))
}

fn uses_fixed_start_points(game: &GameConfig) -> bool {
    game.width >= 7 && game.height >= 7 && game.snake_count <= 8
}

/// Corners one cell in first, then edge midpoints; random distinct cells on small boards
fn start_points(game: &GameConfig, fixed: bool, rng: &mut FoodRng) -> Vec<Coord> {
    let (w, h) = (game.width as i32, game.height as i32);
    if fixed {
        let (mx, my) = ((w - 1) / 2, (h - 1) / 2);
        let mut corners = vec![
            Coord::new(1, 1),
            Coord::new(1, h - 2),
            Coord::new(w - 2, 1),
            Coord::new(w - 2, h - 2),
        ];
        let mut edges = vec![
            Coord::new(mx, 1),
            Coord::new(1, my),
            Coord::new(w - 2, my),
            Coord::new(mx, h - 2),
        ];
        rng.shuffle(&mut corners);
        rng.shuffle(&mut edges);
        corners.into_iter().chain(edges).take(game.snake_count).collect()
    } else {
        let mut cells: Vec<Coord> = (0..h)
            .flat_map(|y| (0..w).map(move |x| Coord::new(x, y)))
            .collect();
        rng.shuffle(&mut cells);
        cells.truncate(game.snake_count);
        cells
    }
}

/// One food diagonal to each start toward the center, plus the center itself
fn place_food_near_starts(board: &mut Board, starts: &[Coord], rng: &mut FoodRng) {
    let center = Coord::new((board.width as i32 - 1) / 2, (board.height as i32 - 1) / 2);
    for start in starts {
        let candidates: Vec<Coord> = [(-1, -1), (-1, 1), (1, -1), (1, 1)]
            .iter()
            .map(|(dx, dy)| Coord::new(start.x + dx, start.y + dy))
            .filter(|c| board.in_bounds(c) && *c != center && !board.is_occupied(c))
            .filter(|c| {
                (c.x - center.x).abs() < (start.x - center.x).abs()
                    || (c.y - center.y).abs() < (start.y - center.y).abs()
            })
            .collect();
        if let Some(food) = rng.choose(&candidates) {
            board.food.push(food);
        }
    }
    if !board.is_occupied(&center) {
        board.food.push(center);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(food_spawn_chance: u8, minimum_food: usize) -> RuleParams {
        RuleParams {
            settings: RulesConfig {
                ruleset: RulesetKind::Standard,
                food_spawn_chance,
                minimum_food,
                snake_start_length: 3,
                initial_food: true,
            },
            start_health: 100,
            max_turns: 0,
        }
    }

    fn snake(id: &str, health: i32, body: &[(i32, i32)]) -> Snake {
        Snake {
            id: id.to_string(),
            name: id.to_string(),
            health,
            body: body.iter().map(|&(x, y)| Coord::new(x, y)).collect(),
            eliminated: None,
        }
    }

    fn state(width: u32, height: u32, snakes: Vec<Snake>, food: &[(i32, i32)]) -> BoardState {
        BoardState {
            turn: 0,
            board: Board {
                width,
                height,
                food: food.iter().map(|&(x, y)| Coord::new(x, y)).collect(),
                snakes,
            },
            terminal: false,
            rng: FoodRng::new(1),
        }
    }

    #[test]
    fn test_default_move_continues_facing() {
        let s = snake("a", 10, &[(2, 2), (1, 2), (0, 2)]);
        assert_eq!(default_move(&s), Direction::Right);
        let spawned = snake("b", 10, &[(3, 3), (3, 3), (3, 3)]);
        assert_eq!(default_move(&spawned), Direction::Up);
    }

    #[test]
    fn test_missing_move_uses_default() {
        let rules = StandardRuleset::new(params(0, 0));
        let s = state(
            5,
            5,
            vec![
                snake("a", 10, &[(1, 1), (0, 1)]),
                snake("b", 10, &[(3, 3), (3, 4)]),
            ],
            &[],
        );
        let res = rules.resolve(&s, &HashMap::new()).unwrap();
        assert_eq!(res.state.snake("a").unwrap().head(), Some(Coord::new(2, 1)));
        assert_eq!(res.state.snake("b").unwrap().head(), Some(Coord::new(3, 2)));
    }

    #[test]
    fn test_move_for_eliminated_snake_is_rejected() {
        let rules = StandardRuleset::new(params(0, 0));
        let mut dead = snake("dead", 0, &[(0, 0)]);
        dead.eliminated = Some(Elimination {
            cause: EliminationReason::Starvation,
            turn: 1,
            by: None,
        });
        let s = state(5, 5, vec![snake("a", 10, &[(2, 2)]), dead], &[]);
        let moves = HashMap::from([("dead".to_string(), Direction::Up)]);
        assert!(matches!(
            rules.resolve(&s, &moves),
            Err(EngineError::InvalidMove { .. })
        ));
    }

    #[test]
    fn test_invalid_state_is_rejected() {
        let rules = StandardRuleset::new(params(0, 0));
        let s = state(5, 5, vec![snake("a", 10, &[])], &[]);
        assert!(matches!(rules.resolve(&s, &HashMap::new()), Err(EngineError::InvalidState(_))));

        let s = state(5, 5, vec![snake("a", -1, &[(1, 1)])], &[]);
        assert!(matches!(rules.resolve(&s, &HashMap::new()), Err(EngineError::InvalidState(_))));

        let mut s = state(5, 5, vec![snake("a", 10, &[(1, 1)])], &[]);
        s.terminal = true;
        assert!(matches!(rules.resolve(&s, &HashMap::new()), Err(EngineError::InvalidState(_))));
    }

    #[test]
    fn test_stacked_tail_grows_and_is_an_obstacle() {
        let rules = StandardRuleset::new(params(0, 0));
        // a ate last turn: tail stacked at (0, 0)
        let s = state(
            5,
            5,
            vec![snake("a", 50, &[(1, 1), (1, 0), (0, 0), (0, 0)])],
            &[],
        );
        let moves = HashMap::from([("a".to_string(), Direction::Up)]);
        let res = rules.resolve(&s, &moves).unwrap();
        let a = res.state.snake("a").unwrap();
        assert_eq!(
            a.body,
            vec![Coord::new(1, 2), Coord::new(1, 1), Coord::new(1, 0), Coord::new(0, 0)]
        );
    }

    #[test]
    fn test_three_way_head_to_head_longest_survives() {
        let rules = StandardRuleset::new(params(0, 0));
        let s = state(
            5,
            5,
            vec![
                snake("long", 50, &[(1, 2), (0, 2), (0, 1), (0, 0)]),
                snake("mid", 50, &[(3, 2), (4, 2), (4, 1)]),
                snake("short", 50, &[(2, 1), (2, 0)]),
            ],
            &[],
        );
        let moves = HashMap::from([
            ("long".to_string(), Direction::Right),
            ("mid".to_string(), Direction::Left),
            ("short".to_string(), Direction::Up),
        ]);
        let res = rules.resolve(&s, &moves).unwrap();
        assert_eq!(res.outcomes["long"], SnakeOutcome::Survived);
        assert_eq!(
            res.outcomes["mid"],
            SnakeOutcome::Eliminated(EliminationReason::HeadToHeadCollision)
        );
        assert_eq!(
            res.outcomes["short"],
            SnakeOutcome::Eliminated(EliminationReason::HeadToHeadCollision)
        );
        assert_eq!(
            res.state.snake("mid").unwrap().eliminated.as_ref().unwrap().by.as_deref(),
            Some("long")
        );
        assert!(res.state.terminal);
    }

    #[test]
    fn test_minimum_food_is_topped_up() {
        let rules = StandardRuleset::new(params(0, 2));
        let s = state(3, 3, vec![snake("a", 50, &[(1, 1)])], &[]);
        let res = rules.resolve(&s, &HashMap::new()).unwrap();
        assert_eq!(res.state.board.food.len(), 2);
        let head = res.state.snake("a").unwrap().head().unwrap();
        assert!(!res.state.board.food.contains(&head));
    }

    #[test]
    fn test_solo_runs_until_no_snake_left() {
        let solo = SoloRuleset::new(params(0, 0));
        let standard = StandardRuleset::new(params(0, 0));
        let board = state(
            5,
            5,
            vec![snake("a", 5, &[(1, 1)]), snake("b", 5, &[(3, 3)])],
            &[],
        )
        .board;
        let mut one_left = board.clone();
        one_left.snakes[1].eliminated = Some(Elimination {
            cause: EliminationReason::WallCollision,
            turn: 1,
            by: None,
        });
        assert!(!solo.is_game_over(&one_left, 1));
        assert!(standard.is_game_over(&one_left, 1));
    }

    #[test]
    fn test_turn_limit_forces_terminal() {
        let mut p = params(0, 0);
        p.max_turns = 2;
        let rules = SoloRuleset::new(p);
        let mut s = state(9, 9, vec![snake("a", 50, &[(4, 4)])], &[]);
        s = rules.resolve(&s, &HashMap::new()).unwrap().state;
        assert!(!s.terminal);
        s = rules.resolve(&s, &HashMap::new()).unwrap().state;
        assert!(s.terminal);
    }

    #[test]
    fn test_initial_state_standard_board() {
        let rules = StandardRuleset::new(params(15, 1));
        let game = GameConfig {
            seed: Some(9),
            ..GameConfig::default()
        };
        let s = rules.create_initial_state(&game).unwrap();
        assert_eq!(s.turn, 0);
        assert!(!s.terminal);
        assert_eq!(s.board.snakes.len(), 4);
        let heads: HashSet<Coord> = s.board.snakes.iter().filter_map(|s| s.head()).collect();
        assert_eq!(heads.len(), 4);
        for snake in &s.board.snakes {
            assert_eq!(snake.length(), 3);
            assert_eq!(snake.health, 100);
        }
        // one per snake plus the center
        assert_eq!(s.board.food.len(), 5);
        assert!(s.board.food.contains(&Coord::new(5, 5)));
        assert_eq!(s, rules.create_initial_state(&game).unwrap());
    }

    #[test]
    fn test_initial_state_small_board_without_food() {
        let mut p = params(0, 0);
        p.settings.initial_food = false;
        let rules = StandardRuleset::new(p);
        let game = GameConfig {
            width: 4,
            height: 4,
            snake_count: 2,
            seed: Some(3),
            ..GameConfig::default()
        };
        let s = rules.create_initial_state(&game).unwrap();
        assert!(s.board.food.is_empty());
        assert_ne!(s.board.snakes[0].head(), s.board.snakes[1].head());
    }

    #[test]
    fn test_oversized_board_is_a_config_error() {
        let rules = StandardRuleset::new(params(0, 0));
        let game = GameConfig {
            width: 3_000_000_000,
            height: 7,
            snake_count: 2,
            seed: Some(1),
            ..GameConfig::default()
        };
        let err = rules.create_initial_state(&game).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_food_may_spawn_on_long_dead_body() {
        // The only free cell holds the body of a snake eliminated on an earlier turn
        let rules = StandardRuleset::new(params(0, 1));
        let mut dead = snake("dead", 0, &[(0, 0)]);
        dead.eliminated = Some(Elimination {
            cause: EliminationReason::Starvation,
            turn: 0,
            by: None,
        });
        let s = state(3, 1, vec![snake("a", 50, &[(1, 0), (0, 0)]), dead], &[]);
        let res = rules.resolve(&s, &HashMap::new()).unwrap();
        assert_eq!(res.state.snake("a").unwrap().head(), Some(Coord::new(2, 0)));
        assert_eq!(res.state.board.food, vec![Coord::new(0, 0)]);
    }
}
