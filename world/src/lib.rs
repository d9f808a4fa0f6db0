#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative game state management for the Twenty48 engine.
//!
//! The world owns the single [`GameState`] value per game. Every transition
//! (`initialize_game`, `execute_move`, `undo`, `continue_after_win`, the
//! resets) consumes an immutable state and produces a new one; the sliding
//! and spawning systems are delegated to for the algorithmic work. History
//! entries pushed for undo are deep clones with their own history stripped,
//! so retained memory is bounded by the undo limit and later turns can never
//! corrupt what a player rewinds to.

mod transfer;

use std::{error::Error, fmt};

use rand::Rng;
use serde::{Deserialize, Serialize};
use twenty48_core::{
    validate_game_config, ConfigError, Direction, GameConfig, GameStatus, Grid, Tile,
    TileIdAllocator,
};
use twenty48_system_sliding::slide;
use twenty48_system_spawning::spawn_random_tile;

pub use transfer::{deserialize_game_state, serialize_game_state, TransferError};

/// Complete, immutable snapshot of one game in progress.
///
/// History is a flat stack: each entry in `previous_states` is a snapshot
/// whose own `previous_states` is empty. [`undo`] pops the newest entry and
/// reattaches the remaining stack to it, so retained data is proportional to
/// `max_undo_states` rather than to the number of moves played.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    grid: Grid,
    score: u64,
    status: GameStatus,
    move_count: u32,
    previous_states: Vec<GameState>,
    config: GameConfig,
    won_and_continued: bool,
}

/// Report describing what a single move attempt accomplished.
#[derive(Clone, Debug)]
pub struct MoveReport {
    /// Whether any tile slid or merged; `false` means the turn was rejected.
    pub moved: bool,
    /// Score earned by merges during this turn.
    pub score_gained: u64,
    /// Tiles created by merges during this turn.
    pub merged_tiles: Vec<Tile>,
}

impl MoveReport {
    fn rejected() -> Self {
        Self {
            moved: false,
            score_gained: 0,
            merged_tiles: Vec::new(),
        }
    }
}

/// Reasons a new game could not be constructed.
#[derive(Clone, Debug, PartialEq)]
pub enum NewGameError {
    /// The provided configuration failed validation.
    InvalidConfig(ConfigError),
    /// A starting tile could not find an empty cell. Unreachable for any
    /// valid grid size; kept as a safety net instead of a panic.
    NoSpawnSpace,
}

impl fmt::Display for NewGameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(error) => write!(f, "{error}"),
            Self::NoSpawnSpace => write!(f, "no empty cell available for a starting tile"),
        }
    }
}

impl Error for NewGameError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidConfig(error) => Some(error),
            Self::NoSpawnSpace => None,
        }
    }
}

/// Builds a fresh game from the provided configuration.
///
/// The configuration is validated up front and every violation is reported
/// at once; nothing is partially initialized on failure. A valid game starts
/// with exactly two spawned tiles, zero score, and empty history.
pub fn initialize_game(
    config: GameConfig,
    ids: &mut TileIdAllocator,
    rng: &mut impl Rng,
) -> Result<GameState, NewGameError> {
    let violations = validate_game_config(&config);
    if !violations.is_empty() {
        return Err(NewGameError::InvalidConfig(ConfigError::new(violations)));
    }

    let mut grid = Grid::empty(config.grid_size);
    for _ in 0..2 {
        let spawned = spawn_random_tile(&grid, &config.spawn_values, ids, rng)
            .ok_or(NewGameError::NoSpawnSpace)?;
        grid = spawned.grid;
    }

    Ok(GameState {
        grid,
        score: 0,
        status: GameStatus::Playing,
        move_count: 0,
        previous_states: Vec::new(),
        config,
        won_and_continued: false,
    })
}

/// Starts the game over with its current configuration, discarding history.
pub fn reset_game(
    state: &GameState,
    ids: &mut TileIdAllocator,
    rng: &mut impl Rng,
) -> Result<GameState, NewGameError> {
    initialize_game(state.config.clone(), ids, rng)
}

/// Starts a new game under a different configuration, discarding history.
pub fn reset_game_with_config(
    config: GameConfig,
    ids: &mut TileIdAllocator,
    rng: &mut impl Rng,
) -> Result<GameState, NewGameError> {
    initialize_game(config, ids, rng)
}

/// Executes one full turn: slide, spawn, status update, history push.
///
/// The turn is rejected without any state change when the game is already
/// lost, when no tile can move in `direction`, or (defensively) when the
/// post-slide spawn finds no space. A rejected turn returns a clone of the
/// input state and a report with `moved == false`.
#[must_use]
pub fn execute_move(
    state: &GameState,
    direction: Direction,
    ids: &mut TileIdAllocator,
    rng: &mut impl Rng,
) -> (GameState, MoveReport) {
    if state.status == GameStatus::Lost {
        return (state.clone(), MoveReport::rejected());
    }

    let outcome = slide(&state.grid, direction, ids);
    if !outcome.moved {
        return (state.clone(), MoveReport::rejected());
    }

    let Some(spawned) = spawn_random_tile(&outcome.grid, &state.config.spawn_values, ids, rng)
    else {
        // A slide that moved something always vacated at least one cell, so
        // this branch is unreachable; treat it as a rejected turn regardless.
        return (state.clone(), MoveReport::rejected());
    };

    let mut previous_states = state.previous_states.clone();
    let mut snapshot = state.clone();
    // Snapshots never nest: the entry's own stack is dropped here and
    // reattached from the live state when `undo` pops it.
    snapshot.previous_states = Vec::new();
    previous_states.push(snapshot);
    while previous_states.len() > state.config.max_undo_states {
        let _ = previous_states.remove(0);
    }

    let status = determine_game_status(
        &spawned.grid,
        state.config.target_value,
        state.status,
        state.won_and_continued,
    );

    let next = GameState {
        grid: spawned.grid,
        score: state.score + outcome.score_gained,
        status,
        move_count: state.move_count + 1,
        previous_states,
        config: state.config.clone(),
        won_and_continued: state.won_and_continued,
    };
    let report = MoveReport {
        moved: true,
        score_gained: outcome.score_gained,
        merged_tiles: outcome.merged_tiles,
    };
    (next, report)
}

/// Rewinds to the most recent history entry.
///
/// The newest snapshot is popped and the remaining stack becomes its
/// history, so undo can be repeated until the stack is exhausted and never
/// further. With empty history the input state is returned unchanged;
/// undoing nothing is an expected interaction, not an error.
#[must_use]
pub fn undo(state: &GameState) -> GameState {
    let mut previous_states = state.previous_states.clone();
    match previous_states.pop() {
        Some(mut previous) => {
            previous.previous_states = previous_states;
            previous
        }
        None => state.clone(),
    }
}

/// Keeps playing past the winning tile.
///
/// Only a state whose status is exactly `Won` is affected: its status flips
/// back to `Playing` and `won_and_continued` is latched so the evaluator
/// does not announce the same win again every turn. Any other status is a
/// no-op.
#[must_use]
pub fn continue_after_win(state: &GameState) -> GameState {
    if state.status != GameStatus::Won {
        return state.clone();
    }

    let mut next = state.clone();
    next.status = GameStatus::Playing;
    next.won_and_continued = true;
    next
}

/// Reports whether any tile has reached the target value.
#[must_use]
pub fn has_won(grid: &Grid, target_value: u32) -> bool {
    grid.tiles().any(|tile| tile.value >= target_value)
}

/// Reports whether at least one legal move remains.
///
/// True whenever an empty cell exists or two orthogonally adjacent tiles
/// share a value. Only a full grid with no mergeable pair has no moves.
#[must_use]
pub fn has_moves_available(grid: &Grid) -> bool {
    if !grid.empty_cells().is_empty() {
        return true;
    }

    for tile in grid.tiles() {
        for direction in [Direction::Right, Direction::Down] {
            if let Some(neighbour) = tile.cell.step(direction, grid.size()) {
                if grid
                    .tile(neighbour)
                    .map_or(false, |other| other.value == tile.value)
                {
                    return true;
                }
            }
        }
    }
    false
}

/// Evaluates the status for a grid, honouring the sticky-win rule.
///
/// A current status of `Won` stays `Won` regardless of the grid; only an
/// explicit reset leaves that state. Once `won_and_continued` is latched the
/// evaluator never reports `Won` again, but a board with no moves still
/// loses normally.
#[must_use]
pub fn determine_game_status(
    grid: &Grid,
    target_value: u32,
    current: GameStatus,
    won_and_continued: bool,
) -> GameStatus {
    if current == GameStatus::Won {
        return GameStatus::Won;
    }
    if !won_and_continued && has_won(grid, target_value) {
        return GameStatus::Won;
    }
    if !has_moves_available(grid) {
        return GameStatus::Lost;
    }
    GameStatus::Playing
}

/// Query functions that provide read-only access to a game state.
pub mod query {
    use twenty48_core::{GameConfig, GameStatus, Grid};

    use super::GameState;

    /// Aggregate snapshot of a game's headline numbers.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct GameStatistics {
        /// Total score accumulated by merges.
        pub score: u64,
        /// Number of accepted turns so far.
        pub move_count: u32,
        /// Largest tile value on the board, or zero on an empty board.
        pub highest_tile: u32,
        /// Number of occupied cells.
        pub tile_count: usize,
        /// Number of unoccupied cells.
        pub empty_cell_count: usize,
        /// Current lifecycle phase.
        pub status: GameStatus,
        /// Whether at least one history entry is available.
        pub can_undo: bool,
        /// Exact number of history entries available.
        pub available_undos: usize,
    }

    /// Provides read-only access to the current grid.
    #[must_use]
    pub fn grid(state: &GameState) -> &Grid {
        &state.grid
    }

    /// Total score accumulated by merges.
    #[must_use]
    pub fn score(state: &GameState) -> u64 {
        state.score
    }

    /// Current lifecycle phase of the game.
    #[must_use]
    pub fn status(state: &GameState) -> GameStatus {
        state.status
    }

    /// Number of accepted turns so far.
    #[must_use]
    pub fn move_count(state: &GameState) -> u32 {
        state.move_count
    }

    /// Provides read-only access to the game's fixed configuration.
    #[must_use]
    pub fn config(state: &GameState) -> &GameConfig {
        &state.config
    }

    /// Whether the player chose to keep playing after winning.
    #[must_use]
    pub fn won_and_continued(state: &GameState) -> bool {
        state.won_and_continued
    }

    /// Number of history entries available for undo.
    #[must_use]
    pub fn available_undos(state: &GameState) -> usize {
        state.previous_states.len()
    }

    /// Captures the aggregate statistics surfaced to presentation layers.
    #[must_use]
    pub fn statistics(state: &GameState) -> GameStatistics {
        let tile_count = state.grid.tiles().count();
        GameStatistics {
            score: state.score,
            move_count: state.move_count,
            highest_tile: state.grid.tiles().map(|tile| tile.value).max().unwrap_or(0),
            tile_count,
            empty_cell_count: state.grid.cell_count() - tile_count,
            status: state.status,
            can_undo: !state.previous_states.is_empty(),
            available_undos: state.previous_states.len(),
        }
    }
}
