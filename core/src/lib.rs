#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Twenty48 engine.
//!
//! This crate defines the vocabulary that connects the pure systems with the
//! authoritative game state: grid coordinates, tiles and their identifiers,
//! move directions, game status, and the configuration surface together with
//! its validator. Systems consume immutable grids and respond with new grid
//! values; nothing in this crate performs I/O or owns hidden state.

use std::{error::Error, fmt};

use serde::{Deserialize, Serialize};

/// Smallest playable grid edge length.
pub const MIN_GRID_SIZE: u32 = 3;
/// Largest playable grid edge length.
pub const MAX_GRID_SIZE: u32 = 6;
/// Number of prior states retained for undo when a config does not override it.
pub const DEFAULT_MAX_UNDO_STATES: usize = 10;
/// Permitted deviation of the spawn probability mass from 1.0.
pub const SPAWN_PROBABILITY_TOLERANCE: f64 = 1e-3;

/// Cardinal directions a player can slide the board toward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Movement toward decreasing row indices.
    Up,
    /// Movement toward increasing row indices.
    Down,
    /// Movement toward decreasing column indices.
    Left,
    /// Movement toward increasing column indices.
    Right,
}

impl Direction {
    /// All four directions in a fixed order.
    #[must_use]
    pub const fn all() -> [Direction; 4] {
        [
            Direction::Up,
            Direction::Down,
            Direction::Left,
            Direction::Right,
        ]
    }

    /// Signed column delta applied by one step in this direction.
    #[must_use]
    pub const fn column_step(self) -> i32 {
        match self {
            Direction::Left => -1,
            Direction::Right => 1,
            Direction::Up | Direction::Down => 0,
        }
    }

    /// Signed row delta applied by one step in this direction.
    #[must_use]
    pub const fn row_step(self) -> i32 {
        match self {
            Direction::Up => -1,
            Direction::Down => 1,
            Direction::Left | Direction::Right => 0,
        }
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Returns the neighbouring cell one step in `direction`, when it stays
    /// inside a `grid_size` × `grid_size` board.
    #[must_use]
    pub fn step(self, direction: Direction, grid_size: u32) -> Option<CellCoord> {
        let column = i64::from(self.column) + i64::from(direction.column_step());
        let row = i64::from(self.row) + i64::from(direction.row_step());
        let column = u32::try_from(column).ok()?;
        let row = u32::try_from(row).ok()?;
        if column < grid_size && row < grid_size {
            Some(CellCoord::new(column, row))
        } else {
            None
        }
    }
}

/// Unique identifier assigned to a tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileId(u64);

impl TileId {
    /// Creates a new tile identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Monotonic allocator for tile identifiers.
///
/// The allocator is owned by the caller and threaded explicitly into every
/// operation that creates tiles, so tests can construct a fresh allocator and
/// observe fully deterministic identifier sequences. Identifiers are never
/// reused for the lifetime of the allocator; two distinct tiles comparing
/// equal by id would corrupt history and animation bookkeeping.
#[derive(Clone, Debug, Default)]
pub struct TileIdAllocator {
    next: u64,
}

impl TileIdAllocator {
    /// Creates an allocator whose first issued identifier is zero.
    #[must_use]
    pub const fn new() -> Self {
        Self { next: 0 }
    }

    /// Issues the next identifier in the monotonic sequence.
    pub fn allocate(&mut self) -> TileId {
        let id = TileId::new(self.next);
        self.next += 1;
        id
    }
}

/// Pre-move snapshot of a tile consumed by a merge.
///
/// Recorded purely as provenance so presentation layers can animate the two
/// source tiles travelling into their merged successor. The engine itself
/// never reads these entries back.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileOrigin {
    /// Identifier the source tile carried.
    pub id: TileId,
    /// Value the source tile carried.
    pub value: u32,
    /// Cell the source tile occupied before the turn began.
    pub cell: CellCoord,
}

/// A single numbered tile occupying one grid cell.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    /// Identifier unique for the lifetime of the issuing allocator.
    pub id: TileId,
    /// Face value, always a power of two greater than one.
    pub value: u32,
    /// Cell the tile currently occupies.
    pub cell: CellCoord,
    /// The two source tiles consumed when this tile was produced by a merge.
    pub merged_from: Option<[TileOrigin; 2]>,
}

impl Tile {
    /// Captures this tile's identity and current cell as provenance.
    #[must_use]
    pub fn origin(&self) -> TileOrigin {
        TileOrigin {
            id: self.id,
            value: self.value,
            cell: self.cell,
        }
    }
}

/// Dense row-major board of optional tiles.
///
/// Invariants: at most one tile occupies any cell, and every stored tile's
/// `cell` field agrees with the slot holding it. `Clone` produces a deep,
/// mutation-proof copy because tiles own all of their data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    size: u32,
    cells: Vec<Option<Tile>>,
}

impl Grid {
    /// Creates an empty grid with `size` columns and rows.
    #[must_use]
    pub fn empty(size: u32) -> Self {
        let capacity_u64 = u64::from(size) * u64::from(size);
        let capacity = usize::try_from(capacity_u64).unwrap_or(0);
        Self {
            size,
            cells: vec![None; capacity],
        }
    }

    /// Edge length of the square grid.
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Total number of cell slots backing the grid.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Returns the tile occupying the provided cell, if any.
    #[must_use]
    pub fn tile(&self, cell: CellCoord) -> Option<&Tile> {
        self.index(cell)
            .and_then(|index| self.cells.get(index))
            .and_then(Option::as_ref)
    }

    /// Reports whether the cell is in bounds and unoccupied.
    #[must_use]
    pub fn is_empty_cell(&self, cell: CellCoord) -> bool {
        self.index(cell).map_or(false, |index| {
            self.cells.get(index).map_or(false, Option::is_none)
        })
    }

    /// Places the tile into the slot named by its `cell` field.
    ///
    /// Out-of-bounds placements are ignored rather than panicking; callers
    /// uphold the one-tile-per-cell invariant by placing into empty cells.
    pub fn place(&mut self, tile: Tile) {
        if let Some(index) = self.index(tile.cell) {
            if let Some(slot) = self.cells.get_mut(index) {
                *slot = Some(tile);
            }
        }
    }

    /// Removes and returns the tile occupying the provided cell, if any.
    pub fn take(&mut self, cell: CellCoord) -> Option<Tile> {
        let index = self.index(cell)?;
        self.cells.get_mut(index)?.take()
    }

    /// Enumerates every unoccupied cell in row-major order.
    #[must_use]
    pub fn empty_cells(&self) -> Vec<CellCoord> {
        let mut cells = Vec::new();
        for row in 0..self.size {
            for column in 0..self.size {
                let cell = CellCoord::new(column, row);
                if self.is_empty_cell(cell) {
                    cells.push(cell);
                }
            }
        }
        cells
    }

    /// Iterates every occupied tile in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.cells.iter().filter_map(Option::as_ref)
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if cell.column() < self.size && cell.row() < self.size {
            let row = usize::try_from(cell.row()).ok()?;
            let column = usize::try_from(cell.column()).ok()?;
            let width = usize::try_from(self.size).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }
}

/// Lifecycle phase of a game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameStatus {
    /// Moves are accepted and the target has not been reached.
    Playing,
    /// A tile reached the configured target value.
    Won,
    /// The grid is full and no adjacent pair can merge.
    Lost,
}

/// One entry of the weighted spawn table.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpawnWeight {
    /// Face value placed on the board when this entry is drawn.
    pub value: u32,
    /// Probability mass assigned to this entry, within `[0, 1]`.
    pub probability: f64,
}

/// Immutable parameters fixed for the duration of one game.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Edge length of the square grid, within `[MIN_GRID_SIZE, MAX_GRID_SIZE]`.
    pub grid_size: u32,
    /// Tile value that flips the status to `Won`; a power of two.
    pub target_value: u32,
    /// Weighted table of values eligible for spawning.
    pub spawn_values: Vec<SpawnWeight>,
    /// Upper bound on retained history entries for undo.
    pub max_undo_states: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            grid_size: 4,
            target_value: 2048,
            spawn_values: vec![
                SpawnWeight {
                    value: 2,
                    probability: 0.9,
                },
                SpawnWeight {
                    value: 4,
                    probability: 0.1,
                },
            ],
            max_undo_states: DEFAULT_MAX_UNDO_STATES,
        }
    }
}

/// Individual constraint violated by a [`GameConfig`].
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigViolation {
    /// The grid edge length falls outside the supported range.
    GridSizeOutOfRange {
        /// Edge length the configuration requested.
        grid_size: u32,
    },
    /// The target value is zero or not a power of two.
    TargetNotPowerOfTwo {
        /// Target value the configuration requested.
        target_value: u32,
    },
    /// The spawn table contains no entries.
    EmptySpawnTable,
    /// A spawn table entry carries a zero face value.
    SpawnValueZero {
        /// Position of the offending entry within the table.
        index: usize,
    },
    /// A spawn table entry carries a probability outside `[0, 1]`.
    SpawnProbabilityOutOfRange {
        /// Position of the offending entry within the table.
        index: usize,
        /// Probability the entry carried.
        probability: f64,
    },
    /// The spawn probabilities do not sum to 1.0 within tolerance.
    SpawnProbabilitySum {
        /// Probability mass the table actually sums to.
        sum: f64,
    },
}

impl fmt::Display for ConfigViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GridSizeOutOfRange { grid_size } => write!(
                f,
                "grid size {grid_size} is outside [{MIN_GRID_SIZE}, {MAX_GRID_SIZE}]"
            ),
            Self::TargetNotPowerOfTwo { target_value } => {
                write!(f, "target value {target_value} is not a power of two")
            }
            Self::EmptySpawnTable => write!(f, "spawn table is empty"),
            Self::SpawnValueZero { index } => {
                write!(f, "spawn table entry {index} has a zero value")
            }
            Self::SpawnProbabilityOutOfRange { index, probability } => write!(
                f,
                "spawn table entry {index} has probability {probability} outside [0, 1]"
            ),
            Self::SpawnProbabilitySum { sum } => {
                write!(f, "spawn probabilities sum to {sum} instead of 1.0")
            }
        }
    }
}

/// Validation failure carrying every constraint a configuration violated.
#[derive(Clone, Debug, PartialEq)]
pub struct ConfigError {
    violations: Vec<ConfigViolation>,
}

impl ConfigError {
    /// Wraps a non-empty list of violations.
    #[must_use]
    pub fn new(violations: Vec<ConfigViolation>) -> Self {
        debug_assert!(
            !violations.is_empty(),
            "ConfigError requires at least one violation"
        );
        Self { violations }
    }

    /// Every constraint the configuration violated, in validation order.
    #[must_use]
    pub fn violations(&self) -> &[ConfigViolation] {
        &self.violations
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid game configuration: ")?;
        for (index, violation) in self.violations.iter().enumerate() {
            if index > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{violation}")?;
        }
        Ok(())
    }
}

impl Error for ConfigError {}

/// Checks every configuration constraint and reports all violations at once.
///
/// An empty result means the configuration is valid. Callers that need a hard
/// failure wrap the non-empty list in a [`ConfigError`].
#[must_use]
pub fn validate_game_config(config: &GameConfig) -> Vec<ConfigViolation> {
    let mut violations = Vec::new();

    if !(MIN_GRID_SIZE..=MAX_GRID_SIZE).contains(&config.grid_size) {
        violations.push(ConfigViolation::GridSizeOutOfRange {
            grid_size: config.grid_size,
        });
    }

    if !config.target_value.is_power_of_two() {
        violations.push(ConfigViolation::TargetNotPowerOfTwo {
            target_value: config.target_value,
        });
    }

    if config.spawn_values.is_empty() {
        violations.push(ConfigViolation::EmptySpawnTable);
    }

    let mut sum = 0.0;
    for (index, weight) in config.spawn_values.iter().enumerate() {
        if weight.value == 0 {
            violations.push(ConfigViolation::SpawnValueZero { index });
        }
        if !(0.0..=1.0).contains(&weight.probability) {
            violations.push(ConfigViolation::SpawnProbabilityOutOfRange {
                index,
                probability: weight.probability,
            });
        }
        sum += weight.probability;
    }

    if !config.spawn_values.is_empty() && (sum - 1.0).abs() > SPAWN_PROBABILITY_TOLERANCE {
        violations.push(ConfigViolation::SpawnProbabilitySum { sum });
    }

    violations
}
