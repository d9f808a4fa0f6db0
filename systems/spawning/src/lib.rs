#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Weighted spawning system that places new tiles into empty cells.
//!
//! Randomness is an explicit dependency: every entry point takes `&mut impl
//! Rng`, so callers decide whether draws come from a thread RNG or from a
//! seeded generator in tests. The system never mutates its input grid.

use rand::Rng;
use twenty48_core::{Grid, SpawnWeight, Tile, TileIdAllocator};

/// Grid produced by a successful spawn together with the tile it placed.
#[derive(Clone, Debug)]
pub struct SpawnResult {
    /// Grid containing the newly placed tile.
    pub grid: Grid,
    /// The tile that was placed.
    pub tile: Tile,
}

/// Draws a face value from the weighted spawn table.
///
/// A uniform draw in `[0, 1)` walks the table accumulating probability mass
/// and returns the first entry whose cumulative mass exceeds the draw. The
/// table is validated upstream; if its mass still underflows the draw, the
/// first entry's value is returned rather than failing the turn.
#[must_use]
pub fn select_spawn_value(spawn_values: &[SpawnWeight], rng: &mut impl Rng) -> u32 {
    debug_assert!(
        !spawn_values.is_empty(),
        "select_spawn_value requires a populated table"
    );

    let draw: f64 = rng.gen();
    let mut cumulative = 0.0;
    for weight in spawn_values {
        cumulative += weight.probability;
        if draw < cumulative {
            return weight.value;
        }
    }

    spawn_values.first().map_or(2, |weight| weight.value)
}

/// Places one freshly drawn tile into a uniformly random empty cell.
///
/// Returns `None` when the grid has no empty cell. A full grid is an
/// expected condition the caller checks for, not an error.
#[must_use]
pub fn spawn_random_tile(
    grid: &Grid,
    spawn_values: &[SpawnWeight],
    ids: &mut TileIdAllocator,
    rng: &mut impl Rng,
) -> Option<SpawnResult> {
    let empty_cells = grid.empty_cells();
    if empty_cells.is_empty() {
        return None;
    }

    let cell = empty_cells[rng.gen_range(0..empty_cells.len())];
    let value = select_spawn_value(spawn_values, rng);
    let tile = Tile {
        id: ids.allocate(),
        value,
        cell,
        merged_from: None,
    };

    let mut next = grid.clone();
    next.place(tile.clone());
    Some(SpawnResult { grid: next, tile })
}
