#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure sliding system that resolves one directional move over a grid.
//!
//! The system consumes an immutable grid and produces a settled copy: tiles
//! slide toward the requested edge, equal-valued collisions merge once per
//! destination cell per turn, and the outcome reports the score earned plus
//! every tile a merge created. The input grid is never mutated, which is the
//! contract the game state relies on when building undo history.

use std::collections::HashMap;

use twenty48_core::{CellCoord, Direction, Grid, Tile, TileId, TileIdAllocator, TileOrigin};

/// Result of sliding a grid one step in a single direction.
#[derive(Clone, Debug)]
pub struct SlideOutcome {
    /// Grid after every tile settled.
    pub grid: Grid,
    /// Whether any tile changed cells or participated in a merge.
    pub moved: bool,
    /// Total value of the tiles created by merges this turn.
    pub score_gained: u64,
    /// Tiles created by merges, in resolution order.
    pub merged_tiles: Vec<Tile>,
}

/// Slides every tile toward the edge named by `direction`.
///
/// Cells nearest the destination edge are processed first so a single pass
/// cascades correctly. Each tile walks to its farthest reachable empty cell;
/// if the cell one step beyond holds an equal-valued tile that has not
/// already absorbed a merge this turn, the pair collapses into a fresh tile
/// of double the value whose `merged_from` records both sources at their
/// pre-move cells. A destination that merged once is closed for the rest of
/// the turn, so `[2, 2, 2]` becomes `[4, 2]` and never cascades further.
///
/// Provenance from earlier turns is cleared: a tile that merely slides comes
/// out with `merged_from` reset to `None`.
#[must_use]
pub fn slide(grid: &Grid, direction: Direction, ids: &mut TileIdAllocator) -> SlideOutcome {
    let size = grid.size();
    let origins: HashMap<TileId, TileOrigin> =
        grid.tiles().map(|tile| (tile.id, tile.origin())).collect();

    let mut next = grid.clone();
    let mut ledger = MergeLedger::new(size);
    let mut moved = false;
    let mut score_gained = 0u64;
    let mut merged_tiles = Vec::new();

    for cell in traversal_order(size, direction) {
        let Some(tile) = next.take(cell) else {
            continue;
        };

        let destination = farthest_position(&next, cell, direction);
        let merge_target = destination
            .step(direction, size)
            .filter(|beyond| !ledger.is_closed(*beyond))
            .filter(|beyond| {
                next.tile(*beyond)
                    .map_or(false, |other| other.value == tile.value)
            });

        if let Some(target) = merge_target {
            let Some(resting) = next.take(target) else {
                continue;
            };
            let merged_value = tile.value * 2;
            let sources = [
                origins
                    .get(&resting.id)
                    .copied()
                    .unwrap_or_else(|| resting.origin()),
                origins
                    .get(&tile.id)
                    .copied()
                    .unwrap_or_else(|| tile.origin()),
            ];
            let merged = Tile {
                id: ids.allocate(),
                value: merged_value,
                cell: target,
                merged_from: Some(sources),
            };
            next.place(merged.clone());
            ledger.close(target);
            score_gained += u64::from(merged_value);
            merged_tiles.push(merged);
            moved = true;
        } else {
            if destination != cell {
                moved = true;
            }
            next.place(Tile {
                cell: destination,
                merged_from: None,
                ..tile
            });
        }
    }

    SlideOutcome {
        grid: next,
        moved,
        score_gained,
        merged_tiles,
    }
}

/// Enumerates every cell so that cells nearest the destination edge come first.
fn traversal_order(size: u32, direction: Direction) -> Vec<CellCoord> {
    let mut columns: Vec<u32> = (0..size).collect();
    let mut rows: Vec<u32> = (0..size).collect();
    if direction == Direction::Right {
        columns.reverse();
    }
    if direction == Direction::Down {
        rows.reverse();
    }

    let mut order = Vec::with_capacity(columns.len() * rows.len());
    for row in &rows {
        for column in &columns {
            order.push(CellCoord::new(*column, *row));
        }
    }
    order
}

/// Walks step-wise from `start` toward the edge, stopping before the first
/// occupied or out-of-bounds cell. The walking tile must already have been
/// removed from `grid` so its own slot does not block the search.
fn farthest_position(grid: &Grid, start: CellCoord, direction: Direction) -> CellCoord {
    let mut current = start;
    while let Some(next_cell) = current.step(direction, grid.size()) {
        if !grid.is_empty_cell(next_cell) {
            break;
        }
        current = next_cell;
    }
    current
}

/// Tracks which cells already received a merge this turn.
#[derive(Debug)]
struct MergeLedger {
    size: u32,
    closed: Vec<bool>,
}

impl MergeLedger {
    fn new(size: u32) -> Self {
        let capacity_u64 = u64::from(size) * u64::from(size);
        let capacity = usize::try_from(capacity_u64).unwrap_or(0);
        Self {
            size,
            closed: vec![false; capacity],
        }
    }

    fn close(&mut self, cell: CellCoord) {
        if let Some(index) = self.index(cell) {
            if let Some(slot) = self.closed.get_mut(index) {
                *slot = true;
            }
        }
    }

    fn is_closed(&self, cell: CellCoord) -> bool {
        self.index(cell)
            .map_or(true, |index| self.closed.get(index).copied().unwrap_or(true))
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

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(ids: &mut TileIdAllocator, value: u32, column: u32, row: u32) -> Tile {
        Tile {
            id: ids.allocate(),
            value,
            cell: CellCoord::new(column, row),
            merged_from: None,
        }
    }

    fn grid_with(size: u32, ids: &mut TileIdAllocator, tiles: &[(u32, u32, u32)]) -> Grid {
        let mut grid = Grid::empty(size);
        for (value, column, row) in tiles {
            grid.place(tile(ids, *value, *column, *row));
        }
        grid
    }

    fn value_at(grid: &Grid, column: u32, row: u32) -> Option<u32> {
        grid.tile(CellCoord::new(column, row)).map(|tile| tile.value)
    }

    #[test]
    fn traversal_left_processes_low_columns_first() {
        let order = traversal_order(3, Direction::Left);
        assert_eq!(order[0], CellCoord::new(0, 0));
        assert_eq!(order[1], CellCoord::new(1, 0));
        assert_eq!(order[2], CellCoord::new(2, 0));
    }

    #[test]
    fn traversal_down_processes_high_rows_first() {
        let order = traversal_order(3, Direction::Down);
        assert_eq!(order[0], CellCoord::new(0, 2));
        assert_eq!(order[3], CellCoord::new(0, 1));
        assert_eq!(order[6], CellCoord::new(0, 0));
    }

    #[test]
    fn three_equal_tiles_merge_once_without_cascading() {
        let mut ids = TileIdAllocator::new();
        let grid = grid_with(4, &mut ids, &[(2, 0, 0), (2, 1, 0), (2, 2, 0)]);

        let outcome = slide(&grid, Direction::Left, &mut ids);

        assert!(outcome.moved);
        assert_eq!(outcome.score_gained, 4);
        assert_eq!(outcome.merged_tiles.len(), 1);
        assert_eq!(value_at(&outcome.grid, 0, 0), Some(4));
        assert_eq!(value_at(&outcome.grid, 1, 0), Some(2));
        assert_eq!(value_at(&outcome.grid, 2, 0), None);
    }

    #[test]
    fn four_equal_tiles_merge_into_two_pairs() {
        let mut ids = TileIdAllocator::new();
        let grid = grid_with(
            4,
            &mut ids,
            &[(2, 0, 0), (2, 1, 0), (2, 2, 0), (2, 3, 0)],
        );

        let outcome = slide(&grid, Direction::Left, &mut ids);

        assert_eq!(outcome.score_gained, 8);
        assert_eq!(outcome.merged_tiles.len(), 2);
        assert_eq!(value_at(&outcome.grid, 0, 0), Some(4));
        assert_eq!(value_at(&outcome.grid, 1, 0), Some(4));
        assert_eq!(value_at(&outcome.grid, 2, 0), None);
        assert_eq!(value_at(&outcome.grid, 3, 0), None);
    }

    #[test]
    fn packed_unequal_row_does_not_move() {
        let mut ids = TileIdAllocator::new();
        let grid = grid_with(4, &mut ids, &[(2, 0, 0), (4, 1, 0), (8, 2, 0)]);

        let outcome = slide(&grid, Direction::Left, &mut ids);

        assert!(!outcome.moved);
        assert_eq!(outcome.score_gained, 0);
        assert!(outcome.merged_tiles.is_empty());
        assert_eq!(outcome.grid, grid);
    }

    #[test]
    fn merge_records_pre_move_cells_of_both_sources() {
        let mut ids = TileIdAllocator::new();
        let grid = grid_with(4, &mut ids, &[(2, 1, 0), (2, 3, 0)]);

        let outcome = slide(&grid, Direction::Left, &mut ids);

        let merged = outcome
            .grid
            .tile(CellCoord::new(0, 0))
            .expect("merged tile lands on the edge");
        assert_eq!(merged.value, 4);

        let sources = merged.merged_from.expect("merge provenance recorded");
        let cells = [sources[0].cell, sources[1].cell];
        assert!(cells.contains(&CellCoord::new(1, 0)));
        assert!(cells.contains(&CellCoord::new(3, 0)));
        assert_ne!(merged.id, sources[0].id);
        assert_ne!(merged.id, sources[1].id);
    }

    #[test]
    fn sliding_clears_stale_merge_provenance() {
        let mut ids = TileIdAllocator::new();
        let mut grid = Grid::empty(4);
        let mut stale = tile(&mut ids, 4, 3, 0);
        stale.merged_from = Some([
            TileOrigin {
                id: ids.allocate(),
                value: 2,
                cell: CellCoord::new(2, 0),
            },
            TileOrigin {
                id: ids.allocate(),
                value: 2,
                cell: CellCoord::new(3, 0),
            },
        ]);
        grid.place(stale);

        let outcome = slide(&grid, Direction::Left, &mut ids);

        let settled = outcome
            .grid
            .tile(CellCoord::new(0, 0))
            .expect("tile slides to the edge");
        assert_eq!(settled.merged_from, None);
    }

    #[test]
    fn vertical_slide_merges_along_columns() {
        let mut ids = TileIdAllocator::new();
        let grid = grid_with(4, &mut ids, &[(4, 2, 0), (4, 2, 2), (8, 2, 3)]);

        let outcome = slide(&grid, Direction::Down, &mut ids);

        assert!(outcome.moved);
        assert_eq!(outcome.score_gained, 8);
        assert_eq!(value_at(&outcome.grid, 2, 3), Some(8));
        assert_eq!(value_at(&outcome.grid, 2, 2), Some(8));
        assert_eq!(value_at(&outcome.grid, 2, 1), None);
    }

    #[test]
    fn input_grid_is_never_mutated() {
        let mut ids = TileIdAllocator::new();
        let grid = grid_with(4, &mut ids, &[(2, 0, 0), (2, 1, 0)]);
        let snapshot = grid.clone();

        let _ = slide(&grid, Direction::Right, &mut ids);

        assert_eq!(grid, snapshot);
    }

    #[test]
    fn merge_beyond_closed_cell_is_blocked() {
        // Row [2, 2, 4] moving left: the pair merges into 4 at column 0, and
        // the trailing 4 must settle beside it instead of merging into the
        // freshly created 4.
        let mut ids = TileIdAllocator::new();
        let grid = grid_with(4, &mut ids, &[(2, 0, 0), (2, 1, 0), (4, 2, 0)]);

        let outcome = slide(&grid, Direction::Left, &mut ids);

        assert_eq!(outcome.score_gained, 4);
        assert_eq!(outcome.merged_tiles.len(), 1);
        assert_eq!(value_at(&outcome.grid, 0, 0), Some(4));
        assert_eq!(value_at(&outcome.grid, 1, 0), Some(4));
        assert_eq!(value_at(&outcome.grid, 2, 0), None);
    }
}
