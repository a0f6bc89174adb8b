//! Visible-window math and the 3×3 grid

use serde::{Deserialize, Serialize};

use crate::config::GridLayout;
use crate::symbols::{Reel, SymbolId};

/// Grid edge length; the visible window is always 3×3
pub const GRID_DIM: usize = 3;

/// A grid coordinate (row, col), row 0 at the top
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Coord {
    pub row: usize,
    pub col: usize,
}

impl Coord {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl GridLayout {
    /// Map `(reel, visible offset)` to a grid coordinate.
    ///
    /// This is the one place the row/column orientation duality lives; the
    /// resolver and the result processor both go through it.
    pub fn cell(self, reel: usize, offset: usize) -> Coord {
        match self {
            GridLayout::RowMajor => Coord::new(reel, offset),
            GridLayout::ColumnMajor => Coord::new(offset, reel),
        }
    }

    /// Inverse of [`GridLayout::cell`]
    pub fn slot(self, coord: Coord) -> (usize, usize) {
        match self {
            GridLayout::RowMajor => (coord.row, coord.col),
            GridLayout::ColumnMajor => (coord.col, coord.row),
        }
    }
}

/// The three visible positions of a reel stopped at `stop`: one above, the
/// stop itself, one below (wrap-around).
pub fn visible_offsets(stop: usize, reel_len: usize) -> [usize; 3] {
    debug_assert!(reel_len > 0);
    [
        (stop + reel_len - 1) % reel_len,
        stop % reel_len,
        (stop + 1) % reel_len,
    ]
}

/// The ephemeral 3×3 grid, recomputed every spin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    cells: [[Option<SymbolId>; GRID_DIM]; GRID_DIM],
}

impl Grid {
    /// Extract the visible grid from the reels at the given stops
    pub fn extract(reels: &[Reel], stops: &[usize], layout: GridLayout) -> Self {
        let mut cells = [[None; GRID_DIM]; GRID_DIM];
        for (reel_idx, reel) in reels.iter().enumerate().take(GRID_DIM) {
            if reel.is_empty() {
                continue;
            }
            let offsets = visible_offsets(stops[reel_idx], reel.len());
            for (slot, &pos) in offsets.iter().enumerate() {
                let coord = layout.cell(reel_idx, slot);
                cells[coord.row][coord.col] = reel.symbol_at(pos);
            }
        }
        Self { cells }
    }

    /// Build directly from cells (tests and scripted scenarios)
    pub fn from_cells(cells: [[Option<SymbolId>; GRID_DIM]; GRID_DIM]) -> Self {
        Self { cells }
    }

    pub fn at(&self, coord: Coord) -> Option<SymbolId> {
        self.cells[coord.row][coord.col]
    }

    /// Iterate all coordinates row-major
    pub fn coords() -> impl Iterator<Item = Coord> {
        (0..GRID_DIM).flat_map(|row| (0..GRID_DIM).map(move |col| Coord::new(row, col)))
    }

    /// Count cells showing `id`
    pub fn count_of(&self, id: SymbolId) -> usize {
        Self::coords().filter(|&c| self.at(c) == Some(id)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::Reel;

    fn ids(v: &[u32]) -> Vec<SymbolId> {
        v.iter().map(|&i| SymbolId(i)).collect()
    }

    #[test]
    fn test_visible_offsets_wrap() {
        assert_eq!(visible_offsets(0, 5), [4, 0, 1]);
        assert_eq!(visible_offsets(4, 5), [3, 4, 0]);
        assert_eq!(visible_offsets(2, 5), [1, 2, 3]);
    }

    #[test]
    fn test_layout_round_trip() {
        for layout in [GridLayout::RowMajor, GridLayout::ColumnMajor] {
            for reel in 0..GRID_DIM {
                for offset in 0..GRID_DIM {
                    let coord = layout.cell(reel, offset);
                    assert_eq!(layout.slot(coord), (reel, offset));
                }
            }
        }
    }

    #[test]
    fn test_extract_column_major() {
        let reels = vec![
            Reel::new(ids(&[1, 2, 3, 4])),
            Reel::new(ids(&[5, 6, 7, 8])),
            Reel::new(ids(&[9, 10, 11, 12])),
        ];
        let grid = Grid::extract(&reels, &[1, 0, 2], GridLayout::ColumnMajor);

        // Reel 0 stopped at 1 → positions 0,1,2 down column 0
        assert_eq!(grid.at(Coord::new(0, 0)), Some(SymbolId(1)));
        assert_eq!(grid.at(Coord::new(1, 0)), Some(SymbolId(2)));
        assert_eq!(grid.at(Coord::new(2, 0)), Some(SymbolId(3)));
        // Reel 1 stopped at 0 → wraps to position 3 on top
        assert_eq!(grid.at(Coord::new(0, 1)), Some(SymbolId(8)));
        assert_eq!(grid.at(Coord::new(1, 1)), Some(SymbolId(5)));
    }

    #[test]
    fn test_extract_row_major_transposes() {
        let reels = vec![
            Reel::new(ids(&[1, 2, 3, 4])),
            Reel::new(ids(&[5, 6, 7, 8])),
            Reel::new(ids(&[9, 10, 11, 12])),
        ];
        let col = Grid::extract(&reels, &[1, 1, 1], GridLayout::ColumnMajor);
        let row = Grid::extract(&reels, &[1, 1, 1], GridLayout::RowMajor);
        for c in Grid::coords() {
            assert_eq!(col.at(c), row.at(Coord::new(c.col, c.row)));
        }
    }
}
