use std::fmt;

use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};

use crate::InvalidTileError;

use super::direction::Direction;

/// A 4×4 grid of tiles stored row-major.
///
/// Each cell is either `0` (empty) or a power of two `>= 2`. The board is a
/// plain `Copy` value, so every clone taken by a search is independent of the
/// live game.
///
/// # Example
///
/// ```
/// use arena2048_engine::{Board, Direction};
///
/// let board = Board::from_rows([
///     [2, 2, 0, 0],
///     [0, 0, 0, 0],
///     [0, 0, 0, 0],
///     [0, 0, 0, 0],
/// ])
/// .unwrap();
///
/// let (moved, gained) = board.slide(Direction::Left);
/// assert_eq!(moved.cell(0), 4);
/// assert_eq!(gained, 4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(try_from = "[u32; 16]", into = "[u32; 16]")]
pub struct Board {
    cells: [u32; Board::CELLS],
}

impl Default for Board {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl TryFrom<[u32; Board::CELLS]> for Board {
    type Error = InvalidTileError;

    fn try_from(cells: [u32; Board::CELLS]) -> Result<Self, Self::Error> {
        Self::from_cells(cells)
    }
}

impl From<Board> for [u32; Board::CELLS] {
    fn from(board: Board) -> Self {
        board.cells
    }
}

impl Board {
    /// Width and height of the grid.
    pub const SIZE: usize = 4;
    /// Number of cells.
    pub const CELLS: usize = Self::SIZE * Self::SIZE;
    /// Board with every cell empty.
    pub const EMPTY: Self = Self {
        cells: [0; Self::CELLS],
    };
    /// Indices of the four corner cells.
    pub const CORNERS: [usize; 4] = [0, 3, 12, 15];

    /// Creates a board from row-major cells, validating every tile value.
    pub fn from_cells(cells: [u32; Self::CELLS]) -> Result<Self, InvalidTileError> {
        for (index, &value) in cells.iter().enumerate() {
            if !is_valid_tile(value) {
                return Err(InvalidTileError { index, value });
            }
        }
        Ok(Self { cells })
    }

    /// Creates a board from four rows, top to bottom.
    pub fn from_rows(rows: [[u32; Self::SIZE]; Self::SIZE]) -> Result<Self, InvalidTileError> {
        let mut cells = [0; Self::CELLS];
        for (row, values) in rows.iter().enumerate() {
            cells[row * Self::SIZE..(row + 1) * Self::SIZE].copy_from_slice(values);
        }
        Self::from_cells(cells)
    }

    #[must_use]
    pub const fn cells(&self) -> &[u32; Self::CELLS] {
        &self.cells
    }

    #[must_use]
    pub const fn cell(&self, index: usize) -> u32 {
        self.cells[index]
    }

    #[must_use]
    pub const fn get(&self, row: usize, col: usize) -> u32 {
        self.cells[row * Self::SIZE + col]
    }

    pub(crate) fn set_cell(&mut self, index: usize, value: u32) {
        debug_assert!(is_valid_tile(value));
        self.cells[index] = value;
    }

    /// Iterates over the rows, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = [u32; Self::SIZE]> + '_ {
        (0..Self::SIZE).map(|row| std::array::from_fn(|col| self.get(row, col)))
    }

    /// Iterates over the columns, left to right, each read top to bottom.
    pub fn columns(&self) -> impl Iterator<Item = [u32; Self::SIZE]> + '_ {
        (0..Self::SIZE).map(|col| std::array::from_fn(|row| self.get(row, col)))
    }

    /// Returns the indices of all empty cells in row-major order.
    #[must_use]
    pub fn empty_cells(&self) -> ArrayVec<usize, { Board::CELLS }> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, v)| **v == 0)
            .map(|(i, _)| i)
            .collect()
    }

    #[must_use]
    pub fn empty_count(&self) -> usize {
        self.cells.iter().filter(|v| **v == 0).count()
    }

    #[must_use]
    pub fn max_tile(&self) -> u32 {
        self.cells.iter().copied().max().unwrap_or(0)
    }

    /// Returns the index of the first cell holding the largest tile, or `None`
    /// for an empty board.
    #[must_use]
    pub fn max_tile_index(&self) -> Option<usize> {
        let max = self.max_tile();
        if max == 0 {
            return None;
        }
        self.cells.iter().position(|v| *v == max)
    }

    /// Sum of all tile values.
    #[must_use]
    pub fn tile_sum(&self) -> u64 {
        self.cells.iter().map(|v| u64::from(*v)).sum()
    }

    /// Returns `true` if any cell is empty or any two orthogonal neighbours
    /// hold the same value.
    ///
    /// This is the single terminality check: a board for which it returns
    /// `false` cannot be changed by any slide. For any board holding at least
    /// one tile the converse also holds. The all-empty board is the exception:
    /// it counts as playable although no slide changes it, since it only
    /// exists before [`GameState::new`](crate::GameState::new) spawns the
    /// first two tiles.
    #[must_use]
    pub fn has_any_valid_move(&self) -> bool {
        for row in 0..Self::SIZE {
            for col in 0..Self::SIZE {
                let value = self.get(row, col);
                if value == 0 {
                    return true;
                }
                if col + 1 < Self::SIZE && self.get(row, col + 1) == value {
                    return true;
                }
                if row + 1 < Self::SIZE && self.get(row + 1, col) == value {
                    return true;
                }
            }
        }
        false
    }

    /// Slides every line towards `direction`.
    ///
    /// Returns the resulting board and the score gained by merges. The board is
    /// unchanged if nothing can move; compare with `self` to detect that.
    #[must_use]
    pub fn slide(&self, direction: Direction) -> (Board, u64) {
        let mut result = *self;
        let mut gained = 0;
        for line in 0..Self::SIZE {
            let indices = line_indices(direction, line);
            let values = indices.map(|i| self.cells[i]);
            let (slid, line_gain) = slide_line(values);
            for (i, value) in indices.into_iter().zip(slid) {
                result.cells[i] = value;
            }
            gained += line_gain;
        }
        (result, gained)
    }

    /// Returns `true` if sliding towards `direction` changes at least one cell.
    #[must_use]
    pub fn can_slide(&self, direction: Direction) -> bool {
        self.slide(direction).0 != *self
    }

    /// Directions whose slide changes the board, in canonical order.
    #[must_use]
    pub fn valid_moves(&self) -> ArrayVec<Direction, { Direction::LEN }> {
        Direction::ALL
            .into_iter()
            .filter(|dir| self.can_slide(*dir))
            .collect()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, row) in self.rows().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            for (j, value) in row.iter().enumerate() {
                if j > 0 {
                    write!(f, " ")?;
                }
                if *value == 0 {
                    write!(f, "{:>6}", ".")?;
                } else {
                    write!(f, "{value:>6}")?;
                }
            }
        }
        Ok(())
    }
}

fn is_valid_tile(value: u32) -> bool {
    value == 0 || (value >= 2 && value.is_power_of_two())
}

/// Cell indices of one line, ordered so that the last entry lies on the edge
/// the tiles travel towards.
fn line_indices(direction: Direction, line: usize) -> [usize; Board::SIZE] {
    const N: usize = Board::SIZE;
    std::array::from_fn(|j| match direction {
        Direction::Right => line * N + j,
        Direction::Left => line * N + (N - 1 - j),
        Direction::Down => j * N + line,
        Direction::Up => (N - 1 - j) * N + line,
    })
}

/// Slides one line towards its last index.
///
/// Tiles are compacted, then equal neighbours merge starting from the far
/// edge. A merged tile takes no part in a second merge.
fn slide_line(line: [u32; Board::SIZE]) -> ([u32; Board::SIZE], u64) {
    let tiles = line
        .into_iter()
        .filter(|v| *v != 0)
        .collect::<ArrayVec<u32, { Board::SIZE }>>();

    let mut out = [0; Board::SIZE];
    let mut gained = 0;
    let mut write = Board::SIZE;
    let mut read = tiles.len();
    while read > 0 {
        let value = tiles[read - 1];
        write -= 1;
        if read >= 2 && tiles[read - 2] == value {
            let merged = value * 2;
            out[write] = merged;
            gained += u64::from(merged);
            read -= 2;
        } else {
            out[write] = value;
            read -= 1;
        }
    }
    (out, gained)
}
