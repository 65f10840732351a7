use std::cell::OnceCell;

use arena2048_engine::{Board, GameState};

/// Cells of the top-left 2×2 quadrant, where large tiles are kept anchored.
pub const TOP_LEFT_QUADRANT: [usize; 4] = [0, 1, 4, 5];

/// Centre cells of the board.
pub const CENTER_CELLS: [usize; 4] = [5, 6, 9, 10];

/// Points awarded per monotonic row or column.
pub const MONOTONIC_LINE_BONUS: u32 = 10;

/// Lazily evaluated metrics of a position.
///
/// Each metric is computed on first access and cached, so evaluators that
/// share an analysis pay for every metric at most once.
#[derive(Debug)]
pub struct BoardAnalysis {
    board: Board,
    score: u64,
    empty_count: OnceCell<u8>,
    max_tile: OnceCell<u32>,
    max_tile_index: OnceCell<Option<usize>>,
    monotonicity: OnceCell<u32>,
    ordered_pairs: OnceCell<u32>,
    potential_merges: OnceCell<u32>,
    smoothness: OnceCell<f32>,
}

impl BoardAnalysis {
    #[must_use]
    pub fn from_board(board: &Board, score: u64) -> Self {
        Self {
            board: *board,
            score,
            empty_count: OnceCell::new(),
            max_tile: OnceCell::new(),
            max_tile_index: OnceCell::new(),
            monotonicity: OnceCell::new(),
            ordered_pairs: OnceCell::new(),
            potential_merges: OnceCell::new(),
            smoothness: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn from_state(state: &GameState) -> Self {
        Self::from_board(state.board(), state.score())
    }

    #[must_use]
    pub fn board(&self) -> &Board {
        &self.board
    }

    #[must_use]
    pub fn score(&self) -> u64 {
        self.score
    }

    #[must_use]
    pub fn empty_count(&self) -> u8 {
        *self.empty_count.get_or_init(|| {
            u8::try_from(self.board.empty_count()).unwrap_or(u8::MAX)
        })
    }

    #[must_use]
    pub fn max_tile(&self) -> u32 {
        *self.max_tile.get_or_init(|| self.board.max_tile())
    }

    #[must_use]
    pub fn max_tile_index(&self) -> Option<usize> {
        *self
            .max_tile_index
            .get_or_init(|| self.board.max_tile_index())
    }

    /// Sum of the values in the given cells.
    #[must_use]
    pub fn cell_sum(&self, cells: &[usize]) -> u64 {
        cells.iter().map(|i| u64::from(self.board.cell(*i))).sum()
    }

    /// Returns `true` if the largest tile sits in the top-left quadrant.
    #[must_use]
    pub fn is_max_tile_anchored(&self) -> bool {
        self.max_tile_index()
            .is_some_and(|i| TOP_LEFT_QUADRANT.contains(&i))
    }

    /// [`MONOTONIC_LINE_BONUS`] for every row and column that never
    /// increases or never decreases, with empty cells as wildcards.
    #[must_use]
    pub fn monotonicity(&self) -> u32 {
        *self.monotonicity.get_or_init(|| {
            let lines = self.board.rows().chain(self.board.columns());
            let monotonic = lines.filter(|line| is_monotonic(line)).count();
            u32::try_from(monotonic).unwrap_or(u32::MAX) * MONOTONIC_LINE_BONUS
        })
    }

    /// Number of adjacent pairs, left to right and top to bottom, that are
    /// non-decreasing or involve an empty cell.
    #[must_use]
    pub fn ordered_pairs(&self) -> u32 {
        *self.ordered_pairs.get_or_init(|| {
            let lines = self.board.rows().chain(self.board.columns());
            lines
                .map(|line| {
                    line.windows(2)
                        .filter(|w| w[0] <= w[1] || w[0] == 0 || w[1] == 0)
                        .count()
                })
                .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
                .sum()
        })
    }

    /// Number of orthogonally adjacent equal non-empty pairs.
    #[must_use]
    pub fn potential_merges(&self) -> u32 {
        *self.potential_merges.get_or_init(|| {
            let lines = self.board.rows().chain(self.board.columns());
            lines
                .map(|line| {
                    line.windows(2)
                        .filter(|w| w[0] != 0 && w[0] == w[1])
                        .count()
                })
                .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
                .sum()
        })
    }

    /// Negated sum of `|log2 a - log2 b|` over orthogonally adjacent
    /// non-empty pairs.
    #[must_use]
    pub fn smoothness(&self) -> f32 {
        *self.smoothness.get_or_init(|| {
            let lines = self.board.rows().chain(self.board.columns());
            let roughness: u32 = lines
                .map(|line| {
                    line.windows(2)
                        .filter(|w| w[0] != 0 && w[1] != 0)
                        .map(|w| w[0].ilog2().abs_diff(w[1].ilog2()))
                        .sum::<u32>()
                })
                .sum();
            #[expect(clippy::cast_precision_loss)]
            let roughness = roughness as f32;
            -roughness
        })
    }

    /// Sum of every centre cell above 64, halved and negated.
    #[must_use]
    pub fn center_pressure(&self) -> f32 {
        let crowded: u32 = CENTER_CELLS
            .iter()
            .map(|i| self.board.cell(*i))
            .filter(|v| *v > 64)
            .sum();
        #[expect(clippy::cast_precision_loss)]
        let crowded = crowded as f32;
        -0.5 * crowded
    }
}

/// A line is monotonic if it never rises or never falls. A step into an empty
/// cell does not break a falling run, and a step out of an empty cell does not
/// break a rising run.
fn is_monotonic(line: &[u32; Board::SIZE]) -> bool {
    let mut increasing = true;
    let mut decreasing = true;
    for w in line.windows(2) {
        let (prev, next) = (w[0], w[1]);
        if next > prev && prev != 0 {
            decreasing = false;
        }
        if next < prev && next != 0 {
            increasing = false;
        }
    }
    increasing || decreasing
}
