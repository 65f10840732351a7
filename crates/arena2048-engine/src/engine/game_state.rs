use rand::{Rng, seq::IndexedRandom as _};
use serde::{Deserialize, Serialize};

use crate::core::{board::Board, direction::Direction};

/// Probability that a spawned tile is a 2 rather than a 4.
pub const SPAWN_TWO_PROBABILITY: f64 = 0.9;

/// Board, score and progress of a single game.
///
/// All randomness is injected through the `rng` arguments, so a state can be
/// cloned and played forward by a search with its own random stream without
/// touching the live game.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct GameState {
    board: Board,
    score: u64,
    moves_taken: u32,
    is_terminal: bool,
}

impl GameState {
    /// Starts a new game: empty board, then two spawned tiles.
    pub fn new<R>(rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        let mut state = Self::from_board(Board::EMPTY, 0);
        state.spawn_tile(rng);
        state.spawn_tile(rng);
        state
    }

    /// Creates a state from an existing board, with terminality computed from
    /// the board.
    #[must_use]
    pub fn from_board(board: Board, score: u64) -> Self {
        let mut state = Self {
            board,
            score,
            moves_taken: 0,
            is_terminal: false,
        };
        state.recompute_terminal();
        state
    }

    #[must_use]
    pub const fn board(&self) -> &Board {
        &self.board
    }

    #[must_use]
    pub const fn score(&self) -> u64 {
        self.score
    }

    #[must_use]
    pub const fn moves_taken(&self) -> u32 {
        self.moves_taken
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.is_terminal
    }

    #[must_use]
    pub fn max_tile(&self) -> u32 {
        self.board.max_tile()
    }

    #[must_use]
    pub fn empty_count(&self) -> usize {
        self.board.empty_count()
    }

    /// See [`Board::has_any_valid_move`].
    #[must_use]
    pub fn has_any_valid_move(&self) -> bool {
        self.board.has_any_valid_move()
    }

    pub fn recompute_terminal(&mut self) {
        self.is_terminal = !self.has_any_valid_move();
    }

    /// Slides the board and credits merged values to the score.
    ///
    /// Returns `false`, leaving the state untouched, if no cell changes. Does
    /// not spawn a tile or count the move; see [`Self::make_move`].
    pub fn apply_move(&mut self, direction: Direction) -> bool {
        let (board, gained) = self.board.slide(direction);
        if board == self.board {
            return false;
        }
        self.board = board;
        self.score += gained;
        true
    }

    /// Places a 2 (90%) or 4 (10%) on a uniformly chosen empty cell.
    ///
    /// On a full board nothing is placed and terminality is recomputed.
    pub fn spawn_tile<R>(&mut self, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        let empty = self.board.empty_cells();
        let Some(&index) = empty.choose(rng) else {
            self.recompute_terminal();
            return;
        };
        let value = if rng.random_bool(SPAWN_TWO_PROBABILITY) {
            2
        } else {
            4
        };
        self.board.set_cell(index, value);
    }

    /// Places a specific tile on an empty cell.
    ///
    /// Used by search nodes that enumerate every possible spawn.
    ///
    /// # Panics
    ///
    /// Panics if the cell is occupied or the value is not 2 or 4.
    pub fn place_tile(&mut self, index: usize, value: u32) {
        assert_eq!(self.board.cell(index), 0, "cell {index} is occupied");
        assert!(value == 2 || value == 4, "spawned tiles are 2 or 4");
        self.board.set_cell(index, value);
    }

    /// Plays one full turn: slide, then spawn and terminality update.
    ///
    /// Returns `false` without any mutation on a terminal state or when the
    /// slide changes nothing.
    pub fn make_move<R>(&mut self, direction: Direction, rng: &mut R) -> bool
    where
        R: Rng + ?Sized,
    {
        if self.is_terminal {
            return false;
        }
        if !self.apply_move(direction) {
            return false;
        }
        self.moves_taken += 1;
        self.spawn_tile(rng);
        self.recompute_terminal();
        true
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg32;

    use super::*;

    fn rng() -> Pcg32 {
        Pcg32::seed_from_u64(0x2048)
    }

    fn state(cells: [u32; 16], score: u64) -> GameState {
        GameState::from_board(Board::from_cells(cells).unwrap(), score)
    }

    #[test]
    fn test_new_game_has_two_tiles() {
        let mut rng = rng();
        for _ in 0..50 {
            let state = GameState::new(&mut rng);
            assert_eq!(state.empty_count(), 14);
            assert_eq!(state.score(), 0);
            assert_eq!(state.moves_taken(), 0);
            assert!(!state.is_terminal());
            assert!(state.board().cells().iter().all(|v| [0, 2, 4].contains(v)));
        }
    }

    #[test]
    fn test_merge_left_scores_and_spawns() {
        let mut rng = rng();
        let mut state = state([2, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0], 0);

        assert!(state.make_move(Direction::Left, &mut rng));
        assert_eq!(state.board().cell(0), 4);
        assert_eq!(state.score(), 4);
        assert_eq!(state.moves_taken(), 1);
        assert_eq!(state.empty_count(), 14);
        let spawned = state.board().tile_sum() - 4;
        assert!(spawned == 2 || spawned == 4);
    }

    #[test]
    fn test_unchanged_move_is_rejected() {
        let mut rng = rng();
        let mut state = state([2, 4, 8, 16, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0], 12);
        let before = state.clone();

        assert!(!state.make_move(Direction::Left, &mut rng));
        assert_eq!(state, before);
    }

    #[test]
    fn test_blocked_board_is_terminal() {
        let mut state = GameState {
            board: Board::from_cells([2, 4, 2, 4, 4, 2, 4, 2, 2, 4, 2, 4, 4, 2, 4, 2]).unwrap(),
            score: 100,
            moves_taken: 7,
            is_terminal: false,
        };
        assert!(!state.has_any_valid_move());
        state.recompute_terminal();
        assert!(state.is_terminal());
    }

    #[test]
    fn test_terminal_make_move_is_noop() {
        let mut rng = rng();
        let mut state = state([2, 4, 2, 4, 4, 2, 4, 2, 2, 4, 2, 4, 4, 2, 4, 2], 100);
        assert!(state.is_terminal());
        let before = state.clone();
        for _ in 0..2 {
            for dir in Direction::ALL {
                assert!(!state.make_move(dir, &mut rng));
            }
        }
        assert_eq!(state, before);
    }

    #[test]
    fn test_spawn_on_full_board_recomputes_terminal() {
        let mut rng = rng();
        let mut state = GameState {
            board: Board::from_cells([2, 4, 2, 4, 4, 2, 4, 2, 2, 4, 2, 4, 4, 2, 4, 2]).unwrap(),
            score: 0,
            moves_taken: 0,
            is_terminal: false,
        };
        let board = *state.board();
        state.spawn_tile(&mut rng);
        assert_eq!(*state.board(), board);
        assert!(state.is_terminal());
    }

    #[test]
    fn test_spawn_distribution_is_mostly_twos() {
        let mut rng = rng();
        let mut twos = 0;
        let trials = 2000;
        for _ in 0..trials {
            let mut state = GameState::from_board(Board::EMPTY, 0);
            state.spawn_tile(&mut rng);
            if state.max_tile() == 2 {
                twos += 1;
            }
        }
        assert!((1700..=1900).contains(&twos), "twos = {twos}");
    }

    #[test]
    fn test_clone_is_independent() {
        let mut rng = rng();
        let original = GameState::new(&mut rng);
        let snapshot = original.clone();
        let mut copy = original.clone();
        for dir in Direction::ALL.into_iter().cycle().take(20) {
            copy.make_move(dir, &mut rng);
        }
        assert_eq!(original, snapshot);
    }

    #[test]
    fn test_score_is_non_decreasing_and_mass_is_conserved() {
        let mut rng = rng();
        let mut state = GameState::new(&mut rng);
        while !state.is_terminal() {
            let dir = rng.random::<Direction>();
            let before = state.clone();
            let (slid, gained) = before.board().slide(dir);
            if state.make_move(dir, &mut rng) {
                assert_eq!(state.score(), before.score() + gained);
                let spawned = state.board().tile_sum() - slid.tile_sum();
                assert!(spawned == 2 || spawned == 4);
                assert_eq!(slid.tile_sum(), before.board().tile_sum());
                assert_eq!(state.moves_taken(), before.moves_taken() + 1);
            } else {
                assert_eq!(state, before);
            }
            assert!(state.score() >= before.score());
        }
        assert!(!state.has_any_valid_move());
    }
}
