use serde::{Deserialize, Serialize};

use super::game_state::GameState;

/// Running statistics over consecutive games of one player.
///
/// - **Games played**: number of finished games
/// - **Total score**: sum of final scores of finished games
/// - **Best score / best tile**: maxima over finished games and any live game
///   passed to [`Self::observe`]
///
/// # Example
///
/// ```
/// use arena2048_engine::{Board, GameState, GameStats};
///
/// let board = Board::from_rows([
///     [2, 4, 2, 4],
///     [4, 2, 4, 2],
///     [2, 4, 2, 4],
///     [4, 2, 4, 128],
/// ])
/// .unwrap();
/// let finished = GameState::from_board(board, 900);
///
/// let mut stats = GameStats::new();
/// stats.record_game(&finished);
///
/// assert_eq!(stats.games_played(), 1);
/// assert_eq!(stats.best_score(), 900);
/// assert_eq!(stats.best_tile(), 128);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct GameStats {
    games_played: usize,
    total_score: u64,
    best_score: u64,
    best_tile: u32,
}

impl GameStats {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            games_played: 0,
            total_score: 0,
            best_score: 0,
            best_tile: 0,
        }
    }

    #[must_use]
    pub const fn games_played(&self) -> usize {
        self.games_played
    }

    #[must_use]
    pub const fn total_score(&self) -> u64 {
        self.total_score
    }

    #[must_use]
    pub const fn best_score(&self) -> u64 {
        self.best_score
    }

    #[must_use]
    pub const fn best_tile(&self) -> u32 {
        self.best_tile
    }

    /// Updates the best score and tile from a game still in progress.
    pub fn observe(&mut self, state: &GameState) {
        self.best_score = self.best_score.max(state.score());
        self.best_tile = self.best_tile.max(state.max_tile());
    }

    /// Counts a finished game.
    pub fn record_game(&mut self, state: &GameState) {
        self.observe(state);
        self.games_played += 1;
        self.total_score += state.score();
    }

    /// Mean score per game, counting an unfinished game as one more sample.
    ///
    /// With no finished game this is the live score alone.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn average_score(&self, live: Option<&GameState>) -> f64 {
        let live_score = live.map_or(0, GameState::score);
        if self.games_played == 0 {
            return live_score as f64;
        }
        let samples = self.games_played + usize::from(live.is_some());
        (self.total_score + live_score) as f64 / samples as f64
    }
}
