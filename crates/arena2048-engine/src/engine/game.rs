use rand::Rng as _;
use rand_pcg::Pcg32;

use crate::core::direction::Direction;

use super::{game_state::GameState, spawn_seed::SpawnSeed};

/// A live game: a [`GameState`] together with its own spawn stream.
#[derive(Debug, Clone)]
pub struct Game {
    state: GameState,
    seed: SpawnSeed,
    rng: Pcg32,
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

impl Game {
    /// Starts a game with a random seed.
    ///
    /// For reproducible spawns, use [`Self::with_seed`] instead.
    #[must_use]
    pub fn new() -> Self {
        Self::with_seed(rand::rng().random())
    }

    /// Like [`Self::new`], but with a specific seed.
    #[must_use]
    pub fn with_seed(seed: SpawnSeed) -> Self {
        let mut rng = seed.rng();
        let state = GameState::new(&mut rng);
        Self { state, seed, rng }
    }

    /// Continues from an existing position, spawning from `seed`.
    #[must_use]
    pub fn from_state(state: GameState, seed: SpawnSeed) -> Self {
        Self {
            state,
            seed,
            rng: seed.rng(),
        }
    }

    #[must_use]
    pub fn state(&self) -> &GameState {
        &self.state
    }

    #[must_use]
    pub fn seed(&self) -> SpawnSeed {
        self.seed
    }

    /// See [`GameState::make_move`].
    pub fn make_move(&mut self, direction: Direction) -> bool {
        self.state.make_move(direction, &mut self.rng)
    }

    /// Marks the game over if no move is left.
    pub fn recompute_terminal(&mut self) {
        self.state.recompute_terminal();
    }

    /// Starts a fresh game, continuing the same spawn stream.
    pub fn restart(&mut self) {
        self.state = GameState::new(&mut self.rng);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_game() {
        let seed = SpawnSeed::from_u128(42);
        let mut a = Game::with_seed(seed);
        let mut b = Game::with_seed(seed);
        for dir in Direction::ALL.into_iter().cycle().take(200) {
            assert_eq!(a.make_move(dir), b.make_move(dir));
            assert_eq!(a.state(), b.state());
        }
    }

    #[test]
    fn test_restart_resets_progress() {
        let mut game = Game::with_seed(SpawnSeed::from_u128(7));
        for dir in Direction::ALL.into_iter().cycle().take(40) {
            game.make_move(dir);
        }
        assert!(game.state().moves_taken() > 0);

        game.restart();
        assert_eq!(game.state().moves_taken(), 0);
        assert_eq!(game.state().score(), 0);
        assert_eq!(game.state().empty_count(), 14);
    }

    #[test]
    fn test_from_state_keeps_position() {
        let board = crate::Board::from_rows([[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]]).unwrap();
        let mut game = Game::from_state(GameState::from_board(board, 12), SpawnSeed::from_u128(3));
        assert_eq!(game.state().score(), 12);
        assert!(game.make_move(Direction::Left));
        assert_eq!(game.state().score(), 16);
        assert_eq!(game.state().empty_count(), 14);
    }
}
