//! Turn evaluation: one-ply move selection.
//!
//! For each direction in canonical order the state is slid without spawning a
//! tile, and the resulting afterstate is scored by a [`PositionEvaluator`].
//! The strictly highest score wins, so ties keep the earlier direction.
//!
//! This greedy step is the move policy of the baseline agents, the genetic
//! agent (with the active genome as evaluator) and the heuristic fallback of
//! the neural agents.
//!
//! # Usage
//!
//! ```
//! use arena2048_engine::{Board, Direction, GameState};
//! use arena2048_evaluator::{presets, turn_evaluator::TurnEvaluator};
//!
//! let evaluator = TurnEvaluator::new(Box::new(presets::lookahead()));
//! let board = Board::from_rows([[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]]).unwrap();
//! let state = GameState::from_board(board, 0);
//!
//! let (direction, _value) = evaluator.select_best_move(&state).unwrap();
//! assert!(matches!(direction, Direction::Left | Direction::Right));
//! ```

use arena2048_engine::{Direction, GameState};
use rand::Rng;

use crate::position_evaluator::PositionEvaluator;

/// Picks the best one-ply move according to a position evaluator.
#[derive(Debug)]
pub struct TurnEvaluator<'a> {
    position_evaluator: Box<dyn PositionEvaluator + 'a>,
}

impl<'a> TurnEvaluator<'a> {
    #[must_use]
    pub fn new(position_evaluator: Box<dyn PositionEvaluator + 'a>) -> Self {
        Self { position_evaluator }
    }

    #[must_use]
    pub fn position_evaluator(&self) -> &dyn PositionEvaluator {
        self.position_evaluator.as_ref()
    }

    /// Returns the best direction and the value of its afterstate, or `None`
    /// if no direction changes the board.
    #[must_use]
    pub fn select_best_move(&self, state: &GameState) -> Option<(Direction, f32)> {
        select_best_move(self.position_evaluator.as_ref(), state)
    }

    /// Plays with real spawns until the game ends or `move_limit` moves have
    /// been made. Returns the number of moves made.
    pub fn play_session<R>(&self, state: &mut GameState, rng: &mut R, move_limit: usize) -> usize
    where
        R: Rng + ?Sized,
    {
        for played in 0..move_limit {
            let Some((direction, _)) = self.select_best_move(state) else {
                state.recompute_terminal();
                return played;
            };
            if !state.make_move(direction, rng) {
                return played;
            }
        }
        move_limit
    }
}

/// Free-standing form of [`TurnEvaluator::select_best_move`] for evaluators
/// that are not boxed.
#[must_use]
pub fn select_best_move<E>(evaluator: &E, state: &GameState) -> Option<(Direction, f32)>
where
    E: PositionEvaluator + ?Sized,
{
    let mut best: Option<(Direction, f32)> = None;
    for direction in Direction::ALL {
        let mut next = state.clone();
        if !next.apply_move(direction) {
            continue;
        }
        let value = evaluator.evaluate_state(&next);
        if best.is_none_or(|(_, best_value)| value > best_value) {
            best = Some((direction, value));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use arena2048_engine::{Board, SpawnSeed};

    use super::*;
    use crate::{board_feature::Score, position_evaluator::FeatureBasedEvaluator, presets};

    #[test]
    fn test_blocked_board_has_no_move() {
        let board = Board::from_rows([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]])
            .unwrap();
        let evaluator = TurnEvaluator::new(Box::new(presets::heuristic()));
        assert!(evaluator.select_best_move(&GameState::from_board(board, 0)).is_none());
    }

    #[test]
    fn test_ties_keep_canonical_order() {
        // Score is unchanged by every slide here, so all candidates tie.
        let evaluator = FeatureBasedEvaluator::new(vec![Box::new(Score)], vec![1.0]);
        let board = Board::from_rows([[0; 4], [0, 2, 0, 0], [0; 4], [0; 4]]).unwrap();
        let state = GameState::from_board(board, 0);
        let (direction, _) = select_best_move(&evaluator, &state).unwrap();
        assert_eq!(direction, Direction::Up);
    }

    #[test]
    fn test_prefers_merge_under_score() {
        let evaluator = FeatureBasedEvaluator::new(vec![Box::new(Score)], vec![1.0]);
        // Up does nothing, Down only shifts, Left and Right merge the 2s.
        let board = Board::from_rows([[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]]).unwrap();
        let state = GameState::from_board(board, 0);
        let (direction, value) = select_best_move(&evaluator, &state).unwrap();
        assert_eq!(direction, Direction::Left);
        assert!((value - 4.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_play_session_ends_or_hits_limit() {
        let evaluator = TurnEvaluator::new(Box::new(presets::heuristic()));
        let mut rng = SpawnSeed::from_u128(7).rng();
        let mut state = GameState::new(&mut rng);
        let played = evaluator.play_session(&mut state, &mut rng, 50);
        assert!(played <= 50);
        assert!(played == 50 || state.is_terminal());
        assert_eq!(usize::try_from(state.moves_taken()).unwrap(), played);
    }
}
