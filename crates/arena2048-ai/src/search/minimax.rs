use arena2048_engine::{Direction, GameState};
use arena2048_evaluator::{
    position_evaluator::{FeatureBasedEvaluator, PositionEvaluator as _},
    presets,
};
use arrayvec::ArrayVec;

use super::{Deadline, DepthConfig, afterstates, best_candidate};
use crate::{agent::Agent, kind::AgentKind, params::AgentParams};

/// Adversarial search: the player maximizes, the spawner picks the worst
/// possible tile (any empty cell, 2 or 4).
#[derive(Debug, Clone)]
pub struct MinimaxAgent {
    config: DepthConfig,
    evaluator: FeatureBasedEvaluator,
}

impl Default for MinimaxAgent {
    fn default() -> Self {
        Self::new(DepthConfig::default())
    }
}

impl MinimaxAgent {
    #[must_use]
    pub fn new(config: DepthConfig) -> Self {
        Self {
            config,
            evaluator: presets::minimax(),
        }
    }

    #[must_use]
    pub fn from_params(params: &AgentParams) -> Self {
        Self::new(DepthConfig::from_params(params))
    }

    #[must_use]
    pub fn config(&self) -> &DepthConfig {
        &self.config
    }

    pub fn set_max_depth(&mut self, max_depth: u32) {
        self.config.set_max_depth(max_depth);
    }

    /// Minimax value of every valid move, in canonical order.
    #[must_use]
    pub fn evaluate_moves(&self, state: &GameState) -> ArrayVec<(Direction, f32), 4> {
        let deadline = self.config.deadline();
        afterstates(state)
            .into_iter()
            .map(|(direction, next)| {
                let value = self.min_node(&next, self.config.max_depth, deadline);
                (direction, value)
            })
            .collect()
    }

    fn is_leaf(state: &GameState, depth: u32, deadline: Deadline) -> bool {
        depth == 0 || deadline.is_expired() || !state.has_any_valid_move()
    }

    fn max_node(&self, state: &GameState, depth: u32, deadline: Deadline) -> f32 {
        if Self::is_leaf(state, depth, deadline) {
            return self.evaluator.evaluate_state(state);
        }
        afterstates(state)
            .iter()
            .map(|(_, next)| self.min_node(next, depth - 1, deadline))
            .reduce(f32::max)
            .unwrap_or_else(|| self.evaluator.evaluate_state(state))
    }

    fn min_node(&self, state: &GameState, depth: u32, deadline: Deadline) -> f32 {
        if Self::is_leaf(state, depth, deadline) {
            return self.evaluator.evaluate_state(state);
        }
        let mut worst: Option<f32> = None;
        for index in state.board().empty_cells() {
            for tile in [2, 4] {
                let mut spawned = state.clone();
                spawned.place_tile(index, tile);
                let value = self.max_node(&spawned, depth - 1, deadline);
                worst = Some(worst.map_or(value, |w| w.min(value)));
            }
        }
        worst.unwrap_or_else(|| self.evaluator.evaluate_state(state))
    }
}

impl Agent for MinimaxAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Minimax
    }

    fn select_move(&mut self, state: &GameState) -> Option<Direction> {
        let best = best_candidate(self.evaluate_moves(state));
        log::debug!("minimax picked {best:?}");
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::test_boards;

    #[test]
    fn test_no_move_on_blocked_board() {
        let mut agent = MinimaxAgent::default();
        assert_eq!(agent.select_move(&test_boards::blocked()), None);
    }

    #[test]
    fn test_only_valid_move_is_chosen() {
        // Only Left and Right change this board; Up and Down are blocked.
        let state = test_boards::state([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [8, 8, 4, 2]]);
        let mut agent = MinimaxAgent::new(DepthConfig {
            max_depth: 2,
            time_limit_ms: None,
        });
        let picked = agent.select_move(&state).unwrap();
        assert!(matches!(picked, Direction::Left | Direction::Right));
    }

    #[test]
    fn test_depth_one_matches_manual_min() {
        let state = test_boards::state([[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]]);
        let agent = MinimaxAgent::new(DepthConfig {
            max_depth: 1,
            time_limit_ms: None,
        });
        let evaluator = presets::minimax();
        for (direction, value) in agent.evaluate_moves(&state) {
            let mut next = state.clone();
            assert!(next.apply_move(direction));
            let manual = next
                .board()
                .empty_cells()
                .iter()
                .flat_map(|&i| [2, 4].map(|t| (i, t)))
                .map(|(i, t)| {
                    let mut s = next.clone();
                    s.place_tile(i, t);
                    evaluator.evaluate_state(&s)
                })
                .fold(f32::INFINITY, f32::min);
            assert!((value - manual).abs() < 1e-3, "{direction}: {value} vs {manual}");
        }
    }

    #[test]
    fn test_expired_deadline_still_answers() {
        let mut agent = MinimaxAgent::new(DepthConfig {
            max_depth: 5,
            time_limit_ms: Some(0),
        });
        assert!(agent.select_move(&test_boards::midgame()).is_some());
    }
}
