use arena2048_engine::{Direction, GameState};
use arena2048_evaluator::{
    position_evaluator::{FeatureBasedEvaluator, PositionEvaluator as _},
    presets,
};
use arrayvec::ArrayVec;

use super::{Deadline, DepthConfig, afterstates, best_candidate};
use crate::{agent::Agent, kind::AgentKind, params::AgentParams};

/// Minimax with alpha-beta pruning.
///
/// Each root candidate is searched with a full `(-∞, +∞)` window, so the
/// root values, and therefore the chosen move, equal plain minimax; pruning
/// only skips subtrees that cannot change them.
#[derive(Debug, Clone)]
pub struct AlphaBetaAgent {
    config: DepthConfig,
    evaluator: FeatureBasedEvaluator,
}

impl Default for AlphaBetaAgent {
    fn default() -> Self {
        Self::new(DepthConfig::default())
    }
}

impl AlphaBetaAgent {
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

    #[must_use]
    pub fn evaluate_moves(&self, state: &GameState) -> ArrayVec<(Direction, f32), 4> {
        let deadline = self.config.deadline();
        afterstates(state)
            .into_iter()
            .map(|(direction, next)| {
                let value = self.min_node(
                    &next,
                    self.config.max_depth,
                    f32::NEG_INFINITY,
                    f32::INFINITY,
                    deadline,
                );
                (direction, value)
            })
            .collect()
    }

    fn is_leaf(state: &GameState, depth: u32, deadline: Deadline) -> bool {
        depth == 0 || deadline.is_expired() || !state.has_any_valid_move()
    }

    fn max_node(
        &self,
        state: &GameState,
        depth: u32,
        mut alpha: f32,
        beta: f32,
        deadline: Deadline,
    ) -> f32 {
        if Self::is_leaf(state, depth, deadline) {
            return self.evaluator.evaluate_state(state);
        }
        let children = afterstates(state);
        if children.is_empty() {
            return self.evaluator.evaluate_state(state);
        }
        let mut best = f32::NEG_INFINITY;
        for (_, next) in &children {
            best = best.max(self.min_node(next, depth - 1, alpha, beta, deadline));
            alpha = alpha.max(best);
            if beta <= alpha {
                log::trace!("beta cutoff at depth {depth}");
                break;
            }
        }
        best
    }

    fn min_node(
        &self,
        state: &GameState,
        depth: u32,
        alpha: f32,
        mut beta: f32,
        deadline: Deadline,
    ) -> f32 {
        if Self::is_leaf(state, depth, deadline) {
            return self.evaluator.evaluate_state(state);
        }
        let empty = state.board().empty_cells();
        if empty.is_empty() {
            return self.evaluator.evaluate_state(state);
        }
        let mut worst = f32::INFINITY;
        'cells: for index in empty {
            for tile in [2, 4] {
                let mut spawned = state.clone();
                spawned.place_tile(index, tile);
                worst = worst.min(self.max_node(&spawned, depth - 1, alpha, beta, deadline));
                beta = beta.min(worst);
                if beta <= alpha {
                    log::trace!("alpha cutoff at depth {depth}");
                    break 'cells;
                }
            }
        }
        worst
    }
}

impl Agent for AlphaBetaAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::AlphaBeta
    }

    fn select_move(&mut self, state: &GameState) -> Option<Direction> {
        let best = best_candidate(self.evaluate_moves(state));
        log::debug!("alpha-beta picked {best:?}");
        best
    }
}

#[cfg(test)]
mod tests {
    use arena2048_engine::SpawnSeed;
    use rand::{Rng as _, SeedableRng as _};
    use rand_pcg::Pcg32;

    use super::*;
    use crate::search::{MinimaxAgent, test_boards};

    #[test]
    fn test_agrees_with_minimax_on_random_positions() {
        let mut rng = Pcg32::seed_from_u64(2048);
        for depth in 1..=2 {
            let config = DepthConfig {
                max_depth: depth,
                time_limit_ms: None,
            };
            let minimax = MinimaxAgent::new(config);
            let mut alpha_beta = AlphaBetaAgent::new(config);

            let mut spawn_rng = SpawnSeed::from_u128(u128::from(depth)).rng();
            let mut state = GameState::new(&mut spawn_rng);
            for _ in 0..40 {
                if state.is_terminal() {
                    break;
                }
                let expected = minimax.evaluate_moves(&state);
                let actual = alpha_beta.evaluate_moves(&state);
                assert_eq!(expected.len(), actual.len());
                for ((d1, v1), (d2, v2)) in expected.iter().zip(&actual) {
                    assert_eq!(d1, d2);
                    assert!((v1 - v2).abs() < 1e-3, "depth {depth}: {v1} vs {v2}");
                }
                let mut minimax = minimax.clone();
                assert_eq!(alpha_beta.select_move(&state), minimax.select_move(&state));

                let moves = state.board().valid_moves();
                let direction = moves[rng.random_range(0..moves.len())];
                state.make_move(direction, &mut spawn_rng);
            }
        }
    }

    #[test]
    fn test_no_move_on_blocked_board() {
        let mut agent = AlphaBetaAgent::default();
        assert_eq!(agent.select_move(&test_boards::blocked()), None);
    }

    #[test]
    fn test_depth_three_midgame() {
        let mut agent = AlphaBetaAgent::default();
        let mut minimax = MinimaxAgent::default();
        let state = test_boards::midgame();
        assert_eq!(agent.select_move(&state), minimax.select_move(&state));
    }
}
