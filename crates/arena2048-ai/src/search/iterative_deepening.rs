use arena2048_engine::{Direction, GameState};
use arena2048_evaluator::{
    position_evaluator::{FeatureBasedEvaluator, PositionEvaluator as _},
    presets,
};

use super::{Deadline, DepthConfig, afterstates};
use crate::{agent::Agent, kind::AgentKind, params::AgentParams};

/// Depth-limited max-only search, repeated at depth 1, 2, ... up to
/// `max_depth`.
///
/// With a time limit the search is anytime: an iteration that would start
/// after the deadline is skipped and the best result so far is played.
#[derive(Debug, Clone)]
pub struct IterativeDeepeningAgent {
    config: DepthConfig,
    evaluator: FeatureBasedEvaluator,
}

impl Default for IterativeDeepeningAgent {
    fn default() -> Self {
        Self::new(DepthConfig::default())
    }
}

impl IterativeDeepeningAgent {
    #[must_use]
    pub fn new(config: DepthConfig) -> Self {
        Self {
            config,
            evaluator: presets::lookahead(),
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

    /// Best `(move, value)` over every completed iteration.
    #[must_use]
    pub fn search(&self, state: &GameState) -> Option<(Direction, f32)> {
        let deadline = self.config.deadline();
        let mut best: Option<(Direction, f32)> = None;
        for depth in 1..=self.config.max_depth {
            if depth > 1 && deadline.is_expired() {
                log::trace!("iterative deepening stopped before depth {depth}");
                break;
            }
            for (direction, next) in afterstates(state) {
                let value = self.depth_limited(&next, depth - 1, deadline);
                if best.is_none_or(|(_, best_value)| value > best_value) {
                    best = Some((direction, value));
                }
            }
        }
        best
    }

    fn depth_limited(&self, state: &GameState, depth: u32, deadline: Deadline) -> f32 {
        if depth == 0 || deadline.is_expired() {
            return self.evaluator.evaluate_state(state);
        }
        afterstates(state)
            .iter()
            .map(|(_, next)| self.depth_limited(next, depth - 1, deadline))
            .reduce(f32::max)
            .unwrap_or_else(|| self.evaluator.evaluate_state(state))
    }
}

impl Agent for IterativeDeepeningAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::IterativeDeepening
    }

    fn select_move(&mut self, state: &GameState) -> Option<Direction> {
        let best = self.search(state).map(|(direction, _)| direction);
        log::debug!("iterative deepening picked {best:?}");
        best
    }
}

#[cfg(test)]
mod tests {
    use arena2048_evaluator::turn_evaluator;

    use super::*;
    use crate::search::test_boards;

    #[test]
    fn test_depth_one_matches_one_ply_selection() {
        let state = test_boards::midgame();
        let agent = IterativeDeepeningAgent::new(DepthConfig {
            max_depth: 1,
            time_limit_ms: None,
        });
        let expected = turn_evaluator::select_best_move(&presets::lookahead(), &state);
        assert_eq!(agent.search(&state), expected);
    }

    #[test]
    fn test_later_iterations_only_improve() {
        let state = test_boards::midgame();
        let values = (1..=3)
            .map(|max_depth| {
                let agent = IterativeDeepeningAgent::new(DepthConfig {
                    max_depth,
                    time_limit_ms: None,
                });
                agent.search(&state).unwrap().1
            })
            .collect::<Vec<_>>();
        assert!(values.windows(2).all(|w| w[1] >= w[0]), "{values:?}");
    }

    #[test]
    fn test_expired_deadline_returns_first_iteration() {
        let state = test_boards::midgame();
        let mut agent = IterativeDeepeningAgent::new(DepthConfig {
            max_depth: 5,
            time_limit_ms: Some(0),
        });
        assert!(agent.select_move(&state).is_some());
    }

    #[test]
    fn test_no_move_on_blocked_board() {
        let mut agent = IterativeDeepeningAgent::default();
        assert_eq!(agent.select_move(&test_boards::blocked()), None);
    }
}
