use arena2048_engine::{Direction, GameState, SPAWN_TWO_PROBABILITY};
use arena2048_evaluator::{
    position_evaluator::{FeatureBasedEvaluator, PositionEvaluator as _},
    presets,
};
use arrayvec::ArrayVec;

use super::{Deadline, DepthConfig, afterstates, best_candidate};
use crate::{agent::Agent, kind::AgentKind, params::AgentParams};

#[expect(clippy::cast_possible_truncation)]
const TWO_WEIGHT: f32 = SPAWN_TWO_PROBABILITY as f32;
const FOUR_WEIGHT: f32 = 1.0 - TWO_WEIGHT;

/// Search against the real spawn distribution instead of the worst spawn.
///
/// Chance nodes average over every empty cell (uniformly) and both tile
/// values (2 at 90%, 4 at 10%).
#[derive(Debug, Clone)]
pub struct ExpectimaxAgent {
    config: DepthConfig,
    evaluator: FeatureBasedEvaluator,
}

impl Default for ExpectimaxAgent {
    fn default() -> Self {
        Self::new(DepthConfig::default())
    }
}

impl ExpectimaxAgent {
    #[must_use]
    pub fn new(config: DepthConfig) -> Self {
        Self {
            config,
            evaluator: presets::expectimax(),
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

    /// Expected value of every valid move, in canonical order.
    #[must_use]
    pub fn evaluate_moves(&self, state: &GameState) -> ArrayVec<(Direction, f32), 4> {
        let deadline = self.config.deadline();
        afterstates(state)
            .into_iter()
            .map(|(direction, next)| {
                (
                    direction,
                    self.chance_node(&next, self.config.max_depth, deadline),
                )
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
            .map(|(_, next)| self.chance_node(next, depth - 1, deadline))
            .reduce(f32::max)
            .unwrap_or_else(|| self.evaluator.evaluate_state(state))
    }

    fn chance_node(&self, state: &GameState, depth: u32, deadline: Deadline) -> f32 {
        if Self::is_leaf(state, depth, deadline) {
            return self.evaluator.evaluate_state(state);
        }
        let empty = state.board().empty_cells();
        if empty.is_empty() {
            return self.evaluator.evaluate_state(state);
        }
        #[expect(clippy::cast_precision_loss)]
        let cell_weight = 1.0 / empty.len() as f32;
        empty
            .iter()
            .map(|&index| {
                let [two, four] = [2, 4].map(|tile| {
                    let mut spawned = state.clone();
                    spawned.place_tile(index, tile);
                    self.max_node(&spawned, depth - 1, deadline)
                });
                cell_weight * (TWO_WEIGHT * two + FOUR_WEIGHT * four)
            })
            .sum()
    }
}

impl Agent for ExpectimaxAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Expectimax
    }

    fn select_move(&mut self, state: &GameState) -> Option<Direction> {
        let best = best_candidate(self.evaluate_moves(state));
        log::debug!("expectimax picked {best:?}");
        best
    }
}
