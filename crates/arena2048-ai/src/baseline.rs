//! Agents without search or learning, used as reference points.

use arena2048_engine::{Direction, GameState};
use arena2048_evaluator::{position_evaluator::FeatureBasedEvaluator, presets, turn_evaluator};
use rand::seq::IndexedRandom as _;
use rand_pcg::Pcg32;

use crate::{agent::Agent, kind::AgentKind, params::AgentParams};

/// Picks uniformly among the moves that change the board.
#[derive(Debug, Clone)]
pub struct RandomAgent {
    rng: Pcg32,
}

impl RandomAgent {
    #[must_use]
    pub fn new(rng: Pcg32) -> Self {
        Self { rng }
    }

    #[must_use]
    pub fn from_params(params: &AgentParams) -> Self {
        Self::new(params.rng())
    }
}

impl Agent for RandomAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Random
    }

    fn select_move(&mut self, state: &GameState) -> Option<Direction> {
        state.board().valid_moves().choose(&mut self.rng).copied()
    }
}

/// Maximizes the score gained by the next move alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyAgent;

impl GreedyAgent {
    /// Score gained by every valid move, in canonical order.
    #[must_use]
    pub fn score_gains(state: &GameState) -> Vec<(Direction, u64)> {
        let board = state.board();
        Direction::ALL
            .into_iter()
            .filter_map(|direction| {
                let (next, gained) = board.slide(direction);
                (next != *board).then_some((direction, gained))
            })
            .collect()
    }
}

impl Agent for GreedyAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Greedy
    }

    fn select_move(&mut self, state: &GameState) -> Option<Direction> {
        let mut best: Option<(Direction, u64)> = None;
        for (direction, gained) in Self::score_gains(state) {
            if best.is_none_or(|(_, best_gain)| gained > best_gain) {
                best = Some((direction, gained));
            }
        }
        best.map(|(direction, _)| direction)
    }
}

/// One-ply evaluation with a fixed set of weights.
///
/// Both [`AgentKind::Heuristic`] and [`AgentKind::WeightedHeuristic`] are
/// instances; they differ only in the preset they evaluate with.
#[derive(Debug, Clone)]
pub struct HeuristicAgent {
    kind: AgentKind,
    evaluator: FeatureBasedEvaluator,
}

impl HeuristicAgent {
    /// Corner quadrant, monotonicity and free space, with a penalty for large
    /// tiles stuck in the centre.
    #[must_use]
    pub fn heuristic() -> Self {
        Self {
            kind: AgentKind::Heuristic,
            evaluator: presets::heuristic(),
        }
    }

    /// Adds smoothness and rewards keeping the max tile in its corner.
    #[must_use]
    pub fn weighted() -> Self {
        Self {
            kind: AgentKind::WeightedHeuristic,
            evaluator: presets::weighted(),
        }
    }

    #[must_use]
    pub fn evaluator(&self) -> &FeatureBasedEvaluator {
        &self.evaluator
    }
}

impl Agent for HeuristicAgent {
    fn kind(&self) -> AgentKind {
        self.kind
    }

    fn select_move(&mut self, state: &GameState) -> Option<Direction> {
        let (direction, value) = turn_evaluator::select_best_move(&self.evaluator, state)?;
        log::debug!("{} picked {direction} ({value:.1})", self.kind);
        Some(direction)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;

    use super::*;
    use crate::search::test_boards;

    #[test]
    fn test_random_only_picks_valid_moves() {
        let mut agent = RandomAgent::new(Pcg32::seed_from_u64(5));
        // Only Down and Right change this board.
        let state = test_boards::state([[2, 0, 0, 0], [0; 4], [0; 4], [0; 4]]);
        for _ in 0..50 {
            let picked = agent.select_move(&state).unwrap();
            assert!(matches!(picked, Direction::Down | Direction::Right));
        }
        assert_eq!(agent.select_move(&test_boards::blocked()), None);
    }

    #[test]
    fn test_greedy_takes_largest_merge() {
        // Left/Right merge the 8s (16), Up/Down merge the 2s (4).
        let state = test_boards::state([[8, 8, 0, 0], [2, 0, 0, 0], [2, 0, 0, 0], [0; 4]]);
        let gains = GreedyAgent::score_gains(&state);
        assert_eq!(
            gains,
            [
                (Direction::Up, 4),
                (Direction::Down, 4),
                (Direction::Left, 16),
                (Direction::Right, 16),
            ]
        );
        assert_eq!(GreedyAgent.select_move(&state), Some(Direction::Left));
    }

    #[test]
    fn test_greedy_without_merges_keeps_first_valid() {
        let state = test_boards::state([[2, 0, 0, 0], [0; 4], [0; 4], [0; 4]]);
        assert_eq!(GreedyAgent.select_move(&state), Some(Direction::Down));
        assert_eq!(GreedyAgent.select_move(&test_boards::blocked()), None);
    }

    #[test]
    fn test_heuristic_agents_follow_their_preset() {
        let state = test_boards::midgame();
        for mut agent in [HeuristicAgent::heuristic(), HeuristicAgent::weighted()] {
            let expected = turn_evaluator::select_best_move(agent.evaluator(), &state)
                .map(|(direction, _)| direction);
            assert!(expected.is_some());
            assert_eq!(agent.select_move(&state), expected);
        }
        assert_eq!(HeuristicAgent::weighted().kind(), AgentKind::WeightedHeuristic);
    }
}
