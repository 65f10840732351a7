use std::{
    cmp::Ordering,
    collections::{BinaryHeap, HashSet},
};

use arena2048_engine::{Board, Direction, GameState};
use arena2048_evaluator::{
    position_evaluator::{FeatureBasedEvaluator, PositionEvaluator as _},
    presets,
};

use super::{DepthConfig, afterstates};
use crate::{agent::Agent, kind::AgentKind, params::AgentParams};

/// Best-first search over afterstates, with `g` = plies from the root and
/// `h` = the negated `astar` preset.
///
/// Spawns are ignored, so this is a planner over what the player controls.
/// The first move of the lowest-`f` node generated anywhere in the search is
/// played.
#[derive(Debug, Clone)]
pub struct AStarAgent {
    config: DepthConfig,
    evaluator: FeatureBasedEvaluator,
}

#[derive(Debug)]
struct OpenNode {
    state: GameState,
    first_move: Direction,
    g: u32,
    f: f32,
    seq: u64,
}

// Ordered so that `BinaryHeap` pops the lowest `f`, oldest first.
impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for OpenNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenNode {}

impl Default for AStarAgent {
    fn default() -> Self {
        Self::new(DepthConfig::default())
    }
}

impl AStarAgent {
    #[must_use]
    pub fn new(config: DepthConfig) -> Self {
        Self {
            config,
            evaluator: presets::astar(),
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

    fn f_score(&self, state: &GameState, g: u32) -> f32 {
        #[expect(clippy::cast_precision_loss)]
        let g = g as f32;
        g - self.evaluator.evaluate_state(state)
    }

    /// Runs the search and returns the chosen move with its `f` value.
    #[must_use]
    pub fn search(&self, state: &GameState) -> Option<(Direction, f32)> {
        let deadline = self.config.deadline();
        let mut open = BinaryHeap::new();
        let mut closed = HashSet::<Board>::new();
        let mut seq = 0_u64;
        let mut best: Option<(Direction, f32)> = None;

        closed.insert(*state.board());
        for (direction, next) in afterstates(state) {
            let f = self.f_score(&next, 1);
            if best.is_none_or(|(_, best_f)| f < best_f) {
                best = Some((direction, f));
            }
            open.push(OpenNode {
                state: next,
                first_move: direction,
                g: 1,
                f,
                seq,
            });
            seq += 1;
        }

        let mut expanded = 0_usize;
        while let Some(node) = open.pop() {
            if node.g >= self.config.max_depth || deadline.is_expired() {
                break;
            }
            if !closed.insert(*node.state.board()) {
                continue;
            }
            expanded += 1;
            for (_, child) in afterstates(&node.state) {
                if closed.contains(child.board()) {
                    continue;
                }
                let g = node.g + 1;
                let f = self.f_score(&child, g);
                if best.is_none_or(|(_, best_f)| f < best_f) {
                    best = Some((node.first_move, f));
                }
                open.push(OpenNode {
                    state: child,
                    first_move: node.first_move,
                    g,
                    f,
                    seq,
                });
                seq += 1;
            }
        }
        log::trace!("a* expanded {expanded} nodes");
        best
    }
}

impl Agent for AStarAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::AStar
    }

    fn select_move(&mut self, state: &GameState) -> Option<Direction> {
        let best = self.search(state).map(|(direction, _)| direction);
        log::debug!("a* picked {best:?}");
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::test_boards;

    fn node(f: f32, seq: u64) -> OpenNode {
        OpenNode {
            state: test_boards::blocked(),
            first_move: Direction::Up,
            g: 1,
            f,
            seq,
        }
    }

    #[test]
    fn test_heap_pops_lowest_f_then_oldest() {
        let mut heap = BinaryHeap::from([node(3.0, 0), node(-1.0, 2), node(-1.0, 1), node(0.5, 3)]);
        let order = std::iter::from_fn(|| heap.pop().map(|n| n.seq)).collect::<Vec<_>>();
        assert_eq!(order, [1, 2, 3, 0]);
    }

    #[test]
    fn test_no_move_on_blocked_board() {
        let mut agent = AStarAgent::default();
        assert_eq!(agent.select_move(&test_boards::blocked()), None);
    }

    #[test]
    fn test_single_level_picks_best_afterstate() {
        let state = test_boards::midgame();
        let agent = AStarAgent::new(DepthConfig {
            max_depth: 1,
            time_limit_ms: None,
        });
        let evaluator = presets::astar();
        let expected = afterstates(&state)
            .into_iter()
            .map(|(d, next)| (d, 1.0 - evaluator.evaluate_state(&next)))
            .fold(None::<(Direction, f32)>, |best, (d, f)| match best {
                Some((_, bf)) if bf <= f => best,
                _ => Some((d, f)),
            });
        assert_eq!(agent.search(&state), expected);
    }

    #[test]
    fn test_deeper_search_never_worsens_f() {
        let state = test_boards::midgame();
        let shallow = AStarAgent::new(DepthConfig {
            max_depth: 1,
            time_limit_ms: None,
        });
        let deep = AStarAgent::new(DepthConfig {
            max_depth: 3,
            time_limit_ms: None,
        });
        let (_, f1) = shallow.search(&state).unwrap();
        let (_, f3) = deep.search(&state).unwrap();
        assert!(f3 <= f1);
    }
}
