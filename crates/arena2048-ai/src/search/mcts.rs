use std::ops::RangeInclusive;

use arena2048_engine::{Direction, GameState};
use arena2048_evaluator::{
    position_evaluator::{FeatureBasedEvaluator, PositionEvaluator as _},
    presets,
};
use arrayvec::ArrayVec;
use rand::Rng as _;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::monte_carlo::{PLAYOUT_MOVE_LIMIT, SamplingConfig, random_playout};
use crate::{
    agent::Agent,
    kind::AgentKind,
    params::{AgentParams, clamp_or},
};

pub const DEFAULT_EXPLORATION_CONSTANT: f64 = 1.41;
pub const EXPLORATION_CONSTANT_RANGE: RangeInclusive<f64> = 0.5..=2.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MctsConfig {
    pub sampling: SamplingConfig,
    pub exploration_constant: f64,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            sampling: SamplingConfig::default(),
            exploration_constant: DEFAULT_EXPLORATION_CONSTANT,
        }
    }
}

impl MctsConfig {
    #[must_use]
    pub fn from_params(params: &AgentParams) -> Self {
        Self {
            sampling: SamplingConfig::from_params(params),
            exploration_constant: clamp_or(
                params.exploration_constant,
                DEFAULT_EXPLORATION_CONSTANT,
                EXPLORATION_CONSTANT_RANGE,
            ),
        }
    }

    pub fn set_exploration_constant(&mut self, c: f64) {
        self.exploration_constant =
            clamp_or(Some(c), DEFAULT_EXPLORATION_CONSTANT, EXPLORATION_CONSTANT_RANGE);
    }
}

#[derive(Debug, Clone)]
struct Node {
    state: GameState,
    parent: Option<usize>,
    mv: Option<Direction>,
    children: Vec<usize>,
    untried: ArrayVec<Direction, 4>,
    visits: u32,
    value: f64,
}

impl Node {
    fn new(state: GameState, parent: Option<usize>, mv: Option<Direction>) -> Self {
        let untried = if state.is_terminal() {
            ArrayVec::new()
        } else {
            state.board().valid_moves()
        };
        Self {
            state,
            parent,
            mv,
            children: Vec::new(),
            untried,
            visits: 0,
            value: 0.0,
        }
    }
}

/// Search tree stored as a flat arena; nodes refer to each other by index.
#[derive(Debug)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    const ROOT: usize = 0;

    fn new(root: GameState) -> Self {
        Self {
            nodes: vec![Node::new(root, None, None)],
        }
    }

    fn ucb(&self, child: usize, parent_visits: u32, c: f64) -> f64 {
        let node = &self.nodes[child];
        if node.visits == 0 {
            return f64::INFINITY;
        }
        let visits = f64::from(node.visits);
        node.value / visits + c * (f64::from(parent_visits).ln() / visits).sqrt()
    }

    /// Descends through fully expanded nodes, following the highest UCB1.
    fn select(&self, c: f64) -> usize {
        let mut current = Self::ROOT;
        loop {
            let node = &self.nodes[current];
            if !node.untried.is_empty() || node.children.is_empty() {
                return current;
            }
            let mut best = node.children[0];
            let mut best_ucb = f64::NEG_INFINITY;
            for &child in &node.children {
                let ucb = self.ucb(child, node.visits, c);
                if ucb > best_ucb {
                    best = child;
                    best_ucb = ucb;
                }
            }
            current = best;
        }
    }

    fn expand(&mut self, index: usize, rng: &mut Pcg32) -> usize {
        let untried = &mut self.nodes[index].untried;
        if untried.is_empty() {
            return index;
        }
        let pick = rng.random_range(0..untried.len());
        let direction = untried.swap_remove(pick);
        let mut state = self.nodes[index].state.clone();
        state.make_move(direction, rng);
        let child = self.nodes.len();
        self.nodes.push(Node::new(state, Some(index), Some(direction)));
        self.nodes[index].children.push(child);
        child
    }

    fn backpropagate(&mut self, mut index: usize, value: f64) {
        loop {
            let node = &mut self.nodes[index];
            node.visits += 1;
            node.value += value;
            match node.parent {
                Some(parent) => index = parent,
                None => break,
            }
        }
    }

    /// The most-visited root child; the earliest expanded wins ties.
    fn best_move(&self) -> Option<Direction> {
        let root = &self.nodes[Self::ROOT];
        let mut best: Option<&Node> = None;
        for &child in &root.children {
            let node = &self.nodes[child];
            if best.is_none_or(|b| node.visits > b.visits) {
                best = Some(node);
            }
        }
        best.and_then(|node| node.mv)
    }
}

/// Monte Carlo tree search with UCB1 selection and random rollouts scored
/// by the `rollout` preset.
#[derive(Debug, Clone)]
pub struct MctsAgent {
    config: MctsConfig,
    evaluator: FeatureBasedEvaluator,
    rng: Pcg32,
}

impl MctsAgent {
    #[must_use]
    pub fn new(config: MctsConfig, rng: Pcg32) -> Self {
        Self {
            config,
            evaluator: presets::rollout(),
            rng,
        }
    }

    #[must_use]
    pub fn from_params(params: &AgentParams) -> Self {
        Self::new(MctsConfig::from_params(params), params.rng())
    }

    #[must_use]
    pub fn config(&self) -> &MctsConfig {
        &self.config
    }

    pub fn set_simulations(&mut self, simulations: u32) {
        self.config.sampling.set_simulations(simulations);
    }

    pub fn set_exploration_constant(&mut self, c: f64) {
        self.config.set_exploration_constant(c);
    }

    fn build_tree(&mut self, state: &GameState) -> Tree {
        let deadline = self.config.sampling.deadline();
        let c = self.config.exploration_constant;
        let mut tree = Tree::new(state.clone());
        for iteration in 0..self.config.sampling.simulations {
            if iteration > 0 && deadline.is_expired() {
                log::trace!("mcts stopped after {iteration} iterations");
                break;
            }
            let leaf = tree.select(c);
            let node = tree.expand(leaf, &mut self.rng);
            let mut rollout = tree.nodes[node].state.clone();
            random_playout(&mut rollout, &mut self.rng, PLAYOUT_MOVE_LIMIT);
            let value = f64::from(self.evaluator.evaluate_state(&rollout));
            tree.backpropagate(node, value);
        }
        tree
    }
}

impl Agent for MctsAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Mcts
    }

    fn select_move(&mut self, state: &GameState) -> Option<Direction> {
        if !state.has_any_valid_move() {
            return None;
        }
        let tree = self.build_tree(state);
        let best = tree.best_move();
        log::debug!(
            "mcts picked {best:?} after {} root visits",
            tree.nodes[Tree::ROOT].visits
        );
        best
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;

    use super::*;
    use crate::search::test_boards;

    fn agent(simulations: u32) -> MctsAgent {
        let mut config = MctsConfig::default();
        config.sampling.simulations = simulations;
        MctsAgent::new(config, Pcg32::seed_from_u64(11))
    }

    #[test]
    fn test_visit_accounting() {
        let mut agent = agent(40);
        let tree = agent.build_tree(&test_boards::midgame());
        let root = &tree.nodes[Tree::ROOT];
        assert_eq!(root.visits, 40);
        let child_visits = root
            .children
            .iter()
            .map(|&c| tree.nodes[c].visits)
            .sum::<u32>();
        assert_eq!(child_visits, 40);
        for (index, node) in tree.nodes.iter().enumerate().skip(1) {
            let parent = node.parent.unwrap();
            assert!(tree.nodes[parent].children.contains(&index));
            assert!(node.visits >= node.children.iter().map(|&c| tree.nodes[c].visits).sum());
        }
    }

    #[test]
    fn test_every_root_move_is_tried() {
        let state = test_boards::midgame();
        let mut agent = agent(20);
        let tree = agent.build_tree(&state);
        assert_eq!(
            tree.nodes[Tree::ROOT].children.len(),
            state.board().valid_moves().len()
        );
        assert!(agent.select_move(&state).is_some());
    }

    #[test]
    fn test_unvisited_child_has_infinite_ucb() {
        let mut tree = Tree::new(test_boards::midgame());
        let mut rng = Pcg32::seed_from_u64(0);
        let child = tree.expand(Tree::ROOT, &mut rng);
        assert!(tree.ucb(child, 1, 1.41).is_infinite());
    }

    #[test]
    fn test_exploration_constant_is_clamped() {
        let mut config = MctsConfig::default();
        config.set_exploration_constant(10.0);
        assert!((config.exploration_constant - 2.0).abs() < f64::EPSILON);
        config.set_exploration_constant(f64::NAN);
        assert!((config.exploration_constant - DEFAULT_EXPLORATION_CONSTANT).abs() < f64::EPSILON);
    }

    #[test]
    fn test_no_move_on_blocked_board() {
        assert_eq!(agent(10).select_move(&test_boards::blocked()), None);
    }
}
