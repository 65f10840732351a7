use arena2048_engine::{Direction, GameState};

use super::{EpisodeReward, Fingerprint, TabularConfig, ValueTable, shaped_reward};
use crate::{agent::Agent, kind::AgentKind, params::AgentParams};

/// Trace weights below this are dropped.
const TRACE_CUTOFF: f32 = 1e-4;

/// TD(λ) prediction of state values, acting greedily on the value of each
/// move's afterstate fingerprint.
#[derive(Debug, Clone)]
pub struct TdLearningAgent {
    config: TabularConfig,
    table: ValueTable,
    /// Fingerprints seen this episode, oldest first.
    trace: Vec<Fingerprint>,
    prev_score: u64,
    reward: EpisodeReward,
}

impl TdLearningAgent {
    #[must_use]
    pub fn new(config: TabularConfig) -> Self {
        Self {
            config,
            table: ValueTable::default(),
            trace: Vec::new(),
            prev_score: 0,
            reward: EpisodeReward::default(),
        }
    }

    #[must_use]
    pub fn from_params(params: &AgentParams) -> Self {
        Self::new(TabularConfig::from_params(params))
    }

    #[must_use]
    pub fn config(&self) -> &TabularConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut TabularConfig {
        &mut self.config
    }

    #[must_use]
    pub fn table(&self) -> &ValueTable {
        &self.table
    }

    pub fn set_table(&mut self, table: ValueTable) {
        self.table = table;
        self.trace.clear();
    }

    #[must_use]
    pub fn last_episode_reward(&self) -> Option<f32> {
        self.reward.last()
    }

    /// Credits `α·δ·(γλ)^k` to the state visited `k` steps ago.
    fn propagate(&mut self, delta: f32) {
        let decay = self.config.discount_factor * self.config.lambda;
        let mut weight = 1.0;
        for &fingerprint in self.trace.iter().rev() {
            if weight < TRACE_CUTOFF {
                break;
            }
            self.table
                .add(fingerprint, self.config.learning_rate * delta * weight);
            weight *= decay;
        }
    }

    fn best_afterstate(&self, state: &GameState) -> Option<(Direction, f32)> {
        let mut best: Option<(Direction, f32)> = None;
        for direction in Direction::ALL {
            let mut next = state.clone();
            if !next.apply_move(direction) {
                continue;
            }
            let value = self.table.get(&Fingerprint::of(next.board()));
            if best.is_none_or(|(_, best_value)| value > best_value) {
                best = Some((direction, value));
            }
        }
        best
    }
}

impl Agent for TdLearningAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::TdLearning
    }

    fn select_move(&mut self, state: &GameState) -> Option<Direction> {
        let fingerprint = Fingerprint::of(state.board());
        if let Some(&prev) = self.trace.last() {
            let reward = shaped_reward(self.prev_score, state);
            let delta = reward + self.config.discount_factor * self.table.get(&fingerprint)
                - self.table.get(&prev);
            self.propagate(delta);
            self.reward.add(reward);
        }
        self.trace.push(fingerprint);
        self.prev_score = state.score();

        let (direction, value) = self.best_afterstate(state)?;
        log::debug!("td-learning picked {direction} (value {value})");
        Some(direction)
    }

    fn end_episode(&mut self, final_state: &GameState) {
        if let Some(&prev) = self.trace.last() {
            let reward = shaped_reward(self.prev_score, final_state);
            let delta = reward - self.table.get(&prev);
            self.propagate(delta);
            self.reward.add(reward);
        }
        self.trace.clear();
        self.prev_score = 0;
        self.reward.finish();
        log::info!(
            "td-learning episode done: score {}, {} states known",
            final_state.score(),
            self.table.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use arena2048_engine::Board;

    use super::*;
    use crate::tabular::test_support;

    fn state(rows: [[u32; 4]; 4], score: u64) -> GameState {
        GameState::from_board(Board::from_rows(rows).unwrap(), score)
    }

    fn config(lambda: f32) -> TabularConfig {
        let mut config = TabularConfig::default();
        config.set_lambda(lambda);
        config
    }

    #[test]
    fn test_trace_reaches_earlier_states() {
        let s0 = state([[2, 0, 0, 0], [0; 4], [0; 4], [0; 4]], 0);
        let s1 = state([[2, 0, 0, 0], [2, 0, 0, 0], [0; 4], [0; 4]], 0);
        let over = state([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]], 0);
        let fp0 = Fingerprint::of(s0.board());
        let fp1 = Fingerprint::of(s1.board());

        let mut agent = TdLearningAgent::new(config(0.5));
        agent.select_move(&s0);
        agent.select_move(&s1);
        // s0 → s1: reward 0.1·14 = 1.4, both values 0.
        let v0 = agent.table().get(&fp0);
        assert!((v0 - 0.14).abs() < 1e-5);

        agent.end_episode(&over);
        // δ = −100 − 0; s1 gets α·δ, s0 gets α·δ·γλ on top.
        assert!((agent.table().get(&fp1) + 10.0).abs() < 1e-4);
        assert!((agent.table().get(&fp0) - (0.14 - 10.0 * 0.45)).abs() < 1e-4);
        assert!(agent.trace.is_empty());
    }

    #[test]
    fn test_lambda_zero_is_td0() {
        let s0 = state([[2, 0, 0, 0], [0; 4], [0; 4], [0; 4]], 0);
        let s1 = state([[2, 0, 0, 0], [2, 0, 0, 0], [0; 4], [0; 4]], 0);
        let over = state([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]], 0);
        let mut agent = TdLearningAgent::new(config(0.0));
        agent.select_move(&s0);
        agent.select_move(&s1);
        agent.end_episode(&over);
        assert!((agent.table().get(&Fingerprint::of(s0.board())) - 0.14).abs() < 1e-5);
    }

    #[test]
    fn test_picks_highest_afterstate_value() {
        let s = state([[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]], 0);
        let mut agent = TdLearningAgent::new(TabularConfig::default());
        let mut right = s.clone();
        right.apply_move(Direction::Right);
        agent.table.add(Fingerprint::of(right.board()), 3.0);
        assert_eq!(agent.select_move(&s), Some(Direction::Right));
    }

    #[test]
    fn test_plays_full_games() {
        let mut agent = TdLearningAgent::new(TabularConfig::default());
        test_support::train(&mut agent, 2, 13);
        assert!(!agent.table().is_empty());
        assert!(agent.last_episode_reward().is_some());
    }
}
