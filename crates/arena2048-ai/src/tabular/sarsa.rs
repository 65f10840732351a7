use arena2048_engine::{Direction, GameState};
use rand_pcg::Pcg32;

use super::{
    EpisodeReward, Fingerprint, QTable, TabularConfig, epsilon_greedy, q_learning::PendingStep,
    shaped_reward,
};
use crate::{agent::Agent, kind::AgentKind, params::AgentParams};

/// On-policy TD control: bootstraps from the action it is about to take.
#[derive(Debug, Clone)]
pub struct SarsaAgent {
    config: TabularConfig,
    table: QTable,
    pending: Option<PendingStep>,
    reward: EpisodeReward,
    rng: Pcg32,
}

impl SarsaAgent {
    #[must_use]
    pub fn new(config: TabularConfig, rng: Pcg32) -> Self {
        Self {
            config,
            table: QTable::default(),
            pending: None,
            reward: EpisodeReward::default(),
            rng,
        }
    }

    #[must_use]
    pub fn from_params(params: &AgentParams) -> Self {
        Self::new(TabularConfig::from_params(params), params.rng())
    }

    #[must_use]
    pub fn config(&self) -> &TabularConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut TabularConfig {
        &mut self.config
    }

    #[must_use]
    pub fn table(&self) -> &QTable {
        &self.table
    }

    pub fn set_table(&mut self, table: QTable) {
        self.table = table;
        self.pending = None;
    }

    #[must_use]
    pub fn last_episode_reward(&self) -> Option<f32> {
        self.reward.last()
    }
}

impl Agent for SarsaAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Sarsa
    }

    fn select_move(&mut self, state: &GameState) -> Option<Direction> {
        let fingerprint = Fingerprint::of(state.board());
        let valid = state.board().valid_moves();
        // Sampled once: the same action is the bootstrap target and the move played.
        let next = epsilon_greedy(
            &self.table.values(&fingerprint),
            &valid,
            self.config.epsilon,
            &mut self.rng,
        );

        if let Some(prev) = self.pending.take() {
            let reward = shaped_reward(prev.score, state);
            let bootstrap = next.map_or(0.0, |a| self.table.get(&fingerprint, a));
            let target = reward + self.config.discount_factor * bootstrap;
            self.table
                .update(prev.fingerprint, prev.action, target, self.config.learning_rate);
            self.reward.add(reward);
        }

        let action = next?;
        self.pending = Some(PendingStep {
            fingerprint,
            action,
            score: state.score(),
        });
        log::debug!("sarsa picked {action} at {fingerprint}");
        Some(action)
    }

    fn end_episode(&mut self, final_state: &GameState) {
        if let Some(prev) = self.pending.take() {
            let reward = shaped_reward(prev.score, final_state);
            self.table
                .update(prev.fingerprint, prev.action, reward, self.config.learning_rate);
            self.reward.add(reward);
        }
        self.reward.finish();
        log::info!(
            "sarsa episode done: score {}, {} states known",
            final_state.score(),
            self.table.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use arena2048_engine::Board;
    use rand::SeedableRng as _;

    use super::*;
    use crate::tabular::test_support;

    fn state(rows: [[u32; 4]; 4], score: u64) -> GameState {
        GameState::from_board(Board::from_rows(rows).unwrap(), score)
    }

    #[test]
    fn test_bootstraps_from_the_returned_action() {
        let mut agent = SarsaAgent::new(TabularConfig::default(), Pcg32::seed_from_u64(3));
        agent.config_mut().set_epsilon(0.0);
        let s0 = state([[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]], 0);
        let s1 = state([[4, 0, 0, 0], [2, 0, 0, 0], [0; 4], [0; 4]], 4);
        let fp1 = Fingerprint::of(s1.board());
        // Only Down and Right move s1, so the larger value on Up is ignored.
        agent.table.update(fp1, Direction::Up, 50.0, 1.0);
        agent.table.update(fp1, Direction::Right, 10.0, 1.0);

        let a0 = agent.select_move(&s0).unwrap();
        let a1 = agent.select_move(&s1).unwrap();
        assert_eq!(a1, Direction::Right);
        let expected = 0.1 * (5.4 + 0.9 * 10.0);
        let q = agent.table().get(&Fingerprint::of(s0.board()), a0);
        assert!((q - expected).abs() < 1e-4, "{q} vs {expected}");
    }

    #[test]
    fn test_table_grows_with_play() {
        let mut agent = SarsaAgent::new(TabularConfig::default(), Pcg32::seed_from_u64(8));
        let scores = test_support::train(&mut agent, 3, 5);
        assert_eq!(scores.len(), 3);
        assert!(!agent.table().is_empty());
    }
}
