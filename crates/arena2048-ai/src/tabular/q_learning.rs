use arena2048_engine::{Direction, GameState};
use rand_pcg::Pcg32;

use super::{EpisodeReward, Fingerprint, QTable, TabularConfig, epsilon_greedy, shaped_reward};
use crate::{agent::Agent, kind::AgentKind, params::AgentParams};

/// Decision made on the previous call, waiting for its reward.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PendingStep {
    pub(crate) fingerprint: Fingerprint,
    pub(crate) action: Direction,
    pub(crate) score: u64,
}

/// Off-policy TD control: bootstraps from the best action of the next state.
#[derive(Debug, Clone)]
pub struct QLearningAgent {
    config: TabularConfig,
    table: QTable,
    pending: Option<PendingStep>,
    reward: EpisodeReward,
    rng: Pcg32,
}

impl QLearningAgent {
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

    /// Replaces the learned values and forgets the step in progress.
    pub fn set_table(&mut self, table: QTable) {
        self.table = table;
        self.pending = None;
    }

    /// Total shaped reward of the last finished game.
    #[must_use]
    pub fn last_episode_reward(&self) -> Option<f32> {
        self.reward.last()
    }
}

impl Agent for QLearningAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::QLearning
    }

    fn select_move(&mut self, state: &GameState) -> Option<Direction> {
        let fingerprint = Fingerprint::of(state.board());
        if let Some(prev) = self.pending.take() {
            let reward = shaped_reward(prev.score, state);
            let target = reward + self.config.discount_factor * self.table.max_value(&fingerprint);
            self.table
                .update(prev.fingerprint, prev.action, target, self.config.learning_rate);
            self.reward.add(reward);
        }

        let valid = state.board().valid_moves();
        let action = epsilon_greedy(
            &self.table.values(&fingerprint),
            &valid,
            self.config.epsilon,
            &mut self.rng,
        )?;
        self.pending = Some(PendingStep {
            fingerprint,
            action,
            score: state.score(),
        });
        log::debug!("q-learning picked {action} at {fingerprint}");
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
            "q-learning episode done: score {}, {} states known",
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

    fn agent(epsilon: f32) -> QLearningAgent {
        let mut config = TabularConfig::default();
        config.set_epsilon(epsilon);
        QLearningAgent::new(config, Pcg32::seed_from_u64(1))
    }

    fn state(rows: [[u32; 4]; 4], score: u64) -> GameState {
        GameState::from_board(Board::from_rows(rows).unwrap(), score)
    }

    #[test]
    fn test_update_uses_reward_and_next_max() {
        let mut agent = agent(0.0);
        let s0 = state([[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]], 0);
        let s1 = state([[4, 0, 0, 0], [0; 4], [0; 4], [0, 0, 0, 2]], 4);
        let fp0 = Fingerprint::of(s0.board());
        let fp1 = Fingerprint::of(s1.board());
        // Seed a known value for the next state.
        agent.table.update(fp1, Direction::Down, 10.0, 1.0);

        let a0 = agent.select_move(&s0).unwrap();
        agent.select_move(&s1).unwrap();
        // reward 4 + 0.1·14, target reward + 0.9·10, α = 0.1
        let expected = 0.1 * (5.4 + 0.9 * 10.0);
        assert!((agent.table().get(&fp0, a0) - expected).abs() < 1e-4);
    }

    #[test]
    fn test_terminal_update_uses_reward_only() {
        let mut agent = agent(0.0);
        let s0 = state([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 0, 2]], 0);
        let a0 = agent.select_move(&s0).unwrap();
        let over = state([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]], 0);
        agent.end_episode(&over);
        let q = agent.table().get(&Fingerprint::of(s0.board()), a0);
        assert!((q - 0.1 * -100.0).abs() < 1e-4);
        assert!(agent.pending.is_none());
        assert_eq!(agent.last_episode_reward(), Some(-100.0));
    }

    #[test]
    fn test_table_grows_with_play() {
        let mut agent = agent(0.1);
        test_support::train(&mut agent, 3, 42);
        assert!(!agent.table().is_empty());
        assert!(agent.last_episode_reward().is_some());
    }

    #[test]
    fn test_no_move_on_blocked_board() {
        let mut agent = agent(1.0);
        let blocked = state([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]], 0);
        assert_eq!(agent.select_move(&blocked), None);
    }

    /// Seeded, so the comparison is deterministic.
    #[test]
    fn test_reward_improves_over_training() {
        let mut agent = agent(0.1);
        let mut rewards = Vec::new();
        let mut rng = arena2048_engine::SpawnSeed::from_u128(7).rng();
        for _ in 0..400 {
            let mut state = GameState::new(&mut rng);
            while let Some(direction) = agent.select_move(&state) {
                state.make_move(direction, &mut rng);
                if state.is_terminal() {
                    break;
                }
            }
            agent.end_episode(&state);
            rewards.push(agent.last_episode_reward().unwrap());
        }
        #[expect(clippy::cast_precision_loss)]
        let mean = |xs: &[f32]| xs.iter().sum::<f32>() / xs.len() as f32;
        assert!(mean(&rewards[300..]) >= mean(&rewards[..100]));
    }
}
