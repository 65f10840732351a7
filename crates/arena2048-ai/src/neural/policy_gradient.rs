use std::collections::BTreeMap;

use arena2048_engine::{Direction, GameState};
use ndarray::Array1;
use rand::SeedableRng as _;
use rand_pcg::Pcg32;

use super::{
    Adam, Approximator, Head, INPUT_LEN, Mlp, NeuralConfig, NeuralDefaults, discounted_returns,
    encode, fallback_move, normalize, sample_valid, take_network,
};
use crate::{agent::Agent, kind::AgentKind, params::AgentParams, snapshot::RestoreError};

pub const POLICY_NETWORK_SIZES: [usize; 4] = [INPUT_LEN, 32, 16, Direction::LEN];

const POLICY: &str = "policy";

const DEFAULTS: NeuralDefaults = NeuralDefaults {
    learning_rate: 0.001,
    learning_rate_range: 0.0001..=0.1,
    discount_factor: 0.99,
    epsilon: 0.0,
};

#[derive(Debug, Clone)]
pub struct PolicyModel {
    network: Mlp,
    adam: Adam,
}

/// REINFORCE over a softmax policy, rewarded with the final score.
#[derive(Debug, Clone)]
pub struct PolicyGradientAgent {
    config: NeuralConfig,
    approximator: Approximator<PolicyModel>,
    /// `(encoded state, action index)` of the current game.
    history: Vec<(Array1<f32>, usize)>,
    rng: Pcg32,
}

impl Default for PolicyGradientAgent {
    fn default() -> Self {
        Self::new(DEFAULTS.default_config(), Pcg32::from_rng(&mut rand::rng()))
    }
}

impl PolicyGradientAgent {
    #[must_use]
    pub fn new(config: NeuralConfig, mut rng: Pcg32) -> Self {
        let approximator = Approximator::new(config.backend, || PolicyModel {
            network: Mlp::new(&POLICY_NETWORK_SIZES, Head::Softmax, &mut rng),
            adam: Adam::new(config.learning_rate),
        });
        Self {
            config,
            approximator,
            history: Vec::new(),
            rng,
        }
    }

    #[must_use]
    pub fn from_params(params: &AgentParams) -> Self {
        Self::new(DEFAULTS.config(params), params.rng())
    }

    #[must_use]
    pub fn config(&self) -> &NeuralConfig {
        &self.config
    }

    pub fn set_learning_rate(&mut self, rate: f32) {
        self.config.learning_rate = DEFAULTS.clamp_learning_rate(Some(rate));
        if let Approximator::Learned(model) = &mut self.approximator {
            model.adam.set_learning_rate(self.config.learning_rate);
        }
    }

    pub fn set_discount_factor(&mut self, gamma: f32) {
        self.config.discount_factor = DEFAULTS.clamp_discount_factor(gamma);
    }

    /// Action probabilities in `state`, or `None` on the heuristic backend.
    #[must_use]
    pub fn policy(&self, state: &GameState) -> Option<Array1<f32>> {
        let model = self.approximator.learned()?;
        Some(model.network.forward(encode(state.board()).view()))
    }

    /// Applies one REINFORCE step over the recorded game and clears it.
    ///
    /// Returns are `final_reward·γ^(T−1−t)`, normalized before use.
    pub fn update_policy(&mut self, final_reward: f32) {
        let history = std::mem::take(&mut self.history);
        let Approximator::Learned(model) = &mut self.approximator else {
            return;
        };
        if history.is_empty() {
            return;
        }
        let mut returns =
            discounted_returns(final_reward, history.len(), self.config.discount_factor);
        normalize(&mut returns);
        let (inputs, actions): (Vec<_>, Vec<_>) = history.into_iter().unzip();
        model
            .network
            .policy_gradient_step(&mut model.adam, &inputs, &actions, &returns);
        log::info!("policy gradient updated on {} steps", inputs.len());
    }

    #[must_use]
    pub fn networks(&self) -> BTreeMap<String, Mlp> {
        self.approximator
            .learned()
            .map(|model| BTreeMap::from([(POLICY.to_owned(), model.network.clone())]))
            .unwrap_or_default()
    }

    /// Loads weights; an empty map selects the heuristic backend.
    pub fn restore_networks(
        &mut self,
        networks: &BTreeMap<String, Mlp>,
    ) -> Result<(), RestoreError> {
        self.approximator = if networks.is_empty() {
            Approximator::fallback()
        } else {
            let network = take_network(
                networks,
                AgentKind::PolicyGradient,
                POLICY,
                &POLICY_NETWORK_SIZES,
                Head::Softmax,
            )?;
            Approximator::Learned(PolicyModel {
                network,
                adam: Adam::new(self.config.learning_rate),
            })
        };
        self.history.clear();
        self.config.backend = self.approximator.backend();
        Ok(())
    }
}

impl Agent for PolicyGradientAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::PolicyGradient
    }

    fn select_move(&mut self, state: &GameState) -> Option<Direction> {
        let model = match &self.approximator {
            Approximator::HeuristicFallback(evaluator) => return fallback_move(evaluator, state),
            Approximator::Learned(model) => model,
        };
        let x = encode(state.board());
        let probs = model.network.forward(x.view());
        let valid = state.board().valid_moves();
        let direction = sample_valid(&probs, &valid, &mut self.rng)?;
        log::debug!(
            "policy gradient sampled {direction} (p = {:.3})",
            probs[direction.index()]
        );
        self.history.push((x, direction.index()));
        Some(direction)
    }

    fn end_episode(&mut self, final_state: &GameState) {
        #[expect(clippy::cast_precision_loss)]
        let reward = final_state.score() as f32;
        self.update_policy(reward);
    }
}

#[cfg(test)]
mod tests {
    use arena2048_engine::Board;
    use rand::SeedableRng as _;

    use super::*;
    use crate::neural::{NeuralBackend, test_support};

    fn agent(backend: NeuralBackend) -> PolicyGradientAgent {
        let config = NeuralConfig {
            backend,
            ..DEFAULTS.default_config()
        };
        PolicyGradientAgent::new(config, Pcg32::seed_from_u64(6))
    }

    #[test]
    fn test_samples_only_valid_moves() {
        let mut agent = agent(NeuralBackend::Mlp);
        // Only Left and Right change this board.
        let state = GameState::from_board(
            Board::from_rows([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [8, 8, 4, 2]]).unwrap(),
            0,
        );
        for _ in 0..20 {
            let d = agent.select_move(&state).unwrap();
            assert!(matches!(d, Direction::Left | Direction::Right));
        }
        assert_eq!(agent.history.len(), 20);
    }

    #[test]
    fn test_update_clears_history_and_changes_policy() {
        let mut agent = agent(NeuralBackend::Mlp);
        test_support::play(&mut agent, 1, 20, 8);
        assert!(agent.history.is_empty());

        let mut rng = Pcg32::seed_from_u64(0);
        let state = GameState::new(&mut rng);
        let before = agent.policy(&state).unwrap();
        for _ in 0..3 {
            agent.select_move(&state);
        }
        agent.select_move(&GameState::new(&mut rng));
        agent.update_policy(1000.0);
        let after = agent.policy(&state).unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn test_heuristic_backend_ignores_training() {
        let mut agent = agent(NeuralBackend::Heuristic);
        test_support::play(&mut agent, 1, 20, 8);
        agent.update_policy(100.0);
        assert!(agent.policy(&GameState::from_board(Board::EMPTY, 0)).is_none());
        assert!(agent.networks().is_empty());
    }
}
