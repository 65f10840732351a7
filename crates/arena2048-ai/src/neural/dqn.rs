use std::collections::BTreeMap;

use arena2048_engine::{Direction, GameState};
use ndarray::Array1;
use rand::SeedableRng as _;
use rand_pcg::Pcg32;

use super::{
    Adam, Approximator, Head, INPUT_LEN, Mlp, NeuralConfig, NeuralDefaults, ReplayBuffer,
    action_values, encode, fallback_move, take_network,
};
use crate::{
    agent::Agent,
    kind::AgentKind,
    params::AgentParams,
    snapshot::RestoreError,
    tabular::{epsilon_greedy, shaped_reward},
};

pub const Q_NETWORK_SIZES: [usize; 4] = [INPUT_LEN, 64, 32, Direction::LEN];
pub const REPLAY_CAPACITY: usize = 10_000;
pub const REPLAY_BATCH_SIZE: usize = 32;
/// Training steps between copies of the Q-network into the target network.
pub const TARGET_UPDATE_STEPS: u64 = 100;

const Q_NETWORK: &str = "qNetwork";

const DEFAULTS: NeuralDefaults = NeuralDefaults {
    learning_rate: 0.001,
    learning_rate_range: 0.001..=0.1,
    discount_factor: 0.95,
    epsilon: 0.1,
};

#[derive(Debug, Clone)]
pub struct Transition {
    pub state: Array1<f32>,
    pub action: usize,
    pub reward: f32,
    pub next_state: Array1<f32>,
    pub done: bool,
}

#[derive(Debug, Clone)]
pub struct DqnModel {
    q_network: Mlp,
    target_network: Mlp,
    adam: Adam,
    replay: ReplayBuffer<Transition>,
    train_steps: u64,
}

impl DqnModel {
    fn new(q_network: Mlp, learning_rate: f32) -> Self {
        Self {
            target_network: q_network.clone(),
            q_network,
            adam: Adam::new(learning_rate),
            replay: ReplayBuffer::new(REPLAY_CAPACITY),
            train_steps: 0,
        }
    }

    #[must_use]
    pub fn replay(&self) -> &ReplayBuffer<Transition> {
        &self.replay
    }

    #[must_use]
    pub fn train_steps(&self) -> u64 {
        self.train_steps
    }

    /// One step on a replayed mini-batch, once enough transitions exist.
    fn train(&mut self, gamma: f32, rng: &mut Pcg32) {
        if self.replay.len() < REPLAY_BATCH_SIZE {
            return;
        }
        let mut inputs = Vec::with_capacity(REPLAY_BATCH_SIZE);
        let mut actions = Vec::with_capacity(REPLAY_BATCH_SIZE);
        let mut targets = Vec::with_capacity(REPLAY_BATCH_SIZE);
        for t in self.replay.sample(REPLAY_BATCH_SIZE, rng) {
            let bootstrap = if t.done {
                0.0
            } else {
                let next_q = self.target_network.forward(t.next_state.view());
                next_q.fold(f32::NEG_INFINITY, |m, &v| m.max(v))
            };
            inputs.push(t.state.clone());
            actions.push(t.action);
            targets.push(t.reward + gamma * bootstrap);
        }
        // Only the taken action's output has an error term.
        self.q_network
            .train_step(&mut self.adam, &inputs, |i, q| {
                let mut grad = Array1::zeros(q.len());
                grad[actions[i]] = q[actions[i]] - targets[i];
                grad
            });

        self.train_steps += 1;
        if self.train_steps % TARGET_UPDATE_STEPS == 0 {
            self.target_network = self.q_network.clone();
            log::debug!("dqn target network synced at step {}", self.train_steps);
        }
    }
}

#[derive(Debug, Clone)]
struct PendingStep {
    state: Array1<f32>,
    action: usize,
    score: u64,
}

/// Deep Q-learning with experience replay and a periodically synced target
/// network.
#[derive(Debug, Clone)]
pub struct DqnAgent {
    config: NeuralConfig,
    approximator: Approximator<DqnModel>,
    pending: Option<PendingStep>,
    rng: Pcg32,
}

impl Default for DqnAgent {
    fn default() -> Self {
        Self::new(DEFAULTS.default_config(), Pcg32::from_rng(&mut rand::rng()))
    }
}

impl DqnAgent {
    #[must_use]
    pub fn new(config: NeuralConfig, mut rng: Pcg32) -> Self {
        let approximator = Approximator::new(config.backend, || {
            let q_network = Mlp::new(&Q_NETWORK_SIZES, Head::Linear, &mut rng);
            DqnModel::new(q_network, config.learning_rate)
        });
        Self {
            config,
            approximator,
            pending: None,
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

    #[must_use]
    pub fn approximator(&self) -> &Approximator<DqnModel> {
        &self.approximator
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

    pub fn set_epsilon(&mut self, epsilon: f32) {
        self.config.epsilon = DEFAULTS.clamp_epsilon(epsilon);
    }

    /// Stores the pending transition ending in `next` and trains one step.
    fn remember(&mut self, next: &GameState, next_state: Array1<f32>, done: bool) {
        let Some(prev) = self.pending.take() else {
            return;
        };
        let Approximator::Learned(model) = &mut self.approximator else {
            return;
        };
        model.replay.push(Transition {
            state: prev.state,
            action: prev.action,
            reward: shaped_reward(prev.score, next),
            next_state,
            done,
        });
        model.train(self.config.discount_factor, &mut self.rng);
    }

    #[must_use]
    pub fn networks(&self) -> BTreeMap<String, Mlp> {
        self.approximator
            .learned()
            .map(|model| BTreeMap::from([(Q_NETWORK.to_owned(), model.q_network.clone())]))
            .unwrap_or_default()
    }

    /// Loads the Q-network (the target starts as a copy, replay starts
    /// empty); an empty map selects the heuristic backend.
    pub fn restore_networks(
        &mut self,
        networks: &BTreeMap<String, Mlp>,
    ) -> Result<(), RestoreError> {
        self.approximator = if networks.is_empty() {
            Approximator::fallback()
        } else {
            let q_network = take_network(
                networks,
                AgentKind::Dqn,
                Q_NETWORK,
                &Q_NETWORK_SIZES,
                Head::Linear,
            )?;
            Approximator::Learned(DqnModel::new(q_network, self.config.learning_rate))
        };
        self.pending = None;
        self.config.backend = self.approximator.backend();
        Ok(())
    }
}

impl Agent for DqnAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Dqn
    }

    fn select_move(&mut self, state: &GameState) -> Option<Direction> {
        if let Approximator::HeuristicFallback(evaluator) = &self.approximator {
            return fallback_move(evaluator, state);
        }
        let x = encode(state.board());
        self.remember(state, x.clone(), false);

        let Approximator::Learned(model) = &self.approximator else {
            return None;
        };
        let q = action_values(&model.q_network.forward(x.view()));
        let valid = state.board().valid_moves();
        let direction = epsilon_greedy(&q, &valid, self.config.epsilon, &mut self.rng)?;
        self.pending = Some(PendingStep {
            state: x,
            action: direction.index(),
            score: state.score(),
        });
        log::debug!("dqn picked {direction} (q = {:.2})", q[direction.index()]);
        Some(direction)
    }

    fn end_episode(&mut self, final_state: &GameState) {
        self.remember(final_state, encode(final_state.board()), true);
        if let Approximator::Learned(model) = &self.approximator {
            log::info!(
                "dqn episode done: score {}, {} transitions, {} training steps",
                final_state.score(),
                model.replay.len(),
                model.train_steps
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;

    use super::*;
    use crate::neural::{NeuralBackend, test_support};

    fn agent(backend: NeuralBackend) -> DqnAgent {
        let config = NeuralConfig {
            backend,
            ..DEFAULTS.default_config()
        };
        DqnAgent::new(config, Pcg32::seed_from_u64(12))
    }

    fn learned(agent: &DqnAgent) -> &DqnModel {
        agent.approximator().learned().unwrap()
    }

    #[test]
    fn test_learning_rate_floor() {
        let mut agent = agent(NeuralBackend::Mlp);
        agent.set_learning_rate(0.0001);
        assert!((agent.config().learning_rate - 0.001).abs() < f32::EPSILON);
        agent.set_epsilon(3.0);
        assert!((agent.config().epsilon - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_transitions_and_training_steps() {
        let mut agent = agent(NeuralBackend::Mlp);
        test_support::play(&mut agent, 1, 40, 4);
        let model = learned(&agent);
        let stored = model.replay().len();
        assert!(stored > 0);
        // Training starts once a full batch is stored.
        let expected_steps = stored.saturating_sub(REPLAY_BATCH_SIZE - 1);
        let expected_steps = u64::try_from(expected_steps).unwrap();
        assert_eq!(model.train_steps(), expected_steps);
        assert_eq!(
            model.replay().iter().filter(|t| t.done).count(),
            1,
            "exactly one terminal transition per game"
        );
    }

    #[test]
    fn test_target_network_syncs_every_hundred_steps() {
        let mut rng = Pcg32::seed_from_u64(1);
        let q_network = Mlp::new(&Q_NETWORK_SIZES, Head::Linear, &mut rng);
        let mut model = DqnModel::new(q_network, 0.01);
        for i in 0..REPLAY_BATCH_SIZE {
            model.replay.push(Transition {
                state: Array1::from_elem(INPUT_LEN, 0.1),
                action: i % Direction::LEN,
                reward: 1.0,
                next_state: Array1::from_elem(INPUT_LEN, 0.2),
                done: i % 2 == 0,
            });
        }
        for _ in 0..TARGET_UPDATE_STEPS - 1 {
            model.train(0.95, &mut rng);
        }
        assert_ne!(model.q_network, model.target_network);
        model.train(0.95, &mut rng);
        assert_eq!(model.q_network, model.target_network);
        model.train(0.95, &mut rng);
        assert_ne!(model.q_network, model.target_network);
    }

    #[test]
    fn test_heuristic_backend() {
        let donor = agent(NeuralBackend::Mlp);
        let mut agent = agent(NeuralBackend::Heuristic);
        test_support::play(&mut agent, 1, 20, 4);
        assert!(agent.approximator().learned().is_none());
        assert!(agent.networks().is_empty());
        agent.restore_networks(&donor.networks()).unwrap();
        assert!(agent.approximator().learned().is_some());
    }
}
