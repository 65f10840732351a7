use std::collections::BTreeMap;

use arena2048_engine::{Direction, GameState};
use ndarray::{Array1, array};
use rand::SeedableRng as _;
use rand_pcg::Pcg32;

use super::{
    Adam, Approximator, Head, INPUT_LEN, Mlp, NeuralConfig, NeuralDefaults, discounted_returns,
    encode, fallback_move, normalize, sample_valid, take_network,
};
use crate::{agent::Agent, kind::AgentKind, params::AgentParams, snapshot::RestoreError};

pub const ACTOR_SIZES: [usize; 4] = [INPUT_LEN, 32, 16, Direction::LEN];
pub const CRITIC_SIZES: [usize; 4] = [INPUT_LEN, 32, 16, 1];

const ACTOR: &str = "actor";
const CRITIC: &str = "critic";

const DEFAULTS: NeuralDefaults = NeuralDefaults {
    learning_rate: 0.001,
    learning_rate_range: 0.0001..=0.1,
    discount_factor: 0.99,
    epsilon: 0.0,
};

#[derive(Debug, Clone)]
pub struct ActorCriticModel {
    actor: Mlp,
    critic: Mlp,
    actor_adam: Adam,
    critic_adam: Adam,
}

impl ActorCriticModel {
    fn new(actor: Mlp, critic: Mlp, learning_rate: f32) -> Self {
        Self {
            actor,
            critic,
            actor_adam: Adam::new(learning_rate),
            critic_adam: Adam::new(learning_rate),
        }
    }

    fn value(&self, x: &Array1<f32>) -> f32 {
        self.critic.forward(x.view())[0]
    }
}

/// Softmax actor trained on TD-error advantages from a value critic.
#[derive(Debug, Clone)]
pub struct ActorCriticAgent {
    config: NeuralConfig,
    approximator: Approximator<ActorCriticModel>,
    history: Vec<(Array1<f32>, usize)>,
    rng: Pcg32,
}

impl Default for ActorCriticAgent {
    fn default() -> Self {
        Self::new(DEFAULTS.default_config(), Pcg32::from_rng(&mut rand::rng()))
    }
}

impl ActorCriticAgent {
    #[must_use]
    pub fn new(config: NeuralConfig, mut rng: Pcg32) -> Self {
        let approximator = Approximator::new(config.backend, || {
            let actor = Mlp::new(&ACTOR_SIZES, Head::Softmax, &mut rng);
            let critic = Mlp::new(&CRITIC_SIZES, Head::Linear, &mut rng);
            ActorCriticModel::new(actor, critic, config.learning_rate)
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
            model.actor_adam.set_learning_rate(self.config.learning_rate);
            model.critic_adam.set_learning_rate(self.config.learning_rate);
        }
    }

    pub fn set_discount_factor(&mut self, gamma: f32) {
        self.config.discount_factor = DEFAULTS.clamp_discount_factor(gamma);
    }

    /// Critic estimate for `state`, or `None` on the heuristic backend.
    #[must_use]
    pub fn value(&self, state: &GameState) -> Option<f32> {
        let model = self.approximator.learned()?;
        Some(model.value(&encode(state.board())))
    }

    /// Trains both networks on the recorded game and clears it.
    ///
    /// Step rewards are `final_reward·γ^(T−1−t)`. The critic is fitted to
    /// `r_t + γ·V(s_{t+1})`, where the value after the last step comes from
    /// `next_state` (0 if there is none), and the actor follows the
    /// normalized advantages `r_t + γ·V(s_{t+1}) − V(s_t)`.
    pub fn update(&mut self, final_reward: f32, next_state: Option<&GameState>) {
        let history = std::mem::take(&mut self.history);
        let Approximator::Learned(model) = &mut self.approximator else {
            return;
        };
        if history.is_empty() {
            return;
        }
        let gamma = self.config.discount_factor;
        let rewards = discounted_returns(final_reward, history.len(), gamma);
        let values = history
            .iter()
            .map(|(x, _)| model.value(x))
            .collect::<Vec<_>>();
        let last_next = next_state.map_or(0.0, |s| model.value(&encode(s.board())));

        let mut targets = Vec::with_capacity(history.len());
        let mut advantages = Vec::with_capacity(history.len());
        for t in 0..history.len() {
            let next_value = values.get(t + 1).copied().unwrap_or(last_next);
            let target = rewards[t] + gamma * next_value;
            targets.push(array![target]);
            advantages.push(target - values[t]);
        }
        normalize(&mut advantages);

        let (inputs, actions): (Vec<_>, Vec<_>) = history.into_iter().unzip();
        let loss = model.critic.fit_mse(&mut model.critic_adam, &inputs, &targets);
        model
            .actor
            .policy_gradient_step(&mut model.actor_adam, &inputs, &actions, &advantages);
        log::info!(
            "actor-critic updated on {} steps: critic loss {loss:.1}",
            inputs.len()
        );
    }

    #[must_use]
    pub fn networks(&self) -> BTreeMap<String, Mlp> {
        self.approximator
            .learned()
            .map(|model| {
                BTreeMap::from([
                    (ACTOR.to_owned(), model.actor.clone()),
                    (CRITIC.to_owned(), model.critic.clone()),
                ])
            })
            .unwrap_or_default()
    }

    /// Loads both networks; an empty map selects the heuristic backend.
    pub fn restore_networks(
        &mut self,
        networks: &BTreeMap<String, Mlp>,
    ) -> Result<(), RestoreError> {
        self.approximator = if networks.is_empty() {
            Approximator::fallback()
        } else {
            let kind = AgentKind::ActorCritic;
            let actor = take_network(networks, kind, ACTOR, &ACTOR_SIZES, Head::Softmax)?;
            let critic = take_network(networks, kind, CRITIC, &CRITIC_SIZES, Head::Linear)?;
            Approximator::Learned(ActorCriticModel::new(
                actor,
                critic,
                self.config.learning_rate,
            ))
        };
        self.history.clear();
        self.config.backend = self.approximator.backend();
        Ok(())
    }
}

impl Agent for ActorCriticAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::ActorCritic
    }

    fn select_move(&mut self, state: &GameState) -> Option<Direction> {
        let model = match &self.approximator {
            Approximator::HeuristicFallback(evaluator) => return fallback_move(evaluator, state),
            Approximator::Learned(model) => model,
        };
        let x = encode(state.board());
        let probs = model.actor.forward(x.view());
        let valid = state.board().valid_moves();
        let direction = sample_valid(&probs, &valid, &mut self.rng)?;
        self.history.push((x, direction.index()));
        log::debug!("actor-critic sampled {direction}");
        Some(direction)
    }

    fn end_episode(&mut self, final_state: &GameState) {
        #[expect(clippy::cast_precision_loss)]
        let reward = final_state.score() as f32;
        self.update(reward, None);
    }
}
