//! Agents backed by function approximation.
//!
//! | agent                    | networks                              | learns from                  |
//! |--------------------------|---------------------------------------|------------------------------|
//! | [`NeuralNetworkAgent`]   | value 16→32→16→1                      | afterstates vs final score   |
//! | [`PolicyGradientAgent`]  | policy 16→32→16→4 (softmax)           | REINFORCE on the final score |
//! | [`DqnAgent`]             | Q 16→64→32→4 + target copy            | replayed shaped rewards      |
//! | [`ActorCriticAgent`]     | actor 16→32→16→4, critic 16→32→16→1   | TD-error advantages          |
//!
//! Boards are encoded as 16 floats `log2(v + 1) / 15` ([`encode`]).
//!
//! Every agent is built over an [`Approximator`]: either its learned
//! networks or a fixed one-ply heuristic ([`NeuralBackend::Heuristic`]).
//! The heuristic backend ignores training and never fails, which keeps the
//! agents usable when no trained weights are wanted.

use std::{collections::BTreeMap, ops::RangeInclusive};

use arena2048_engine::{Board, Direction, GameState};
use arena2048_evaluator::{position_evaluator::FeatureBasedEvaluator, presets, turn_evaluator};
use ndarray::Array1;
use rand::{Rng, seq::IndexedRandom as _};
use serde::{Deserialize, Serialize};

use crate::{
    kind::AgentKind,
    params::{AgentParams, clamp_or},
    snapshot::RestoreError,
};

pub use self::{
    actor_critic::*, dqn::*, mlp::*, policy_gradient::*, replay_buffer::*, value_network::*,
};

mod actor_critic;
mod dqn;
mod mlp;
mod policy_gradient;
mod replay_buffer;
mod value_network;

/// Width of the board encoding.
pub const INPUT_LEN: usize = Board::CELLS;

/// Encodes each cell as `log2(v + 1) / 15`, so an empty cell is 0 and a
/// 32768 tile is about 1.
#[must_use]
#[expect(clippy::cast_precision_loss)]
pub fn encode(board: &Board) -> Array1<f32> {
    board
        .cells()
        .iter()
        .map(|&v| ((v as f32) + 1.0).log2() / 15.0)
        .collect()
}

/// Function approximator selected when an agent is built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NeuralBackend {
    #[default]
    Mlp,
    Heuristic,
}

/// Learned networks, or the fixed heuristic used in their place.
#[derive(Debug, Clone)]
pub enum Approximator<M> {
    Learned(M),
    HeuristicFallback(FeatureBasedEvaluator),
}

impl<M> Approximator<M> {
    pub fn new<F>(backend: NeuralBackend, build: F) -> Self
    where
        F: FnOnce() -> M,
    {
        match backend {
            NeuralBackend::Mlp => Self::Learned(build()),
            NeuralBackend::Heuristic => Self::fallback(),
        }
    }

    #[must_use]
    pub fn fallback() -> Self {
        Self::HeuristicFallback(presets::neural_fallback())
    }

    #[must_use]
    pub fn backend(&self) -> NeuralBackend {
        match self {
            Self::Learned(_) => NeuralBackend::Mlp,
            Self::HeuristicFallback(_) => NeuralBackend::Heuristic,
        }
    }

    #[must_use]
    pub fn learned(&self) -> Option<&M> {
        match self {
            Self::Learned(model) => Some(model),
            Self::HeuristicFallback(_) => None,
        }
    }
}

/// One-ply move of the heuristic backend.
pub(crate) fn fallback_move(
    evaluator: &FeatureBasedEvaluator,
    state: &GameState,
) -> Option<Direction> {
    turn_evaluator::select_best_move(evaluator, state).map(|(direction, _)| direction)
}

/// Hyperparameters shared by the neural agents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NeuralConfig {
    pub backend: NeuralBackend,
    pub learning_rate: f32,
    pub discount_factor: f32,
    pub epsilon: f32,
}

/// Per-agent defaults and learning-rate bounds.
#[derive(Debug, Clone)]
pub(crate) struct NeuralDefaults {
    pub(crate) learning_rate: f32,
    pub(crate) learning_rate_range: RangeInclusive<f32>,
    pub(crate) discount_factor: f32,
    pub(crate) epsilon: f32,
}

impl NeuralDefaults {
    pub(crate) fn config(&self, params: &AgentParams) -> NeuralConfig {
        NeuralConfig {
            backend: params.backend.unwrap_or_default(),
            learning_rate: self.clamp_learning_rate(params.learning_rate),
            discount_factor: clamp_or(params.discount_factor, self.discount_factor, 0.0..=1.0),
            epsilon: clamp_or(params.epsilon, self.epsilon, 0.0..=1.0),
        }
    }

    pub(crate) fn default_config(&self) -> NeuralConfig {
        self.config(&AgentParams::default())
    }

    pub(crate) fn clamp_learning_rate(&self, rate: Option<f32>) -> f32 {
        clamp_or(rate, self.learning_rate, self.learning_rate_range.clone())
    }

    pub(crate) fn clamp_discount_factor(&self, gamma: f32) -> f32 {
        clamp_or(Some(gamma), self.discount_factor, 0.0..=1.0)
    }

    pub(crate) fn clamp_epsilon(&self, epsilon: f32) -> f32 {
        clamp_or(Some(epsilon), self.epsilon, 0.0..=1.0)
    }
}

/// Network output as per-direction values.
pub(crate) fn action_values(output: &Array1<f32>) -> [f32; Direction::LEN] {
    let mut values = [0.0; Direction::LEN];
    for (slot, &v) in values.iter_mut().zip(output) {
        *slot = v;
    }
    values
}

/// Samples a valid move from `probs`, renormalized over the valid moves.
///
/// Falls back to a uniform choice if the valid moves carry no probability.
pub(crate) fn sample_valid<R>(
    probs: &Array1<f32>,
    valid: &[Direction],
    rng: &mut R,
) -> Option<Direction>
where
    R: Rng + ?Sized,
{
    let total: f32 = valid.iter().map(|d| probs[d.index()]).sum();
    if !(total.is_finite() && total > 0.0) {
        return valid.choose(rng).copied();
    }
    let mut threshold = rng.random::<f32>() * total;
    for &direction in valid {
        threshold -= probs[direction.index()];
        if threshold <= 0.0 {
            return Some(direction);
        }
    }
    valid.last().copied()
}

/// `R·γ^(T−1−t)` for every step `t` of an episode of `len` steps.
pub(crate) fn discounted_returns(final_reward: f32, len: usize, gamma: f32) -> Vec<f32> {
    let mut returns = vec![0.0; len];
    let mut value = final_reward;
    for r in returns.iter_mut().rev() {
        *r = value;
        value *= gamma;
    }
    returns
}

/// Shifts to zero mean and scales to unit variance.
pub(crate) fn normalize(values: &mut [f32]) {
    if values.is_empty() {
        return;
    }
    #[expect(clippy::cast_precision_loss)]
    let n = values.len() as f32;
    let mean = values.iter().sum::<f32>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;
    let std = var.sqrt() + 1e-8;
    for v in values {
        *v = (*v - mean) / std;
    }
}

/// Looks up a network of a snapshot by name and checks it has the layout
/// the agent builds.
pub(crate) fn take_network(
    networks: &BTreeMap<String, Mlp>,
    kind: AgentKind,
    name: &'static str,
    sizes: &[usize],
    head: Head,
) -> Result<Mlp, RestoreError> {
    let network = networks
        .get(name)
        .ok_or(RestoreError::MissingNetwork { kind, name })?;
    if !network.has_shape(sizes, head) {
        return Err(RestoreError::ShapeMismatch { kind, name });
    }
    Ok(network.clone())
}


#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg32;

    use super::*;

    #[test]
    fn test_encode() {
        let board = Board::from_rows([[0, 1 << 15, 0, 0], [0; 4], [0; 4], [0, 0, 0, 0]]).unwrap();
        let x = encode(&board);
        assert_eq!(x.len(), INPUT_LEN);
        assert!(x[0].abs() < f32::EPSILON);
        assert!((x[1] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_sample_valid_only_returns_valid_moves() {
        let mut rng = Pcg32::seed_from_u64(1);
        let probs = ndarray::array![0.97, 0.01, 0.01, 0.01];
        let valid = [Direction::Down, Direction::Right];
        for _ in 0..50 {
            let d = sample_valid(&probs, &valid, &mut rng).unwrap();
            assert!(valid.contains(&d));
        }
        let zero = ndarray::array![1.0, 0.0, 0.0, 0.0];
        assert!(valid.contains(&sample_valid(&zero, &valid, &mut rng).unwrap()));
        assert_eq!(sample_valid(&probs, &[], &mut rng), None);
    }

    #[test]
    fn test_discounted_returns() {
        let r = discounted_returns(100.0, 3, 0.5);
        assert_eq!(r, [25.0, 50.0, 100.0]);
    }

    #[test]
    fn test_normalize() {
        let mut v = [1.0, 2.0, 3.0, 4.0];
        normalize(&mut v);
        assert!(v.iter().sum::<f32>().abs() < 1e-5);
        let var = v.iter().map(|x| x * x).sum::<f32>() / 4.0;
        assert!((var - 1.0).abs() < 1e-4);

        let mut same = [5.0, 5.0];
        normalize(&mut same);
        assert!(same.iter().all(|v| v.abs() < 1e-3));
    }

    #[test]
    fn test_take_network_checks_layout() {
        let mut rng = Pcg32::seed_from_u64(2);
        let mut networks = BTreeMap::new();
        let sizes = [INPUT_LEN, 4, 1];
        networks.insert("model".to_owned(), Mlp::new(&sizes, Head::Linear, &mut rng));
        let kind = AgentKind::NeuralNetwork;

        assert!(take_network(&networks, kind, "model", &sizes, Head::Linear).is_ok());
        assert_eq!(
            take_network(&networks, kind, "model", &[INPUT_LEN, 8, 1], Head::Linear),
            Err(RestoreError::ShapeMismatch { kind, name: "model" })
        );
        assert_eq!(
            take_network(&networks, kind, "model", &sizes, Head::Softmax),
            Err(RestoreError::ShapeMismatch { kind, name: "model" })
        );
        assert_eq!(
            take_network(&networks, kind, "critic", &sizes, Head::Linear),
            Err(RestoreError::MissingNetwork { kind, name: "critic" })
        );
    }

    #[test]
    fn test_defaults_clamp() {
        let defaults = NeuralDefaults {
            learning_rate: 0.001,
            learning_rate_range: 0.001..=0.1,
            discount_factor: 0.95,
            epsilon: 0.1,
        };
        let params = AgentParams {
            learning_rate: Some(0.5),
            epsilon: Some(2.0),
            ..AgentParams::default()
        };
        let config = defaults.config(&params);
        assert!((config.learning_rate - 0.1).abs() < f32::EPSILON);
        assert!((config.epsilon - 1.0).abs() < f32::EPSILON);
        assert!((config.discount_factor - 0.95).abs() < f32::EPSILON);
        assert_eq!(config.backend, NeuralBackend::Mlp);
    }
}
