use std::ops::RangeInclusive;

use rand::SeedableRng as _;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::neural::NeuralBackend;

/// String-keyed hyperparameters accepted by every agent kind.
///
/// Keys use camelCase in JSON. Each agent reads the keys it understands and
/// ignores the rest; missing keys fall back to the agent's defaults and
/// out-of-range values are clamped.
///
/// ```
/// use arena2048_ai::params::AgentParams;
///
/// let params: AgentParams =
///     serde_json::from_str(r#"{ "maxDepth": 9, "epsilon": 0.2, "colour": "red" }"#).unwrap();
/// assert_eq!(params.max_depth, Some(9));
/// assert_eq!(params.epsilon, Some(0.2));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simulations: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beam_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exploration_constant: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epsilon: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub learning_rate: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_factor: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lambda: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mutation_rate: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub population_size: Option<usize>,
    /// Wall-clock budget of one search call, in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_limit_ms: Option<u64>,
    /// Seed of the agent's own random stream
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Function approximator of the neural agents
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<NeuralBackend>,
}

impl AgentParams {
    /// The agent's random stream: seeded if `seed` is set, else from entropy.
    #[must_use]
    pub fn rng(&self) -> Pcg32 {
        match self.seed {
            Some(seed) => Pcg32::seed_from_u64(seed),
            None => Pcg32::from_rng(&mut rand::rng()),
        }
    }

    /// `self` with every key set in `overrides` replaced.
    #[must_use]
    pub fn merged_with(&self, overrides: &AgentParams) -> AgentParams {
        AgentParams {
            max_depth: overrides.max_depth.or(self.max_depth),
            simulations: overrides.simulations.or(self.simulations),
            beam_width: overrides.beam_width.or(self.beam_width),
            exploration_constant: overrides.exploration_constant.or(self.exploration_constant),
            epsilon: overrides.epsilon.or(self.epsilon),
            learning_rate: overrides.learning_rate.or(self.learning_rate),
            discount_factor: overrides.discount_factor.or(self.discount_factor),
            lambda: overrides.lambda.or(self.lambda),
            mutation_rate: overrides.mutation_rate.or(self.mutation_rate),
            population_size: overrides.population_size.or(self.population_size),
            time_limit_ms: overrides.time_limit_ms.or(self.time_limit_ms),
            seed: overrides.seed.or(self.seed),
            backend: overrides.backend.or(self.backend),
        }
    }
}

/// Clamps `value` into `range`, using `default` for a missing or NaN value.
pub(crate) fn clamp_or<T>(value: Option<T>, default: T, range: RangeInclusive<T>) -> T
where
    T: PartialOrd + Copy,
{
    let Some(value) = value.filter(|v| v.partial_cmp(v).is_some()) else {
        return default;
    };
    if value < *range.start() {
        *range.start()
    } else if value > *range.end() {
        *range.end()
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_or() {
        assert_eq!(clamp_or(None, 3, 1..=5), 3);
        assert_eq!(clamp_or(Some(0), 3, 1..=5), 1);
        assert_eq!(clamp_or(Some(9), 3, 1..=5), 5);
        assert_eq!(clamp_or(Some(4), 3, 1..=5), 4);
        assert!((clamp_or(Some(f32::NAN), 0.1, 0.0..=1.0) - 0.1).abs() < f32::EPSILON);
    }

    #[test]
    fn test_keys_are_camel_case() {
        let params = AgentParams {
            time_limit_ms: Some(50),
            discount_factor: Some(0.5),
            ..AgentParams::default()
        };
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["timeLimitMs"], 50);
        assert_eq!(json["discountFactor"], 0.5);
        assert!(json.get("maxDepth").is_none());
    }

    #[test]
    fn test_merge_prefers_overrides() {
        let saved = AgentParams {
            max_depth: Some(4),
            epsilon: Some(0.3),
            ..AgentParams::default()
        };
        let overrides = AgentParams {
            epsilon: Some(0.05),
            seed: Some(1),
            ..AgentParams::default()
        };
        let merged = saved.merged_with(&overrides);
        assert_eq!(merged.max_depth, Some(4));
        assert_eq!(merged.epsilon, Some(0.05));
        assert_eq!(merged.seed, Some(1));
        assert_eq!(merged.lambda, None);
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        use rand::Rng as _;

        let params = AgentParams {
            seed: Some(7),
            ..AgentParams::default()
        };
        let a: u64 = params.rng().random();
        let b: u64 = params.rng().random();
        assert_eq!(a, b);
    }
}
