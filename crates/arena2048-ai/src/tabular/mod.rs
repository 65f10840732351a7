//! Tabular reinforcement learning over a lossy board fingerprint.
//!
//! Boards are reduced to a [`Fingerprint`] (largest distinct tiles, position
//! of the max tile, free space) and values are kept in ordered maps keyed by
//! it. Many boards share a fingerprint, which keeps the tables small enough
//! to learn anything within a few hundred games.
//!
//! All three agents update one step late: the transition that led to the
//! current state is credited when the next decision is requested, and the
//! last transition of a game is credited in [`Agent::end_episode`].
//!
//! [`Agent::end_episode`]: crate::agent::Agent::end_episode

use std::{collections::BTreeMap, fmt, ops::RangeInclusive, str::FromStr};

use arena2048_engine::{Board, Direction, GameState};
use rand::{Rng, seq::IndexedRandom as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::params::{AgentParams, clamp_or};

pub use self::{q_learning::*, sarsa::*, td_learning::*};

mod q_learning;
mod sarsa;
mod td_learning;

pub const DEFAULT_LEARNING_RATE: f32 = 0.1;
pub const LEARNING_RATE_RANGE: RangeInclusive<f32> = 0.01..=1.0;
pub const DEFAULT_DISCOUNT_FACTOR: f32 = 0.9;
pub const DEFAULT_EPSILON: f32 = 0.1;
pub const DEFAULT_LAMBDA: f32 = 0.7;
pub const UNIT_RANGE: RangeInclusive<f32> = 0.0..=1.0;

/// Reward bonus per empty cell.
pub const EMPTY_CELL_REWARD: f32 = 0.1;
/// Reward added when the game is over.
pub const GAME_OVER_PENALTY: f32 = -100.0;

/// Score gained since `prev_score`, plus a small bonus for free space and a
/// penalty on game over.
///
/// Shared by the tabular agents and DQN.
#[must_use]
pub fn shaped_reward(prev_score: u64, state: &GameState) -> f32 {
    #[expect(clippy::cast_precision_loss)]
    let gain = state.score().saturating_sub(prev_score) as f32;
    #[expect(clippy::cast_precision_loss)]
    let empty = state.empty_count() as f32;
    let penalty = if state.is_terminal() {
        GAME_OVER_PENALTY
    } else {
        0.0
    };
    gain + EMPTY_CELL_REWARD * empty + penalty
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabularConfig {
    pub learning_rate: f32,
    pub discount_factor: f32,
    pub epsilon: f32,
    pub lambda: f32,
}

impl Default for TabularConfig {
    fn default() -> Self {
        Self {
            learning_rate: DEFAULT_LEARNING_RATE,
            discount_factor: DEFAULT_DISCOUNT_FACTOR,
            epsilon: DEFAULT_EPSILON,
            lambda: DEFAULT_LAMBDA,
        }
    }
}

impl TabularConfig {
    #[must_use]
    pub fn from_params(params: &AgentParams) -> Self {
        let mut config = Self::default();
        config.set_learning_rate(params.learning_rate.unwrap_or(DEFAULT_LEARNING_RATE));
        config.set_discount_factor(params.discount_factor.unwrap_or(DEFAULT_DISCOUNT_FACTOR));
        config.set_epsilon(params.epsilon.unwrap_or(DEFAULT_EPSILON));
        config.set_lambda(params.lambda.unwrap_or(DEFAULT_LAMBDA));
        config
    }

    pub fn set_learning_rate(&mut self, rate: f32) {
        self.learning_rate = clamp_or(Some(rate), DEFAULT_LEARNING_RATE, LEARNING_RATE_RANGE);
    }

    pub fn set_discount_factor(&mut self, gamma: f32) {
        self.discount_factor = clamp_or(Some(gamma), DEFAULT_DISCOUNT_FACTOR, UNIT_RANGE);
    }

    pub fn set_epsilon(&mut self, epsilon: f32) {
        self.epsilon = clamp_or(Some(epsilon), DEFAULT_EPSILON, UNIT_RANGE);
    }

    pub fn set_lambda(&mut self, lambda: f32) {
        self.lambda = clamp_or(Some(lambda), DEFAULT_LAMBDA, UNIT_RANGE);
    }
}

/// Lossy summary of a board used as a table key.
///
/// Written as `"v1,v2,v3,v4_max_pos_empty"`, where `v1..v4` are the largest
/// distinct tiles in descending order (fewer if the board has fewer), `pos`
/// is the index of the first max tile and `empty` the free cell count.
///
/// ```
/// use arena2048_ai::tabular::Fingerprint;
/// use arena2048_engine::Board;
///
/// let board = Board::from_rows([[2, 8, 0, 0], [2, 0, 0, 0], [0; 4], [0, 0, 0, 4]]).unwrap();
/// assert_eq!(Fingerprint::of(&board).to_string(), "8,4,2_8_1_12");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fingerprint {
    top: [u32; 4],
    max_tile: u32,
    max_index: u8,
    empty: u8,
}

impl Fingerprint {
    #[must_use]
    pub fn of(board: &Board) -> Self {
        let mut distinct = board
            .cells()
            .iter()
            .copied()
            .filter(|&v| v != 0)
            .collect::<Vec<_>>();
        distinct.sort_unstable_by(|a, b| b.cmp(a));
        distinct.dedup();
        let mut top = [0; 4];
        for (slot, value) in top.iter_mut().zip(distinct) {
            *slot = value;
        }
        #[expect(clippy::cast_possible_truncation)]
        let max_index = board.max_tile_index().unwrap_or(0) as u8;
        #[expect(clippy::cast_possible_truncation)]
        let empty = board.empty_count() as u8;
        Self {
            top,
            max_tile: board.max_tile(),
            max_index,
            empty,
        }
    }

    #[must_use]
    pub fn max_tile(&self) -> u32 {
        self.max_tile
    }

    #[must_use]
    pub fn empty(&self) -> u8 {
        self.empty
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for value in self.top.iter().filter(|&&v| v != 0) {
            if !first {
                f.write_str(",")?;
            }
            write!(f, "{value}")?;
            first = false;
        }
        write!(f, "_{}_{}_{}", self.max_tile, self.max_index, self.empty)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("invalid fingerprint `{input}`")]
pub struct ParseFingerprintError {
    pub input: String,
}

impl FromStr for Fingerprint {
    type Err = ParseFingerprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseFingerprintError {
            input: s.to_owned(),
        };
        let parts = s.split('_').collect::<Vec<_>>();
        let [values, max_tile, max_index, empty] = parts[..] else {
            return Err(err());
        };
        let mut top = [0; 4];
        if !values.is_empty() {
            let values = values.split(',').collect::<Vec<_>>();
            if values.len() > top.len() {
                return Err(err());
            }
            for (slot, value) in top.iter_mut().zip(values) {
                *slot = value.parse().map_err(|_| err())?;
            }
        }
        Ok(Self {
            top,
            max_tile: max_tile.parse().map_err(|_| err())?,
            max_index: max_index.parse().map_err(|_| err())?,
            empty: empty.parse().map_err(|_| err())?,
        })
    }
}

impl Serialize for Fingerprint {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Action values per fingerprint, indexed by [`Direction::index`].
///
/// Missing entries read as 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QTable(BTreeMap<Fingerprint, [f32; Direction::LEN]>);

impl QTable {
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn values(&self, key: &Fingerprint) -> [f32; Direction::LEN] {
        self.0.get(key).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn get(&self, key: &Fingerprint, action: Direction) -> f32 {
        self.values(key)[action.index()]
    }

    /// Highest value over all four actions.
    #[must_use]
    pub fn max_value(&self, key: &Fingerprint) -> f32 {
        self.values(key).into_iter().fold(f32::NEG_INFINITY, f32::max)
    }

    /// Moves `Q(key, action)` towards `target` by `rate`.
    pub fn update(&mut self, key: Fingerprint, action: Direction, target: f32, rate: f32) {
        let q = &mut self.0.entry(key).or_default()[action.index()];
        *q += rate * (target - *q);
    }
}

/// State values per fingerprint. Missing entries read as 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueTable(BTreeMap<Fingerprint, f32>);

impl ValueTable {
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, key: &Fingerprint) -> f32 {
        self.0.get(key).copied().unwrap_or_default()
    }

    pub fn add(&mut self, key: Fingerprint, delta: f32) {
        *self.0.entry(key).or_default() += delta;
    }
}

/// Explores with probability `epsilon`, otherwise takes the valid move with
/// the highest value (earliest direction on ties).
pub(crate) fn epsilon_greedy<R>(
    values: &[f32; Direction::LEN],
    valid: &[Direction],
    epsilon: f32,
    rng: &mut R,
) -> Option<Direction>
where
    R: Rng + ?Sized,
{
    if valid.is_empty() {
        return None;
    }
    if rng.random::<f32>() < epsilon {
        return valid.choose(rng).copied();
    }
    let mut best: Option<(Direction, f32)> = None;
    for &direction in valid {
        let value = values[direction.index()];
        if best.is_none_or(|(_, best_value)| value > best_value) {
            best = Some((direction, value));
        }
    }
    best.map(|(direction, _)| direction)
}

/// Running reward total of the current game, kept for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct EpisodeReward {
    current: f32,
    last: Option<f32>,
}

impl EpisodeReward {
    pub(crate) fn add(&mut self, reward: f32) {
        self.current += reward;
    }

    pub(crate) fn finish(&mut self) {
        self.last = Some(self.current);
        self.current = 0.0;
    }

    pub(crate) fn last(&self) -> Option<f32> {
        self.last
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use arena2048_engine::{GameState, SpawnSeed};

    use crate::agent::Agent;

    /// Plays `episodes` full games and returns the final scores.
    pub(crate) fn train<A: Agent>(agent: &mut A, episodes: u32, seed: u128) -> Vec<u64> {
        let mut rng = SpawnSeed::from_u128(seed).rng();
        let mut scores = Vec::new();
        for _ in 0..episodes {
            let mut state = GameState::new(&mut rng);
            while !state.is_terminal() {
                let Some(direction) = agent.select_move(&state) else {
                    state.recompute_terminal();
                    break;
                };
                state.make_move(direction, &mut rng);
            }
            agent.end_episode(&state);
            scores.push(state.score());
        }
        scores
    }
}
