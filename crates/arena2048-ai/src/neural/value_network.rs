use std::collections::BTreeMap;

use arena2048_engine::{Board, Direction, GameState};
use ndarray::{Array1, array};
use rand::{SeedableRng as _, seq::SliceRandom as _};
use rand_pcg::Pcg32;

use super::{
    Adam, Approximator, Head, INPUT_LEN, Mlp, NeuralConfig, NeuralDefaults, encode,
    fallback_move, take_network,
};
use crate::{agent::Agent, kind::AgentKind, params::AgentParams, snapshot::RestoreError};

pub const VALUE_NETWORK_SIZES: [usize; 4] = [INPUT_LEN, 32, 16, 1];
pub const TRAINING_EPOCHS: usize = 10;
pub const TRAINING_BATCH_SIZE: usize = 32;

const MODEL: &str = "model";

const DEFAULTS: NeuralDefaults = NeuralDefaults {
    learning_rate: 0.001,
    learning_rate_range: 0.0001..=0.1,
    discount_factor: 0.99,
    epsilon: 0.0,
};

#[derive(Debug, Clone)]
pub struct ValueModel {
    network: Mlp,
    adam: Adam,
}

/// Greedy over the predicted value of each move's afterstate; learns to
/// predict the final score of the games it plays.
#[derive(Debug, Clone)]
pub struct NeuralNetworkAgent {
    config: NeuralConfig,
    approximator: Approximator<ValueModel>,
    /// Encoded afterstates chosen during the current game.
    episode: Vec<Array1<f32>>,
    rng: Pcg32,
}

impl Default for NeuralNetworkAgent {
    fn default() -> Self {
        Self::new(DEFAULTS.default_config(), Pcg32::from_rng(&mut rand::rng()))
    }
}

impl NeuralNetworkAgent {
    #[must_use]
    pub fn new(config: NeuralConfig, mut rng: Pcg32) -> Self {
        let approximator = Approximator::new(config.backend, || ValueModel {
            network: Mlp::new(&VALUE_NETWORK_SIZES, Head::Linear, &mut rng),
            adam: Adam::new(config.learning_rate),
        });
        Self {
            config,
            approximator,
            episode: Vec::new(),
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
    pub fn approximator(&self) -> &Approximator<ValueModel> {
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

    /// Predicted final score from `board`, or `None` on the heuristic
    /// backend.
    #[must_use]
    pub fn predict(&self, board: &Board) -> Option<f32> {
        let model = self.approximator.learned()?;
        Some(model.network.forward(encode(board).view())[0])
    }

    /// Fits `(encoding, score)` pairs for a fixed number of epochs of
    /// shuffled mini-batches. Returns the mean loss of the last epoch, or
    /// `None` if nothing was trained.
    pub fn train(&mut self, samples: &[(Array1<f32>, f32)]) -> Option<f32> {
        let Approximator::Learned(model) = &mut self.approximator else {
            return None;
        };
        if samples.is_empty() {
            return None;
        }
        let mut order = (0..samples.len()).collect::<Vec<_>>();
        let mut last_loss = 0.0;
        for _ in 0..TRAINING_EPOCHS {
            order.shuffle(&mut self.rng);
            let mut epoch_loss = 0.0;
            let mut batches = 0_u16;
            for chunk in order.chunks(TRAINING_BATCH_SIZE) {
                let inputs = chunk.iter().map(|&i| samples[i].0.clone()).collect::<Vec<_>>();
                let targets = chunk.iter().map(|&i| array![samples[i].1]).collect::<Vec<_>>();
                epoch_loss += model.network.fit_mse(&mut model.adam, &inputs, &targets);
                batches = batches.saturating_add(1);
            }
            last_loss = epoch_loss / f32::from(batches.max(1));
        }
        Some(last_loss)
    }

    #[must_use]
    pub fn networks(&self) -> BTreeMap<String, Mlp> {
        self.approximator
            .learned()
            .map(|model| BTreeMap::from([(MODEL.to_owned(), model.network.clone())]))
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
                AgentKind::NeuralNetwork,
                MODEL,
                &VALUE_NETWORK_SIZES,
                Head::Linear,
            )?;
            Approximator::Learned(ValueModel {
                network,
                adam: Adam::new(self.config.learning_rate),
            })
        };
        self.episode.clear();
        self.config.backend = self.approximator.backend();
        Ok(())
    }
}

impl Agent for NeuralNetworkAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::NeuralNetwork
    }

    fn select_move(&mut self, state: &GameState) -> Option<Direction> {
        let model = match &self.approximator {
            Approximator::HeuristicFallback(evaluator) => return fallback_move(evaluator, state),
            Approximator::Learned(model) => model,
        };
        let mut best: Option<(Direction, f32, Array1<f32>)> = None;
        for direction in Direction::ALL {
            let mut next = state.clone();
            if !next.apply_move(direction) {
                continue;
            }
            let x = encode(next.board());
            let value = model.network.forward(x.view())[0];
            if best.as_ref().is_none_or(|(_, best_value, _)| value > *best_value) {
                best = Some((direction, value, x));
            }
        }
        let (direction, value, x) = best?;
        self.episode.push(x);
        log::debug!("neural network picked {direction} (predicted {value:.1})");
        Some(direction)
    }

    fn end_episode(&mut self, final_state: &GameState) {
        #[expect(clippy::cast_precision_loss)]
        let score = final_state.score() as f32;
        let samples = self
            .episode
            .drain(..)
            .map(|x| (x, score))
            .collect::<Vec<_>>();
        if let Some(loss) = self.train(&samples) {
            log::info!(
                "neural network trained on {} positions: loss {loss:.1}",
                samples.len()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;

    use super::*;
    use crate::neural::{NeuralBackend, test_support};

    fn agent(backend: NeuralBackend) -> NeuralNetworkAgent {
        let config = NeuralConfig {
            backend,
            ..DEFAULTS.default_config()
        };
        NeuralNetworkAgent::new(config, Pcg32::seed_from_u64(2))
    }

    #[test]
    fn test_heuristic_backend_plays_one_ply() {
        let mut agent = agent(NeuralBackend::Heuristic);
        assert!(agent.predict(&Board::EMPTY).is_none());
        let state = GameState::from_board(
            Board::from_rows([[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]]).unwrap(),
            0,
        );
        // Left and Right tie on the merge; the earlier direction wins.
        assert_eq!(agent.select_move(&state), Some(Direction::Left));
        assert!(agent.train(&[(encode(state.board()), 1.0)]).is_none());
        assert!(agent.networks().is_empty());
    }

    #[test]
    fn test_records_afterstates_and_trains_at_episode_end() {
        let mut agent = agent(NeuralBackend::Mlp);
        test_support::play(&mut agent, 1, 30, 3);
        assert!(agent.episode.is_empty());
        assert!(agent.predict(&Board::EMPTY).is_some());
    }

    #[test]
    fn test_training_moves_prediction_towards_target() {
        let mut agent = agent(NeuralBackend::Mlp);
        agent.set_learning_rate(0.01);
        let board = Board::from_rows([[2, 4, 8, 16], [0; 4], [0; 4], [0; 4]]).unwrap();
        let before = agent.predict(&board).unwrap();
        let samples = vec![(encode(&board), 500.0); 8];
        for _ in 0..5 {
            agent.train(&samples);
        }
        let after = agent.predict(&board).unwrap();
        assert!((after - 500.0).abs() < (before - 500.0).abs());
    }

    #[test]
    fn test_restore_round_trip() {
        let trained = agent(NeuralBackend::Mlp);
        let mut fresh = agent(NeuralBackend::Heuristic);
        fresh.restore_networks(&trained.networks()).unwrap();
        assert_eq!(fresh.networks(), trained.networks());
        assert_eq!(fresh.config().backend, NeuralBackend::Mlp);

        let misnamed = BTreeMap::from([("policy".to_owned(), trained.networks()[MODEL].clone())]);
        let err = fresh.restore_networks(&misnamed).unwrap_err();
        assert_eq!(
            err,
            RestoreError::MissingNetwork {
                kind: AgentKind::NeuralNetwork,
                name: MODEL
            }
        );
    }
}
