use std::ops::RangeInclusive;

use arena2048_engine::{Direction, GameState};
use rand::{Rng, seq::IndexedRandom as _};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::{Deadline, best_candidate};
use crate::{
    agent::Agent,
    kind::AgentKind,
    params::{AgentParams, clamp_or},
};

pub const DEFAULT_SIMULATIONS: u32 = 50;
pub const SIMULATIONS_RANGE: RangeInclusive<u32> = 10..=200;
/// Moves a random playout makes before it is cut off.
pub const PLAYOUT_MOVE_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplingConfig {
    pub simulations: u32,
    pub time_limit_ms: Option<u64>,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            simulations: DEFAULT_SIMULATIONS,
            time_limit_ms: None,
        }
    }
}

impl SamplingConfig {
    #[must_use]
    pub fn from_params(params: &AgentParams) -> Self {
        Self {
            simulations: clamp_or(params.simulations, DEFAULT_SIMULATIONS, SIMULATIONS_RANGE),
            time_limit_ms: params.time_limit_ms,
        }
    }

    pub fn set_simulations(&mut self, simulations: u32) {
        self.simulations = clamp_or(Some(simulations), DEFAULT_SIMULATIONS, SIMULATIONS_RANGE);
    }

    #[must_use]
    pub fn deadline(&self) -> Deadline {
        Deadline::from_millis(self.time_limit_ms)
    }
}

/// Plays uniformly random valid moves until the game ends or `limit` moves
/// have been made.
pub(crate) fn random_playout<R>(state: &mut GameState, rng: &mut R, limit: usize)
where
    R: Rng + ?Sized,
{
    for _ in 0..limit {
        if state.is_terminal() {
            break;
        }
        let moves = state.board().valid_moves();
        let Some(&direction) = moves.choose(rng) else {
            state.recompute_terminal();
            break;
        };
        state.make_move(direction, rng);
    }
}

/// Flat Monte Carlo: every valid first move is followed by random playouts,
/// and the move with the best average final score wins.
#[derive(Debug, Clone)]
pub struct MonteCarloAgent {
    config: SamplingConfig,
    rng: Pcg32,
}

impl MonteCarloAgent {
    #[must_use]
    pub fn new(config: SamplingConfig, rng: Pcg32) -> Self {
        Self { config, rng }
    }

    #[must_use]
    pub fn from_params(params: &AgentParams) -> Self {
        Self::new(SamplingConfig::from_params(params), params.rng())
    }

    #[must_use]
    pub fn config(&self) -> &SamplingConfig {
        &self.config
    }

    pub fn set_simulations(&mut self, simulations: u32) {
        self.config.set_simulations(simulations);
    }

    /// Average playout score of every valid move, in canonical order.
    pub fn evaluate_moves(&mut self, state: &GameState) -> Vec<(Direction, f32)> {
        let deadline = self.config.deadline();
        let mut results = Vec::new();
        for direction in state.board().valid_moves() {
            let mut total = 0.0_f64;
            let mut runs = 0_u32;
            while runs < self.config.simulations.max(1) {
                if runs > 0 && deadline.is_expired() {
                    break;
                }
                let mut sim = state.clone();
                sim.make_move(direction, &mut self.rng);
                random_playout(&mut sim, &mut self.rng, PLAYOUT_MOVE_LIMIT);
                #[expect(clippy::cast_precision_loss)]
                let score = sim.score() as f64;
                total += score;
                runs += 1;
            }
            #[expect(clippy::cast_possible_truncation)]
            let average = (total / f64::from(runs)) as f32;
            log::trace!("monte carlo {direction}: {average} over {runs} playouts");
            results.push((direction, average));
        }
        results
    }
}

impl Agent for MonteCarloAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::MonteCarlo
    }

    fn select_move(&mut self, state: &GameState) -> Option<Direction> {
        let candidates = self.evaluate_moves(state);
        let best = best_candidate(candidates);
        log::debug!("monte carlo picked {best:?}");
        best
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;

    use super::*;
    use crate::search::test_boards;

    fn agent(simulations: u32, seed: u64) -> MonteCarloAgent {
        MonteCarloAgent::new(
            SamplingConfig {
                simulations,
                time_limit_ms: None,
            },
            Pcg32::seed_from_u64(seed),
        )
    }

    #[test]
    fn test_simulations_are_clamped() {
        let params = AgentParams {
            simulations: Some(5),
            ..AgentParams::default()
        };
        assert_eq!(SamplingConfig::from_params(&params).simulations, 10);
        let mut config = SamplingConfig::default();
        config.set_simulations(1000);
        assert_eq!(config.simulations, 200);
    }

    #[test]
    fn test_playout_stops_at_limit_or_end() {
        let mut rng = Pcg32::seed_from_u64(3);
        let mut state = GameState::new(&mut rng);
        random_playout(&mut state, &mut rng, 10);
        assert!(state.moves_taken() == 10 || state.is_terminal());
    }

    #[test]
    fn test_scores_only_valid_moves() {
        let state = test_boards::state([[2, 0, 0, 0], [0; 4], [0; 4], [0; 4]]);
        let results = agent(10, 1).evaluate_moves(&state);
        let directions = results.iter().map(|(d, _)| *d).collect::<Vec<_>>();
        assert_eq!(directions, [Direction::Down, Direction::Right]);
        assert!(results.iter().all(|(_, avg)| *avg >= 0.0));
    }

    #[test]
    fn test_same_seed_same_choice() {
        let state = test_boards::midgame();
        assert_eq!(agent(20, 9).select_move(&state), agent(20, 9).select_move(&state));
    }

    #[test]
    fn test_no_move_on_blocked_board() {
        assert_eq!(agent(10, 0).select_move(&test_boards::blocked()), None);
    }
}
