//! Search-based agents.
//!
//! | agent                    | tree                         | leaf value                 |
//! |--------------------------|------------------------------|----------------------------|
//! | [`MinimaxAgent`]         | MAX / MIN over every spawn   | `minimax` preset           |
//! | [`AlphaBetaAgent`]       | as minimax, with cutoffs     | `minimax` preset           |
//! | [`ExpectimaxAgent`]      | MAX / CHANCE (2: 90%, 4: 10%) | `expectimax` preset       |
//! | [`AStarAgent`]           | best-first over afterstates  | `astar` preset as `-h`     |
//! | [`BeamSearchAgent`]      | level-wise, best `width` kept | `lookahead` preset        |
//! | [`IterativeDeepeningAgent`] | depth-limited MAX only    | `lookahead` preset         |
//! | [`MonteCarloAgent`]      | random playouts per move     | final score                |
//! | [`MctsAgent`]            | UCB1 tree + random rollouts  | `rollout` preset           |
//!
//! Searches work on cloned [`GameState`]s and never touch the live game.
//! Deterministic searches slide without spawning; the sampling agents spawn
//! tiles from their own random stream.
//!
//! All of them accept an optional time limit. Once the [`Deadline`] has
//! passed, nodes are evaluated as leaves and loops stop, so a call returns
//! shortly after the budget is spent.

use std::time::{Duration, Instant};

use arena2048_engine::{Direction, GameState};
use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};

use crate::params::{AgentParams, clamp_or};

pub use self::{
    alpha_beta::*, astar::*, beam::*, expectimax::*, iterative_deepening::*, mcts::*,
    minimax::*, monte_carlo::*,
};

mod alpha_beta;
mod astar;
mod beam;
mod expectimax;
mod iterative_deepening;
mod mcts;
mod minimax;
mod monte_carlo;

pub const DEFAULT_MAX_DEPTH: u32 = 3;
pub const MAX_DEPTH_RANGE: std::ops::RangeInclusive<u32> = 1..=5;

/// Point in time after which a search stops expanding.
#[derive(Debug, Clone, Copy)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    /// A deadline that never expires.
    #[must_use]
    pub const fn none() -> Self {
        Self(None)
    }

    #[must_use]
    pub fn after(limit: Duration) -> Self {
        Self(Instant::now().checked_add(limit))
    }

    #[must_use]
    pub fn from_millis(limit_ms: Option<u64>) -> Self {
        limit_ms.map_or(Self::none(), |ms| Self::after(Duration::from_millis(ms)))
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.0.is_some_and(|at| Instant::now() >= at)
    }
}

/// Depth budget shared by the depth-limited searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepthConfig {
    pub max_depth: u32,
    pub time_limit_ms: Option<u64>,
}

impl Default for DepthConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            time_limit_ms: None,
        }
    }
}

impl DepthConfig {
    #[must_use]
    pub fn from_params(params: &AgentParams) -> Self {
        Self {
            max_depth: clamp_or(params.max_depth, DEFAULT_MAX_DEPTH, MAX_DEPTH_RANGE),
            time_limit_ms: params.time_limit_ms,
        }
    }

    /// Sets the depth, clamped to `1..=5`.
    pub fn set_max_depth(&mut self, max_depth: u32) {
        self.max_depth = clamp_or(Some(max_depth), DEFAULT_MAX_DEPTH, MAX_DEPTH_RANGE);
    }

    #[must_use]
    pub fn deadline(&self) -> Deadline {
        Deadline::from_millis(self.time_limit_ms)
    }
}

/// Every direction that changes the board, paired with its afterstate
/// (the slid board, before any spawn).
pub(crate) fn afterstates(state: &GameState) -> ArrayVec<(Direction, GameState), 4> {
    let mut result = ArrayVec::new();
    for direction in Direction::ALL {
        let mut next = state.clone();
        if next.apply_move(direction) {
            result.push((direction, next));
        }
    }
    result
}

/// Keeps the first candidate among equal values.
pub(crate) fn best_candidate<I>(candidates: I) -> Option<Direction>
where
    I: IntoIterator<Item = (Direction, f32)>,
{
    let mut best: Option<(Direction, f32)> = None;
    for (direction, value) in candidates {
        if best.is_none_or(|(_, best_value)| value > best_value) {
            best = Some((direction, value));
        }
    }
    best.map(|(direction, _)| direction)
}

#[cfg(test)]
pub(crate) mod test_boards {
    use arena2048_engine::{Board, GameState};

    pub(crate) fn state(rows: [[u32; 4]; 4]) -> GameState {
        GameState::from_board(Board::from_rows(rows).unwrap(), 0)
    }

    /// No direction changes this board.
    pub(crate) fn blocked() -> GameState {
        state([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]])
    }

    /// A mid-game position with several reasonable moves.
    pub(crate) fn midgame() -> GameState {
        state([[128, 64, 32, 4], [16, 8, 8, 2], [4, 2, 0, 0], [2, 0, 0, 2]])
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn test_deadline() {
        assert!(!Deadline::none().is_expired());
        let deadline = Deadline::after(Duration::from_millis(1));
        thread::sleep(Duration::from_millis(5));
        assert!(deadline.is_expired());
        assert!(!Deadline::from_millis(Some(60_000)).is_expired());
    }

    #[test]
    fn test_depth_is_clamped() {
        let params = AgentParams {
            max_depth: Some(42),
            ..AgentParams::default()
        };
        assert_eq!(DepthConfig::from_params(&params).max_depth, 5);

        let mut config = DepthConfig::default();
        config.set_max_depth(0);
        assert_eq!(config.max_depth, 1);
    }

    #[test]
    fn test_afterstates_skip_unchanged_slides() {
        let state = test_boards::state([[2, 0, 0, 0], [0; 4], [0; 4], [0; 4]]);
        let directions = afterstates(&state)
            .into_iter()
            .map(|(d, _)| d)
            .collect::<Vec<_>>();
        assert_eq!(directions, [Direction::Down, Direction::Right]);
        assert!(afterstates(&test_boards::blocked()).is_empty());
    }

    #[test]
    fn test_best_candidate_keeps_first_tie() {
        let best = best_candidate([
            (Direction::Up, 1.0),
            (Direction::Left, 3.0),
            (Direction::Right, 3.0),
        ]);
        assert_eq!(best, Some(Direction::Left));
        assert_eq!(best_candidate(Vec::<(Direction, f32)>::new()), None);
    }
}
