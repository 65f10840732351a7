//! Heuristic evaluation of 2048 positions.
//!
//! The crate is layered the same way move selection is:
//!
//! ```text
//! Turn Evaluation (pick the best one-ply move)
//!     ↓ uses
//! Position Evaluation (score one afterstate)
//!     ↓ uses
//! Board Features (scalar measurements read from a board analysis)
//! ```
//!
//! - [`board_analysis`] - Lazily computed board metrics (empty cells,
//!   monotonicity, merges, smoothness, anchoring, ...)
//! - [`board_feature`] - Named features built on those metrics
//! - [`position_evaluator`] - Weighted sums of features
//! - [`presets`] - The fixed evaluators of each agent family, plus the
//!   genome-weighted one evolved by the genetic agent
//! - [`turn_evaluator`] - Greedy one-ply move selection
//!
//! Search agents call a position evaluator at their leaves; one-ply agents
//! go through [`turn_evaluator::TurnEvaluator`].
//!
//! # Example
//!
//! ```
//! use arena2048_engine::{Game, SpawnSeed};
//! use arena2048_evaluator::{presets, turn_evaluator::TurnEvaluator};
//!
//! let evaluator = TurnEvaluator::new(Box::new(presets::weighted()));
//! let mut game = Game::with_seed(SpawnSeed::from_u128(1));
//! while let Some((direction, _)) = evaluator.select_best_move(game.state()) {
//!     game.make_move(direction);
//! }
//! assert!(game.state().is_terminal());
//! ```

pub mod board_analysis;
pub mod board_feature;
pub mod position_evaluator;
pub mod presets;
pub mod turn_evaluator;
