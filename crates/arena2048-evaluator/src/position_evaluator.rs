//! Position evaluation: scoring a single board.
//!
//! Every heuristic an agent uses is a [`PositionEvaluator`]. The common
//! implementation, [`FeatureBasedEvaluator`], is a linear combination of board
//! features:
//!
//! ```text
//! value = w₁·f₁ + w₂·f₂ + ... + wₙ·fₙ
//! ```
//!
//! Unlike a normalized model, feature values are used raw, so weights carry
//! both importance and scale (a weight of 0.1 on the score is comparable to a
//! weight of 2.5 on the empty cell count).
//!
//! # Usage
//!
//! ```
//! use arena2048_engine::Board;
//! use arena2048_evaluator::{
//!     board_analysis::BoardAnalysis,
//!     board_feature::{BoxedBoardFeature, EmptyCells, MaxTile},
//!     position_evaluator::{FeatureBasedEvaluator, PositionEvaluator},
//! };
//!
//! let features: Vec<BoxedBoardFeature> = vec![Box::new(EmptyCells), Box::new(MaxTile)];
//! let evaluator = FeatureBasedEvaluator::new(features, vec![10.0, 1.0]);
//!
//! let board = Board::from_rows([[2, 0, 0, 0], [0; 4], [0; 4], [0, 0, 0, 4]]).unwrap();
//! let value = evaluator.evaluate(&BoardAnalysis::from_board(&board, 0));
//! assert!((value - 144.0).abs() < 1e-4);
//! ```

use std::{fmt, iter};

use arena2048_engine::GameState;

use crate::{board_analysis::BoardAnalysis, board_feature::BoxedBoardFeature};

/// Assigns a value to a position (higher is better for the player).
pub trait PositionEvaluator: fmt::Debug + Send + Sync {
    fn evaluate(&self, analysis: &BoardAnalysis) -> f32;

    /// Shorthand for evaluating a state through a fresh analysis.
    fn evaluate_state(&self, state: &GameState) -> f32 {
        self.evaluate(&BoardAnalysis::from_state(state))
    }
}

impl<E> PositionEvaluator for Box<E>
where
    E: PositionEvaluator + ?Sized,
{
    fn evaluate(&self, analysis: &BoardAnalysis) -> f32 {
        self.as_ref().evaluate(analysis)
    }
}

/// Weighted sum of board features.
#[derive(Debug, Clone)]
pub struct FeatureBasedEvaluator {
    features: Vec<BoxedBoardFeature>,
    weights: Vec<f32>,
}

impl FeatureBasedEvaluator {
    /// # Panics
    ///
    /// Panics if `features.len() != weights.len()`
    #[must_use]
    pub fn new(features: Vec<BoxedBoardFeature>, weights: Vec<f32>) -> Self {
        assert_eq!(features.len(), weights.len());
        Self { features, weights }
    }

    #[must_use]
    pub fn features(&self) -> &[BoxedBoardFeature] {
        &self.features
    }

    #[must_use]
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }
}

impl PositionEvaluator for FeatureBasedEvaluator {
    #[inline]
    fn evaluate(&self, analysis: &BoardAnalysis) -> f32 {
        iter::zip(&self.features, &self.weights)
            .map(|(f, w)| f.evaluate(analysis) * w)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use arena2048_engine::Board;

    use super::*;
    use crate::board_feature::{EmptyCells, PotentialMerges, Score};

    #[test]
    fn test_weighted_sum() {
        let evaluator = FeatureBasedEvaluator::new(
            vec![Box::new(Score), Box::new(EmptyCells), Box::new(PotentialMerges)],
            vec![0.5, 2.0, -1.0],
        );
        let board = Board::from_rows([[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]]).unwrap();
        let value = evaluator.evaluate(&BoardAnalysis::from_board(&board, 100));
        // 0.5·100 + 2·14 − 1·1
        assert!((value - 77.0).abs() < 1e-4);
    }

    #[test]
    #[should_panic(expected = "assertion")]
    fn test_length_mismatch_panics() {
        let _ = FeatureBasedEvaluator::new(vec![Box::new(Score)], vec![]);
    }
}
