//! Evaluators used by the agent families.
//!
//! | preset              | formula                                                              |
//! |---------------------|----------------------------------------------------------------------|
//! | [`minimax`]         | 0.1·score + 2.5·empty + 2·quadrant + mono + 1.2·merges               |
//! | [`expectimax`]      | 0.1·score + 2.7·empty + 3·quadrant + mono + 1.5·merges + displacement |
//! | [`heuristic`]       | 10·quadrant + 5·mono + 3·empty + 2·merges + centre pressure          |
//! | [`weighted`]        | 2.7·empty + 3·quadrant + mono + 1.5·merges + 0.5·smoothness + anchor |
//! | [`astar`]           | 10·corners + 5·empty + 2·ordered pairs + 3·max                       |
//! | [`lookahead`]       | score + 2·corners + 10·empty + max                                   |
//! | [`rollout`]         | score + 10·max + 5·empty                                             |
//! | [`neural_fallback`] | score + 2·corners + 10·empty + 5·max                                 |
//! | [`genome`]          | w₀·corners + w₁·empty + w₂·mono + w₃·merges + w₄·max                 |

use crate::{
    board_feature::{
        BoxedBoardFeature, CenterPressure, CornerSum, EmptyCells, MaxTile, MaxTileAnchor,
        MaxTileDisplacement, Monotonicity, OrderedPairs, PotentialMerges, Score, Smoothness,
    },
    position_evaluator::FeatureBasedEvaluator,
};

/// Number of weights in a [`genome`] evaluator.
pub const GENOME_LEN: usize = 5;

fn build(terms: Vec<(BoxedBoardFeature, f32)>) -> FeatureBasedEvaluator {
    let (features, weights) = terms.into_iter().unzip();
    FeatureBasedEvaluator::new(features, weights)
}

/// Leaf evaluation of the minimax and alpha-beta searches.
#[must_use]
pub fn minimax() -> FeatureBasedEvaluator {
    build(vec![
        (Box::new(Score), 0.1),
        (Box::new(EmptyCells), 2.5),
        (Box::new(CornerSum::QUADRANT), 2.0),
        (Box::new(Monotonicity), 1.0),
        (Box::new(PotentialMerges), 1.2),
    ])
}

/// Leaf evaluation of the expectimax search.
#[must_use]
pub fn expectimax() -> FeatureBasedEvaluator {
    build(vec![
        (Box::new(Score), 0.1),
        (Box::new(EmptyCells), 2.7),
        (Box::new(CornerSum::QUADRANT), 3.0),
        (Box::new(Monotonicity), 1.0),
        (Box::new(PotentialMerges), 1.5),
        (Box::new(MaxTileDisplacement), 1.0),
    ])
}

#[must_use]
pub fn heuristic() -> FeatureBasedEvaluator {
    build(vec![
        (Box::new(CornerSum::QUADRANT), 10.0),
        (Box::new(Monotonicity), 5.0),
        (Box::new(EmptyCells), 3.0),
        (Box::new(PotentialMerges), 2.0),
        (Box::new(CenterPressure), 1.0),
    ])
}

#[must_use]
pub fn weighted() -> FeatureBasedEvaluator {
    build(vec![
        (Box::new(EmptyCells), 2.7),
        (Box::new(CornerSum::QUADRANT), 3.0),
        (Box::new(Monotonicity), 1.0),
        (Box::new(PotentialMerges), 1.5),
        (Box::new(Smoothness), 0.5),
        (Box::new(MaxTileAnchor), 1.0),
    ])
}

/// Goodness of a position for A*; the search uses its negation as `h`.
#[must_use]
pub fn astar() -> FeatureBasedEvaluator {
    build(vec![
        (Box::new(CornerSum::CORNERS), 10.0),
        (Box::new(EmptyCells), 5.0),
        (Box::new(OrderedPairs), 2.0),
        (Box::new(MaxTile), 3.0),
    ])
}

/// Leaf evaluation of beam search and iterative deepening.
#[must_use]
pub fn lookahead() -> FeatureBasedEvaluator {
    build(vec![
        (Box::new(Score), 1.0),
        (Box::new(CornerSum::CORNERS), 2.0),
        (Box::new(EmptyCells), 10.0),
        (Box::new(MaxTile), 1.0),
    ])
}

/// Value of the end position of an MCTS rollout.
#[must_use]
pub fn rollout() -> FeatureBasedEvaluator {
    build(vec![
        (Box::new(Score), 1.0),
        (Box::new(MaxTile), 10.0),
        (Box::new(EmptyCells), 5.0),
    ])
}

/// One-ply evaluation used by neural agents without a network.
#[must_use]
pub fn neural_fallback() -> FeatureBasedEvaluator {
    build(vec![
        (Box::new(Score), 1.0),
        (Box::new(CornerSum::CORNERS), 2.0),
        (Box::new(EmptyCells), 10.0),
        (Box::new(MaxTile), 5.0),
    ])
}

/// Evaluator whose weights are the genes of a genetic individual, in the
/// order corner, empty, monotonicity, merge, max tile.
#[must_use]
pub fn genome(weights: [f32; GENOME_LEN]) -> FeatureBasedEvaluator {
    let features: Vec<BoxedBoardFeature> = vec![
        Box::new(CornerSum::CORNERS),
        Box::new(EmptyCells),
        Box::new(Monotonicity),
        Box::new(PotentialMerges),
        Box::new(MaxTile),
    ];
    FeatureBasedEvaluator::new(features, weights.to_vec())
}
