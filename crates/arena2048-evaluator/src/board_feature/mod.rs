//! Board features: named scalar measurements of a position.
//!
//! Every heuristic used by the agents is a weighted sum of a handful of
//! features. A feature reads one metric from a [`BoardAnalysis`] and turns it
//! into an `f32` where larger means "better for the player" (penalties are
//! returned as negative values).
//!
//! # Feature Catalogue
//!
//! | id                     | value                                                         |
//! |------------------------|---------------------------------------------------------------|
//! | `score`                | current game score                                            |
//! | `empty_cells`          | number of empty cells                                         |
//! | `corner_sum`           | sum of the four corner cells                                  |
//! | `quadrant_sum`         | sum of the top-left 2×2 cells                                 |
//! | `monotonicity`         | 10 per monotonic row or column                                |
//! | `ordered_pairs`        | adjacent pairs that do not decrease (empty cells count)       |
//! | `potential_merges`     | adjacent equal pairs                                          |
//! | `max_tile`             | largest tile                                                  |
//! | `smoothness`           | negated log2 differences between neighbours                   |
//! | `max_tile_anchor`      | max tile if anchored in the top-left quadrant, else −0.5×max  |
//! | `max_tile_displacement`| 0 if anchored, else −0.5×max                                  |
//! | `center_pressure`      | −0.5× every centre tile above 64                              |
//!
//! [`BoardAnalysis`]: crate::board_analysis::BoardAnalysis

use std::fmt;

use crate::board_analysis::BoardAnalysis;

pub use self::source::*;

mod source;

/// A scalar measurement of a position.
pub trait BoardFeature: fmt::Debug + Send + Sync {
    #[must_use]
    fn id(&self) -> &str;
    #[must_use]
    fn name(&self) -> &str;
    #[must_use]
    fn clone_boxed(&self) -> BoxedBoardFeature;
    #[must_use]
    fn evaluate(&self, analysis: &BoardAnalysis) -> f32;
}

pub type BoxedBoardFeature = Box<dyn BoardFeature>;

impl Clone for BoxedBoardFeature {
    fn clone(&self) -> Self {
        self.clone_boxed()
    }
}

impl BoardFeature for BoxedBoardFeature {
    fn id(&self) -> &str {
        self.as_ref().id()
    }

    fn name(&self) -> &str {
        self.as_ref().name()
    }

    fn clone_boxed(&self) -> BoxedBoardFeature {
        self.as_ref().clone_boxed()
    }

    fn evaluate(&self, analysis: &BoardAnalysis) -> f32 {
        self.as_ref().evaluate(analysis)
    }
}

/// Every feature, in catalogue order.
#[must_use]
pub fn all_board_features() -> Vec<BoxedBoardFeature> {
    vec![
        Box::new(Score),
        Box::new(EmptyCells),
        Box::new(CornerSum::CORNERS),
        Box::new(CornerSum::QUADRANT),
        Box::new(Monotonicity),
        Box::new(OrderedPairs),
        Box::new(PotentialMerges),
        Box::new(MaxTile),
        Box::new(Smoothness),
        Box::new(MaxTileAnchor),
        Box::new(MaxTileDisplacement),
        Box::new(CenterPressure),
    ]
}

/// Looks a feature up by its id.
#[must_use]
pub fn feature_by_id(id: &str) -> Option<BoxedBoardFeature> {
    all_board_features().into_iter().find(|f| f.id() == id)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_feature_ids_are_unique() {
        let features = all_board_features();
        let ids = features.iter().map(|f| f.id()).collect::<HashSet<_>>();
        assert_eq!(ids.len(), features.len());
    }

    #[test]
    fn test_feature_by_id() {
        assert_eq!(feature_by_id("smoothness").unwrap().name(), "Smoothness");
        assert!(feature_by_id("holes").is_none());
    }
}
