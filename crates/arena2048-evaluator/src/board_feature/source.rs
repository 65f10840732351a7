//! Feature types reading metrics from a [`BoardAnalysis`].

use arena2048_engine::Board;

use crate::board_analysis::{BoardAnalysis, TOP_LEFT_QUADRANT};

use super::{BoardFeature, BoxedBoardFeature};

#[expect(clippy::cast_precision_loss)]
fn as_f32(value: u64) -> f32 {
    value as f32
}

/// Current game score.
#[derive(Debug, Clone)]
pub struct Score;

impl BoardFeature for Score {
    fn id(&self) -> &'static str {
        "score"
    }
    fn name(&self) -> &'static str {
        "Score"
    }
    fn clone_boxed(&self) -> BoxedBoardFeature {
        Box::new(self.clone())
    }
    fn evaluate(&self, analysis: &BoardAnalysis) -> f32 {
        as_f32(analysis.score())
    }
}

/// Number of empty cells; a proxy for how much room is left to manoeuvre.
#[derive(Debug, Clone)]
pub struct EmptyCells;

impl BoardFeature for EmptyCells {
    fn id(&self) -> &'static str {
        "empty_cells"
    }
    fn name(&self) -> &'static str {
        "Empty Cells"
    }
    fn clone_boxed(&self) -> BoxedBoardFeature {
        Box::new(self.clone())
    }
    fn evaluate(&self, analysis: &BoardAnalysis) -> f32 {
        f32::from(analysis.empty_count())
    }
}

/// Sum of the tiles in a fixed set of cells.
///
/// Two regions are in use: the four true corners, and the top-left 2×2
/// quadrant favoured by the adversarial and hand-tuned heuristics.
#[derive(Debug, Clone)]
pub struct CornerSum {
    id: &'static str,
    name: &'static str,
    cells: [usize; 4],
}

impl CornerSum {
    pub const CORNERS: Self = Self {
        id: "corner_sum",
        name: "Corner Sum",
        cells: Board::CORNERS,
    };
    pub const QUADRANT: Self = Self {
        id: "quadrant_sum",
        name: "Top-Left Quadrant Sum",
        cells: TOP_LEFT_QUADRANT,
    };

    #[must_use]
    pub fn cells(&self) -> &[usize; 4] {
        &self.cells
    }
}

impl BoardFeature for CornerSum {
    fn id(&self) -> &'static str {
        self.id
    }
    fn name(&self) -> &'static str {
        self.name
    }
    fn clone_boxed(&self) -> BoxedBoardFeature {
        Box::new(self.clone())
    }
    fn evaluate(&self, analysis: &BoardAnalysis) -> f32 {
        as_f32(analysis.cell_sum(&self.cells))
    }
}

/// Bonus for rows and columns whose tiles are ordered.
///
/// See [`BoardAnalysis::monotonicity`].
#[derive(Debug, Clone)]
pub struct Monotonicity;

impl BoardFeature for Monotonicity {
    fn id(&self) -> &'static str {
        "monotonicity"
    }
    fn name(&self) -> &'static str {
        "Monotonicity"
    }
    fn clone_boxed(&self) -> BoxedBoardFeature {
        Box::new(self.clone())
    }
    fn evaluate(&self, analysis: &BoardAnalysis) -> f32 {
        as_f32(analysis.monotonicity().into())
    }
}

/// Pairwise ordering count; a finer-grained monotonicity.
#[derive(Debug, Clone)]
pub struct OrderedPairs;

impl BoardFeature for OrderedPairs {
    fn id(&self) -> &'static str {
        "ordered_pairs"
    }
    fn name(&self) -> &'static str {
        "Ordered Pairs"
    }
    fn clone_boxed(&self) -> BoxedBoardFeature {
        Box::new(self.clone())
    }
    fn evaluate(&self, analysis: &BoardAnalysis) -> f32 {
        as_f32(analysis.ordered_pairs().into())
    }
}

/// Adjacent equal tiles that one slide could merge.
#[derive(Debug, Clone)]
pub struct PotentialMerges;

impl BoardFeature for PotentialMerges {
    fn id(&self) -> &'static str {
        "potential_merges"
    }
    fn name(&self) -> &'static str {
        "Potential Merges"
    }
    fn clone_boxed(&self) -> BoxedBoardFeature {
        Box::new(self.clone())
    }
    fn evaluate(&self, analysis: &BoardAnalysis) -> f32 {
        as_f32(analysis.potential_merges().into())
    }
}

#[derive(Debug, Clone)]
pub struct MaxTile;

impl BoardFeature for MaxTile {
    fn id(&self) -> &'static str {
        "max_tile"
    }
    fn name(&self) -> &'static str {
        "Max Tile"
    }
    fn clone_boxed(&self) -> BoxedBoardFeature {
        Box::new(self.clone())
    }
    fn evaluate(&self, analysis: &BoardAnalysis) -> f32 {
        as_f32(analysis.max_tile().into())
    }
}

/// Penalty for jagged boards. See [`BoardAnalysis::smoothness`].
#[derive(Debug, Clone)]
pub struct Smoothness;

impl BoardFeature for Smoothness {
    fn id(&self) -> &'static str {
        "smoothness"
    }
    fn name(&self) -> &'static str {
        "Smoothness"
    }
    fn clone_boxed(&self) -> BoxedBoardFeature {
        Box::new(self.clone())
    }
    fn evaluate(&self, analysis: &BoardAnalysis) -> f32 {
        analysis.smoothness()
    }
}

/// Rewards an anchored max tile with its value and penalizes a stray one
/// with half of it.
#[derive(Debug, Clone)]
pub struct MaxTileAnchor;

impl BoardFeature for MaxTileAnchor {
    fn id(&self) -> &'static str {
        "max_tile_anchor"
    }
    fn name(&self) -> &'static str {
        "Max Tile Anchor"
    }
    fn clone_boxed(&self) -> BoxedBoardFeature {
        Box::new(self.clone())
    }
    fn evaluate(&self, analysis: &BoardAnalysis) -> f32 {
        let max = as_f32(analysis.max_tile().into());
        if analysis.is_max_tile_anchored() {
            max
        } else {
            -0.5 * max
        }
    }
}

/// Penalty-only variant of [`MaxTileAnchor`].
#[derive(Debug, Clone)]
pub struct MaxTileDisplacement;

impl BoardFeature for MaxTileDisplacement {
    fn id(&self) -> &'static str {
        "max_tile_displacement"
    }
    fn name(&self) -> &'static str {
        "Max Tile Displacement"
    }
    fn clone_boxed(&self) -> BoxedBoardFeature {
        Box::new(self.clone())
    }
    fn evaluate(&self, analysis: &BoardAnalysis) -> f32 {
        if analysis.is_max_tile_anchored() {
            0.0
        } else {
            -0.5 * as_f32(analysis.max_tile().into())
        }
    }
}

/// Penalty for large tiles stuck in the centre.
#[derive(Debug, Clone)]
pub struct CenterPressure;

impl BoardFeature for CenterPressure {
    fn id(&self) -> &'static str {
        "center_pressure"
    }
    fn name(&self) -> &'static str {
        "Center Pressure"
    }
    fn clone_boxed(&self) -> BoxedBoardFeature {
        Box::new(self.clone())
    }
    fn evaluate(&self, analysis: &BoardAnalysis) -> f32 {
        analysis.center_pressure()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis(rows: [[u32; 4]; 4], score: u64) -> BoardAnalysis {
        BoardAnalysis::from_board(&Board::from_rows(rows).unwrap(), score)
    }

    #[test]
    fn test_corner_regions_differ() {
        let a = analysis([[2, 4, 0, 8], [16, 32, 0, 0], [0, 0, 0, 0], [64, 0, 0, 128]], 0);
        assert!((CornerSum::CORNERS.evaluate(&a) - 202.0).abs() < f32::EPSILON);
        assert!((CornerSum::QUADRANT.evaluate(&a) - 54.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_anchor_features() {
        let anchored = analysis([[256, 0, 0, 0], [0; 4], [0; 4], [0, 0, 0, 4]], 0);
        assert!((MaxTileAnchor.evaluate(&anchored) - 256.0).abs() < f32::EPSILON);
        assert!(MaxTileDisplacement.evaluate(&anchored).abs() < f32::EPSILON);

        let stray = analysis([[4, 0, 0, 0], [0; 4], [0; 4], [0, 0, 0, 256]], 0);
        assert!((MaxTileAnchor.evaluate(&stray) + 128.0).abs() < f32::EPSILON);
        assert!((MaxTileDisplacement.evaluate(&stray) + 128.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_score_feature_reads_score() {
        let a = analysis([[0; 4]; 4], 1234);
        assert!((Score.evaluate(&a) - 1234.0).abs() < f32::EPSILON);
    }
}
