use std::ops::RangeInclusive;

use arena2048_engine::{Direction, GameState};
use arena2048_evaluator::{
    position_evaluator::{FeatureBasedEvaluator, PositionEvaluator as _},
    presets,
};
use serde::{Deserialize, Serialize};

use super::{DepthConfig, afterstates};
use crate::{
    agent::Agent,
    kind::AgentKind,
    params::{AgentParams, clamp_or},
};

pub const DEFAULT_BEAM_WIDTH: u32 = 3;
pub const BEAM_WIDTH_RANGE: RangeInclusive<u32> = 1..=10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeamConfig {
    pub depth: DepthConfig,
    pub beam_width: u32,
}

impl Default for BeamConfig {
    fn default() -> Self {
        Self {
            depth: DepthConfig::default(),
            beam_width: DEFAULT_BEAM_WIDTH,
        }
    }
}

impl BeamConfig {
    #[must_use]
    pub fn from_params(params: &AgentParams) -> Self {
        Self {
            depth: DepthConfig::from_params(params),
            beam_width: clamp_or(params.beam_width, DEFAULT_BEAM_WIDTH, BEAM_WIDTH_RANGE),
        }
    }
}

/// Level-by-level search that keeps only the `beam_width` best states of
/// each level.
///
/// Every evaluated node counts: a strong afterstate at depth one still wins
/// if the deeper levels only find worse positions.
#[derive(Debug, Clone)]
pub struct BeamSearchAgent {
    config: BeamConfig,
    evaluator: FeatureBasedEvaluator,
}

impl Default for BeamSearchAgent {
    fn default() -> Self {
        Self::new(BeamConfig::default())
    }
}

impl BeamSearchAgent {
    #[must_use]
    pub fn new(config: BeamConfig) -> Self {
        Self {
            config,
            evaluator: presets::lookahead(),
        }
    }

    #[must_use]
    pub fn from_params(params: &AgentParams) -> Self {
        Self::new(BeamConfig::from_params(params))
    }

    #[must_use]
    pub fn config(&self) -> &BeamConfig {
        &self.config
    }

    pub fn set_max_depth(&mut self, max_depth: u32) {
        self.config.depth.set_max_depth(max_depth);
    }

    pub fn set_beam_width(&mut self, beam_width: u32) {
        self.config.beam_width = clamp_or(Some(beam_width), DEFAULT_BEAM_WIDTH, BEAM_WIDTH_RANGE);
    }

    /// Returns the first move leading to the best node seen, and its value.
    #[must_use]
    pub fn search(&self, state: &GameState) -> Option<(Direction, f32)> {
        let deadline = self.config.depth.deadline();
        let width = usize::try_from(self.config.beam_width).unwrap_or(usize::MAX);

        let mut beam = vec![(None::<Direction>, state.clone())];
        let mut best: Option<(Direction, f32)> = None;
        for level in 0..self.config.depth.max_depth {
            if level > 0 && deadline.is_expired() {
                break;
            }
            let mut candidates = Vec::new();
            for (first_move, parent) in &beam {
                for (direction, child) in afterstates(parent) {
                    let first_move = first_move.unwrap_or(direction);
                    let value = self.evaluator.evaluate_state(&child);
                    candidates.push((first_move, child, value));
                }
            }
            if candidates.is_empty() {
                break;
            }
            // Stable, so equal values keep generation order.
            candidates.sort_by(|a, b| b.2.total_cmp(&a.2));
            candidates.truncate(width);

            let (level_move, _, level_value) = &candidates[0];
            if best.is_none_or(|(_, best_value)| *level_value > best_value) {
                best = Some((*level_move, *level_value));
            }
            beam = candidates
                .into_iter()
                .map(|(first_move, child, _)| (Some(first_move), child))
                .collect();
        }
        best
    }
}

impl Agent for BeamSearchAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::BeamSearch
    }

    fn select_move(&mut self, state: &GameState) -> Option<Direction> {
        let best = self.search(state).map(|(direction, _)| direction);
        log::debug!("beam search picked {best:?}");
        best
    }
}
