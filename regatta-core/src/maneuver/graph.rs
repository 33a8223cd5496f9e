//! Maneuver graph
//!
//! One level per maneuver in chronological order, one node per
//! classification hypothesis. Levels live in an arena and refer to their
//! neighbours by index, so dropping or rebuilding a suffix of the graph is
//! a plain `Vec` operation.

use log::debug;
use serde::Serialize;

use super::types::{
    ManeuverForEstimation, ManeuverHypothesis, ManeuverTypeLikelihoods, WindRangeProvider,
};
use crate::error::InferenceError;
use crate::wind::{CombinationMode, WindCourseRange};

/// Confidence added to nodes agreeing with an observed penalty circle
pub const PENALTY_CIRCLE_BONUS: f64 = 0.3;

/// One hypothesis of one maneuver
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    hypothesis: ManeuverHypothesis,
    wind_range: WindCourseRange,
    confidence: f64,
    index_in_level: usize,
}

impl GraphNode {
    pub fn hypothesis(&self) -> &ManeuverHypothesis {
        &self.hypothesis
    }

    pub fn wind_range(&self) -> &WindCourseRange {
        &self.wind_range
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn index_in_level(&self) -> usize {
        self.index_in_level
    }
}

/// All hypotheses of one maneuver; confidences sum to 1
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphLevel {
    index: usize,
    maneuver: ManeuverForEstimation,
    nodes: Vec<GraphNode>,
}

impl GraphLevel {
    /// Build a level from classifier likelihoods: one node each for tack and
    /// jibe, two for bear-away/head-up (one per resulting tack)
    pub fn new(
        index: usize,
        maneuver: ManeuverForEstimation,
        likelihoods: &ManeuverTypeLikelihoods,
        provider: &dyn WindRangeProvider,
    ) -> Self {
        let nodes = ManeuverHypothesis::for_maneuver(&maneuver)
            .into_iter()
            .map(|h| {
                let range = provider.wind_course_range(&maneuver, &h);
                (h, range, h.likelihood(likelihoods))
            })
            .collect();
        Self::with_nodes(index, maneuver, nodes)
    }

    /// Build a level from explicit nodes; confidences are normalized
    pub fn with_nodes(
        index: usize,
        maneuver: ManeuverForEstimation,
        nodes: Vec<(ManeuverHypothesis, WindCourseRange, f64)>,
    ) -> Self {
        let nodes = nodes
            .into_iter()
            .enumerate()
            .map(|(i, (hypothesis, wind_range, confidence))| GraphNode {
                hypothesis,
                wind_range,
                confidence,
                index_in_level: i,
            })
            .collect();
        let mut level = GraphLevel {
            index,
            maneuver,
            nodes,
        };
        level.normalize_confidences();
        level
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Index of the chronologically preceding level
    pub fn previous_level(&self) -> Option<usize> {
        self.index.checked_sub(1)
    }

    pub fn maneuver(&self) -> &ManeuverForEstimation {
        &self.maneuver
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> Result<&GraphNode, InferenceError> {
        self.nodes.get(index).ok_or(InferenceError::UnknownNode {
            level: self.index,
            node: index,
        })
    }

    pub fn confidence_sum(&self) -> f64 {
        self.nodes.iter().map(|n| n.confidence).sum()
    }

    /// Scale confidences to sum to 1. Degenerate input (all zero, NaN)
    /// becomes a uniform distribution.
    pub fn normalize_confidences(&mut self) {
        if self.nodes.is_empty() {
            return;
        }
        let sum = self.confidence_sum();
        if sum > 0.0 && sum.is_finite() {
            for node in &mut self.nodes {
                node.confidence /= sum;
            }
        } else {
            let uniform = 1.0 / self.nodes.len() as f64;
            for node in &mut self.nodes {
                node.confidence = uniform;
            }
        }
    }

    /// A penalty circle pins the wind into `penalty_circle_range`. Nodes
    /// whose own range overlaps it gain [`PENALTY_CIRCLE_BONUS`], then the
    /// level is normalized again.
    pub fn upgrade_level_nodes_considering_penalty_circle(
        &mut self,
        penalty_circle_range: &WindCourseRange,
    ) {
        let mut upgraded = 0;
        for node in &mut self.nodes {
            let combined = node
                .wind_range
                .intersect(penalty_circle_range, CombinationMode::Intersection);
            if !combined.is_violation() {
                node.confidence += PENALTY_CIRCLE_BONUS;
                upgraded += 1;
            }
        }
        debug!(
            "Penalty circle upgraded {} of {} nodes in level {}",
            upgraded,
            self.nodes.len(),
            self.index
        );
        self.normalize_confidences();
    }
}

/// Chronological arena of levels
#[derive(Debug, Clone, Default, Serialize)]
pub struct ManeuverGraph {
    levels: Vec<GraphLevel>,
}

impl ManeuverGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn levels(&self) -> &[GraphLevel] {
        &self.levels
    }

    pub fn level(&self, index: usize) -> Result<&GraphLevel, InferenceError> {
        self.levels
            .get(index)
            .ok_or(InferenceError::UnknownLevel(index))
    }

    pub fn last_level_index(&self) -> Option<usize> {
        self.levels.len().checked_sub(1)
    }

    /// Append a maneuver at the end of the chain, returning its level index
    pub fn push_maneuver(
        &mut self,
        maneuver: ManeuverForEstimation,
        likelihoods: &ManeuverTypeLikelihoods,
        provider: &dyn WindRangeProvider,
    ) -> usize {
        let index = self.levels.len();
        self.levels
            .push(GraphLevel::new(index, maneuver, likelihoods, provider));
        index
    }

    /// Append a level with explicit nodes, returning its index
    #[cfg(test)]
    pub(crate) fn push_level_with_nodes(
        &mut self,
        maneuver: ManeuverForEstimation,
        nodes: Vec<(ManeuverHypothesis, WindCourseRange, f64)>,
    ) -> usize {
        let index = self.levels.len();
        self.levels
            .push(GraphLevel::with_nodes(index, maneuver, nodes));
        index
    }

    /// Insert a maneuver at its chronological position. Returns the index
    /// of the new level; best paths from that index on are stale.
    pub fn insert_maneuver(
        &mut self,
        maneuver: ManeuverForEstimation,
        likelihoods: &ManeuverTypeLikelihoods,
        provider: &dyn WindRangeProvider,
    ) -> usize {
        let index = self
            .levels
            .partition_point(|l| l.maneuver.time <= maneuver.time);
        self.levels
            .insert(index, GraphLevel::new(index, maneuver, likelihoods, provider));
        for (i, level) in self.levels.iter_mut().enumerate().skip(index + 1) {
            level.index = i;
        }
        index
    }

    /// Rebuild a level whose maneuver was revised. Returns the index to
    /// recompute best paths from.
    pub fn revise_level(
        &mut self,
        index: usize,
        maneuver: ManeuverForEstimation,
        likelihoods: &ManeuverTypeLikelihoods,
        provider: &dyn WindRangeProvider,
    ) -> Result<usize, InferenceError> {
        let level = self
            .levels
            .get_mut(index)
            .ok_or(InferenceError::UnknownLevel(index))?;
        *level = GraphLevel::new(index, maneuver, likelihoods, provider);
        Ok(index)
    }

    /// Apply the penalty circle upgrade to one level. Returns the index to
    /// recompute best paths from.
    pub fn upgrade_level_considering_penalty_circle(
        &mut self,
        index: usize,
        penalty_circle_range: &WindCourseRange,
    ) -> Result<usize, InferenceError> {
        self.levels
            .get_mut(index)
            .ok_or(InferenceError::UnknownLevel(index))?
            .upgrade_level_nodes_considering_penalty_circle(penalty_circle_range);
        Ok(index)
    }

    /// Drop all levels from `len` on
    pub fn truncate(&mut self, len: usize) {
        self.levels.truncate(len);
    }
}
