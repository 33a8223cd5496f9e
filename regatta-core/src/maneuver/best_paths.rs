//! Best-Paths Calculator
//!
//! Viterbi-style decoding over the maneuver graph. The forward pass keeps,
//! per node, the most probable predecessor together with the wind range
//! accumulated along that path, and the HMM forward variable. The optional
//! backward pass yields forward-backward posteriors for calibrated
//! per-node confidence.
//!
//! Probabilities are renormalized per level before they feed the next
//! level. Accumulated wind ranges are path-dependent constraints rather
//! than emissions, so log-space would not buy anything here; per-level
//! scaling keeps magnitudes bounded over long races and leaves the arg-max
//! unchanged.
//!
//! # State
//!
//! ```text
//!   Uninitialized ──compute level 0──▶ Partial{last}
//!        ▲                               │  ▲
//!        │ reset_state                   │  │ compute next level /
//!        │                               ▼  │ recompute from L
//!        └────────────────────────── BackwardComputed{last}
//! ```

use log::debug;
use serde::Serialize;

use super::graph::{GraphLevel, ManeuverGraph};
use super::transition::GraphNodeTransitionProbabilitiesCalculator;
use super::types::ManeuverHypothesis;
use crate::error::InferenceError;
use crate::track::TimePoint;
use crate::wind::IntersectedWindRange;

/// Per-node result of the forward (and backward) pass
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BestManeuverNodeInfo {
    best_previous_node: Option<usize>,
    probability_from_start: f64,
    forward_probability: f64,
    backward_probability: f64,
    wind_range: IntersectedWindRange,
}

impl BestManeuverNodeInfo {
    /// Node of the previous level on the most probable path to this node
    pub fn best_previous_node(&self) -> Option<usize> {
        self.best_previous_node
    }

    pub fn probability_from_start(&self) -> f64 {
        self.probability_from_start
    }

    pub fn forward_probability(&self) -> f64 {
        self.forward_probability
    }

    pub fn backward_probability(&self) -> f64 {
        self.backward_probability
    }

    /// Wind range accumulated along the most probable path
    pub fn wind_range(&self) -> &IntersectedWindRange {
        &self.wind_range
    }
}

#[derive(Debug, Clone, PartialEq)]
struct BestPathsPerLevel {
    nodes: Vec<BestManeuverNodeInfo>,
    probabilities_from_start_sum: f64,
    forward_probabilities_sum: f64,
    backward_probabilities_sum: f64,
}

impl BestPathsPerLevel {
    fn new(nodes: Vec<BestManeuverNodeInfo>) -> Self {
        let mut level = BestPathsPerLevel {
            nodes,
            probabilities_from_start_sum: 0.0,
            forward_probabilities_sum: 0.0,
            backward_probabilities_sum: 0.0,
        };
        level.update_sums();
        level
    }

    fn update_sums(&mut self) {
        self.probabilities_from_start_sum = self.nodes.iter().map(|n| n.probability_from_start).sum();
        self.forward_probabilities_sum = self.nodes.iter().map(|n| n.forward_probability).sum();
        self.backward_probabilities_sum = self.nodes.iter().map(|n| n.backward_probability).sum();
    }

    fn ratio(&self, value: f64, sum: f64) -> f64 {
        if sum > 0.0 {
            value / sum
        } else {
            1.0 / self.nodes.len() as f64
        }
    }

    fn normalized_probability_from_start(&self, node: usize) -> f64 {
        self.ratio(self.nodes[node].probability_from_start, self.probabilities_from_start_sum)
    }

    fn normalized_forward_probability(&self, node: usize) -> f64 {
        self.ratio(self.nodes[node].forward_probability, self.forward_probabilities_sum)
    }

    fn normalized_backward_probability(&self, node: usize) -> f64 {
        self.ratio(self.nodes[node].backward_probability, self.backward_probabilities_sum)
    }

    /// Posterior of `node` given all levels
    fn normalized_forward_backward_probability(&self, node: usize) -> f64 {
        let product = |i: usize| {
            self.normalized_forward_probability(i) * self.normalized_backward_probability(i)
        };
        let sum: f64 = (0..self.nodes.len()).map(product).sum();
        self.ratio(product(node), sum)
    }

    fn best_node(&self) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for i in 0..self.nodes.len() {
            let p = self.normalized_probability_from_start(i);
            if best.map_or(true, |(_, max)| max < p) {
                best = Some((i, p));
            }
        }
        best.map(|(i, _)| i)
    }
}

/// Where the calculator is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CalculatorState {
    Uninitialized,
    Partial { last_level: usize },
    BackwardComputed { last_level: usize },
}

/// Chosen node of one level on the best path
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphLevelInference {
    pub level: usize,
    pub time: TimePoint,
    pub node: usize,
    pub hypothesis: ManeuverHypothesis,
    pub confidence: f64,
    pub wind_range: IntersectedWindRange,
    /// Middle of the accumulated wind range, degrees
    pub wind_course: f64,
}

/// Forward/backward decoder over a [`ManeuverGraph`]
pub struct BestPathsCalculator<T: GraphNodeTransitionProbabilitiesCalculator> {
    transition: T,
    precise_confidence: bool,
    // Index equals graph level index
    best_paths: Vec<BestPathsPerLevel>,
    backward_computed: bool,
}

impl<T: GraphNodeTransitionProbabilitiesCalculator> BestPathsCalculator<T> {
    /// `precise_confidence` selects forward-backward posteriors over the
    /// cheaper best-path ratio when paths are extracted
    pub fn new(transition: T, precise_confidence: bool) -> Self {
        BestPathsCalculator {
            transition,
            precise_confidence,
            best_paths: Vec::new(),
            backward_computed: false,
        }
    }

    pub fn transition(&self) -> &T {
        &self.transition
    }

    pub fn is_precise_confidence(&self) -> bool {
        self.precise_confidence
    }

    pub fn state(&self) -> CalculatorState {
        match self.last_level() {
            None => CalculatorState::Uninitialized,
            Some(last_level) if self.backward_computed => {
                CalculatorState::BackwardComputed { last_level }
            }
            Some(last_level) => CalculatorState::Partial { last_level },
        }
    }

    pub fn reset_state(&mut self) {
        self.best_paths.clear();
        self.backward_computed = false;
    }

    /// Index of the last processed level
    pub fn last_level(&self) -> Option<usize> {
        self.best_paths.len().checked_sub(1)
    }

    /// Cached per-node results of a processed level
    pub fn best_paths_for_level(&self, level: usize) -> Option<&[BestManeuverNodeInfo]> {
        self.best_paths.get(level).map(|l| l.nodes.as_slice())
    }

    /// Extend the forward pass by one level. The level's predecessor must
    /// be the last processed level (none for the first level).
    pub fn compute_best_paths_to_next_level(
        &mut self,
        graph: &ManeuverGraph,
        level_index: usize,
    ) -> Result<(), InferenceError> {
        let level = graph.level(level_index)?;
        let expected_previous = self.last_level();
        let actual_previous = level.previous_level();
        if expected_previous != actual_previous {
            return Err(InferenceError::OutOfSequence {
                level: level_index,
                expected_previous,
                actual_previous,
            });
        }

        let nodes = match actual_previous {
            None => Self::first_level_infos(level),
            Some(previous) => {
                let previous_level = graph.level(previous)?;
                self.next_level_infos(previous_level, &self.best_paths[previous], level)
            }
        };
        self.best_paths.push(BestPathsPerLevel::new(nodes));
        self.backward_computed = false;
        Ok(())
    }

    fn first_level_infos(level: &GraphLevel) -> Vec<BestManeuverNodeInfo> {
        let n = level.nodes().len() as f64;
        level
            .nodes()
            .iter()
            .map(|node| {
                let p = node.confidence() / n;
                BestManeuverNodeInfo {
                    best_previous_node: None,
                    probability_from_start: p,
                    forward_probability: p,
                    backward_probability: 0.0,
                    wind_range: node.wind_range().to_intersected(),
                }
            })
            .collect()
    }

    fn next_level_infos(
        &self,
        previous_level: &GraphLevel,
        previous_paths: &BestPathsPerLevel,
        level: &GraphLevel,
    ) -> Vec<BestManeuverNodeInfo> {
        if previous_level.nodes().is_empty() {
            return Self::first_level_infos(level);
        }
        level
            .nodes()
            .iter()
            .map(|current| {
                let mut best: Option<(usize, f64, IntersectedWindRange)> = None;
                let mut forward_probability = 0.0;
                for (p, previous) in previous_level.nodes().iter().enumerate() {
                    let previous_info = &previous_paths.nodes[p];
                    let (range, transition) = self.transition.merge_with_next_node(
                        previous,
                        previous_level,
                        &previous_info.wind_range,
                        current,
                        level,
                    );
                    let weight = transition * current.confidence();
                    let candidate = previous_paths.normalized_probability_from_start(p) * weight;
                    forward_probability +=
                        weight * previous_paths.normalized_forward_probability(p);
                    // Strict comparison: first previous node wins ties
                    if best.as_ref().map_or(true, |(_, max, _)| candidate > *max) {
                        best = Some((p, candidate, range));
                    }
                }
                let (previous, probability, range) = best.unwrap_or_else(|| {
                    (0, 0.0, current.wind_range().to_intersected())
                });
                BestManeuverNodeInfo {
                    best_previous_node: Some(previous),
                    probability_from_start: probability,
                    forward_probability,
                    backward_probability: 0.0,
                    wind_range: range,
                }
            })
            .collect()
    }

    /// Forward pass over every level of the graph, discarding cached state
    pub fn compute_best_paths_from_scratch(
        &mut self,
        graph: &ManeuverGraph,
    ) -> Result<(), InferenceError> {
        self.reset_state();
        self.compute_pending_levels(graph)
    }

    /// Process graph levels appended since the last call
    pub fn compute_pending_levels(&mut self, graph: &ManeuverGraph) -> Result<(), InferenceError> {
        for index in self.best_paths.len()..graph.len() {
            self.compute_best_paths_to_next_level(graph, index)?;
        }
        Ok(())
    }

    /// Discard cached state from `from_level` on and run the forward pass
    /// from there to the end of the graph. Earlier levels are kept.
    pub fn recompute_best_paths_from_level(
        &mut self,
        graph: &ManeuverGraph,
        from_level: usize,
    ) -> Result<(), InferenceError> {
        if from_level > graph.len() {
            return Err(InferenceError::UnknownLevel(from_level));
        }
        let kept = from_level.min(self.best_paths.len());
        debug!(
            "Recomputing best paths from level {} of {} (cached {})",
            kept,
            graph.len(),
            self.best_paths.len()
        );
        self.best_paths.truncate(kept);
        self.backward_computed = false;
        self.compute_pending_levels(graph)
    }

    /// Backward pass seeded with 1 at the last processed level
    pub fn compute_backward_probabilities(
        &mut self,
        graph: &ManeuverGraph,
    ) -> Result<(), InferenceError> {
        let last = self.last_level().ok_or(InferenceError::NoLevelsProcessed)?;
        for info in &mut self.best_paths[last].nodes {
            info.backward_probability = 1.0;
        }
        self.best_paths[last].update_sums();

        for index in (0..last).rev() {
            let level = graph.level(index)?;
            let next_level = graph.level(index + 1)?;
            let next_paths = &self.best_paths[index + 1];
            let current_paths = &self.best_paths[index];
            let backward: Vec<f64> = level
                .nodes()
                .iter()
                .enumerate()
                .map(|(c, current)| {
                    next_level
                        .nodes()
                        .iter()
                        .enumerate()
                        .map(|(n, next)| {
                            let transition = self.transition.transition_probability(
                                current,
                                level,
                                &current_paths.nodes[c].wind_range,
                                next,
                                next_level,
                            );
                            next.confidence()
                                * transition
                                * next_paths.normalized_backward_probability(n)
                        })
                        .sum()
                })
                .collect();

            let current_paths = &mut self.best_paths[index];
            for (info, b) in current_paths.nodes.iter_mut().zip(backward) {
                info.backward_probability = b;
            }
            current_paths.update_sums();
        }
        self.backward_computed = true;
        Ok(())
    }

    /// Best path ending in the most probable node of the last level
    pub fn get_best_path(
        &mut self,
        graph: &ManeuverGraph,
    ) -> Result<Vec<GraphLevelInference>, InferenceError> {
        let last = self.last_level().ok_or(InferenceError::NoLevelsProcessed)?;
        let node = self.best_paths[last]
            .best_node()
            .ok_or(InferenceError::UnknownNode { level: last, node: 0 })?;
        self.get_best_path_to_node(graph, last, node)
    }

    /// Best path ending in `node` of `last_level`, in chronological order
    pub fn get_best_path_to_node(
        &mut self,
        graph: &ManeuverGraph,
        last_level: usize,
        node: usize,
    ) -> Result<Vec<GraphLevelInference>, InferenceError> {
        if self.best_paths.is_empty() {
            return Err(InferenceError::NoLevelsProcessed);
        }
        let terminal = self
            .best_paths
            .get(last_level)
            .ok_or(InferenceError::UnknownLevel(last_level))?;
        if node >= terminal.nodes.len() {
            return Err(InferenceError::UnknownNode {
                level: last_level,
                node,
            });
        }
        if self.precise_confidence && !self.backward_computed {
            self.compute_backward_probabilities(graph)?;
        }
        let path_confidence = self.best_paths[last_level].normalized_probability_from_start(node);

        let mut path = Vec::with_capacity(last_level + 1);
        let mut level_index = last_level;
        let mut node_index = node;
        loop {
            let paths = &self.best_paths[level_index];
            let info = &paths.nodes[node_index];
            let level = graph.level(level_index)?;
            let graph_node = level.node(node_index)?;
            let confidence = if self.precise_confidence {
                paths.normalized_forward_backward_probability(node_index)
            } else {
                path_confidence
            };
            path.push(GraphLevelInference {
                level: level_index,
                time: level.maneuver().time,
                node: node_index,
                hypothesis: *graph_node.hypothesis(),
                confidence,
                wind_range: info.wind_range,
                wind_course: info.wind_range.range().avg_wind_course(),
            });
            match (level_index.checked_sub(1), info.best_previous_node) {
                (Some(previous_level), Some(previous_node)) => {
                    level_index = previous_level;
                    node_index = previous_node;
                }
                _ => break,
            }
        }
        path.reverse();
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::SpeedWithBearing;
    use crate::maneuver::transition::{IntersectionTransitionCalculator, TransitionSettings};
    use crate::maneuver::types::{
        GeometricWindRangeProvider, ManeuverForEstimation, ManeuverTypeLikelihoods, Tack,
    };
    use crate::wind::{CombinationMode, WindCourseRange};

    fn maneuver(time: i64, before: f64, after: f64, middle: f64) -> ManeuverForEstimation {
        ManeuverForEstimation {
            time,
            position: None,
            speed_before: SpeedWithBearing::new(6.0, before),
            speed_after: SpeedWithBearing::new(6.0, after),
            course_change: crate::geo::angle_difference(after, before),
            middle_course: middle,
        }
    }

    fn calculator(precise: bool) -> BestPathsCalculator<IntersectionTransitionCalculator> {
        BestPathsCalculator::new(IntersectionTransitionCalculator::default(), precise)
    }

    fn scenario_c_graph() -> ManeuverGraph {
        let mut graph = ManeuverGraph::new();
        graph.push_level_with_nodes(
            maneuver(0, 315.0, 45.0, 0.0),
            vec![
                (ManeuverHypothesis::Tack { tack_after: Tack::Port }, WindCourseRange::around(0.0, 30.0), 0.4),
                (ManeuverHypothesis::Jibe { tack_after: Tack::Starboard }, WindCourseRange::around(180.0, 30.0), 0.1),
                (ManeuverHypothesis::Other { tack_after: Tack::Port }, WindCourseRange::new(225.0, 180.0), 0.3),
                (ManeuverHypothesis::Other { tack_after: Tack::Starboard }, WindCourseRange::new(45.0, 180.0), 0.2),
            ],
        );
        graph
    }

    /// Upwind race in a northerly: a series of tacks with some noise
    fn race_graph() -> ManeuverGraph {
        let provider = GeometricWindRangeProvider::default();
        let mut graph = ManeuverGraph::new();
        let tacks = [
            (0, 315.0, 45.0, 2.0),
            (120_000, 45.0, 315.0, 358.0),
            (240_000, 315.0, 45.0, 5.0),
            (360_000, 45.0, 315.0, 355.0),
            (480_000, 315.0, 45.0, 0.0),
        ];
        for (i, (time, before, after, middle)) in tacks.into_iter().enumerate() {
            // One maneuver is classified ambiguously
            let likelihoods = if i == 2 {
                ManeuverTypeLikelihoods::new(0.3, 0.3, 0.2, 0.2)
            } else {
                ManeuverTypeLikelihoods::new(0.7, 0.1, 0.1, 0.1)
            };
            graph.push_maneuver(maneuver(time, before, after, middle), &likelihoods, &provider);
        }
        graph
    }

    #[test]
    fn test_single_level_fast_confidence() {
        let graph = scenario_c_graph();
        let mut calc = calculator(false);
        calc.compute_best_paths_from_scratch(&graph).unwrap();
        let path = calc.get_best_path(&graph).unwrap();
        assert_eq!(path.len(), 1);
        assert_eq!(path[0].node, 0);
        assert!(matches!(path[0].hypothesis, ManeuverHypothesis::Tack { .. }));
        assert!((path[0].confidence - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_single_level_precise_confidence() {
        let graph = scenario_c_graph();
        let mut calc = calculator(true);
        calc.compute_best_paths_from_scratch(&graph).unwrap();
        let path = calc.get_best_path(&graph).unwrap();
        assert_eq!(path[0].node, 0);
        assert!((path[0].confidence - 0.4).abs() < 1e-12);
        assert_eq!(calc.state(), CalculatorState::BackwardComputed { last_level: 0 });
    }

    #[test]
    fn test_violated_transition_still_yields_path() {
        let mut graph = ManeuverGraph::new();
        graph.push_level_with_nodes(
            maneuver(0, 315.0, 45.0, 0.0),
            vec![(ManeuverHypothesis::Tack { tack_after: Tack::Port }, WindCourseRange::new(350.0, 20.0), 1.0)],
        );
        graph.push_level_with_nodes(
            maneuver(10_000, 45.0, 315.0, 180.0),
            vec![(ManeuverHypothesis::Tack { tack_after: Tack::Starboard }, WindCourseRange::new(170.0, 20.0), 1.0)],
        );
        let mut calc = calculator(false);
        calc.compute_best_paths_from_scratch(&graph).unwrap();

        let info = &calc.best_paths_for_level(1).unwrap()[0];
        assert!(info.probability_from_start() > 0.0);
        assert!(info.probability_from_start() < 1.0);
        assert!(info.wind_range().is_violation());

        let path = calc.get_best_path(&graph).unwrap();
        assert_eq!(path.len(), 2);
        assert_eq!(path[1].node, 0);
    }

    #[test]
    fn test_consistent_tacks_win() {
        let graph = race_graph();
        let mut calc = calculator(false);
        calc.compute_best_paths_from_scratch(&graph).unwrap();
        let path = calc.get_best_path(&graph).unwrap();
        assert_eq!(path.len(), 5);
        for inference in &path {
            assert!(
                matches!(inference.hypothesis, ManeuverHypothesis::Tack { .. }),
                "level {} decoded as {}",
                inference.level,
                inference.hypothesis
            );
            let r = inference.wind_range.range();
            assert!(r.is_wind_course_within_range(0.0) || inference.wind_range.is_violation());
        }
        let fast_confidence = path[0].confidence;
        assert!(fast_confidence > 0.0 && fast_confidence <= 1.0);
    }

    #[test]
    fn test_precise_confidences_are_posteriors() {
        let graph = race_graph();
        let mut calc = calculator(true);
        calc.compute_best_paths_from_scratch(&graph).unwrap();
        let path = calc.get_best_path(&graph).unwrap();
        for inference in &path {
            assert!(inference.confidence > 0.0 && inference.confidence <= 1.0 + 1e-12);
        }
        // The ambiguous level still leans toward the tack given its neighbours
        assert!(path[2].confidence > 0.3);
    }

    #[test]
    fn test_from_scratch_is_idempotent() {
        let graph = race_graph();
        for precise in [false, true] {
            let mut calc = calculator(precise);
            calc.compute_best_paths_from_scratch(&graph).unwrap();
            let first = calc.get_best_path(&graph).unwrap();
            calc.compute_best_paths_from_scratch(&graph).unwrap();
            let second = calc.get_best_path(&graph).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_incremental_equals_batch() {
        let graph = race_graph();
        for precise in [false, true] {
            let mut batch = calculator(precise);
            batch.compute_best_paths_from_scratch(&graph).unwrap();
            let expected = batch.get_best_path(&graph).unwrap();

            for from in 0..=graph.len() {
                let mut incremental = calculator(precise);
                incremental.compute_best_paths_from_scratch(&graph).unwrap();
                incremental.get_best_path(&graph).unwrap();
                incremental.recompute_best_paths_from_level(&graph, from).unwrap();
                assert_eq!(incremental.get_best_path(&graph).unwrap(), expected);
            }
        }
    }

    #[test]
    fn test_recompute_after_revision_matches_scratch() {
        let provider = GeometricWindRangeProvider::default();
        let mut graph = race_graph();
        let mut calc = calculator(false);
        calc.compute_best_paths_from_scratch(&graph).unwrap();

        let revised = graph
            .revise_level(
                3,
                maneuver(360_000, 45.0, 315.0, 175.0),
                &ManeuverTypeLikelihoods::new(0.1, 0.7, 0.1, 0.1),
                &provider,
            )
            .unwrap();
        calc.recompute_best_paths_from_level(&graph, revised).unwrap();
        let incremental = calc.get_best_path(&graph).unwrap();

        let mut scratch = calculator(false);
        scratch.compute_best_paths_from_scratch(&graph).unwrap();
        assert_eq!(incremental, scratch.get_best_path(&graph).unwrap());
    }

    #[test]
    fn test_out_of_sequence_fails_fast() {
        let graph = race_graph();
        let mut calc = calculator(false);
        assert_eq!(
            calc.compute_best_paths_to_next_level(&graph, 1),
            Err(InferenceError::OutOfSequence {
                level: 1,
                expected_previous: None,
                actual_previous: Some(0),
            })
        );
        calc.compute_best_paths_to_next_level(&graph, 0).unwrap();
        assert!(calc.compute_best_paths_to_next_level(&graph, 0).is_err());
        assert!(calc.compute_best_paths_to_next_level(&graph, 2).is_err());
        assert_eq!(
            calc.compute_best_paths_to_next_level(&graph, 9),
            Err(InferenceError::UnknownLevel(9))
        );
    }

    #[test]
    fn test_best_path_before_any_level() {
        let graph = race_graph();
        let mut calc = calculator(false);
        assert_eq!(calc.state(), CalculatorState::Uninitialized);
        assert_eq!(calc.get_best_path(&graph), Err(InferenceError::NoLevelsProcessed));
        assert_eq!(
            calc.compute_backward_probabilities(&graph),
            Err(InferenceError::NoLevelsProcessed)
        );
    }

    #[test]
    fn test_state_transitions() {
        let graph = race_graph();
        let mut calc = calculator(true);
        calc.compute_best_paths_to_next_level(&graph, 0).unwrap();
        calc.compute_best_paths_to_next_level(&graph, 1).unwrap();
        assert_eq!(calc.state(), CalculatorState::Partial { last_level: 1 });
        calc.compute_backward_probabilities(&graph).unwrap();
        assert_eq!(calc.state(), CalculatorState::BackwardComputed { last_level: 1 });
        calc.compute_pending_levels(&graph).unwrap();
        assert_eq!(calc.state(), CalculatorState::Partial { last_level: 4 });
        calc.reset_state();
        assert_eq!(calc.state(), CalculatorState::Uninitialized);
    }

    #[test]
    fn test_path_to_explicit_node() {
        let graph = race_graph();
        let mut calc = calculator(false);
        calc.compute_best_paths_from_scratch(&graph).unwrap();
        let path = calc.get_best_path_to_node(&graph, 2, 1).unwrap();
        assert_eq!(path.len(), 3);
        assert_eq!(path[2].node, 1);
        assert!(calc.get_best_path_to_node(&graph, 2, 7).is_err());
        assert!(calc.get_best_path_to_node(&graph, 8, 0).is_err());
    }

    #[test]
    fn test_expansion_mode_runs() {
        let graph = race_graph();
        let settings = TransitionSettings {
            combination_mode: CombinationMode::Expansion,
            ..Default::default()
        };
        let mut calc = BestPathsCalculator::new(IntersectionTransitionCalculator::new(settings), false);
        calc.compute_best_paths_from_scratch(&graph).unwrap();
        assert_eq!(calc.get_best_path(&graph).unwrap().len(), graph.len());
    }
}
