//! Transition probabilities between adjacent graph levels

use serde::{Deserialize, Serialize};

use super::graph::{GraphLevel, GraphNode};
use crate::wind::{CombinationMode, IntersectedWindRange};

/// Combines the wind range accumulated along a path with the next node's
/// range and rates how plausible the step is.
pub trait GraphNodeTransitionProbabilitiesCalculator {
    /// Returns the merged range and the transition probability in (0, 1]
    fn merge_with_next_node(
        &self,
        previous_node: &GraphNode,
        previous_level: &GraphLevel,
        previous_range: &IntersectedWindRange,
        current_node: &GraphNode,
        current_level: &GraphLevel,
    ) -> (IntersectedWindRange, f64);

    fn transition_probability(
        &self,
        current_node: &GraphNode,
        current_level: &GraphLevel,
        current_range: &IntersectedWindRange,
        next_node: &GraphNode,
        next_level: &GraphLevel,
    ) -> f64 {
        self.merge_with_next_node(current_node, current_level, current_range, next_node, next_level)
            .1
    }
}

/// Plausibility of a wind shift of `degrees`
pub fn wind_shift_penalty(degrees: f64) -> f64 {
    if degrees <= 10.0 {
        1.0
    } else if degrees <= 45.0 {
        1.0 / (1.0 + degrees / 45.0)
    } else {
        let excess = (degrees - 45.0) / 5.0;
        1.0 / (4.0 + excess * excess)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransitionSettings {
    pub combination_mode: CombinationMode,
    /// Wind shift accepted per minute between two maneuvers
    pub tolerated_shift_per_minute: f64,
    /// Upper bound of the accepted shift regardless of elapsed time
    pub max_tolerated_shift: f64,
}

impl Default for TransitionSettings {
    fn default() -> Self {
        TransitionSettings {
            combination_mode: CombinationMode::Intersection,
            tolerated_shift_per_minute: 1.0, // degrees
            max_tolerated_shift: 20.0,       // degrees
        }
    }
}

/// Intersects ranges and turns the non-overlap into a wind shift penalty
#[derive(Debug, Clone, Default)]
pub struct IntersectionTransitionCalculator {
    settings: TransitionSettings,
}

impl IntersectionTransitionCalculator {
    pub fn new(settings: TransitionSettings) -> Self {
        IntersectionTransitionCalculator { settings }
    }

    pub fn settings(&self) -> &TransitionSettings {
        &self.settings
    }

    fn tolerated_shift(&self, previous_level: &GraphLevel, current_level: &GraphLevel) -> f64 {
        let elapsed_ms = (current_level.maneuver().time - previous_level.maneuver().time).abs();
        let minutes = elapsed_ms as f64 / 60_000.0;
        (minutes * self.settings.tolerated_shift_per_minute).min(self.settings.max_tolerated_shift)
    }
}

impl GraphNodeTransitionProbabilitiesCalculator for IntersectionTransitionCalculator {
    fn merge_with_next_node(
        &self,
        _previous_node: &GraphNode,
        previous_level: &GraphLevel,
        previous_range: &IntersectedWindRange,
        current_node: &GraphNode,
        current_level: &GraphLevel,
    ) -> (IntersectedWindRange, f64) {
        let mode = self.settings.combination_mode;
        let merged = previous_range.intersect(current_node.wind_range(), mode);
        // Expansion carries earlier violations; only this step's share counts
        let carried = if mode == CombinationMode::Expansion {
            previous_range.violation_range()
        } else {
            0.0
        };
        let step_violation = (merged.violation_range() - carried).max(0.0);
        let shift = (step_violation - self.tolerated_shift(previous_level, current_level)).max(0.0);
        (merged, wind_shift_penalty(shift))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::SpeedWithBearing;
    use crate::maneuver::types::{ManeuverForEstimation, ManeuverHypothesis, Tack};
    use crate::wind::WindCourseRange;

    fn level(index: usize, time: i64, range: WindCourseRange) -> GraphLevel {
        let maneuver = ManeuverForEstimation {
            time,
            position: None,
            speed_before: SpeedWithBearing::new(6.0, 0.0),
            speed_after: SpeedWithBearing::new(6.0, 90.0),
            course_change: 90.0,
            middle_course: 45.0,
        };
        GraphLevel::with_nodes(
            index,
            maneuver,
            vec![(ManeuverHypothesis::Tack { tack_after: Tack::Port }, range, 1.0)],
        )
    }

    #[test]
    fn test_wind_shift_penalty_shape() {
        assert_eq!(wind_shift_penalty(0.0), 1.0);
        assert_eq!(wind_shift_penalty(10.0), 1.0);
        assert!((wind_shift_penalty(45.0) - 0.5).abs() < 1e-12);
        assert!((wind_shift_penalty(55.0) - 0.125).abs() < 1e-12);
        assert!(wind_shift_penalty(180.0) > 0.0);
        assert!(wind_shift_penalty(90.0) < wind_shift_penalty(60.0));
    }

    #[test]
    fn test_overlapping_ranges_transition_freely() {
        let calc = IntersectionTransitionCalculator::default();
        let a = level(0, 0, WindCourseRange::new(0.0, 60.0));
        let b = level(1, 60_000, WindCourseRange::new(30.0, 60.0));
        let (merged, p) = calc.merge_with_next_node(
            &a.nodes()[0],
            &a,
            &a.nodes()[0].wind_range().to_intersected(),
            &b.nodes()[0],
            &b,
        );
        assert_eq!(p, 1.0);
        assert!((merged.range().from_portside() - 30.0).abs() < 1e-9);
        assert!((merged.range().angle_toward_starboard() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_violation_is_penalized_not_forbidden() {
        let calc = IntersectionTransitionCalculator::default();
        let a = level(0, 0, WindCourseRange::new(0.0, 20.0));
        let b = level(1, 0, WindCourseRange::new(180.0, 20.0));
        let p = calc.transition_probability(
            &a.nodes()[0],
            &a,
            &a.nodes()[0].wind_range().to_intersected(),
            &b.nodes()[0],
            &b,
        );
        assert!(p > 0.0 && p < 0.1);
    }

    #[test]
    fn test_elapsed_time_tolerates_shift() {
        let calc = IntersectionTransitionCalculator::default();
        let a = level(0, 0, WindCourseRange::new(0.0, 20.0));
        // 15 degree gap
        let soon = level(1, 60_000, WindCourseRange::new(35.0, 20.0));
        let late = level(1, 15 * 60_000, WindCourseRange::new(35.0, 20.0));
        let start = a.nodes()[0].wind_range().to_intersected();
        let p_soon = calc.merge_with_next_node(&a.nodes()[0], &a, &start, &soon.nodes()[0], &soon).1;
        let p_late = calc.merge_with_next_node(&a.nodes()[0], &a, &start, &late.nodes()[0], &late).1;
        assert!(p_soon < 1.0);
        assert_eq!(p_late, 1.0);
    }
}
