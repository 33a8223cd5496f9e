//! Circular wind course ranges
//!
//! A range is an arc of "wind from" directions starting at its portside
//! boundary and opening clockwise (toward starboard) by a given angle.

use serde::{Deserialize, Serialize};

use crate::geo::normalize_degrees;

/// What to produce when two ranges are combined
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombinationMode {
    /// The overlap; on violation the gap between the ranges
    #[default]
    Intersection,
    /// Both ranges plus the gap; violations accumulate across a chain
    Expansion,
    /// The next range unchanged
    RangeOfNext,
}

/// Arc of plausible wind-from directions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindCourseRange {
    from_portside: f64,
    angle_toward_starboard: f64,
}

impl WindCourseRange {
    /// `from_portside` is wrapped into [0, 360), the angle clamped to [0, 360]
    pub fn new(from_portside: f64, angle_toward_starboard: f64) -> Self {
        WindCourseRange {
            from_portside: normalize_degrees(from_portside),
            angle_toward_starboard: angle_toward_starboard.clamp(0.0, 360.0),
        }
    }

    /// Range covering every direction
    pub fn full() -> Self {
        Self::new(0.0, 360.0)
    }

    /// Range centered on `course` opening `half_width` to each side
    pub fn around(course: f64, half_width: f64) -> Self {
        Self::new(course - half_width, 2.0 * half_width)
    }

    pub fn from_portside(&self) -> f64 {
        self.from_portside
    }

    pub fn angle_toward_starboard(&self) -> f64 {
        self.angle_toward_starboard
    }

    /// Starboard boundary, in [0, 360)
    pub fn to_starboard(&self) -> f64 {
        normalize_degrees(self.from_portside + self.angle_toward_starboard)
    }

    /// Middle of the arc
    pub fn avg_wind_course(&self) -> f64 {
        normalize_degrees(self.from_portside + self.angle_toward_starboard / 2.0)
    }

    pub fn is_wind_course_within_range(&self, wind_course: f64) -> bool {
        let mut deviation = normalize_degrees(wind_course) - self.from_portside;
        if deviation < 0.0 {
            deviation += 360.0;
        }
        deviation - self.angle_toward_starboard <= 0.0
    }

    /// The complementary arc
    pub fn invert(&self) -> WindCourseRange {
        WindCourseRange::new(
            self.from_portside + self.angle_toward_starboard,
            360.0 - self.angle_toward_starboard,
        )
    }

    pub fn to_intersected(&self) -> IntersectedWindRange {
        IntersectedWindRange {
            range: *self,
            violation_range: 0.0,
        }
    }

    /// Combine with the range that follows in time.
    ///
    /// When the ranges do not overlap, the smaller of the two gaps (measured
    /// from this range's starboard boundary clockwise, or from its portside
    /// boundary counter-clockwise) is the violation.
    pub fn intersect(&self, next: &WindCourseRange, mode: CombinationMode) -> IntersectedWindRange {
        self.combine(next, mode, 0.0)
    }

    fn combine(
        &self,
        next: &WindCourseRange,
        mode: CombinationMode,
        carried_violation: f64,
    ) -> IntersectedWindRange {
        let mut boundary_deviation_starboard = next.from_portside - self.from_portside;
        if boundary_deviation_starboard < 0.0 {
            boundary_deviation_starboard += 360.0;
        }
        let deviation_starboard = boundary_deviation_starboard - self.angle_toward_starboard;

        let mut from_portside = next.from_portside;
        let mut angle = next.angle_toward_starboard;
        let mut violation_range = 0.0;

        if deviation_starboard <= 0.0 {
            // next starts inside this range
            match mode {
                CombinationMode::Intersection => {
                    from_portside = next.from_portside;
                    angle = if deviation_starboard + next.angle_toward_starboard < 0.0 {
                        next.angle_toward_starboard
                    } else {
                        deviation_starboard.abs()
                    };
                }
                CombinationMode::Expansion => {
                    from_portside = self.from_portside;
                    angle = self.angle_toward_starboard
                        + deviation_starboard
                        + next.angle_toward_starboard;
                }
                CombinationMode::RangeOfNext => {}
            }
        } else {
            let boundary_deviation_portside = 360.0 - boundary_deviation_starboard;
            let deviation_portside = boundary_deviation_portside - next.angle_toward_starboard;
            if deviation_portside <= 0.0 {
                // this starts inside next
                match mode {
                    CombinationMode::Intersection => {
                        from_portside = self.from_portside;
                        angle = if deviation_portside + self.angle_toward_starboard < 0.0 {
                            self.angle_toward_starboard
                        } else {
                            deviation_portside.abs()
                        };
                    }
                    CombinationMode::Expansion => {
                        from_portside = next.from_portside;
                        angle = self.angle_toward_starboard
                            + deviation_portside
                            + next.angle_toward_starboard;
                    }
                    CombinationMode::RangeOfNext => {}
                }
            } else if deviation_starboard < deviation_portside {
                match mode {
                    CombinationMode::Intersection => {
                        from_portside = self.from_portside + self.angle_toward_starboard;
                        angle = deviation_starboard;
                    }
                    CombinationMode::Expansion => {
                        from_portside = self.from_portside;
                        angle = self.angle_toward_starboard
                            + deviation_starboard
                            + next.angle_toward_starboard;
                    }
                    CombinationMode::RangeOfNext => {}
                }
                violation_range = deviation_starboard;
            } else {
                match mode {
                    CombinationMode::Intersection => {
                        from_portside = next.from_portside + next.angle_toward_starboard;
                        angle = deviation_portside;
                    }
                    CombinationMode::Expansion => {
                        from_portside = next.from_portside;
                        angle = self.angle_toward_starboard
                            + deviation_portside
                            + next.angle_toward_starboard;
                    }
                    CombinationMode::RangeOfNext => {}
                }
                violation_range = deviation_portside;
            }
        }

        if mode == CombinationMode::Expansion {
            violation_range += carried_violation;
        }
        IntersectedWindRange {
            range: WindCourseRange::new(from_portside, angle),
            violation_range,
        }
    }
}

/// Result of combining ranges, with the accumulated non-overlap
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntersectedWindRange {
    #[serde(flatten)]
    range: WindCourseRange,
    /// Degrees of non-overlap; 0 when the combined ranges overlapped
    violation_range: f64,
}

impl IntersectedWindRange {
    pub fn new(range: WindCourseRange, violation_range: f64) -> Self {
        IntersectedWindRange {
            range,
            violation_range,
        }
    }

    pub fn range(&self) -> &WindCourseRange {
        &self.range
    }

    pub fn violation_range(&self) -> f64 {
        self.violation_range
    }

    pub fn is_violation(&self) -> bool {
        self.violation_range > 0.0
    }

    /// Like [`WindCourseRange::intersect`]; in expansion mode the violation
    /// carried by this range is added to the result
    pub fn intersect(&self, next: &WindCourseRange, mode: CombinationMode) -> IntersectedWindRange {
        self.range.combine(next, mode, self.violation_range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn assert_range(r: &WindCourseRange, from: f64, angle: f64) {
        assert!(
            (r.from_portside() - from).abs() < EPS && (r.angle_toward_starboard() - angle).abs() < EPS,
            "expected ({}, {}), got ({}, {})",
            from,
            angle,
            r.from_portside(),
            r.angle_toward_starboard()
        );
    }

    #[test]
    fn test_self_intersection_is_identity() {
        for (from, angle) in [(0.0, 90.0), (350.0, 30.0), (120.0, 180.0), (10.0, 0.0)] {
            let r = WindCourseRange::new(from, angle);
            let i = r.intersect(&r, CombinationMode::Intersection);
            assert_range(i.range(), r.from_portside(), r.angle_toward_starboard());
            assert_eq!(i.violation_range(), 0.0);
        }
    }

    #[test]
    fn test_double_invert_is_identity() {
        for (from, angle) in [(0.0, 90.0), (350.0, 30.0), (200.0, 359.0)] {
            let r = WindCourseRange::new(from, angle);
            let back = r.invert().invert();
            assert!((back.from_portside() - r.from_portside()).abs() < 1e-6);
            assert!((back.angle_toward_starboard() - r.angle_toward_starboard()).abs() < 1e-6);
        }
    }

    #[test]
    fn test_combination_mode_default_and_names() {
        assert_eq!(CombinationMode::default(), CombinationMode::Intersection);
        assert_eq!(
            serde_json::to_string(&CombinationMode::RangeOfNext).unwrap(),
            "\"range_of_next\""
        );
    }

    #[test]
    fn test_invert() {
        let r = WindCourseRange::new(10.0, 90.0);
        assert_range(&r.invert(), 100.0, 270.0);
    }

    #[test]
    fn test_containment_midpoint_and_antipode() {
        for (from, angle) in [(0.0, 90.0), (340.0, 40.0), (100.0, 179.0)] {
            let r = WindCourseRange::new(from, angle);
            let mid = r.avg_wind_course();
            assert!(r.is_wind_course_within_range(mid));
            assert!(!r.is_wind_course_within_range(mid + 180.0));
        }
    }

    #[test]
    fn test_containment_wraparound() {
        let r = WindCourseRange::new(350.0, 20.0);
        assert!(r.is_wind_course_within_range(355.0));
        assert!(r.is_wind_course_within_range(5.0));
        assert!(r.is_wind_course_within_range(10.0));
        assert!(!r.is_wind_course_within_range(11.0));
        assert!(!r.is_wind_course_within_range(349.0));
    }

    #[test]
    fn test_partial_overlap() {
        let a = WindCourseRange::new(0.0, 90.0);
        let b = WindCourseRange::new(60.0, 90.0);
        let i = a.intersect(&b, CombinationMode::Intersection);
        assert_range(i.range(), 60.0, 30.0);
        assert_eq!(i.violation_range(), 0.0);

        // Same overlap seen from the other side
        let j = b.intersect(&a, CombinationMode::Intersection);
        assert_range(j.range(), 60.0, 30.0);

        let e = a.intersect(&b, CombinationMode::Expansion);
        assert_range(e.range(), 0.0, 150.0);
    }

    #[test]
    fn test_contained_range() {
        let wide = WindCourseRange::new(0.0, 180.0);
        let narrow = WindCourseRange::new(30.0, 20.0);
        assert_range(wide.intersect(&narrow, CombinationMode::Intersection).range(), 30.0, 20.0);
        assert_range(narrow.intersect(&wide, CombinationMode::Intersection).range(), 30.0, 20.0);
    }

    #[test]
    fn test_violation_toward_starboard() {
        // Gap of 20 degrees clockwise from a's starboard boundary
        let a = WindCourseRange::new(0.0, 40.0);
        let b = WindCourseRange::new(60.0, 40.0);
        let i = a.intersect(&b, CombinationMode::Intersection);
        assert_range(i.range(), 40.0, 20.0);
        assert!((i.violation_range() - 20.0).abs() < EPS);

        let e = a.intersect(&b, CombinationMode::Expansion);
        assert_range(e.range(), 0.0, 100.0);
        assert!((e.violation_range() - 20.0).abs() < EPS);
    }

    #[test]
    fn test_violation_toward_portside() {
        // b lies 30 degrees counter-clockwise of a
        let a = WindCourseRange::new(100.0, 40.0);
        let b = WindCourseRange::new(40.0, 30.0);
        let i = a.intersect(&b, CombinationMode::Intersection);
        assert_range(i.range(), 70.0, 30.0);
        assert!((i.violation_range() - 30.0).abs() < EPS);

        let e = a.intersect(&b, CombinationMode::Expansion);
        assert_range(e.range(), 40.0, 100.0);
    }

    #[test]
    fn test_range_of_next_keeps_next() {
        let a = WindCourseRange::new(0.0, 40.0);
        let b = WindCourseRange::new(200.0, 10.0);
        let n = a.intersect(&b, CombinationMode::RangeOfNext);
        assert_range(n.range(), 200.0, 10.0);
    }

    #[test]
    fn test_expansion_accumulates_violation() {
        let a = WindCourseRange::new(0.0, 10.0).to_intersected();
        let first = a.intersect(&WindCourseRange::new(20.0, 10.0), CombinationMode::Expansion);
        assert!((first.violation_range() - 10.0).abs() < EPS);
        let second = first.intersect(&WindCourseRange::new(40.0, 10.0), CombinationMode::Expansion);
        assert!((second.violation_range() - 20.0).abs() < EPS);
        assert_range(second.range(), 0.0, 50.0);

        // Intersection does not carry the previous violation
        let third = first.intersect(&WindCourseRange::new(10.0, 5.0), CombinationMode::Intersection);
        assert_eq!(third.violation_range(), 0.0);
    }

    #[test]
    fn test_around_and_boundaries() {
        let r = WindCourseRange::around(10.0, 30.0);
        assert_range(&r, 340.0, 60.0);
        assert!((r.to_starboard() - 40.0).abs() < EPS);
        assert!((r.avg_wind_course() - 10.0).abs() < EPS);
        assert!(WindCourseRange::full().is_wind_course_within_range(123.0));
    }
}
