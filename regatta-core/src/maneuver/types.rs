//! Maneuver Type Definitions

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::geo::{Position, SpeedWithBearing};
use crate::track::TimePoint;
use crate::wind::WindCourseRange;

/// Side the wind comes over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tack {
    Port,
    Starboard,
}

impl Tack {
    pub fn opposite(&self) -> Tack {
        match self {
            Tack::Port => Tack::Starboard,
            Tack::Starboard => Tack::Port,
        }
    }
}

impl fmt::Display for Tack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Port => write!(f, "port"),
            Self::Starboard => write!(f, "starboard"),
        }
    }
}

/// A detected course change, reduced to what wind inference needs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManeuverForEstimation {
    /// Time of the maneuver climax
    pub time: TimePoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    pub speed_before: SpeedWithBearing,
    pub speed_after: SpeedWithBearing,
    /// Signed course change in degrees, positive is clockwise
    pub course_change: f64,
    /// Course at the curve extremum, e.g. head to wind in a tack
    pub middle_course: f64,
}

impl ManeuverForEstimation {
    pub fn turns_clockwise(&self) -> bool {
        self.course_change > 0.0
    }
}

/// Likelihoods from the external maneuver classifier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManeuverTypeLikelihoods {
    pub tack: f64,
    pub jibe: f64,
    pub bear_away: f64,
    pub head_up: f64,
}

impl ManeuverTypeLikelihoods {
    pub fn new(tack: f64, jibe: f64, bear_away: f64, head_up: f64) -> Self {
        ManeuverTypeLikelihoods {
            tack,
            jibe,
            bear_away,
            head_up,
        }
    }

    /// Bear-aways and head-ups alone say nothing about the tack
    pub fn other(&self) -> f64 {
        self.bear_away + self.head_up
    }
}

/// One classification hypothesis of a maneuver, i.e. one graph node kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ManeuverHypothesis {
    Tack {
        #[serde(rename = "tackAfter")]
        tack_after: Tack,
    },
    Jibe {
        #[serde(rename = "tackAfter")]
        tack_after: Tack,
    },
    /// Bear-away or head-up, sailed on `tack_after`
    Other {
        #[serde(rename = "tackAfter")]
        tack_after: Tack,
    },
}

impl ManeuverHypothesis {
    /// Hypotheses a maneuver can take, in node order
    pub fn for_maneuver(maneuver: &ManeuverForEstimation) -> [ManeuverHypothesis; 4] {
        // Tacking clockwise puts the wind on the port side, jibing clockwise on starboard
        let (tack_after, jibe_after) = if maneuver.turns_clockwise() {
            (Tack::Port, Tack::Starboard)
        } else {
            (Tack::Starboard, Tack::Port)
        };
        [
            ManeuverHypothesis::Tack { tack_after },
            ManeuverHypothesis::Jibe {
                tack_after: jibe_after,
            },
            ManeuverHypothesis::Other {
                tack_after: Tack::Port,
            },
            ManeuverHypothesis::Other {
                tack_after: Tack::Starboard,
            },
        ]
    }

    pub fn tack_after(&self) -> Tack {
        match self {
            Self::Tack { tack_after } | Self::Jibe { tack_after } | Self::Other { tack_after } => {
                *tack_after
            }
        }
    }

    /// Prior likelihood of this hypothesis
    pub fn likelihood(&self, likelihoods: &ManeuverTypeLikelihoods) -> f64 {
        match self {
            Self::Tack { .. } => likelihoods.tack,
            Self::Jibe { .. } => likelihoods.jibe,
            Self::Other { .. } => likelihoods.other() / 2.0,
        }
    }
}

impl fmt::Display for ManeuverHypothesis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tack { tack_after } => write!(f, "tack to {}", tack_after),
            Self::Jibe { tack_after } => write!(f, "jibe to {}", tack_after),
            Self::Other { tack_after } => write!(f, "other on {}", tack_after),
        }
    }
}

/// Feasible wind range for a maneuver under a hypothesis
pub trait WindRangeProvider {
    fn wind_course_range(
        &self,
        maneuver: &ManeuverForEstimation,
        hypothesis: &ManeuverHypothesis,
    ) -> WindCourseRange;
}

/// Half widths of the wind ranges derived from maneuver geometry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WindRangeSettings {
    pub tack_half_width: f64,
    pub jibe_half_width: f64,
}

impl Default for WindRangeSettings {
    fn default() -> Self {
        WindRangeSettings {
            tack_half_width: 35.0, // degrees
            jibe_half_width: 35.0, // degrees
        }
    }
}

/// Derives wind ranges from the maneuver's courses alone
#[derive(Debug, Clone, Default)]
pub struct GeometricWindRangeProvider {
    settings: WindRangeSettings,
}

impl GeometricWindRangeProvider {
    pub fn new(settings: WindRangeSettings) -> Self {
        GeometricWindRangeProvider { settings }
    }
}

impl WindRangeProvider for GeometricWindRangeProvider {
    fn wind_course_range(
        &self,
        maneuver: &ManeuverForEstimation,
        hypothesis: &ManeuverHypothesis,
    ) -> WindCourseRange {
        match hypothesis {
            // Bow passes through the wind
            ManeuverHypothesis::Tack { .. } => {
                WindCourseRange::around(maneuver.middle_course, self.settings.tack_half_width)
            }
            // Stern passes through the wind
            ManeuverHypothesis::Jibe { .. } => WindCourseRange::around(
                maneuver.middle_course + 180.0,
                self.settings.jibe_half_width,
            ),
            // Windward half plane of the course after
            ManeuverHypothesis::Other { tack_after } => {
                let course = maneuver.speed_after.bearing;
                match tack_after {
                    Tack::Port => WindCourseRange::new(course - 180.0, 180.0),
                    Tack::Starboard => WindCourseRange::new(course, 180.0),
                }
            }
        }
    }
}
