//! Race description input and report output formats
//!
//! Timestamps are RFC 3339 on the outside and epoch milliseconds inside
//! the core.

use chrono::{DateTime, Utc};
use log::{info, warn};
use regatta_core::maneuver::{
    GraphLevelInference, ManeuverForEstimation, ManeuverHypothesis, ManeuverTypeLikelihoods,
};
use regatta_core::{Course, GpsFix, IntersectedWindRange, Position, SpeedWithBearing, TimePoint, WindCourseRange};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::AnalyzerError;

pub fn to_time_point(time: &DateTime<Utc>) -> TimePoint {
    time.timestamp_millis()
}

/// Out of range times are clamped to the nearest representable instant
pub fn from_time_point(time: TimePoint) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(time).unwrap_or_else(|| {
        warn!("Time point {} ms is out of range, clamping", time);
        if time < 0 {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        }
    })
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixRecord {
    pub time: DateTime<Utc>,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub speed: Option<SpeedWithBearing>,
}

impl FixRecord {
    pub fn to_fix(&self) -> GpsFix {
        let fix = GpsFix::new(Position::new(self.lat, self.lon), to_time_point(&self.time));
        match self.speed {
            Some(s) => fix.with_speed(SpeedWithBearing::new(s.knots, s.bearing)),
            None => fix,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManeuverRecord {
    pub time: DateTime<Utc>,
    #[serde(default)]
    pub position: Option<Position>,
    pub speed_before: SpeedWithBearing,
    pub speed_after: SpeedWithBearing,
    /// Degrees, positive is clockwise
    pub course_change: f64,
    pub middle_course: f64,
    pub likelihoods: ManeuverTypeLikelihoods,
}

impl ManeuverRecord {
    pub fn to_maneuver(&self) -> ManeuverForEstimation {
        ManeuverForEstimation {
            time: to_time_point(&self.time),
            position: self.position,
            speed_before: SpeedWithBearing::new(self.speed_before.knots, self.speed_before.bearing),
            speed_after: SpeedWithBearing::new(self.speed_after.knots, self.speed_after.bearing),
            course_change: self.course_change,
            middle_course: self.middle_course,
        }
    }
}

/// Wind-from range implied by a penalty circle
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindRangeRecord {
    pub from_portside: f64,
    pub angle_toward_starboard: f64,
}

impl From<WindRangeRecord> for WindCourseRange {
    fn from(record: WindRangeRecord) -> Self {
        WindCourseRange::new(record.from_portside, record.angle_toward_starboard)
    }
}

/// Everything recorded about one race
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceFile {
    pub name: String,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    /// Maneuvers after this are not part of the race
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    pub course: Course,
    /// Mark id -> fixes
    #[serde(default)]
    pub marks: BTreeMap<String, Vec<FixRecord>>,
    /// Competitor id -> fixes
    #[serde(default)]
    pub competitors: BTreeMap<String, Vec<FixRecord>>,
    #[serde(default)]
    pub maneuvers: Vec<ManeuverRecord>,
    /// Index into `maneuvers` -> wind range of the penalty circle
    #[serde(default)]
    pub penalty_circles: BTreeMap<usize, WindRangeRecord>,
}

impl RaceFile {
    pub fn load(path: &Path) -> Result<Self, AnalyzerError> {
        let file = File::open(path).map_err(|source| AnalyzerError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let race: RaceFile = serde_json::from_reader(BufReader::new(file)).map_err(|source| {
            AnalyzerError::Json {
                path: path.to_path_buf(),
                source,
            }
        })?;
        info!(
            "Loaded race {}: {} waypoints, {} competitors, {} maneuvers",
            race.name,
            race.course.len(),
            race.competitors.len(),
            race.maneuvers.len()
        );
        Ok(race)
    }

    pub fn start_of_race(&self) -> Option<TimePoint> {
        self.start_time.as_ref().map(to_time_point)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassingRecord {
    pub waypoint_name: String,
    pub time: DateTime<Utc>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkPassingReport {
    pub race: String,
    pub start_time: Option<DateTime<Utc>>,
    /// Competitor -> waypoint index -> passing
    pub competitors: BTreeMap<String, BTreeMap<usize, PassingRecord>>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindEstimate {
    /// Index into the race file's maneuvers
    pub maneuver: usize,
    pub time: DateTime<Utc>,
    pub position: Option<Position>,
    pub hypothesis: ManeuverHypothesis,
    pub confidence: f64,
    /// Estimated wind-from direction, degrees
    pub wind_course: f64,
    pub wind_range: IntersectedWindRange,
}

impl WindEstimate {
    pub fn new(maneuver: usize, position: Option<Position>, inference: &GraphLevelInference) -> Self {
        WindEstimate {
            maneuver,
            time: from_time_point(inference.time),
            position,
            hypothesis: inference.hypothesis,
            confidence: inference.confidence,
            wind_course: inference.wind_course,
            wind_range: inference.wind_range,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindReport {
    pub race: String,
    pub precise: bool,
    pub estimates: Vec<WindEstimate>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use regatta_core::PassingInstruction;

    const RACE: &str = r#"{
        "name": "Race 1",
        "startTime": "2024-06-01T12:00:00Z",
        "course": {
            "waypoints": [
                {"name": "Start", "marks": ["pin", "rc"]},
                {"name": "Windward", "marks": ["w1"], "passingInstruction": "starboard"}
            ]
        },
        "marks": {
            "w1": [{"time": "2024-06-01T11:50:00Z", "lat": 54.5, "lon": 10.2}]
        },
        "competitors": {
            "GER 1": [
                {"time": "2024-06-01T12:00:01.500Z", "lat": 54.49, "lon": 10.2,
                 "speed": {"knots": 6.5, "bearing": 370.0}}
            ]
        },
        "maneuvers": [
            {
                "time": "2024-06-01T12:05:00Z",
                "speedBefore": {"knots": 6.0, "bearing": 315.0},
                "speedAfter": {"knots": 6.0, "bearing": 45.0},
                "courseChange": 90.0,
                "middleCourse": 0.0,
                "likelihoods": {"tack": 0.8, "jibe": 0.1, "bearAway": 0.05, "headUp": 0.05}
            }
        ],
        "penaltyCircles": {"0": {"fromPortside": 350.0, "angleTowardStarboard": 20.0}}
    }"#;

    #[test]
    fn test_parse_race() {
        let race: RaceFile = serde_json::from_str(RACE).unwrap();
        assert_eq!(race.name, "Race 1");
        assert_eq!(race.start_of_race(), Some(1_717_243_200_000));
        assert_eq!(
            race.course.passing_instruction(1),
            Ok(PassingInstruction::Starboard)
        );

        let fix = race.competitors["GER 1"][0].to_fix();
        assert_eq!(fix.time, 1_717_243_201_500);
        assert_eq!(fix.speed.unwrap().bearing, 10.0);

        let maneuver = race.maneuvers[0].to_maneuver();
        assert_eq!(maneuver.time, 1_717_243_500_000);
        assert!(maneuver.turns_clockwise());

        let circle: WindCourseRange = race.penalty_circles[&0].into();
        assert_eq!(circle.from_portside(), 350.0);
    }

    #[test]
    fn test_optional_sections() {
        let race: RaceFile =
            serde_json::from_str(r#"{"name": "Empty", "course": {"waypoints": []}}"#).unwrap();
        assert!(race.start_of_race().is_none());
        assert!(race.competitors.is_empty());
        assert!(race.maneuvers.is_empty());
    }

    #[test]
    fn test_report_omits_missing_start() {
        let report = MarkPassingReport {
            race: "Race 1".to_string(),
            start_time: None,
            competitors: BTreeMap::new(),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("startTime").is_none());
        assert_eq!(json["race"], "Race 1");
    }

    #[test]
    fn test_time_point_conversion() {
        let t: DateTime<Utc> = "2024-06-01T12:00:00.250Z".parse().unwrap();
        assert_eq!(from_time_point(to_time_point(&t)), t);
    }

    #[test]
    fn test_out_of_range_time_point_is_clamped() {
        assert_eq!(from_time_point(i64::MAX), DateTime::<Utc>::MAX_UTC);
        assert_eq!(from_time_point(i64::MIN), DateTime::<Utc>::MIN_UTC);
        assert_eq!(from_time_point(-1).timestamp_millis(), -1);
    }
}
