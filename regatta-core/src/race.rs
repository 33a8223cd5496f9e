//! Tracked race: course plus the tracks of everything that moves

use log::warn;
use std::collections::{BTreeMap, HashMap};

use crate::course::Course;
use crate::error::CourseError;
use crate::geo::Position;
use crate::track::{GpsTrack, TimePoint};

/// The course, the competitor tracks and the mark tracks of one race.
///
/// Track handles are shared, so fixes can be appended through
/// [`TrackedRace::competitor_track`] from an ingestion thread while an
/// analysis holds the race behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct TrackedRace {
    course: Course,
    competitors: BTreeMap<String, GpsTrack>,
    marks: HashMap<String, GpsTrack>,
    start_of_race: Option<TimePoint>,
}

impl TrackedRace {
    pub fn new(course: Course) -> Self {
        TrackedRace {
            course,
            ..Default::default()
        }
    }

    pub fn course(&self) -> &Course {
        &self.course
    }

    pub fn start_of_race(&self) -> Option<TimePoint> {
        self.start_of_race
    }

    pub fn set_start_of_race(&mut self, start: Option<TimePoint>) {
        self.start_of_race = start;
    }

    /// Register a competitor, returning its (possibly existing) track
    pub fn add_competitor(&mut self, id: &str) -> GpsTrack {
        self.competitors.entry(id.to_string()).or_default().clone()
    }

    /// Register a mark, returning its (possibly existing) track
    pub fn add_mark(&mut self, id: &str) -> GpsTrack {
        self.marks.entry(id.to_string()).or_default().clone()
    }

    pub fn competitor_ids(&self) -> impl Iterator<Item = &String> {
        self.competitors.keys()
    }

    pub fn competitor_track(&self, id: &str) -> Result<&GpsTrack, CourseError> {
        self.competitors
            .get(id)
            .ok_or_else(|| CourseError::UnknownCompetitor(id.to_string()))
    }

    pub fn mark_track(&self, id: &str) -> Result<&GpsTrack, CourseError> {
        self.marks
            .get(id)
            .ok_or_else(|| CourseError::UnknownMark(id.to_string()))
    }

    /// Estimated position of a mark at `time`
    pub fn mark_position(&self, mark: &str, time: TimePoint) -> Option<Position> {
        match self.marks.get(mark) {
            Some(track) => track.position_at(time),
            None => {
                warn!("Course references unknown mark {}", mark);
                None
            }
        }
    }

    /// Positions of all marks of a waypoint at `time`; None if any is unknown
    pub fn waypoint_positions(&self, index: usize, time: TimePoint) -> Option<Vec<Position>> {
        let waypoint = self.course.waypoints.get(index)?;
        if waypoint.marks.is_empty() {
            return None;
        }
        waypoint
            .marks
            .iter()
            .map(|m| self.mark_position(m, time))
            .collect()
    }

    /// Mean position of a waypoint's marks
    pub fn waypoint_center(&self, index: usize, time: TimePoint) -> Option<Position> {
        let positions = self.waypoint_positions(index, time)?;
        let n = positions.len() as f64;
        let (lat, lon) = positions
            .iter()
            .fold((0.0, 0.0), |(lat, lon), p| (lat + p.lat, lon + p.lon));
        Some(Position::new(lat / n, lon / n))
    }

    /// Meters between waypoint centers along the course from `from` to `to`
    pub fn course_distance(&self, from: usize, to: usize, time: TimePoint) -> Option<f64> {
        (from..to).try_fold(0.0, |total, leg| {
            let start = self.waypoint_center(leg, time)?;
            let end = self.waypoint_center(leg + 1, time)?;
            Some(total + start.distance_to(&end))
        })
    }
}
