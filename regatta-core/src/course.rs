//! Course model
//!
//! A course is an ordered list of waypoints. Each waypoint is one mark
//! (rounded to port or starboard) or two marks (a start/finish line or a
//! gate passed between them).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CourseError;

/// How a waypoint has to be passed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassingInstruction {
    /// Leave the mark to port
    Port,
    /// Leave the mark to starboard
    Starboard,
    /// Cross between the two marks of a start or finish line
    Line,
    /// Pass between the two marks of a gate
    Gate,
}

impl PassingInstruction {
    /// A crossing is expected to go from positive to negative cross-track
    /// error relative to the waypoint's crossing line
    pub fn expects_decreasing_xte(&self) -> bool {
        !matches!(self, PassingInstruction::Starboard)
    }

    pub fn is_two_mark(&self) -> bool {
        matches!(self, PassingInstruction::Line | PassingInstruction::Gate)
    }
}

impl fmt::Display for PassingInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Port => write!(f, "port"),
            Self::Starboard => write!(f, "starboard"),
            Self::Line => write!(f, "line"),
            Self::Gate => write!(f, "gate"),
        }
    }
}

/// One waypoint of the course
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Waypoint {
    pub name: String,
    /// Mark ids; the first is the port side of a line or gate
    pub marks: Vec<String>,
    /// Explicit instruction; inferred from the course when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passing_instruction: Option<PassingInstruction>,
}

impl Waypoint {
    pub fn new(name: &str, marks: &[&str]) -> Self {
        Waypoint {
            name: name.to_string(),
            marks: marks.iter().map(|m| m.to_string()).collect(),
            passing_instruction: None,
        }
    }

    pub fn with_instruction(mut self, instruction: PassingInstruction) -> Self {
        self.passing_instruction = Some(instruction);
        self
    }
}

/// Ordered waypoints of a race
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub waypoints: Vec<Waypoint>,
}

impl Course {
    pub fn new(waypoints: Vec<Waypoint>) -> Self {
        Course { waypoints }
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn waypoint(&self, index: usize) -> Result<&Waypoint, CourseError> {
        self.waypoints
            .get(index)
            .ok_or(CourseError::WaypointOutOfRange {
                index,
                count: self.waypoints.len(),
            })
    }

    /// Explicit passing instruction, or the one implied by the waypoint's
    /// place in the course and its number of marks
    pub fn passing_instruction(&self, index: usize) -> Result<PassingInstruction, CourseError> {
        let waypoint = self.waypoint(index)?;
        if let Some(instruction) = waypoint.passing_instruction {
            return Ok(instruction);
        }
        let is_end = index == 0 || index + 1 == self.waypoints.len();
        Ok(match (waypoint.marks.len() >= 2, is_end) {
            (true, true) => PassingInstruction::Line,
            (true, false) => PassingInstruction::Gate,
            _ => PassingInstruction::Port,
        })
    }
}
