//! Error types for the inference pipelines
//!
//! Only contract violations are errors. Poor data (missing fixes, NaN
//! positions, ranges that never overlap) degrades results instead.

use thiserror::Error;

/// Misuse of the maneuver graph or the best-paths calculator
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InferenceError {
    /// A level was handed to the calculator whose predecessor is not the last processed level
    #[error(
        "Level {level} is out of sequence: calculator expects previous level {expected_previous:?}, level has {actual_previous:?}"
    )]
    OutOfSequence {
        level: usize,
        expected_previous: Option<usize>,
        actual_previous: Option<usize>,
    },

    /// A best path was requested before any level was processed
    #[error("No graph levels have been processed")]
    NoLevelsProcessed,

    /// Level index does not exist in the graph or in the calculator cache
    #[error("Unknown graph level {0}")]
    UnknownLevel(usize),

    /// Node index does not exist in the given level
    #[error("Node {node} does not exist in level {level}")]
    UnknownNode { level: usize, node: usize },
}

/// Misuse of the course or race model
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CourseError {
    /// Waypoint index past the end of the course
    #[error("Waypoint index {index} out of range: course has {count} waypoints")]
    WaypointOutOfRange { index: usize, count: usize },

    /// Competitor id not registered with the race
    #[error("Unknown competitor: {0}")]
    UnknownCompetitor(String),

    /// Mark id not registered with the race
    #[error("Unknown mark: {0}")]
    UnknownMark(String),
}
