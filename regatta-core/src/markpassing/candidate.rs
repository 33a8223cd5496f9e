//! Candidate and mark passing types

use serde::{Deserialize, Serialize};

use crate::track::TimePoint;

/// What produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CandidateOrigin {
    /// Sign change of cross-track error between two consecutive fixes
    Crossing { before: TimePoint, after: TimePoint },
    /// Local minimum of distance to a rounding mark at one fix
    Proximity { at: TimePoint },
    /// Passing set by hand
    Fixed,
}

/// Identity of a candidate, independent of its probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CandidateKey {
    pub waypoint: usize,
    pub time: TimePoint,
    pub origin: CandidateOrigin,
}

/// Hypothesised passing of one waypoint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub waypoint: usize,
    pub time: TimePoint,
    /// Confidence in [0, 1]
    pub probability: f64,
    pub origin: CandidateOrigin,
}

impl Candidate {
    pub fn new(waypoint: usize, time: TimePoint, probability: f64, origin: CandidateOrigin) -> Self {
        Candidate {
            waypoint,
            time,
            probability,
            origin,
        }
    }

    pub(crate) fn fixed(waypoint: usize, time: TimePoint) -> Self {
        Self::new(waypoint, time, 1.0, CandidateOrigin::Fixed)
    }

    pub fn key(&self) -> CandidateKey {
        CandidateKey {
            waypoint: self.waypoint,
            time: self.time,
            origin: self.origin,
        }
    }
}

/// Change in a competitor's candidate set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateDelta {
    pub added: Vec<Candidate>,
    pub removed: Vec<Candidate>,
}

impl CandidateDelta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    pub(crate) fn sort(&mut self) {
        self.added.sort_by_key(Candidate::key);
        self.removed.sort_by_key(Candidate::key);
    }
}

/// Confirmed passing of a waypoint by a competitor
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkPassing {
    pub competitor: String,
    pub waypoint: usize,
    pub time: TimePoint,
}
