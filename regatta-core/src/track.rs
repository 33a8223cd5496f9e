//! GPS Track Store
//!
//! Append-mostly, time-ordered fix storage shared between an ingesting
//! writer and any number of analysing readers. Readers take a scoped read
//! guard; the lock is released when the guard drops, on every exit path.

use serde::{Deserialize, Serialize};
use std::ops::Deref;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use crate::geo::{Position, SpeedWithBearing};

/// Milliseconds since the Unix epoch
pub type TimePoint = i64;

/// A single GPS observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpsFix {
    pub position: Position,
    /// Observation time in milliseconds since the epoch
    pub time: TimePoint,
    /// Speed and course over ground, when the device reports them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<SpeedWithBearing>,
}

impl GpsFix {
    pub fn new(position: Position, time: TimePoint) -> Self {
        GpsFix {
            position,
            time,
            speed: None,
        }
    }

    pub fn with_speed(mut self, speed: SpeedWithBearing) -> Self {
        self.speed = Some(speed);
        self
    }
}

/// Scoped read access to a track's fixes
pub struct TrackReadGuard<'a> {
    guard: RwLockReadGuard<'a, Vec<GpsFix>>,
}

impl Deref for TrackReadGuard<'_> {
    type Target = [GpsFix];

    fn deref(&self) -> &[GpsFix] {
        self.guard.as_slice()
    }
}

/// Time-ordered fixes of one competitor or mark.
///
/// Cloning the handle shares the underlying storage.
#[derive(Debug, Clone, Default)]
pub struct GpsTrack {
    fixes: Arc<RwLock<Vec<GpsFix>>>,
}

impl GpsTrack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixes(fixes: impl IntoIterator<Item = GpsFix>) -> Self {
        let track = Self::new();
        for fix in fixes {
            track.add_fix(fix);
        }
        track
    }

    /// Insert a fix in time order. A fix with the same timestamp as an
    /// existing one replaces it. Returns true if the track changed.
    pub fn add_fix(&self, fix: GpsFix) -> bool {
        // A writer that panicked cannot leave a half-inserted element behind
        let mut fixes = self.fixes.write().unwrap_or_else(PoisonError::into_inner);
        match fixes.binary_search_by_key(&fix.time, |f| f.time) {
            Ok(i) => {
                if fixes[i] == fix {
                    false
                } else {
                    fixes[i] = fix;
                    true
                }
            }
            Err(i) => {
                fixes.insert(i, fix);
                true
            }
        }
    }

    /// Acquire a read guard over the fixes
    pub fn read(&self) -> TrackReadGuard<'_> {
        TrackReadGuard {
            guard: self.fixes.read().unwrap_or_else(PoisonError::into_inner),
        }
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Position at `time`, linearly interpolated between the surrounding
    /// fixes and clamped to the first/last fix outside the recorded span
    pub fn position_at(&self, time: TimePoint) -> Option<Position> {
        let fixes = self.read();
        let first = fixes.first()?;
        let last = fixes.last()?;
        if time <= first.time {
            return Some(first.position);
        }
        if time >= last.time {
            return Some(last.position);
        }
        match fixes.binary_search_by_key(&time, |f| f.time) {
            Ok(i) => Some(fixes[i].position),
            Err(i) => {
                let before = &fixes[i - 1];
                let after = &fixes[i];
                let ratio = (time - before.time) as f64 / (after.time - before.time) as f64;
                Some(before.position.interpolate(&after.position, ratio))
            }
        }
    }
    /// Snapshot of the distance sailed along the current fixes
    pub fn distance_profile(&self) -> DistanceProfile {
        DistanceProfile::new(&self.read())
    }
}

/// Cumulative distance sailed along a snapshot of fixes, for answering many
/// distance queries against one track state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistanceProfile {
    times: Vec<TimePoint>,
    /// Meters sailed from the first fix up to each fix
    along: Vec<f64>,
}

impl DistanceProfile {
    pub fn new(fixes: &[GpsFix]) -> Self {
        let mut along = Vec::with_capacity(fixes.len());
        let mut total = 0.0;
        for (i, fix) in fixes.iter().enumerate() {
            if i > 0 {
                total += fixes[i - 1].position.distance_to(&fix.position);
            }
            along.push(total);
        }
        DistanceProfile {
            times: fixes.iter().map(|f| f.time).collect(),
            along,
        }
    }

    /// Meters sailed up to `time`, interpolated between fixes and clamped
    /// to the recorded span
    fn along_at(&self, time: TimePoint) -> Option<f64> {
        let last = *self.along.last()?;
        match self.times.binary_search(&time) {
            Ok(i) => Some(self.along[i]),
            Err(0) => Some(0.0),
            Err(i) if i == self.times.len() => Some(last),
            Err(i) => {
                let ratio = (time - self.times[i - 1]) as f64 / (self.times[i] - self.times[i - 1]) as f64;
                Some(self.along[i - 1] + ratio * (self.along[i] - self.along[i - 1]))
            }
        }
    }

    /// Meters sailed between two times, None without fixes
    pub fn distance_between(&self, from: TimePoint, to: TimePoint) -> Option<f64> {
        Some((self.along_at(to)? - self.along_at(from)?).abs())
    }
}
