//! Candidate finder
//!
//! Scans a competitor's fixes for geometric evidence of waypoint passings
//! and reports candidate changes incrementally. Each competitor has a
//! working window of fixes; a batch of new fixes only re-evaluates the fix
//! pairs and fix neighbourhoods it touched.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use super::candidate::{Candidate, CandidateDelta, CandidateKey, CandidateOrigin};
use crate::course::PassingInstruction;
use crate::geo::{angle_difference, normalize_degrees, Position};
use crate::race::TrackedRace;
use crate::track::{GpsFix, TimePoint};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FinderSettings {
    /// Candidates below this probability are not emitted
    pub min_probability: f64,
    /// Weight of the passing distance relative to the leg length
    pub distance_scale: f64,
    /// Factor for passing a mark on the wrong side
    pub wrong_side_penalty: f64,
    /// Factor for crossing a line in the wrong direction
    pub wrong_direction_penalty: f64,
    /// Factor for candidates that are only a closest approach
    pub proximity_penalty: f64,
    /// Leg length used when a waypoint has no neighbour with a position
    pub default_leg_length: f64,
}

impl Default for FinderSettings {
    fn default() -> Self {
        FinderSettings {
            min_probability: 0.05,
            distance_scale: 8.0,
            wrong_side_penalty: 0.7,
            wrong_direction_penalty: 0.7,
            proximity_penalty: 0.7,
            default_leg_length: 500.0, // meters
        }
    }
}

#[derive(Debug, Default)]
struct CompetitorWindow {
    fixes: Vec<GpsFix>,
    candidates: HashMap<CandidateKey, Candidate>,
}

/// Line a competitor has to cross to pass a waypoint
#[derive(Debug, Clone, Copy)]
enum CrossingLine {
    /// Between the two marks of a line or gate
    Segment { start: Position, end: Position },
    /// From a rounding mark toward the side the boat has to be on
    Ray { mark: Position, bearing: f64 },
}

impl CrossingLine {
    fn origin(&self) -> Position {
        match self {
            CrossingLine::Segment { start, .. } => *start,
            CrossingLine::Ray { mark, .. } => *mark,
        }
    }

    fn bearing(&self) -> f64 {
        match self {
            CrossingLine::Segment { start, end } => start.bearing_to(end),
            CrossingLine::Ray { bearing, .. } => *bearing,
        }
    }

    /// Distance of a passing point to the waypoint and whether it lies on
    /// the wrong side
    fn assess(&self, point: &Position) -> (f64, bool) {
        match self {
            CrossingLine::Segment { start, end } => (point.distance_to_segment(start, end), false),
            CrossingLine::Ray { mark, bearing } => {
                let along = point.along_track_distance(mark, *bearing);
                (point.distance_to(mark), along < 0.0)
            }
        }
    }
}

/// Incremental candidate detection for all competitors of a race
#[derive(Debug, Default)]
pub struct CandidateFinder {
    settings: FinderSettings,
    windows: HashMap<String, CompetitorWindow>,
}

impl CandidateFinder {
    pub fn new(settings: FinderSettings) -> Self {
        CandidateFinder {
            settings,
            windows: HashMap::new(),
        }
    }

    pub fn settings(&self) -> &FinderSettings {
        &self.settings
    }

    /// Merge `new_fixes` into the competitor's window and return the change
    /// of its candidate set. Fixes may arrive in any order; a fix with the
    /// timestamp of a known one revises it.
    pub fn find_candidate_deltas(
        &mut self,
        race: &TrackedRace,
        competitor: &str,
        new_fixes: &[GpsFix],
    ) -> CandidateDelta {
        let settings = self.settings;
        let window = self.windows.entry(competitor.to_string()).or_default();
        let changed = merge_fixes(&mut window.fixes, new_fixes, competitor);
        if changed.is_empty() {
            return CandidateDelta::default();
        }
        if window.fixes.len() < 2 {
            debug!("{}: window too short for candidates", competitor);
            return CandidateDelta::default();
        }

        let last = window.fixes.len() - 1;
        let mut pair_starts = BTreeSet::new();
        let mut centers = BTreeSet::new();
        for time in changed {
            let Ok(i) = window.fixes.binary_search_by_key(&time, |f| f.time) else {
                continue;
            };
            pair_starts.extend([i.checked_sub(1), (i < last).then_some(i)].into_iter().flatten());
            centers.extend([i.checked_sub(1), Some(i), (i < last).then_some(i + 1)].into_iter().flatten());
        }

        let pair_times: BTreeSet<TimePoint> =
            pair_starts.iter().map(|&i| window.fixes[i].time).collect();
        let center_times: BTreeSet<TimePoint> =
            centers.iter().map(|&i| window.fixes[i].time).collect();
        let stale: Vec<CandidateKey> = window
            .candidates
            .keys()
            .filter(|key| match key.origin {
                CandidateOrigin::Crossing { before, .. } => pair_times.contains(&before),
                CandidateOrigin::Proximity { at } => center_times.contains(&at),
                CandidateOrigin::Fixed => false,
            })
            .copied()
            .collect();
        let previous: HashMap<CandidateKey, Candidate> = stale
            .into_iter()
            .filter_map(|key| window.candidates.remove_entry(&key))
            .collect();

        let fresh = scan(
            &settings,
            race,
            &window.fixes,
            pair_starts.into_iter(),
            centers.into_iter(),
        );
        let delta = apply_diff(previous, fresh, &mut window.candidates);
        debug!(
            "{}: {} candidates added, {} removed",
            competitor,
            delta.added.len(),
            delta.removed.len()
        );
        delta
    }

    /// Replace the competitor's window with `fixes` and rescan all of it.
    /// The returned delta is relative to the previously reported candidates,
    /// so it can be fed to the chooser like any incremental delta.
    pub fn all_candidates(
        &mut self,
        race: &TrackedRace,
        competitor: &str,
        fixes: &[GpsFix],
    ) -> CandidateDelta {
        let settings = self.settings;
        let window = self.windows.entry(competitor.to_string()).or_default();
        let previous = std::mem::take(&mut window.candidates);
        window.fixes.clear();
        merge_fixes(&mut window.fixes, fixes, competitor);

        let n = window.fixes.len();
        let fresh = if n < 2 {
            HashMap::new()
        } else {
            scan(&settings, race, &window.fixes, 0..n - 1, 1..n - 1)
        };
        apply_diff(previous, fresh, &mut window.candidates)
    }

    /// Current candidates of a competitor, ordered by waypoint and time
    pub fn candidates(&self, competitor: &str) -> Vec<Candidate> {
        let mut candidates: Vec<Candidate> = self
            .windows
            .get(competitor)
            .map(|w| w.candidates.values().copied().collect())
            .unwrap_or_default();
        candidates.sort_by_key(Candidate::key);
        candidates
    }
}

/// Insert valid fixes in time order and return the timestamps that changed
fn merge_fixes(fixes: &mut Vec<GpsFix>, new_fixes: &[GpsFix], competitor: &str) -> Vec<TimePoint> {
    let mut incoming: Vec<GpsFix> = new_fixes
        .iter()
        .filter(|fix| {
            let valid = fix.position.is_valid();
            if !valid {
                warn!(
                    "{}: dropping fix at {} with invalid position {:?}",
                    competitor, fix.time, fix.position
                );
            }
            valid
        })
        .copied()
        .collect();
    incoming.sort_by_key(|f| f.time);

    let mut changed = Vec::with_capacity(incoming.len());
    for fix in incoming {
        match fixes.binary_search_by_key(&fix.time, |f| f.time) {
            Ok(i) => {
                if fixes[i] != fix {
                    fixes[i] = fix;
                    changed.push(fix.time);
                }
            }
            Err(i) => {
                fixes.insert(i, fix);
                changed.push(fix.time);
            }
        }
    }
    changed
}

/// Swap `fresh` into `target` and report what differs from `previous`
fn apply_diff(
    mut previous: HashMap<CandidateKey, Candidate>,
    fresh: HashMap<CandidateKey, Candidate>,
    target: &mut HashMap<CandidateKey, Candidate>,
) -> CandidateDelta {
    let mut delta = CandidateDelta::default();
    for (key, candidate) in fresh {
        match previous.remove(&key) {
            Some(old) if old == candidate => {}
            Some(old) => {
                delta.removed.push(old);
                delta.added.push(candidate);
            }
            None => delta.added.push(candidate),
        }
        target.insert(key, candidate);
    }
    delta.removed.extend(previous.into_values());
    delta.sort();
    delta
}

fn scan(
    settings: &FinderSettings,
    race: &TrackedRace,
    fixes: &[GpsFix],
    pair_starts: impl Iterator<Item = usize>,
    centers: impl Iterator<Item = usize>,
) -> HashMap<CandidateKey, Candidate> {
    let course = race.course();
    let mut found = HashMap::new();
    let mut keep = |candidate: Option<Candidate>| {
        if let Some(c) = candidate.filter(|c| c.probability >= settings.min_probability) {
            found.insert(c.key(), c);
        }
    };

    for i in pair_starts {
        let (Some(first), Some(second)) = (fixes.get(i), fixes.get(i + 1)) else {
            continue;
        };
        for waypoint in 0..course.len() {
            keep(crossing_candidate(settings, race, waypoint, first, second));
        }
    }
    for i in centers {
        if i == 0 || i + 1 >= fixes.len() {
            continue;
        }
        for waypoint in 0..course.len() {
            keep(proximity_candidate(settings, race, waypoint, &fixes[i - 1..=i + 1]));
        }
    }
    found
}

fn crossing_candidate(
    settings: &FinderSettings,
    race: &TrackedRace,
    waypoint: usize,
    first: &GpsFix,
    second: &GpsFix,
) -> Option<Candidate> {
    let instruction = race.course().passing_instruction(waypoint).ok()?;
    let mid_time = first.time + (second.time - first.time) / 2;
    let line = crossing_line(race, waypoint, instruction, mid_time)?;

    let origin = line.origin();
    let bearing = line.bearing();
    let xte1 = first.position.cross_track_error(&origin, bearing);
    let xte2 = second.position.cross_track_error(&origin, bearing);
    if xte1.is_nan() || xte2.is_nan() || (xte1 > 0.0) == (xte2 > 0.0) {
        return None;
    }

    let ratio = xte1.abs() / (xte1.abs() + xte2.abs());
    let time = first.time + ((second.time - first.time) as f64 * ratio).round() as TimePoint;
    let point = first.position.interpolate(&second.position, ratio);
    let (distance, wrong_side) = line.assess(&point);
    if distance.is_nan() {
        return None;
    }

    let mut probability = distance_probability(settings, race, waypoint, distance, time);
    if wrong_side {
        probability *= settings.wrong_side_penalty;
    }
    if instruction.expects_decreasing_xte() != (xte1 > xte2) {
        probability *= settings.wrong_direction_penalty;
    }
    Some(Candidate::new(
        waypoint,
        time,
        probability,
        CandidateOrigin::Crossing {
            before: first.time,
            after: second.time,
        },
    ))
}

/// Closest approach to a rounding mark at the middle fix of `neighbourhood`
fn proximity_candidate(
    settings: &FinderSettings,
    race: &TrackedRace,
    waypoint: usize,
    neighbourhood: &[GpsFix],
) -> Option<Candidate> {
    let [before, at, after] = neighbourhood else {
        return None;
    };
    let instruction = race.course().passing_instruction(waypoint).ok()?;
    if instruction.is_two_mark() {
        return None;
    }
    let mark = *race.waypoint_positions(waypoint, at.time)?.first()?;

    let d_before = before.position.distance_to(&mark);
    let d_at = at.position.distance_to(&mark);
    let d_after = after.position.distance_to(&mark);
    if !(d_at < d_before && d_at <= d_after) {
        return None;
    }

    let mut probability =
        distance_probability(settings, race, waypoint, d_at, at.time) * settings.proximity_penalty;
    if let Some(CrossingLine::Ray { mark, bearing }) = crossing_line(race, waypoint, instruction, at.time) {
        if at.position.along_track_distance(&mark, bearing) < 0.0 {
            probability *= settings.wrong_side_penalty;
        }
    }
    Some(Candidate::new(
        waypoint,
        at.time,
        probability,
        CandidateOrigin::Proximity { at: at.time },
    ))
}

fn crossing_line(
    race: &TrackedRace,
    waypoint: usize,
    instruction: PassingInstruction,
    time: TimePoint,
) -> Option<CrossingLine> {
    let positions = race.waypoint_positions(waypoint, time)?;
    match positions.as_slice() {
        [start, end, ..] if instruction.is_two_mark() => Some(CrossingLine::Segment {
            start: *start,
            end: *end,
        }),
        [mark, ..] => {
            let heading = rounding_heading(race, waypoint, mark, instruction, time)?;
            let offset = if instruction == PassingInstruction::Starboard {
                -90.0
            } else {
                90.0
            };
            Some(CrossingLine::Ray {
                mark: *mark,
                bearing: normalize_degrees(heading + offset),
            })
        }
        [] => None,
    }
}

/// Mean heading of a boat rounding the mark, from the legs before and after
fn rounding_heading(
    race: &TrackedRace,
    waypoint: usize,
    mark: &Position,
    instruction: PassingInstruction,
    time: TimePoint,
) -> Option<f64> {
    let incoming = waypoint
        .checked_sub(1)
        .and_then(|w| race.waypoint_center(w, time))
        .map(|c| c.bearing_to(mark));
    let outgoing = Some(waypoint + 1)
        .filter(|&w| w < race.course().len())
        .and_then(|w| race.waypoint_center(w, time))
        .map(|c| mark.bearing_to(&c));

    match (incoming, outgoing) {
        (Some(h_in), Some(h_out)) => {
            let mut turn = angle_difference(h_out, h_in);
            // Port roundings turn counterclockwise, starboard ones clockwise
            if instruction == PassingInstruction::Starboard && turn < -90.0 {
                turn += 360.0;
            } else if instruction != PassingInstruction::Starboard && turn > 90.0 {
                turn -= 360.0;
            }
            Some(normalize_degrees(h_in + turn / 2.0))
        }
        (Some(h), None) | (None, Some(h)) => Some(h),
        (None, None) => None,
    }
}

fn distance_probability(
    settings: &FinderSettings,
    race: &TrackedRace,
    waypoint: usize,
    distance: f64,
    time: TimePoint,
) -> f64 {
    let leg = leg_length(race, waypoint, time).unwrap_or(settings.default_leg_length);
    1.0 / (settings.distance_scale * distance / leg + 1.0)
}

/// Mean distance to the adjacent waypoints
fn leg_length(race: &TrackedRace, waypoint: usize, time: TimePoint) -> Option<f64> {
    let center = race.waypoint_center(waypoint, time)?;
    let neighbours = [waypoint.checked_sub(1), Some(waypoint + 1)];
    let distances: Vec<f64> = neighbours
        .into_iter()
        .flatten()
        .filter(|&w| w < race.course().len())
        .filter_map(|w| race.waypoint_center(w, time))
        .map(|p| center.distance_to(&p))
        .collect();
    if distances.is_empty() {
        return None;
    }
    let mean = distances.iter().sum::<f64>() / distances.len() as f64;
    (mean > 0.0).then_some(mean)
}
