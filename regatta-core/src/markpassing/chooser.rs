//! Candidate chooser
//!
//! Keeps the pending candidates of every competitor per waypoint and picks
//! the most probable path through them, one passing per waypoint at most.
//!
//! A path runs from a start node through candidates of increasing waypoint
//! and strictly increasing time to an end node. Each edge weighs the later
//! candidate's probability against how plausible the distance sailed
//! between the two candidates is for the legs in between, and each skipped
//! waypoint costs [`ChooserSettings::skip_penalty`]. Nothing after the start
//! is confirmed while the start is not, except fixed passings, which every
//! path has to go through.
//!
//! The best incoming path of each candidate is kept between updates, so a
//! change only re-evaluates waypoints from the first affected one onward.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::candidate::{Candidate, CandidateDelta, CandidateKey, CandidateOrigin, MarkPassing};
use super::store::{CompetitorPassings, MarkPassingStore};
use crate::error::CourseError;
use crate::race::TrackedRace;
use crate::track::{DistanceProfile, GpsTrack, TimePoint};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChooserSettings {
    /// How early before the start signal a passing is still considered
    pub early_start_window: TimePoint,
    /// Delay after the start signal at which a start candidate's weight halves
    pub start_delay_half_life: TimePoint,
    /// Weight factor per waypoint a path skips. Edges whose distance
    /// weight falls to this or below are dropped unless a fixed passing
    /// is involved.
    pub skip_penalty: f64,
    /// Sailed to course distance ratio beyond which an edge's weight decays
    pub max_reasonable_ratio: f64,
    /// Distance weight ceiling for edges into the last waypoint, so that
    /// a later finish crossing does not win only by sailing farther
    pub late_finish_factor: f64,
}

impl Default for ChooserSettings {
    fn default() -> Self {
        ChooserSettings {
            early_start_window: 5_000,     // ms
            start_delay_half_life: 60_000, // ms
            skip_penalty: 0.05,
            max_reasonable_ratio: 2.0,
            late_finish_factor: 0.95,
        }
    }
}

/// Where a path arrives from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Node {
    Start,
    Candidate(CandidateKey),
}

/// Best path into one candidate
#[derive(Debug, Clone, Copy)]
struct Step {
    candidate: Candidate,
    /// Weight of the best path from the start, or from the latest fixed
    /// passing before this candidate
    score: f64,
    parent: Node,
}

/// Inputs of the edge weights for one recomputation
struct PathContext<'a> {
    settings: &'a ChooserSettings,
    course_len: usize,
    start_of_race: Option<TimePoint>,
    race: Option<&'a TrackedRace>,
    sailed: Option<DistanceProfile>,
}

impl PathContext<'_> {
    fn skipping(&self, waypoints: usize) -> f64 {
        self.settings.skip_penalty.powi(waypoints as i32)
    }

    /// Weight of the edge from the start node, None if there is none
    fn start_weight(&self, to: &Candidate) -> Option<f64> {
        if let Some(start) = self.start_of_race {
            if to.time <= start - self.settings.early_start_window {
                return None;
            }
        }
        if to.waypoint == 0 {
            let timing = match self.start_of_race {
                Some(start) => {
                    let half_life = self.settings.start_delay_half_life as f64;
                    half_life / (half_life + (to.time - start).abs() as f64)
                }
                None => 1.0,
            };
            Some(timing * to.probability)
        } else if to.origin == CandidateOrigin::Fixed {
            Some(self.skipping(to.waypoint))
        } else {
            None
        }
    }

    fn edge_weight(&self, from: &Candidate, to: &Candidate) -> Option<f64> {
        if to.waypoint <= from.waypoint || to.time <= from.time {
            return None;
        }
        let distance = self.distance_probability(from, to);
        let fixed = from.origin == CandidateOrigin::Fixed || to.origin == CandidateOrigin::Fixed;
        if !fixed && distance <= self.settings.skip_penalty {
            return None;
        }
        Some(distance * to.probability * self.skipping(to.waypoint - from.waypoint - 1))
    }

    /// Weight of ending the path after `from` (None: the start node) when
    /// waypoints from `limit` on are not confirmed
    fn end_weight(&self, from: Option<usize>, limit: usize) -> f64 {
        self.skipping(limit - from.map_or(0, |w| w + 1))
    }

    /// Plausibility of sailing from one candidate to the other, judged by
    /// the distance sailed against the course distance between them
    fn distance_probability(&self, from: &Candidate, to: &Candidate) -> f64 {
        let (Some(race), Some(sailed)) = (self.race, &self.sailed) else {
            return 1.0;
        };
        let Some(course) = race.course_distance(from.waypoint, to.waypoint, from.time) else {
            return 1.0;
        };
        let Some(sailed) = sailed.distance_between(from.time, to.time) else {
            return 1.0;
        };
        if course <= 0.0 {
            return 1.0;
        }

        let ratio = sailed / course;
        let ceiling = if to.waypoint + 1 == self.course_len {
            self.settings.late_finish_factor
        } else {
            1.0
        };
        let max_ratio = self.settings.max_reasonable_ratio;
        if ratio <= 1.0 {
            ratio
        } else if ratio <= max_ratio {
            1.0 - (1.0 - ceiling) * (ratio - 1.0) / (max_ratio - 1.0)
        } else {
            ceiling / (ratio - max_ratio + 1.0)
        }
    }
}

#[derive(Debug)]
struct ChooserState {
    candidates: Vec<HashMap<CandidateKey, Candidate>>,
    fixed: BTreeMap<usize, TimePoint>,
    suppressed_from: Option<usize>,
    /// Reachable nodes per waypoint with their best incoming path, in time order
    steps: Vec<Vec<Step>>,
}

impl ChooserState {
    fn new(course_len: usize) -> Self {
        ChooserState {
            candidates: vec![HashMap::new(); course_len],
            fixed: BTreeMap::new(),
            suppressed_from: None,
            steps: vec![Vec::new(); course_len],
        }
    }

    /// First waypoint a path may not confirm
    fn limit(&self) -> usize {
        self.suppressed_from
            .map_or(self.steps.len(), |from| from.min(self.steps.len()))
    }

    /// Latest fixed passing before `waypoint`
    fn fixed_before(&self, waypoint: usize) -> Option<Candidate> {
        self.fixed
            .range(..waypoint)
            .next_back()
            .map(|(&w, &t)| Candidate::fixed(w, t))
    }

    fn nodes(&self, waypoint: usize) -> Vec<Candidate> {
        if waypoint >= self.limit() {
            return Vec::new();
        }
        if let Some(&time) = self.fixed.get(&waypoint) {
            return vec![Candidate::fixed(waypoint, time)];
        }
        let mut nodes: Vec<Candidate> = self.candidates[waypoint].values().copied().collect();
        nodes.sort_by_key(Candidate::key);
        nodes
    }

    /// Re-derive the best incoming path of every node from `from` onward
    fn solve_from(&mut self, from: usize, context: &PathContext) {
        for waypoint in from..self.steps.len() {
            let steps: Vec<Step> = self
                .nodes(waypoint)
                .into_iter()
                .filter_map(|c| self.best_step(c, context))
                .collect();
            self.steps[waypoint] = steps;
        }
    }

    fn best_step(&self, candidate: Candidate, context: &PathContext) -> Option<Step> {
        let floor = self.fixed_before(candidate.waypoint);
        let mut best: Option<(f64, Node)> = None;
        if floor.is_none() {
            if let Some(weight) = context.start_weight(&candidate) {
                offer(&mut best, weight, Node::Start);
            }
        }
        for steps in &self.steps[floor.map_or(0, |f| f.waypoint)..candidate.waypoint] {
            for step in steps {
                if step.candidate.time >= candidate.time {
                    break;
                }
                if let Some(weight) = context.edge_weight(&step.candidate, &candidate) {
                    offer(&mut best, step.score * weight, Node::Candidate(step.candidate.key()));
                }
            }
        }

        let is_fixed = candidate.origin == CandidateOrigin::Fixed;
        match best {
            Some((score, parent)) => Some(Step {
                candidate,
                score: if is_fixed { 1.0 } else { score },
                parent,
            }),
            // A fixed passing nothing leads to still stands, after the previous one
            None if is_fixed => Some(Step {
                candidate,
                score: 1.0,
                parent: floor.map_or(Node::Start, |f| Node::Candidate(f.key())),
            }),
            None => None,
        }
    }

    /// Candidates on the best path, in course order
    fn best_path(&self, context: &PathContext) -> Vec<Candidate> {
        let limit = self.limit();
        let floor = self.fixed_before(limit);
        let mut best: Option<(f64, Node)> = None;
        if floor.is_none() {
            offer(&mut best, context.end_weight(None, limit), Node::Start);
        }
        for (waypoint, steps) in self.steps[..limit]
            .iter()
            .enumerate()
            .skip(floor.map_or(0, |f| f.waypoint))
        {
            for step in steps {
                let weight = step.score * context.end_weight(Some(waypoint), limit);
                offer(&mut best, weight, Node::Candidate(step.candidate.key()));
            }
        }

        let mut path = Vec::new();
        let mut node = best.map_or(Node::Start, |(_, node)| node);
        while let Node::Candidate(key) = node {
            let Some(step) = self.steps[key.waypoint]
                .iter()
                .find(|s| s.candidate.key() == key)
            else {
                warn!("Best path lost candidate {:?}", key);
                break;
            };
            path.push(step.candidate);
            node = step.parent;
        }
        path.reverse();
        path
    }
}

/// Keep `node` if it beats the best so far; the first of equal weights wins
fn offer(best: &mut Option<(f64, Node)>, weight: f64, node: Node) {
    if weight > 0.0 && best.map_or(true, |(w, _)| weight > w) {
        *best = Some((weight, node));
    }
}

fn passings(competitor: &str, path: &[Candidate]) -> CompetitorPassings {
    let mut passings = CompetitorPassings::new();
    for c in path {
        passings.insert(MarkPassing {
            competitor: competitor.to_string(),
            waypoint: c.waypoint,
            time: c.time,
        });
    }
    passings
}

/// Turns candidate deltas into confirmed passings published to a
/// [`MarkPassingStore`]
#[derive(Debug)]
pub struct CandidateChooser {
    course_len: usize,
    start_of_race: Option<TimePoint>,
    settings: ChooserSettings,
    store: MarkPassingStore,
    /// Source of sailed and course distances; without it every distance
    /// is taken as plausible
    race: Option<Arc<TrackedRace>>,
    competitors: HashMap<String, ChooserState>,
}

impl CandidateChooser {
    pub fn new(
        course_len: usize,
        start_of_race: Option<TimePoint>,
        settings: ChooserSettings,
        store: MarkPassingStore,
    ) -> Self {
        CandidateChooser {
            course_len,
            start_of_race,
            settings,
            store,
            race: None,
            competitors: HashMap::new(),
        }
    }

    /// Weigh edges by the distances sailed on `race`'s tracks
    pub fn with_race(mut self, race: Arc<TrackedRace>) -> Self {
        self.race = Some(race);
        self
    }

    pub fn store(&self) -> &MarkPassingStore {
        &self.store
    }

    /// Apply a candidate delta and publish the competitor's new passings
    pub fn calculate_mark_pass_deltas(&mut self, competitor: &str, delta: &CandidateDelta) {
        if let Some(from) = self.apply(competitor, delta) {
            self.recompute(competitor, from);
        }
    }

    /// Apply a candidate delta and re-derive the whole path, for when the
    /// course distances may have changed as well
    pub fn calculate_all_mark_passes(&mut self, competitor: &str, delta: &CandidateDelta) {
        self.apply(competitor, delta);
        if self.competitors.contains_key(competitor) {
            self.recompute(competitor, 0);
        }
    }

    /// Returns the first waypoint whose candidates changed
    fn apply(&mut self, competitor: &str, delta: &CandidateDelta) -> Option<usize> {
        if delta.is_empty() {
            return None;
        }
        let state = self.state_mut(competitor);

        let mut from: Option<usize> = None;
        for c in &delta.removed {
            if let Some(pending) = state.candidates.get_mut(c.waypoint) {
                if pending.remove(&c.key()).is_some() {
                    from = Some(from.map_or(c.waypoint, |w| w.min(c.waypoint)));
                }
            }
        }
        for c in &delta.added {
            match state.candidates.get_mut(c.waypoint) {
                Some(pending) => {
                    pending.insert(c.key(), *c);
                    from = Some(from.map_or(c.waypoint, |w| w.min(c.waypoint)));
                }
                None => warn!(
                    "{}: candidate for waypoint {} outside the course",
                    competitor, c.waypoint
                ),
            }
        }
        from
    }

    /// Pin a passing to `time`. It replaces every candidate of the waypoint.
    pub fn set_fixed_passing(
        &mut self,
        competitor: &str,
        waypoint: usize,
        time: TimePoint,
    ) -> Result<(), CourseError> {
        self.check_waypoint(waypoint)?;
        self.state_mut(competitor).fixed.insert(waypoint, time);
        self.recompute(competitor, waypoint);
        Ok(())
    }

    pub fn remove_fixed_passing(&mut self, competitor: &str, waypoint: usize) -> Result<(), CourseError> {
        self.check_waypoint(waypoint)?;
        if self.state_mut(competitor).fixed.remove(&waypoint).is_some() {
            self.recompute(competitor, waypoint);
        }
        Ok(())
    }

    /// Confirm no passings at or after `waypoint`
    pub fn suppress_passings_from(&mut self, competitor: &str, waypoint: usize) -> Result<(), CourseError> {
        self.check_waypoint(waypoint)?;
        let state = self.state_mut(competitor);
        let from = state.suppressed_from.map_or(waypoint, |old| old.min(waypoint));
        state.suppressed_from = Some(waypoint);
        self.recompute(competitor, from);
        Ok(())
    }

    pub fn stop_suppressing_passings(&mut self, competitor: &str) {
        if let Some(from) = self.state_mut(competitor).suppressed_from.take() {
            self.recompute(competitor, from);
        }
    }

    /// Forget everything about a competitor, publishing the removal
    pub fn reset(&mut self, competitor: &str) {
        if self.competitors.remove(competitor).is_some() {
            self.store.replace(competitor, CompetitorPassings::default());
        }
    }

    fn check_waypoint(&self, waypoint: usize) -> Result<(), CourseError> {
        if waypoint < self.course_len {
            Ok(())
        } else {
            Err(CourseError::WaypointOutOfRange {
                index: waypoint,
                count: self.course_len,
            })
        }
    }

    fn state_mut(&mut self, competitor: &str) -> &mut ChooserState {
        let course_len = self.course_len;
        self.competitors
            .entry(competitor.to_string())
            .or_insert_with(|| ChooserState::new(course_len))
    }

    /// Re-derive best paths from waypoint `from` onward and publish the
    /// resulting passings
    fn recompute(&mut self, competitor: &str, from: usize) {
        let sailed = self
            .race
            .as_ref()
            .and_then(|race| race.competitor_track(competitor).ok())
            .map(GpsTrack::distance_profile);
        let context = PathContext {
            settings: &self.settings,
            course_len: self.course_len,
            start_of_race: self.start_of_race,
            race: self.race.as_deref(),
            sailed,
        };
        let Some(state) = self.competitors.get_mut(competitor) else {
            return;
        };
        state.solve_from(from, &context);
        let path = state.best_path(&context);
        debug!(
            "{}: re-solved waypoints {}.., {} on the best path",
            competitor,
            from,
            path.len()
        );
        self.store.replace(competitor, passings(competitor, &path));
    }
}
