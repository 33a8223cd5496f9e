//! Mark passing calculator
//!
//! Drives finder and chooser for one race. New competitor fixes only run
//! the pipeline for that competitor; new mark fixes move the waypoints and
//! rerun everything.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use super::candidate::MarkPassing;
use super::chooser::{CandidateChooser, ChooserSettings};
use super::finder::{CandidateFinder, FinderSettings};
use super::store::{MarkPassingStore, Subscription};
use crate::error::CourseError;
use crate::race::TrackedRace;
use crate::track::{GpsFix, TimePoint};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MarkPassingSettings {
    pub finder: FinderSettings,
    pub chooser: ChooserSettings,
}

#[derive(Debug)]
enum PendingUpdate {
    CompetitorFixes {
        competitor: String,
        fixes: Vec<GpsFix>,
    },
    MarkFixes,
}

/// Incremental mark passing detection for a race
pub struct MarkPassingCalculator {
    race: Arc<TrackedRace>,
    finder: CandidateFinder,
    chooser: CandidateChooser,
    store: MarkPassingStore,
    suspended: bool,
    pending: VecDeque<PendingUpdate>,
}

impl MarkPassingCalculator {
    pub fn new(race: Arc<TrackedRace>, settings: MarkPassingSettings) -> Self {
        let store = MarkPassingStore::new();
        let chooser = CandidateChooser::new(
            race.course().len(),
            race.start_of_race(),
            settings.chooser,
            store.clone(),
        )
        .with_race(Arc::clone(&race));
        MarkPassingCalculator {
            race,
            finder: CandidateFinder::new(settings.finder),
            chooser,
            store,
            suspended: false,
            pending: VecDeque::new(),
        }
    }

    pub fn race(&self) -> &Arc<TrackedRace> {
        &self.race
    }

    /// Shared handle to the confirmed passings
    pub fn store(&self) -> &MarkPassingStore {
        &self.store
    }

    pub fn subscribe(&self) -> Subscription {
        self.store.subscribe()
    }

    /// Recalculate all competitors from their tracks and return every
    /// confirmed passing, competitor -> waypoint -> passing
    pub fn get_all_passes(&mut self) -> BTreeMap<String, BTreeMap<usize, MarkPassing>> {
        self.recalculate_everything();
        self.store.snapshot()
    }

    pub fn recalculate_everything(&mut self) {
        let race = Arc::clone(&self.race);
        for competitor in race.competitor_ids() {
            let Ok(track) = race.competitor_track(competitor) else {
                continue;
            };
            let delta = {
                let fixes = track.read();
                self.finder.all_candidates(&race, competitor, &fixes)
            };
            self.chooser.calculate_all_mark_passes(competitor, &delta);
        }
        info!(
            "Recalculated mark passings for {} competitors",
            race.competitor_ids().count()
        );
    }

    /// Append fixes to a competitor's track and update its passings
    pub fn add_competitor_fixes(&mut self, competitor: &str, fixes: &[GpsFix]) -> Result<(), CourseError> {
        let track = self.race.competitor_track(competitor)?;
        for fix in fixes {
            track.add_fix(*fix);
        }
        let update = PendingUpdate::CompetitorFixes {
            competitor: competitor.to_string(),
            fixes: fixes.to_vec(),
        };
        if self.suspended {
            self.pending.push_back(update);
        } else {
            self.process(update);
        }
        Ok(())
    }

    /// Append fixes to a mark's track and recalculate all competitors
    pub fn on_mark_fixes(&mut self, mark: &str, fixes: &[GpsFix]) -> Result<(), CourseError> {
        let track = self.race.mark_track(mark)?;
        for fix in fixes {
            track.add_fix(*fix);
        }
        if self.suspended {
            self.pending.push_back(PendingUpdate::MarkFixes);
        } else {
            self.process(PendingUpdate::MarkFixes);
        }
        Ok(())
    }

    pub fn set_fixed_passing(
        &mut self,
        competitor: &str,
        waypoint: usize,
        time: TimePoint,
    ) -> Result<(), CourseError> {
        self.race.competitor_track(competitor)?;
        self.chooser.set_fixed_passing(competitor, waypoint, time)
    }

    pub fn remove_fixed_passing(&mut self, competitor: &str, waypoint: usize) -> Result<(), CourseError> {
        self.race.competitor_track(competitor)?;
        self.chooser.remove_fixed_passing(competitor, waypoint)
    }

    pub fn suppress_passings_from(&mut self, competitor: &str, waypoint: usize) -> Result<(), CourseError> {
        self.race.competitor_track(competitor)?;
        self.chooser.suppress_passings_from(competitor, waypoint)
    }

    pub fn stop_suppressing_passings(&mut self, competitor: &str) -> Result<(), CourseError> {
        self.race.competitor_track(competitor)?;
        self.chooser.stop_suppressing_passings(competitor);
        Ok(())
    }

    /// Queue updates instead of processing them
    pub fn suspend(&mut self) {
        self.suspended = true;
    }

    /// Process queued updates in arrival order and go back to immediate
    /// processing
    pub fn resume(&mut self) {
        self.suspended = false;
        debug!("Resuming with {} queued updates", self.pending.len());
        while let Some(update) = self.pending.pop_front() {
            self.process(update);
        }
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    fn process(&mut self, update: PendingUpdate) {
        match update {
            PendingUpdate::CompetitorFixes { competitor, fixes } => {
                let delta = self.finder.find_candidate_deltas(&self.race, &competitor, &fixes);
                self.chooser.calculate_mark_pass_deltas(&competitor, &delta);
            }
            PendingUpdate::MarkFixes => self.recalculate_everything(),
        }
    }
}
