//! Confirmed mark passings, shared with readers
//!
//! The chooser computes a competitor's complete new passing set and swaps
//! it in with one write, so readers never see a half-updated competitor.
//! Every effective change is also published to subscribers.

use crossbeam::channel::{self, Receiver, Sender};
use log::debug;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, PoisonError, RwLock};

use super::candidate::MarkPassing;
use crate::track::TimePoint;

/// Confirmed passings of one competitor, queryable by waypoint and by time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompetitorPassings {
    by_waypoint: BTreeMap<usize, MarkPassing>,
    by_time: BTreeSet<(TimePoint, usize)>,
}

impl CompetitorPassings {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, passing: MarkPassing) {
        if let Some(old) = self.by_waypoint.remove(&passing.waypoint) {
            self.by_time.remove(&(old.time, old.waypoint));
        }
        self.by_time.insert((passing.time, passing.waypoint));
        self.by_waypoint.insert(passing.waypoint, passing);
    }

    pub fn get(&self, waypoint: usize) -> Option<&MarkPassing> {
        self.by_waypoint.get(&waypoint)
    }

    pub fn len(&self) -> usize {
        self.by_waypoint.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_waypoint.is_empty()
    }

    /// Passings in waypoint order
    pub fn iter(&self) -> impl Iterator<Item = &MarkPassing> {
        self.by_waypoint.values()
    }

    /// Passings in time order
    pub fn iter_by_time(&self) -> impl Iterator<Item = &MarkPassing> {
        self.by_time
            .iter()
            .filter_map(move |(_, waypoint)| self.by_waypoint.get(waypoint))
    }

    /// The passing most recently completed at or before `time`
    pub fn last_passed_at_or_before(&self, time: TimePoint) -> Option<&MarkPassing> {
        self.by_time
            .range(..=(time, usize::MAX))
            .next_back()
            .and_then(|(_, waypoint)| self.by_waypoint.get(waypoint))
    }
}

/// Effective change of one competitor's passings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkPassingUpdate {
    pub competitor: String,
    pub added: Vec<MarkPassing>,
    pub removed: Vec<MarkPassing>,
}

/// Explicit subscription to passing updates. Hand it back through
/// [`MarkPassingStore::unsubscribe`] when done.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    receiver: Receiver<MarkPassingUpdate>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn receiver(&self) -> &Receiver<MarkPassingUpdate> {
        &self.receiver
    }

    /// All updates published so far and not yet received
    pub fn drain(&self) -> Vec<MarkPassingUpdate> {
        self.receiver.try_iter().collect()
    }
}

#[derive(Debug, Default)]
struct StoreInner {
    passings: BTreeMap<String, CompetitorPassings>,
    subscribers: Vec<(u64, Sender<MarkPassingUpdate>)>,
    next_subscription: u64,
}

/// Shared handle to the confirmed passings of all competitors
#[derive(Debug, Clone, Default)]
pub struct MarkPassingStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl MarkPassingStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, StoreInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, StoreInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn passings(&self, competitor: &str) -> Option<CompetitorPassings> {
        self.read().passings.get(competitor).cloned()
    }

    pub fn passing(&self, competitor: &str, waypoint: usize) -> Option<MarkPassing> {
        self.read()
            .passings
            .get(competitor)
            .and_then(|p| p.get(waypoint))
            .cloned()
    }

    /// Competitor -> waypoint -> passing
    pub fn snapshot(&self) -> BTreeMap<String, BTreeMap<usize, MarkPassing>> {
        self.read()
            .passings
            .iter()
            .map(|(competitor, passings)| {
                let by_waypoint = passings.iter().map(|p| (p.waypoint, p.clone())).collect();
                (competitor.clone(), by_waypoint)
            })
            .collect()
    }

    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = channel::unbounded();
        let mut inner = self.write();
        let id = inner.next_subscription;
        inner.next_subscription += 1;
        inner.subscribers.push((id, tx));
        Subscription { id, receiver: rx }
    }

    pub fn unsubscribe(&self, subscription: Subscription) {
        self.write()
            .subscribers
            .retain(|(id, _)| *id != subscription.id);
    }

    /// Swap in a competitor's new passing set. Returns the effective change,
    /// or None when nothing changed.
    pub(crate) fn replace(
        &self,
        competitor: &str,
        passings: CompetitorPassings,
    ) -> Option<MarkPassingUpdate> {
        let mut inner = self.write();
        let empty = CompetitorPassings::default();
        let old = inner.passings.get(competitor).unwrap_or(&empty);
        if *old == passings {
            return None;
        }

        let removed: Vec<MarkPassing> = old
            .iter()
            .filter(|p| passings.get(p.waypoint) != Some(*p))
            .cloned()
            .collect();
        let added: Vec<MarkPassing> = passings
            .iter()
            .filter(|p| old.get(p.waypoint) != Some(*p))
            .cloned()
            .collect();
        let update = MarkPassingUpdate {
            competitor: competitor.to_string(),
            added,
            removed,
        };
        debug!(
            "{}: {} passings added, {} removed",
            competitor,
            update.added.len(),
            update.removed.len()
        );

        inner.passings.insert(competitor.to_string(), passings);
        // Receivers dropped without unsubscribing are pruned here
        inner
            .subscribers
            .retain(|(_, tx)| tx.send(update.clone()).is_ok());
        Some(update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passing(waypoint: usize, time: TimePoint) -> MarkPassing {
        MarkPassing {
            competitor: "GER 1".to_string(),
            waypoint,
            time,
        }
    }

    fn passings(items: &[(usize, TimePoint)]) -> CompetitorPassings {
        let mut p = CompetitorPassings::new();
        for &(w, t) in items {
            p.insert(passing(w, t));
        }
        p
    }

    #[test]
    fn test_last_passed_at_or_before() {
        let p = passings(&[(0, 100), (1, 300), (2, 500)]);
        assert!(p.last_passed_at_or_before(50).is_none());
        assert_eq!(p.last_passed_at_or_before(100).unwrap().waypoint, 0);
        assert_eq!(p.last_passed_at_or_before(499).unwrap().waypoint, 1);
        assert_eq!(p.last_passed_at_or_before(10_000).unwrap().waypoint, 2);
    }

    #[test]
    fn test_insert_replaces_waypoint() {
        let mut p = passings(&[(0, 100), (1, 300)]);
        p.insert(passing(1, 200));
        assert_eq!(p.len(), 2);
        assert_eq!(p.get(1).unwrap().time, 200);
        let times: Vec<_> = p.iter_by_time().map(|m| m.time).collect();
        assert_eq!(times, vec![100, 200]);
    }

    #[test]
    fn test_replace_reports_effective_change() {
        let store = MarkPassingStore::new();
        let update = store.replace("GER 1", passings(&[(0, 100), (1, 300)])).unwrap();
        assert_eq!(update.added.len(), 2);
        assert!(update.removed.is_empty());

        assert!(store.replace("GER 1", passings(&[(0, 100), (1, 300)])).is_none());

        let update = store.replace("GER 1", passings(&[(0, 100), (1, 320)])).unwrap();
        assert_eq!(update.added, vec![passing(1, 320)]);
        assert_eq!(update.removed, vec![passing(1, 300)]);
        assert_eq!(store.passing("GER 1", 1).unwrap().time, 320);
    }

    #[test]
    fn test_subscription_lifecycle() {
        let store = MarkPassingStore::new();
        let sub = store.subscribe();
        let dropped = store.subscribe();
        drop(dropped);

        store.replace("GER 1", passings(&[(0, 100)]));
        let updates = sub.drain();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].competitor, "GER 1");
        assert_eq!(store.read().subscribers.len(), 1);

        store.unsubscribe(sub);
        assert!(store.read().subscribers.is_empty());
    }
}
