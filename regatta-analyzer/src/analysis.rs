//! Batch analysis of a recorded race
//!
//! Replays the recorded fixes through the mark passing calculator and
//! decodes the wind from the recorded maneuvers.

use log::{debug, info, warn};
use regatta_core::maneuver::{
    BestPathsCalculator, GeometricWindRangeProvider, IntersectionTransitionCalculator,
    ManeuverGraph,
};
use regatta_core::markpassing::MarkPassingCalculator;
use regatta_core::TrackedRace;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::AnalyzerError;
use crate::race_file::{
    from_time_point, to_time_point, MarkPassingReport, PassingRecord, RaceFile, WindEstimate,
    WindReport,
};
use crate::settings::AnalysisSettings;

/// Both reports of one race
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceReport {
    pub mark_passings: MarkPassingReport,
    pub wind: WindReport,
}

impl RaceReport {
    pub fn race(&self) -> &str {
        &self.mark_passings.race
    }
}

/// Course, marks and empty competitor tracks. Competitor fixes are fed
/// through the calculator.
pub fn build_race(file: &RaceFile) -> TrackedRace {
    let mut race = TrackedRace::new(file.course.clone());
    race.set_start_of_race(file.start_of_race());
    for (mark, fixes) in &file.marks {
        let track = race.add_mark(mark);
        for fix in fixes {
            track.add_fix(fix.to_fix());
        }
    }
    for waypoint in &file.course.waypoints {
        for mark in waypoint.marks.iter().filter(|m| !file.marks.contains_key(*m)) {
            warn!("Waypoint {} uses mark {} without fixes", waypoint.name, mark);
        }
    }
    for competitor in file.competitors.keys() {
        race.add_competitor(competitor);
    }
    race
}

pub fn analyze_mark_passings(
    file: &RaceFile,
    settings: &AnalysisSettings,
) -> Result<MarkPassingReport, AnalyzerError> {
    let mut calculator = MarkPassingCalculator::new(Arc::new(build_race(file)), settings.mark_passing);
    for (competitor, records) in &file.competitors {
        let fixes: Vec<_> = records.iter().map(|r| r.to_fix()).collect();
        calculator.add_competitor_fixes(competitor, &fixes)?;
        debug!("{}: {} fixes", competitor, fixes.len());
    }

    let competitors = calculator
        .store()
        .snapshot()
        .into_iter()
        .map(|(competitor, passings)| {
            let records = passings
                .into_iter()
                .map(|(waypoint, passing)| {
                    let waypoint_name = file
                        .course
                        .waypoint(waypoint)
                        .map(|w| w.name.clone())
                        .unwrap_or_default();
                    let record = PassingRecord {
                        waypoint_name,
                        time: from_time_point(passing.time),
                    };
                    (waypoint, record)
                })
                .collect();
            (competitor, records)
        })
        .collect::<BTreeMap<_, _>>();

    info!(
        "{}: mark passings for {} competitors",
        file.name,
        competitors.len()
    );
    Ok(MarkPassingReport {
        race: file.name.clone(),
        start_time: file.start_time,
        competitors,
    })
}

pub fn analyze_wind(file: &RaceFile, settings: &AnalysisSettings) -> Result<WindReport, AnalyzerError> {
    let mut report = WindReport {
        race: file.name.clone(),
        precise: settings.precise,
        estimates: Vec::new(),
    };
    if file.maneuvers.is_empty() {
        info!("{}: no maneuvers, skipping wind inference", file.name);
        return Ok(report);
    }

    for &maneuver in file.penalty_circles.keys() {
        if maneuver >= file.maneuvers.len() {
            warn!("Penalty circle refers to unknown maneuver {}", maneuver);
        }
    }

    let provider = GeometricWindRangeProvider::new(settings.wind_range);
    let mut graph = ManeuverGraph::new();
    let mut calculator = BestPathsCalculator::new(
        IntersectionTransitionCalculator::new(settings.transition),
        settings.precise,
    );
    // Records arrive in file order. A late one is slotted in
    // chronologically, one with the time of an existing level revises it.
    // `order` maps each level back to its record.
    let mut order: Vec<usize> = Vec::with_capacity(file.maneuvers.len());
    for (i, record) in file.maneuvers.iter().enumerate() {
        let maneuver = record.to_maneuver();
        let at = graph.levels().partition_point(|l| l.maneuver().time < maneuver.time);
        let level = if graph.levels().get(at).is_some_and(|l| l.maneuver().time == maneuver.time) {
            debug!("{}: maneuver {} revises level {}", file.name, i, at);
            order[at] = i;
            graph.revise_level(at, maneuver, &record.likelihoods, &provider)?
        } else if at == graph.len() {
            order.push(i);
            graph.push_maneuver(maneuver, &record.likelihoods, &provider)
        } else {
            debug!("{}: maneuver {} arrived out of order", file.name, i);
            let level = graph.insert_maneuver(maneuver, &record.likelihoods, &provider);
            order.insert(level, i);
            level
        };
        if let Some(range) = file.penalty_circles.get(&i) {
            graph.upgrade_level_considering_penalty_circle(level, &(*range).into())?;
        }
        calculator.recompute_best_paths_from_level(&graph, level)?;
    }

    if let Some(end) = &file.end_time {
        let end = to_time_point(end);
        let kept = graph.levels().partition_point(|l| l.maneuver().time <= end);
        if kept < graph.len() {
            info!(
                "{}: dropping {} maneuvers after the end of the race",
                file.name,
                graph.len() - kept
            );
            graph.truncate(kept);
            order.truncate(kept);
            calculator.recompute_best_paths_from_level(&graph, kept)?;
        }
    }
    if graph.is_empty() {
        return Ok(report);
    }

    let path = calculator.get_best_path(&graph)?;

    report.estimates = path
        .iter()
        .map(|inference| {
            let maneuver = order[inference.level];
            WindEstimate::new(maneuver, file.maneuvers[maneuver].position, inference)
        })
        .collect();
    info!(
        "{}: wind estimated at {} maneuvers",
        file.name,
        report.estimates.len()
    );
    Ok(report)
}

pub fn run_analysis(file: &RaceFile, settings: &AnalysisSettings) -> Result<RaceReport, AnalyzerError> {
    Ok(RaceReport {
        mark_passings: analyze_mark_passings(file, settings)?,
        wind: analyze_wind(file, settings)?,
    })
}
