//! # Regatta Analyzer
//!
//! Batch analysis of recorded sailing races.
//!
//! Reads a race description (course, mark fixes, competitor fixes and
//! detected maneuvers), then:
//! - Detects when each competitor passed each waypoint
//! - Infers the wind direction at each maneuver
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                   regatta-analyzer                      │
//! │  ┌─────────────┐  ┌─────────────┐  ┌──────────────────┐ │
//! │  │ Cli (clap)  │  │ Settings    │  │ RaceFile (json)  │ │
//! │  └──────┬──────┘  └──────┬──────┘  └────────┬─────────┘ │
//! │         │                │                  │           │
//! │         ▼                ▼                  ▼           │
//! │  ┌─────────────────────────────────────────────────────┐│
//! │  │              Session (Arc<RwLock>)                  ││
//! │  │  - Effective settings                               ││
//! │  │  - Last report                                      ││
//! │  └─────────────────────────────────────────────────────┘│
//! │         │                                               │
//! │         ▼                                               │
//! │  ┌─────────────────────────────────────────────────────┐│
//! │  │              regatta-core                           ││
//! │  │  - MarkPassingCalculator                            ││
//! │  │  - ManeuverGraph + BestPathsCalculator              ││
//! │  └─────────────────────────────────────────────────────┘│
//! │         │                                               │
//! │         ▼                                               │
//! │  ┌─────────────────────────────────────────────────────┐│
//! │  │              ReportStorage                          ││
//! │  │  - <output>/<race>/mark_passings.json               ││
//! │  │  - <output>/<race>/wind.json                        ││
//! │  └─────────────────────────────────────────────────────┘│
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Components
//!
//! - [`Session`] - Arguments, settings and the last report
//! - [`settings::AnalysisSettings`] - Tunables of both pipelines
//! - [`race_file::RaceFile`] - Input format
//! - [`analysis::run_analysis`] - The two pipelines
//! - [`storage::ReportStorage`] - Report files on disk
//!
//! ## Command-Line Interface
//!
//! See [`Cli`] for all available options. Key options:
//!
//! - `-c, --config` - Settings file (JSON)
//! - `-o, --output` - Report directory; without it the report goes to stdout
//! - `--precise` - Forward-backward confidences
//! - `-v` - Increase verbosity (use multiple times)

use clap::Parser;
use regatta_core::CombinationMode;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub mod analysis;
pub mod error;
pub mod race_file;
pub mod settings;
pub mod storage;

use analysis::RaceReport;
use error::AnalyzerError;
use race_file::RaceFile;
use settings::AnalysisSettings;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// How wind ranges are merged along a path
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CombinationModeArg {
    Intersection,
    Expansion,
    RangeOfNext,
}

impl From<CombinationModeArg> for CombinationMode {
    fn from(arg: CombinationModeArg) -> Self {
        match arg {
            CombinationModeArg::Intersection => CombinationMode::Intersection,
            CombinationModeArg::Expansion => CombinationMode::Expansion,
            CombinationModeArg::RangeOfNext => CombinationMode::RangeOfNext,
        }
    }
}

#[derive(Parser, Clone, Debug)]
#[command(version, about)]
pub struct Cli {
    #[clap(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity<clap_verbosity_flag::InfoLevel>,

    /// Race description (JSON)
    pub input: PathBuf,

    /// Settings file (JSON), any subset of fields
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory to write the reports to, stdout if not given
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Compute forward-backward confidences
    #[arg(long, default_value_t = false)]
    pub precise: bool,

    /// Override the wind range combination mode
    #[arg(long, value_enum)]
    pub combination_mode: Option<CombinationModeArg>,

    /// Override the lowest probability a mark passing candidate may have
    #[arg(long)]
    pub min_candidate_probability: Option<f64>,
}

pub struct SessionInner {
    pub args: Cli,
    pub settings: AnalysisSettings,
    pub last_report: Option<RaceReport>,
}

#[derive(Clone)]
pub struct Session {
    pub inner: Arc<RwLock<SessionInner>>,
}

impl Session {
    pub fn read(
        &self,
    ) -> Result<RwLockReadGuard<'_, SessionInner>, PoisonError<RwLockReadGuard<'_, SessionInner>>>
    {
        self.inner.read()
    }

    pub fn write(
        &self,
    ) -> Result<RwLockWriteGuard<'_, SessionInner>, PoisonError<RwLockWriteGuard<'_, SessionInner>>>
    {
        self.inner.write()
    }

    pub fn new(args: Cli) -> Result<Self, AnalyzerError> {
        let settings = AnalysisSettings::from_cli(&args)?;
        Ok(Session {
            inner: Arc::new(RwLock::new(SessionInner {
                args,
                settings,
                last_report: None,
            })),
        })
    }

    pub fn args(&self) -> Cli {
        self.read().unwrap_or_else(PoisonError::into_inner).args.clone()
    }

    pub fn settings(&self) -> AnalysisSettings {
        self.read().unwrap_or_else(PoisonError::into_inner).settings
    }

    pub fn last_report(&self) -> Option<RaceReport> {
        self.read()
            .unwrap_or_else(PoisonError::into_inner)
            .last_report
            .clone()
    }

    /// Load the input race and run both pipelines on it
    pub fn run(&self) -> Result<RaceReport, AnalyzerError> {
        let input = self.args().input;
        let race = RaceFile::load(&input)?;
        let report = analysis::run_analysis(&race, &self.settings())?;
        self.write().unwrap_or_else(PoisonError::into_inner).last_report = Some(report.clone());
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_cli_defaults() {
        let args = Cli::parse_from(["regatta-analyzer", "race.json"]);
        assert_eq!(args.input, PathBuf::from("race.json"));
        assert!(args.config.is_none());
        assert!(args.output.is_none());
        assert!(!args.precise);
        assert!(args.combination_mode.is_none());
        assert_eq!(args.verbose.log_level_filter(), log::LevelFilter::Info);
    }

    #[test]
    fn test_cli_options() {
        let args = Cli::parse_from([
            "regatta-analyzer",
            "-vv",
            "-o",
            "reports",
            "--combination-mode",
            "expansion",
            "race.json",
        ]);
        assert_eq!(args.output, Some(PathBuf::from("reports")));
        assert_eq!(args.combination_mode, Some(CombinationModeArg::Expansion));
        assert_eq!(args.verbose.log_level_filter(), log::LevelFilter::Trace);
        assert!(Cli::try_parse_from(["regatta-analyzer"]).is_err());
        assert!(Cli::try_parse_from(["regatta-analyzer", "r.json", "--combination-mode", "union"]).is_err());
    }

    #[test]
    fn test_session_run() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "name": "Practice",
                "course": {{"waypoints": [{{"name": "Start", "marks": ["pin", "rc"]}}]}},
                "marks": {{
                    "pin": [{{"time": "2024-06-01T12:00:00Z", "lat": 0.0, "lon": 0.0}}],
                    "rc": [{{"time": "2024-06-01T12:00:00Z", "lat": 0.0, "lon": 0.001}}]
                }},
                "competitors": {{"GER 1": [
                    {{"time": "2024-06-01T12:01:30Z", "lat": -0.0005, "lon": 0.0005}},
                    {{"time": "2024-06-01T12:01:50Z", "lat": 0.0005, "lon": 0.0005}}
                ]}}
            }}"#
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let session = Session::new(Cli::parse_from(["regatta-analyzer", &path, "--precise"])).unwrap();
        assert!(session.settings().precise);
        assert!(session.last_report().is_none());

        let report = session.run().unwrap();
        assert_eq!(report.race(), "Practice");
        let start = &report.mark_passings.competitors["GER 1"][&0];
        assert_eq!(start.time.to_rfc3339(), "2024-06-01T12:01:40+00:00");
        assert!(report.wind.estimates.is_empty());
        assert_eq!(session.last_report(), Some(report));
    }

    #[test]
    fn test_session_missing_input() {
        let session = Session::new(Cli::parse_from(["regatta-analyzer", "/nonexistent/race.json"])).unwrap();
        assert!(matches!(session.run(), Err(AnalyzerError::Read { .. })));
    }
}
