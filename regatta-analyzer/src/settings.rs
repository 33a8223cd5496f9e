//! Analysis settings
//!
//! All tunables of both pipelines in one document. A settings file may
//! name any subset of fields; the rest take their defaults. Command line
//! flags override the file.

use log::{debug, info};
use regatta_core::maneuver::{TransitionSettings, WindRangeSettings};
use regatta_core::markpassing::MarkPassingSettings;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::AnalyzerError;
use crate::Cli;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalysisSettings {
    pub mark_passing: MarkPassingSettings,
    pub transition: TransitionSettings,
    pub wind_range: WindRangeSettings,
    /// Forward-backward confidences instead of best-path ratios
    pub precise: bool,
}

impl AnalysisSettings {
    pub fn load(path: &Path) -> Result<Self, AnalyzerError> {
        let file = File::open(path).map_err(|source| AnalyzerError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = serde_json::from_reader(BufReader::new(file)).map_err(|source| {
            AnalyzerError::Json {
                path: path.to_path_buf(),
                source,
            }
        })?;
        info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Settings file named on the command line, if any, with the command
    /// line overrides applied
    pub fn from_cli(args: &Cli) -> Result<Self, AnalyzerError> {
        let mut settings = match &args.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        settings.apply_overrides(args);
        debug!("Effective settings: {:?}", settings);
        Ok(settings)
    }

    pub fn apply_overrides(&mut self, args: &Cli) {
        if args.precise {
            self.precise = true;
        }
        if let Some(mode) = args.combination_mode {
            self.transition.combination_mode = mode.into();
        }
        if let Some(p) = args.min_candidate_probability {
            self.mark_passing.finder.min_probability = p;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use regatta_core::CombinationMode;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"markPassing": {{"finder": {{"distanceScale": 4.0}}}}, "precise": true}}"#
        )
        .unwrap();

        let settings = AnalysisSettings::load(file.path()).unwrap();
        assert!(settings.precise);
        assert_eq!(settings.mark_passing.finder.distance_scale, 4.0);
        assert_eq!(settings.mark_passing.finder.wrong_side_penalty, 0.7);
        assert_eq!(settings.transition, TransitionSettings::default());
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"transition": {{"combinationMode": "expansion"}}, "markPassing": {{"finder": {{"minProbability": 0.2}}}}}}"#
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let args = Cli::parse_from([
            "regatta-analyzer",
            "race.json",
            "--config",
            &path,
            "--combination-mode",
            "range-of-next",
        ]);
        let settings = AnalysisSettings::from_cli(&args).unwrap();
        assert_eq!(settings.transition.combination_mode, CombinationMode::RangeOfNext);
        assert_eq!(settings.mark_passing.finder.min_probability, 0.2);
        assert!(!settings.precise);

        let args = Cli::parse_from([
            "regatta-analyzer",
            "race.json",
            "--config",
            &path,
            "--min-candidate-probability",
            "0.01",
            "--precise",
        ]);
        let settings = AnalysisSettings::from_cli(&args).unwrap();
        assert_eq!(settings.transition.combination_mode, CombinationMode::Expansion);
        assert_eq!(settings.mark_passing.finder.min_probability, 0.01);
        assert!(settings.precise);
    }

    #[test]
    fn test_malformed_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(
            AnalysisSettings::load(file.path()),
            Err(AnalyzerError::Json { .. })
        ));
        assert!(matches!(
            AnalysisSettings::load(Path::new("/nonexistent/settings.json")),
            Err(AnalyzerError::Read { .. })
        ));
    }
}
