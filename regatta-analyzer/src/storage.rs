//! Report files on disk.
//!
//! Layout: `{output}/{race}/{key}.json`, one pretty-printed JSON document
//! per key. Race names and keys may contain `/`, which is stored as `__`.

use log::{debug, error, info, warn};
use serde::Serialize;
use serde_json::Value;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::analysis::RaceReport;
use crate::error::AnalyzerError;

pub const MARK_PASSINGS_KEY: &str = "mark_passings";
pub const WIND_KEY: &str = "wind";

fn sanitize(name: &str) -> String {
    name.replace('/', "__")
}

pub struct ReportStorage {
    base_dir: PathBuf,
}

impl ReportStorage {
    pub fn new(base_dir: &Path) -> Result<Self, AnalyzerError> {
        fs::create_dir_all(base_dir).map_err(|source| {
            error!("Failed to create report directory {}: {}", base_dir.display(), source);
            AnalyzerError::Write {
                path: base_dir.to_path_buf(),
                source,
            }
        })?;
        debug!("Report directory: {}", base_dir.display());
        Ok(ReportStorage {
            base_dir: base_dir.to_path_buf(),
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn race_dir(&self, race: &str) -> PathBuf {
        self.base_dir.join(sanitize(race))
    }

    fn file_path(&self, race: &str, key: &str) -> PathBuf {
        self.race_dir(race).join(format!("{}.json", sanitize(key)))
    }

    /// Write one document, replacing any earlier one under the same key
    pub fn put<T: Serialize>(&self, race: &str, key: &str, value: &T) -> Result<PathBuf, AnalyzerError> {
        let dir_path = self.race_dir(race);
        let file_path = self.file_path(race, key);
        let write_error = |path: &Path, source| AnalyzerError::Write {
            path: path.to_path_buf(),
            source,
        };

        fs::create_dir_all(&dir_path).map_err(|e| {
            error!("Failed to create directory {}: {}", dir_path.display(), e);
            write_error(&dir_path, e)
        })?;
        let file = File::create(&file_path).map_err(|e| {
            error!("Failed to create file {}: {}", file_path.display(), e);
            write_error(&file_path, e)
        })?;

        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer
            .write_all(b"\n")
            .and_then(|_| writer.flush())
            .map_err(|e| write_error(&file_path, e))?;

        info!("Stored {}/{} -> {}", race, key, file_path.display());
        Ok(file_path)
    }

    pub fn get(&self, race: &str, key: &str) -> Option<Value> {
        let path = self.file_path(race, key);
        if !path.exists() {
            debug!("Report {}/{} not found", race, key);
            return None;
        }
        match File::open(&path) {
            Ok(file) => match serde_json::from_reader(BufReader::new(file)) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!("Failed to parse report {}: {}", path.display(), e);
                    None
                }
            },
            Err(e) => {
                warn!("Failed to open report {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Keys stored for a race, sorted
    pub fn list_keys(&self, race: &str) -> Vec<String> {
        let Ok(entries) = fs::read_dir(self.race_dir(race)) else {
            return Vec::new();
        };
        let mut keys: Vec<String> = entries
            .flatten()
            .filter_map(|entry| {
                let name = entry.file_name().to_str()?.to_string();
                let key = name.strip_suffix(".json")?;
                Some(key.replace("__", "/"))
            })
            .collect();
        keys.sort();
        keys
    }

    /// Write a document unless an identical one is already stored.
    /// Returns the path if the file was written.
    pub fn put_if_changed<T: Serialize>(
        &self,
        race: &str,
        key: &str,
        value: &T,
    ) -> Result<Option<PathBuf>, AnalyzerError> {
        let current = serde_json::to_value(value)?;
        if self.get(race, key).as_ref() == Some(&current) {
            debug!("{}/{} unchanged", race, key);
            return Ok(None);
        }
        self.put(race, key, value).map(Some)
    }

    /// Both reports of a race under their standard keys. Returns the
    /// files that were written; unchanged reports are left alone.
    pub fn write_report(&self, report: &RaceReport) -> Result<Vec<PathBuf>, AnalyzerError> {
        let race = report.race();
        let written = [
            self.put_if_changed(race, MARK_PASSINGS_KEY, &report.mark_passings)?,
            self.put_if_changed(race, WIND_KEY, &report.wind)?,
        ];
        Ok(written.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::race_file::{MarkPassingReport, WindReport};
    use serde_json::json;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn report(race: &str) -> RaceReport {
        RaceReport {
            mark_passings: MarkPassingReport {
                race: race.to_string(),
                start_time: None,
                competitors: BTreeMap::new(),
            },
            wind: WindReport {
                race: race.to_string(),
                precise: false,
                estimates: Vec::new(),
            },
        }
    }

    #[test]
    fn test_put_get() {
        let dir = TempDir::new().unwrap();
        let storage = ReportStorage::new(dir.path()).unwrap();
        assert!(storage.get("Race 1", "notes").is_none());

        let path = storage.put("Race 1", "notes", &json!({"wind": "light"})).unwrap();
        assert!(path.starts_with(dir.path()));
        assert!(fs::read_to_string(&path).unwrap().ends_with("}\n"));
        assert_eq!(storage.get("Race 1", "notes"), Some(json!({"wind": "light"})));

        storage.put("Race 1", "notes", &json!({"wind": "strong"})).unwrap();
        assert_eq!(storage.get("Race 1", "notes").unwrap()["wind"], "strong");
    }

    #[test]
    fn test_names_with_slashes() {
        let dir = TempDir::new().unwrap();
        let storage = ReportStorage::new(dir.path()).unwrap();
        storage.put("Kiel/Day 2", "a/b", &1).unwrap();
        assert!(dir.path().join("Kiel__Day 2").join("a__b.json").exists());
        assert_eq!(storage.list_keys("Kiel/Day 2"), vec!["a/b".to_string()]);
        assert!(storage.list_keys("Unknown").is_empty());
    }

    #[test]
    fn test_write_report() {
        let dir = TempDir::new().unwrap();
        let storage = ReportStorage::new(&dir.path().join("out")).unwrap();
        let paths = storage.write_report(&report("Race 7")).unwrap();
        assert_eq!(paths.len(), 2);
        assert_eq!(
            storage.list_keys("Race 7"),
            vec![MARK_PASSINGS_KEY.to_string(), WIND_KEY.to_string()]
        );
        let wind = storage.get("Race 7", WIND_KEY).unwrap();
        assert_eq!(wind["race"], "Race 7");
        assert_eq!(wind["estimates"], json!([]));

        // Rewriting the same report touches nothing
        assert!(storage.write_report(&report("Race 7")).unwrap().is_empty());

        let mut changed = report("Race 7");
        changed.wind.precise = true;
        let paths = storage.write_report(&changed).unwrap();
        assert_eq!(paths, vec![storage.file_path("Race 7", WIND_KEY)]);
        assert_eq!(storage.get("Race 7", WIND_KEY).unwrap()["precise"], true);
    }

    #[test]
    fn test_corrupt_file_reads_as_missing() {
        let dir = TempDir::new().unwrap();
        let storage = ReportStorage::new(dir.path()).unwrap();
        let path = storage.put("Race 1", "wind", &json!({})).unwrap();
        fs::write(&path, "{ truncated").unwrap();
        assert!(storage.get("Race 1", "wind").is_none());
    }
}
