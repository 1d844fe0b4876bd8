//! Loads a normalized schedule input document (members, shift patterns,
//! coverage requirements, rule configs, scheduling period, bucket size,
//! fair-distribution flag, week-start day) from JSON or TOML, and
//! serializes/deserializes the solver wire documents that cross the
//! external solver boundary.
//!
//! The surface DSL itself (parsing a human-authored schedule file into
//! this normalized record set) is an external collaborator's concern; this
//! crate only carries the `serde` plumbing on the normalized side of that
//! boundary.

pub mod rule_config;

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shiftsat_compiler::BuilderConfig;
use shiftsat_core::model::{CoverageRequirement, Day, Member, ShiftPattern};
use shiftsat_core::wire::{SolverRequest, SolverResponse};

pub use rule_config::RuleConfig;

/// I/O and (de)serialization error.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to parse TOML: {0}")]
    TomlDe(#[from] toml::de::Error),
    #[error("failed to serialize TOML: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("unrecognized file extension {0:?}; expected .json or .toml")]
    UnknownExtension(String),
}

/// A day-of-week name as used in `weekStartsOn`.
fn parse_weekday(name: &str) -> Option<chrono::Weekday> {
    use chrono::Weekday::*;
    match name.to_lowercase().as_str() {
        "monday" => Some(Mon),
        "tuesday" => Some(Tue),
        "wednesday" => Some(Wed),
        "thursday" => Some(Thu),
        "friday" => Some(Fri),
        "saturday" => Some(Sat),
        "sunday" => Some(Sun),
        _ => None,
    }
}

/// The normalized, serde-ready record set a schedule author (or the
/// external surface DSL) produces for this compiler to consume.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedScheduleInput {
    pub members: Vec<Member>,
    pub patterns: Vec<ShiftPattern>,
    pub coverage: Vec<CoverageRequirement>,
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
    pub schedule_start: NaiveDate,
    pub schedule_end: NaiveDate,
    #[serde(default = "default_bucket_minutes")]
    pub bucket_minutes: u32,
    #[serde(default = "default_fair_distribution")]
    pub fair_distribution: bool,
    #[serde(default = "default_week_starts_on")]
    pub week_starts_on: String,
}

fn default_bucket_minutes() -> u32 {
    15
}

fn default_fair_distribution() -> bool {
    true
}

fn default_week_starts_on() -> String {
    "monday".to_string()
}

impl NormalizedScheduleInput {
    /// Expands `[schedule_start, schedule_end]` into the day horizon and
    /// converts every rule config into a live `Rule`, producing the
    /// configuration [`shiftsat_compiler::ModelBuilder::new`] accepts.
    pub fn into_builder_config(self) -> BuilderConfig {
        let mut days = Vec::new();
        let mut date = self.schedule_start;
        let mut index = 0_i64;
        while date <= self.schedule_end {
            days.push(Day { index, date });
            date += chrono::Duration::days(1);
            index += 1;
        }

        let week_starts_on = parse_weekday(&self.week_starts_on).unwrap_or(chrono::Weekday::Mon);

        BuilderConfig {
            members: self.members,
            patterns: self.patterns,
            days,
            coverage: self.coverage,
            rules: self.rules.into_iter().map(RuleConfig::into_rule).collect(),
            bucket_minutes: self.bucket_minutes,
            fair_distribution: self.fair_distribution,
            week_starts_on,
        }
    }
}

fn read_to_string(path: &Path) -> Result<String, IoError> {
    std::fs::read_to_string(path).map_err(|source| IoError::Read {
        path: path.display().to_string(),
        source,
    })
}

fn write_string(path: &Path, contents: &str) -> Result<(), IoError> {
    std::fs::write(path, contents).map_err(|source| IoError::Write {
        path: path.display().to_string(),
        source,
    })
}

/// Loads a [`NormalizedScheduleInput`] from `path`, dispatching on the
/// `.json`/`.toml` extension.
pub fn load_schedule_input(path: &Path) -> Result<NormalizedScheduleInput, IoError> {
    let contents = read_to_string(path)?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Ok(serde_json::from_str(&contents)?),
        Some("toml") => Ok(toml::from_str(&contents)?),
        other => Err(IoError::UnknownExtension(
            other.unwrap_or_default().to_string(),
        )),
    }
}

/// Serializes a [`SolverRequest`] as pretty JSON to `path`.
pub fn save_solver_request(request: &SolverRequest, path: &Path) -> Result<(), IoError> {
    let json = serde_json::to_string_pretty(request)?;
    write_string(path, &json)
}

/// Loads a [`SolverResponse`] document, always JSON (the wire format the
/// external solver produces).
pub fn load_solver_response(path: &Path) -> Result<SolverResponse, IoError> {
    let contents = read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shiftsat_core::model::{Priority, Qualifier};
    use std::io::Write;

    fn sample_json() -> &'static str {
        r#"{
            "members": [{"id": "alice", "roles": ["nurse"]}],
            "patterns": [{"id": "day", "start_hour": 8, "start_minute": 0, "end_hour": 16, "end_minute": 0}],
            "coverage": [{
                "day": "2024-02-05",
                "start_minutes": 480,
                "end_minutes_raw": 960,
                "target": 1,
                "priority": "MANDATORY",
                "qualifier": {"kind": "roles", "roles": ["nurse"]}
            }],
            "rules": [{"type": "max_hours_day", "members": {"kind": "none"}, "days": {"kind": "none"}, "max_hours": 8.0}],
            "scheduleStart": "2024-02-05",
            "scheduleEnd": "2024-02-06"
        }"#
    }

    #[test]
    fn loads_schedule_input_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schedule.json");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(sample_json().as_bytes()).unwrap();

        let input = load_schedule_input(&path).unwrap();
        assert_eq!(input.members.len(), 1);
        assert_eq!(input.rules.len(), 1);
        assert_eq!(input.bucket_minutes, 15);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schedule.yaml");
        std::fs::write(&path, "members: []").unwrap();
        assert!(matches!(
            load_schedule_input(&path),
            Err(IoError::UnknownExtension(_))
        ));
    }

    #[test]
    fn into_builder_config_expands_day_horizon() {
        let input = NormalizedScheduleInput {
            members: vec![],
            patterns: vec![],
            coverage: vec![],
            rules: vec![],
            schedule_start: NaiveDate::from_ymd_opt(2024, 2, 5).unwrap(),
            schedule_end: NaiveDate::from_ymd_opt(2024, 2, 7).unwrap(),
            bucket_minutes: 15,
            fair_distribution: true,
            week_starts_on: "monday".to_string(),
        };
        let cfg = input.into_builder_config();
        assert_eq!(cfg.days.len(), 3);
    }

    #[test]
    fn solver_request_round_trips_through_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("request.json");
        let request = SolverRequest::default();
        save_solver_request(&request, &path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        let back: SolverRequest = serde_json::from_str(&contents).unwrap();
        assert_eq!(back.variables.len(), 0);
    }

    #[test]
    fn coverage_qualifier_matches_expected_priority() {
        let input: NormalizedScheduleInput = serde_json::from_str(sample_json()).unwrap();
        assert_eq!(input.coverage[0].priority, Priority::Mandatory);
        assert!(matches!(input.coverage[0].qualifier, Qualifier::Roles { .. }));
    }
}
