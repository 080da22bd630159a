//! Hospital configuration and input loading
//!
//! The plain input format is a whitespace-separated token stream:
//!
//! ```text
//! <duration> <units>      x6, in pipeline order
//! <patient count>
//! <id> <discharge> <year> <month> <day> <hour> <priority> <vital> <lab> <imaging> <medication>
//! ...
//! ```
//!
//! Files with a `.json` extension hold a serialized [`HospitalConfig`] instead.
//!
//! # Example
//!
//! ```rust
//! use hospital_sim_core::config::parse_text;
//!
//! let input = "0.1 1  0.2 1  0.5 1  0.3 1  0.5 1  0.5 1
//!              1
//!              7 0 2017 3 21 8 1 0 1 0 0";
//! let config = parse_text(input).unwrap();
//! assert_eq!(config.stages.len(), 6);
//! assert_eq!(config.patients[0].id, 7);
//! assert_eq!(config.patients[0].arrival_time(), 8.0);
//! ```

use crate::core::SimTime;
use crate::models::patient::{ArrivalDate, Patient, ProcedureCounts};
use crate::models::stage::{Stage, StageConfig, STAGE_COUNT};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while loading or validating a configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Input ended while reading {field}")]
    UnexpectedEof { field: &'static str },

    #[error("Invalid value {token:?} for {field}")]
    InvalidToken { field: &'static str, token: String },

    #[error("Invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// One patient chart from the input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub id: u32,
    pub discharge_after_primary_care: bool,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    /// Hour of arrival, also the arrival timestamp
    pub hour: u32,
    pub priority: u8,
    #[serde(default)]
    pub vital_signs: u32,
    #[serde(default)]
    pub lab_tests: u32,
    #[serde(default)]
    pub imaging: u32,
    #[serde(default)]
    pub medication: u32,
}

impl PatientRecord {
    pub fn arrival_time(&self) -> SimTime {
        self.hour as SimTime
    }

    pub fn arrival_date(&self) -> ArrivalDate {
        ArrivalDate {
            year: self.year,
            month: self.month,
            day: self.day,
            hour: self.hour,
        }
    }

    /// Build the patient this chart describes
    pub fn to_patient(&self) -> Patient {
        Patient::new(self.id, self.arrival_time())
            .with_priority(self.priority)
            .with_discharge_after_primary_care(self.discharge_after_primary_care)
            .with_arrival_date(self.arrival_date())
            .with_procedures(ProcedureCounts::new(
                self.vital_signs,
                self.lab_tests,
                self.imaging,
                self.medication,
            ))
    }
}

/// Complete input of one simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HospitalConfig {
    /// One entry per stage, in pipeline order
    pub stages: Vec<StageConfig>,

    /// Patients in input order
    pub patients: Vec<PatientRecord>,
}

impl HospitalConfig {
    /// Check the configuration before a run
    ///
    /// Zero units for a stage is accepted; patients that need that stage
    /// simply never leave its queue.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stages.len() != STAGE_COUNT {
            return Err(ConfigError::Invalid(format!(
                "expected {} stages, found {}",
                STAGE_COUNT,
                self.stages.len()
            )));
        }

        for (stage, config) in Stage::ALL.iter().zip(&self.stages) {
            if !config.mean_service_hours.is_finite() || config.mean_service_hours < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{} service duration must be a non-negative number, got {}",
                    stage, config.mean_service_hours
                )));
            }
        }

        let mut seen = HashSet::new();
        for patient in &self.patients {
            if !seen.insert(patient.id) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate patient id {}",
                    patient.id
                )));
            }
            if patient.hour >= 24 {
                return Err(ConfigError::Invalid(format!(
                    "patient {} arrives at hour {}, expected 0..24",
                    patient.id, patient.hour
                )));
            }
        }

        Ok(())
    }

    pub fn stage(&self, stage: Stage) -> Option<&StageConfig> {
        self.stages.get(stage.index())
    }
}

/// Cursor over the whitespace-separated tokens of the plain format
struct Tokens<'a> {
    inner: std::str::SplitWhitespace<'a>,
}

impl<'a> Tokens<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            inner: input.split_whitespace(),
        }
    }

    fn next<T: FromStr>(&mut self, field: &'static str) -> Result<T, ConfigError> {
        let token = self
            .inner
            .next()
            .ok_or(ConfigError::UnexpectedEof { field })?;
        token.parse().map_err(|_| ConfigError::InvalidToken {
            field,
            token: token.to_string(),
        })
    }
}

/// Parse the plain whitespace-separated format
///
/// Any nonzero discharge flag means "discharge after primary care". Tokens
/// after the last declared patient are ignored.
pub fn parse_text(input: &str) -> Result<HospitalConfig, ConfigError> {
    let mut tokens = Tokens::new(input);

    let mut stages = Vec::with_capacity(STAGE_COUNT);
    for _ in 0..STAGE_COUNT {
        let mean_service_hours = tokens.next("stage duration")?;
        let unit_count = tokens.next("stage unit count")?;
        stages.push(StageConfig::new(mean_service_hours, unit_count));
    }

    let count: usize = tokens.next("patient count")?;
    let mut patients = Vec::with_capacity(count);
    for _ in 0..count {
        let id = tokens.next("patient id")?;
        let discharge: i64 = tokens.next("discharge flag")?;
        patients.push(PatientRecord {
            id,
            discharge_after_primary_care: discharge != 0,
            year: tokens.next("year")?,
            month: tokens.next("month")?,
            day: tokens.next("day")?,
            hour: tokens.next("hour")?,
            priority: tokens.next("priority")?,
            vital_signs: tokens.next("vital signs count")?,
            lab_tests: tokens.next("lab tests count")?,
            imaging: tokens.next("imaging count")?,
            medication: tokens.next("medication count")?,
        });
    }

    Ok(HospitalConfig { stages, patients })
}

/// Read and validate a configuration file
pub fn load(path: impl AsRef<Path>) -> Result<HospitalConfig, ConfigError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let config: HospitalConfig = if is_json {
        serde_json::from_str(&contents)?
    } else {
        parse_text(&contents)?
    };

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAGES: &str = "0.1 1 0.2 1 0.5 2 0.3 1 0.5 1 0.5 1";

    #[test]
    fn test_parse_reads_stages_in_order() {
        let config = parse_text(&format!("{} 0", STAGES)).unwrap();
        assert_eq!(config.stages[2], StageConfig::new(0.5, 2));
        assert!(config.patients.is_empty());
    }

    #[test]
    fn test_nonzero_discharge_flag_is_true() {
        let input = format!("{} 1  3 2 2017 3 21 9 2 1 0 0 4", STAGES);
        let record = &parse_text(&input).unwrap().patients[0];
        assert!(record.discharge_after_primary_care);
        assert_eq!(record.medication, 4);
        assert_eq!(record.priority, 2);
    }

    #[test]
    fn test_truncated_input_names_the_field() {
        let input = format!("{} 2  1 0 2017 3 21 9 2 1 0 0 0", STAGES);
        assert!(matches!(
            parse_text(&input),
            Err(ConfigError::UnexpectedEof { field: "patient id" })
        ));
    }

    #[test]
    fn test_bad_token_is_reported() {
        match parse_text("0.1 one") {
            Err(ConfigError::InvalidToken { field, token }) => {
                assert_eq!(field, "stage unit count");
                assert_eq!(token, "one");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_duplicate_ids() {
        let input = format!(
            "{} 2  1 0 2017 3 21 9 2 1 0 0 0  1 0 2017 3 21 10 2 1 0 0 0",
            STAGES
        );
        let config = parse_text(&input).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_accepts_zero_units() {
        let config = parse_text("0.1 1 0.2 1 0.5 0 0.3 1 0.5 1 0.5 1 0").unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_record_builds_patient() {
        let input = format!("{} 1  9 0 2017 3 21 14 3 0 2 0 0", STAGES);
        let patient = parse_text(&input).unwrap().patients[0].to_patient();
        assert_eq!(patient.id(), 9);
        assert_eq!(patient.priority(), 3);
        assert_eq!(patient.arrival_time(), 14.0);
        assert_eq!(patient.required().get(Stage::LabTests), 2);
    }
}
