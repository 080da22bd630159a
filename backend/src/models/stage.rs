//! Service stages
//!
//! The pipeline has six fixed stages. Triage and PrimaryCare admit patients by
//! priority; the four procedure stages are FIFO and may be visited more than
//! once by the same patient.

use crate::models::patient::PatientState;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of stages in the pipeline
pub const STAGE_COUNT: usize = 6;

/// One step of the service pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stage {
    Triage,
    PrimaryCare,
    VitalSigns,
    LabTests,
    Imaging,
    Medication,
}

/// Stage name did not match any known stage
#[derive(Debug, Error, PartialEq)]
#[error("Unknown stage: {0}")]
pub struct UnknownStage(pub String);

impl Stage {
    /// All stages in pipeline order
    pub const ALL: [Stage; STAGE_COUNT] = [
        Stage::Triage,
        Stage::PrimaryCare,
        Stage::VitalSigns,
        Stage::LabTests,
        Stage::Imaging,
        Stage::Medication,
    ];

    /// Repeatable procedure stages in routing order
    pub const PROCEDURES: [Stage; 4] = [
        Stage::VitalSigns,
        Stage::LabTests,
        Stage::Imaging,
        Stage::Medication,
    ];

    /// Position in the pipeline, used to index per-stage tables
    pub fn index(self) -> usize {
        match self {
            Stage::Triage => 0,
            Stage::PrimaryCare => 1,
            Stage::VitalSigns => 2,
            Stage::LabTests => 3,
            Stage::Imaging => 4,
            Stage::Medication => 5,
        }
    }

    /// Human-readable stage name
    pub fn name(self) -> &'static str {
        match self {
            Stage::Triage => "Triage",
            Stage::PrimaryCare => "PrimaryCare",
            Stage::VitalSigns => "VitalSigns",
            Stage::LabTests => "LabTests",
            Stage::Imaging => "Imaging",
            Stage::Medication => "Medication",
        }
    }

    /// Whether the stage admits patients by priority class
    pub fn is_priority_ordered(self) -> bool {
        matches!(self, Stage::Triage | Stage::PrimaryCare)
    }

    /// Whether a patient may need this stage more than once
    pub fn is_repeatable(self) -> bool {
        !self.is_priority_ordered()
    }

    /// State of a patient waiting for this stage
    pub fn queued_state(self) -> PatientState {
        PatientState::Queued(self)
    }

    /// State of a patient being served at this stage
    pub fn in_service_state(self) -> PatientState {
        PatientState::InService(self)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Stage {
    type Err = UnknownStage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .iter()
            .copied()
            .find(|stage| stage.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownStage(s.to_string()))
    }
}

/// Per-stage configuration: how long one service takes and how many units serve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    /// Duration of one service, in hours
    pub mean_service_hours: f64,

    /// Number of units that can serve in parallel
    pub unit_count: usize,
}

impl StageConfig {
    pub fn new(mean_service_hours: f64, unit_count: usize) -> Self {
        Self {
            mean_service_hours,
            unit_count,
        }
    }
}
