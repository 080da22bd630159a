//! Unit pools
//!
//! Each stage owns a fixed number of units. A unit is reserved for the whole
//! service duration when a patient occupies it; there is no release event.
//! A unit is available at time `t` iff it is not busy or its reservation has
//! run out (`t >= busy_until`), so every caller re-checks availability instead
//! of trusting a cached flag.
//!
//! # Critical Invariants
//!
//! - **No Overlap**: the occupancy intervals `[start, end)` of one unit never overlap
//! - **Lowest Index Wins**: `first_available_unit` scans from unit 0
//!
//! # Idle Time
//!
//! Idle time is counted from the pool's start time, not from hour 0. The
//! simulation starts every pool at the earliest arrival (see
//! [`ResourcePool::starting_at`]), so the hours before the first patient are
//! never idle.

use crate::core::SimTime;
use crate::models::patient::{PatientHandle, PatientState};
use crate::models::stage::{Stage, StageConfig};
use serde::Serialize;
use thiserror::Error;

/// Errors raised when occupying a unit
#[derive(Debug, Error, PartialEq)]
pub enum ResourceError {
    #[error("{stage} has no unit {index} (unit count {unit_count})")]
    UnitOutOfRange {
        stage: Stage,
        index: usize,
        unit_count: usize,
    },

    #[error("{stage} unit {index} is busy until {busy_until}")]
    UnitBusy {
        stage: Stage,
        index: usize,
        busy_until: SimTime,
    },
}

/// One reservation of a unit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Occupancy {
    pub patient: PatientHandle,
    pub patient_id: u32,
    pub start: SimTime,
    pub end: SimTime,
    /// Patient state just before taking the unit
    pub prior_state: PatientState,
}

/// A single server within a stage
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResourceUnit {
    busy: bool,
    busy_until: SimTime,
    occupant: Option<PatientHandle>,
    occupant_id: Option<u32>,
    prior_state: Option<PatientState>,
    busy_time: SimTime,
    idle_time: SimTime,
    /// Idle time has been accrued up to here
    accounted_until: SimTime,
    occupancies: Vec<Occupancy>,
}

impl ResourceUnit {
    fn starting_at(start: SimTime) -> Self {
        Self {
            accounted_until: start,
            ..Self::default()
        }
    }

    /// Whether a new patient may take the unit at `time`
    pub fn is_available(&self, time: SimTime) -> bool {
        !self.busy || time >= self.busy_until
    }

    /// Accrue idle time up to `time`. Repeat calls at the same time are no-ops.
    fn settle_idle(&mut self, time: SimTime) {
        if time <= self.accounted_until {
            return;
        }
        let idle_from = if self.busy {
            self.accounted_until.max(self.busy_until)
        } else {
            self.accounted_until
        };
        if time > idle_from {
            self.idle_time += time - idle_from;
        }
        self.accounted_until = time;
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn busy_until(&self) -> SimTime {
        self.busy_until
    }

    /// Most recent occupant, kept after the reservation runs out
    pub fn occupant(&self) -> Option<PatientHandle> {
        self.occupant
    }

    pub fn occupant_id(&self) -> Option<u32> {
        self.occupant_id
    }

    pub fn prior_state(&self) -> Option<PatientState> {
        self.prior_state
    }

    /// Sum of all reservations
    pub fn busy_time(&self) -> SimTime {
        self.busy_time
    }

    pub fn idle_time(&self) -> SimTime {
        self.idle_time
    }

    pub fn occupancies(&self) -> &[Occupancy] {
        &self.occupancies
    }
}

/// All units of one stage
///
/// # Example
///
/// ```rust
/// use hospital_sim_core::models::{PatientHandle, PatientState, Stage, StageConfig};
/// use hospital_sim_core::resources::ResourcePool;
///
/// let mut pool = ResourcePool::new(Stage::LabTests, StageConfig::new(0.5, 1));
/// assert_eq!(pool.first_available_unit(1.0), Some(0));
///
/// let until = pool
///     .occupy(0, 1.0, PatientHandle(0), 7, PatientState::Queued(Stage::LabTests))
///     .unwrap();
/// assert_eq!(until, 1.5);
/// assert!(!pool.has_available_unit(1.2));
/// assert!(pool.has_available_unit(1.5));
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ResourcePool {
    stage: Stage,
    mean_service_hours: f64,
    units: Vec<ResourceUnit>,
}

impl ResourcePool {
    pub fn new(stage: Stage, config: StageConfig) -> Self {
        Self::starting_at(stage, config, 0.0)
    }

    /// Pool whose idle accounting begins at `start`
    pub fn starting_at(stage: Stage, config: StageConfig, start: SimTime) -> Self {
        Self {
            stage,
            mean_service_hours: config.mean_service_hours,
            units: vec![ResourceUnit::starting_at(start); config.unit_count],
        }
    }

    /// Whether any unit is available at `time`
    pub fn has_available_unit(&self, time: SimTime) -> bool {
        self.units.iter().any(|u| u.is_available(time))
    }

    /// Lowest-index unit available at `time`
    pub fn first_available_unit(&self, time: SimTime) -> Option<usize> {
        self.units.iter().position(|u| u.is_available(time))
    }

    /// Number of units available at `time`
    pub fn available_units(&self, time: SimTime) -> usize {
        self.units.iter().filter(|u| u.is_available(time)).count()
    }

    /// Reserve unit `index` for one service starting at `time`
    ///
    /// Re-checks availability, so a stale index fails with `UnitBusy` and
    /// leaves the unit untouched. Returns the end of the reservation.
    pub fn occupy(
        &mut self,
        index: usize,
        time: SimTime,
        patient: PatientHandle,
        patient_id: u32,
        prior_state: PatientState,
    ) -> Result<SimTime, ResourceError> {
        let stage = self.stage;
        let unit_count = self.units.len();
        let duration = self.mean_service_hours;
        let unit = self
            .units
            .get_mut(index)
            .ok_or(ResourceError::UnitOutOfRange {
                stage,
                index,
                unit_count,
            })?;

        if !unit.is_available(time) {
            return Err(ResourceError::UnitBusy {
                stage,
                index,
                busy_until: unit.busy_until,
            });
        }

        unit.settle_idle(time);
        let end = time + duration;
        unit.busy = true;
        unit.busy_until = end;
        unit.occupant = Some(patient);
        unit.occupant_id = Some(patient_id);
        unit.prior_state = Some(prior_state);
        unit.busy_time += duration;
        unit.occupancies.push(Occupancy {
            patient,
            patient_id,
            start: time,
            end,
            prior_state,
        });
        Ok(end)
    }

    /// Accrue idle time of every unit up to `time`
    ///
    /// Statistics only; never changes availability. Calling it again at the
    /// same timestamp does not double-count.
    pub fn update_idle_accounting(&mut self, time: SimTime) {
        for unit in &mut self.units {
            unit.settle_idle(time);
        }
    }

    /// Whether unit `index` holds a reservation covering `time`
    pub fn is_unit_busy(&self, index: usize, time: SimTime) -> bool {
        self.units
            .get(index)
            .map(|u| !u.is_available(time))
            .unwrap_or(false)
    }

    /// Unit whose current reservation belongs to `patient`
    pub fn unit_for_patient(&self, patient: PatientHandle, time: SimTime) -> Option<usize> {
        self.units
            .iter()
            .position(|u| u.occupant == Some(patient) && !u.is_available(time))
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn mean_service_hours(&self) -> f64 {
        self.mean_service_hours
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    pub fn unit(&self, index: usize) -> Option<&ResourceUnit> {
        self.units.get(index)
    }

    pub fn units(&self) -> &[ResourceUnit] {
        &self.units
    }

    pub fn total_busy_time(&self) -> SimTime {
        self.units.iter().map(|u| u.busy_time).sum()
    }

    pub fn total_idle_time(&self) -> SimTime {
        self.units.iter().map(|u| u.idle_time).sum()
    }
}
