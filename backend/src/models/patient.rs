//! Patient model
//!
//! A patient moves through the pipeline as a small state machine:
//!
//! ```text
//! NotArrived → Queued(Triage) → InService(Triage) → Queued(PrimaryCare) → ...
//!                                                 ... → Discharged
//! ```
//!
//! Every transition closes the currently open history interval and opens a
//! new one, so `total_wait + total_service` always covers the time between
//! the first queue entry and the last transition.
//!
//! Discharged is terminal. Any further transition is a programming error and
//! is reported as `PatientError::AlreadyDischarged`.

use crate::core::SimTime;
use crate::models::stage::Stage;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Stable index of a patient inside the simulation's patient arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PatientHandle(pub usize);

impl fmt::Display for PatientHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a patient currently is in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatientState {
    /// Arrival event not yet processed
    NotArrived,

    /// Waiting in the queue of a stage
    Queued(Stage),

    /// Occupying a unit of a stage
    InService(Stage),

    /// Left the hospital
    Discharged,
}

impl fmt::Display for PatientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatientState::NotArrived => f.write_str("NotArrived"),
            PatientState::Queued(stage) => write!(f, "Queued({})", stage),
            PatientState::InService(stage) => write!(f, "InService({})", stage),
            PatientState::Discharged => f.write_str("Discharged"),
        }
    }
}

/// Errors raised by invalid patient transitions
#[derive(Debug, Error, PartialEq)]
pub enum PatientError {
    #[error("Patient {id} is already discharged")]
    AlreadyDischarged { id: u32 },

    #[error("Patient {id} cannot {action} at {stage} while {state}")]
    InvalidTransition {
        id: u32,
        action: &'static str,
        stage: Stage,
        state: PatientState,
    },

    #[error("Patient {id} transition at {time} precedes last transition at {last}")]
    TimeWentBackwards { id: u32, time: SimTime, last: SimTime },
}

/// Remaining repetitions of each procedure stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureCounts {
    pub vital_signs: u32,
    pub lab_tests: u32,
    pub imaging: u32,
    pub medication: u32,
}

impl ProcedureCounts {
    pub fn new(vital_signs: u32, lab_tests: u32, imaging: u32, medication: u32) -> Self {
        Self {
            vital_signs,
            lab_tests,
            imaging,
            medication,
        }
    }

    /// Remaining count for a stage; priority-ordered stages always report 0
    pub fn get(&self, stage: Stage) -> u32 {
        match stage {
            Stage::VitalSigns => self.vital_signs,
            Stage::LabTests => self.lab_tests,
            Stage::Imaging => self.imaging,
            Stage::Medication => self.medication,
            Stage::Triage | Stage::PrimaryCare => 0,
        }
    }

    /// Decrement the count of a repeatable stage, saturating at zero
    pub fn decrement(&mut self, stage: Stage) {
        let slot = match stage {
            Stage::VitalSigns => &mut self.vital_signs,
            Stage::LabTests => &mut self.lab_tests,
            Stage::Imaging => &mut self.imaging,
            Stage::Medication => &mut self.medication,
            Stage::Triage | Stage::PrimaryCare => return,
        };
        *slot = slot.saturating_sub(1);
    }

    /// Sum of all remaining procedures
    pub fn total(&self) -> u32 {
        self.vital_signs + self.lab_tests + self.imaging + self.medication
    }
}

/// Calendar date and hour of arrival, as recorded on the patient chart
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrivalDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
}

/// One interval of a patient's stay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub stage: Stage,
    pub start: SimTime,
    /// `None` while the interval is still open
    pub end: Option<SimTime>,
    /// `true` for time spent in a queue, `false` for time in service
    pub waiting: bool,
}

impl HistoryEntry {
    pub fn duration(&self) -> Option<SimTime> {
        self.end.map(|end| end - self.start)
    }
}

/// Where a patient goes after finishing a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Join the queue of the given stage
    Queue(Stage),
    /// Leave the hospital
    Discharge,
}

/// A patient flowing through the hospital
///
/// # Example
/// ```
/// use hospital_sim_core::models::patient::{Patient, PatientState, ProcedureCounts};
/// use hospital_sim_core::models::stage::Stage;
///
/// let mut patient = Patient::new(7, 8.0)
///     .with_priority(2)
///     .with_procedures(ProcedureCounts::new(0, 1, 0, 0));
///
/// patient.enter_queue(Stage::Triage, 8.0).unwrap();
/// patient.begin_service(Stage::Triage, 8.25).unwrap();
/// assert_eq!(patient.state(), PatientState::InService(Stage::Triage));
/// assert_eq!(patient.total_wait_time(), 0.25);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    /// Identifier from the patient chart
    id: u32,

    /// Discharge straight after primary care
    discharge_after_primary_care: bool,

    /// Chart date of arrival
    arrival_date: ArrivalDate,

    /// Priority class (higher = more urgent)
    priority: u8,

    /// Procedures still required
    required: ProcedureCounts,

    /// Current state
    state: PatientState,

    /// Scheduled arrival timestamp
    arrival_time: SimTime,

    /// Time of the most recent transition
    last_transition: SimTime,

    /// Sum of closed waiting intervals
    total_wait: SimTime,

    /// Sum of closed service intervals
    total_service: SimTime,

    /// Set on discharge
    departure_time: Option<SimTime>,

    /// All waiting and service intervals, in order
    history: Vec<HistoryEntry>,
}

impl Patient {
    /// Create a patient that will arrive at `arrival_time`
    pub fn new(id: u32, arrival_time: SimTime) -> Self {
        Self {
            id,
            discharge_after_primary_care: false,
            arrival_date: ArrivalDate::default(),
            priority: 0,
            required: ProcedureCounts::default(),
            state: PatientState::NotArrived,
            arrival_time,
            last_transition: arrival_time,
            total_wait: 0.0,
            total_service: 0.0,
            departure_time: None,
            history: Vec::new(),
        }
    }

    /// Set the priority class
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    /// Set the procedures still required
    pub fn with_procedures(mut self, required: ProcedureCounts) -> Self {
        self.required = required;
        self
    }

    /// Set whether the patient leaves right after primary care
    pub fn with_discharge_after_primary_care(mut self, discharge: bool) -> Self {
        self.discharge_after_primary_care = discharge;
        self
    }

    /// Set the chart date of arrival
    pub fn with_arrival_date(mut self, date: ArrivalDate) -> Self {
        self.arrival_date = date;
        self
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Join the queue of `stage`, closing any open service interval
    pub fn enter_queue(&mut self, stage: Stage, time: SimTime) -> Result<(), PatientError> {
        self.ensure_active()?;
        if matches!(self.state, PatientState::Queued(_)) {
            return Err(self.invalid("enter queue", stage));
        }
        self.close_open_interval(time)?;
        self.open_interval(stage, time, true);
        self.state = stage.queued_state();
        Ok(())
    }

    /// Start service at `stage`, closing the open waiting interval
    pub fn begin_service(&mut self, stage: Stage, time: SimTime) -> Result<(), PatientError> {
        self.ensure_active()?;
        if self.state != stage.queued_state() {
            return Err(self.invalid("begin service", stage));
        }
        self.close_open_interval(time)?;
        self.open_interval(stage, time, false);
        self.state = stage.in_service_state();
        Ok(())
    }

    /// Finish service at `stage`
    ///
    /// Decrements the remaining count for repeatable stages. The service
    /// interval stays open until the next `enter_queue` or `discharge`.
    pub fn complete_stage(&mut self, stage: Stage, time: SimTime) -> Result<(), PatientError> {
        self.ensure_active()?;
        if self.state != stage.in_service_state() {
            return Err(self.invalid("complete", stage));
        }
        if time < self.last_transition {
            return Err(PatientError::TimeWentBackwards {
                id: self.id,
                time,
                last: self.last_transition,
            });
        }
        if stage.is_repeatable() {
            self.required.decrement(stage);
        }
        Ok(())
    }

    /// Leave the hospital. Terminal.
    pub fn discharge(&mut self, time: SimTime) -> Result<(), PatientError> {
        self.ensure_active()?;
        self.close_open_interval(time)?;
        self.departure_time = Some(time);
        self.state = PatientState::Discharged;
        Ok(())
    }

    /// Decide where the patient goes after completing `completed`
    ///
    /// - Triage always leads to PrimaryCare.
    /// - After PrimaryCare the patient is discharged if flagged for it,
    ///   otherwise goes to the first procedure still required.
    /// - After a procedure the patient repeats it while it is still
    ///   required, then moves to the next required procedure.
    /// - With nothing left the patient is discharged.
    pub fn route_after(&self, completed: Stage) -> Route {
        match completed {
            Stage::Triage => Route::Queue(Stage::PrimaryCare),
            Stage::PrimaryCare if self.discharge_after_primary_care => Route::Discharge,
            Stage::PrimaryCare => self.first_required_procedure(),
            procedure if self.needs_stage(procedure) => Route::Queue(procedure),
            _ => self.first_required_procedure(),
        }
    }

    fn first_required_procedure(&self) -> Route {
        Stage::PROCEDURES
            .into_iter()
            .find(|stage| self.needs_stage(*stage))
            .map(Route::Queue)
            .unwrap_or(Route::Discharge)
    }

    fn ensure_active(&self) -> Result<(), PatientError> {
        if self.state == PatientState::Discharged {
            return Err(PatientError::AlreadyDischarged { id: self.id });
        }
        Ok(())
    }

    fn invalid(&self, action: &'static str, stage: Stage) -> PatientError {
        PatientError::InvalidTransition {
            id: self.id,
            action,
            stage,
            state: self.state,
        }
    }

    fn open_interval(&mut self, stage: Stage, time: SimTime, waiting: bool) {
        self.history.push(HistoryEntry {
            stage,
            start: time,
            end: None,
            waiting,
        });
        self.last_transition = time;
    }

    fn close_open_interval(&mut self, time: SimTime) -> Result<(), PatientError> {
        if time < self.last_transition {
            return Err(PatientError::TimeWentBackwards {
                id: self.id,
                time,
                last: self.last_transition,
            });
        }
        if let Some(entry) = self.history.last_mut() {
            if entry.end.is_none() {
                entry.end = Some(time);
                let elapsed = time - entry.start;
                if entry.waiting {
                    self.total_wait += elapsed;
                } else {
                    self.total_service += elapsed;
                }
            }
        }
        self.last_transition = time;
        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Whether another visit to `stage` is still required
    pub fn needs_stage(&self, stage: Stage) -> bool {
        self.required.get(stage) > 0
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn priority(&self) -> u8 {
        self.priority
    }

    pub fn state(&self) -> PatientState {
        self.state
    }

    pub fn is_discharged(&self) -> bool {
        self.state == PatientState::Discharged
    }

    pub fn discharge_after_primary_care(&self) -> bool {
        self.discharge_after_primary_care
    }

    pub fn arrival_date(&self) -> ArrivalDate {
        self.arrival_date
    }

    pub fn arrival_time(&self) -> SimTime {
        self.arrival_time
    }

    pub fn required(&self) -> ProcedureCounts {
        self.required
    }

    pub fn total_wait_time(&self) -> SimTime {
        self.total_wait
    }

    pub fn total_service_time(&self) -> SimTime {
        self.total_service
    }

    /// Wait and service totals as of `time`, counting the open interval
    /// (if any) as running until then
    pub fn totals_at(&self, time: SimTime) -> (SimTime, SimTime) {
        let (mut wait, mut service) = (self.total_wait, self.total_service);
        if let Some(entry) = self.history.last().filter(|e| e.end.is_none()) {
            let elapsed = (time - entry.start).max(0.0);
            if entry.waiting {
                wait += elapsed;
            } else {
                service += elapsed;
            }
        }
        (wait, service)
    }

    pub fn departure_time(&self) -> Option<SimTime> {
        self.departure_time
    }

    /// Departure minus arrival, once discharged
    pub fn length_of_stay(&self) -> Option<SimTime> {
        self.departure_time.map(|departure| departure - self.arrival_time)
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }
}
