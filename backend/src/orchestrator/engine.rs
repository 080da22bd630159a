//! Simulation Engine
//!
//! Main event loop integrating all components:
//! - Event scheduling (time-ordered min-heap)
//! - Stage queues (priority-ordered for triage and primary care)
//! - Unit pools (reservation-based availability)
//! - Patient state machine (wait/service accounting, routing)
//! - Event logging (complete simulation history)
//!
//! # Architecture
//!
//! ```text
//! While events remain:
//! 1. Pop the earliest event, advancing the clock
//! 2. Dispatch:
//!    - Arrival:    join the triage queue, then sweep
//!    - StageStart: take a unit and schedule the StageEnd, or requeue
//!    - StageEnd:   route to the next queue or discharge, then sweep
//! 3. Accrue idle time on every unit
//! ```
//!
//! The sweep ("opportunistic admission") walks the stages in pipeline order
//! and, for each, dequeues as many patients as there are available units not
//! already promised to a pending StageStart. Each admitted patient gets a
//! StageStart at the current instant.
//!
//! # Critical Invariants
//!
//! 1. **Monotonic Clock**: events are processed in non-decreasing time order
//! 2. **Single Queue**: a patient is in at most one queue at any instant
//! 3. **No Overbooking**: a sweep never promises more starts than free units
//! 4. **Stale Starts**: a StageStart whose patient is no longer queued for
//!    that stage is ignored
//!
//! # Example
//!
//! ```rust
//! use hospital_sim_core::config::parse_text;
//! use hospital_sim_core::orchestrator::Simulation;
//!
//! let config = parse_text(
//!     "0.1 1  0.2 1  0.5 1  0.3 1  0.5 1  0.5 1
//!      1
//!      1 0 2017 3 21 8 1 0 1 0 0",
//! )
//! .unwrap();
//!
//! let mut sim = Simulation::new(&config).unwrap();
//! let summary = sim.run().unwrap();
//!
//! assert_eq!(summary.discharged, 1);
//! assert!(summary.stuck.is_empty());
//! assert!((summary.final_time - 8.6).abs() < 1e-9);
//! ```

use crate::config::{ConfigError, HospitalConfig};
use crate::core::SimTime;
use crate::events::{EventKind, EventScheduler, ScheduledEvent, SchedulerError};
use crate::models::event::{Event, EventLog, EventSink};
use crate::models::patient::{Patient, PatientError, PatientHandle, Route};
use crate::models::queue::{QueueError, QueueManager};
use crate::models::stage::{Stage, STAGE_COUNT};
use crate::models::state::SimulationState;
use crate::resources::{ResourceError, ResourceManager};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

// ============================================================================
// Configuration Types
// ============================================================================

/// Run-time limits
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationOptions {
    /// Abort once this many events have been processed and more remain
    pub max_events: Option<usize>,
}

// ============================================================================
// Results and Errors
// ============================================================================

/// Result of processing a single event
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    /// Time of the processed event
    pub time: SimTime,

    /// Kind of the processed event
    pub kind: EventKind,

    /// Patients promised a start by the sweep that followed, if any
    pub admissions: usize,
}

/// Totals of a completed run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub events_processed: usize,

    /// Time of the last processed event
    pub final_time: SimTime,

    /// Number of patients that reached discharge
    pub discharged: usize,

    /// IDs of patients that never left (only possible with a zero-unit stage)
    pub stuck: Vec<u32>,
}

/// Simulation error types
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Invalid config: {0}")]
    Config(#[from] ConfigError),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    #[error("Patient error: {0}")]
    Patient(#[from] PatientError),

    #[error("Unknown patient handle {handle}")]
    UnknownPatient { handle: PatientHandle },

    #[error("Event budget of {budget} exhausted at time {time} with events still pending")]
    EventBudgetExceeded { budget: usize, time: SimTime },
}

// ============================================================================
// Simulation
// ============================================================================

/// The hospital simulation driver
pub struct Simulation {
    scheduler: EventScheduler,
    state: SimulationState,
    queues: QueueManager,
    resources: ResourceManager,

    /// StageStart events scheduled and not yet processed, per stage
    pending_starts: [usize; STAGE_COUNT],

    event_log: EventLog,
    sinks: Vec<Box<dyn EventSink>>,
    options: SimulationOptions,
}

impl Simulation {
    /// Build a simulation with default options
    pub fn new(config: &HospitalConfig) -> Result<Self, SimulationError> {
        Self::with_options(config, SimulationOptions::default())
    }

    /// Validate the configuration, register every patient and schedule
    /// their arrivals
    ///
    /// The clock and the idle accounting of every unit start at the earliest
    /// arrival (hour 0 with no patients).
    pub fn with_options(
        config: &HospitalConfig,
        options: SimulationOptions,
    ) -> Result<Self, SimulationError> {
        config.validate()?;

        let start = config
            .patients
            .iter()
            .map(|record| record.arrival_time())
            .reduce(SimTime::min)
            .unwrap_or(0.0);

        let mut state = SimulationState::new();
        let mut scheduler = EventScheduler::starting_at(start);
        for record in &config.patients {
            let handle = state.add_patient(record.to_patient());
            scheduler.schedule(record.arrival_time(), EventKind::Arrival, handle, None)?;
        }

        Ok(Self {
            scheduler,
            state,
            queues: QueueManager::new(),
            resources: ResourceManager::starting_at(&config.stages, start),
            pending_starts: [0; STAGE_COUNT],
            event_log: EventLog::new(),
            sinks: Vec::new(),
            options,
        })
    }

    /// Forward every event to `sink` in addition to the event log
    pub fn with_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn add_sink(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }

    /// Process events until none remain
    pub fn run(&mut self) -> Result<RunSummary, SimulationError> {
        while self.step()?.is_some() {}

        let totals = self.scheduler.finish();
        let summary = RunSummary {
            events_processed: totals.events_processed,
            final_time: self.scheduler.now(),
            discharged: self.state.num_discharged(),
            stuck: self.state.undischarged_ids(),
        };

        if !summary.stuck.is_empty() {
            warn!(
                stuck = summary.stuck.len(),
                "simulation ended with patients that never left"
            );
        }
        Ok(summary)
    }

    /// Process the next event
    ///
    /// Returns `Ok(None)` once the scheduler is empty.
    pub fn step(&mut self) -> Result<Option<StepResult>, SimulationError> {
        if let Some(budget) = self.options.max_events {
            if self.scheduler.events_processed() >= budget && !self.scheduler.is_empty() {
                return Err(SimulationError::EventBudgetExceeded {
                    budget,
                    time: self.scheduler.now(),
                });
            }
        }

        let event = match self.scheduler.pop_earliest() {
            Some(event) => event,
            None => return Ok(None),
        };
        let time = event.time();
        let admissions = self.dispatch(&event)?;
        self.resources.update_idle_accounting(time);

        Ok(Some(StepResult {
            time,
            kind: event.kind(),
            admissions,
        }))
    }

    fn dispatch(&mut self, event: &ScheduledEvent) -> Result<usize, SimulationError> {
        let handle = event.patient();
        if self.state.get(handle).is_none() {
            warn!(handle = %handle, kind = ?event.kind(), "event for unknown patient, skipping");
            return Ok(0);
        }

        match (event.kind(), event.stage()) {
            (EventKind::Arrival, _) => self.handle_arrival(handle, event.time()),
            (EventKind::StageStart, Some(stage)) => {
                self.handle_stage_start(handle, stage, event.time())?;
                Ok(0)
            }
            (EventKind::StageEnd, Some(stage)) => self.handle_stage_end(handle, stage, event.time()),
            (kind, None) => {
                warn!(handle = %handle, kind = ?kind, "stage event without a stage, skipping");
                Ok(0)
            }
        }
    }

    // ========================================================================
    // Event Handlers
    // ========================================================================

    fn handle_arrival(
        &mut self,
        handle: PatientHandle,
        time: SimTime,
    ) -> Result<usize, SimulationError> {
        let patient = self.patient_ref(handle)?;
        let (patient_id, priority) = (patient.id(), patient.priority());
        self.emit(Event::Arrival {
            time,
            patient_id,
            priority,
        });

        self.route_to(handle, Stage::Triage, time)?;
        self.admit_waiting(time)
    }

    fn handle_stage_start(
        &mut self,
        handle: PatientHandle,
        stage: Stage,
        time: SimTime,
    ) -> Result<(), SimulationError> {
        let pending = &mut self.pending_starts[stage.index()];
        *pending = pending.saturating_sub(1);

        let patient = self.patient_ref(handle)?;
        let (patient_id, priority, prior_state) = (patient.id(), patient.priority(), patient.state());
        if prior_state != stage.queued_state() {
            debug!(patient_id, stage = %stage, state = %prior_state, "ignoring stale start");
            return Ok(());
        }

        match self.resources.first_available_unit(stage, time) {
            Some(unit) => {
                let until =
                    self.resources
                        .occupy(stage, unit, time, handle, patient_id, prior_state)?;
                // A denied start may have put the patient back in line
                self.queues.remove(stage, handle, time);
                self.patient_mut(handle)?.begin_service(stage, time)?;
                self.scheduler
                    .schedule(until, EventKind::StageEnd, handle, Some(stage))?;
                self.emit(Event::ServiceStarted {
                    time,
                    patient_id,
                    stage,
                    unit,
                    until,
                });
            }
            None => {
                let retry_scheduled = !self.queues.contains(stage, handle);
                if retry_scheduled {
                    self.queues.enqueue(stage, handle, priority, time)?;
                    self.scheduler
                        .schedule(time, EventKind::StageStart, handle, Some(stage))?;
                    self.pending_starts[stage.index()] += 1;
                }
                self.emit(Event::StartDenied {
                    time,
                    patient_id,
                    stage,
                    retry_scheduled,
                });
            }
        }
        Ok(())
    }

    fn handle_stage_end(
        &mut self,
        handle: PatientHandle,
        stage: Stage,
        time: SimTime,
    ) -> Result<usize, SimulationError> {
        let patient = self.patient_mut(handle)?;
        patient.complete_stage(stage, time)?;
        let patient_id = patient.id();
        let route = patient.route_after(stage);
        self.emit(Event::ServiceCompleted {
            time,
            patient_id,
            stage,
        });

        match route {
            Route::Queue(next) => self.route_to(handle, next, time)?,
            Route::Discharge => self.discharge(handle, time)?,
        }
        self.admit_waiting(time)
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Put a patient in the queue of `stage`
    fn route_to(
        &mut self,
        handle: PatientHandle,
        stage: Stage,
        time: SimTime,
    ) -> Result<(), SimulationError> {
        let patient = self.patient_mut(handle)?;
        patient.enter_queue(stage, time)?;
        let (patient_id, priority) = (patient.id(), patient.priority());

        let position = self.queues.enqueue(stage, handle, priority, time)?;
        self.emit(Event::Enqueued {
            time,
            patient_id,
            stage,
            position,
        });
        Ok(())
    }

    fn discharge(&mut self, handle: PatientHandle, time: SimTime) -> Result<(), SimulationError> {
        let patient = self.patient_mut(handle)?;
        patient.discharge(time)?;
        let event = Event::Discharged {
            time,
            patient_id: patient.id(),
            total_wait: patient.total_wait_time(),
            total_service: patient.total_service_time(),
        };
        self.emit(event);
        Ok(())
    }

    /// Opportunistic admission across every stage, in pipeline order
    ///
    /// Returns the number of starts scheduled.
    fn admit_waiting(&mut self, time: SimTime) -> Result<usize, SimulationError> {
        let mut admitted = 0;
        for stage in Stage::ALL {
            let free = self
                .resources
                .available_units(stage, time)
                .saturating_sub(self.pending_starts[stage.index()]);

            for _ in 0..free {
                let next = match self.queues.dequeue(stage, time) {
                    Some(next) => next,
                    None => break,
                };
                self.scheduler
                    .schedule(time, EventKind::StageStart, next.patient, Some(stage))?;
                self.pending_starts[stage.index()] += 1;
                admitted += 1;

                let patient_id = self.patient_ref(next.patient)?.id();
                self.emit(Event::AdmissionScheduled {
                    time,
                    patient_id,
                    stage,
                    waited: next.waited,
                });
            }
        }
        Ok(admitted)
    }

    fn emit(&mut self, event: Event) {
        for sink in &mut self.sinks {
            sink.record(&event);
        }
        self.event_log.log(event);
    }

    fn patient_ref(&self, handle: PatientHandle) -> Result<&Patient, SimulationError> {
        self.state
            .get(handle)
            .ok_or(SimulationError::UnknownPatient { handle })
    }

    fn patient_mut(&mut self, handle: PatientHandle) -> Result<&mut Patient, SimulationError> {
        self.state
            .get_mut(handle)
            .ok_or(SimulationError::UnknownPatient { handle })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Current simulated time
    pub fn now(&self) -> SimTime {
        self.scheduler.now()
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn patients(&self) -> &[Patient] {
        self.state.patients()
    }

    /// Look a patient up by chart ID
    pub fn patient_by_id(&self, id: u32) -> Option<&Patient> {
        self.state
            .handle_for(id)
            .and_then(|handle| self.state.get(handle))
    }

    pub fn queues(&self) -> &QueueManager {
        &self.queues
    }

    pub fn resources(&self) -> &ResourceManager {
        &self.resources
    }

    pub fn scheduler(&self) -> &EventScheduler {
        &self.scheduler
    }

    pub fn event_log(&self) -> &EventLog {
        &self.event_log
    }

    pub fn options(&self) -> &SimulationOptions {
        &self.options
    }

    /// StageStart events promised for `stage` and not yet processed
    pub fn pending_starts(&self, stage: Stage) -> usize {
        self.pending_starts[stage.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PatientRecord;
    use crate::models::patient::PatientState;
    use crate::models::stage::StageConfig;

    fn record(id: u32, hour: u32, priority: u8, lab_tests: u32) -> PatientRecord {
        PatientRecord {
            id,
            discharge_after_primary_care: false,
            year: 2017,
            month: 3,
            day: 21,
            hour,
            priority,
            vital_signs: 0,
            lab_tests,
            imaging: 0,
            medication: 0,
        }
    }

    fn config(lab_units: usize, patients: Vec<PatientRecord>) -> HospitalConfig {
        let mut stages = vec![StageConfig::new(0.5, 1); STAGE_COUNT];
        stages[Stage::LabTests.index()] = StageConfig::new(0.5, lab_units);
        HospitalConfig { stages, patients }
    }

    #[test]
    fn test_denied_start_retries_once() {
        let mut sim = Simulation::new(&config(0, vec![record(1, 8, 1, 1)])).unwrap();
        let summary = sim.run().unwrap();
        assert_eq!(summary.stuck, vec![1]);

        // Force a start against the empty lab pool
        let handle = PatientHandle(0);
        let now = sim.now();
        sim.queues.remove(Stage::LabTests, handle, now);
        sim.scheduler
            .schedule(now, EventKind::StageStart, handle, Some(Stage::LabTests))
            .unwrap();
        sim.pending_starts[Stage::LabTests.index()] += 1;

        while sim.step().unwrap().is_some() {}

        let retries: Vec<bool> = sim
            .event_log()
            .events_of_type("StartDenied")
            .iter()
            .map(|e| match e {
                Event::StartDenied {
                    retry_scheduled, ..
                } => *retry_scheduled,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(retries, vec![true, false]);
        assert!(sim.queues().contains(Stage::LabTests, handle));
        assert_eq!(sim.pending_starts(Stage::LabTests), 0);
    }

    #[test]
    fn test_stale_start_is_ignored() {
        let mut sim = Simulation::new(&config(1, vec![record(1, 8, 1, 0)])).unwrap();
        sim.run().unwrap();
        let started = sim.event_log().events_of_type("ServiceStarted").len();

        let now = sim.now();
        sim.scheduler
            .schedule(now, EventKind::StageStart, PatientHandle(0), Some(Stage::Triage))
            .unwrap();
        assert!(sim.step().unwrap().is_some());

        assert_eq!(sim.event_log().events_of_type("ServiceStarted").len(), started);
        assert_eq!(sim.patients()[0].state(), PatientState::Discharged);
    }

    #[test]
    fn test_sweep_never_promises_more_than_free_units() {
        let patients = (1..=3).map(|id| record(id, 8, 1, 0)).collect();
        let mut sim = Simulation::new(&config(1, patients)).unwrap();

        // First arrival: one triage unit, one promise
        let first = sim.step().unwrap().unwrap();
        assert_eq!(first.admissions, 1);
        assert_eq!(sim.pending_starts(Stage::Triage), 1);

        // Later arrivals at the same instant find the unit promised
        assert_eq!(sim.step().unwrap().unwrap().admissions, 0);
        assert_eq!(sim.step().unwrap().unwrap().admissions, 0);
        assert_eq!(sim.queues().len(Stage::Triage), 2);
    }

    #[test]
    fn test_event_for_unknown_patient_is_skipped() {
        let mut sim = Simulation::new(&config(1, vec![record(1, 8, 1, 0)])).unwrap();
        sim.scheduler
            .schedule(8.0, EventKind::StageStart, PatientHandle(99), Some(Stage::Triage))
            .unwrap();

        // The arrival was scheduled first and wins the tie
        assert_eq!(sim.step().unwrap().unwrap().kind, EventKind::Arrival);
        let logged = sim.event_log().len();
        let pending = sim.pending_starts(Stage::Triage);

        let step = sim.step().unwrap().unwrap();
        assert_eq!(step.kind, EventKind::StageStart);
        assert_eq!(step.admissions, 0);
        assert_eq!(sim.event_log().len(), logged);
        assert_eq!(sim.pending_starts(Stage::Triage), pending);
        assert_eq!(sim.queues().total_waiting(), 0);
        assert_eq!(sim.patients()[0].state(), PatientState::Queued(Stage::Triage));
        assert!(sim.resources().has_available_unit(Stage::Triage, 8.0));

        let summary = sim.run().unwrap();
        assert_eq!(summary.discharged, 1);
    }

    #[test]
    fn test_stage_event_without_stage_is_skipped() {
        let mut sim = Simulation::new(&config(1, vec![record(1, 8, 1, 0)])).unwrap();
        sim.step().unwrap();
        let logged = sim.event_log().len();

        for kind in [EventKind::StageStart, EventKind::StageEnd] {
            let event = ScheduledEvent::new(8.0, kind, PatientHandle(0), None, 100);
            assert_eq!(sim.dispatch(&event).unwrap(), 0);
        }

        assert_eq!(sim.event_log().len(), logged);
        assert_eq!(sim.patients()[0].state(), PatientState::Queued(Stage::Triage));
        assert_eq!(sim.pending_starts(Stage::Triage), 1);
    }

    #[test]
    fn test_clock_and_idle_time_start_at_first_arrival() {
        let mut sim = Simulation::new(&config(1, vec![record(1, 8, 1, 0)])).unwrap();
        assert_eq!(sim.scheduler().clock().start(), 8.0);
        sim.run().unwrap();

        // Triage busy 8.0-8.5, then idle until the last event at 9.0
        let triage = sim.resources().pool(Stage::Triage);
        assert_eq!(triage.total_busy_time(), 0.5);
        assert_eq!(triage.total_idle_time(), 0.5);
    }

    #[test]
    fn test_event_budget() {
        let options = SimulationOptions {
            max_events: Some(3),
        };
        let mut sim = Simulation::with_options(&config(1, vec![record(1, 8, 1, 0)]), options)
            .unwrap();
        assert!(matches!(
            sim.run(),
            Err(SimulationError::EventBudgetExceeded { budget: 3, .. })
        ));
    }
}
