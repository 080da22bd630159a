//! Event logging for simulation replay and auditing.
//!
//! This module defines the Event enum which captures every significant state
//! change during a run. The simulation never prints: it records events into an
//! `EventLog` and forwards them to any injected `EventSink`.
//!
//! # Event Types
//!
//! - **Arrival**: patient enters the hospital
//! - **Enqueued / AdmissionScheduled**: queue movements
//! - **ServiceStarted / StartDenied / ServiceCompleted**: unit usage
//! - **Discharged**: patient leaves
//!
//! # Example
//!
//! ```rust
//! use hospital_sim_core::models::event::{Event, EventLog};
//!
//! let mut log = EventLog::new();
//! log.log(Event::Arrival { time: 8.0, patient_id: 1, priority: 2 });
//!
//! assert_eq!(log.len(), 1);
//! assert_eq!(log.events()[0].event_type(), "Arrival");
//! ```

use crate::core::SimTime;
use crate::models::stage::Stage;
use serde::Serialize;

/// Simulation event capturing a state change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Event {
    /// Patient arrived and is about to join triage
    Arrival {
        time: SimTime,
        patient_id: u32,
        priority: u8,
    },

    /// Patient joined a stage queue
    Enqueued {
        time: SimTime,
        patient_id: u32,
        stage: Stage,
        /// 1-indexed position after insertion
        position: usize,
    },

    /// Opportunistic sweep took the patient off the queue and scheduled a start
    AdmissionScheduled {
        time: SimTime,
        patient_id: u32,
        stage: Stage,
        waited: SimTime,
    },

    /// Patient occupied a unit
    ServiceStarted {
        time: SimTime,
        patient_id: u32,
        stage: Stage,
        unit: usize,
        until: SimTime,
    },

    /// No unit was free when the start was processed
    StartDenied {
        time: SimTime,
        patient_id: u32,
        stage: Stage,
        /// Whether a same-instant retry was scheduled
        retry_scheduled: bool,
    },

    /// Patient finished service at a stage
    ServiceCompleted {
        time: SimTime,
        patient_id: u32,
        stage: Stage,
    },

    /// Patient left the hospital
    Discharged {
        time: SimTime,
        patient_id: u32,
        total_wait: SimTime,
        total_service: SimTime,
    },
}

impl Event {
    /// Simulated time the event occurred at
    pub fn time(&self) -> SimTime {
        match self {
            Event::Arrival { time, .. } => *time,
            Event::Enqueued { time, .. } => *time,
            Event::AdmissionScheduled { time, .. } => *time,
            Event::ServiceStarted { time, .. } => *time,
            Event::StartDenied { time, .. } => *time,
            Event::ServiceCompleted { time, .. } => *time,
            Event::Discharged { time, .. } => *time,
        }
    }

    /// Short description of the event type
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::Arrival { .. } => "Arrival",
            Event::Enqueued { .. } => "Enqueued",
            Event::AdmissionScheduled { .. } => "AdmissionScheduled",
            Event::ServiceStarted { .. } => "ServiceStarted",
            Event::StartDenied { .. } => "StartDenied",
            Event::ServiceCompleted { .. } => "ServiceCompleted",
            Event::Discharged { .. } => "Discharged",
        }
    }

    /// Chart ID of the patient the event concerns
    pub fn patient_id(&self) -> u32 {
        match self {
            Event::Arrival { patient_id, .. } => *patient_id,
            Event::Enqueued { patient_id, .. } => *patient_id,
            Event::AdmissionScheduled { patient_id, .. } => *patient_id,
            Event::ServiceStarted { patient_id, .. } => *patient_id,
            Event::StartDenied { patient_id, .. } => *patient_id,
            Event::ServiceCompleted { patient_id, .. } => *patient_id,
            Event::Discharged { patient_id, .. } => *patient_id,
        }
    }

    /// Stage the event concerns, if any
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Event::Enqueued { stage, .. }
            | Event::AdmissionScheduled { stage, .. }
            | Event::ServiceStarted { stage, .. }
            | Event::StartDenied { stage, .. }
            | Event::ServiceCompleted { stage, .. } => Some(*stage),
            Event::Arrival { .. } | Event::Discharged { .. } => None,
        }
    }
}

/// Receiver for simulation events
///
/// Sinks are injected into a `Simulation` and see every event right after it
/// is appended to the simulation's own `EventLog`.
pub trait EventSink {
    fn record(&mut self, event: &Event);
}

/// Forwards events to `tracing`
///
/// Routine events go out at `debug`, denied starts at `warn`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&mut self, event: &Event) {
        match event {
            Event::StartDenied {
                time,
                patient_id,
                stage,
                retry_scheduled,
            } => tracing::warn!(
                time = *time,
                patient_id = *patient_id,
                stage = %stage,
                retry_scheduled = *retry_scheduled,
                "no unit available"
            ),
            Event::Discharged {
                time,
                patient_id,
                total_wait,
                total_service,
            } => tracing::debug!(
                time = *time,
                patient_id = *patient_id,
                total_wait = *total_wait,
                total_service = *total_service,
                "discharged"
            ),
            other => tracing::debug!(
                time = other.time(),
                patient_id = other.patient_id(),
                stage = ?other.stage(),
                "{}",
                other.event_type()
            ),
        }
    }
}

/// Event log for storing and querying simulation events.
///
/// This is a simple wrapper around Vec<Event> with convenience methods.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    /// Create a new empty event log
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Add an event to the log
    pub fn log(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Get the number of events logged
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if the log is empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Get all events
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Get events of a specific type
    pub fn events_of_type(&self, event_type: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Get events for a specific patient
    pub fn events_for_patient(&self, patient_id: u32) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.patient_id() == patient_id)
            .collect()
    }

    /// Get events that occurred in `[from, to]`
    pub fn events_between(&self, from: SimTime, to: SimTime) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.time() >= from && e.time() <= to)
            .collect()
    }

    /// Clear all events
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl EventSink for EventLog {
    fn record(&mut self, event: &Event) {
        self.log(event.clone());
    }
}
