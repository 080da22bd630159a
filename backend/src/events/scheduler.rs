//! Event scheduler: the clock of the simulation
//!
//! A binary min-heap of `ScheduledEvent`s keyed by timestamp. Inserting and
//! popping are O(log n); `len` and `is_empty` are O(1).

use crate::core::{SimClock, SimTime, TIME_EPSILON};
use crate::events::types::{EventKind, ScheduledEvent};
use crate::models::patient::PatientHandle;
use crate::models::stage::Stage;
use std::collections::BinaryHeap;
use thiserror::Error;

/// Errors raised when scheduling an event
#[derive(Debug, Error, PartialEq)]
pub enum SchedulerError {
    #[error("Event time {time} is not finite")]
    NonFiniteTime { time: SimTime },

    #[error("Event time {time} precedes current time {now}")]
    EventInPast { time: SimTime, now: SimTime },

    #[error("{kind:?} event requires a stage")]
    MissingStage { kind: EventKind },
}

/// Totals reported when the scheduler is shut down
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerSummary {
    pub events_processed: usize,
    pub elapsed: SimTime,
}

/// Time-ordered queue of pending events
///
/// # Example
/// ```
/// use hospital_sim_core::events::{EventKind, EventScheduler};
/// use hospital_sim_core::models::PatientHandle;
///
/// let mut scheduler = EventScheduler::new();
/// scheduler.schedule(10.0, EventKind::Arrival, PatientHandle(0), None).unwrap();
/// scheduler.schedule(5.0, EventKind::Arrival, PatientHandle(1), None).unwrap();
///
/// let first = scheduler.pop_earliest().unwrap();
/// assert_eq!(first.time(), 5.0);
/// assert_eq!(scheduler.now(), 5.0);
/// assert_eq!(scheduler.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct EventScheduler {
    events: BinaryHeap<ScheduledEvent>,
    clock: SimClock,
    next_seq: u64,
}

impl EventScheduler {
    /// Create an empty scheduler starting at time 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty scheduler starting at `start`
    pub fn starting_at(start: SimTime) -> Self {
        Self {
            events: BinaryHeap::new(),
            clock: SimClock::new(start),
            next_seq: 0,
        }
    }

    /// Insert an event
    ///
    /// Stage events must carry a stage, and no event may be scheduled before
    /// the current time.
    pub fn schedule(
        &mut self,
        time: SimTime,
        kind: EventKind,
        patient: PatientHandle,
        stage: Option<Stage>,
    ) -> Result<(), SchedulerError> {
        if !time.is_finite() {
            return Err(SchedulerError::NonFiniteTime { time });
        }
        if time + TIME_EPSILON < self.clock.now() {
            return Err(SchedulerError::EventInPast {
                time,
                now: self.clock.now(),
            });
        }
        if kind != EventKind::Arrival && stage.is_none() {
            return Err(SchedulerError::MissingStage { kind });
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.events
            .push(ScheduledEvent::new(time, kind, patient, stage, seq));
        Ok(())
    }

    /// Remove and return the earliest event, advancing the clock to its time
    ///
    /// Returns `None` when no events remain.
    pub fn pop_earliest(&mut self) -> Option<ScheduledEvent> {
        let event = self.events.pop()?;
        self.clock.advance_to(event.time());
        Some(event)
    }

    /// Timestamp of the next event without removing it
    pub fn peek_time(&self) -> Option<SimTime> {
        self.events.peek().map(|e| e.time())
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Current simulated time
    pub fn now(&self) -> SimTime {
        self.clock.now()
    }

    pub fn events_processed(&self) -> usize {
        self.clock.events_processed()
    }

    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    /// Drop every pending event and report the run totals
    pub fn finish(&mut self) -> SchedulerSummary {
        self.events.clear();
        SchedulerSummary {
            events_processed: self.clock.events_processed(),
            elapsed: self.clock.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduler_pops_events_in_time_order() {
        let mut scheduler = EventScheduler::new();
        for (i, t) in [10.0, 5.0, 20.0].into_iter().enumerate() {
            scheduler
                .schedule(t, EventKind::Arrival, PatientHandle(i), None)
                .unwrap();
        }

        let times: Vec<SimTime> = std::iter::from_fn(|| scheduler.pop_earliest())
            .map(|e| e.time())
            .collect();
        assert_eq!(times, vec![5.0, 10.0, 20.0]);
        assert!(scheduler.pop_earliest().is_none());
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_rejects_past_and_non_finite_times() {
        let mut scheduler = EventScheduler::new();
        scheduler
            .schedule(4.0, EventKind::Arrival, PatientHandle(0), None)
            .unwrap();
        scheduler.pop_earliest();

        assert_eq!(
            scheduler.schedule(3.0, EventKind::Arrival, PatientHandle(1), None),
            Err(SchedulerError::EventInPast { time: 3.0, now: 4.0 })
        );
        assert!(matches!(
            scheduler.schedule(f64::INFINITY, EventKind::Arrival, PatientHandle(1), None),
            Err(SchedulerError::NonFiniteTime { .. })
        ));
    }

    #[test]
    fn test_stage_events_need_a_stage() {
        let mut scheduler = EventScheduler::new();
        assert_eq!(
            scheduler.schedule(1.0, EventKind::StageEnd, PatientHandle(0), None),
            Err(SchedulerError::MissingStage {
                kind: EventKind::StageEnd
            })
        );
    }

    #[test]
    fn test_finish_reports_totals_and_clears() {
        let mut scheduler = EventScheduler::starting_at(2.0);
        scheduler
            .schedule(3.0, EventKind::Arrival, PatientHandle(0), None)
            .unwrap();
        scheduler
            .schedule(6.0, EventKind::Arrival, PatientHandle(1), None)
            .unwrap();
        scheduler.pop_earliest();

        let summary = scheduler.finish();
        assert_eq!(summary.events_processed, 1);
        assert_eq!(summary.elapsed, 1.0);
        assert!(scheduler.is_empty());
    }
}
