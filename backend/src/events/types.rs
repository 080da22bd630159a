//! Scheduled event types
//!
//! A scheduled event is an instruction for the driver to do something to one
//! patient at one simulated instant. Events are immutable once created and
//! are consumed exactly once.
//!
//! # Ordering
//!
//! Events are ordered by timestamp only; `kind` plays no part. Equal
//! timestamps are broken by insertion sequence, so events scheduled for the
//! same instant are processed first-in first-out.

use crate::core::SimTime;
use crate::models::patient::PatientHandle;
use crate::models::stage::Stage;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// What the driver should do when the event fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// Patient enters the hospital
    Arrival,
    /// Try to occupy a unit of the event's stage
    StageStart,
    /// Service at the event's stage is over
    StageEnd,
}

/// An event waiting in the scheduler
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScheduledEvent {
    time: SimTime,
    kind: EventKind,
    patient: PatientHandle,
    stage: Option<Stage>,
    /// Insertion sequence, assigned by the scheduler
    seq: u64,
}

impl ScheduledEvent {
    pub(crate) fn new(
        time: SimTime,
        kind: EventKind,
        patient: PatientHandle,
        stage: Option<Stage>,
        seq: u64,
    ) -> Self {
        Self {
            time,
            kind,
            patient,
            stage,
            seq,
        }
    }

    pub fn time(&self) -> SimTime {
        self.time
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn patient(&self) -> PatientHandle {
        self.patient
    }

    pub fn stage(&self) -> Option<Stage> {
        self.stage
    }

    /// Insertion sequence number
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScheduledEvent {}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering to make BinaryHeap a min-heap by timestamp,
        // then by insertion sequence.
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
