//! Stage queues
//!
//! Every stage has one waiting line. The two priority-ordered stages keep
//! their line sorted by priority class (highest first) with ties in enqueue
//! order; the procedure stages are plain FIFO. A single ordered queue per
//! stage admits patients in exactly the order a set of per-class FIFO queues
//! drained highest class first would.
//!
//! # Critical Invariants
//!
//! 1. **Uniqueness**: a patient appears in at most one queue at any instant
//! 2. **Ordering**: `dequeue` always returns the patient that should be admitted next
//!
//! # Usage
//!
//! ```rust
//! use hospital_sim_core::models::queue::QueueManager;
//! use hospital_sim_core::models::{PatientHandle, Stage};
//!
//! let mut queues = QueueManager::new();
//! queues.enqueue(Stage::Triage, PatientHandle(0), 1, 0.0).unwrap();
//! queues.enqueue(Stage::Triage, PatientHandle(1), 3, 1.0).unwrap();
//!
//! let next = queues.dequeue(Stage::Triage, 2.0).unwrap();
//! assert_eq!(next.patient, PatientHandle(1));
//! assert_eq!(next.waited, 1.0);
//! ```

use crate::core::SimTime;
use crate::models::patient::PatientHandle;
use crate::models::stage::Stage;
use serde::Serialize;
use std::collections::VecDeque;
use thiserror::Error;

/// Errors raised by queue operations
#[derive(Debug, Error, PartialEq)]
pub enum QueueError {
    #[error("Patient {patient} is already queued at {stage}")]
    AlreadyQueued { patient: PatientHandle, stage: Stage },
}

/// Admission order of a queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QueueDiscipline {
    /// First in, first out
    Fifo,
    /// Highest priority class first, FIFO within a class
    Priority,
}

#[derive(Debug, Clone, PartialEq)]
struct QueueEntry {
    patient: PatientHandle,
    priority: u8,
    enqueued_at: SimTime,
}

/// A patient taken off the front of a queue
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dequeued {
    pub patient: PatientHandle,
    /// Time spent in this queue
    pub waited: SimTime,
}

/// Running statistics for one queue
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueueStats {
    /// Total wait of every patient dequeued so far
    pub total_wait: SimTime,

    /// Number of patients dequeued
    pub served: usize,

    /// Sum of queue lengths observed after each enqueue/dequeue
    pub length_sample_sum: usize,

    /// Number of length observations
    pub length_samples: usize,

    /// Longest length observed
    pub max_length: usize,
}

impl QueueStats {
    fn sample(&mut self, length: usize) {
        self.length_sample_sum += length;
        self.length_samples += 1;
        self.max_length = self.max_length.max(length);
    }

    /// Mean wait of dequeued patients, 0 if none were served
    pub fn average_wait(&self) -> SimTime {
        if self.served == 0 {
            0.0
        } else {
            self.total_wait / self.served as f64
        }
    }

    /// Mean observed length, 0 if never sampled
    pub fn average_length(&self) -> f64 {
        if self.length_samples == 0 {
            0.0
        } else {
            self.length_sample_sum as f64 / self.length_samples as f64
        }
    }
}

/// Waiting line of one stage
#[derive(Debug, Clone)]
pub struct StageQueue {
    stage: Stage,
    discipline: QueueDiscipline,
    entries: VecDeque<QueueEntry>,
    stats: QueueStats,
}

impl StageQueue {
    /// Create the queue for `stage`, with the discipline the stage calls for
    pub fn new(stage: Stage) -> Self {
        let discipline = if stage.is_priority_ordered() {
            QueueDiscipline::Priority
        } else {
            QueueDiscipline::Fifo
        };
        Self {
            stage,
            discipline,
            entries: VecDeque::new(),
            stats: QueueStats::default(),
        }
    }

    /// Add a patient and return its 1-indexed position
    ///
    /// O(1) for FIFO queues, O(len) for priority queues.
    pub fn enqueue(
        &mut self,
        patient: PatientHandle,
        priority: u8,
        time: SimTime,
    ) -> Result<usize, QueueError> {
        if self.contains(patient) {
            return Err(QueueError::AlreadyQueued {
                patient,
                stage: self.stage,
            });
        }

        let entry = QueueEntry {
            patient,
            priority,
            enqueued_at: time,
        };
        let index = match self.discipline {
            QueueDiscipline::Fifo => self.entries.len(),
            // Behind everyone of equal or higher priority
            QueueDiscipline::Priority => self
                .entries
                .iter()
                .position(|e| e.priority < priority)
                .unwrap_or(self.entries.len()),
        };
        self.entries.insert(index, entry);
        self.stats.sample(self.entries.len());
        Ok(index + 1)
    }

    /// Remove the next patient to admit, recording its wait
    pub fn dequeue(&mut self, time: SimTime) -> Option<Dequeued> {
        let entry = self.entries.pop_front()?;
        let waited = (time - entry.enqueued_at).max(0.0);
        self.stats.total_wait += waited;
        self.stats.served += 1;
        self.stats.sample(self.entries.len());
        Some(Dequeued {
            patient: entry.patient,
            waited,
        })
    }

    /// Take a specific patient out of the line without counting it as served
    ///
    /// Returns the time the patient has been waiting here.
    pub fn remove(&mut self, patient: PatientHandle, time: SimTime) -> Option<SimTime> {
        let index = self.entries.iter().position(|e| e.patient == patient)?;
        let entry = self.entries.remove(index)?;
        self.stats.sample(self.entries.len());
        Some((time - entry.enqueued_at).max(0.0))
    }

    /// Next patient to admit, without removing it
    pub fn peek(&self) -> Option<PatientHandle> {
        self.entries.front().map(|e| e.patient)
    }

    /// Whether the patient is in this line. O(len).
    pub fn contains(&self, patient: PatientHandle) -> bool {
        self.entries.iter().any(|e| e.patient == patient)
    }

    /// Patients in admission order
    pub fn patients(&self) -> Vec<PatientHandle> {
        self.entries.iter().map(|e| e.patient).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn discipline(&self) -> QueueDiscipline {
        self.discipline
    }

    pub fn stats(&self) -> &QueueStats {
        &self.stats
    }
}

/// One queue per stage
#[derive(Debug, Clone)]
pub struct QueueManager {
    queues: Vec<StageQueue>,
}

impl QueueManager {
    pub fn new() -> Self {
        Self {
            queues: Stage::ALL.into_iter().map(StageQueue::new).collect(),
        }
    }

    /// Add a patient to the queue of `stage`
    ///
    /// Fails if the patient is already waiting anywhere: a patient is in at
    /// most one queue at a time.
    pub fn enqueue(
        &mut self,
        stage: Stage,
        patient: PatientHandle,
        priority: u8,
        time: SimTime,
    ) -> Result<usize, QueueError> {
        if let Some(current) = self.queued_at(patient) {
            return Err(QueueError::AlreadyQueued {
                patient,
                stage: current,
            });
        }
        self.queue_mut(stage).enqueue(patient, priority, time)
    }

    /// Remove the next patient to admit at `stage`
    pub fn dequeue(&mut self, stage: Stage, time: SimTime) -> Option<Dequeued> {
        self.queue_mut(stage).dequeue(time)
    }

    /// Take a specific patient out of the queue of `stage`
    pub fn remove(
        &mut self,
        stage: Stage,
        patient: PatientHandle,
        time: SimTime,
    ) -> Option<SimTime> {
        self.queue_mut(stage).remove(patient, time)
    }

    pub fn peek(&self, stage: Stage) -> Option<PatientHandle> {
        self.queue(stage).peek()
    }

    pub fn contains(&self, stage: Stage, patient: PatientHandle) -> bool {
        self.queue(stage).contains(patient)
    }

    /// Stage whose queue currently holds the patient, if any
    pub fn queued_at(&self, patient: PatientHandle) -> Option<Stage> {
        self.queues
            .iter()
            .find(|q| q.contains(patient))
            .map(|q| q.stage())
    }

    pub fn len(&self, stage: Stage) -> usize {
        self.queue(stage).len()
    }

    /// Patients waiting across every stage
    pub fn total_waiting(&self) -> usize {
        self.queues.iter().map(|q| q.len()).sum()
    }

    pub fn queue(&self, stage: Stage) -> &StageQueue {
        &self.queues[stage.index()]
    }

    fn queue_mut(&mut self, stage: Stage) -> &mut StageQueue {
        &mut self.queues[stage.index()]
    }

    pub fn queues(&self) -> &[StageQueue] {
        &self.queues
    }
}

impl Default for QueueManager {
    fn default() -> Self {
        Self::new()
    }
}
