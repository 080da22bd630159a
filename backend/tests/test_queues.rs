//! Tests for StageQueue and QueueManager
//!
//! Admission order, uniqueness across queues and wait statistics.

use hospital_sim_core::models::{PatientHandle, QueueError, QueueManager, Stage, StageQueue};
use proptest::prelude::*;
use std::collections::{BTreeMap, VecDeque};

#[test]
fn test_priority_order_highest_first() {
    let mut queues = QueueManager::new();
    queues.enqueue(Stage::Triage, PatientHandle(1), 1, 0.0).unwrap();
    queues.enqueue(Stage::Triage, PatientHandle(3), 3, 1.0).unwrap();
    queues.enqueue(Stage::Triage, PatientHandle(2), 2, 2.0).unwrap();

    let order: Vec<PatientHandle> = std::iter::from_fn(|| queues.dequeue(Stage::Triage, 5.0))
        .map(|d| d.patient)
        .collect();
    assert_eq!(
        order,
        vec![PatientHandle(3), PatientHandle(2), PatientHandle(1)]
    );
}

#[test]
fn test_equal_priority_is_fifo() {
    let mut queue = StageQueue::new(Stage::PrimaryCare);
    queue.enqueue(PatientHandle(0), 2, 0.0).unwrap();
    queue.enqueue(PatientHandle(1), 2, 1.0).unwrap();
    let position = queue.enqueue(PatientHandle(2), 5, 2.0).unwrap();

    assert_eq!(position, 1);
    assert_eq!(
        queue.patients(),
        vec![PatientHandle(2), PatientHandle(0), PatientHandle(1)]
    );
}

#[test]
fn test_patient_in_at_most_one_queue() {
    let mut queues = QueueManager::new();
    queues.enqueue(Stage::LabTests, PatientHandle(7), 1, 0.0).unwrap();

    assert_eq!(
        queues.enqueue(Stage::Imaging, PatientHandle(7), 1, 1.0),
        Err(QueueError::AlreadyQueued {
            patient: PatientHandle(7),
            stage: Stage::LabTests
        })
    );
    assert_eq!(queues.queued_at(PatientHandle(7)), Some(Stage::LabTests));
    assert_eq!(queues.total_waiting(), 1);
}

#[test]
fn test_dequeue_records_wait() {
    let mut queues = QueueManager::new();
    queues.enqueue(Stage::Imaging, PatientHandle(0), 0, 1.0).unwrap();
    queues.enqueue(Stage::Imaging, PatientHandle(1), 0, 2.0).unwrap();

    assert_eq!(queues.dequeue(Stage::Imaging, 3.0).unwrap().waited, 2.0);
    assert_eq!(queues.dequeue(Stage::Imaging, 3.0).unwrap().waited, 1.0);
    assert!(queues.dequeue(Stage::Imaging, 3.0).is_none());

    let stats = queues.queue(Stage::Imaging).stats();
    assert_eq!(stats.served, 2);
    assert_eq!(stats.average_wait(), 1.5);
    assert_eq!(stats.max_length, 2);
}

#[test]
fn test_average_length_over_enqueues_and_dequeues() {
    let mut queues = QueueManager::new();
    for id in 0..3 {
        queues.enqueue(Stage::LabTests, PatientHandle(id), 0, 1.0).unwrap();
    }
    for _ in 0..3 {
        queues.dequeue(Stage::LabTests, 2.0).unwrap();
    }

    // Lengths observed: 1, 2, 3, then 2, 1, 0
    let stats = queues.queue(Stage::LabTests).stats();
    assert_eq!(stats.length_sample_sum, 9);
    assert_eq!(stats.length_samples, 6);
    assert_eq!(stats.average_length(), 1.5);
    assert_eq!(stats.max_length, 3);
}

#[test]
fn test_requeue_after_dequeue_is_allowed() {
    let mut queues = QueueManager::new();
    queues.enqueue(Stage::Triage, PatientHandle(0), 1, 0.0).unwrap();
    queues.dequeue(Stage::Triage, 0.0).unwrap();
    assert!(queues.enqueue(Stage::Triage, PatientHandle(0), 1, 0.0).is_ok());
    assert!(queues.contains(Stage::Triage, PatientHandle(0)));
}

#[derive(Debug, Clone)]
enum Op {
    Enqueue(u8),
    Dequeue,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0u8..5).prop_map(Op::Enqueue),
        2 => Just(Op::Dequeue),
    ]
}

proptest! {
    /// The single ordered queue admits in the same order as one FIFO bucket
    /// per priority class drained highest class first
    #[test]
    fn prop_matches_per_class_buckets(ops in prop::collection::vec(op(), 1..200)) {
        let mut queue = StageQueue::new(Stage::Triage);
        let mut buckets: BTreeMap<u8, VecDeque<PatientHandle>> = BTreeMap::new();

        for (i, op) in ops.into_iter().enumerate() {
            let time = i as f64;
            match op {
                Op::Enqueue(priority) => {
                    let handle = PatientHandle(i);
                    queue.enqueue(handle, priority, time).unwrap();
                    buckets.entry(priority).or_default().push_back(handle);
                }
                Op::Dequeue => {
                    let expected = buckets
                        .iter_mut()
                        .rev()
                        .find_map(|(_, bucket)| bucket.pop_front());
                    let actual = queue.dequeue(time).map(|d| d.patient);
                    prop_assert_eq!(actual, expected);
                }
            }
        }

        let remaining: usize = buckets.values().map(|b| b.len()).sum();
        prop_assert_eq!(queue.len(), remaining);
    }
}
