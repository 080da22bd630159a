//! Patient arena
//!
//! Patients are stored once, in arrival-record order, and referenced
//! everywhere else (scheduler, queues, resource units) by `PatientHandle`.
//!
//! # Critical Invariants
//!
//! 1. **Handle Stability**: a handle indexes the same patient for the whole run
//! 2. **ID Uniqueness**: each chart ID appears exactly once

use crate::models::patient::{Patient, PatientHandle};
use std::collections::HashMap;

/// All patients known to a simulation run
///
/// # Example
///
/// ```rust
/// use hospital_sim_core::models::patient::Patient;
/// use hospital_sim_core::SimulationState;
///
/// let mut state = SimulationState::new();
/// let handle = state.add_patient(Patient::new(42, 8.0));
/// assert_eq!(state.get(handle).map(|p| p.id()), Some(42));
/// assert_eq!(state.handle_for(42), Some(handle));
/// ```
#[derive(Debug, Clone, Default)]
pub struct SimulationState {
    /// Patient records, indexed by handle
    patients: Vec<Patient>,

    /// Chart ID → handle
    by_id: HashMap<u32, PatientHandle>,
}

impl SimulationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a patient and return its handle
    ///
    /// # Panics
    ///
    /// Panics if a patient with the same chart ID already exists
    pub fn add_patient(&mut self, patient: Patient) -> PatientHandle {
        let id = patient.id();
        assert!(
            !self.by_id.contains_key(&id),
            "Patient ID {} already exists",
            id
        );
        let handle = PatientHandle(self.patients.len());
        self.patients.push(patient);
        self.by_id.insert(id, handle);
        handle
    }

    pub fn get(&self, handle: PatientHandle) -> Option<&Patient> {
        self.patients.get(handle.0)
    }

    pub fn get_mut(&mut self, handle: PatientHandle) -> Option<&mut Patient> {
        self.patients.get_mut(handle.0)
    }

    /// Look up a handle by chart ID
    pub fn handle_for(&self, id: u32) -> Option<PatientHandle> {
        self.by_id.get(&id).copied()
    }

    /// Patients in arrival-record order
    pub fn patients(&self) -> &[Patient] {
        &self.patients
    }

    pub fn num_patients(&self) -> usize {
        self.patients.len()
    }

    pub fn num_discharged(&self) -> usize {
        self.patients.iter().filter(|p| p.is_discharged()).count()
    }

    /// Chart IDs of patients that have not been discharged
    pub fn undischarged_ids(&self) -> Vec<u32> {
        self.patients
            .iter()
            .filter(|p| !p.is_discharged())
            .map(|p| p.id())
            .collect()
    }
}
