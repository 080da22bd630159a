//! Resource Module
//!
//! Service units for every stage of the hospital.
//!
//! - `pool`: one `ResourcePool` per stage, each a fixed set of `ResourceUnit`s
//! - `ResourceManager`: the six pools, addressed by `Stage`
//!
//! Availability is a pure function of `(busy, busy_until, time)`: there is no
//! release event, a unit simply becomes available again once its reservation
//! has elapsed.
//!
//! # Example
//!
//! ```rust
//! use hospital_sim_core::models::{PatientHandle, PatientState, Stage, StageConfig};
//! use hospital_sim_core::resources::ResourceManager;
//!
//! let configs = [StageConfig::new(0.25, 2); 6];
//! let mut resources = ResourceManager::new(&configs);
//!
//! let state = PatientState::Queued(Stage::Triage);
//! let until = resources.occupy(Stage::Triage, 0, 8.0, PatientHandle(0), 1, state).unwrap();
//! assert_eq!(until, 8.25);
//! assert_eq!(resources.first_available_unit(Stage::Triage, 8.1), Some(1));
//! ```

pub mod pool;

pub use pool::{Occupancy, ResourceError, ResourcePool, ResourceUnit};

use crate::core::SimTime;
use crate::models::patient::{PatientHandle, PatientState};
use crate::models::stage::{Stage, StageConfig};

/// Unit pools of all stages
#[derive(Debug, Clone)]
pub struct ResourceManager {
    pools: Vec<ResourcePool>,
}

impl ResourceManager {
    /// Build one pool per stage from configs given in pipeline order
    ///
    /// # Panics
    ///
    /// Panics if `configs` does not hold exactly one entry per stage.
    pub fn new(configs: &[StageConfig]) -> Self {
        Self::starting_at(configs, 0.0)
    }

    /// Build the pools with idle accounting beginning at `start`
    ///
    /// # Panics
    ///
    /// Panics if `configs` does not hold exactly one entry per stage.
    pub fn starting_at(configs: &[StageConfig], start: SimTime) -> Self {
        assert_eq!(
            configs.len(),
            Stage::ALL.len(),
            "Expected one stage config per stage"
        );
        let pools = Stage::ALL
            .into_iter()
            .zip(configs.iter().copied())
            .map(|(stage, config)| ResourcePool::starting_at(stage, config, start))
            .collect();
        Self { pools }
    }

    pub fn pool(&self, stage: Stage) -> &ResourcePool {
        &self.pools[stage.index()]
    }

    pub fn pools(&self) -> &[ResourcePool] {
        &self.pools
    }

    pub fn has_available_unit(&self, stage: Stage, time: SimTime) -> bool {
        self.pool(stage).has_available_unit(time)
    }

    pub fn first_available_unit(&self, stage: Stage, time: SimTime) -> Option<usize> {
        self.pool(stage).first_available_unit(time)
    }

    pub fn available_units(&self, stage: Stage, time: SimTime) -> usize {
        self.pool(stage).available_units(time)
    }

    /// Reserve a unit of `stage`. See [`ResourcePool::occupy`].
    pub fn occupy(
        &mut self,
        stage: Stage,
        index: usize,
        time: SimTime,
        patient: PatientHandle,
        patient_id: u32,
        prior_state: PatientState,
    ) -> Result<SimTime, ResourceError> {
        self.pools[stage.index()].occupy(index, time, patient, patient_id, prior_state)
    }

    /// Accrue idle time of every unit of every stage up to `time`
    pub fn update_idle_accounting(&mut self, time: SimTime) {
        for pool in &mut self.pools {
            pool.update_idle_accounting(time);
        }
    }

    /// Stage and unit currently reserved by `patient`
    pub fn unit_for_patient(&self, patient: PatientHandle, time: SimTime) -> Option<(Stage, usize)> {
        self.pools.iter().find_map(|pool| {
            pool.unit_for_patient(patient, time)
                .map(|index| (pool.stage(), index))
        })
    }
}
