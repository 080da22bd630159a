//! Hospital Simulator Core - Rust Engine
//!
//! Discrete-event simulation of patients flowing through a six-stage
//! hospital pipeline with finite service units and priority queueing.
//!
//! # Architecture
//!
//! - **core**: Simulated time and the simulation clock
//! - **events**: Time-ordered event scheduler
//! - **models**: Domain types (Stage, Patient, queues, event log, state)
//! - **resources**: Per-stage pools of service units
//! - **orchestrator**: Main event loop
//! - **config**: Input loading and validation
//! - **report**: Per-patient and per-stage reports
//!
//! # Critical Invariants
//!
//! 1. Events are processed in non-decreasing time order; ties pop in
//!    scheduling order
//! 2. A patient is in at most one queue at any instant
//! 3. A unit never serves two patients over overlapping intervals
//! 4. The core never prints: observers attach through `EventSink`
//!
//! # Example
//!
//! ```rust
//! use hospital_sim_core::{parse_text, report, Simulation};
//!
//! let config = parse_text(
//!     "0.1 1  0.2 1  0.5 1  0.3 1  0.5 1  0.5 1
//!      2
//!      1 1 2017 3 21 8 1 0 0 0 0
//!      2 1 2017 3 21 8 3 0 0 0 0",
//! )
//! .unwrap();
//!
//! let mut sim = Simulation::new(&config).unwrap();
//! sim.run().unwrap();
//!
//! let reports = report::patient_reports(&sim);
//! // Patient 1 was scheduled first and got the single triage unit;
//! // patient 2 waited for it
//! assert!(reports[1].wait_time > 0.0);
//! ```

// Module declarations
pub mod config;
pub mod core;
pub mod events;
pub mod models;
pub mod orchestrator;
pub mod report;
pub mod resources;

// Re-exports for convenience
pub use config::{load, parse_text, ConfigError, HospitalConfig, PatientRecord};
pub use crate::core::time::{SimClock, SimTime};
pub use events::{EventKind, EventScheduler, SchedulerError};
pub use models::{
    event::{Event, EventLog, EventSink, TracingSink},
    patient::{Patient, PatientError, PatientHandle, PatientState, ProcedureCounts},
    queue::{QueueError, QueueManager},
    stage::{Stage, StageConfig},
    state::SimulationState,
};
pub use orchestrator::{RunSummary, Simulation, SimulationError, SimulationOptions};
pub use report::{PatientReport, StageSummary};
pub use resources::{ResourceError, ResourceManager};
