//! Orchestrator - main simulation loop
//!
//! Drives patients through the hospital by processing scheduled events in
//! time order.
//!
//! See `engine.rs` for full implementation.

pub mod engine;

// Re-export main types for convenience
pub use engine::{RunSummary, Simulation, SimulationError, SimulationOptions, StepResult};
