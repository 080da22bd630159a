//! Domain models for the hospital simulator

pub mod event;
pub mod patient;
pub mod queue;
pub mod stage;
pub mod state;

// Re-exports
pub use event::{Event, EventLog, EventSink, TracingSink};
pub use patient::{
    ArrivalDate, HistoryEntry, Patient, PatientError, PatientHandle, PatientState,
    ProcedureCounts, Route,
};
pub use queue::{Dequeued, QueueDiscipline, QueueError, QueueManager, QueueStats, StageQueue};
pub use stage::{Stage, StageConfig, UnknownStage, STAGE_COUNT};
pub use state::SimulationState;
