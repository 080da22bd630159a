//! Run reports
//!
//! Builds the per-patient report and per-stage utilization summary from the
//! final state of a simulation. Rendering is left to the caller: both report
//! types implement `Display` for the plain text form and `Serialize` for JSON.

use crate::core::SimTime;
use crate::models::patient::{ArrivalDate, Patient};
use crate::models::stage::Stage;
use crate::orchestrator::Simulation;
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

/// Format of the admission timestamp
pub const ADMISSION_FORMAT: &str = "%a %b %-d %H:%M:%S %Y";

/// Outcome of one patient
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientReport {
    pub id: u32,

    /// Admission date and hour, e.g. `Tue Mar 21 08:00:00 2017`
    pub admitted_at: String,

    /// Wait plus service, in hours
    pub time_in_system: SimTime,

    pub service_time: SimTime,
    pub wait_time: SimTime,
    pub discharged: bool,
}

impl PatientReport {
    /// Report a patient as of `end`, the time the run stopped
    ///
    /// A patient still in the hospital has the interval it is in (usually a
    /// wait in a queue with no units) counted up to `end`.
    pub fn from_patient(patient: &Patient, end: SimTime) -> Self {
        let (wait_time, service_time) = patient.totals_at(end);
        Self {
            id: patient.id(),
            admitted_at: format_admission(patient.arrival_date()),
            time_in_system: wait_time + service_time,
            service_time,
            wait_time,
            discharged: patient.is_discharged(),
        }
    }
}

impl fmt::Display for PatientReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {:.2} {:.2} {:.2}",
            self.id, self.admitted_at, self.time_in_system, self.service_time, self.wait_time
        )
    }
}

/// Utilization of one stage over the run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageSummary {
    pub stage: Stage,
    pub unit_count: usize,
    pub busy_time: SimTime,
    pub idle_time: SimTime,

    /// Patients taken off the queue
    pub served: usize,

    pub average_wait: SimTime,
    pub average_queue_length: f64,
    pub max_queue_length: usize,
}

impl fmt::Display for StageSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<12} units={} busy={:.2} idle={:.2} served={} avg_wait={:.2} avg_len={:.2} max_len={}",
            self.stage.name(),
            self.unit_count,
            self.busy_time,
            self.idle_time,
            self.served,
            self.average_wait,
            self.average_queue_length,
            self.max_queue_length
        )
    }
}

/// Render an admission date, falling back to a plain form for impossible dates
pub fn format_admission(date: ArrivalDate) -> String {
    NaiveDate::from_ymd_opt(date.year, date.month, date.day)
        .and_then(|day| day.and_hms_opt(date.hour, 0, 0))
        .map(|moment| moment.format(ADMISSION_FORMAT).to_string())
        .unwrap_or_else(|| {
            format!(
                "{:04}-{:02}-{:02} {:02}:00:00",
                date.year, date.month, date.day, date.hour
            )
        })
}

/// One report per patient, in input order
pub fn patient_reports(sim: &Simulation) -> Vec<PatientReport> {
    let end = sim.now();
    sim.patients()
        .iter()
        .map(|patient| PatientReport::from_patient(patient, end))
        .collect()
}

/// One summary per stage, in pipeline order
pub fn stage_summaries(sim: &Simulation) -> Vec<StageSummary> {
    Stage::ALL
        .into_iter()
        .map(|stage| {
            let pool = sim.resources().pool(stage);
            let stats = sim.queues().queue(stage).stats();
            StageSummary {
                stage,
                unit_count: pool.unit_count(),
                busy_time: pool.total_busy_time(),
                idle_time: pool.total_idle_time(),
                served: stats.served,
                average_wait: stats.average_wait(),
                average_queue_length: stats.average_length(),
                max_queue_length: stats.max_length,
            }
        })
        .collect()
}
