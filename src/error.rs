//! Crate error type.
//!
//! Only caller mistakes are errors. Infeasible or inconsistent timetabling
//! input never fails a run; it degrades the schedule and shows up in the
//! [`ViolationReport`](crate::scheduler::ViolationReport).

use thiserror::Error;

use crate::models::BatchId;

/// Errors returned by the timetable engine.
#[derive(Debug, Error)]
pub enum TimetableError {
    /// A [`GaConfig`](crate::ga::GaConfig) parameter is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Single-batch mode named a batch absent from the input.
    #[error("unknown batch {0}")]
    UnknownBatch(BatchId),

    /// The active batch set is empty.
    #[error("no batches to schedule")]
    NoBatches,

    /// A JSON request could not be parsed.
    #[error("malformed request: {0}")]
    Json(#[from] serde_json::Error),
}
