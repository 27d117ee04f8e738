//! Weekly timetable generation for academic institutions.
//!
//! Builds a conflict-free class timetable over a fixed 6-day × 6-period
//! grid for one batch or for every batch at once, using a genetic
//! algorithm with constructive seeding, repair operators and local search.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Slot`, `Batch`, `Subject`, `Faculty`,
//!   `Classroom`, `Constraint`, `FixedReservation`, `ScheduleEntry`
//! - **`problem`**: Input snapshot loader and the constraint index
//! - **`ga`**: Construction, repair, fitness, operators and the search loop
//! - **`scheduler`**: End-to-end generation, violation report and KPIs
//! - **`validation`**: Input integrity checks (duplicate IDs, dangling refs, quotas)
//!
//! # Architecture
//!
//! Every generation request builds its own problem and population. The
//! engine performs no I/O and holds no shared state, so independent
//! requests can run concurrently.
//!
//! # References
//!
//! - Burke & Petrovic (2002), "Recent research directions in automated timetabling"
//! - Schaerf (1999), "A Survey of Automated Timetabling"

pub mod error;
pub mod ga;
pub mod models;
pub mod problem;
pub mod scheduler;
pub mod validation;

#[cfg(test)]
mod fixtures;

pub use error::TimetableError;
pub use scheduler::{ScheduleOutput, TimetableOutput, TimetableRequest, TimetableScheduler};
