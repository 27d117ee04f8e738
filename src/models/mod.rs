//! Timetabling domain models.
//!
//! Provides the data types the engine reads and produces. All of them are
//! plain serializable values built fresh per generation request.
//!
//! # Domain Mappings
//!
//! | u-timetable | University | School |
//! |-------------|------------|--------|
//! | Batch | Section / cohort | Class |
//! | Subject | Course | Subject |
//! | Faculty | Lecturer | Teacher |
//! | Classroom | Lecture hall / lab | Room |
//! | Slot | Day × lecture period | Day × lesson |

mod constraint;
mod entry;
mod resource;
mod slot;

pub use constraint::{Constraint, FixedReservation, ReservationKind};
pub use entry::{EntryFlags, ScheduleEntry};
pub use resource::{Batch, BatchId, Classroom, ClassroomId, Faculty, FacultyId, Subject, SubjectId};
pub use slot::{Day, Period, Slot, DAYS_PER_WEEK, GRID_SIZE, PERIODS_PER_DAY};
