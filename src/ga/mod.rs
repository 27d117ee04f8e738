//! GA-based timetable optimization.
//!
//! # Encoding
//!
//! An [`Individual`] is the timetable itself: a flat list of
//! [`ScheduleEntry`](crate::models::ScheduleEntry) values, each fixing a
//! batch, subject, teacher, classroom and slot. Operators edit entries in
//! place and always finish with a repair pass, so every individual stays
//! close to feasible.
//!
//! # Submodules
//!
//! - [`operators`]: Runtime-selectable crossover and mutation strategies
//! - [`repair`]: Conflict detection and the repair passes
//! - [`fitness`]: Weighted multi-objective scoring
//!
//! # Reference
//! - Burke & Petrovic (2002), "Recent research directions in automated timetabling"
//! - Colorni, Dorigo & Maniezzo (1992), "A genetic algorithm to solve the timetable problem"

mod config;
mod construct;
pub mod fitness;
mod individual;
mod local_search;
mod occupancy;
pub mod operators;
pub mod repair;
mod runner;

pub use config::GaConfig;
pub use construct::build_individual;
pub use fitness::{evaluate, FitnessBreakdown};
pub use individual::Individual;
pub use local_search::local_search;
pub use occupancy::Occupancy;
pub use operators::{CrossoverType, GeneticOperators, MutationType};
pub use repair::{
    balance_classroom_distribution, count_collisions, detect_conflicts, fill_under_scheduled,
    find_best_alternative_slot, refresh_flags, resolve_conflicts,
    validate_and_fix_batch_classrooms, validate_and_fix_over_scheduling, CollisionCounts,
    Conflict, ConflictKind,
};
pub use runner::{population_diversity, GaResult, GaRunner, GenerationStats};
