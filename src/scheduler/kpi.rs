//! Timetable quality metrics (KPIs).
//!
//! Computes summary indicators from a finished timetable.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Total classes | Number of entries |
//! | Unique faculty | Distinct teachers used |
//! | Classrooms used | Distinct classrooms used |
//! | Collisions | Clashes per kind (batch, teacher, classroom) |
//! | Fallback classrooms | Entries placed in a fallback classroom |
//! | Preferred entries | Entries matching a slot preference or directive |
//! | Utilization | Occupied fraction of each batch's 36-slot grid |

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::ga::count_collisions;
use crate::models::{BatchId, ScheduleEntry, GRID_SIZE};
use crate::problem::TimetableProblem;

/// Timetable performance indicators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimetableKpi {
    pub total_classes: usize,
    pub unique_faculty: usize,
    pub classrooms_used: usize,
    pub batch_collisions: usize,
    pub teacher_collisions: usize,
    pub classroom_collisions: usize,
    pub fallback_classrooms: usize,
    pub preferred_entries: usize,
    /// Occupied grid fraction per active batch (0.0..1.0).
    pub utilization_by_batch: BTreeMap<BatchId, f64>,
    /// Mean of `utilization_by_batch`.
    pub avg_utilization: f64,
}

impl TimetableKpi {
    /// Computes KPIs for the entries of a run over `problem`.
    pub fn calculate(problem: &TimetableProblem, entries: &[ScheduleEntry]) -> Self {
        let collisions = count_collisions(entries);

        let mut occupied: BTreeMap<BatchId, BTreeSet<_>> =
            problem.plans().iter().map(|p| (p.id, BTreeSet::new())).collect();
        for e in entries {
            if let Some(slots) = occupied.get_mut(&e.batch) {
                slots.insert(e.slot);
            }
        }
        let utilization_by_batch: BTreeMap<BatchId, f64> = occupied
            .into_iter()
            .map(|(b, slots)| (b, slots.len() as f64 / GRID_SIZE as f64))
            .collect();
        let avg_utilization = if utilization_by_batch.is_empty() {
            0.0
        } else {
            utilization_by_batch.values().sum::<f64>() / utilization_by_batch.len() as f64
        };

        Self {
            total_classes: entries.len(),
            unique_faculty: entries.iter().map(|e| e.teacher).collect::<BTreeSet<_>>().len(),
            classrooms_used: entries.iter().map(|e| e.classroom).collect::<BTreeSet<_>>().len(),
            batch_collisions: collisions.batch,
            teacher_collisions: collisions.teacher,
            classroom_collisions: collisions.classroom,
            fallback_classrooms: entries.iter().filter(|e| e.flags.fallback_classroom).count(),
            preferred_entries: entries.iter().filter(|e| e.flags.preferred).count(),
            utilization_by_batch,
            avg_utilization,
        }
    }

    /// Sum of all collision counts.
    pub fn total_collisions(&self) -> usize {
        self.batch_collisions + self.teacher_collisions + self.classroom_collisions
    }

    /// Whether the timetable meets the given quality thresholds.
    pub fn meets_thresholds(&self, max_collisions: usize, min_utilization: f64) -> bool {
        self.total_collisions() <= max_collisions && self.avg_utilization >= min_utilization
    }
}
