//! Candidate timetable (individual).
//!
//! An individual is a flat list of [`ScheduleEntry`] values covering every
//! active batch, plus its fitness. Higher fitness is better.

use std::collections::{BTreeMap, BTreeSet};

use crate::models::{
    BatchId, ScheduleEntry, SubjectId, Slot, DAYS_PER_WEEK, PERIODS_PER_DAY,
};

/// One complete candidate timetable.
#[derive(Debug, Clone)]
pub struct Individual {
    /// Scheduled classes of every active batch.
    pub entries: Vec<ScheduleEntry>,
    /// Fitness value (higher = better). `NEG_INFINITY` until evaluated.
    pub fitness: f64,
}

impl Default for Individual {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl Individual {
    /// Wraps entries into an unevaluated individual.
    pub fn new(entries: Vec<ScheduleEntry>) -> Self {
        Self {
            entries,
            fitness: f64::NEG_INFINITY,
        }
    }

    /// Whether the fitness has been computed since the last change.
    pub fn is_evaluated(&self) -> bool {
        self.fitness.is_finite()
    }

    /// Marks the individual as changed.
    pub fn invalidate(&mut self) {
        self.fitness = f64::NEG_INFINITY;
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries of one batch.
    pub fn batch_entries(&self, batch: BatchId) -> impl Iterator<Item = &ScheduleEntry> {
        self.entries.iter().filter(move |e| e.batch == batch)
    }

    /// Entry indices grouped by (batch, subject), in entry order.
    pub fn groups(&self) -> BTreeMap<(BatchId, SubjectId), Vec<usize>> {
        let mut groups: BTreeMap<(BatchId, SubjectId), Vec<usize>> = BTreeMap::new();
        for (i, e) in self.entries.iter().enumerate() {
            groups.entry((e.batch, e.subject)).or_default().push(i);
        }
        groups
    }

    /// Number of classes for (batch, subject).
    pub fn count(&self, batch: BatchId, subject: SubjectId) -> usize {
        self.entries
            .iter()
            .filter(|e| e.batch == batch && e.subject == subject)
            .count()
    }

    /// Per-day class counts for (batch, subject), indexed by [`Day::index`](crate::models::Day::index).
    pub fn day_counts(&self, batch: BatchId, subject: SubjectId) -> [u32; DAYS_PER_WEEK] {
        let mut counts = [0u32; DAYS_PER_WEEK];
        for e in &self.entries {
            if e.batch == batch && e.subject == subject {
                counts[e.slot.day.index()] += 1;
            }
        }
        counts
    }

    /// Distinct occupied slots of one batch.
    pub fn occupied_slots(&self, batch: BatchId) -> BTreeSet<Slot> {
        self.batch_entries(batch).map(|e| e.slot).collect()
    }

    /// Fraction of entries that differ from `other`, in `0.0..=1.0`.
    ///
    /// Entries are compared by (batch, subject, teacher, classroom, slot)
    /// as multisets, so order does not matter.
    pub fn difference_ratio(&self, other: &Individual) -> f64 {
        let longest = self.len().max(other.len());
        if longest == 0 {
            return 0.0;
        }
        let mut counts: BTreeMap<_, i64> = BTreeMap::new();
        for e in &self.entries {
            *counts.entry(e.signature()).or_insert(0) += 1;
        }
        let mut shared = 0usize;
        for e in &other.entries {
            if let Some(c) = counts.get_mut(&e.signature()) {
                if *c > 0 {
                    *c -= 1;
                    shared += 1;
                }
            }
        }
        1.0 - shared as f64 / longest as f64
    }

    /// Day × period view of one batch. Cells hold entry indices.
    pub fn batch_grid(&self, batch: BatchId) -> [[Option<usize>; PERIODS_PER_DAY]; DAYS_PER_WEEK] {
        let mut grid = [[None; PERIODS_PER_DAY]; DAYS_PER_WEEK];
        for (i, e) in self.entries.iter().enumerate() {
            if e.batch == batch {
                let cell = &mut grid[e.slot.day.index()][e.slot.period.index()];
                if cell.is_none() {
                    *cell = Some(i);
                }
            }
        }
        grid
    }
}
