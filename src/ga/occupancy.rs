//! Resource occupancy maps.
//!
//! Counts how many entries hold each (teacher, slot), (classroom, slot)
//! and (batch, slot), plus per-classroom usage for load balancing.

use std::collections::HashMap;

use crate::models::{BatchId, ClassroomId, FacultyId, ScheduleEntry, Slot};

/// Occupancy counts over a set of entries.
#[derive(Debug, Clone, Default)]
pub struct Occupancy {
    teachers: HashMap<(FacultyId, Slot), usize>,
    classrooms: HashMap<(ClassroomId, Slot), usize>,
    batches: HashMap<(BatchId, Slot), usize>,
    classroom_usage: HashMap<ClassroomId, usize>,
}

impl Occupancy {
    /// Builds occupancy from all entries.
    pub fn from_entries(entries: &[ScheduleEntry]) -> Self {
        let mut occ = Self::default();
        for e in entries {
            occ.insert(e);
        }
        occ
    }

    /// Builds occupancy from all entries except the one at `skip`.
    pub fn excluding(entries: &[ScheduleEntry], skip: usize) -> Self {
        let mut occ = Self::default();
        for (i, e) in entries.iter().enumerate() {
            if i != skip {
                occ.insert(e);
            }
        }
        occ
    }

    /// Records an entry.
    pub fn insert(&mut self, e: &ScheduleEntry) {
        *self.teachers.entry((e.teacher, e.slot)).or_insert(0) += 1;
        *self.classrooms.entry((e.classroom, e.slot)).or_insert(0) += 1;
        *self.batches.entry((e.batch, e.slot)).or_insert(0) += 1;
        *self.classroom_usage.entry(e.classroom).or_insert(0) += 1;
    }

    /// Forgets an entry previously inserted.
    pub fn remove(&mut self, e: &ScheduleEntry) {
        decrement(&mut self.teachers, (e.teacher, e.slot));
        decrement(&mut self.classrooms, (e.classroom, e.slot));
        decrement(&mut self.batches, (e.batch, e.slot));
        decrement(&mut self.classroom_usage, e.classroom);
    }

    /// Entries held by `teacher` at `slot`.
    #[inline]
    pub fn teacher_count(&self, teacher: FacultyId, slot: Slot) -> usize {
        self.teachers.get(&(teacher, slot)).copied().unwrap_or(0)
    }

    /// Entries held in `classroom` at `slot`.
    #[inline]
    pub fn classroom_count(&self, classroom: ClassroomId, slot: Slot) -> usize {
        self.classrooms.get(&(classroom, slot)).copied().unwrap_or(0)
    }

    /// Entries attended by `batch` at `slot`.
    #[inline]
    pub fn batch_count(&self, batch: BatchId, slot: Slot) -> usize {
        self.batches.get(&(batch, slot)).copied().unwrap_or(0)
    }

    #[inline]
    pub fn teacher_busy(&self, teacher: FacultyId, slot: Slot) -> bool {
        self.teacher_count(teacher, slot) > 0
    }

    #[inline]
    pub fn classroom_busy(&self, classroom: ClassroomId, slot: Slot) -> bool {
        self.classroom_count(classroom, slot) > 0
    }

    #[inline]
    pub fn batch_busy(&self, batch: BatchId, slot: Slot) -> bool {
        self.batch_count(batch, slot) > 0
    }

    /// Total entries using `classroom` across the week.
    #[inline]
    pub fn classroom_usage(&self, classroom: ClassroomId) -> usize {
        self.classroom_usage.get(&classroom).copied().unwrap_or(0)
    }
}

fn decrement<K: std::hash::Hash + Eq>(map: &mut HashMap<K, usize>, key: K) {
    if let Some(n) = map.get_mut(&key) {
        *n = n.saturating_sub(1);
        if *n == 0 {
            map.remove(&key);
        }
    }
}
