//! Constraint index.
//!
//! Precomputes everything the optimizer looks up in its hot loops:
//! per-subject quotas, single-slot directives, classroom/teacher slot
//! preferences and per-batch allowed classroom sets.
//!
//! Constraints that point at unknown resources are skipped with a warning.
//! Nothing here ever fails.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, warn};

use super::BatchPlan;
use crate::models::{
    BatchId, ClassroomId, Constraint, FacultyId, ScheduleEntry, Slot, Subject, SubjectId,
};

/// Weekly and daily class quotas of a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubjectQuota {
    /// Classes required per week.
    pub weekly_required: u32,
    /// Maximum classes per day.
    pub daily_max: u32,
}

/// "Place one class of this subject here" for one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SlotDirective {
    pub batch: BatchId,
    pub subject: SubjectId,
    pub slot: Slot,
}

/// Lookup structures derived from subjects, constraints and batch plans.
#[derive(Debug, Clone, Default)]
pub struct ConstraintIndex {
    quotas: BTreeMap<SubjectId, SubjectQuota>,
    directives: Vec<SlotDirective>,
    directive_set: BTreeSet<(BatchId, SubjectId, Slot)>,
    classroom_slot_prefs: BTreeMap<(BatchId, Slot), Vec<ClassroomId>>,
    teacher_slot_prefs: BTreeMap<(BatchId, Slot), Vec<FacultyId>>,
    allowed_classrooms: BTreeMap<BatchId, Vec<ClassroomId>>,
}

impl ConstraintIndex {
    /// Builds the index.
    ///
    /// `known_batches` lists every batch present in the input, active or not,
    /// so that constraints on inactive batches are skipped quietly while
    /// constraints on nonexistent batches are reported.
    pub fn build(
        subjects: &[Subject],
        plans: &[BatchPlan],
        constraints: &[Constraint],
        known_batches: &BTreeSet<BatchId>,
        classrooms: &BTreeSet<ClassroomId>,
        faculty: &BTreeSet<FacultyId>,
    ) -> Self {
        let mut index = Self::default();

        for subject in subjects {
            index.quotas.insert(
                subject.id,
                SubjectQuota {
                    weekly_required: subject.classes_per_week,
                    daily_max: subject.max_classes_per_day,
                },
            );
        }

        for plan in plans {
            if !plan.allowed_classrooms.is_empty() {
                index
                    .allowed_classrooms
                    .insert(plan.id, plan.allowed_classrooms.clone());
            }
        }

        let plan_by_id: BTreeMap<BatchId, &BatchPlan> = plans.iter().map(|p| (p.id, p)).collect();

        for constraint in constraints {
            let batch = constraint.batch();
            let Some(plan) = plan_by_id.get(&batch) else {
                if known_batches.contains(&batch) {
                    debug!("constraint for inactive {batch} ignored");
                } else {
                    warn!("skipping constraint for unknown {batch}");
                }
                continue;
            };
            let slot = constraint.slot();

            match *constraint {
                Constraint::SubjectSlot { subject, .. } => {
                    if plan.teacher_for(subject).is_none() {
                        warn!("skipping subject-slot constraint: {subject} is not scheduled for {batch}");
                        continue;
                    }
                    if index.directive_set.insert((batch, subject, slot)) {
                        index.directives.push(SlotDirective { batch, subject, slot });
                    }
                }
                Constraint::ClassroomSlot { classroom, .. } => {
                    if !classrooms.contains(&classroom) {
                        warn!("skipping classroom-slot constraint: unknown {classroom}");
                        continue;
                    }
                    let prefs = index.classroom_slot_prefs.entry((batch, slot)).or_default();
                    if !prefs.contains(&classroom) {
                        prefs.push(classroom);
                    }
                }
                Constraint::TeacherSlot { teacher, .. } => {
                    if !faculty.contains(&teacher) {
                        warn!("skipping teacher-slot constraint: unknown {teacher}");
                        continue;
                    }
                    let prefs = index.teacher_slot_prefs.entry((batch, slot)).or_default();
                    if !prefs.contains(&teacher) {
                        prefs.push(teacher);
                    }
                }
            }
        }

        index
    }

    /// Quota of a subject.
    pub fn quota(&self, subject: SubjectId) -> Option<SubjectQuota> {
        self.quotas.get(&subject).copied()
    }

    /// All single-slot directives in input order.
    pub fn directives(&self) -> &[SlotDirective] {
        &self.directives
    }

    /// Directives of one batch.
    pub fn directives_for(&self, batch: BatchId) -> impl Iterator<Item = &SlotDirective> {
        self.directives.iter().filter(move |d| d.batch == batch)
    }

    /// Directive slots for one (batch, subject).
    pub fn directive_slots(&self, batch: BatchId, subject: SubjectId) -> Vec<Slot> {
        self.directives
            .iter()
            .filter(|d| d.batch == batch && d.subject == subject)
            .map(|d| d.slot)
            .collect()
    }

    /// Whether a directive pins (batch, subject) to `slot`.
    pub fn has_directive(&self, batch: BatchId, subject: SubjectId, slot: Slot) -> bool {
        self.directive_set.contains(&(batch, subject, slot))
    }

    /// Preferred classrooms of a batch at a slot.
    pub fn classroom_prefs(&self, batch: BatchId, slot: Slot) -> &[ClassroomId] {
        self.classroom_slot_prefs
            .get(&(batch, slot))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every classroom-slot preference as (batch, slot, classroom).
    pub fn classroom_slot_prefs(&self) -> impl Iterator<Item = (BatchId, Slot, ClassroomId)> + '_ {
        self.classroom_slot_prefs
            .iter()
            .flat_map(|(&(b, s), cs)| cs.iter().map(move |&c| (b, s, c)))
    }

    /// Preferred teachers of a batch at a slot.
    pub fn teacher_prefs(&self, batch: BatchId, slot: Slot) -> &[FacultyId] {
        self.teacher_slot_prefs
            .get(&(batch, slot))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every teacher-slot preference as (batch, slot, teacher).
    pub fn teacher_slot_prefs(&self) -> impl Iterator<Item = (BatchId, Slot, FacultyId)> + '_ {
        self.teacher_slot_prefs
            .iter()
            .flat_map(|(&(b, s), ts)| ts.iter().map(move |&t| (b, s, t)))
    }

    /// Slots where `teacher` prefers teaching `batch`, in grid order.
    pub fn teacher_pref_slots(&self, batch: BatchId, teacher: FacultyId) -> Vec<Slot> {
        self.teacher_slot_prefs
            .iter()
            .filter(|(&(b, _), ts)| b == batch && ts.contains(&teacher))
            .map(|(&(_, s), _)| s)
            .collect()
    }

    /// Allowed classrooms of a batch. Empty = unrestricted.
    pub fn allowed_classrooms(&self, batch: BatchId) -> &[ClassroomId] {
        self.allowed_classrooms
            .get(&batch)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whether the batch is restricted to a classroom subset.
    pub fn is_restricted(&self, batch: BatchId) -> bool {
        self.allowed_classrooms.contains_key(&batch)
    }

    /// Whether `classroom` is usable by `batch`.
    pub fn is_classroom_allowed(&self, batch: BatchId, classroom: ClassroomId) -> bool {
        match self.allowed_classrooms.get(&batch) {
            Some(allowed) => allowed.contains(&classroom),
            None => true,
        }
    }

    /// Whether an entry matches any known slot preference.
    pub fn matches_preference(&self, entry: &ScheduleEntry) -> bool {
        self.has_directive(entry.batch, entry.subject, entry.slot)
            || self.classroom_prefs(entry.batch, entry.slot).contains(&entry.classroom)
            || self.teacher_prefs(entry.batch, entry.slot).contains(&entry.teacher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::models::{Day, Period};
    use crate::problem::{RunMode, TimetableProblem};

    fn monday(p: usize) -> Slot {
        Slot::new(Day::Monday, Period::ALL[p - 1])
    }

    #[test]
    fn test_quotas_and_directives() {
        let input = fixtures::single_batch_input()
            .with_constraint(Constraint::subject_slot(BatchId(1), SubjectId(1), monday(1)))
            .with_constraint(Constraint::subject_slot(BatchId(1), SubjectId(1), monday(1)));
        let problem = TimetableProblem::load(&input, RunMode::AllBatches).unwrap();
        let index = problem.index();

        let q = index.quota(SubjectId(1)).unwrap();
        assert_eq!(q.weekly_required, 2);
        assert_eq!(q.daily_max, 1);
        // Duplicate directive collapsed
        assert_eq!(index.directives().len(), 1);
        assert!(index.has_directive(BatchId(1), SubjectId(1), monday(1)));
        assert_eq!(index.directive_slots(BatchId(1), SubjectId(1)), vec![monday(1)]);
    }

    #[test]
    fn test_dangling_references_skipped() {
        let input = fixtures::single_batch_input()
            .with_constraint(Constraint::subject_slot(BatchId(99), SubjectId(1), monday(1)))
            .with_constraint(Constraint::subject_slot(BatchId(1), SubjectId(42), monday(2)))
            .with_constraint(Constraint::classroom_slot(BatchId(1), ClassroomId(77), monday(3)))
            .with_constraint(Constraint::teacher_slot(BatchId(1), FacultyId(55), monday(4)));
        let problem = TimetableProblem::load(&input, RunMode::AllBatches).unwrap();
        let index = problem.index();

        assert!(index.directives().is_empty());
        assert!(index.classroom_prefs(BatchId(1), monday(3)).is_empty());
        assert!(index.teacher_prefs(BatchId(1), monday(4)).is_empty());
    }

    #[test]
    fn test_preferences_lookup() {
        let input = fixtures::single_batch_input()
            .with_constraint(Constraint::classroom_slot(BatchId(1), ClassroomId(2), monday(2)))
            .with_constraint(Constraint::teacher_slot(BatchId(1), FacultyId(11), monday(5)));
        let problem = TimetableProblem::load(&input, RunMode::AllBatches).unwrap();
        let index = problem.index();

        assert_eq!(index.classroom_prefs(BatchId(1), monday(2)), &[ClassroomId(2)]);
        assert_eq!(index.teacher_pref_slots(BatchId(1), FacultyId(11)), vec![monday(5)]);

        let entry = ScheduleEntry::new(BatchId(1), SubjectId(2), FacultyId(11), ClassroomId(1), monday(5));
        assert!(index.matches_preference(&entry));
        let entry = ScheduleEntry::new(BatchId(1), SubjectId(2), FacultyId(11), ClassroomId(1), monday(6));
        assert!(!index.matches_preference(&entry));
    }

    #[test]
    fn test_allowed_classrooms() {
        let input = fixtures::restricted_input();
        let problem = TimetableProblem::load(&input, RunMode::AllBatches).unwrap();
        let index = problem.index();

        assert!(index.is_restricted(BatchId(1)));
        assert!(index.is_classroom_allowed(BatchId(1), ClassroomId(1)));
        assert!(!index.is_classroom_allowed(BatchId(1), ClassroomId(2)));
        assert!(!index.is_restricted(BatchId(2)));
        assert!(index.is_classroom_allowed(BatchId(2), ClassroomId(2)));
    }
}
