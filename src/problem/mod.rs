//! Domain model loader.
//!
//! Converts an externally supplied [`ProblemInput`] snapshot into the
//! in-memory [`TimetableProblem`] the optimizer works on: per-batch plans
//! (subjects with their teachers, blocked slots, fixed placements) plus
//! the [`ConstraintIndex`].
//!
//! Dangling references are skipped and logged, never fatal.

mod index;

pub use index::{ConstraintIndex, SlotDirective, SubjectQuota};

use std::collections::{BTreeMap, BTreeSet};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::TimetableError;
use crate::models::{
    Batch, BatchId, Classroom, ClassroomId, Constraint, Faculty, FacultyId, FixedReservation,
    ReservationKind, Slot, Subject, SubjectId,
};

/// Raw input snapshot as handed over by the storage layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProblemInput {
    #[serde(default)]
    pub batches: Vec<Batch>,
    #[serde(default)]
    pub subjects: Vec<Subject>,
    #[serde(default)]
    pub faculty: Vec<Faculty>,
    #[serde(default)]
    pub classrooms: Vec<Classroom>,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
    #[serde(default)]
    pub reservations: Vec<FixedReservation>,
}

impl ProblemInput {
    /// Creates an empty input.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a batch.
    pub fn with_batch(mut self, batch: Batch) -> Self {
        self.batches.push(batch);
        self
    }

    /// Adds a subject.
    pub fn with_subject(mut self, subject: Subject) -> Self {
        self.subjects.push(subject);
        self
    }

    /// Adds a faculty member.
    pub fn with_faculty(mut self, faculty: Faculty) -> Self {
        self.faculty.push(faculty);
        self
    }

    /// Adds a classroom.
    pub fn with_classroom(mut self, classroom: Classroom) -> Self {
        self.classrooms.push(classroom);
        self
    }

    /// Adds a constraint.
    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Adds a fixed reservation.
    pub fn with_reservation(mut self, reservation: FixedReservation) -> Self {
        self.reservations.push(reservation);
        self
    }
}

/// Which batches a run optimizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// One batch; output is a flat entry list.
    Single(BatchId),
    /// Every batch in the input; output is keyed by batch.
    AllBatches,
}

/// A subject a batch attends, with its resolved teacher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedSubject {
    pub subject: SubjectId,
    pub teacher: FacultyId,
}

/// Everything the optimizer needs to know about one active batch.
#[derive(Debug, Clone)]
pub struct BatchPlan {
    pub id: BatchId,
    pub name: String,
    /// Subjects with a valid teacher, in input order.
    pub subjects: Vec<PlannedSubject>,
    /// Allowed classrooms that exist. Empty = unrestricted.
    pub allowed_classrooms: Vec<ClassroomId>,
    /// Slots removed from free assignment (lunch breaks and fixed slots).
    pub blocked: BTreeSet<Slot>,
    /// Fixed subject placements, in reservation order.
    pub fixed: Vec<(SubjectId, Slot)>,
}

impl BatchPlan {
    /// Teacher of `subject` for this batch.
    pub fn teacher_for(&self, subject: SubjectId) -> Option<FacultyId> {
        self.subjects
            .iter()
            .find(|p| p.subject == subject)
            .map(|p| p.teacher)
    }

    /// Whether `slot` is reserved.
    #[inline]
    pub fn is_blocked(&self, slot: Slot) -> bool {
        self.blocked.contains(&slot)
    }

    /// Slots open to free assignment.
    pub fn assignable_slots(&self) -> impl Iterator<Item = Slot> + '_ {
        Slot::all().filter(move |s| !self.blocked.contains(s))
    }
}

/// In-memory problem for one generation request.
#[derive(Debug, Clone)]
pub struct TimetableProblem {
    mode: RunMode,
    plans: Vec<BatchPlan>,
    plan_index: BTreeMap<BatchId, usize>,
    subjects: BTreeMap<SubjectId, Subject>,
    classrooms: Vec<ClassroomId>,
    index: ConstraintIndex,
}

impl TimetableProblem {
    /// Loads a problem from an input snapshot.
    ///
    /// # Errors
    /// [`TimetableError::UnknownBatch`] if single-batch mode names a batch
    /// absent from the input, [`TimetableError::NoBatches`] if the active
    /// batch set is empty.
    pub fn load(input: &ProblemInput, mode: RunMode) -> Result<Self, TimetableError> {
        let subjects: BTreeMap<SubjectId, Subject> =
            input.subjects.iter().map(|s| (s.id, s.clone())).collect();
        let faculty: BTreeSet<FacultyId> = input.faculty.iter().map(|f| f.id).collect();
        let classroom_set: BTreeSet<ClassroomId> = input.classrooms.iter().map(|c| c.id).collect();
        let known_batches: BTreeSet<BatchId> = input.batches.iter().map(|b| b.id).collect();

        let mut classrooms = Vec::new();
        for c in &input.classrooms {
            if !classrooms.contains(&c.id) {
                classrooms.push(c.id);
            }
        }

        let active: Vec<&Batch> = match mode {
            RunMode::Single(id) => {
                let batch = input
                    .batches
                    .iter()
                    .find(|b| b.id == id)
                    .ok_or(TimetableError::UnknownBatch(id))?;
                vec![batch]
            }
            RunMode::AllBatches => {
                let mut seen = BTreeSet::new();
                input.batches.iter().filter(|b| seen.insert(b.id)).collect()
            }
        };
        if active.is_empty() {
            return Err(TimetableError::NoBatches);
        }

        let mut plans: Vec<BatchPlan> = active
            .iter()
            .map(|b| plan_batch(b, &subjects, &faculty, &classroom_set))
            .collect();

        let plan_index: BTreeMap<BatchId, usize> =
            plans.iter().enumerate().map(|(i, p)| (p.id, i)).collect();

        for reservation in &input.reservations {
            let Some(&pi) = plan_index.get(&reservation.batch) else {
                if !known_batches.contains(&reservation.batch) {
                    warn!("skipping reservation for unknown {}", reservation.batch);
                }
                continue;
            };
            apply_reservation(&mut plans[pi], reservation);
        }

        let index = ConstraintIndex::build(
            &input.subjects,
            &plans,
            &input.constraints,
            &known_batches,
            &classroom_set,
            &faculty,
        );

        Ok(Self {
            mode,
            plans,
            plan_index,
            subjects,
            classrooms,
            index,
        })
    }

    /// Run mode this problem was loaded for.
    pub fn mode(&self) -> RunMode {
        self.mode
    }

    /// Active batch plans in input order.
    pub fn plans(&self) -> &[BatchPlan] {
        &self.plans
    }

    /// Plan of one active batch.
    pub fn plan(&self, batch: BatchId) -> Option<&BatchPlan> {
        self.plan_index.get(&batch).map(|&i| &self.plans[i])
    }

    /// Subject record.
    pub fn subject(&self, id: SubjectId) -> Option<&Subject> {
        self.subjects.get(&id)
    }

    /// Every classroom in input order.
    pub fn classrooms(&self) -> &[ClassroomId] {
        &self.classrooms
    }

    /// Classrooms a batch may pick from.
    pub fn candidate_classrooms(&self, batch: BatchId) -> &[ClassroomId] {
        let allowed = self.index.allowed_classrooms(batch);
        if allowed.is_empty() {
            &self.classrooms
        } else {
            allowed
        }
    }

    /// Constraint index.
    pub fn index(&self) -> &ConstraintIndex {
        &self.index
    }

    /// Whether `slot` is reserved for `batch`.
    pub fn is_blocked(&self, batch: BatchId, slot: Slot) -> bool {
        self.plan(batch).is_some_and(|p| p.is_blocked(slot))
    }

    /// Total classes required across the active batches.
    pub fn required_classes(&self) -> u32 {
        self.plans
            .iter()
            .flat_map(|p| p.subjects.iter())
            .filter_map(|ps| self.index.quota(ps.subject))
            .map(|q| q.weekly_required)
            .sum()
    }
}

fn plan_batch(
    batch: &Batch,
    subjects: &BTreeMap<SubjectId, Subject>,
    faculty: &BTreeSet<FacultyId>,
    classrooms: &BTreeSet<ClassroomId>,
) -> BatchPlan {
    let mut planned = Vec::new();
    for &subject in &batch.subjects {
        if planned.iter().any(|p: &PlannedSubject| p.subject == subject) {
            continue;
        }
        if !subjects.contains_key(&subject) {
            warn!("{}: skipping unknown {subject}", batch.id);
            continue;
        }
        let Some(teacher) = batch.teacher_for(subject) else {
            warn!("{}: skipping {subject}, no teacher assigned", batch.id);
            continue;
        };
        if !faculty.contains(&teacher) {
            warn!("{}: skipping {subject}, unknown {teacher}", batch.id);
            continue;
        }
        planned.push(PlannedSubject { subject, teacher });
    }

    let mut allowed = Vec::new();
    for &c in &batch.allowed_classrooms {
        if !classrooms.contains(&c) {
            warn!("{}: ignoring unknown allowed {c}", batch.id);
        } else if !allowed.contains(&c) {
            allowed.push(c);
        }
    }

    BatchPlan {
        id: batch.id,
        name: batch.name.clone(),
        subjects: planned,
        allowed_classrooms: allowed,
        blocked: BTreeSet::new(),
        fixed: Vec::new(),
    }
}

fn apply_reservation(plan: &mut BatchPlan, reservation: &FixedReservation) {
    match reservation.kind {
        ReservationKind::LunchBreak => {
            plan.blocked.extend(reservation.slots());
        }
        ReservationKind::FixedSlot { subject } => {
            if plan.teacher_for(subject).is_none() {
                warn!(
                    "{}: skipping fixed slot for {subject}, not scheduled for this batch",
                    plan.id
                );
                return;
            }
            for slot in reservation.slots() {
                if plan.blocked.insert(slot) {
                    plan.fixed.push((subject, slot));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::models::{Day, Period};

    #[test]
    fn test_load_all_batches() {
        let input = fixtures::restricted_input();
        let problem = TimetableProblem::load(&input, RunMode::AllBatches).unwrap();
        assert_eq!(problem.plans().len(), 2);
        assert_eq!(problem.classrooms(), &[ClassroomId(1), ClassroomId(2)]);
        assert_eq!(problem.candidate_classrooms(BatchId(1)), &[ClassroomId(1)]);
        assert_eq!(problem.candidate_classrooms(BatchId(2)).len(), 2);
    }

    #[test]
    fn test_load_single_batch() {
        let input = fixtures::restricted_input();
        let problem = TimetableProblem::load(&input, RunMode::Single(BatchId(2))).unwrap();
        assert_eq!(problem.plans().len(), 1);
        assert!(problem.plan(BatchId(1)).is_none());
    }

    #[test]
    fn test_unknown_single_batch_is_error() {
        let input = fixtures::single_batch_input();
        let err = TimetableProblem::load(&input, RunMode::Single(BatchId(9))).unwrap_err();
        assert!(matches!(err, TimetableError::UnknownBatch(BatchId(9))));
    }

    #[test]
    fn test_empty_input_is_error() {
        let err = TimetableProblem::load(&ProblemInput::new(), RunMode::AllBatches).unwrap_err();
        assert!(matches!(err, TimetableError::NoBatches));
    }

    #[test]
    fn test_dangling_subject_skipped() {
        let input = ProblemInput::new()
            .with_subject(Subject::new(1, 2, 1))
            .with_faculty(Faculty::new(10))
            .with_classroom(Classroom::new(1))
            .with_batch(
                Batch::new(1)
                    .with_subject(SubjectId(1), FacultyId(10))
                    .with_subject(SubjectId(2), FacultyId(10))
                    .with_subject(SubjectId(1), FacultyId(10)),
            )
            .with_batch(Batch::new(2).with_subject(SubjectId(1), FacultyId(99)));
        let problem = TimetableProblem::load(&input, RunMode::AllBatches).unwrap();

        let plan = problem.plan(BatchId(1)).unwrap();
        assert_eq!(plan.subjects.len(), 1);
        assert_eq!(plan.subjects[0].subject, SubjectId(1));
        assert!(problem.plan(BatchId(2)).unwrap().subjects.is_empty());
        assert_eq!(problem.required_classes(), 2);
    }

    #[test]
    fn test_reservations_block_slots() {
        let lunch = Slot::new(Day::Monday, Period::ALL[3]);
        let fixed = Slot::new(Day::Tuesday, Period::ALL[0]);
        let input = fixtures::single_batch_input()
            .with_reservation(FixedReservation::lunch_break(BatchId(1), Day::Monday, vec![Period::ALL[3]]))
            .with_reservation(FixedReservation::fixed_slot(
                BatchId(1),
                SubjectId(1),
                Day::Tuesday,
                vec![Period::ALL[0]],
            ))
            .with_reservation(FixedReservation::fixed_slot(
                BatchId(1),
                SubjectId(33),
                Day::Tuesday,
                vec![Period::ALL[1]],
            ));
        let problem = TimetableProblem::load(&input, RunMode::AllBatches).unwrap();
        let plan = problem.plan(BatchId(1)).unwrap();

        assert!(plan.is_blocked(lunch));
        assert!(plan.is_blocked(fixed));
        assert!(!plan.is_blocked(Slot::new(Day::Tuesday, Period::ALL[1])));
        assert_eq!(plan.fixed, vec![(SubjectId(1), fixed)]);
        assert_eq!(plan.assignable_slots().count(), 34);
    }

    #[test]
    fn test_input_json() {
        let input = fixtures::single_batch_input();
        let json = serde_json::to_string(&input).unwrap();
        let back: ProblemInput = serde_json::from_str(&json).unwrap();
        assert_eq!(back.batches.len(), 1);
        assert_eq!(back.subjects.len(), 2);

        let mode: RunMode = serde_json::from_str(r#"{"single": 3}"#).unwrap();
        assert_eq!(mode, RunMode::Single(BatchId(3)));
        let mode: RunMode = serde_json::from_str(r#""all_batches""#).unwrap();
        assert_eq!(mode, RunMode::AllBatches);
    }
}
