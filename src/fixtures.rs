//! Shared sample inputs for unit tests.

use crate::models::{
    Batch, Classroom, ClassroomId, Day, Faculty, FacultyId, Period, Slot, Subject, SubjectId,
};
use crate::problem::ProblemInput;

pub(crate) fn slot(day: Day, period: u8) -> Slot {
    Slot::new(day, Period::ALL[(period - 1) as usize])
}

/// One batch, two subjects (2/week, max 1/day), two teachers, two classrooms.
pub(crate) fn single_batch_input() -> ProblemInput {
    ProblemInput::new()
        .with_subject(Subject::new(1, 2, 1).with_name("Algorithms"))
        .with_subject(Subject::new(2, 2, 1).with_name("Databases"))
        .with_faculty(Faculty::new(10).with_name("Dr. Rao"))
        .with_faculty(Faculty::new(11).with_name("Dr. Iyer"))
        .with_classroom(Classroom::new(1).with_name("LH-1"))
        .with_classroom(Classroom::new(2).with_name("LH-2"))
        .with_batch(
            Batch::new(1)
                .with_name("CSE-1")
                .with_subject(SubjectId(1), FacultyId(10))
                .with_subject(SubjectId(2), FacultyId(11)),
        )
}

/// Batch 1 restricted to classroom 1; batch 2 unrestricted.
pub(crate) fn restricted_input() -> ProblemInput {
    ProblemInput::new()
        .with_subject(Subject::new(1, 2, 1))
        .with_subject(Subject::new(2, 2, 1))
        .with_faculty(Faculty::new(10))
        .with_faculty(Faculty::new(11))
        .with_classroom(Classroom::new(1))
        .with_classroom(Classroom::new(2))
        .with_batch(
            Batch::new(1)
                .with_name("CSE-1")
                .with_subject(SubjectId(1), FacultyId(10))
                .with_allowed_classrooms(vec![ClassroomId(1)]),
        )
        .with_batch(
            Batch::new(2)
                .with_name("ECE-1")
                .with_subject(SubjectId(2), FacultyId(11)),
        )
}

/// Three batches sharing teachers, four subjects each, three classrooms.
pub(crate) fn multi_batch_input() -> ProblemInput {
    let mut input = ProblemInput::new();
    for s in 1..=4 {
        input = input.with_subject(Subject::new(s, 3, 1));
    }
    for f in 10..=13 {
        input = input.with_faculty(Faculty::new(f));
    }
    for c in 1..=3 {
        input = input.with_classroom(Classroom::new(c));
    }
    for b in 1..=3 {
        let mut batch = Batch::new(b);
        for s in 1..=4 {
            batch = batch.with_subject(SubjectId(s), FacultyId(9 + s));
        }
        input = input.with_batch(batch);
    }
    input
}

/// One teacher shared by two batches needing 20 classes each (max 4/day).
/// The teacher has only 36 slots, so collisions cannot all be avoided.
pub(crate) fn shared_teacher_input() -> ProblemInput {
    ProblemInput::new()
        .with_subject(Subject::new(1, 20, 4))
        .with_faculty(Faculty::new(10))
        .with_classroom(Classroom::new(1))
        .with_classroom(Classroom::new(2))
        .with_batch(Batch::new(1).with_subject(SubjectId(1), FacultyId(10)))
        .with_batch(Batch::new(2).with_subject(SubjectId(1), FacultyId(10)))
}
