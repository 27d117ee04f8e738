//! Input validation for timetabling problems.
//!
//! Checks structural integrity of an input snapshot before scheduling.
//! Detects:
//! - Duplicate IDs
//! - References to unknown subjects, faculty, classrooms or batches
//! - Batch subjects without an assigned teacher
//! - Quotas that are zero or unreachable under the daily cap
//! - Batches whose weekly load exceeds their free grid
//!
//! Validation is advisory: the scheduler logs every issue and still runs,
//! skipping whatever cannot be resolved.

use std::collections::{BTreeMap, BTreeSet};

use crate::models::{
    BatchId, Constraint, ReservationKind, Slot, SubjectId, DAYS_PER_WEEK, GRID_SIZE,
};
use crate::problem::ProblemInput;

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two entities share the same ID.
    DuplicateId,
    /// A record references an entity that doesn't exist.
    InvalidReference,
    /// A batch subject has no teacher.
    MissingTeacher,
    /// A subject requires no classes, or allows none per day.
    ZeroQuota,
    /// A subject's weekly quota cannot fit under its daily cap.
    UnreachableQuota,
    /// A batch needs more classes than its free grid holds.
    CapacityExceeded,
    /// A reservation covers no periods.
    EmptyReservation,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// Validates a timetabling input snapshot.
///
/// Checks:
/// 1. No duplicate batch, subject, faculty or classroom IDs
/// 2. Every subject requires at least one class and allows at least one per day
/// 3. No subject requires more classes than six days of its daily cap
/// 4. Every batch subject exists and has a known teacher
/// 5. Every allowed classroom exists
/// 6. Every constraint and reservation targets a known batch and known resources
/// 7. No batch requires more classes than its grid minus lunch breaks
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_input(input: &ProblemInput) -> ValidationResult {
    let mut errors = Vec::new();

    let batch_ids = collect_ids(input.batches.iter().map(|b| b.id), "batch", &mut errors);
    let subject_ids = collect_ids(input.subjects.iter().map(|s| s.id), "subject", &mut errors);
    let faculty_ids = collect_ids(input.faculty.iter().map(|f| f.id), "faculty", &mut errors);
    let classroom_ids =
        collect_ids(input.classrooms.iter().map(|c| c.id), "classroom", &mut errors);

    let mut weekly: BTreeMap<SubjectId, u32> = BTreeMap::new();
    for s in &input.subjects {
        weekly.insert(s.id, s.classes_per_week);
        if s.classes_per_week == 0 || s.max_classes_per_day == 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::ZeroQuota,
                format!(
                    "{} requires {} classes per week, at most {} per day",
                    s.id, s.classes_per_week, s.max_classes_per_day
                ),
            ));
        } else if s.classes_per_week > s.max_classes_per_day * DAYS_PER_WEEK as u32 {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnreachableQuota,
                format!(
                    "{} requires {} classes per week but allows only {} per day",
                    s.id, s.classes_per_week, s.max_classes_per_day
                ),
            ));
        }
    }

    for batch in &input.batches {
        for &subject in &batch.subjects {
            if !subject_ids.contains(&subject) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidReference,
                    format!("{} references unknown {subject}", batch.id),
                ));
                continue;
            }
            match batch.teacher_for(subject) {
                None => errors.push(ValidationError::new(
                    ValidationErrorKind::MissingTeacher,
                    format!("{} has no teacher for {subject}", batch.id),
                )),
                Some(t) if !faculty_ids.contains(&t) => errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidReference,
                    format!("{} assigns unknown {t} to {subject}", batch.id),
                )),
                Some(_) => {}
            }
        }
        for &c in &batch.allowed_classrooms {
            if !classroom_ids.contains(&c) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidReference,
                    format!("{} allows unknown {c}", batch.id),
                ));
            }
        }
    }

    for constraint in &input.constraints {
        let batch = constraint.batch();
        if !batch_ids.contains(&batch) {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidReference,
                format!("constraint references unknown {batch}"),
            ));
            continue;
        }
        let missing = match *constraint {
            Constraint::SubjectSlot { subject, .. } => {
                (!subject_ids.contains(&subject)).then(|| subject.to_string())
            }
            Constraint::ClassroomSlot { classroom, .. } => {
                (!classroom_ids.contains(&classroom)).then(|| classroom.to_string())
            }
            Constraint::TeacherSlot { teacher, .. } => {
                (!faculty_ids.contains(&teacher)).then(|| teacher.to_string())
            }
        };
        if let Some(name) = missing {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidReference,
                format!("constraint for {batch} references unknown {name}"),
            ));
        }
    }

    let mut lunch: BTreeMap<BatchId, BTreeSet<Slot>> = BTreeMap::new();
    for r in &input.reservations {
        if !batch_ids.contains(&r.batch) {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidReference,
                format!("reservation references unknown {}", r.batch),
            ));
            continue;
        }
        if r.periods.is_empty() {
            errors.push(ValidationError::new(
                ValidationErrorKind::EmptyReservation,
                format!("reservation for {} on {} covers no periods", r.batch, r.day),
            ));
        }
        match r.kind {
            ReservationKind::LunchBreak => lunch.entry(r.batch).or_default().extend(r.slots()),
            ReservationKind::FixedSlot { subject } if !subject_ids.contains(&subject) => {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidReference,
                    format!("fixed slot for {} references unknown {subject}", r.batch),
                ));
            }
            ReservationKind::FixedSlot { .. } => {}
        }
    }

    for batch in &input.batches {
        let unique: BTreeSet<SubjectId> = batch.subjects.iter().copied().collect();
        let required: u32 = unique.iter().filter_map(|s| weekly.get(s)).sum();
        let free = GRID_SIZE - lunch.get(&batch.id).map_or(0, BTreeSet::len);
        if required as usize > free {
            errors.push(ValidationError::new(
                ValidationErrorKind::CapacityExceeded,
                format!(
                    "{} requires {required} classes per week but has only {free} free slots",
                    batch.id
                ),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn collect_ids<T: Ord + Copy + std::fmt::Display>(
    ids: impl Iterator<Item = T>,
    what: &str,
    errors: &mut Vec<ValidationError>,
) -> BTreeSet<T> {
    let mut seen = BTreeSet::new();
    for id in ids {
        if !seen.insert(id) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate {what} ID: {id}"),
            ));
        }
    }
    seen
}
