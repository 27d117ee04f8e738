//! Slot-preference constraints and fixed reservations.
//!
//! Constraints are soft: construction satisfies them opportunistically and
//! fitness rewards them, but they never force a subject past its quotas.
//! Reservations are blocks removed from a batch's assignable grid before
//! generation starts.

use serde::{Deserialize, Serialize};

use super::{BatchId, ClassroomId, Day, FacultyId, Period, Slot, SubjectId};

/// A slot preference binding one resource to one (day, period) for a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Constraint {
    /// Pin one class of `subject` to the slot.
    #[serde(rename = "subject_slot_preference")]
    SubjectSlot {
        batch: BatchId,
        subject: SubjectId,
        day: Day,
        period: Period,
    },

    /// The batch should sit in `classroom` during the slot.
    #[serde(rename = "classroom_preference")]
    ClassroomSlot {
        batch: BatchId,
        classroom: ClassroomId,
        day: Day,
        period: Period,
    },

    /// `teacher` prefers teaching the batch during the slot.
    #[serde(rename = "teacher_slot_preference")]
    TeacherSlot {
        batch: BatchId,
        teacher: FacultyId,
        day: Day,
        period: Period,
    },
}

impl Constraint {
    /// Creates a subject-slot preference.
    pub fn subject_slot(batch: BatchId, subject: SubjectId, slot: Slot) -> Self {
        Self::SubjectSlot {
            batch,
            subject,
            day: slot.day,
            period: slot.period,
        }
    }

    /// Creates a classroom-slot preference.
    pub fn classroom_slot(batch: BatchId, classroom: ClassroomId, slot: Slot) -> Self {
        Self::ClassroomSlot {
            batch,
            classroom,
            day: slot.day,
            period: slot.period,
        }
    }

    /// Creates a teacher-slot preference.
    pub fn teacher_slot(batch: BatchId, teacher: FacultyId, slot: Slot) -> Self {
        Self::TeacherSlot {
            batch,
            teacher,
            day: slot.day,
            period: slot.period,
        }
    }

    /// Batch the constraint applies to.
    pub fn batch(&self) -> BatchId {
        match self {
            Self::SubjectSlot { batch, .. }
            | Self::ClassroomSlot { batch, .. }
            | Self::TeacherSlot { batch, .. } => *batch,
        }
    }

    /// Slot the constraint refers to.
    pub fn slot(&self) -> Slot {
        match self {
            Self::SubjectSlot { day, period, .. }
            | Self::ClassroomSlot { day, period, .. }
            | Self::TeacherSlot { day, period, .. } => Slot::new(*day, *period),
        }
    }
}

/// What a reservation blocks the slots for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReservationKind {
    /// No class at all.
    LunchBreak,
    /// One class of `subject` at each reserved slot.
    FixedSlot { subject: SubjectId },
}

/// A pre-blocked (batch, day, periods) block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedReservation {
    pub batch: BatchId,
    pub day: Day,
    pub periods: Vec<Period>,
    pub kind: ReservationKind,
}

impl FixedReservation {
    /// Creates a lunch break.
    pub fn lunch_break(batch: BatchId, day: Day, periods: Vec<Period>) -> Self {
        Self {
            batch,
            day,
            periods,
            kind: ReservationKind::LunchBreak,
        }
    }

    /// Creates a fixed subject slot.
    pub fn fixed_slot(batch: BatchId, subject: SubjectId, day: Day, periods: Vec<Period>) -> Self {
        Self {
            batch,
            day,
            periods,
            kind: ReservationKind::FixedSlot { subject },
        }
    }

    /// Reserved slots.
    pub fn slots(&self) -> impl Iterator<Item = Slot> + '_ {
        self.periods.iter().map(move |&p| Slot::new(self.day, p))
    }
}
