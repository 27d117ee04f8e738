//! Schedule entries, the atomic output unit.

use serde::{Deserialize, Serialize};

use super::{BatchId, ClassroomId, FacultyId, Slot, SubjectId};

/// Transparency flags recorded on each entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryFlags {
    /// Matches a slot preference or directive. Fixed entries are not counted.
    pub preferred: bool,
    /// Placed from a fixed-slot reservation; never moved.
    pub fixed: bool,
    /// The classroom was taken although the batch's allowed/free set was exhausted.
    pub fallback_classroom: bool,
    pub teacher_collision: bool,
    pub classroom_collision: bool,
    pub batch_collision: bool,
}

impl EntryFlags {
    /// Whether any collision flag is set.
    pub fn has_collision(&self) -> bool {
        self.teacher_collision || self.classroom_collision || self.batch_collision
    }
}

/// One class: a batch attends a subject taught by a teacher in a classroom at a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub batch: BatchId,
    pub subject: SubjectId,
    pub teacher: FacultyId,
    pub classroom: ClassroomId,
    pub slot: Slot,
    #[serde(default)]
    pub flags: EntryFlags,
}

impl ScheduleEntry {
    /// Creates an entry with cleared flags.
    pub fn new(
        batch: BatchId,
        subject: SubjectId,
        teacher: FacultyId,
        classroom: ClassroomId,
        slot: Slot,
    ) -> Self {
        Self {
            batch,
            subject,
            teacher,
            classroom,
            slot,
            flags: EntryFlags::default(),
        }
    }

    /// Marks the entry as preference-matching.
    pub fn preferred(mut self) -> Self {
        self.flags.preferred = true;
        self
    }

    /// Marks the entry as placed by a fixed reservation.
    pub fn fixed(mut self) -> Self {
        self.flags.fixed = true;
        self
    }

    /// Identity of the entry ignoring flags, used for set comparisons.
    #[inline]
    pub fn signature(&self) -> (BatchId, SubjectId, FacultyId, ClassroomId, Slot) {
        (self.batch, self.subject, self.teacher, self.classroom, self.slot)
    }
}
