//! Resource models: batches, subjects, faculty, classrooms.
//!
//! Every resource carries a stable integer identifier. Names are for
//! display only; the optimizer compares identifiers exclusively.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

macro_rules! resource_id {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

resource_id!(
    /// Batch (student cohort) identifier.
    BatchId,
    "batch"
);
resource_id!(
    /// Subject identifier.
    SubjectId,
    "subject"
);
resource_id!(
    /// Faculty (teacher) identifier.
    FacultyId,
    "faculty"
);
resource_id!(
    /// Classroom identifier.
    ClassroomId,
    "classroom"
);

/// A cohort of students sharing one timetable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    /// Unique batch identifier.
    pub id: BatchId,
    /// Display name (e.g. "CSE-2A").
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub shift: Option<String>,
    /// Subjects this batch attends.
    #[serde(default)]
    pub subjects: Vec<SubjectId>,
    /// Classrooms this batch may use. Empty = unrestricted.
    #[serde(default)]
    pub allowed_classrooms: Vec<ClassroomId>,
    /// Which teacher teaches each subject to this batch.
    #[serde(default)]
    pub subject_teachers: BTreeMap<SubjectId, FacultyId>,
}

impl Batch {
    /// Creates a batch with no subjects and no classroom restriction.
    pub fn new(id: u32) -> Self {
        Self {
            id: BatchId(id),
            name: String::new(),
            department: String::new(),
            shift: None,
            subjects: Vec::new(),
            allowed_classrooms: Vec::new(),
            subject_teachers: BTreeMap::new(),
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the department.
    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = department.into();
        self
    }

    /// Sets the shift label.
    pub fn with_shift(mut self, shift: impl Into<String>) -> Self {
        self.shift = Some(shift.into());
        self
    }

    /// Adds a subject taught by `teacher`.
    pub fn with_subject(mut self, subject: SubjectId, teacher: FacultyId) -> Self {
        if !self.subjects.contains(&subject) {
            self.subjects.push(subject);
        }
        self.subject_teachers.insert(subject, teacher);
        self
    }

    /// Restricts the batch to the given classrooms.
    pub fn with_allowed_classrooms(mut self, classrooms: Vec<ClassroomId>) -> Self {
        self.allowed_classrooms = classrooms;
        self
    }

    /// Whether the batch is restricted to a classroom subset.
    pub fn is_restricted(&self) -> bool {
        !self.allowed_classrooms.is_empty()
    }

    /// Teacher assigned to `subject`, if any.
    pub fn teacher_for(&self, subject: SubjectId) -> Option<FacultyId> {
        self.subject_teachers.get(&subject).copied()
    }
}

/// A subject with its weekly and daily quotas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    /// Unique subject identifier.
    pub id: SubjectId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub code: String,
    /// Classes required per week.
    pub classes_per_week: u32,
    /// Maximum classes on a single day.
    pub max_classes_per_day: u32,
}

impl Subject {
    /// Creates a subject with the given quotas.
    pub fn new(id: u32, classes_per_week: u32, max_classes_per_day: u32) -> Self {
        Self {
            id: SubjectId(id),
            name: String::new(),
            code: String::new(),
            classes_per_week,
            max_classes_per_day,
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the subject code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }
}

/// A teacher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Faculty {
    pub id: FacultyId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub department: String,
}

impl Faculty {
    /// Creates a faculty member.
    pub fn new(id: u32) -> Self {
        Self {
            id: FacultyId(id),
            name: String::new(),
            department: String::new(),
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// A room where classes take place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classroom {
    pub id: ClassroomId,
    #[serde(default)]
    pub name: String,
    /// Seating capacity (informational).
    #[serde(default)]
    pub capacity: u32,
}

impl Classroom {
    /// Creates a classroom.
    pub fn new(id: u32) -> Self {
        Self {
            id: ClassroomId(id),
            name: String::new(),
            capacity: 0,
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the seating capacity.
    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_builder() {
        let b = Batch::new(1)
            .with_name("CSE-2A")
            .with_department("CSE")
            .with_shift("morning")
            .with_subject(SubjectId(10), FacultyId(100))
            .with_subject(SubjectId(10), FacultyId(101))
            .with_allowed_classrooms(vec![ClassroomId(5)]);

        assert_eq!(b.id, BatchId(1));
        assert_eq!(b.subjects, vec![SubjectId(10)]);
        assert_eq!(b.teacher_for(SubjectId(10)), Some(FacultyId(101)));
        assert_eq!(b.teacher_for(SubjectId(11)), None);
        assert!(b.is_restricted());
        assert_eq!(b.shift.as_deref(), Some("morning"));
    }

    #[test]
    fn test_unrestricted_by_default() {
        assert!(!Batch::new(1).is_restricted());
    }

    #[test]
    fn test_id_display() {
        assert_eq!(BatchId(3).to_string(), "batch#3");
        assert_eq!(ClassroomId(7).to_string(), "classroom#7");
    }

    #[test]
    fn test_batch_deserialize_with_teacher_map() {
        let json = r#"{
            "id": 4,
            "name": "ME-1",
            "subjects": [1, 2],
            "subject_teachers": {"1": 10, "2": 11}
        }"#;
        let b: Batch = serde_json::from_str(json).unwrap();
        assert_eq!(b.teacher_for(SubjectId(2)), Some(FacultyId(11)));
        assert!(b.allowed_classrooms.is_empty());
    }
}
