//! Violation report.
//!
//! A read-only pass over a finished timetable that lists everything the
//! optimizer could not satisfy. The report never changes the schedule.
//!
//! # Categories
//!
//! | Category | Severity |
//! |----------|----------|
//! | Classroom outside a batch's allowed subset | high |
//! | Residual collision (batch, teacher, classroom) | high |
//! | Preference not scheduled at all | high |
//! | Preference scheduled, but at another slot | medium |
//! | Under- or over-scheduled (batch, subject) | medium |

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::ga::{detect_conflicts, ConflictKind};
use crate::models::{
    BatchId, ClassroomId, FacultyId, ScheduleEntry, Slot, SubjectId, DAYS_PER_WEEK,
};
use crate::problem::TimetableProblem;

/// Severity of a reported violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Medium,
    High,
}

/// How far an unmet preference is from being met.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreferenceStatus {
    /// The resource is scheduled for the batch, but at another slot.
    ScheduledElsewhere,
    /// The resource is not scheduled for the batch at all.
    NotScheduled,
}

impl PreferenceStatus {
    pub fn severity(self) -> Severity {
        match self {
            Self::ScheduledElsewhere => Severity::Medium,
            Self::NotScheduled => Severity::High,
        }
    }
}

/// Slot usage of a batch restricted to a classroom subset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestrictedBatchUsage {
    pub batch: BatchId,
    pub allowed: Vec<ClassroomId>,
    /// Classes per classroom actually used.
    pub usage: BTreeMap<ClassroomId, usize>,
    /// Distinct slots the batch occupies.
    pub slots_used: usize,
}

/// An entry using a classroom outside its batch's allowed subset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassroomViolation {
    pub batch: BatchId,
    pub subject: SubjectId,
    pub classroom: ClassroomId,
    pub slot: Slot,
}

/// Two entries still sharing a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionViolation {
    pub kind: ConflictKind,
    pub slot: Slot,
    pub first: ScheduleEntry,
    pub second: ScheduleEntry,
}

/// An unmet subject-slot preference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectSlotViolation {
    pub batch: BatchId,
    pub subject: SubjectId,
    pub slot: Slot,
    pub status: PreferenceStatus,
    pub severity: Severity,
}

/// An unmet classroom-slot preference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassroomSlotViolation {
    pub batch: BatchId,
    pub classroom: ClassroomId,
    pub slot: Slot,
    pub status: PreferenceStatus,
    pub severity: Severity,
}

/// An unmet teacher-slot preference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherSlotViolation {
    pub batch: BatchId,
    pub teacher: FacultyId,
    pub slot: Slot,
    pub status: PreferenceStatus,
    pub severity: Severity,
}

/// A (batch, subject) pair whose class count misses its quota.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaViolation {
    pub batch: BatchId,
    pub subject: SubjectId,
    pub required: u32,
    pub scheduled: u32,
    pub daily_max: u32,
    /// Most classes of the subject on a single day.
    pub busiest_day: u32,
}

/// Violation counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_entries: usize,
    pub restricted_batches: usize,
    pub classroom_violations: usize,
    pub collisions: usize,
    pub subject_slot_violations: usize,
    pub classroom_slot_violations: usize,
    pub teacher_slot_violations: usize,
    pub under_scheduled: usize,
    pub over_scheduled: usize,
    pub high_severity: usize,
    pub medium_severity: usize,
}

/// Everything the final timetable fails to satisfy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationReport {
    pub summary: ReportSummary,
    pub restricted_batches: Vec<RestrictedBatchUsage>,
    pub classroom_violations: Vec<ClassroomViolation>,
    pub collisions: Vec<CollisionViolation>,
    pub subject_slot: Vec<SubjectSlotViolation>,
    pub classroom_slot: Vec<ClassroomSlotViolation>,
    pub teacher_slot: Vec<TeacherSlotViolation>,
    pub under_scheduled: Vec<QuotaViolation>,
    pub over_scheduled: Vec<QuotaViolation>,
    pub recommendations: Vec<String>,
}

impl ViolationReport {
    /// Derives the report for `entries` from scratch.
    pub fn build(problem: &TimetableProblem, entries: &[ScheduleEntry]) -> Self {
        let index = problem.index();
        let mut report = Self::default();

        for plan in problem.plans() {
            if !index.is_restricted(plan.id) {
                continue;
            }
            let mut usage = BTreeMap::new();
            let mut slots = BTreeSet::new();
            for e in entries.iter().filter(|e| e.batch == plan.id) {
                *usage.entry(e.classroom).or_insert(0) += 1;
                slots.insert(e.slot);
            }
            report.restricted_batches.push(RestrictedBatchUsage {
                batch: plan.id,
                allowed: index.allowed_classrooms(plan.id).to_vec(),
                usage,
                slots_used: slots.len(),
            });
        }

        report.classroom_violations = entries
            .iter()
            .filter(|e| !index.is_classroom_allowed(e.batch, e.classroom))
            .map(|e| ClassroomViolation {
                batch: e.batch,
                subject: e.subject,
                classroom: e.classroom,
                slot: e.slot,
            })
            .collect();

        report.collisions = detect_conflicts(entries)
            .into_iter()
            .map(|c| CollisionViolation {
                kind: c.kind,
                slot: c.slot,
                first: entries[c.first].clone(),
                second: entries[c.second].clone(),
            })
            .collect();

        let placed: BTreeSet<(BatchId, SubjectId, Slot)> =
            entries.iter().map(|e| (e.batch, e.subject, e.slot)).collect();
        let subjects: BTreeSet<(BatchId, SubjectId)> =
            entries.iter().map(|e| (e.batch, e.subject)).collect();
        for d in index.directives() {
            if placed.contains(&(d.batch, d.subject, d.slot)) {
                continue;
            }
            let status = status_of(subjects.contains(&(d.batch, d.subject)));
            report.subject_slot.push(SubjectSlotViolation {
                batch: d.batch,
                subject: d.subject,
                slot: d.slot,
                status,
                severity: status.severity(),
            });
        }

        let rooms: BTreeSet<(BatchId, Slot, ClassroomId)> =
            entries.iter().map(|e| (e.batch, e.slot, e.classroom)).collect();
        let rooms_used: BTreeSet<(BatchId, ClassroomId)> =
            entries.iter().map(|e| (e.batch, e.classroom)).collect();
        for (batch, slot, classroom) in index.classroom_slot_prefs() {
            if rooms.contains(&(batch, slot, classroom)) {
                continue;
            }
            let status = status_of(rooms_used.contains(&(batch, classroom)));
            report.classroom_slot.push(ClassroomSlotViolation {
                batch,
                classroom,
                slot,
                status,
                severity: status.severity(),
            });
        }

        let teaching: BTreeSet<(BatchId, Slot, FacultyId)> =
            entries.iter().map(|e| (e.batch, e.slot, e.teacher)).collect();
        let teachers_used: BTreeSet<(BatchId, FacultyId)> =
            entries.iter().map(|e| (e.batch, e.teacher)).collect();
        for (batch, slot, teacher) in index.teacher_slot_prefs() {
            if teaching.contains(&(batch, slot, teacher)) {
                continue;
            }
            let status = status_of(teachers_used.contains(&(batch, teacher)));
            report.teacher_slot.push(TeacherSlotViolation {
                batch,
                teacher,
                slot,
                status,
                severity: status.severity(),
            });
        }

        for plan in problem.plans() {
            for planned in &plan.subjects {
                let Some(quota) = index.quota(planned.subject) else {
                    continue;
                };
                let group: Vec<&ScheduleEntry> = entries
                    .iter()
                    .filter(|e| e.batch == plan.id && e.subject == planned.subject)
                    .collect();
                let mut days = [0u32; DAYS_PER_WEEK];
                for e in &group {
                    days[e.slot.day.index()] += 1;
                }
                let violation = QuotaViolation {
                    batch: plan.id,
                    subject: planned.subject,
                    required: quota.weekly_required,
                    scheduled: group.len() as u32,
                    daily_max: quota.daily_max,
                    busiest_day: days.iter().copied().max().unwrap_or(0),
                };
                if violation.scheduled < violation.required {
                    report.under_scheduled.push(violation);
                } else if violation.scheduled > violation.required
                    || violation.busiest_day > violation.daily_max
                {
                    report.over_scheduled.push(violation);
                }
            }
        }

        report.summarize(entries.len());
        report.recommendations = report.recommend();
        report
    }

    /// Whether nothing at all is reported.
    pub fn is_clean(&self) -> bool {
        self.classroom_violations.is_empty()
            && self.collisions.is_empty()
            && self.subject_slot.is_empty()
            && self.classroom_slot.is_empty()
            && self.teacher_slot.is_empty()
            && self.under_scheduled.is_empty()
            && self.over_scheduled.is_empty()
    }

    fn summarize(&mut self, total_entries: usize) {
        let preference_severities = self
            .subject_slot
            .iter()
            .map(|v| v.severity)
            .chain(self.classroom_slot.iter().map(|v| v.severity))
            .chain(self.teacher_slot.iter().map(|v| v.severity));
        let (mut high, mut medium) = (0, 0);
        for severity in preference_severities {
            match severity {
                Severity::High => high += 1,
                Severity::Medium => medium += 1,
            }
        }
        high += self.classroom_violations.len() + self.collisions.len();
        medium += self.under_scheduled.len() + self.over_scheduled.len();

        self.summary = ReportSummary {
            total_entries,
            restricted_batches: self.restricted_batches.len(),
            classroom_violations: self.classroom_violations.len(),
            collisions: self.collisions.len(),
            subject_slot_violations: self.subject_slot.len(),
            classroom_slot_violations: self.classroom_slot.len(),
            teacher_slot_violations: self.teacher_slot.len(),
            under_scheduled: self.under_scheduled.len(),
            over_scheduled: self.over_scheduled.len(),
            high_severity: high,
            medium_severity: medium,
        };
    }

    fn recommend(&self) -> Vec<String> {
        let mut out = Vec::new();

        let mut by_kind: BTreeMap<ConflictKind, usize> = BTreeMap::new();
        for c in &self.collisions {
            *by_kind.entry(c.kind).or_insert(0) += 1;
        }
        for (kind, n) in by_kind {
            out.push(match kind {
                ConflictKind::Batch => {
                    format!("{n} batch clashes remain; reduce weekly quotas or free reserved slots")
                }
                ConflictKind::Teacher => format!(
                    "{n} teacher clashes remain; assign more faculty to the shared subjects"
                ),
                ConflictKind::Classroom => {
                    format!("{n} classroom clashes remain; add classrooms or widen allowed sets")
                }
            });
        }

        let crowded: BTreeSet<BatchId> =
            self.classroom_violations.iter().map(|v| v.batch).collect();
        for batch in crowded {
            out.push(format!("{batch}: allowed classrooms are insufficient; allow more classrooms"));
        }
        for usage in &self.restricted_batches {
            let restricted_clashes = self.collisions.iter().any(|c| {
                c.kind == ConflictKind::Classroom
                    && (c.first.batch == usage.batch || c.second.batch == usage.batch)
            });
            if restricted_clashes {
                out.push(format!(
                    "{}: its allowed classrooms are overbooked; allow more classrooms",
                    usage.batch
                ));
            }
        }

        for v in &self.under_scheduled {
            out.push(format!(
                "{}: {} of {} classes of {} could not be placed; reduce the quota or free slots",
                v.batch,
                v.required - v.scheduled,
                v.required,
                v.subject
            ));
        }

        let unmet = self.subject_slot.len() + self.classroom_slot.len() + self.teacher_slot.len();
        if unmet > 0 {
            out.push(format!(
                "{unmet} slot preferences could not be honored; review conflicting preferences"
            ));
        }
        out
    }
}

fn status_of(scheduled_elsewhere: bool) -> PreferenceStatus {
    if scheduled_elsewhere {
        PreferenceStatus::ScheduledElsewhere
    } else {
        PreferenceStatus::NotScheduled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{self, slot};
    use crate::models::{Constraint, Day};
    use crate::problem::RunMode;

    fn entry(batch: u32, subject: u32, teacher: u32, classroom: u32, s: Slot) -> ScheduleEntry {
        ScheduleEntry::new(
            BatchId(batch),
            SubjectId(subject),
            FacultyId(teacher),
            ClassroomId(classroom),
            s,
        )
    }

    fn complete() -> Vec<ScheduleEntry> {
        vec![
            entry(1, 1, 10, 1, slot(Day::Monday, 1)),
            entry(1, 1, 10, 1, slot(Day::Tuesday, 1)),
            entry(1, 2, 11, 2, slot(Day::Monday, 2)),
            entry(1, 2, 11, 2, slot(Day::Tuesday, 2)),
        ]
    }

    #[test]
    fn test_clean_report() {
        let problem =
            TimetableProblem::load(&fixtures::single_batch_input(), RunMode::AllBatches).unwrap();
        let report = ViolationReport::build(&problem, &complete());
        assert!(report.is_clean());
        assert_eq!(report.summary.total_entries, 4);
        assert!(report.recommendations.is_empty());
    }

    #[test]
    fn test_preference_statuses() {
        let input = fixtures::single_batch_input()
            .with_constraint(Constraint::subject_slot(
                BatchId(1),
                SubjectId(1),
                slot(Day::Friday, 1),
            ))
            .with_constraint(Constraint::classroom_slot(
                BatchId(1),
                ClassroomId(2),
                slot(Day::Friday, 2),
            ))
            .with_constraint(Constraint::teacher_slot(
                BatchId(1),
                FacultyId(11),
                slot(Day::Friday, 3),
            ));
        let problem = TimetableProblem::load(&input, RunMode::AllBatches).unwrap();

        let report = ViolationReport::build(&problem, &complete());
        assert_eq!(report.subject_slot.len(), 1);
        assert_eq!(report.subject_slot[0].status, PreferenceStatus::ScheduledElsewhere);
        assert_eq!(report.subject_slot[0].severity, Severity::Medium);
        assert_eq!(report.classroom_slot.len(), 1);
        assert_eq!(report.teacher_slot.len(), 1);
        assert_eq!(report.summary.medium_severity, 3);

        // Without subject 1 at all the directive becomes "not scheduled".
        let without: Vec<_> = complete()
            .into_iter()
            .filter(|e| e.subject != SubjectId(1))
            .collect();
        let report = ViolationReport::build(&problem, &without);
        assert_eq!(report.subject_slot[0].status, PreferenceStatus::NotScheduled);
        assert_eq!(report.subject_slot[0].severity, Severity::High);
        assert_eq!(report.under_scheduled.len(), 1);
        assert_eq!(report.under_scheduled[0].scheduled, 0);
    }

    #[test]
    fn test_collisions_and_classroom_violations() {
        let problem =
            TimetableProblem::load(&fixtures::restricted_input(), RunMode::AllBatches).unwrap();
        let s = slot(Day::Monday, 1);
        let entries = vec![
            entry(1, 1, 10, 1, s),
            entry(2, 2, 11, 1, s), // classroom 1 clash
            entry(1, 1, 10, 2, slot(Day::Tuesday, 1)), // outside the allowed subset
        ];
        let report = ViolationReport::build(&problem, &entries);

        assert_eq!(report.collisions.len(), 1);
        assert_eq!(report.collisions[0].kind, ConflictKind::Classroom);
        assert_eq!(report.classroom_violations.len(), 1);
        assert_eq!(report.restricted_batches.len(), 1);
        assert_eq!(report.restricted_batches[0].slots_used, 2);
        assert!(report.summary.high_severity >= 2);
        assert!(!report.recommendations.is_empty());
    }

    #[test]
    fn test_over_scheduled_daily() {
        let problem =
            TimetableProblem::load(&fixtures::single_batch_input(), RunMode::AllBatches).unwrap();
        let mut entries = complete();
        entries[1].slot = slot(Day::Monday, 3);
        let report = ViolationReport::build(&problem, &entries);
        assert_eq!(report.over_scheduled.len(), 1);
        assert_eq!(report.over_scheduled[0].busiest_day, 2);
    }

    #[test]
    fn test_report_serializes() {
        let problem =
            TimetableProblem::load(&fixtures::single_batch_input(), RunMode::AllBatches).unwrap();
        let report = ViolationReport::build(&problem, &complete()[..3]);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["summary"]["under_scheduled"], 1);
    }
}
