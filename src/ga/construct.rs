//! Constructive generator.
//!
//! Builds one individual from scratch, batch by batch:
//!
//! 1. Fixed reservations are placed first and never move.
//! 2. Single-slot directives are honored when quotas and resources allow.
//! 3. Remaining classes go to the teacher's preferred slots, then are
//!    spread over a shuffled day order under the daily cap.
//! 4. Every placement picks a classroom via [`choose_classroom`].
//! 5. The result is repaired before being returned.
//!
//! Constraint satisfaction is opportunistic: at most one class per
//! directive, never past a quota.

use std::collections::BTreeMap;

use log::warn;
use rand::seq::SliceRandom;
use rand::Rng;

use super::repair::{
    balance_classroom_distribution, choose_classroom, refresh_flags, resolve_conflicts,
    validate_and_fix_batch_classrooms,
};
use super::{GaConfig, Individual, Occupancy};
use crate::models::{
    Day, FacultyId, Period, ScheduleEntry, Slot, SubjectId, DAYS_PER_WEEK,
};
use crate::problem::{BatchPlan, SubjectQuota, TimetableProblem};

/// Entries under construction with their occupancy and quota counters.
struct Draft {
    entries: Vec<ScheduleEntry>,
    occ: Occupancy,
    counts: BTreeMap<SubjectId, (u32, [u32; DAYS_PER_WEEK])>,
}

impl Draft {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
            occ: Occupancy::default(),
            counts: BTreeMap::new(),
        }
    }

    /// Whether one more class of `subject` on `day` stays within quota.
    fn has_capacity(&self, subject: SubjectId, quota: SubjectQuota, day: Day) -> bool {
        let (week, days) = self.counts.get(&subject).copied().unwrap_or((0, [0; DAYS_PER_WEEK]));
        week < quota.weekly_required && days[day.index()] < quota.daily_max
    }

    fn weekly(&self, subject: SubjectId) -> u32 {
        self.counts.get(&subject).map_or(0, |c| c.0)
    }

    /// Whether the batch, the teacher and some classroom are all free at `slot`.
    fn slot_free(
        &self,
        problem: &TimetableProblem,
        plan: &BatchPlan,
        teacher: FacultyId,
        slot: Slot,
    ) -> bool {
        !plan.is_blocked(slot)
            && !self.occ.batch_busy(plan.id, slot)
            && !self.occ.teacher_busy(teacher, slot)
            && choose_classroom(problem, &self.occ, plan.id, slot).is_some_and(|c| !c.is_fallback())
    }

    /// Places one class. Returns `false` when no classroom exists at all.
    fn place(
        &mut self,
        problem: &TimetableProblem,
        plan: &BatchPlan,
        subject: SubjectId,
        teacher: FacultyId,
        slot: Slot,
        fixed: bool,
    ) -> bool {
        let Some(choice) = choose_classroom(problem, &self.occ, plan.id, slot) else {
            return false;
        };
        let mut entry = ScheduleEntry::new(plan.id, subject, teacher, choice.classroom(), slot);
        entry.flags.fixed = fixed;
        entry.flags.fallback_classroom = choice.is_fallback();
        self.occ.insert(&entry);
        self.entries.push(entry);

        let c = self.counts.entry(subject).or_insert((0, [0; DAYS_PER_WEEK]));
        c.0 += 1;
        c.1[slot.day.index()] += 1;
        true
    }
}

/// Builds and repairs one candidate timetable.
pub fn build_individual<R: Rng>(
    problem: &TimetableProblem,
    config: &GaConfig,
    rng: &mut R,
) -> Individual {
    let index = problem.index();
    let mut draft = Draft::new();

    if problem.classrooms().is_empty() {
        warn!("no classrooms available; every batch stays unscheduled");
    }

    for plan in problem.plans() {
        draft.counts.clear();

        for &(subject, slot) in &plan.fixed {
            let (Some(teacher), Some(quota)) = (plan.teacher_for(subject), index.quota(subject))
            else {
                continue;
            };
            if !draft.has_capacity(subject, quota, slot.day) {
                warn!("{}: fixed slot {slot} for {subject} exceeds its quota, skipped", plan.id);
                continue;
            }
            draft.place(problem, plan, subject, teacher, slot, true);
        }

        for directive in index.directives_for(plan.id) {
            let subject = directive.subject;
            let (Some(teacher), Some(quota)) = (plan.teacher_for(subject), index.quota(subject))
            else {
                continue;
            };
            if draft.has_capacity(subject, quota, directive.slot.day)
                && draft.slot_free(problem, plan, teacher, directive.slot)
            {
                draft.place(problem, plan, subject, teacher, directive.slot, false);
            }
        }

        for planned in &plan.subjects {
            let Some(quota) = index.quota(planned.subject) else {
                continue;
            };
            fill_subject(problem, plan, planned.subject, planned.teacher, quota, &mut draft, rng);
        }
    }

    let mut individual = Individual::new(draft.entries);
    resolve_conflicts(problem, &mut individual, config.max_repair_attempts);
    validate_and_fix_batch_classrooms(problem, &mut individual);
    balance_classroom_distribution(problem, &mut individual);
    refresh_flags(problem, &mut individual);
    individual
}

/// Tops one subject up to its weekly quota.
///
/// Teacher-preferred slots go first. The rest are spread over rounds of a
/// shuffled day order, at most one class per day per round. When no period
/// of a day has the teacher free, a batch-free period is taken anyway and
/// left to conflict repair.
fn fill_subject<R: Rng>(
    problem: &TimetableProblem,
    plan: &BatchPlan,
    subject: SubjectId,
    teacher: FacultyId,
    quota: SubjectQuota,
    draft: &mut Draft,
    rng: &mut R,
) {
    for slot in problem.index().teacher_pref_slots(plan.id, teacher) {
        if draft.weekly(subject) >= quota.weekly_required {
            return;
        }
        if draft.has_capacity(subject, quota, slot.day) && draft.slot_free(problem, plan, teacher, slot)
        {
            draft.place(problem, plan, subject, teacher, slot, false);
        }
    }

    while draft.weekly(subject) < quota.weekly_required {
        let mut days = Day::ALL;
        days.shuffle(rng);
        let mut placed_any = false;

        for day in days {
            if draft.weekly(subject) >= quota.weekly_required {
                break;
            }
            if !draft.has_capacity(subject, quota, day) {
                continue;
            }
            let mut periods = Period::ALL;
            periods.shuffle(rng);
            let open: Vec<Slot> = periods
                .into_iter()
                .map(|p| Slot::new(day, p))
                .filter(|&s| !plan.is_blocked(s) && !draft.occ.batch_busy(plan.id, s))
                .collect();
            let pick = open
                .iter()
                .copied()
                .find(|&s| !draft.occ.teacher_busy(teacher, s))
                .or_else(|| open.first().copied());

            if let Some(slot) = pick {
                if !draft.place(problem, plan, subject, teacher, slot, false) {
                    return;
                }
                placed_any = true;
            }
        }

        if !placed_any {
            break;
        }
    }
}
