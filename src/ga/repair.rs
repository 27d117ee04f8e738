//! Conflict detection and repair.
//!
//! Every operator that moves entries (construction, crossover, mutation,
//! local search) finishes by calling into this module. All functions take
//! the individual they repair explicitly and touch nothing else.
//!
//! # Repairs
//!
//! | Function | Fixes |
//! |----------|-------|
//! | [`resolve_conflicts`] | batch/teacher/classroom double-bookings |
//! | [`validate_and_fix_batch_classrooms`] | classrooms outside a batch's allowed subset |
//! | [`validate_and_fix_over_scheduling`] | weekly/daily quota excess |
//! | [`fill_under_scheduled`] | weekly quota shortfall |
//! | [`balance_classroom_distribution`] | uneven classroom usage |

use std::collections::{BTreeSet, HashMap};

use log::trace;
use serde::{Deserialize, Serialize};

use super::{Individual, Occupancy};
use crate::models::{BatchId, ClassroomId, Day, FacultyId, ScheduleEntry, Slot, DAYS_PER_WEEK};
use crate::problem::TimetableProblem;

/// Score bonus for a slot matching a known preference.
const PREFERENCE_BONUS: f64 = 50.0;

/// Kind of double-booking, in repair priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// A batch attends two classes at once.
    Batch,
    /// A teacher teaches two classes at once.
    Teacher,
    /// A classroom hosts two classes at once.
    Classroom,
}

/// Two entries sharing a resource at one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conflict {
    pub kind: ConflictKind,
    pub slot: Slot,
    /// Index of the entry seen first.
    pub first: usize,
    /// Index of the entry seen second (the one relocated).
    pub second: usize,
}

/// Clash counts per kind. A resource held `n` times at a slot counts `n - 1`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionCounts {
    pub batch: usize,
    pub teacher: usize,
    pub classroom: usize,
}

impl CollisionCounts {
    /// Sum over all kinds.
    pub fn total(&self) -> usize {
        self.batch + self.teacher + self.classroom
    }
}

/// How a classroom was picked for a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassroomChoice {
    /// Matches a classroom-slot preference and is free.
    Preferred(ClassroomId),
    /// Least-used free candidate.
    Free(ClassroomId),
    /// Every candidate is taken; this one will collide.
    Fallback(ClassroomId),
}

impl ClassroomChoice {
    #[inline]
    pub fn classroom(self) -> ClassroomId {
        match self {
            Self::Preferred(c) | Self::Free(c) | Self::Fallback(c) => c,
        }
    }

    #[inline]
    pub fn is_fallback(self) -> bool {
        matches!(self, Self::Fallback(_))
    }

    #[inline]
    pub fn is_preferred(self) -> bool {
        matches!(self, Self::Preferred(_))
    }
}

/// A target position for one entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Relocation {
    pub slot: Slot,
    pub classroom: ClassroomId,
    pub score: f64,
}

/// Picks a classroom for `batch` at `slot`.
///
/// Order: a free preferred classroom, then the least-used free candidate
/// (allowed subset if restricted, every classroom otherwise), then a
/// fallback (first allowed classroom, or least-used overall). Returns
/// `None` only when the problem has no candidate classrooms.
pub fn choose_classroom(
    problem: &TimetableProblem,
    occ: &Occupancy,
    batch: BatchId,
    slot: Slot,
) -> Option<ClassroomChoice> {
    let index = problem.index();
    for &c in index.classroom_prefs(batch, slot) {
        if index.is_classroom_allowed(batch, c) && !occ.classroom_busy(c, slot) {
            return Some(ClassroomChoice::Preferred(c));
        }
    }

    let candidates = problem.candidate_classrooms(batch);
    let free = candidates
        .iter()
        .copied()
        .filter(|&c| !occ.classroom_busy(c, slot))
        .min_by_key(|&c| occ.classroom_usage(c));
    if let Some(c) = free {
        return Some(ClassroomChoice::Free(c));
    }

    if index.is_restricted(batch) {
        candidates.first().copied().map(ClassroomChoice::Fallback)
    } else {
        candidates
            .iter()
            .copied()
            .min_by_key(|&c| occ.classroom_usage(c))
            .map(ClassroomChoice::Fallback)
    }
}

/// Lists double-bookings, batch conflicts first, then teacher, then classroom.
///
/// Each conflict pairs an entry with the first entry seen holding the same
/// resource at the same slot.
pub fn detect_conflicts(entries: &[ScheduleEntry]) -> Vec<Conflict> {
    let mut batches: HashMap<(BatchId, Slot), usize> = HashMap::new();
    let mut teachers: HashMap<(FacultyId, Slot), usize> = HashMap::new();
    let mut classrooms: HashMap<(ClassroomId, Slot), usize> = HashMap::new();
    let mut conflicts = Vec::new();

    for (i, e) in entries.iter().enumerate() {
        let mut note = |kind, first: Option<usize>| {
            if let Some(first) = first {
                conflicts.push(Conflict {
                    kind,
                    slot: e.slot,
                    first,
                    second: i,
                });
            }
        };
        note(ConflictKind::Batch, first_holder(&mut batches, (e.batch, e.slot), i));
        note(ConflictKind::Teacher, first_holder(&mut teachers, (e.teacher, e.slot), i));
        note(
            ConflictKind::Classroom,
            first_holder(&mut classrooms, (e.classroom, e.slot), i),
        );
    }

    conflicts.sort_by_key(|c| c.kind);
    conflicts
}

fn first_holder<K: std::hash::Hash + Eq>(
    map: &mut HashMap<K, usize>,
    key: K,
    i: usize,
) -> Option<usize> {
    match map.get(&key) {
        Some(&first) => Some(first),
        None => {
            map.insert(key, i);
            None
        }
    }
}

/// Counts clashes of each kind.
pub fn count_collisions(entries: &[ScheduleEntry]) -> CollisionCounts {
    let mut counts = CollisionCounts::default();
    for c in detect_conflicts(entries) {
        match c.kind {
            ConflictKind::Batch => counts.batch += 1,
            ConflictKind::Teacher => counts.teacher += 1,
            ConflictKind::Classroom => counts.classroom += 1,
        }
    }
    counts
}

fn still_conflicting(entries: &[ScheduleEntry], c: &Conflict) -> bool {
    let (a, b) = (&entries[c.first], &entries[c.second]);
    if a.slot != b.slot {
        return false;
    }
    match c.kind {
        ConflictKind::Batch => a.batch == b.batch,
        ConflictKind::Teacher => a.teacher == b.teacher,
        ConflictKind::Classroom => a.classroom == b.classroom,
    }
}

/// Relocates conflicting entries until none remain or the attempt budget runs out.
///
/// The second-seen entry of each conflict moves to its
/// [best alternative slot](find_best_alternative_slot); fixed entries stay
/// put. Collision flags are refreshed afterwards, so conflicts that could
/// not be repaired remain visible. Returns the number of relocations.
pub fn resolve_conflicts(
    problem: &TimetableProblem,
    individual: &mut Individual,
    max_attempts: usize,
) -> usize {
    let mut moved = 0;

    for _ in 0..max_attempts {
        let conflicts = detect_conflicts(&individual.entries);
        if conflicts.is_empty() {
            break;
        }

        let mut progressed = false;
        for c in &conflicts {
            if !still_conflicting(&individual.entries, c) {
                continue;
            }
            let target = if !individual.entries[c.second].flags.fixed {
                c.second
            } else if !individual.entries[c.first].flags.fixed {
                c.first
            } else {
                continue;
            };
            if let Some(reloc) = find_best_alternative_slot(problem, &individual.entries, target) {
                trace!(
                    "{:?} conflict at {}: entry {target} -> {} in {}",
                    c.kind,
                    c.slot,
                    reloc.slot,
                    reloc.classroom
                );
                apply_relocation(&mut individual.entries[target], reloc);
                moved += 1;
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }

    if moved > 0 {
        individual.invalidate();
    }
    refresh_flags(problem, individual);
    moved
}

/// Moves an entry to a relocation target.
pub fn apply_relocation(entry: &mut ScheduleEntry, reloc: Relocation) {
    entry.slot = reloc.slot;
    entry.classroom = reloc.classroom;
    entry.flags.fallback_classroom = false;
}

/// Scores every slot for the entry at `idx` and returns the best one.
///
/// Slots that would reproduce a batch, teacher or classroom conflict are
/// excluded, as are slots on a day where the subject already reached its
/// daily cap and slots where only a classroom outside the batch's subset is
/// free. Remaining slots score a bonus for matching a preference. Ties go
/// to the earliest slot. The entry's current slot competes like any other.
pub fn find_best_alternative_slot(
    problem: &TimetableProblem,
    entries: &[ScheduleEntry],
    idx: usize,
) -> Option<Relocation> {
    let entry = entries.get(idx)?;
    let index = problem.index();
    let occ = Occupancy::excluding(entries, idx);
    let daily_max = index.quota(entry.subject).map(|q| q.daily_max);

    let mut day_counts = [0u32; DAYS_PER_WEEK];
    for (i, e) in entries.iter().enumerate() {
        if i != idx && e.batch == entry.batch && e.subject == entry.subject {
            day_counts[e.slot.day.index()] += 1;
        }
    }

    let mut best: Option<Relocation> = None;
    for slot in Slot::all() {
        if problem.is_blocked(entry.batch, slot)
            || occ.batch_busy(entry.batch, slot)
            || occ.teacher_busy(entry.teacher, slot)
            || daily_max.is_some_and(|max| day_counts[slot.day.index()] >= max)
        {
            continue;
        }
        let Some(choice) = choose_classroom(problem, &occ, entry.batch, slot) else {
            continue;
        };
        if choice.is_fallback() {
            continue;
        }

        let classroom = choice.classroom();
        let mut score = 0.0;
        if choice.is_preferred()
            || index.has_directive(entry.batch, entry.subject, slot)
            || index.teacher_prefs(entry.batch, slot).contains(&entry.teacher)
        {
            score += PREFERENCE_BONUS;
        }

        if best.map_or(true, |b| score > b.score) {
            best = Some(Relocation {
                slot,
                classroom,
                score,
            });
        }
    }
    best
}

/// Moves entries using a classroom outside their batch's allowed subset.
///
/// Each offender gets an allowed classroom free at its slot, or the first
/// allowed classroom (flagged fallback) when none is free. Returns the
/// number of entries changed; a valid individual yields 0.
pub fn validate_and_fix_batch_classrooms(
    problem: &TimetableProblem,
    individual: &mut Individual,
) -> usize {
    let index = problem.index();
    let mut fixes = 0;

    for i in 0..individual.entries.len() {
        let (batch, classroom, slot) = {
            let e = &individual.entries[i];
            (e.batch, e.classroom, e.slot)
        };
        if index.is_classroom_allowed(batch, classroom) {
            continue;
        }
        let allowed = index.allowed_classrooms(batch);
        let occ = Occupancy::excluding(&individual.entries, i);
        let free = allowed.iter().copied().find(|&c| !occ.classroom_busy(c, slot));
        let Some(replacement) = free.or_else(|| allowed.first().copied()) else {
            continue;
        };
        let e = &mut individual.entries[i];
        e.classroom = replacement;
        e.flags.fallback_classroom = free.is_none();
        fixes += 1;
    }

    if fixes > 0 {
        individual.invalidate();
        refresh_flags(problem, individual);
    }
    fixes
}

/// Removes classes beyond each subject's daily and weekly quota.
///
/// Within an over-full group, fixed entries are kept first, then preferred
/// ones, then earlier ones. Returns the number of entries removed.
pub fn validate_and_fix_over_scheduling(
    problem: &TimetableProblem,
    individual: &mut Individual,
) -> usize {
    let index = problem.index();
    let mut remove: BTreeSet<usize> = BTreeSet::new();

    for ((_, subject), idxs) in individual.groups() {
        let Some(quota) = index.quota(subject) else {
            continue;
        };

        for day in 0..DAYS_PER_WEEK {
            let on_day: Vec<usize> = idxs
                .iter()
                .copied()
                .filter(|&i| individual.entries[i].slot.day.index() == day)
                .collect();
            remove.extend(excess(&individual.entries, on_day, quota.daily_max as usize));
        }

        let kept: Vec<usize> = idxs.iter().copied().filter(|i| !remove.contains(i)).collect();
        remove.extend(excess(&individual.entries, kept, quota.weekly_required as usize));
    }

    let removed = remove.len();
    if removed > 0 {
        let mut i = 0;
        individual.entries.retain(|_| {
            let keep = !remove.contains(&i);
            i += 1;
            keep
        });
        individual.invalidate();
        refresh_flags(problem, individual);
    }
    removed
}

/// Indices beyond `limit` after ranking by (fixed, preferred, position).
fn excess(entries: &[ScheduleEntry], mut idxs: Vec<usize>, limit: usize) -> Vec<usize> {
    if idxs.len() <= limit {
        return Vec::new();
    }
    idxs.sort_by_key(|&i| (!entries[i].flags.fixed, !entries[i].flags.preferred, i));
    idxs.split_off(limit)
}

/// Adds missing classes for under-scheduled (batch, subject) pairs.
///
/// Placements never break the daily cap or land on a reserved slot. A
/// conflict-free slot (batch, teacher and a candidate classroom all free)
/// is taken when one exists, trying days carrying the fewest classes of the
/// subject first. Otherwise the class goes to the slot with the fewest
/// collisions and stays flagged, so the quota is met whenever the daily cap
/// allows it. Returns the number of entries added.
pub fn fill_under_scheduled(problem: &TimetableProblem, individual: &mut Individual) -> usize {
    let index = problem.index();
    let mut occ = Occupancy::from_entries(&individual.entries);
    let mut added = 0;

    for plan in problem.plans() {
        for planned in &plan.subjects {
            let Some(quota) = index.quota(planned.subject) else {
                continue;
            };
            let mut count = individual.count(plan.id, planned.subject) as u32;
            let mut day_counts = individual.day_counts(plan.id, planned.subject);

            while count < quota.weekly_required {
                let mut days: Vec<usize> = (0..DAYS_PER_WEEK).collect();
                days.sort_by_key(|&d| (day_counts[d], d));

                let open: Vec<Slot> = days
                    .into_iter()
                    .filter(|&d| day_counts[d] < quota.daily_max)
                    .flat_map(|d| Slot::of_day(Day::ALL[d]))
                    .filter(|&s| !plan.is_blocked(s))
                    .collect();

                let free = open.iter().copied().find_map(|s| {
                    if occ.batch_busy(plan.id, s) || occ.teacher_busy(planned.teacher, s) {
                        return None;
                    }
                    match choose_classroom(problem, &occ, plan.id, s) {
                        Some(choice) if !choice.is_fallback() => Some((s, choice)),
                        _ => None,
                    }
                });
                let placement = free.or_else(|| {
                    open.iter()
                        .filter_map(|&s| {
                            let choice = choose_classroom(problem, &occ, plan.id, s)?;
                            let clashes = occ.batch_count(plan.id, s)
                                + occ.teacher_count(planned.teacher, s)
                                + usize::from(choice.is_fallback());
                            Some((clashes, s, choice))
                        })
                        .min_by_key(|&(clashes, _, _)| clashes)
                        .map(|(_, s, choice)| (s, choice))
                });

                let Some((slot, choice)) = placement else {
                    break;
                };
                let mut entry = ScheduleEntry::new(
                    plan.id,
                    planned.subject,
                    planned.teacher,
                    choice.classroom(),
                    slot,
                );
                entry.flags.fallback_classroom = choice.is_fallback();
                occ.insert(&entry);
                individual.entries.push(entry);
                count += 1;
                day_counts[slot.day.index()] += 1;
                added += 1;
            }
        }
    }

    if added > 0 {
        individual.invalidate();
        refresh_flags(problem, individual);
    }
    added
}

/// Spreads classes over classrooms.
///
/// An entry moves to a free candidate classroom when that lowers the
/// usage gap by at least two. Fixed entries and entries sitting in their
/// preferred classroom stay. Returns the number of entries moved.
pub fn balance_classroom_distribution(
    problem: &TimetableProblem,
    individual: &mut Individual,
) -> usize {
    let index = problem.index();
    let mut occ = Occupancy::from_entries(&individual.entries);
    let mut moved = 0;

    for i in 0..individual.entries.len() {
        let e = individual.entries[i].clone();
        if e.flags.fixed || index.classroom_prefs(e.batch, e.slot).contains(&e.classroom) {
            continue;
        }
        let current = occ.classroom_usage(e.classroom);
        let target = problem
            .candidate_classrooms(e.batch)
            .iter()
            .copied()
            .filter(|&c| c != e.classroom && !occ.classroom_busy(c, e.slot))
            .min_by_key(|&c| occ.classroom_usage(c));
        let Some(target) = target else {
            continue;
        };
        if occ.classroom_usage(target) + 1 < current {
            occ.remove(&e);
            let entry = &mut individual.entries[i];
            entry.classroom = target;
            entry.flags.fallback_classroom = false;
            occ.insert(entry);
            moved += 1;
        }
    }

    if moved > 0 {
        individual.invalidate();
        refresh_flags(problem, individual);
    }
    moved
}

/// Recomputes collision and preference flags from scratch.
///
/// `preferred` reflects slot preferences and directives only. Fixed
/// reservations keep their own `fixed` flag.
///
/// A fallback flag survives only while the entry still collides in its
/// classroom or sits outside its allowed subset.
pub fn refresh_flags(problem: &TimetableProblem, individual: &mut Individual) {
    let index = problem.index();
    let occ = Occupancy::from_entries(&individual.entries);
    for e in &mut individual.entries {
        e.flags.batch_collision = occ.batch_count(e.batch, e.slot) > 1;
        e.flags.teacher_collision = occ.teacher_count(e.teacher, e.slot) > 1;
        e.flags.classroom_collision = occ.classroom_count(e.classroom, e.slot) > 1;
        e.flags.preferred = index.matches_preference(e);
        e.flags.fallback_classroom = e.flags.fallback_classroom
            && (e.flags.classroom_collision || !index.is_classroom_allowed(e.batch, e.classroom));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{self, slot};
    use crate::models::{Batch, Classroom, Constraint, Faculty, Subject, SubjectId};
    use crate::problem::{ProblemInput, RunMode, TimetableProblem};

    fn load(input: ProblemInput) -> TimetableProblem {
        TimetableProblem::load(&input, RunMode::AllBatches).unwrap()
    }

    fn entry(batch: u32, subject: u32, teacher: u32, classroom: u32, s: Slot) -> ScheduleEntry {
        ScheduleEntry::new(
            BatchId(batch),
            SubjectId(subject),
            FacultyId(teacher),
            ClassroomId(classroom),
            s,
        )
    }

    #[test]
    fn test_detect_conflicts_priority() {
        let s = slot(Day::Monday, 1);
        let entries = vec![
            entry(1, 1, 10, 1, s),
            entry(2, 2, 10, 1, s), // teacher + classroom clash with #0
            entry(1, 2, 11, 2, s), // batch clash with #0
        ];
        let conflicts = detect_conflicts(&entries);
        assert_eq!(conflicts.len(), 3);
        assert_eq!(conflicts[0].kind, ConflictKind::Batch);
        assert_eq!((conflicts[0].first, conflicts[0].second), (0, 2));
        assert_eq!(conflicts[1].kind, ConflictKind::Teacher);
        assert_eq!(conflicts[2].kind, ConflictKind::Classroom);

        let counts = count_collisions(&entries);
        assert_eq!(counts, CollisionCounts { batch: 1, teacher: 1, classroom: 1 });
    }

    #[test]
    fn test_resolve_conflicts_clears_collisions() {
        let problem = load(fixtures::multi_batch_input());
        let s = slot(Day::Monday, 1);
        let mut ind = Individual::new(vec![
            entry(1, 1, 10, 1, s),
            entry(2, 1, 10, 1, s),
            entry(3, 1, 10, 1, s),
            entry(1, 2, 11, 2, s),
        ]);
        let moved = resolve_conflicts(&problem, &mut ind, 10);

        assert!(moved >= 3);
        assert!(detect_conflicts(&ind.entries).is_empty());
        assert!(ind.entries.iter().all(|e| !e.flags.has_collision()));
        assert_eq!(ind.len(), 4);
    }

    #[test]
    fn test_fixed_entries_never_move() {
        let problem = load(fixtures::single_batch_input());
        let s = slot(Day::Monday, 1);
        let mut ind = Individual::new(vec![
            entry(1, 1, 10, 1, s).fixed(),
            entry(1, 2, 11, 2, s),
        ]);
        resolve_conflicts(&problem, &mut ind, 10);
        assert_eq!(ind.entries[0].slot, s);
        assert_ne!(ind.entries[1].slot, s);
    }

    #[test]
    fn test_best_alternative_prefers_directive() {
        let target = slot(Day::Thursday, 4);
        let input = fixtures::single_batch_input()
            .with_constraint(Constraint::subject_slot(BatchId(1), SubjectId(1), target));
        let problem = load(input);
        let entries = vec![entry(1, 1, 10, 1, slot(Day::Monday, 1))];

        let reloc = find_best_alternative_slot(&problem, &entries, 0).unwrap();
        assert_eq!(reloc.slot, target);
        assert!((reloc.score - PREFERENCE_BONUS).abs() < 1e-10);
    }

    #[test]
    fn test_best_alternative_avoids_busy_teacher() {
        let problem = load(fixtures::multi_batch_input());
        let first = slot(Day::Monday, 1);
        let entries = vec![entry(1, 1, 10, 1, first), entry(2, 1, 10, 2, first)];
        let reloc = find_best_alternative_slot(&problem, &entries, 1).unwrap();
        assert_ne!(reloc.slot, first);
    }

    #[test]
    fn test_fix_batch_classrooms() {
        let problem = load(fixtures::restricted_input());
        let mut ind = Individual::new(vec![
            entry(1, 1, 10, 2, slot(Day::Monday, 1)),
            entry(2, 2, 11, 2, slot(Day::Monday, 1)),
        ]);
        assert_eq!(validate_and_fix_batch_classrooms(&problem, &mut ind), 1);
        assert_eq!(ind.entries[0].classroom, ClassroomId(1));
        assert!(!ind.entries[0].flags.fallback_classroom);
    }

    #[test]
    fn test_fix_batch_classrooms_fallback_when_full() {
        let problem = load(fixtures::restricted_input());
        let s = slot(Day::Monday, 1);
        // Batch 2 already sits in classroom 1, the only one batch 1 may use.
        let mut ind = Individual::new(vec![entry(2, 2, 11, 1, s), entry(1, 1, 10, 2, s)]);
        assert_eq!(validate_and_fix_batch_classrooms(&problem, &mut ind), 1);
        assert_eq!(ind.entries[1].classroom, ClassroomId(1));
        assert!(ind.entries[1].flags.fallback_classroom);
        assert!(ind.entries[1].flags.classroom_collision);
    }

    #[test]
    fn test_fix_batch_classrooms_idempotent() {
        let problem = load(fixtures::restricted_input());
        let mut ind = Individual::new(vec![
            entry(1, 1, 10, 2, slot(Day::Monday, 1)),
            entry(1, 1, 10, 2, slot(Day::Tuesday, 1)),
        ]);
        validate_and_fix_batch_classrooms(&problem, &mut ind);
        let snapshot = ind.entries.clone();
        assert_eq!(validate_and_fix_batch_classrooms(&problem, &mut ind), 0);
        assert_eq!(ind.entries, snapshot);
    }

    #[test]
    fn test_over_scheduling_keeps_preferred() {
        let pinned = slot(Day::Friday, 2);
        let input = fixtures::single_batch_input()
            .with_constraint(Constraint::subject_slot(BatchId(1), SubjectId(1), pinned));
        let problem = load(input);
        let mut ind = Individual::new(vec![
            entry(1, 1, 10, 1, slot(Day::Monday, 1)),
            entry(1, 1, 10, 1, slot(Day::Monday, 2)), // daily excess
            entry(1, 1, 10, 1, slot(Day::Tuesday, 1)),
            entry(1, 1, 10, 1, pinned),
        ]);
        refresh_flags(&problem, &mut ind);

        let removed = validate_and_fix_over_scheduling(&problem, &mut ind);
        assert_eq!(removed, 2);
        assert_eq!(ind.count(BatchId(1), SubjectId(1)), 2);
        assert!(ind.entries.iter().any(|e| e.slot == pinned));
        let days = ind.day_counts(BatchId(1), SubjectId(1));
        assert!(days.iter().all(|&d| d <= 1));
    }

    #[test]
    fn test_fill_under_scheduled() {
        let problem = load(fixtures::single_batch_input());
        let mut ind = Individual::new(vec![entry(1, 1, 10, 1, slot(Day::Monday, 1))]);
        let added = fill_under_scheduled(&problem, &mut ind);

        assert_eq!(added, 3);
        assert_eq!(ind.count(BatchId(1), SubjectId(1)), 2);
        assert_eq!(ind.count(BatchId(1), SubjectId(2)), 2);
        assert!(detect_conflicts(&ind.entries).is_empty());
        assert!(ind.day_counts(BatchId(1), SubjectId(1)).iter().all(|&d| d <= 1));
    }

    #[test]
    fn test_balance_classroom_distribution() {
        let problem = load(fixtures::single_batch_input());
        let mut ind = Individual::new(vec![
            entry(1, 1, 10, 1, slot(Day::Monday, 1)),
            entry(1, 1, 10, 1, slot(Day::Tuesday, 1)),
            entry(1, 2, 11, 1, slot(Day::Wednesday, 1)),
            entry(1, 2, 11, 1, slot(Day::Thursday, 1)),
        ]);
        let moved = balance_classroom_distribution(&problem, &mut ind);
        assert!(moved >= 1);
        let in_two = ind.entries.iter().filter(|e| e.classroom == ClassroomId(2)).count();
        assert_eq!(in_two, 2);
    }

    #[test]
    fn test_choose_classroom_order() {
        let s = slot(Day::Monday, 1);
        let input = fixtures::single_batch_input()
            .with_constraint(Constraint::classroom_slot(BatchId(1), ClassroomId(2), s));
        let problem = load(input);

        let occ = Occupancy::default();
        assert_eq!(
            choose_classroom(&problem, &occ, BatchId(1), s),
            Some(ClassroomChoice::Preferred(ClassroomId(2)))
        );
        let other = slot(Day::Monday, 2);
        assert_eq!(
            choose_classroom(&problem, &occ, BatchId(1), other),
            Some(ClassroomChoice::Free(ClassroomId(1)))
        );

        let occ = Occupancy::from_entries(&[
            entry(9, 1, 10, 1, other),
            entry(9, 1, 10, 2, other),
        ]);
        assert!(choose_classroom(&problem, &occ, BatchId(1), other)
            .is_some_and(ClassroomChoice::is_fallback));
    }

    #[test]
    fn test_best_alternative_respects_daily_cap() {
        let problem = load(fixtures::single_batch_input());
        let mut entries = vec![entry(1, 1, 10, 1, slot(Day::Monday, 1))];
        for day in [Day::Tuesday, Day::Wednesday, Day::Thursday, Day::Friday] {
            entries.push(entry(1, 1, 10, 1, slot(day, 1)));
        }
        let reloc = find_best_alternative_slot(&problem, &entries, 0).unwrap();
        assert!(matches!(reloc.slot.day, Day::Monday | Day::Saturday));
    }

    #[test]
    fn test_fill_under_scheduled_places_despite_collisions() {
        let input = ProblemInput::new()
            .with_subject(Subject::new(1, 6, 1))
            .with_faculty(Faculty::new(10))
            .with_classroom(Classroom::new(1))
            .with_classroom(Classroom::new(2))
            .with_batch(Batch::new(1).with_subject(SubjectId(1), FacultyId(10)))
            .with_batch(Batch::new(2).with_subject(SubjectId(1), FacultyId(10)));
        let problem = load(input);
        // Batch 2 keeps the only teacher busy in every slot.
        let mut ind = Individual::new(Slot::all().map(|s| entry(2, 1, 10, 2, s)).collect());

        let added = fill_under_scheduled(&problem, &mut ind);
        assert_eq!(added, 6);
        assert_eq!(ind.count(BatchId(1), SubjectId(1)), 6);
        assert!(ind.day_counts(BatchId(1), SubjectId(1)).iter().all(|&d| d == 1));
        let filled: Vec<_> = ind.batch_entries(BatchId(1)).collect();
        assert!(filled.iter().all(|e| e.flags.teacher_collision));
        assert!(filled.iter().all(|e| e.classroom == ClassroomId(1)));
        assert!(filled.iter().all(|e| !e.flags.classroom_collision));
    }

    #[test]
    fn test_fixed_entries_are_not_preferred() {
        let pinned = slot(Day::Friday, 2);
        let input = fixtures::single_batch_input()
            .with_constraint(Constraint::subject_slot(BatchId(1), SubjectId(1), pinned));
        let problem = load(input);
        let mut ind = Individual::new(vec![
            entry(1, 2, 11, 2, slot(Day::Monday, 1)).fixed(),
            entry(1, 1, 10, 1, pinned).fixed(),
        ]);
        refresh_flags(&problem, &mut ind);
        assert!(ind.entries[0].flags.fixed);
        assert!(!ind.entries[0].flags.preferred);
        assert!(ind.entries[1].flags.preferred);
    }
}
