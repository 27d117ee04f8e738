//! Configurable genetic operators for timetables.
//!
//! Provides runtime-selectable crossover and mutation strategies
//! via [`GeneticOperators`]. Every call picks one strategy uniformly
//! from the enabled set, so the default operators mix all of them.
//!
//! # Usage
//!
//! ```
//! use u_timetable::ga::operators::{CrossoverType, GeneticOperators, MutationType};
//!
//! let ops = GeneticOperators::default();
//! assert_eq!(ops.crossover_types.len(), 3);
//! assert_eq!(ops.mutation_types.len(), 5);
//!
//! let only_swap = GeneticOperators::default()
//!     .with_crossover(vec![CrossoverType::BatchSwap])
//!     .with_mutation(vec![MutationType::PairSwap]);
//! assert_eq!(only_swap.crossover_types, vec![CrossoverType::BatchSwap]);
//! ```

use rand::prelude::IndexedRandom;
use rand::Rng;

use super::repair::{
    apply_relocation, choose_classroom, fill_under_scheduled, find_best_alternative_slot,
    resolve_conflicts, validate_and_fix_batch_classrooms, validate_and_fix_over_scheduling,
};
use super::{GaConfig, Individual, Occupancy};
use crate::models::{ScheduleEntry, Slot};
use crate::problem::TimetableProblem;

/// Probability that a constraint-biased mutation snaps to a directive slot.
const DIRECTIVE_SNAP_PROBABILITY: f64 = 0.9;

/// Crossover strategy for timetables.
///
/// The child always starts from the first parent and takes a part of the
/// second parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossoverType {
    /// Each class takes the slot of the matching class of the second parent
    /// with probability 0.5, unless that breaks the daily cap. Classes match
    /// by (batch, subject, occurrence).
    Uniform,
    /// One random batch is taken whole from the second parent.
    BatchSwap,
    /// One random (batch, subject) group is taken from the second parent.
    SubjectSwap,
}

impl CrossoverType {
    /// All strategies.
    pub const ALL: [CrossoverType; 3] = [Self::Uniform, Self::BatchSwap, Self::SubjectSwap];
}

/// Per-entry mutation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationType {
    /// Move to a random assignable slot.
    RandomReslot,
    /// Swap slot and classroom with another class of the same batch.
    PairSwap,
    /// Move to the best-scoring alternative slot.
    LocalSearchReslot,
    /// Pick another candidate classroom.
    ClassroomReassign,
    /// Snap to a directive slot of the (batch, subject) when one exists,
    /// otherwise move randomly.
    ConstraintBiased,
}

impl MutationType {
    /// All strategies.
    pub const ALL: [MutationType; 5] = [
        Self::RandomReslot,
        Self::PairSwap,
        Self::LocalSearchReslot,
        Self::ClassroomReassign,
        Self::ConstraintBiased,
    ];
}

/// Runtime-selectable genetic operators for the timetable GA.
///
/// # Example
///
/// ```
/// use u_timetable::ga::operators::{CrossoverType, GeneticOperators, MutationType};
///
/// let ops = GeneticOperators {
///     crossover_types: vec![CrossoverType::Uniform],
///     mutation_types: vec![MutationType::RandomReslot, MutationType::PairSwap],
/// };
/// assert_eq!(ops.mutation_types.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct GeneticOperators {
    /// Enabled crossover strategies. Empty disables crossover.
    pub crossover_types: Vec<CrossoverType>,
    /// Enabled mutation strategies. Empty disables mutation.
    pub mutation_types: Vec<MutationType>,
}

impl Default for GeneticOperators {
    fn default() -> Self {
        Self {
            crossover_types: CrossoverType::ALL.to_vec(),
            mutation_types: MutationType::ALL.to_vec(),
        }
    }
}

impl GeneticOperators {
    /// Restricts crossover to the given strategies.
    pub fn with_crossover(mut self, types: Vec<CrossoverType>) -> Self {
        self.crossover_types = types;
        self
    }

    /// Restricts mutation to the given strategies.
    pub fn with_mutation(mut self, types: Vec<MutationType>) -> Self {
        self.mutation_types = types;
        self
    }

    /// Produces one repaired child of `p1` and `p2`.
    pub fn crossover<R: Rng>(
        &self,
        problem: &TimetableProblem,
        p1: &Individual,
        p2: &Individual,
        config: &GaConfig,
        rng: &mut R,
    ) -> Individual {
        let Some(&kind) = self.crossover_types.choose(rng) else {
            return p1.clone();
        };
        let entries = match kind {
            CrossoverType::Uniform => uniform_crossover(problem, p1, p2, rng),
            CrossoverType::BatchSwap => batch_swap_crossover(problem, p1, p2, rng),
            CrossoverType::SubjectSwap => subject_swap_crossover(p1, p2, rng),
        };

        let mut child = Individual::new(entries);
        resolve_conflicts(problem, &mut child, config.max_repair_attempts);
        validate_and_fix_batch_classrooms(problem, &mut child);
        validate_and_fix_over_scheduling(problem, &mut child);
        fill_under_scheduled(problem, &mut child);
        child
    }

    /// Mutates each movable entry with probability `rate`, then repairs.
    ///
    /// Returns the number of entries mutated.
    pub fn mutate<R: Rng>(
        &self,
        problem: &TimetableProblem,
        individual: &mut Individual,
        rate: f64,
        config: &GaConfig,
        rng: &mut R,
    ) -> usize {
        if self.mutation_types.is_empty() || rate <= 0.0 {
            return 0;
        }
        let rate = rate.min(1.0);
        let mut mutated = 0;

        for i in 0..individual.entries.len() {
            if individual.entries[i].flags.fixed || !rng.random_bool(rate) {
                continue;
            }
            let Some(&kind) = self.mutation_types.choose(rng) else {
                break;
            };
            let changed = match kind {
                MutationType::RandomReslot => {
                    random_reslot(problem, &mut individual.entries, i, rng)
                }
                MutationType::PairSwap => pair_swap(&mut individual.entries, i, rng),
                MutationType::LocalSearchReslot => {
                    match find_best_alternative_slot(problem, &individual.entries, i) {
                        Some(reloc) => {
                            apply_relocation(&mut individual.entries[i], reloc);
                            true
                        }
                        None => false,
                    }
                }
                MutationType::ClassroomReassign => {
                    classroom_reassign(problem, &mut individual.entries[i], rng)
                }
                MutationType::ConstraintBiased => {
                    constraint_biased(problem, &mut individual.entries, i, rng)
                }
            };
            if changed {
                mutated += 1;
            }
        }

        if mutated > 0 {
            individual.invalidate();
            resolve_conflicts(problem, individual, config.max_repair_attempts);
            validate_and_fix_batch_classrooms(problem, individual);
        }
        mutated
    }
}

fn uniform_crossover<R: Rng>(
    problem: &TimetableProblem,
    p1: &Individual,
    p2: &Individual,
    rng: &mut R,
) -> Vec<ScheduleEntry> {
    let mut child = p1.entries.clone();
    let donor_groups = p2.groups();
    for ((batch, subject), idxs) in p1.groups() {
        let Some(donors) = donor_groups.get(&(batch, subject)) else {
            continue;
        };
        let daily_max = problem.index().quota(subject).map(|q| q.daily_max);
        let mut days = p1.day_counts(batch, subject);

        for (&i, &j) in idxs.iter().zip(donors) {
            let donor = &p2.entries[j];
            if child[i].flags.fixed || donor.flags.fixed || !rng.random_bool(0.5) {
                continue;
            }
            let (from, to) = (child[i].slot.day.index(), donor.slot.day.index());
            if from != to && daily_max.is_some_and(|max| days[to] >= max) {
                continue;
            }
            days[from] -= 1;
            days[to] += 1;
            child[i].slot = donor.slot;
            child[i].classroom = donor.classroom;
            child[i].flags.fallback_classroom = donor.flags.fallback_classroom;
        }
    }
    child
}

fn batch_swap_crossover<R: Rng>(
    problem: &TimetableProblem,
    p1: &Individual,
    p2: &Individual,
    rng: &mut R,
) -> Vec<ScheduleEntry> {
    let Some(plan) = problem.plans().choose(rng) else {
        return p1.entries.clone();
    };
    let batch = plan.id;
    p1.entries
        .iter()
        .filter(|e| e.batch != batch)
        .chain(p2.entries.iter().filter(|e| e.batch == batch))
        .cloned()
        .collect()
}

fn subject_swap_crossover<R: Rng>(
    p1: &Individual,
    p2: &Individual,
    rng: &mut R,
) -> Vec<ScheduleEntry> {
    let keys: Vec<_> = p1.groups().into_keys().collect();
    let Some(&(batch, subject)) = keys.choose(rng) else {
        return p1.entries.clone();
    };
    let in_group = |e: &&ScheduleEntry| e.batch == batch && e.subject == subject;
    p1.entries
        .iter()
        .filter(|e| !in_group(e))
        .chain(p2.entries.iter().filter(|e| in_group(e)))
        .cloned()
        .collect()
}

/// Moves entry `i` to `slot` with a freshly chosen classroom.
fn reslot_to(
    problem: &TimetableProblem,
    entries: &mut [ScheduleEntry],
    i: usize,
    slot: Slot,
) -> bool {
    let occ = Occupancy::excluding(entries, i);
    let Some(choice) = choose_classroom(problem, &occ, entries[i].batch, slot) else {
        return false;
    };
    let e = &mut entries[i];
    e.slot = slot;
    e.classroom = choice.classroom();
    e.flags.fallback_classroom = choice.is_fallback();
    true
}

fn random_reslot<R: Rng>(
    problem: &TimetableProblem,
    entries: &mut [ScheduleEntry],
    i: usize,
    rng: &mut R,
) -> bool {
    let batch = entries[i].batch;
    let open: Vec<Slot> = Slot::all().filter(|&s| !problem.is_blocked(batch, s)).collect();
    match open.choose(rng) {
        Some(&slot) => reslot_to(problem, entries, i, slot),
        None => false,
    }
}

fn pair_swap<R: Rng>(entries: &mut [ScheduleEntry], i: usize, rng: &mut R) -> bool {
    let batch = entries[i].batch;
    let partners: Vec<usize> = entries
        .iter()
        .enumerate()
        .filter(|&(j, e)| j != i && e.batch == batch && !e.flags.fixed)
        .map(|(j, _)| j)
        .collect();
    let Some(&j) = partners.choose(rng) else {
        return false;
    };
    let (slot_i, room_i) = (entries[i].slot, entries[i].classroom);
    entries[i].slot = entries[j].slot;
    entries[i].classroom = entries[j].classroom;
    entries[j].slot = slot_i;
    entries[j].classroom = room_i;
    true
}

fn classroom_reassign<R: Rng>(
    problem: &TimetableProblem,
    entry: &mut ScheduleEntry,
    rng: &mut R,
) -> bool {
    let others: Vec<_> = problem
        .candidate_classrooms(entry.batch)
        .iter()
        .copied()
        .filter(|&c| c != entry.classroom)
        .collect();
    match others.choose(rng) {
        Some(&c) => {
            entry.classroom = c;
            entry.flags.fallback_classroom = false;
            true
        }
        None => false,
    }
}

fn constraint_biased<R: Rng>(
    problem: &TimetableProblem,
    entries: &mut [ScheduleEntry],
    i: usize,
    rng: &mut R,
) -> bool {
    let (batch, subject) = (entries[i].batch, entries[i].subject);
    let targets = problem.index().directive_slots(batch, subject);
    if !targets.is_empty() && rng.random_bool(DIRECTIVE_SNAP_PROBABILITY) {
        if let Some(&slot) = targets.choose(rng) {
            return reslot_to(problem, entries, i, slot);
        }
    }
    random_reslot(problem, entries, i, rng)
}
