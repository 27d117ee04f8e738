//! Multi-objective fitness.
//!
//! # Objectives
//!
//! | Objective | Weight | Terms |
//! |-----------|--------|-------|
//! | conflicts | 0.40 | −5 batch, −10 classroom, −20 teacher clash |
//! | constraint violations | 0.25 | +100 satisfied directive, −50 disallowed classroom, −3 unmet classroom preference |
//! | preference | 0.15 | +10 per preferred entry |
//! | load balance | 0.15 | −10 × daily excess, −20 × weekly shortfall, −10 × weekly excess |
//! | utilization | 0.05 | percent of the grid occupied, averaged over batches |
//!
//! Flat penalties are added after weighting: −100 per teacher clash, −50 per
//! disallowed classroom use, −100 per unsatisfied directive.
//!
//! Higher is better. The score has no upper bound.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::repair::count_collisions;
use super::Individual;
use crate::models::{BatchId, ClassroomId, Slot, SubjectId, GRID_SIZE};
use crate::problem::TimetableProblem;

/// Objective weights.
pub const WEIGHT_CONFLICTS: f64 = 0.40;
pub const WEIGHT_CONSTRAINTS: f64 = 0.25;
pub const WEIGHT_PREFERENCE: f64 = 0.15;
pub const WEIGHT_LOAD_BALANCE: f64 = 0.15;
pub const WEIGHT_UTILIZATION: f64 = 0.05;

/// Scored objectives of one individual.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FitnessBreakdown {
    pub conflicts: f64,
    pub constraint_violations: f64,
    pub preference: f64,
    pub load_balance: f64,
    pub utilization: f64,
    /// Flat penalties (non-positive).
    pub penalties: f64,
    /// Weighted sum plus penalties.
    pub total: f64,
}

impl FitnessBreakdown {
    /// Weighted sum of the objectives, before penalties.
    pub fn weighted(&self) -> f64 {
        WEIGHT_CONFLICTS * self.conflicts
            + WEIGHT_CONSTRAINTS * self.constraint_violations
            + WEIGHT_PREFERENCE * self.preference
            + WEIGHT_LOAD_BALANCE * self.load_balance
            + WEIGHT_UTILIZATION * self.utilization
    }
}

/// Scores an individual. Pure; safe to call from many threads at once.
pub fn evaluate(problem: &TimetableProblem, individual: &Individual) -> FitnessBreakdown {
    let index = problem.index();
    let entries = &individual.entries;
    let collisions = count_collisions(entries);

    let conflicts = -5.0 * collisions.batch as f64
        - 10.0 * collisions.classroom as f64
        - 20.0 * collisions.teacher as f64;

    let placed: BTreeSet<(BatchId, SubjectId, Slot)> =
        entries.iter().map(|e| (e.batch, e.subject, e.slot)).collect();
    let rooms: BTreeSet<(BatchId, Slot, ClassroomId)> =
        entries.iter().map(|e| (e.batch, e.slot, e.classroom)).collect();

    let satisfied = index
        .directives()
        .iter()
        .filter(|d| placed.contains(&(d.batch, d.subject, d.slot)))
        .count();
    let unsatisfied = index.directives().len() - satisfied;
    let disallowed = entries
        .iter()
        .filter(|e| !index.is_classroom_allowed(e.batch, e.classroom))
        .count();
    let unmet_rooms = index
        .classroom_slot_prefs()
        .filter(|pref| !rooms.contains(pref))
        .count();

    let constraint_violations =
        100.0 * satisfied as f64 - 50.0 * disallowed as f64 - 3.0 * unmet_rooms as f64;

    let preference = 10.0 * entries.iter().filter(|e| e.flags.preferred).count() as f64;

    let groups = individual.groups();
    let mut load_balance = 0.0;
    for plan in problem.plans() {
        for planned in &plan.subjects {
            let Some(quota) = index.quota(planned.subject) else {
                continue;
            };
            let key = (plan.id, planned.subject);
            let idxs = groups.get(&key).map(Vec::as_slice).unwrap_or(&[]);
            let weekly = idxs.len() as f64;
            let required = quota.weekly_required as f64;
            load_balance -= 20.0 * (required - weekly).max(0.0);
            load_balance -= 10.0 * (weekly - required).max(0.0);

            let days = individual.day_counts(plan.id, planned.subject);
            let daily_excess: u32 = days.iter().map(|&d| d.saturating_sub(quota.daily_max)).sum();
            load_balance -= 10.0 * daily_excess as f64;
        }
    }

    let plans = problem.plans();
    let utilization = if plans.is_empty() {
        0.0
    } else {
        plans
            .iter()
            .map(|p| individual.occupied_slots(p.id).len() as f64 / GRID_SIZE as f64 * 100.0)
            .sum::<f64>()
            / plans.len() as f64
    };

    let penalties = -100.0 * collisions.teacher as f64
        - 50.0 * disallowed as f64
        - 100.0 * unsatisfied as f64;

    let mut breakdown = FitnessBreakdown {
        conflicts,
        constraint_violations,
        preference,
        load_balance,
        utilization,
        penalties,
        total: 0.0,
    };
    breakdown.total = breakdown.weighted() + penalties;
    breakdown
}

/// Evaluates an individual in place if it changed since the last evaluation.
pub fn ensure_evaluated(problem: &TimetableProblem, individual: &mut Individual) {
    if !individual.is_evaluated() {
        individual.fitness = evaluate(problem, individual).total;
    }
}
