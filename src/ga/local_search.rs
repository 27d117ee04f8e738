//! Hill-climbing local search.
//!
//! Each movable entry is tried at its best alternative slot and the move is
//! kept only if fitness strictly improves. A classroom redistribution pass
//! is tried last under the same rule.

use super::fitness::{ensure_evaluated, evaluate};
use super::repair::{
    apply_relocation, balance_classroom_distribution, find_best_alternative_slot, refresh_flags,
};
use super::Individual;
use crate::problem::TimetableProblem;

/// Improves `individual` in place. Returns the number of accepted moves.
pub fn local_search(problem: &TimetableProblem, individual: &mut Individual) -> usize {
    ensure_evaluated(problem, individual);
    let mut accepted = 0;

    for i in 0..individual.entries.len() {
        if individual.entries[i].flags.fixed {
            continue;
        }
        let Some(reloc) = find_best_alternative_slot(problem, &individual.entries, i) else {
            continue;
        };
        let current = &individual.entries[i];
        if reloc.slot == current.slot && reloc.classroom == current.classroom {
            continue;
        }

        let mut candidate = Individual::new(individual.entries.clone());
        apply_relocation(&mut candidate.entries[i], reloc);
        if try_accept(problem, individual, candidate) {
            accepted += 1;
        }
    }

    let mut candidate = Individual::new(individual.entries.clone());
    if balance_classroom_distribution(problem, &mut candidate) > 0
        && try_accept(problem, individual, candidate)
    {
        accepted += 1;
    }

    accepted
}

/// Replaces `current` with `candidate` if the candidate scores strictly higher.
fn try_accept(
    problem: &TimetableProblem,
    current: &mut Individual,
    mut candidate: Individual,
) -> bool {
    refresh_flags(problem, &mut candidate);
    candidate.fitness = evaluate(problem, &candidate).total;
    if candidate.fitness > current.fitness {
        *current = candidate;
        true
    } else {
        false
    }
}
