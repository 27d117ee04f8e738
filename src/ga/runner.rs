//! Genetic search loop.
//!
//! # Algorithm
//!
//! 1. Seed the population with [`build_individual`].
//! 2. Each generation: copy the elite, then fill the rest with tournament
//!    selection, crossover, decaying mutation and occasional local search.
//! 3. Inject fresh individuals when diversity collapses, and replace part
//!    of the non-elite population when the best fitness stagnates.
//! 4. After the last generation, hill-climb and repair the best individual
//!    found.
//!
//! The loop stops only when the generation budget is exhausted.

use std::time::{Duration, Instant};

use log::{debug, info};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::fitness::{ensure_evaluated, evaluate, FitnessBreakdown};
use super::local_search::local_search;
use super::operators::GeneticOperators;
use super::repair::{
    fill_under_scheduled, refresh_flags, resolve_conflicts, validate_and_fix_batch_classrooms,
    validate_and_fix_over_scheduling,
};
use super::{build_individual, GaConfig, Individual};
use crate::problem::TimetableProblem;

/// Statistics of one generation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    pub generation: usize,
    /// Best fitness found so far.
    pub best_fitness: f64,
    /// Mean fitness of the generation.
    pub average_fitness: f64,
    /// Average pairwise difference ratio.
    pub diversity: f64,
    /// Mutation rate used for the generation.
    pub mutation_rate: f64,
    /// Individuals replaced by diversity injection or stagnation resets.
    #[serde(default)]
    pub replaced: usize,
    /// Offspring handed to local search.
    #[serde(default)]
    pub local_searches: usize,
}

/// Result of a GA run.
#[derive(Debug, Clone)]
pub struct GaResult {
    /// Best individual, after the closing local search and repair.
    pub best: Individual,
    /// Objective breakdown of `best`.
    pub fitness: FitnessBreakdown,
    /// Generations run.
    pub generations: usize,
    /// Total elapsed time.
    pub elapsed: Duration,
    /// Per-generation statistics.
    pub history: Vec<GenerationStats>,
}

/// Genetic algorithm runner over one loaded problem.
pub struct GaRunner<'a> {
    problem: &'a TimetableProblem,
    config: GaConfig,
    operators: GeneticOperators,
}

impl<'a> GaRunner<'a> {
    pub fn new(problem: &'a TimetableProblem, config: GaConfig) -> Self {
        Self {
            problem,
            config,
            operators: GeneticOperators::default(),
        }
    }

    /// Replaces the genetic operators.
    pub fn with_operators(mut self, operators: GeneticOperators) -> Self {
        self.operators = operators;
        self
    }

    pub fn config(&self) -> &GaConfig {
        &self.config
    }

    /// Runs the search to completion.
    pub fn run(&self) -> GaResult {
        let start = Instant::now();
        let config = &self.config;
        let problem = self.problem;
        let mut rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };

        info!(
            "timetable GA: {} batches, {} classes required, population {}, {} generations",
            problem.plans().len(),
            problem.required_classes(),
            config.population_size,
            config.max_generations
        );

        let size = config.population_size.max(1);
        let elite = config.elite_count.min(size.saturating_sub(1));

        let mut population: Vec<Individual> = (0..size)
            .map(|_| build_individual(problem, config, &mut rng))
            .collect();
        self.evaluate_all(&mut population);
        sort_by_fitness(&mut population);

        let mut best = population[0].clone();
        let mut stagnation = Stagnation::new(best.fitness);
        let mut history = Vec::with_capacity(config.max_generations);

        for generation in 0..config.max_generations {
            let rate = config.mutation_rate_at(generation);
            let average = average_fitness(&population);

            let mut local_searches = 0;
            let mut next: Vec<Individual> = population.iter().take(elite).cloned().collect();
            while next.len() < size {
                let p1 = tournament(&population, config.tournament_size, &mut rng);
                let p2 = tournament(&population, config.tournament_size, &mut rng);
                let mut child = if rng.random_bool(config.crossover_rate.clamp(0.0, 1.0)) {
                    self.operators.crossover(problem, p1, p2, config, &mut rng)
                } else {
                    p1.clone()
                };
                self.operators.mutate(problem, &mut child, rate, config, &mut rng);

                if rng.random_bool(config.local_search_probability.clamp(0.0, 1.0)) {
                    ensure_evaluated(problem, &mut child);
                    if child.fitness >= average {
                        local_search(problem, &mut child);
                        local_searches += 1;
                    }
                }
                next.push(child);
            }
            population = next;
            self.evaluate_all(&mut population);
            sort_by_fitness(&mut population);

            let diversity = population_diversity(&population);
            let mut replaced = 0;
            if diversity < config.diversity_threshold {
                let n = replacement_count(size, elite, config.diversity_injection_ratio);
                replace_worst(problem, config, &mut population, n, &mut rng);
                replaced += n;
                debug!("gen {generation}: diversity {diversity:.3}, injected {n} individuals");
            }

            let gen_best = population[0].fitness;
            if stagnation.observe(gen_best, config.stagnation_epsilon, config.stagnation_limit) {
                let n = replacement_count(size, elite, config.stagnation_replacement_ratio);
                replace_worst(problem, config, &mut population, n, &mut rng);
                replaced += n;
                debug!("gen {generation}: stagnated at {gen_best:.2}, replaced {n} individuals");
            }

            if replaced > 0 {
                self.evaluate_all(&mut population);
                sort_by_fitness(&mut population);
            }
            if population[0].fitness > best.fitness {
                best = population[0].clone();
            }

            let stats = GenerationStats {
                generation,
                best_fitness: best.fitness,
                average_fitness: average_fitness(&population),
                diversity,
                mutation_rate: rate,
                replaced,
                local_searches,
            };
            debug!(
                "gen {}: best={:.2}, avg={:.2}, diversity={:.3}, mutation={:.3}",
                generation, stats.best_fitness, stats.average_fitness, diversity, rate
            );
            history.push(stats);
        }

        local_search(problem, &mut best);
        final_repair(problem, config, &mut best);
        let fitness = evaluate(problem, &best);
        best.fitness = fitness.total;

        info!(
            "timetable GA done: {} entries, fitness {:.2} in {:?}",
            best.len(),
            fitness.total,
            start.elapsed()
        );

        GaResult {
            best,
            fitness,
            generations: history.len(),
            elapsed: start.elapsed(),
            history,
        }
    }

    fn evaluate_all(&self, population: &mut [Individual]) {
        let problem = self.problem;
        if self.config.parallel {
            population
                .par_iter_mut()
                .for_each(|ind| ensure_evaluated(problem, ind));
        } else {
            population
                .iter_mut()
                .for_each(|ind| ensure_evaluated(problem, ind));
        }
    }
}

/// Closing repair pass applied to the returned individual.
fn final_repair(problem: &TimetableProblem, config: &GaConfig, individual: &mut Individual) {
    resolve_conflicts(problem, individual, config.max_repair_attempts);
    validate_and_fix_batch_classrooms(problem, individual);
    validate_and_fix_over_scheduling(problem, individual);
    fill_under_scheduled(problem, individual);
    refresh_flags(problem, individual);
}

/// Sorts best first. Stable, so equal fitness keeps insertion order.
fn sort_by_fitness(population: &mut [Individual]) {
    population.sort_by(|a, b| b.fitness.total_cmp(&a.fitness));
}

/// Tournament selection on a population sorted best first.
fn tournament<'p, R: Rng>(
    population: &'p [Individual],
    size: usize,
    rng: &mut R,
) -> &'p Individual {
    let winner = (0..size.max(1))
        .map(|_| rng.random_range(0..population.len()))
        .min()
        .unwrap_or(0);
    &population[winner]
}

fn average_fitness(population: &[Individual]) -> f64 {
    let finite: Vec<f64> = population
        .iter()
        .map(|i| i.fitness)
        .filter(|f| f.is_finite())
        .collect();
    if finite.is_empty() {
        0.0
    } else {
        finite.iter().sum::<f64>() / finite.len() as f64
    }
}

/// Average pairwise [`Individual::difference_ratio`].
pub fn population_diversity(population: &[Individual]) -> f64 {
    let n = population.len();
    if n < 2 {
        return 0.0;
    }
    let mut total = 0.0;
    for i in 0..n {
        for j in (i + 1)..n {
            total += population[i].difference_ratio(&population[j]);
        }
    }
    total / (n * (n - 1) / 2) as f64
}

/// Consecutive generations whose best fitness moved less than epsilon.
#[derive(Debug, Clone, Copy)]
struct Stagnation {
    last_best: f64,
    stagnant: usize,
}

impl Stagnation {
    fn new(best: f64) -> Self {
        Self {
            last_best: best,
            stagnant: 0,
        }
    }

    /// Records a generation best. Returns `true` and resets the counter once
    /// `limit` stagnant generations have accumulated. A zero limit never fires.
    fn observe(&mut self, best: f64, epsilon: f64, limit: usize) -> bool {
        if (best - self.last_best).abs() < epsilon {
            self.stagnant += 1;
        } else {
            self.stagnant = 0;
        }
        self.last_best = best;
        if limit > 0 && self.stagnant >= limit {
            self.stagnant = 0;
            true
        } else {
            false
        }
    }
}

/// Number of individuals to replace; never touches the elite.
fn replacement_count(size: usize, elite: usize, ratio: f64) -> usize {
    ((size as f64 * ratio).round() as usize).min(size - elite)
}

/// Replaces the `n` worst individuals of a best-first population with
/// freshly built, unevaluated ones.
fn replace_worst<R: Rng>(
    problem: &TimetableProblem,
    config: &GaConfig,
    population: &mut [Individual],
    n: usize,
    rng: &mut R,
) {
    let len = population.len();
    for slot in population.iter_mut().skip(len - n.min(len)) {
        *slot = build_individual(problem, config, rng);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::ga::repair::count_collisions;
    use crate::models::{Batch, BatchId, Classroom, Faculty, FacultyId, Subject, SubjectId};
    use crate::problem::{ProblemInput, RunMode};

    fn small_config() -> GaConfig {
        GaConfig::default()
            .with_population_size(8)
            .with_max_generations(5)
            .with_parallel(false)
            .with_seed(42)
    }

    #[test]
    fn test_run_single_batch() {
        let problem =
            TimetableProblem::load(&fixtures::single_batch_input(), RunMode::AllBatches).unwrap();
        let result = GaRunner::new(&problem, small_config()).run();

        assert_eq!(result.best.len(), 4);
        assert_eq!(count_collisions(&result.best.entries).total(), 0);
        assert_eq!(result.generations, 5);
        assert_eq!(result.history.len(), 5);
        assert!((result.best.fitness - result.fitness.total).abs() < 1e-10);
    }

    #[test]
    fn test_history_best_never_decreases() {
        let problem =
            TimetableProblem::load(&fixtures::multi_batch_input(), RunMode::AllBatches).unwrap();
        let result = GaRunner::new(&problem, small_config().with_max_generations(8)).run();

        for pair in result.history.windows(2) {
            assert!(pair[1].best_fitness >= pair[0].best_fitness);
        }
        assert!(result.history.iter().all(|s| (0.0..=1.0).contains(&s.diversity)));
    }

    #[test]
    fn test_same_seed_same_result() {
        let problem =
            TimetableProblem::load(&fixtures::multi_batch_input(), RunMode::AllBatches).unwrap();
        let a = GaRunner::new(&problem, small_config()).run();
        let b = GaRunner::new(&problem, small_config().with_parallel(true)).run();
        assert_eq!(a.best.entries, b.best.entries);
        assert!((a.fitness.total - b.fitness.total).abs() < 1e-10);
    }

    #[test]
    fn test_zero_generations_still_repairs() {
        let problem =
            TimetableProblem::load(&fixtures::multi_batch_input(), RunMode::AllBatches).unwrap();
        let result = GaRunner::new(&problem, small_config().with_max_generations(0)).run();
        assert_eq!(result.generations, 0);
        assert_eq!(result.best.len(), 36);
        assert_eq!(count_collisions(&result.best.entries).batch, 0);
    }

    #[test]
    fn test_final_repair_restores_quota_under_cap() {
        let problem =
            TimetableProblem::load(&fixtures::shared_teacher_input(), RunMode::AllBatches)
                .unwrap();
        let config = GaConfig::default();
        let mut rng = SmallRng::seed_from_u64(42);
        let mut ind = build_individual(&problem, &config, &mut rng);
        let mut kept = 0;
        ind.entries.retain(|e| {
            if e.batch != BatchId(1) {
                return true;
            }
            kept += 1;
            kept <= 12
        });

        final_repair(&problem, &config, &mut ind);

        for batch in [BatchId(1), BatchId(2)] {
            assert_eq!(ind.count(batch, SubjectId(1)), 20);
            assert!(ind.day_counts(batch, SubjectId(1)).iter().all(|&d| d <= 4));
        }
        let flagged = ind.entries.iter().filter(|e| e.flags.teacher_collision).count();
        assert!(flagged >= 4);
    }

    #[test]
    fn test_tournament_prefers_front() {
        let population: Vec<Individual> = (0..10)
            .map(|i| {
                let mut ind = Individual::default();
                ind.fitness = 10.0 - i as f64;
                ind
            })
            .collect();
        let mut rng = SmallRng::seed_from_u64(42);
        let front = (0..100)
            .filter(|_| tournament(&population, 5, &mut rng).fitness > 5.0)
            .count();
        assert!(front > 80);
    }

    #[test]
    fn test_diversity_of_clones_is_zero() {
        let problem =
            TimetableProblem::load(&fixtures::single_batch_input(), RunMode::AllBatches).unwrap();
        let mut rng = SmallRng::seed_from_u64(42);
        let ind = build_individual(&problem, &GaConfig::default(), &mut rng);
        let population = vec![ind.clone(), ind.clone(), ind];
        assert!(population_diversity(&population).abs() < 1e-10);
    }

    /// Every timetable of this problem has the same fitness.
    fn constant_problem() -> TimetableProblem {
        let input = ProblemInput::new()
            .with_subject(Subject::new(1, 1, 1))
            .with_faculty(Faculty::new(10))
            .with_classroom(Classroom::new(1))
            .with_batch(Batch::new(1).with_subject(SubjectId(1), FacultyId(10)));
        TimetableProblem::load(&input, RunMode::AllBatches).unwrap()
    }

    #[test]
    fn test_stagnation_fires_and_resets() {
        let mut s = Stagnation::new(5.0);
        assert!(!s.observe(5.0, 1e-3, 2));
        assert!(s.observe(5.0, 1e-3, 2));
        assert_eq!(s.stagnant, 0);
        assert!(!s.observe(5.0, 1e-3, 2));
        assert!(!s.observe(6.0, 1e-3, 2));
        assert!(!s.observe(6.0, 1e-3, 2));
        assert!(s.observe(6.0, 1e-3, 2));

        let mut never = Stagnation::new(1.0);
        assert!((0..5).all(|_| !never.observe(1.0, 1e-3, 0)));
    }

    #[test]
    fn test_replacement_count_spares_elite() {
        assert_eq!(replacement_count(10, 2, 0.3), 3);
        assert_eq!(replacement_count(10, 2, 1.0), 8);
        assert_eq!(replacement_count(4, 3, 0.9), 1);
        assert_eq!(replacement_count(8, 2, 0.0), 0);
    }

    #[test]
    fn test_replace_worst_keeps_elite() {
        let problem =
            TimetableProblem::load(&fixtures::multi_batch_input(), RunMode::AllBatches).unwrap();
        let config = GaConfig::default();
        let mut rng = SmallRng::seed_from_u64(42);
        let mut population: Vec<Individual> =
            (0..4).map(|_| build_individual(&problem, &config, &mut rng)).collect();
        for ind in &mut population {
            ensure_evaluated(&problem, ind);
        }
        sort_by_fitness(&mut population);
        let elite: Vec<_> = population[..2].iter().map(|i| i.entries.clone()).collect();

        let n = replacement_count(4, 2, 1.0);
        replace_worst(&problem, &config, &mut population, n, &mut rng);

        assert_eq!(population[0].entries, elite[0]);
        assert_eq!(population[1].entries, elite[1]);
        assert!(population[..2].iter().all(Individual::is_evaluated));
        assert!(population[2..].iter().all(|i| !i.is_evaluated()));
    }

    #[test]
    fn test_injection_breaks_up_clones() {
        let problem =
            TimetableProblem::load(&fixtures::multi_batch_input(), RunMode::AllBatches).unwrap();
        let config = GaConfig::default();
        let mut rng = SmallRng::seed_from_u64(42);
        let ind = build_individual(&problem, &config, &mut rng);
        let mut population = vec![ind; 6];
        assert!(population_diversity(&population).abs() < 1e-10);

        replace_worst(&problem, &config, &mut population, 3, &mut rng);
        assert!(population_diversity(&population) > 0.0);
    }

    #[test]
    fn test_low_diversity_triggers_injection() {
        let problem =
            TimetableProblem::load(&fixtures::multi_batch_input(), RunMode::AllBatches).unwrap();
        let config = small_config()
            .with_max_generations(3)
            .with_diversity(1.0, 0.5)
            .with_stagnation_limit(0);
        let result = GaRunner::new(&problem, config).run();

        assert_eq!(result.history.len(), 3);
        assert!(result.history.iter().all(|s| s.replaced == 4));
    }

    #[test]
    fn test_stagnation_replaces_part_of_population() {
        let problem = constant_problem();
        let config = small_config()
            .with_diversity(0.0, 0.2)
            .with_stagnation_limit(1);
        let result = GaRunner::new(&problem, config).run();

        // round(8 * 0.3) individuals every generation, best fitness unchanged.
        assert!(result.history.iter().all(|s| s.replaced == 2));
        let first = result.history[0].best_fitness;
        assert!(result.history.iter().all(|s| (s.best_fitness - first).abs() < 1e-10));
        assert_eq!(result.best.len(), 1);
    }

    #[test]
    fn test_no_stagnation_reset_when_disabled() {
        let problem = constant_problem();
        let config = small_config()
            .with_diversity(0.0, 0.2)
            .with_stagnation_limit(0);
        let result = GaRunner::new(&problem, config).run();
        assert!(result.history.iter().all(|s| s.replaced == 0));
    }

    #[test]
    fn test_offspring_local_search_probability() {
        let problem =
            TimetableProblem::load(&fixtures::single_batch_input(), RunMode::AllBatches).unwrap();
        // Two individuals, one elite: the single child is a clone of the
        // tournament winner, so its fitness reaches the generation average.
        let base = small_config()
            .with_population_size(2)
            .with_elite_count(1)
            .with_tournament_size(64)
            .with_crossover_rate(0.0)
            .with_mutation_rate(0.0);

        let always = GaRunner::new(&problem, base.clone().with_local_search_probability(1.0)).run();
        assert!(always.history.iter().all(|s| s.local_searches == 1));

        let never = GaRunner::new(&problem, base.with_local_search_probability(0.0)).run();
        assert!(never.history.iter().all(|s| s.local_searches == 0));
    }
}
