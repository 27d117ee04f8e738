//! GA configuration.
//!
//! [`GaConfig`] holds every parameter of the search loop. It deserializes
//! from partial JSON; missing fields take their defaults.

use serde::{Deserialize, Serialize};

use crate::error::TimetableError;

/// Configuration for the timetable genetic algorithm.
///
/// # Defaults
///
/// ```
/// use u_timetable::ga::GaConfig;
///
/// let config = GaConfig::default();
/// assert_eq!(config.population_size, 50);
/// assert_eq!(config.tournament_size, 5);
/// ```
///
/// # Builder Pattern
///
/// ```
/// use u_timetable::ga::GaConfig;
///
/// let config = GaConfig::default()
///     .with_population_size(30)
///     .with_max_generations(40)
///     .with_seed(7);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaConfig {
    /// Number of individuals per generation.
    pub population_size: usize,

    /// Generations to run. The only stopping criterion.
    pub max_generations: usize,

    /// Contestants per tournament selection.
    pub tournament_size: usize,

    /// Best individuals copied unchanged into the next generation.
    pub elite_count: usize,

    /// Probability of crossover; otherwise the first parent passes through.
    pub crossover_rate: f64,

    /// Per-entry mutation probability at generation 0.
    pub mutation_rate: f64,

    /// Fraction of the base rate shed linearly by the last generation.
    ///
    /// The rate at progress `p` (0..1) is `mutation_rate * (1 - mutation_decay * p)`.
    pub mutation_decay: f64,

    /// Average pairwise difference below which fresh individuals are injected.
    pub diversity_threshold: f64,

    /// Fraction of the population replaced on low diversity.
    pub diversity_injection_ratio: f64,

    /// Generations with near-constant best fitness before forced replacement.
    pub stagnation_limit: usize,

    /// Best-fitness change below which a generation counts as stagnant.
    pub stagnation_epsilon: f64,

    /// Fraction of the non-elite population replaced on stagnation.
    pub stagnation_replacement_ratio: f64,

    /// Probability of hill-climbing a promising offspring.
    pub local_search_probability: f64,

    /// Passes of conflict resolution per repair call.
    pub max_repair_attempts: usize,

    /// Whether to evaluate fitness in parallel using rayon.
    pub parallel: bool,

    /// Random seed for reproducibility. `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for GaConfig {
    fn default() -> Self {
        Self {
            population_size: 50,
            max_generations: 100,
            tournament_size: 5,
            elite_count: 2,
            crossover_rate: 0.8,
            mutation_rate: 0.1,
            mutation_decay: 0.5,
            diversity_threshold: 0.15,
            diversity_injection_ratio: 0.2,
            stagnation_limit: 15,
            stagnation_epsilon: 1e-3,
            stagnation_replacement_ratio: 0.3,
            local_search_probability: 0.05,
            max_repair_attempts: 10,
            parallel: true,
            seed: None,
        }
    }
}

impl GaConfig {
    /// Sets the population size.
    pub fn with_population_size(mut self, n: usize) -> Self {
        self.population_size = n;
        self
    }

    /// Sets the number of generations.
    pub fn with_max_generations(mut self, n: usize) -> Self {
        self.max_generations = n;
        self
    }

    /// Sets the tournament size.
    pub fn with_tournament_size(mut self, n: usize) -> Self {
        self.tournament_size = n;
        self
    }

    /// Sets the elite count.
    pub fn with_elite_count(mut self, n: usize) -> Self {
        self.elite_count = n;
        self
    }

    /// Sets the crossover rate.
    pub fn with_crossover_rate(mut self, rate: f64) -> Self {
        self.crossover_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Sets the base mutation rate.
    pub fn with_mutation_rate(mut self, rate: f64) -> Self {
        self.mutation_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Sets the mutation decay.
    pub fn with_mutation_decay(mut self, decay: f64) -> Self {
        self.mutation_decay = decay.clamp(0.0, 1.0);
        self
    }

    /// Sets the diversity threshold and injection ratio.
    pub fn with_diversity(mut self, threshold: f64, injection_ratio: f64) -> Self {
        self.diversity_threshold = threshold.clamp(0.0, 1.0);
        self.diversity_injection_ratio = injection_ratio.clamp(0.0, 1.0);
        self
    }

    /// Sets the stagnation limit (0 disables stagnation handling).
    pub fn with_stagnation_limit(mut self, limit: usize) -> Self {
        self.stagnation_limit = limit;
        self
    }

    /// Sets the local search probability for offspring.
    pub fn with_local_search_probability(mut self, p: f64) -> Self {
        self.local_search_probability = p.clamp(0.0, 1.0);
        self
    }

    /// Sets the conflict-repair attempt budget.
    pub fn with_max_repair_attempts(mut self, n: usize) -> Self {
        self.max_repair_attempts = n;
        self
    }

    /// Enables or disables parallel evaluation.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Sets the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Mutation rate at `generation` of `max_generations`.
    pub fn mutation_rate_at(&self, generation: usize) -> f64 {
        let progress = if self.max_generations == 0 {
            0.0
        } else {
            generation as f64 / self.max_generations as f64
        };
        (self.mutation_rate * (1.0 - self.mutation_decay * progress.min(1.0))).clamp(0.0, 1.0)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// [`TimetableError::InvalidConfig`] naming the first bad parameter.
    /// Deserialized configs bypass the clamping setters, so rates are
    /// range-checked here as well.
    pub fn validate(&self) -> Result<(), TimetableError> {
        let invalid = |msg: &str| Err(TimetableError::InvalidConfig(msg.into()));
        if self.population_size < 2 {
            return invalid("population_size must be at least 2");
        }
        if self.tournament_size == 0 {
            return invalid("tournament_size must be at least 1");
        }
        if self.elite_count >= self.population_size {
            return invalid("elite_count must be smaller than population_size");
        }
        let rates = [
            ("crossover_rate", self.crossover_rate),
            ("mutation_rate", self.mutation_rate),
            ("mutation_decay", self.mutation_decay),
            ("diversity_threshold", self.diversity_threshold),
            ("diversity_injection_ratio", self.diversity_injection_ratio),
            ("stagnation_replacement_ratio", self.stagnation_replacement_ratio),
            ("local_search_probability", self.local_search_probability),
        ];
        for (name, value) in rates {
            if !(0.0..=1.0).contains(&value) {
                return Err(TimetableError::InvalidConfig(format!(
                    "{name} must be within 0..=1, got {value}"
                )));
            }
        }
        if !(self.stagnation_epsilon >= 0.0) {
            return invalid("stagnation_epsilon must be non-negative");
        }
        Ok(())
    }
}
