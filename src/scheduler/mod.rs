//! Top-level timetable generation.
//!
//! [`TimetableScheduler`] runs one generation request end to end:
//!
//! 1. Validate the [`GaConfig`] (caller mistakes fail fast)
//! 2. Check input integrity and log every issue
//! 3. Load the [`TimetableProblem`] for the run mode
//! 4. Run the GA to completion
//! 5. Derive the [`ViolationReport`] and [`TimetableKpi`] from the best timetable
//! 6. Shape the entries for the run mode
//!
//! Infeasible input never fails a run. The schedule degrades and the
//! shortfall is listed in the report.

mod kpi;
mod report;

pub use kpi::TimetableKpi;
pub use report::{
    ClassroomSlotViolation, ClassroomViolation, CollisionViolation, PreferenceStatus,
    QuotaViolation, ReportSummary, RestrictedBatchUsage, Severity, SubjectSlotViolation,
    TeacherSlotViolation, ViolationReport,
};

use std::collections::BTreeMap;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::TimetableError;
use crate::ga::{FitnessBreakdown, GaConfig, GaRunner, GeneticOperators, GenerationStats};
use crate::models::{BatchId, ScheduleEntry};
use crate::problem::{ProblemInput, RunMode, TimetableProblem};
use crate::validation::validate_input;

/// A generation request as a single JSON document.
///
/// ```json
/// { "input": { "batches": [...], "subjects": [...] }, "mode": { "single": 3 } }
/// ```
///
/// `mode` defaults to all batches and `config` to [`GaConfig::default`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimetableRequest {
    pub input: ProblemInput,
    #[serde(default = "all_batches")]
    pub mode: RunMode,
    #[serde(default)]
    pub config: GaConfig,
}

fn all_batches() -> RunMode {
    RunMode::AllBatches
}

impl TimetableRequest {
    /// Creates an all-batches request with the default configuration.
    pub fn new(input: ProblemInput) -> Self {
        Self {
            input,
            mode: RunMode::AllBatches,
            config: GaConfig::default(),
        }
    }

    /// Sets the run mode.
    pub fn with_mode(mut self, mode: RunMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the GA configuration.
    pub fn with_config(mut self, config: GaConfig) -> Self {
        self.config = config;
        self
    }

    /// Parses a request from JSON.
    pub fn from_json(json: &str) -> Result<Self, TimetableError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Generated entries, shaped by run mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleOutput {
    /// Single-batch mode: one flat list.
    Single(Vec<ScheduleEntry>),
    /// All-batches mode: entries keyed by batch.
    ByBatch(BTreeMap<BatchId, Vec<ScheduleEntry>>),
}

impl ScheduleOutput {
    /// All entries regardless of shape.
    pub fn entries(&self) -> Vec<&ScheduleEntry> {
        match self {
            Self::Single(entries) => entries.iter().collect(),
            Self::ByBatch(map) => map.values().flatten().collect(),
        }
    }

    /// Total number of entries.
    pub fn len(&self) -> usize {
        match self {
            Self::Single(entries) => entries.len(),
            Self::ByBatch(map) => map.values().map(Vec::len).sum(),
        }
    }

    /// Whether no entries were generated.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result of one generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimetableOutput {
    pub schedule: ScheduleOutput,
    pub report: ViolationReport,
    pub stats: TimetableKpi,
    pub fitness: FitnessBreakdown,
    /// Generations actually run.
    pub generations: usize,
    /// Per-generation search statistics.
    pub history: Vec<GenerationStats>,
}

/// GA-based timetable generator.
///
/// # Example
///
/// ```
/// use u_timetable::ga::GaConfig;
/// use u_timetable::models::{Batch, Classroom, Faculty, FacultyId, Subject, SubjectId};
/// use u_timetable::problem::{ProblemInput, RunMode};
/// use u_timetable::scheduler::TimetableScheduler;
///
/// let input = ProblemInput::new()
///     .with_subject(Subject::new(1, 3, 1))
///     .with_faculty(Faculty::new(7))
///     .with_classroom(Classroom::new(1))
///     .with_batch(Batch::new(1).with_subject(SubjectId(1), FacultyId(7)));
///
/// let scheduler = TimetableScheduler::new().with_config(
///     GaConfig::default()
///         .with_population_size(6)
///         .with_max_generations(3)
///         .with_seed(7),
/// );
/// let output = scheduler.generate(&input, RunMode::AllBatches).unwrap();
/// assert_eq!(output.schedule.len(), 3);
/// assert_eq!(output.stats.total_collisions(), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TimetableScheduler {
    config: GaConfig,
    operators: GeneticOperators,
}

impl TimetableScheduler {
    /// Creates a scheduler with the default configuration and all operators.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the GA configuration.
    pub fn with_config(mut self, config: GaConfig) -> Self {
        self.config = config;
        self
    }

    /// Restricts the genetic operators.
    pub fn with_operators(mut self, operators: GeneticOperators) -> Self {
        self.operators = operators;
        self
    }

    pub fn config(&self) -> &GaConfig {
        &self.config
    }

    /// Generates a timetable for `input`.
    ///
    /// # Errors
    /// [`TimetableError::InvalidConfig`] for an out-of-range configuration,
    /// [`TimetableError::UnknownBatch`] or [`TimetableError::NoBatches`] when
    /// the run mode selects nothing.
    pub fn generate(
        &self,
        input: &ProblemInput,
        mode: RunMode,
    ) -> Result<TimetableOutput, TimetableError> {
        self.config.validate()?;

        if let Err(issues) = validate_input(input) {
            for issue in &issues {
                warn!("input: {issue}");
            }
        }

        let problem = TimetableProblem::load(input, mode)?;
        let result = GaRunner::new(&problem, self.config.clone())
            .with_operators(self.operators.clone())
            .run();

        let entries = result.best.entries;
        let report = ViolationReport::build(&problem, &entries);
        let stats = TimetableKpi::calculate(&problem, &entries);

        info!(
            "timetable generated: {} classes, {} collisions, {} high / {} medium issues, fitness {:.3} in {:?}",
            stats.total_classes,
            stats.total_collisions(),
            report.summary.high_severity,
            report.summary.medium_severity,
            result.fitness.total,
            result.elapsed
        );

        let schedule = match mode {
            RunMode::Single(_) => ScheduleOutput::Single(entries),
            RunMode::AllBatches => {
                let mut by_batch: BTreeMap<BatchId, Vec<ScheduleEntry>> = problem
                    .plans()
                    .iter()
                    .map(|p| (p.id, Vec::new()))
                    .collect();
                for entry in entries {
                    by_batch.entry(entry.batch).or_default().push(entry);
                }
                ScheduleOutput::ByBatch(by_batch)
            }
        };

        Ok(TimetableOutput {
            schedule,
            report,
            stats,
            fitness: result.fitness,
            generations: result.generations,
            history: result.history,
        })
    }

    /// Executes a request with the request's own configuration.
    pub fn run_request(
        &self,
        request: &TimetableRequest,
    ) -> Result<TimetableOutput, TimetableError> {
        Self {
            config: request.config.clone(),
            operators: self.operators.clone(),
        }
        .generate(&request.input, request.mode)
    }
}
