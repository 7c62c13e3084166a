//! Minimal-period search.
//!
//! Finds the smallest period `T` that admits a feasible pipelined schedule
//! by probing candidate periods. Each probe runs, in order:
//!
//! 1. the randomized sieve at `T`,
//! 2. PRMT followed by the rotation pass at `T`,
//! 3. the exact periodic model, warm-started from whichever heuristic
//!    schedule has the lower maximum start.
//!
//! With exact solving enabled its result decides the probe; a time limit
//! without a schedule counts as infeasible. Otherwise the first heuristic
//! schedule decides.
//!
//! # Search shapes
//!
//! - **Decrement**: start from a seed period (the unbounded model's round
//!   count by default), step down while probes succeed and up while none has
//!   succeeded yet. The first failure after a success ends the search; this
//!   assumes feasibility is monotone in `T`, which holds because a feasible
//!   period-`T` schedule stretched to `T + 1` stays feasible.
//! - **Bisection**: binary search over `[low, high]`, keeping the last
//!   feasible midpoint.
//!
//! # Reference
//! Chole et al. (2017), "dRMT: Disaggregated Programmable Switching"

mod config;

pub use config::{SearchConfig, StrategySelection, DEFAULT_FALLBACK_PERIOD};

use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;
use crate::exact::{ExactScheduleSolver, Formulation, RoundCounts, Solution, SolutionStatus};
use crate::heuristics::{
    PeriodicSeeder, PrmtScheduler, RandomSieve, RotationPass, Rotator, UnboundedSeeder,
};
use crate::milp::{BranchAndBound, MilpSolver};
use crate::models::{Assignment, ScheduleProblem};

/// Shape of a period search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchMode {
    /// Step from `seed` (or the unbounded model's round count).
    Decrement {
        /// Starting period; `None` uses the unbounded round count.
        seed: Option<u32>,
    },
    /// Binary search over `[low, high]`.
    Bisection {
        /// Smallest period considered.
        low: u32,
        /// Largest period considered.
        high: u32,
    },
}

/// Heuristic that supplied a warm start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeedSource {
    /// Randomized sieve.
    Sieve,
    /// PRMT followed by the rotation pass.
    Rotation,
}

/// Record of one probed period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeRecord {
    /// Period probed.
    pub period: u32,
    /// Whether a schedule was found at `period`.
    pub feasible: bool,
    /// Max start of the sieve schedule, if one was found.
    pub sieve_max_start: Option<u32>,
    /// Max start of the rotated schedule, if one was found.
    pub rotation_max_start: Option<u32>,
    /// Heuristic used as warm start (or as the answer without exact solving).
    pub warm_start: Option<SeedSource>,
    /// How the schedule was obtained; `None` when the probe failed.
    pub status: Option<SolutionStatus>,
    /// Optimality gap of the schedule.
    pub gap: Option<f64>,
    /// Wall-clock time of the probe.
    pub elapsed: Duration,
}

/// Result of a period search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    /// Smallest feasible period found.
    pub best_period: Option<u32>,
    /// Schedule at `best_period`.
    pub solution: Option<Solution>,
    /// Every probe, in order.
    pub probes: Vec<ProbeRecord>,
    /// Most recent infeasible period.
    pub last_failed: Option<u32>,
    /// Wall-clock time of the whole search.
    pub elapsed: Duration,
}

/// Side-by-side results of the unbounded baseline, a rotation-only search
/// and a search with the configured strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    /// Round counts of the unbounded model.
    pub baseline: Option<RoundCounts>,
    /// Wall-clock time of the unbounded model.
    pub baseline_elapsed: Duration,
    /// Period both searches started from.
    pub start_period: u32,
    /// PRMT + rotation decrement search.
    pub rotation: SearchOutcome,
    /// Decrement search with the configured strategies.
    pub exact: SearchOutcome,
}

/// Drives period probes over pluggable solver and heuristics.
///
/// # Example
/// ```no_run
/// use pipeline_schedule::models::{Edge, HardwareLimits, Operation, ScheduleDag, ScheduleProblem};
/// use pipeline_schedule::search::{PeriodSearchDriver, SearchConfig, SearchMode};
///
/// let dag = ScheduleDag::new(
///     vec![Operation::match_op("m", 80), Operation::action("a", 2)],
///     vec![Edge::new("m", "a", 2)],
/// ).unwrap();
/// let problem = ScheduleProblem::new(dag, HardwareLimits::new(2, 80, 4, 1, 1).unwrap()).unwrap();
///
/// let outcome = PeriodSearchDriver::new(SearchConfig::default())
///     .run(&problem, SearchMode::Decrement { seed: None })
///     .unwrap();
/// assert_eq!(outcome.best_period, Some(1));
/// ```
#[derive(Debug, Clone)]
pub struct PeriodSearchDriver {
    config: SearchConfig,
    solver: Arc<dyn MilpSolver>,
    unbounded: Arc<dyn UnboundedSeeder>,
    rotator: Arc<dyn Rotator>,
    sieve: Arc<dyn PeriodicSeeder>,
}

impl PeriodSearchDriver {
    /// Creates a driver with the built-in solver and heuristics.
    pub fn new(config: SearchConfig) -> Self {
        let sieve = RandomSieve::new(config.sieve_budget).with_max_attempts(config.sieve_attempts);
        Self {
            config,
            solver: Arc::new(BranchAndBound::new()),
            unbounded: Arc::new(PrmtScheduler::new()),
            rotator: Arc::new(RotationPass::new()),
            sieve: Arc::new(sieve),
        }
    }

    /// Replaces the integer-program backend.
    pub fn with_solver<S: MilpSolver + 'static>(mut self, solver: S) -> Self {
        self.solver = Arc::new(solver);
        self
    }

    /// Replaces the unbounded seeder.
    pub fn with_unbounded_seeder<S: UnboundedSeeder + 'static>(mut self, seeder: S) -> Self {
        self.unbounded = Arc::new(seeder);
        self
    }

    /// Replaces the rotator.
    pub fn with_rotator<R: Rotator + 'static>(mut self, rotator: R) -> Self {
        self.rotator = Arc::new(rotator);
        self
    }

    /// Replaces the periodic seeder.
    pub fn with_sieve<S: PeriodicSeeder + 'static>(mut self, sieve: S) -> Self {
        self.sieve = Arc::new(sieve);
        self
    }

    /// Replaces the strategy selection.
    pub fn with_strategies(mut self, strategies: StrategySelection) -> Self {
        self.config.strategies = strategies;
        self
    }

    /// Current configuration.
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Solves the unbounded model once.
    ///
    /// Returns its round counts (`None` without a schedule) and the solve
    /// time.
    pub fn baseline(&self, problem: &ScheduleProblem) -> Result<(Option<RoundCounts>, Duration)> {
        let started = Instant::now();
        let outcome = ExactScheduleSolver::new(problem).solve(
            self.solver.as_ref(),
            Formulation::Unbounded,
            &self.config.solver_config(),
        )?;
        let rounds = outcome.solution().and_then(|s| s.rounds);
        let elapsed = started.elapsed();
        info!(
            active_rounds = rounds.map(|r| r.active_rounds),
            elapsed_ms = elapsed.as_millis() as u64,
            "unbounded baseline"
        );
        Ok((rounds, elapsed))
    }

    /// Decrement start period: the baseline round count, or the fallback.
    fn start_period(&self, rounds: Option<RoundCounts>) -> u32 {
        rounds
            .map(|r| r.active_rounds)
            .filter(|&p| p > 0)
            .unwrap_or(self.config.fallback_period)
    }

    /// Runs one search.
    pub fn run(&self, problem: &ScheduleProblem, mode: SearchMode) -> Result<SearchOutcome> {
        let started = Instant::now();
        let mut rng = SmallRng::seed_from_u64(self.config.seed);
        let unbounded = self.unbounded.schedule(problem);

        let mut outcome = SearchOutcome {
            best_period: None,
            solution: None,
            probes: Vec::new(),
            last_failed: None,
            elapsed: Duration::ZERO,
        };

        match mode {
            SearchMode::Decrement { seed } => {
                let seed = match seed {
                    Some(p) => p,
                    None => self.start_period(self.baseline(problem)?.0),
                };
                let cap = self
                    .config
                    .max_period
                    .unwrap_or_else(|| unbounded.length().max(seed))
                    .max(1);
                let mut period = seed.clamp(1, cap);
                info!(seed = period, cap, "decrement search");

                loop {
                    let solution = self.probe(problem, &unbounded, period, &mut rng, &mut outcome)?;
                    match solution {
                        Some(solution) => {
                            outcome.best_period = Some(period);
                            outcome.solution = Some(solution);
                            if period == 1 || outcome.last_failed == Some(period - 1) {
                                break;
                            }
                            period -= 1;
                        }
                        None => {
                            outcome.last_failed = Some(period);
                            if outcome.best_period.is_some() || period >= cap {
                                break;
                            }
                            period += 1;
                        }
                    }
                }
            }
            SearchMode::Bisection { low, high } => {
                let (mut low, mut high) = (low.max(1), high);
                info!(low, high, "bisection search");
                while low <= high {
                    let mid = low + (high - low + 1) / 2;
                    let solution = self.probe(problem, &unbounded, mid, &mut rng, &mut outcome)?;
                    match solution {
                        Some(solution) => {
                            outcome.best_period = Some(mid);
                            outcome.solution = Some(solution);
                            high = mid - 1;
                        }
                        None => {
                            outcome.last_failed = Some(mid);
                            low = mid + 1;
                        }
                    }
                }
            }
        }

        outcome.elapsed = started.elapsed();
        info!(
            best_period = outcome.best_period,
            probes = outcome.probes.len(),
            last_failed = outcome.last_failed,
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            "search finished"
        );
        Ok(outcome)
    }

    /// Probes one period and records it in `outcome`.
    fn probe(
        &self,
        problem: &ScheduleProblem,
        unbounded: &Assignment,
        period: u32,
        rng: &mut dyn RngCore,
        outcome: &mut SearchOutcome,
    ) -> Result<Option<Solution>> {
        let started = Instant::now();
        let strategies = self.config.strategies;

        let sieved = if strategies.sieve {
            self.sieve.seed(problem, period, rng)
        } else {
            None
        };
        let rotated = if strategies.rotation {
            self.rotator.rotate(problem, unbounded, period)
        } else {
            None
        };

        let sieve_max_start = sieved.as_ref().and_then(Assignment::max_start);
        let rotation_max_start = rotated.as_ref().and_then(Assignment::max_start);
        let (warm_start, warm) = match (sieved, rotated) {
            (Some(s), Some(r)) if r.max_start() < s.max_start() => (Some(SeedSource::Rotation), Some(r)),
            (Some(s), _) => (Some(SeedSource::Sieve), Some(s)),
            (None, Some(r)) => (Some(SeedSource::Rotation), Some(r)),
            (None, None) => (None, None),
        };
        debug!(period, ?sieve_max_start, ?rotation_max_start, ?warm_start, "probe seeds");

        let solution = if strategies.exact {
            ExactScheduleSolver::new(problem)
                .with_warm_start(warm)
                .solve(
                    self.solver.as_ref(),
                    Formulation::Periodic { period },
                    &self.config.solver_config(),
                )?
                .into_solution()
        } else {
            warm.map(|a| Solution::heuristic(problem, a, period, started.elapsed()))
                .transpose()?
        };

        let record = ProbeRecord {
            period,
            feasible: solution.is_some(),
            sieve_max_start,
            rotation_max_start,
            warm_start,
            status: solution.as_ref().map(|s| s.status),
            gap: solution.as_ref().map(|s| s.gap),
            elapsed: started.elapsed(),
        };
        info!(
            period,
            feasible = record.feasible,
            length = solution.as_ref().map(|s| s.length),
            elapsed_ms = record.elapsed.as_millis() as u64,
            "probe finished"
        );
        outcome.probes.push(record);
        Ok(solution)
    }

    /// Runs the unbounded baseline, then a rotation-only and a configured
    /// decrement search from the baseline round count.
    pub fn compare(&self, problem: &ScheduleProblem) -> Result<ComparisonReport> {
        let (baseline, baseline_elapsed) = self.baseline(problem)?;
        let start_period = self.start_period(baseline);
        let mode = SearchMode::Decrement {
            seed: Some(start_period),
        };

        let rotation = self
            .clone()
            .with_strategies(StrategySelection::rotation_only())
            .run(problem, mode)?;
        let exact = self.run(problem, mode)?;

        info!(
            baseline = baseline.map(|r| r.active_rounds),
            rotation = rotation.best_period,
            exact = exact.best_period,
            exact_last_failed = exact.last_failed,
            "comparison finished"
        );
        Ok(ComparisonReport {
            baseline,
            baseline_elapsed,
            start_period,
            rotation,
            exact,
        })
    }
}
