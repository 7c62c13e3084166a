//! Periodic resource-constrained scheduling for match-action pipelines.
//!
//! Assigns start cycles to the match, action and condition operations of a
//! packet program so that a new packet can enter every `T` cycles. Operations
//! of different in-flight packets share the processor's match units and
//! action fields; the goal is the smallest period `T` with a feasible
//! schedule.
//!
//! # Modules
//!
//! - **`models`**: Domain types — `Operation`, `ScheduleDag`, `HardwareLimits`,
//!   `ScheduleProblem`, `Assignment`, `Violation`
//! - **`validation`**: Input integrity checks (duplicate IDs, unknown
//!   endpoints, cycles) and the schedule checker
//! - **`milp`**: Backend-neutral integer programs and a built-in
//!   branch-and-bound solver
//! - **`exact`**: Unbounded and periodic integer-program formulations
//! - **`heuristics`**: PRMT, rotation and randomized sieve seeders
//! - **`scheduler`**: Randomized greedy list scheduler and per-slot usage
//! - **`search`**: Minimal-period search and strategy comparison
//!
//! # Example
//!
//! ```no_run
//! use pipeline_schedule::models::{DagBuilder, HardwareLimits, LatencySpec, Operation, ScheduleProblem};
//! use pipeline_schedule::search::{PeriodSearchDriver, SearchConfig, SearchMode};
//!
//! let dag = DagBuilder::new()
//!     .with_latency(LatencySpec::new(2, 1, 1))
//!     .with_operation(Operation::match_op("A", 80))
//!     .with_operation(Operation::action("B", 2))
//!     .with_dependency("A", "B", Default::default())
//!     .build()?;
//! let limits = HardwareLimits::new(2, 80, 4, 1, 1)?;
//! let problem = ScheduleProblem::new(dag, limits)?;
//!
//! let outcome = PeriodSearchDriver::new(SearchConfig::default())
//!     .run(&problem, SearchMode::Decrement { seed: None })?;
//! println!("period = {:?}", outcome.best_period);
//! # Ok::<(), pipeline_schedule::ScheduleError>(())
//! ```
//!
//! # References
//!
//! - Chole et al. (2017), "dRMT: Disaggregated Programmable Switching"
//! - Rau (1994), "Iterative Modulo Scheduling"
//! - Wolsey (1998), "Integer Programming"

pub mod error;
pub mod exact;
pub mod heuristics;
pub mod milp;
pub mod models;
pub mod scheduler;
pub mod search;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Result, ScheduleError};
