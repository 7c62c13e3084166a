//! Schedule seeding heuristics.
//!
//! Fast, incomplete schedulers whose output warm-starts the exact periodic
//! formulation or stands in for it. Each plays one role behind a trait so the
//! search driver can swap implementations:
//!
//! - [`UnboundedSeeder`]: a single-packet (non-periodic) schedule.
//! - [`Rotator`]: folds an unbounded schedule into a period-`T` schedule.
//! - [`PeriodicSeeder`]: builds a period-`T` schedule directly.
//!
//! The shipped implementations ([`PrmtScheduler`], [`RotationPass`],
//! [`RandomSieve`]) are list schedulers over a shared [`PeriodicTable`].
//! Edge delays already encode operation latencies, so none of them take a
//! separate latency table.
//!
//! # Reference
//! - Rau (1994), "Iterative Modulo Scheduling"
//! - Chole et al. (2017), "dRMT: Disaggregated Programmable Switching"

mod periodic;
mod prmt;
mod rotation;
mod sieve;

pub use periodic::PeriodicTable;
pub use prmt::PrmtScheduler;
pub use rotation::RotationPass;
pub use sieve::RandomSieve;

use std::fmt::Debug;

use rand::RngCore;

use crate::models::{Assignment, ScheduleProblem};

/// Produces a schedule for a single packet, ignoring pipelining.
pub trait UnboundedSeeder: Send + Sync + Debug {
    /// Seeder name (for logs).
    fn name(&self) -> &'static str;

    /// Schedules every operation at an absolute cycle.
    fn schedule(&self, problem: &ScheduleProblem) -> Assignment;
}

/// Maps an unbounded schedule onto a period.
pub trait Rotator: Send + Sync + Debug {
    /// Rotator name (for logs).
    fn name(&self) -> &'static str;

    /// Returns a period-`period` schedule derived from `unbounded`, or `None`
    /// when it cannot be folded.
    fn rotate(
        &self,
        problem: &ScheduleProblem,
        unbounded: &Assignment,
        period: u32,
    ) -> Option<Assignment>;
}

/// Builds a period-`T` schedule directly.
pub trait PeriodicSeeder: Send + Sync + Debug {
    /// Seeder name (for logs).
    fn name(&self) -> &'static str;

    /// Returns a period-`period` schedule, or `None` if none was found.
    fn seed(
        &self,
        problem: &ScheduleProblem,
        period: u32,
        rng: &mut dyn RngCore,
    ) -> Option<Assignment>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::arb_problem;
    use crate::validation::check_schedule;
    use proptest::prelude::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use std::time::Duration;

    proptest! {
        #[test]
        fn prop_prmt_schedule_is_valid(problem in arb_problem()) {
            let a = PrmtScheduler::new().schedule(&problem);
            prop_assert_eq!(a.len(), problem.dag().len());
            prop_assert!(check_schedule(&problem, &a, None).unwrap().is_empty());
        }

        #[test]
        fn prop_rotation_output_is_valid(problem in arb_problem(), period in 1u32..6) {
            let unbounded = PrmtScheduler::new().schedule(&problem);
            if let Some(a) = RotationPass::new().rotate(&problem, &unbounded, period) {
                prop_assert_eq!(a.len(), problem.dag().len());
                prop_assert!(check_schedule(&problem, &a, Some(period)).unwrap().is_empty());
            }
        }

        #[test]
        fn prop_rotation_at_own_length(problem in arb_problem()) {
            let unbounded = PrmtScheduler::new().schedule(&problem);
            let period = unbounded.length();
            let rotated = RotationPass::new().rotate(&problem, &unbounded, period);
            prop_assert!(rotated.is_some());
            let rotated = rotated.unwrap();
            prop_assert!(check_schedule(&problem, &rotated, Some(period)).unwrap().is_empty());
            prop_assert!(rotated.max_start() <= unbounded.max_start());
        }

        #[test]
        fn prop_sieve_output_is_valid(problem in arb_problem(), period in 1u32..6, seed in any::<u64>()) {
            let sieve = RandomSieve::new(Duration::from_secs(5)).with_max_attempts(4);
            let mut rng = SmallRng::seed_from_u64(seed);
            if let Some(a) = sieve.seed(&problem, period, &mut rng) {
                prop_assert_eq!(a.len(), problem.dag().len());
                prop_assert!(check_schedule(&problem, &a, Some(period)).unwrap().is_empty());
            }
        }

        #[test]
        fn prop_restretch_keeps_feasibility(problem in arb_problem(), period in 1u32..6) {
            let unbounded = PrmtScheduler::new().schedule(&problem);
            if let Some(a) = RotationPass::new().rotate(&problem, &unbounded, period) {
                let wider = a.restretch(period, period + 1).unwrap();
                prop_assert!(check_schedule(&problem, &wider, Some(period + 1)).unwrap().is_empty());
            }
        }
    }
}
