//! Unbounded ASAP list scheduler.

use tracing::debug;

use super::{PeriodicTable, UnboundedSeeder};
use crate::models::{Assignment, ScheduleProblem};

/// Places operations in topological order at the earliest cycle that
/// satisfies their delays and the per-cycle capacities.
///
/// A single packet is scheduled, so generation limits never bind.
///
/// # Example
/// ```
/// use pipeline_schedule::heuristics::{PrmtScheduler, UnboundedSeeder};
/// use pipeline_schedule::models::{Edge, HardwareLimits, Operation, ScheduleDag, ScheduleProblem};
///
/// let dag = ScheduleDag::new(
///     vec![Operation::match_op("m", 80), Operation::action("a", 2)],
///     vec![Edge::new("m", "a", 2)],
/// ).unwrap();
/// let problem = ScheduleProblem::new(dag, HardwareLimits::new(2, 80, 4, 1, 1).unwrap()).unwrap();
///
/// let a = PrmtScheduler::new().schedule(&problem);
/// assert_eq!(a.start("a"), Some(2));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PrmtScheduler;

impl PrmtScheduler {
    /// Creates a scheduler.
    pub fn new() -> Self {
        Self
    }
}

impl UnboundedSeeder for PrmtScheduler {
    fn name(&self) -> &'static str {
        "prmt"
    }

    fn schedule(&self, problem: &ScheduleProblem) -> Assignment {
        let mut table = PeriodicTable::unbounded(problem);
        for idx in problem.dag().topological_order() {
            // Unbounded placement always succeeds.
            let _ = table.place_earliest(idx, None);
        }
        let assignment = table.assignment();
        debug!(length = assignment.length(), "prmt schedule");
        assignment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HardwareLimits, Operation, ScheduleDag};
    use crate::testing::chain_problem;

    #[test]
    fn test_chain_is_asap() {
        let a = PrmtScheduler::new().schedule(&chain_problem());
        assert_eq!(a.start("A"), Some(0));
        assert_eq!(a.start("B"), Some(2));
        assert_eq!(a.start("C"), Some(3));
        assert_eq!(a.start("D"), Some(5));
        assert_eq!(a.length(), 6);
    }

    #[test]
    fn test_capacity_pushes_later() {
        let dag = ScheduleDag::new(
            vec![
                Operation::match_op("x", 160),
                Operation::match_op("y", 160),
                Operation::match_op("z", 80),
            ],
            vec![],
        )
        .unwrap();
        let problem =
            ScheduleProblem::new(dag, HardwareLimits::new(2, 80, 4, 1, 1).unwrap()).unwrap();
        let a = PrmtScheduler::new().schedule(&problem);
        assert_eq!(a.start("x"), Some(0));
        assert_eq!(a.start("y"), Some(1));
        assert_eq!(a.start("z"), Some(2));
    }
}
