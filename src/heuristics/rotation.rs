//! Folding of an unbounded schedule into a period.

use tracing::debug;

use super::{PeriodicTable, Rotator};
use crate::models::{Assignment, ScheduleProblem};

/// Re-places operations in the order of their unbounded start cycle, each at
/// the earliest cycle after its predecessors whose slot still admits it.
///
/// Every operation gets a window of two periods past its ready time. If the
/// unbounded schedule is rotated at its own length it is never made longer.
#[derive(Debug, Clone, Default)]
pub struct RotationPass;

impl RotationPass {
    /// Creates a rotation pass.
    pub fn new() -> Self {
        Self
    }
}

impl Rotator for RotationPass {
    fn name(&self) -> &'static str {
        "rotation"
    }

    fn rotate(
        &self,
        problem: &ScheduleProblem,
        unbounded: &Assignment,
        period: u32,
    ) -> Option<Assignment> {
        let mut table = PeriodicTable::periodic(problem, period).ok()?;
        let dag = problem.dag();
        let topo = dag.topological_order();
        let mut rank = vec![0usize; dag.len()];
        for (pos, &idx) in topo.iter().enumerate() {
            rank[idx] = pos;
        }

        // Start order; ties by topological rank so zero-delay edges stay ordered.
        let mut order = Vec::with_capacity(dag.len());
        for (idx, op) in dag.operations().iter().enumerate() {
            order.push((unbounded.start(&op.id)?, rank[idx], idx));
        }
        order.sort_unstable();
        let order: Vec<usize> = order.into_iter().map(|(_, _, idx)| idx).collect();

        let rotated = table.place_all(&order, Some(2 * period));
        debug!(
            period,
            success = rotated.is_some(),
            length = rotated.as_ref().map(Assignment::length),
            "rotation"
        );
        rotated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heuristics::{PrmtScheduler, UnboundedSeeder};
    use crate::testing::chain_problem;
    use crate::validation::check_schedule;

    #[test]
    fn test_rotate_chain_at_two() {
        let problem = chain_problem();
        let unbounded = PrmtScheduler::new().schedule(&problem);
        let a = RotationPass::new().rotate(&problem, &unbounded, 2).unwrap();
        assert!(check_schedule(&problem, &a, Some(2)).unwrap().is_empty());
        assert_eq!(a.max_start(), Some(5));
    }

    #[test]
    fn test_rotate_chain_at_one_fails() {
        let problem = chain_problem();
        let unbounded = PrmtScheduler::new().schedule(&problem);
        assert_eq!(RotationPass::new().rotate(&problem, &unbounded, 1), None);
    }

    #[test]
    fn test_zero_period() {
        let problem = chain_problem();
        let unbounded = PrmtScheduler::new().schedule(&problem);
        assert_eq!(RotationPass::new().rotate(&problem, &unbounded, 0), None);
    }

    #[test]
    fn test_missing_operation() {
        let problem = chain_problem();
        let partial = Assignment::from_starts([("A", 0), ("B", 2)]);
        assert_eq!(RotationPass::new().rotate(&problem, &partial, 3), None);
    }
}
