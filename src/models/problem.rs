//! Problem instance: graph plus hardware limits.

use super::{HardwareLimits, ScheduleDag};
use crate::error::{Result, ScheduleError};

/// An immutable scheduling instance.
///
/// Combines the dependency graph with the hardware it runs on. Every solver
/// takes it by reference; nothing mutates it.
#[derive(Debug, Clone)]
pub struct ScheduleProblem {
    dag: ScheduleDag,
    limits: HardwareLimits,
}

impl ScheduleProblem {
    /// Creates a problem instance.
    ///
    /// # Errors
    /// `ScheduleError::DemandExceedsCapacity` if a single operation needs
    /// more match units or action fields than one slot holds; such an
    /// operation can never be scheduled.
    pub fn new(dag: ScheduleDag, limits: HardwareLimits) -> Result<Self> {
        for op in dag.operations() {
            let units = op.match_units(limits.match_unit_size);
            if units > limits.match_unit_limit {
                return Err(ScheduleError::DemandExceedsCapacity {
                    op: op.id.clone(),
                    resource: "match units",
                    demand: units,
                    capacity: limits.match_unit_limit,
                });
            }
            let fields = op.action_fields();
            if fields > limits.action_fields_limit {
                return Err(ScheduleError::DemandExceedsCapacity {
                    op: op.id.clone(),
                    resource: "action fields",
                    demand: fields,
                    capacity: limits.action_fields_limit,
                });
            }
        }
        Ok(Self { dag, limits })
    }

    /// The dependency graph.
    #[inline]
    pub fn dag(&self) -> &ScheduleDag {
        &self.dag
    }

    /// The hardware limits.
    #[inline]
    pub fn limits(&self) -> &HardwareLimits {
        &self.limits
    }

    /// Match units of the operation at `idx`.
    #[inline]
    pub fn match_units(&self, idx: usize) -> u32 {
        self.dag.operation(idx).match_units(self.limits.match_unit_size)
    }

    /// Action fields of the operation at `idx`.
    #[inline]
    pub fn action_fields(&self, idx: usize) -> u32 {
        self.dag.operation(idx).action_fields()
    }
}
