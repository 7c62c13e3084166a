//! Periodic resource-usage diagnostics.
//!
//! Folds an assignment onto the slots of a period and reports, per slot,
//! how much of each resource is used and by how many packet generations.
//! Used for reporting; feasibility is decided by the solvers.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Match key width | Sum of key bits matched in the slot |
//! | Match units | Sum of `ceil(key_width / match_unit_size)` |
//! | Action fields | Sum of fields written |
//! | Match generations | Distinct `start / T` among matches in the slot |
//! | Action generations | Distinct `start / T` among actions and conditions |

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScheduleError};
use crate::models::{Assignment, HardwareLimits, ScheduleProblem};

/// Usage of one in-period slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotUsage {
    /// Slot index in `[0, period)`.
    pub slot: u32,
    /// Key bits matched.
    pub match_key_width: u32,
    /// Rounded match units.
    pub match_units: u32,
    /// Action fields written.
    pub action_fields: u32,
    /// Distinct generations matching.
    pub match_generations: u32,
    /// Distinct generations running actions or conditions.
    pub action_generations: u32,
    /// `(generation, operation)` pairs executing in this slot.
    pub ops: Vec<(u32, String)>,
}

/// Per-slot usage of a periodic schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceUsage {
    /// Period the assignment was folded with.
    pub period: u32,
    /// One entry per slot, in slot order.
    pub slots: Vec<SlotUsage>,
}

impl ResourceUsage {
    /// Computes usage of `assignment` folded with `period`.
    ///
    /// Operations missing from the assignment are ignored.
    ///
    /// # Errors
    /// [`ScheduleError::ZeroPeriod`] for a zero period.
    pub fn calculate(
        problem: &ScheduleProblem,
        assignment: &Assignment,
        period: u32,
    ) -> Result<Self> {
        if period == 0 {
            return Err(ScheduleError::ZeroPeriod);
        }
        let mut slots: Vec<SlotUsage> = (0..period)
            .map(|slot| SlotUsage {
                slot,
                ..SlotUsage::default()
            })
            .collect();
        let mut match_gens: Vec<BTreeSet<u32>> = vec![BTreeSet::new(); period as usize];
        let mut action_gens: Vec<BTreeSet<u32>> = vec![BTreeSet::new(); period as usize];

        for (idx, op) in problem.dag().operations().iter().enumerate() {
            let Some(t) = assignment.start(&op.id) else {
                continue;
            };
            let (generation, r) = (t / period, (t % period) as usize);
            let usage = &mut slots[r];
            usage.ops.push((generation, op.id.clone()));
            if op.is_match() {
                usage.match_key_width += op.key_width;
                usage.match_units += problem.match_units(idx);
                match_gens[r].insert(generation);
            } else {
                usage.action_fields += problem.action_fields(idx);
                action_gens[r].insert(generation);
            }
        }

        for (r, usage) in slots.iter_mut().enumerate() {
            usage.match_generations = match_gens[r].len() as u32;
            usage.action_generations = action_gens[r].len() as u32;
            usage.ops.sort();
        }

        Ok(Self { period, slots })
    }

    /// Largest match-unit usage over all slots.
    pub fn peak_match_units(&self) -> u32 {
        self.slots.iter().map(|s| s.match_units).max().unwrap_or(0)
    }

    /// Largest action-field usage over all slots.
    pub fn peak_action_fields(&self) -> u32 {
        self.slots.iter().map(|s| s.action_fields).max().unwrap_or(0)
    }

    /// Largest number of generations matching in one slot.
    pub fn peak_match_generations(&self) -> u32 {
        self.slots
            .iter()
            .map(|s| s.match_generations)
            .max()
            .unwrap_or(0)
    }

    /// Largest number of generations acting in one slot.
    pub fn peak_action_generations(&self) -> u32 {
        self.slots
            .iter()
            .map(|s| s.action_generations)
            .max()
            .unwrap_or(0)
    }

    /// Whether every slot is within the hardware limits.
    pub fn fits(&self, limits: &HardwareLimits) -> bool {
        self.peak_match_units() <= limits.match_unit_limit
            && self.peak_action_fields() <= limits.action_fields_limit
            && self.peak_match_generations() <= limits.match_proc_limit
            && self.peak_action_generations() <= limits.action_proc_limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::chain_problem as problem;

    #[test]
    fn test_usage_folded_on_two_slots() {
        let a = Assignment::from_starts([("A", 0), ("B", 2), ("C", 3), ("D", 5)]);
        let usage = ResourceUsage::calculate(&problem(), &a, 2).unwrap();

        assert_eq!(usage.slots.len(), 2);
        let s0 = &usage.slots[0];
        assert_eq!(s0.match_key_width, 80);
        assert_eq!(s0.match_units, 1);
        assert_eq!(s0.action_fields, 2);
        assert_eq!(s0.match_generations, 1);
        assert_eq!(s0.ops, vec![(0, "A".to_string()), (1, "B".to_string())]);

        let s1 = &usage.slots[1];
        assert_eq!(s1.match_units, 2);
        assert_eq!(s1.match_key_width, 160);
        assert!(usage.fits(problem().limits()));
    }

    #[test]
    fn test_usage_detects_overload() {
        let a = Assignment::from_starts([("A", 0), ("B", 2), ("C", 3), ("D", 5)]);
        let usage = ResourceUsage::calculate(&problem(), &a, 1).unwrap();
        assert_eq!(usage.peak_match_units(), 3);
        assert_eq!(usage.peak_action_fields(), 4);
        assert_eq!(usage.peak_match_generations(), 2);
        assert_eq!(usage.peak_action_generations(), 2);
        assert!(!usage.fits(problem().limits()));
    }

    #[test]
    fn test_usage_empty_assignment() {
        let usage = ResourceUsage::calculate(&problem(), &Assignment::new(), 3).unwrap();
        assert_eq!(usage.slots.len(), 3);
        assert_eq!(usage.peak_match_units(), 0);
    }

    #[test]
    fn test_usage_zero_period() {
        let a = Assignment::from_starts([("A", 0)]);
        assert_eq!(
            ResourceUsage::calculate(&problem(), &a, 0),
            Err(ScheduleError::ZeroPeriod)
        );
    }
}
