//! Schedule (solution) model.
//!
//! An `Assignment` maps every operation to an absolute start cycle. For a
//! period `T` each start decomposes into a generation (`start / T`, how many
//! periods ago the packet entered) and a slot (`start % T`, the in-period
//! cycle). Ordered maps keep iteration deterministic.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Result, ScheduleError};

fn nonzero(period: u32) -> Result<u32> {
    if period == 0 {
        return Err(ScheduleError::ZeroPeriod);
    }
    Ok(period)
}

/// Start cycle per operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    starts: BTreeMap<String, u32>,
}

impl Assignment {
    /// Creates an empty assignment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an assignment from `(operation, start)` pairs.
    pub fn from_starts<I, S>(starts: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        Self {
            starts: starts.into_iter().map(|(id, t)| (id.into(), t)).collect(),
        }
    }

    /// Sets the start cycle of an operation.
    pub fn insert(&mut self, op_id: impl Into<String>, start: u32) {
        self.starts.insert(op_id.into(), start);
    }

    /// Start cycle of an operation.
    pub fn start(&self, op_id: &str) -> Option<u32> {
        self.starts.get(op_id).copied()
    }

    /// Number of assigned operations.
    pub fn len(&self) -> usize {
        self.starts.len()
    }

    /// Whether nothing is assigned.
    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    /// `(operation, start)` pairs ordered by operation ID.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.starts.iter().map(|(id, &t)| (id.as_str(), t))
    }

    /// Latest start cycle.
    pub fn max_start(&self) -> Option<u32> {
        self.starts.values().copied().max()
    }

    /// Schedule length: `max(start) + 1`, or 0 when empty.
    pub fn length(&self) -> u32 {
        self.max_start().map_or(0, |m| m + 1)
    }

    /// Operations grouped by start cycle.
    pub fn ops_at_time(&self) -> BTreeMap<u32, Vec<String>> {
        let mut map: BTreeMap<u32, Vec<String>> = BTreeMap::new();
        for (id, &t) in &self.starts {
            map.entry(t).or_default().push(id.clone());
        }
        map
    }

    /// In-period slot of an operation, `None` if it is unscheduled.
    pub fn slot(&self, op_id: &str, period: u32) -> Result<Option<u32>> {
        let period = nonzero(period)?;
        Ok(self.start(op_id).map(|t| t % period))
    }

    /// Generation of an operation, `None` if it is unscheduled.
    pub fn generation(&self, op_id: &str, period: u32) -> Result<Option<u32>> {
        let period = nonzero(period)?;
        Ok(self.start(op_id).map(|t| t / period))
    }

    /// Steady-state view: per slot, the `(generation, operation)` pairs that
    /// execute there.
    pub fn ops_on_ring(&self, period: u32) -> Result<BTreeMap<u32, Vec<(u32, String)>>> {
        let period = nonzero(period)?;
        let mut ring: BTreeMap<u32, Vec<(u32, String)>> = BTreeMap::new();
        for (id, &t) in &self.starts {
            ring.entry(t % period)
                .or_default()
                .push((t / period, id.clone()));
        }
        for entries in ring.values_mut() {
            entries.sort();
        }
        Ok(ring)
    }

    /// Re-issues a period-`period` schedule at a wider period.
    ///
    /// Each start `q * period + r` becomes `q * new_period + r`: slots and
    /// generations are unchanged and gaps between operations only grow, so a
    /// feasible schedule stays feasible.
    ///
    /// # Errors
    /// [`ScheduleError::ZeroPeriod`] if either period is zero.
    pub fn restretch(&self, period: u32, new_period: u32) -> Result<Self> {
        let period = nonzero(period)?;
        let new_period = nonzero(new_period)?;
        Ok(Self {
            starts: self
                .starts
                .iter()
                .map(|(id, &t)| (id.clone(), (t / period) * new_period + t % period))
                .collect(),
        })
    }
}

/// A constraint violation found by the schedule checker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Type of violation.
    pub violation_type: ViolationType,
    /// Related operation ID, or slot label for slot-level violations.
    pub entity_id: String,
    /// Human-readable description.
    pub message: String,
}

/// Classification of violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViolationType {
    /// An operation has no start cycle.
    Unscheduled,
    /// A successor starts before predecessor start + delay.
    Precedence,
    /// Match units in a slot exceed the limit.
    MatchCapacity,
    /// Action fields in a slot exceed the limit.
    ActionCapacity,
    /// Too many generations match in one slot.
    MatchConcurrency,
    /// Too many generations act in one slot.
    ActionConcurrency,
}

impl Violation {
    /// Creates a violation.
    pub fn new(
        violation_type: ViolationType,
        entity_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            violation_type,
            entity_id: entity_id.into(),
            message: message.into(),
        }
    }

    /// Creates a precedence violation.
    pub fn precedence(op_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ViolationType::Precedence, op_id, message)
    }

    /// Creates a slot-level violation.
    pub fn slot(violation_type: ViolationType, slot: u32, message: impl Into<String>) -> Self {
        Self::new(violation_type, format!("slot {slot}"), message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Assignment {
        Assignment::from_starts([("A", 0), ("B", 2), ("C", 3), ("D", 5)])
    }

    #[test]
    fn test_length_is_max_plus_one() {
        let a = sample();
        assert_eq!(a.max_start(), Some(5));
        assert_eq!(a.length(), 6);
        assert_eq!(Assignment::new().length(), 0);
    }

    #[test]
    fn test_slot_and_generation() {
        let a = sample();
        assert_eq!(a.slot("D", 2).unwrap(), Some(1));
        assert_eq!(a.generation("D", 2).unwrap(), Some(2));
        assert_eq!(a.slot("missing", 2).unwrap(), None);
    }

    #[test]
    fn test_zero_period_rejected() {
        let a = sample();
        assert_eq!(a.slot("D", 0), Err(ScheduleError::ZeroPeriod));
        assert_eq!(a.generation("D", 0), Err(ScheduleError::ZeroPeriod));
        assert_eq!(a.ops_on_ring(0), Err(ScheduleError::ZeroPeriod));
        assert_eq!(a.restretch(0, 1), Err(ScheduleError::ZeroPeriod));
        assert_eq!(a.restretch(2, 0), Err(ScheduleError::ZeroPeriod));
    }

    #[test]
    fn test_ops_at_time_groups() {
        let mut a = sample();
        a.insert("E", 2);
        let map = a.ops_at_time();
        assert_eq!(map[&2], vec!["B".to_string(), "E".to_string()]);
        assert_eq!(map.keys().copied().collect::<Vec<_>>(), vec![0, 2, 3, 5]);
    }

    #[test]
    fn test_ops_on_ring() {
        let ring = sample().ops_on_ring(2).unwrap();
        assert_eq!(ring[&0], vec![(0, "A".to_string()), (1, "B".to_string())]);
        assert_eq!(ring[&1], vec![(1, "C".to_string()), (2, "D".to_string())]);
    }

    #[test]
    fn test_restretch_keeps_slots_and_generations() {
        let a = sample();
        let wide = a.restretch(2, 3).unwrap();
        for (id, _) in a.iter() {
            assert_eq!(a.slot(id, 2).unwrap(), wide.slot(id, 3).unwrap());
            assert_eq!(a.generation(id, 2).unwrap(), wide.generation(id, 3).unwrap());
        }
        assert_eq!(wide.start("D"), Some(7));
    }

    #[test]
    fn test_violation_factories() {
        let v = Violation::precedence("B", "too early");
        assert_eq!(v.violation_type, ViolationType::Precedence);
        let s = Violation::slot(ViolationType::MatchCapacity, 3, "over");
        assert_eq!(s.entity_id, "slot 3");
    }
}
