//! Reservation table shared by the list-placement heuristics.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Result, ScheduleError};
use crate::models::{Assignment, ScheduleProblem};

#[derive(Debug, Clone, Default)]
struct SlotLoad {
    units: u32,
    fields: u32,
    match_gens: BTreeSet<u32>,
    action_gens: BTreeSet<u32>,
}

/// Per-slot resource reservations.
///
/// With a period, cycle `t` reserves slot `t % T` for generation `t / T` and
/// the processor limits bound the generations per slot. Without one every
/// cycle is its own slot and only capacities apply.
#[derive(Debug, Clone)]
pub struct PeriodicTable<'a> {
    problem: &'a ScheduleProblem,
    period: Option<u32>,
    slots: BTreeMap<u32, SlotLoad>,
    starts: Vec<Option<u32>>,
}

impl<'a> PeriodicTable<'a> {
    /// Empty table over absolute cycles.
    pub fn unbounded(problem: &'a ScheduleProblem) -> Self {
        Self {
            problem,
            period: None,
            slots: BTreeMap::new(),
            starts: vec![None; problem.dag().len()],
        }
    }

    /// Empty table folded on `period` slots.
    ///
    /// # Errors
    /// [`ScheduleError::ZeroPeriod`] for a zero period.
    pub fn periodic(problem: &'a ScheduleProblem, period: u32) -> Result<Self> {
        if period == 0 {
            return Err(ScheduleError::ZeroPeriod);
        }
        Ok(Self {
            period: Some(period),
            ..Self::unbounded(problem)
        })
    }

    fn locate(&self, t: u32) -> (u32, u32) {
        match self.period {
            Some(p) => (t % p, t / p),
            None => (t, 0),
        }
    }

    /// Earliest cycle allowed by already placed predecessors.
    pub fn ready_time(&self, idx: usize) -> u32 {
        self.problem
            .dag()
            .predecessors(idx)
            .iter()
            .filter_map(|&(u, delay)| self.starts[u].map(|t| t + delay))
            .max()
            .unwrap_or(0)
    }

    /// Whether operation `idx` can start at cycle `t`.
    pub fn fits(&self, idx: usize, t: u32) -> bool {
        let limits = self.problem.limits();
        let (slot, generation) = self.locate(t);
        let Some(load) = self.slots.get(&slot) else {
            return true;
        };
        if self.problem.dag().operation(idx).is_match() {
            load.units + self.problem.match_units(idx) <= limits.match_unit_limit
                && (load.match_gens.contains(&generation)
                    || (load.match_gens.len() as u32) < limits.match_proc_limit)
        } else {
            load.fields + self.problem.action_fields(idx) <= limits.action_fields_limit
                && (load.action_gens.contains(&generation)
                    || (load.action_gens.len() as u32) < limits.action_proc_limit)
        }
    }

    /// Records operation `idx` at cycle `t`.
    pub fn reserve(&mut self, idx: usize, t: u32) {
        let (slot, generation) = self.locate(t);
        let load = self.slots.entry(slot).or_default();
        if self.problem.dag().operation(idx).is_match() {
            load.units += self.problem.match_units(idx);
            load.match_gens.insert(generation);
        } else {
            load.fields += self.problem.action_fields(idx);
            load.action_gens.insert(generation);
        }
        self.starts[idx] = Some(t);
    }

    /// Places `idx` at the earliest fitting cycle at or after its ready time.
    ///
    /// `window` bounds how many cycles past the ready time are tried. With
    /// `None` it defaults to two periods, or to an unbounded search without
    /// a period (cycles past the last reservation are always empty).
    pub fn place_earliest(&mut self, idx: usize, window: Option<u32>) -> Option<u32> {
        let ready = self.ready_time(idx);
        let t = match (window, self.period) {
            (Some(w), _) => (ready..ready.saturating_add(w)).find(|&t| self.fits(idx, t))?,
            (None, None) => (ready..).find(|&t| self.fits(idx, t))?,
            (None, Some(p)) => (ready..ready.saturating_add(2 * p)).find(|&t| self.fits(idx, t))?,
        };
        self.reserve(idx, t);
        Some(t)
    }

    /// Places operations in the given order, each after its predecessors.
    ///
    /// `order` must list predecessors first. Returns `None` as soon as one
    /// operation fits nowhere.
    pub fn place_all(&mut self, order: &[usize], window: Option<u32>) -> Option<Assignment> {
        for &idx in order {
            self.place_earliest(idx, window)?;
        }
        Some(self.assignment())
    }

    /// Placed operations.
    pub fn assignment(&self) -> Assignment {
        let ops = self.problem.dag().operations();
        Assignment::from_starts(
            self.starts
                .iter()
                .enumerate()
                .filter_map(|(idx, t)| t.map(|t| (ops[idx].id.clone(), t))),
        )
    }
}
