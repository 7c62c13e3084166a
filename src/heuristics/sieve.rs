//! Randomized periodic list scheduling.

use std::time::{Duration, Instant};

use rand::{Rng, RngCore};
use tracing::debug;

use super::{PeriodicSeeder, PeriodicTable};
use crate::models::{Assignment, ScheduleDag, ScheduleProblem};

/// Default number of random orders tried per call.
const DEFAULT_MAX_ATTEMPTS: usize = 200;

/// Tries random topological orders, placing each operation at the earliest
/// fitting cycle of a period-`T` reservation table, and keeps the schedule
/// with the lowest maximum start.
///
/// Stops at the time budget or the attempt cap, whichever comes first.
#[derive(Debug, Clone)]
pub struct RandomSieve {
    budget: Duration,
    max_attempts: usize,
}

impl RandomSieve {
    /// Creates a sieve with a wall-clock budget per call.
    pub fn new(budget: Duration) -> Self {
        Self {
            budget,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Caps the number of orders tried per call.
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Wall-clock budget per call.
    pub fn budget(&self) -> Duration {
        self.budget
    }
}

impl Default for RandomSieve {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

/// Kahn's algorithm picking uniformly among ready nodes.
fn random_topological_order(dag: &ScheduleDag, rng: &mut dyn RngCore) -> Vec<usize> {
    let mut in_deg = dag.in_degrees();
    let mut ready: Vec<usize> = (0..dag.len()).filter(|&i| in_deg[i] == 0).collect();
    let mut order = Vec::with_capacity(dag.len());
    while !ready.is_empty() {
        let u = ready.swap_remove(rng.random_range(0..ready.len()));
        order.push(u);
        for &(v, _) in dag.successors(u) {
            in_deg[v] -= 1;
            if in_deg[v] == 0 {
                ready.push(v);
            }
        }
    }
    order
}

impl PeriodicSeeder for RandomSieve {
    fn name(&self) -> &'static str {
        "sieve"
    }

    fn seed(
        &self,
        problem: &ScheduleProblem,
        period: u32,
        rng: &mut dyn RngCore,
    ) -> Option<Assignment> {
        let started = Instant::now();
        let mut best: Option<Assignment> = None;
        let mut attempts = 0;

        while attempts < self.max_attempts && started.elapsed() < self.budget {
            attempts += 1;
            let order = random_topological_order(problem.dag(), rng);
            let mut table = PeriodicTable::periodic(problem, period).ok()?;
            let Some(candidate) = table.place_all(&order, Some(2 * period)) else {
                continue;
            };
            if best
                .as_ref()
                .map_or(true, |b| candidate.max_start() < b.max_start())
            {
                best = Some(candidate);
            }
        }

        debug!(
            period,
            attempts,
            max_start = best.as_ref().and_then(Assignment::max_start),
            "sieve finished"
        );
        best
    }
}
