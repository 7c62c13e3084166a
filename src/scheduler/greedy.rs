//! Randomized greedy list scheduler.
//!
//! # Algorithm
//!
//! Rounds are numbered from 0. Each round:
//!
//! 1. Collect ready (zero in-degree) match candidates and ready
//!    action/condition candidates.
//! 2. Compute normalized demand per side: `Σ match units / match_unit_limit`
//!    and `Σ fields / action_fields_limit`.
//! 3. Pick the round's resource type: the heavier side if exactly one side
//!    is ≥ 0.5; otherwise a demand-weighted coin flip, and when both sides
//!    had demand the next round is forced to the opposite type.
//! 4. Pack candidates of that type by descending demand (ties by a per-solve
//!    random priority) while the round's capacity holds. Packed conditions
//!    release their action successors into the same round.
//!
//! Delays are not modeled; a round only orders operations. The result counts
//! rounds holding at least one match and rounds holding at least one action.
//!
//! # Complexity
//! O(R · n log n) per solve where R = rounds used.
//!
//! # Reference
//! Graham (1969), "Bounds on Multiprocessing Timing Anomalies" (list scheduling)

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::ScheduleProblem;

/// Outcome of one greedy run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GreedyResult {
    /// Rounds with at least one match operation.
    pub match_rounds: u32,
    /// Rounds with at least one action or condition operation.
    pub action_rounds: u32,
    /// Round assigned to each operation.
    pub rounds: BTreeMap<String, u32>,
}

impl GreedyResult {
    /// `max(match_rounds, action_rounds)`.
    pub fn score(&self) -> u32 {
        self.match_rounds.max(self.action_rounds)
    }
}

/// Best result over repeated greedy runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GreedySampling {
    /// Lowest-scoring run (first one on ties).
    pub best: Option<GreedyResult>,
    /// Number of runs per score.
    pub histogram: BTreeMap<u32, usize>,
    /// Best score after each run.
    pub best_so_far: Vec<u32>,
}

/// Resource side of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Match,
    Action,
}

impl Side {
    fn opposite(self) -> Self {
        match self {
            Self::Match => Self::Action,
            Self::Action => Self::Match,
        }
    }
}

/// Randomized greedy list scheduler.
///
/// Works on a private copy of the in-degree table; the problem is never
/// modified.
///
/// # Example
/// ```
/// use pipeline_schedule::models::{Edge, HardwareLimits, Operation, ScheduleDag, ScheduleProblem};
/// use pipeline_schedule::scheduler::GreedyListScheduler;
/// use rand::rngs::SmallRng;
/// use rand::SeedableRng;
///
/// let dag = ScheduleDag::new(
///     vec![Operation::match_op("m", 80), Operation::action("a", 2)],
///     vec![Edge::new("m", "a", 2)],
/// ).unwrap();
/// let problem = ScheduleProblem::new(dag, HardwareLimits::new(2, 80, 4, 1, 1).unwrap()).unwrap();
///
/// let mut rng = SmallRng::seed_from_u64(7);
/// let result = GreedyListScheduler::new().solve(&problem, &mut rng);
/// assert_eq!((result.match_rounds, result.action_rounds), (1, 1));
/// ```
#[derive(Debug, Clone, Default)]
pub struct GreedyListScheduler;

impl GreedyListScheduler {
    /// Creates a scheduler.
    pub fn new() -> Self {
        Self
    }

    /// Runs the scheduler once.
    pub fn solve(&self, problem: &ScheduleProblem, rng: &mut dyn RngCore) -> GreedyResult {
        let dag = problem.dag();
        let limits = problem.limits();
        let n = dag.len();

        let mut priority: Vec<usize> = (0..n).collect();
        priority.shuffle(rng);

        let demand = |v: usize| -> u32 {
            if dag.operation(v).is_match() {
                problem.match_units(v)
            } else {
                problem.action_fields(v)
            }
        };
        let by_demand = |a: &usize, b: &usize| {
            demand(*b)
                .cmp(&demand(*a))
                .then(priority[*b].cmp(&priority[*a]))
        };

        let mut in_degree = dag.in_degrees();
        let mut done = vec![false; n];
        let mut remaining = n;
        let mut rounds = BTreeMap::new();
        let mut match_rounds = BTreeSet::new();
        let mut action_rounds = BTreeSet::new();
        let mut forced: Option<Side> = None;
        let mut round = 0u32;

        while remaining > 0 {
            let (mut matches, mut actions): (Vec<usize>, Vec<usize>) = (0..n)
                .filter(|&v| !done[v] && in_degree[v] == 0)
                .partition(|&v| dag.operation(v).is_match());

            let match_load = matches.iter().map(|&v| demand(v)).sum::<u32>() as f64
                / f64::from(limits.match_unit_limit);
            let action_load = actions.iter().map(|&v| demand(v)).sum::<u32>() as f64
                / f64::from(limits.action_fields_limit);

            let forced_side = forced.take().filter(|side| match side {
                Side::Match => !matches.is_empty(),
                Side::Action => !actions.is_empty(),
            });
            let side = match forced_side {
                Some(side) => side,
                None if match_load >= 0.5 && action_load < 0.5 => Side::Match,
                None if match_load < 0.5 && action_load >= 0.5 => Side::Action,
                None => {
                    let total = match_load + action_load;
                    let side = if total > 0.0 {
                        if rng.random::<f64>() * total < match_load {
                            Side::Match
                        } else {
                            Side::Action
                        }
                    } else if actions.is_empty() {
                        Side::Match
                    } else {
                        Side::Action
                    };
                    if match_load > 0.0 && action_load > 0.0 {
                        forced = Some(side.opposite());
                    }
                    side
                }
            };

            let (queue, capacity) = match side {
                Side::Match => (&mut matches, limits.match_unit_limit),
                Side::Action => (&mut actions, limits.action_fields_limit),
            };
            queue.sort_by(by_demand);
            let mut queue: VecDeque<usize> = queue.drain(..).collect();
            let mut used = 0u32;
            let mut packed = Vec::new();

            while let Some(&v) = queue.front() {
                let need = demand(v);
                if used + need > capacity {
                    break;
                }
                queue.pop_front();
                used += need;
                done[v] = true;
                remaining -= 1;
                packed.push(v);
                rounds.insert(dag.operation(v).id.clone(), round);
                match side {
                    Side::Match => match_rounds.insert(round),
                    Side::Action => action_rounds.insert(round),
                };

                if dag.operation(v).is_condition() {
                    for &(w, _) in dag.successors(v) {
                        in_degree[w] -= 1;
                        if in_degree[w] == 0 && !dag.operation(w).is_match() {
                            queue.push_back(w);
                        }
                    }
                }
            }

            // Everything else releases its successors for the next round.
            for &v in packed.iter().filter(|&&v| !dag.operation(v).is_condition()) {
                for &(w, _) in dag.successors(v) {
                    in_degree[w] -= 1;
                }
            }

            round += 1;
        }

        GreedyResult {
            match_rounds: match_rounds.len() as u32,
            action_rounds: action_rounds.len() as u32,
            rounds,
        }
    }

    /// Runs the scheduler `trials` times and keeps the lowest score.
    pub fn best_of(
        &self,
        problem: &ScheduleProblem,
        trials: usize,
        rng: &mut dyn RngCore,
    ) -> GreedySampling {
        let mut sampling = GreedySampling::default();
        for trial in 0..trials {
            let result = self.solve(problem, rng);
            let score = result.score();
            *sampling.histogram.entry(score).or_insert(0) += 1;
            let improves = sampling
                .best
                .as_ref()
                .map_or(true, |best| score < best.score());
            if improves {
                debug!(trial, score, "greedy improved");
                sampling.best = Some(result);
            }
            sampling
                .best_so_far
                .push(sampling.best.as_ref().map_or(score, GreedyResult::score));
        }
        sampling
    }
}
