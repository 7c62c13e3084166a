//! Exact integer-program schedule formulations.
//!
//! Builds a [`MilpModel`] from a [`ScheduleProblem`] and solves it with any
//! [`MilpSolver`]. Two formulations exist:
//!
//! - **Unbounded** (single packet): horizon `T = |nodes|`, one-hot slot
//!   choice per operation, boolean precedence (`delay > 0` ⇒ at least one
//!   cycle later), per-round capacity gated by "round is active" bits.
//!   Minimizes `P = max(match rounds, action rounds)`, a throughput proxy
//!   that seeds the period search.
//! - **Periodic** (pipelined): for a given period `T`, each operation picks a
//!   generation `q < Q_MAX` and a slot `r < T` with `t = q·T + r`. Capacity
//!   is enforced per slot across all generations and the number of
//!   generations matching (acting) in a slot is bounded by the processor
//!   limits. Minimizes the schedule length.
//!
//! # Reference
//! - Chole et al. (2017), "dRMT: Disaggregated Programmable Switching"
//! - Rau (1994), "Iterative Modulo Scheduling"

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, ScheduleError};
use crate::milp::{
    Direction, LinearExpr, MilpModel, MilpResult, MilpSolver, MilpStatus, Sense, SolverConfig,
    VarId,
};
use crate::models::{Assignment, ScheduleProblem};
use crate::scheduler::ResourceUsage;

/// Which formulation to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Formulation {
    /// Single packet, minimize active resource rounds ("Model 1").
    Unbounded,
    /// Pipelined with the given period, minimize length ("Model 2").
    Periodic { period: u32 },
}

/// Round counts of an unbounded solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundCounts {
    /// Rounds with at least one match.
    pub match_rounds: u32,
    /// Rounds with at least one action.
    pub action_rounds: u32,
    /// `max(match_rounds, action_rounds)`.
    pub active_rounds: u32,
}

/// How a [`Solution`] was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolutionStatus {
    /// Proven optimal by the exact solver.
    Optimal,
    /// Best incumbent when the solver hit its limit.
    TimeLimit,
    /// Produced by a heuristic without exact solving.
    Heuristic,
}

/// A solved schedule with solver metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    /// Start cycle per operation.
    pub assignment: Assignment,
    /// `max(start) + 1`.
    pub length: u32,
    /// Period of a periodic solution.
    pub period: Option<u32>,
    /// Round counts of an unbounded solution.
    pub rounds: Option<RoundCounts>,
    /// Per-slot usage of a periodic solution.
    pub usage: Option<ResourceUsage>,
    /// How the schedule was obtained.
    pub status: SolutionStatus,
    /// Relative optimality gap.
    pub gap: f64,
    /// Wall-clock solve time.
    pub elapsed: Duration,
}

/// Outcome of one exact solve.
#[derive(Debug, Clone, PartialEq)]
pub enum ExactOutcome {
    /// Proven optimal schedule.
    Optimal(Solution),
    /// Usable schedule found before the limit; `gap` is its optimality gap.
    TimeLimitWithIncumbent { solution: Solution, gap: f64 },
    /// No schedule exists for this formulation.
    Infeasible,
    /// The limit was reached without any schedule.
    TimeLimitNoIncumbent,
}

impl Solution {
    /// Wraps a heuristic period-`period` schedule.
    pub fn heuristic(
        problem: &ScheduleProblem,
        assignment: Assignment,
        period: u32,
        elapsed: Duration,
    ) -> Result<Self> {
        let usage = ResourceUsage::calculate(problem, &assignment, period)?;
        Ok(Self {
            length: assignment.length(),
            usage: Some(usage),
            assignment,
            period: Some(period),
            rounds: None,
            status: SolutionStatus::Heuristic,
            gap: 0.0,
            elapsed,
        })
    }
}

impl ExactOutcome {
    /// The schedule, if one was found.
    pub fn solution(&self) -> Option<&Solution> {
        match self {
            Self::Optimal(s) | Self::TimeLimitWithIncumbent { solution: s, .. } => Some(s),
            Self::Infeasible | Self::TimeLimitNoIncumbent => None,
        }
    }

    /// Consumes the outcome, returning the schedule if one was found.
    pub fn into_solution(self) -> Option<Solution> {
        match self {
            Self::Optimal(s) | Self::TimeLimitWithIncumbent { solution: s, .. } => Some(s),
            Self::Infeasible | Self::TimeLimitNoIncumbent => None,
        }
    }

    /// Whether a schedule was found. A time limit without incumbent counts
    /// as not feasible.
    pub fn is_feasible(&self) -> bool {
        self.solution().is_some()
    }
}

/// Variable handles of the unbounded formulation.
#[derive(Debug, Clone)]
struct UnboundedVars {
    t: Vec<VarId>,
    match_rounds: VarId,
    action_rounds: VarId,
    active_rounds: VarId,
}

/// Variable handles of the periodic formulation.
#[derive(Debug, Clone)]
struct PeriodicVars {
    t: Vec<VarId>,
    length: VarId,
}

/// Builds and solves exact formulations for one problem.
///
/// # Example
/// ```
/// use pipeline_schedule::exact::{ExactScheduleSolver, Formulation};
/// use pipeline_schedule::milp::{BranchAndBound, SolverConfig};
/// use pipeline_schedule::models::{Edge, HardwareLimits, Operation, ScheduleDag, ScheduleProblem};
///
/// let dag = ScheduleDag::new(
///     vec![Operation::match_op("m", 80), Operation::action("a", 1)],
///     vec![Edge::new("m", "a", 2)],
/// ).unwrap();
/// let problem = ScheduleProblem::new(dag, HardwareLimits::new(1, 80, 1, 1, 1).unwrap()).unwrap();
///
/// let outcome = ExactScheduleSolver::new(&problem)
///     .solve(&BranchAndBound::new(), Formulation::Periodic { period: 1 }, &SolverConfig::default())
///     .unwrap();
/// assert_eq!(outcome.solution().unwrap().length, 3);
/// ```
#[derive(Debug, Clone)]
pub struct ExactScheduleSolver<'a> {
    problem: &'a ScheduleProblem,
    warm_start: Option<Assignment>,
}

impl<'a> ExactScheduleSolver<'a> {
    /// Creates a solver for a problem.
    pub fn new(problem: &'a ScheduleProblem) -> Self {
        Self {
            problem,
            warm_start: None,
        }
    }

    /// Seeds the periodic formulation with a known schedule.
    ///
    /// The schedule also bounds the number of generations considered.
    pub fn with_warm_start(mut self, warm_start: Option<Assignment>) -> Self {
        self.warm_start = warm_start;
        self
    }

    /// Generations considered by the periodic formulation (`Q_MAX`).
    ///
    /// `ceil((max warm start + 1) / T)` with a warm start, otherwise
    /// `ceil(1.5 · critical path / T)`; never below one.
    pub fn generation_bound(&self, period: u32) -> u32 {
        let period = u64::from(period.max(1));
        let q = match self.warm_start.as_ref().and_then(Assignment::max_start) {
            Some(max_start) => (u64::from(max_start) + 1).div_ceil(period),
            None => {
                let (_, cp) = self.problem.dag().critical_path();
                (3 * u64::from(cp)).div_ceil(2 * period)
            }
        };
        q.max(1) as u32
    }

    /// Builds the unbounded formulation.
    pub fn build_unbounded(&self) -> MilpModel {
        self.unbounded_model().0
    }

    /// Builds the periodic formulation.
    pub fn build_periodic(&self, period: u32) -> Result<MilpModel> {
        Ok(self.periodic_model(period)?.0)
    }

    fn unbounded_model(&self) -> (MilpModel, UnboundedVars) {
        let dag = self.problem.dag();
        let limits = self.problem.limits();
        let n = dag.len();
        let horizon = n as f64;

        let mut m = MilpModel::new("unbounded");

        // Per operation: start time, then its one-hot round choice.
        let mut t = Vec::with_capacity(n);
        let mut qr: Vec<Vec<VarId>> = Vec::with_capacity(n);
        for op in dag.operations() {
            t.push(m.add_integer(format!("t[{}]", op.id), 0.0, (horizon - 1.0).max(0.0)));
            qr.push(
                (0..n)
                    .map(|r| m.add_binary(format!("qr[{},{r}]", op.id)))
                    .collect(),
            );
        }
        let any_match: Vec<VarId> = (0..n).map(|r| m.add_binary(format!("any_match[{r}]"))).collect();
        let any_action: Vec<VarId> = (0..n).map(|r| m.add_binary(format!("any_action[{r}]"))).collect();
        let match_rounds = m.add_integer("M", 0.0, horizon);
        let action_rounds = m.add_integer("A", 0.0, horizon);
        let active_rounds = m.add_integer("P", 0.0, horizon);
        let match_is_max = m.add_binary("P_is_M");

        for v in 0..n {
            m.add_constraint(
                format!("unique_round[{v}]"),
                LinearExpr::from_terms(qr[v].iter().map(|&b| (b, 1.0))),
                Sense::Eq,
                1.0,
            );
            let mut division = LinearExpr::var(t[v]);
            for (r, &b) in qr[v].iter().enumerate() {
                division.add_term(b, -(r as f64));
            }
            m.add_constraint(format!("division[{v}]"), division, Sense::Eq, 0.0);
        }

        for (u, v, delay) in dag.edge_indices() {
            m.add_constraint(
                format!("dependency[{u},{v}]"),
                LinearExpr::var(t[v]).with_term(t[u], -1.0),
                Sense::Ge,
                if delay > 0 { 1.0 } else { 0.0 },
            );
        }

        for r in 0..n {
            let mut units = LinearExpr::new();
            let mut fields = LinearExpr::new();
            for v in 0..n {
                units.add_term(qr[v][r], f64::from(self.problem.match_units(v)));
                fields.add_term(qr[v][r], f64::from(self.problem.action_fields(v)));
            }
            units.add_term(any_match[r], -f64::from(limits.match_unit_limit));
            fields.add_term(any_action[r], -f64::from(limits.action_fields_limit));
            m.add_constraint(format!("match_units[{r}]"), units, Sense::Le, 0.0);
            m.add_constraint(format!("action_fields[{r}]"), fields, Sense::Le, 0.0);
        }

        let mut count_m = LinearExpr::var(match_rounds);
        let mut count_a = LinearExpr::var(action_rounds);
        for r in 0..n {
            count_m.add_term(any_match[r], -1.0);
            count_a.add_term(any_action[r], -1.0);
        }
        m.add_constraint("M_constraint", count_m, Sense::Eq, 0.0);
        m.add_constraint("A_constraint", count_a, Sense::Eq, 0.0);

        // P = max(A, M)
        let p_minus_m = LinearExpr::var(active_rounds).with_term(match_rounds, -1.0);
        let p_minus_a = LinearExpr::var(active_rounds).with_term(action_rounds, -1.0);
        m.add_constraint("P_ge_M", p_minus_m.clone(), Sense::Ge, 0.0);
        m.add_constraint("P_ge_A", p_minus_a.clone(), Sense::Ge, 0.0);
        m.add_indicator("P_le_M", match_is_max, true, p_minus_m, Sense::Le, 0.0);
        m.add_indicator("P_le_A", match_is_max, false, p_minus_a, Sense::Le, 0.0);

        m.set_objective(LinearExpr::var(active_rounds), Direction::Minimize);

        (
            m,
            UnboundedVars {
                t,
                match_rounds,
                action_rounds,
                active_rounds,
            },
        )
    }

    fn periodic_model(&self, period: u32) -> Result<(MilpModel, PeriodicVars)> {
        if period == 0 {
            return Err(ScheduleError::ZeroPeriod);
        }
        let dag = self.problem.dag();
        let limits = self.problem.limits();
        let n = dag.len();
        let q_max = self.generation_bound(period) as usize;
        let period_len = period as usize;
        let horizon = (q_max * period_len) as f64;

        let match_nodes: Vec<usize> = (0..n).filter(|&v| dag.operation(v).is_match()).collect();
        let action_nodes: Vec<usize> = (0..n).filter(|&v| !dag.operation(v).is_match()).collect();

        let mut m = MilpModel::new(format!("periodic[T={period}]"));

        // Per operation: start time, then qr[v][q][r].
        let mut t = Vec::with_capacity(n);
        let mut qr: Vec<Vec<Vec<VarId>>> = Vec::with_capacity(n);
        for op in dag.operations() {
            t.push(m.add_integer(format!("t[{}]", op.id), 0.0, horizon - 1.0));
            qr.push(
                (0..q_max)
                    .map(|q| {
                        (0..period_len)
                            .map(|r| m.add_binary(format!("qr[{},{q},{r}]", op.id)))
                            .collect()
                    })
                    .collect(),
            );
        }
        let any_match: Vec<Vec<VarId>> = (0..q_max)
            .map(|q| {
                (0..period_len)
                    .map(|r| m.add_binary(format!("any_match[{q},{r}]")))
                    .collect()
            })
            .collect();
        let any_action: Vec<Vec<VarId>> = (0..q_max)
            .map(|q| {
                (0..period_len)
                    .map(|r| m.add_binary(format!("any_action[{q},{r}]")))
                    .collect()
            })
            .collect();
        let length = m.add_integer("length", 0.0, horizon - 1.0);

        m.set_objective(LinearExpr::var(length), Direction::Minimize);

        for v in 0..n {
            m.add_constraint(
                format!("length_is_max[{v}]"),
                LinearExpr::var(t[v]).with_term(length, -1.0),
                Sense::Le,
                0.0,
            );

            let mut unique = LinearExpr::new();
            let mut division = LinearExpr::var(t[v]);
            for q in 0..q_max {
                for r in 0..period_len {
                    unique.add_term(qr[v][q][r], 1.0);
                    division.add_term(qr[v][q][r], -((q * period_len + r) as f64));
                }
            }
            m.add_constraint(format!("unique_quotient_remainder[{v}]"), unique, Sense::Eq, 1.0);
            m.add_constraint(format!("division[{v}]"), division, Sense::Eq, 0.0);
        }

        for (u, v, delay) in dag.edge_indices() {
            m.add_constraint(
                format!("dependency[{u},{v}]"),
                LinearExpr::var(t[v]).with_term(t[u], -1.0),
                Sense::Ge,
                f64::from(delay),
            );
        }

        for r in 0..period_len {
            let mut units = LinearExpr::new();
            for &v in &match_nodes {
                for q in 0..q_max {
                    units.add_term(qr[v][q][r], f64::from(self.problem.match_units(v)));
                }
            }
            m.add_constraint(
                format!("match_units[{r}]"),
                units,
                Sense::Le,
                f64::from(limits.match_unit_limit),
            );

            let mut fields = LinearExpr::new();
            for &v in &action_nodes {
                for q in 0..q_max {
                    fields.add_term(qr[v][q][r], f64::from(self.problem.action_fields(v)));
                }
            }
            m.add_constraint(
                format!("action_fields[{r}]"),
                fields,
                Sense::Le,
                f64::from(limits.action_fields_limit),
            );
        }

        // any_match[q][r] is forced on by any match of generation q in slot r;
        // the number of such generations per slot is bounded.
        for (nodes, any, limit, label) in [
            (&match_nodes, &any_match, limits.match_proc_limit, "match"),
            (&action_nodes, &any_action, limits.action_proc_limit, "action"),
        ] {
            if nodes.is_empty() {
                continue;
            }
            for r in 0..period_len {
                let mut per_slot = LinearExpr::new();
                for q in 0..q_max {
                    let mut active = LinearExpr::from_terms(nodes.iter().map(|&v| (qr[v][q][r], 1.0)));
                    active.add_term(any[q][r], -(nodes.len() as f64));
                    m.add_constraint(format!("any_{label}[{q},{r}]"), active, Sense::Le, 0.0);
                    per_slot.add_term(any[q][r], 1.0);
                }
                m.add_constraint(
                    format!("{label}_proc[{r}]"),
                    per_slot,
                    Sense::Le,
                    f64::from(limit),
                );
            }
        }

        if let Some(warm) = &self.warm_start {
            for (v, op) in dag.operations().iter().enumerate() {
                let Some(start) = warm.start(&op.id) else {
                    continue;
                };
                let (q, r) = ((start / period) as usize, (start % period) as usize);
                if q < q_max {
                    m.set_start(t[v], f64::from(start));
                    m.set_start(qr[v][q][r], 1.0);
                }
            }
            if let Some(max_start) = warm.max_start() {
                if f64::from(max_start) < horizon {
                    m.set_start(length, f64::from(max_start));
                }
            }
        }

        debug!(
            period,
            q_max,
            vars = m.var_count(),
            constraints = m.constraint_count(),
            warm = self.warm_start.is_some(),
            "periodic model built"
        );

        Ok((m, PeriodicVars { t, length }))
    }

    /// Builds the requested formulation and solves it.
    ///
    /// # Errors
    /// Zero period, backend model errors, non-integral values, or (for
    /// proven-optimal results) a reported length that disagrees with the
    /// recovered start times.
    pub fn solve(
        &self,
        solver: &dyn MilpSolver,
        formulation: Formulation,
        config: &SolverConfig,
    ) -> Result<ExactOutcome> {
        match formulation {
            Formulation::Unbounded => {
                let (model, vars) = self.unbounded_model();
                let result = solver.solve(&model, config)?;
                self.finish(&model, &result, &vars.t, |assignment| {
                    let rounds = RoundCounts {
                        match_rounds: to_cycle(&model, vars.match_rounds, &result)?,
                        action_rounds: to_cycle(&model, vars.action_rounds, &result)?,
                        active_rounds: to_cycle(&model, vars.active_rounds, &result)?,
                    };
                    self.solution(assignment, None, Some(rounds), &result)
                })
            }
            Formulation::Periodic { period } => {
                let (model, vars) = self.periodic_model(period)?;
                let result = solver.solve(&model, config)?;
                self.finish(&model, &result, &vars.t, |assignment| {
                    let reported = if vars.t.is_empty() {
                        0
                    } else {
                        to_cycle(&model, vars.length, &result)? + 1
                    };
                    let recovered = assignment.length();
                    if reported != recovered {
                        if result.status == MilpStatus::Optimal {
                            return Err(ScheduleError::LengthMismatch {
                                reported,
                                recovered,
                            });
                        }
                        warn!(reported, recovered, "incumbent length variable is not tight");
                    }
                    self.solution(assignment, Some(period), None, &result)
                })
            }
        }
    }

    fn finish<F>(
        &self,
        model: &MilpModel,
        result: &MilpResult,
        t: &[VarId],
        decode: F,
    ) -> Result<ExactOutcome>
    where
        F: FnOnce(Assignment) -> Result<Solution>,
    {
        match result.status {
            MilpStatus::Infeasible => {
                debug!(model = model.name(), "infeasible");
                Ok(ExactOutcome::Infeasible)
            }
            MilpStatus::TimeLimitNoIncumbent => {
                warn!(model = model.name(), "time limit reached without a schedule");
                Ok(ExactOutcome::TimeLimitNoIncumbent)
            }
            MilpStatus::Optimal => {
                let assignment = self.decode_starts(model, result, t)?;
                Ok(ExactOutcome::Optimal(decode(assignment)?))
            }
            MilpStatus::TimeLimitWithIncumbent => {
                let assignment = self.decode_starts(model, result, t)?;
                let solution = decode(assignment)?;
                let gap = solution.gap;
                warn!(model = model.name(), gap, "time limit reached, keeping incumbent");
                Ok(ExactOutcome::TimeLimitWithIncumbent { solution, gap })
            }
        }
    }

    fn decode_starts(&self, model: &MilpModel, result: &MilpResult, t: &[VarId]) -> Result<Assignment> {
        let mut assignment = Assignment::new();
        for (op, &var) in self.problem.dag().operations().iter().zip(t) {
            assignment.insert(op.id.clone(), to_cycle(model, var, result)?);
        }
        Ok(assignment)
    }

    fn solution(
        &self,
        assignment: Assignment,
        period: Option<u32>,
        rounds: Option<RoundCounts>,
        result: &MilpResult,
    ) -> Result<Solution> {
        let usage = period
            .map(|p| ResourceUsage::calculate(self.problem, &assignment, p))
            .transpose()?;
        let status = match result.status {
            MilpStatus::Optimal => SolutionStatus::Optimal,
            _ => SolutionStatus::TimeLimit,
        };
        Ok(Solution {
            length: assignment.length(),
            assignment,
            period,
            rounds,
            usage,
            status,
            gap: result.gap.unwrap_or(0.0),
            elapsed: result.elapsed,
        })
    }
}

/// Converts a solver value to a whole cycle count.
fn to_cycle(model: &MilpModel, var: VarId, result: &MilpResult) -> Result<u32> {
    let name = || model.variables()[var.index()].name.clone();
    let value = result.value(var).ok_or_else(|| ScheduleError::NonIntegral {
        var: name(),
        value: f64::NAN,
    })?;
    let rounded = value.round();
    if (value - rounded).abs() > 1e-6 || rounded < 0.0 || rounded > f64::from(u32::MAX) {
        return Err(ScheduleError::NonIntegral { var: name(), value });
    }
    Ok(rounded as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::milp::{BranchAndBound, MilpError};
    use crate::models::{Edge, HardwareLimits, Operation, ScheduleDag};
    use crate::heuristics::{PrmtScheduler, RotationPass, Rotator, UnboundedSeeder};
    use crate::testing::{arb_problem, chain_problem};
    use crate::validation::check_schedule;
    use proptest::prelude::*;

    fn config() -> SolverConfig {
        SolverConfig::default().with_time_limit(Duration::from_secs(30))
    }

    /// `m1 -1-> m2 -0-> c -1-> a`: at period 1 both matches and both
    /// action-class operations share slot 0 in different generations.
    fn overlapped_problem(proc_limit: u32) -> ScheduleProblem {
        let dag = ScheduleDag::new(
            vec![
                Operation::match_op("m1", 80),
                Operation::match_op("m2", 80),
                Operation::condition("c"),
                Operation::action("a", 1),
            ],
            vec![
                Edge::new("m1", "m2", 1),
                Edge::new("m2", "c", 0),
                Edge::new("c", "a", 1),
            ],
        )
        .unwrap();
        let limits = HardwareLimits::new(2, 80, 4, proc_limit, proc_limit).unwrap();
        ScheduleProblem::new(dag, limits).unwrap()
    }

    /// Replays a fixed result through `finish` to exercise decoding.
    #[derive(Debug)]
    struct Canned(MilpResult);

    impl MilpSolver for Canned {
        fn name(&self) -> &'static str {
            "canned"
        }

        fn solve(&self, _: &MilpModel, _: &SolverConfig) -> std::result::Result<MilpResult, MilpError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_build_unbounded_sizes() {
        let problem = chain_problem();
        let model = ExactScheduleSolver::new(&problem).build_unbounded();
        // 4 t + 16 qr + 4 any_match + 4 any_action + M, A, P + selector
        assert_eq!(model.var_count(), 4 + 16 + 8 + 4);
        // 4 unique + 4 division + 3 deps + 4 units + 4 fields + M + A + 2 max + 2 indicators
        assert_eq!(model.constraint_count(), 4 + 4 + 3 + 8 + 2 + 2 + 2);
    }

    #[test]
    fn test_generation_bound() {
        let problem = chain_problem();
        let solver = ExactScheduleSolver::new(&problem);
        // critical path 5: ceil(7.5 / 2) = 4
        assert_eq!(solver.generation_bound(2), 4);
        assert_eq!(solver.generation_bound(100), 1);

        let warm = Assignment::from_starts([("A", 0), ("B", 2), ("C", 3), ("D", 5)]);
        let solver = solver.with_warm_start(Some(warm));
        // ceil(6 / 2) = 3
        assert_eq!(solver.generation_bound(2), 3);
    }

    #[test]
    fn test_zero_period_rejected() {
        let problem = chain_problem();
        let err = ExactScheduleSolver::new(&problem)
            .build_periodic(0)
            .unwrap_err();
        assert_eq!(err, ScheduleError::ZeroPeriod);
    }

    #[test]
    fn test_unbounded_optimum() {
        let problem = chain_problem();
        let outcome = ExactScheduleSolver::new(&problem)
            .solve(&BranchAndBound::new(), Formulation::Unbounded, &config())
            .unwrap();
        let solution = match outcome {
            ExactOutcome::Optimal(s) => s,
            other => panic!("expected optimal, got {other:?}"),
        };
        // A and C cannot share a round (3 units > 2); B and D are ordered.
        let rounds = solution.rounds.unwrap();
        assert_eq!(rounds.match_rounds, 2);
        assert_eq!(rounds.action_rounds, 2);
        assert_eq!(rounds.active_rounds, 2);
        assert_eq!(solution.length, solution.assignment.max_start().unwrap() + 1);
        let a = &solution.assignment;
        for e in problem.dag().edges() {
            let gap = i64::from(a.start(&e.to).unwrap()) - i64::from(a.start(&e.from).unwrap());
            assert!(gap >= i64::from(e.delay > 0));
        }
    }

    #[test]
    fn test_periodic_feasible_at_two() {
        let problem = chain_problem();
        let outcome = ExactScheduleSolver::new(&problem)
            .solve(
                &BranchAndBound::new(),
                Formulation::Periodic { period: 2 },
                &config(),
            )
            .unwrap();
        let solution = outcome.solution().expect("period 2 is feasible");
        assert_eq!(solution.length, 6);
        assert_eq!(solution.period, Some(2));
        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!(check_schedule(&problem, &solution.assignment, Some(2)).unwrap().is_empty());
        assert!(solution.usage.as_ref().unwrap().fits(problem.limits()));
    }

    #[test]
    fn test_periodic_infeasible_at_one() {
        let problem = chain_problem();
        let outcome = ExactScheduleSolver::new(&problem)
            .solve(
                &BranchAndBound::new(),
                Formulation::Periodic { period: 1 },
                &config(),
            )
            .unwrap();
        assert_eq!(outcome, ExactOutcome::Infeasible);
        assert!(!outcome.is_feasible());
    }

    #[test]
    fn test_warm_start_used() {
        let problem = chain_problem();
        let warm = Assignment::from_starts([("A", 0), ("B", 2), ("C", 3), ("D", 5)]);
        let outcome = ExactScheduleSolver::new(&problem)
            .with_warm_start(Some(warm.clone()))
            .solve(
                &BranchAndBound::new(),
                Formulation::Periodic { period: 4 },
                &config(),
            )
            .unwrap();
        let solution = outcome.into_solution().unwrap();
        assert_eq!(solution.length, warm.length());
        assert!(check_schedule(&problem, &solution.assignment, Some(4)).unwrap().is_empty());
    }

    #[test]
    fn test_periodic_generations_share_slot() {
        let problem = overlapped_problem(2);
        let outcome = ExactScheduleSolver::new(&problem)
            .solve(
                &BranchAndBound::new(),
                Formulation::Periodic { period: 1 },
                &config(),
            )
            .unwrap();
        let solution = outcome.into_solution().expect("two generations fit");
        let a = &solution.assignment;
        assert_eq!(solution.length, 3);
        assert_eq!(a.start("c"), a.start("m2"));
        assert_eq!(a.generation("m2", 1).unwrap(), Some(1));
        assert!(check_schedule(&problem, a, Some(1)).unwrap().is_empty());

        let usage = solution.usage.unwrap();
        assert_eq!(usage.peak_match_generations(), 2);
        assert_eq!(usage.peak_action_generations(), 2);
    }

    #[test]
    fn test_periodic_single_generation_per_slot() {
        let problem = overlapped_problem(1);
        let outcome = ExactScheduleSolver::new(&problem)
            .solve(
                &BranchAndBound::new(),
                Formulation::Periodic { period: 1 },
                &config(),
            )
            .unwrap();
        assert_eq!(outcome, ExactOutcome::Infeasible);
    }

    #[test]
    fn test_length_mismatch_detected() {
        let problem = chain_problem();
        let solver = ExactScheduleSolver::new(&problem);
        let model = solver.build_periodic(2).unwrap();
        // t = [0, 2, 3, 5] but length variable says 7.
        let mut values = vec![0.0; model.var_count()];
        let names: Vec<&str> = model.variables().iter().map(|v| v.name.as_str()).collect();
        for (name, value) in [("t[A]", 0.0), ("t[B]", 2.0), ("t[C]", 3.0), ("t[D]", 5.0), ("length", 7.0)] {
            let idx = names.iter().position(|n| *n == name).unwrap();
            values[idx] = value;
        }
        let canned = Canned(MilpResult {
            status: MilpStatus::Optimal,
            values,
            objective: Some(7.0),
            gap: Some(0.0),
            nodes: 1,
            elapsed: Duration::ZERO,
        });
        let err = solver
            .solve(&canned, Formulation::Periodic { period: 2 }, &config())
            .unwrap_err();
        assert_eq!(
            err,
            ScheduleError::LengthMismatch {
                reported: 8,
                recovered: 6
            }
        );
    }

    #[test]
    fn test_non_integral_value_rejected() {
        let problem = chain_problem();
        let solver = ExactScheduleSolver::new(&problem);
        let model = solver.build_periodic(2).unwrap();
        let mut values = vec![0.0; model.var_count()];
        values[0] = 2.5;
        let canned = Canned(MilpResult {
            status: MilpStatus::TimeLimitWithIncumbent,
            values,
            objective: Some(5.0),
            gap: Some(0.1),
            nodes: 1,
            elapsed: Duration::ZERO,
        });
        let err = solver
            .solve(&canned, Formulation::Periodic { period: 2 }, &config())
            .unwrap_err();
        assert!(matches!(err, ScheduleError::NonIntegral { .. }));
    }

    #[test]
    fn test_near_integral_values_round() {
        let problem = chain_problem();
        let solver = ExactScheduleSolver::new(&problem);
        let model = solver.build_periodic(2).unwrap();
        let names: Vec<&str> = model.variables().iter().map(|v| v.name.as_str()).collect();
        let mut values = vec![0.0; model.var_count()];
        for (name, value) in [
            ("t[A]", 0.0),
            ("t[B]", 1.999_999_9),
            ("t[C]", 3.000_000_1),
            ("t[D]", 4.999_999_9),
            ("length", 4.999_999_9),
        ] {
            let idx = names.iter().position(|n| *n == name).unwrap();
            values[idx] = value;
        }
        let canned = Canned(MilpResult {
            status: MilpStatus::TimeLimitWithIncumbent,
            values,
            objective: Some(5.0),
            gap: Some(0.25),
            nodes: 1,
            elapsed: Duration::ZERO,
        });
        let outcome = solver
            .solve(&canned, Formulation::Periodic { period: 2 }, &config())
            .unwrap();
        match outcome {
            ExactOutcome::TimeLimitWithIncumbent { solution, gap } => {
                assert_eq!(solution.assignment.start("D"), Some(5));
                assert_eq!(solution.length, 6);
                assert!((gap - 0.25).abs() < 1e-12);
            }
            other => panic!("expected incumbent, got {other:?}"),
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_periodic_solutions_are_valid(problem in arb_problem(), period in 1u32..4) {
            let config = SolverConfig::default().with_time_limit(Duration::from_secs(2));
            let outcome = ExactScheduleSolver::new(&problem)
                .solve(&BranchAndBound::new(), Formulation::Periodic { period }, &config)
                .unwrap();
            if let Some(solution) = outcome.solution() {
                let a = &solution.assignment;
                prop_assert_eq!(a.len(), problem.dag().len());
                prop_assert_eq!(solution.length, a.max_start().unwrap() + 1);
                prop_assert!(check_schedule(&problem, a, Some(period)).unwrap().is_empty());
            }
        }

        #[test]
        fn prop_periodic_warm_start_from_rotation(problem in arb_problem(), period in 1u32..4) {
            let unbounded = PrmtScheduler::new().schedule(&problem);
            if let Some(warm) = RotationPass::new().rotate(&problem, &unbounded, period) {
                let config = SolverConfig::default().with_time_limit(Duration::from_secs(2));
                let outcome = ExactScheduleSolver::new(&problem)
                    .with_warm_start(Some(warm.clone()))
                    .solve(&BranchAndBound::new(), Formulation::Periodic { period }, &config)
                    .unwrap();
                prop_assert_ne!(&outcome, &ExactOutcome::Infeasible);
                if let Some(solution) = outcome.solution() {
                    if solution.status == SolutionStatus::Optimal {
                        prop_assert!(solution.length <= warm.length());
                    }
                    prop_assert!(check_schedule(&problem, &solution.assignment, Some(period)).unwrap().is_empty());
                }
            }
        }

        #[test]
        fn prop_unbounded_solutions_are_valid(problem in arb_problem()) {
            let config = SolverConfig::default().with_time_limit(Duration::from_secs(2));
            let outcome = ExactScheduleSolver::new(&problem)
                .solve(&BranchAndBound::new(), Formulation::Unbounded, &config)
                .unwrap();
            prop_assert_ne!(&outcome, &ExactOutcome::Infeasible);
            if let Some(solution) = outcome.solution() {
                let a = &solution.assignment;
                let n = problem.dag().len() as u32;
                prop_assert_eq!(solution.length, a.max_start().unwrap() + 1);
                for e in problem.dag().edges() {
                    let gap = i64::from(a.start(&e.to).unwrap()) - i64::from(a.start(&e.from).unwrap());
                    prop_assert!(gap >= i64::from(e.delay > 0));
                }

                // Every start is below the horizon, so folding on it keeps cycles apart.
                let usage = ResourceUsage::calculate(&problem, a, n).unwrap();
                prop_assert!(usage.peak_match_units() <= problem.limits().match_unit_limit);
                prop_assert!(usage.peak_action_fields() <= problem.limits().action_fields_limit);

                let rounds = solution.rounds.unwrap();
                let match_cycles = usage.slots.iter().filter(|s| s.match_units > 0).count() as u32;
                prop_assert!(rounds.match_rounds >= match_cycles);
                prop_assert_eq!(rounds.active_rounds, rounds.match_rounds.max(rounds.action_rounds));
            }
        }
    }
}
