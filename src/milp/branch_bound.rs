//! Depth-first branch-and-bound over bounded integer variables.
//!
//! # Algorithm
//!
//! 1. Convert every variable to an integer interval `[lb, ub]`.
//! 2. At each node, propagate bounds through every linear row to a
//!    fixpoint (interval reasoning on `Σ a·x ≤ b`). Indicator rows are
//!    enforced once their indicator is fixed to the active value; an
//!    indicator whose row can no longer hold is fixed to the other value.
//! 3. Branch on the first unfixed variable in declaration order. The start
//!    value (if any) is tried first, then the remaining values ascending.
//! 4. Each incumbent adds an objective cutoff row so later nodes must
//!    strictly improve on it.
//!
//! The search is exact but exponential; declaration order is the branching
//! order, so models should declare their decisive variables first.
//!
//! # Reference
//! - Land & Doig (1960), "An Automatic Method of Solving Discrete Programming Problems"
//! - Harvey & Schimpf (2002), "Bounds consistency techniques for long linear constraints"

use std::collections::BTreeMap;
use std::time::Instant;

use super::{
    Direction, LinearConstraint, MilpError, MilpModel, MilpResult, MilpSolver, MilpStatus, Sense,
    SolverConfig, VarKind,
};

const TOL: f64 = 1e-6;
const MAX_PROPAGATION_PASSES: usize = 1_000;

type Domains = Vec<(i64, i64)>;

/// Built-in exact integer-program solver.
///
/// Accepts binary and finitely bounded integer variables; continuous
/// variables are rejected with [`MilpError::UnsupportedVariable`].
///
/// # Example
/// ```
/// use pipeline_schedule::milp::{
///     BranchAndBound, Direction, LinearExpr, MilpModel, MilpSolver, MilpStatus, Sense, SolverConfig,
/// };
///
/// let mut model = MilpModel::new("knapsack");
/// let x = model.add_binary("x");
/// let y = model.add_binary("y");
/// model.add_constraint("w", LinearExpr::var(x).with_term(y, 1.0), Sense::Le, 1.0);
/// model.set_objective(LinearExpr::var(x).with_term(y, 2.0), Direction::Maximize);
///
/// let result = BranchAndBound::new().solve(&model, &SolverConfig::default()).unwrap();
/// assert_eq!(result.status, MilpStatus::Optimal);
/// assert_eq!(result.value(y), Some(1.0));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct BranchAndBound;

impl BranchAndBound {
    /// Creates the solver.
    pub fn new() -> Self {
        Self
    }
}

/// A normalized row `Σ a·x (sense) rhs` with constants folded into `rhs`
/// and duplicate variables merged.
#[derive(Debug, Clone)]
struct Row {
    terms: Vec<(usize, f64)>,
    sense: Sense,
    rhs: f64,
}

impl Row {
    fn from_constraint(c: &LinearConstraint) -> Self {
        let mut merged: BTreeMap<usize, f64> = BTreeMap::new();
        for &(v, coef) in &c.expr.terms {
            *merged.entry(v.0).or_insert(0.0) += coef;
        }
        Self {
            terms: merged.into_iter().filter(|&(_, c)| c != 0.0).collect(),
            sense: c.sense,
            rhs: c.rhs - c.expr.constant,
        }
    }

    /// Tightens bounds. `None` on conflict, otherwise whether anything changed.
    fn tighten(&self, dom: &mut Domains) -> Option<bool> {
        match self.sense {
            Sense::Le => tighten_le(&self.terms, 1.0, self.rhs, dom),
            Sense::Ge => tighten_le(&self.terms, -1.0, self.rhs, dom),
            Sense::Eq => {
                let a = tighten_le(&self.terms, 1.0, self.rhs, dom)?;
                let b = tighten_le(&self.terms, -1.0, self.rhs, dom)?;
                Some(a || b)
            }
        }
    }

    /// Whether the row cannot hold for any point in the domains.
    fn is_violated(&self, dom: &Domains) -> bool {
        let le = |sign: f64| min_activity(&self.terms, sign, dom) > sign * self.rhs + TOL;
        match self.sense {
            Sense::Le => le(1.0),
            Sense::Ge => le(-1.0),
            Sense::Eq => le(1.0) || le(-1.0),
        }
    }
}

#[derive(Debug, Clone)]
struct Indicator {
    var: usize,
    active: i64,
    row: Row,
}

#[inline]
fn min_term(a: f64, (lb, ub): (i64, i64)) -> f64 {
    if a > 0.0 {
        a * lb as f64
    } else {
        a * ub as f64
    }
}

fn min_activity(terms: &[(usize, f64)], sign: f64, dom: &Domains) -> f64 {
    terms.iter().map(|&(v, c)| min_term(sign * c, dom[v])).sum()
}

/// Enforces `Σ sign·c·x ≤ sign·rhs` by interval reasoning.
fn tighten_le(terms: &[(usize, f64)], sign: f64, rhs: f64, dom: &mut Domains) -> Option<bool> {
    let rhs = sign * rhs;
    let min_sum = min_activity(terms, sign, dom);
    if min_sum > rhs + TOL {
        return None;
    }

    // Tightening an upper bound of a positive term (or a lower bound of a
    // negative one) leaves `min_sum` unchanged, so one pass suffices.
    let mut changed = false;
    for &(v, c) in terms {
        let a = sign * c;
        let (lb, ub) = dom[v];
        let slack = rhs - (min_sum - min_term(a, (lb, ub)));
        if a > 0.0 {
            let bound = (slack / a + TOL).floor();
            if bound < ub as f64 {
                let bound = bound as i64;
                if bound < lb {
                    return None;
                }
                dom[v].1 = bound;
                changed = true;
            }
        } else {
            let bound = (slack / a - TOL).ceil();
            if bound > lb as f64 {
                let bound = bound as i64;
                if bound > ub {
                    return None;
                }
                dom[v].0 = bound;
                changed = true;
            }
        }
    }
    Some(changed)
}

/// Search state for one solve.
struct Search {
    rows: Vec<Row>,
    indicators: Vec<Indicator>,
    /// Objective in minimization form.
    objective: Vec<(usize, f64)>,
    objective_constant: f64,
    integral_objective: bool,
    hints: Vec<Option<i64>>,
    cutoff: Option<Row>,
}

impl Search {
    fn new(model: &MilpModel) -> Result<(Self, Domains), MilpError> {
        let mut dom = Vec::with_capacity(model.var_count());
        let mut hints = Vec::with_capacity(model.var_count());
        for var in model.variables() {
            if var.kind == VarKind::Continuous {
                return Err(MilpError::UnsupportedVariable(var.name.clone()));
            }
            if !var.lb.is_finite() || !var.ub.is_finite() {
                return Err(MilpError::UnboundedVariable(var.name.clone()));
            }
            dom.push(((var.lb - TOL).ceil() as i64, (var.ub + TOL).floor() as i64));
            hints.push(var.start.map(|s| s.round() as i64));
        }

        let mut indicators = Vec::with_capacity(model.indicators().len());
        for ind in model.indicators() {
            let var = &model.variables()[ind.indicator.0];
            if var.kind != VarKind::Binary {
                return Err(MilpError::NonBinaryIndicator(var.name.clone()));
            }
            indicators.push(Indicator {
                var: ind.indicator.0,
                active: i64::from(ind.active_value),
                row: Row::from_constraint(&ind.constraint),
            });
        }

        let sign = match model.direction() {
            Direction::Minimize => 1.0,
            Direction::Maximize => -1.0,
        };
        let objective: Vec<(usize, f64)> = model
            .objective()
            .terms
            .iter()
            .map(|&(v, c)| (v.0, sign * c))
            .collect();
        let integral_objective = objective.iter().all(|&(_, c)| c.fract() == 0.0);

        let search = Self {
            rows: model.constraints().iter().map(Row::from_constraint).collect(),
            indicators,
            objective,
            objective_constant: sign * model.objective().constant,
            integral_objective,
            hints,
            cutoff: None,
        };
        Ok((search, dom))
    }

    fn propagate(&self, dom: &mut Domains) -> bool {
        if dom.iter().any(|&(lb, ub)| lb > ub) {
            return false;
        }
        for _ in 0..MAX_PROPAGATION_PASSES {
            let mut changed = false;

            for row in self.rows.iter().chain(self.cutoff.as_ref()) {
                match row.tighten(dom) {
                    None => return false,
                    Some(c) => changed |= c,
                }
            }

            for ind in &self.indicators {
                let (lb, ub) = dom[ind.var];
                if lb == ub {
                    if lb == ind.active {
                        match ind.row.tighten(dom) {
                            None => return false,
                            Some(c) => changed |= c,
                        }
                    }
                } else if ind.row.is_violated(dom) {
                    let inactive = 1 - ind.active;
                    dom[ind.var] = (inactive, inactive);
                    changed = true;
                }
            }

            if !changed {
                break;
            }
        }
        true
    }

    fn objective_bound(&self, dom: &Domains) -> f64 {
        self.objective_constant + min_activity(&self.objective, 1.0, dom)
    }

    fn set_cutoff(&mut self, incumbent: f64) {
        let step = if self.integral_objective { 1.0 } else { TOL * 10.0 };
        self.cutoff = Some(Row {
            terms: self.objective.clone(),
            sense: Sense::Le,
            rhs: incumbent - step - self.objective_constant,
        });
    }

    /// Children of `dom` branching on `v`, in reverse exploration order.
    fn branch(&self, dom: &Domains, v: usize) -> Vec<Domains> {
        let (lb, ub) = dom[v];
        let pick = self.hints[v].filter(|h| (lb..=ub).contains(h)).unwrap_or(lb);

        let mut children = Vec::with_capacity(3);
        if pick < ub {
            let mut high = dom.clone();
            high[v] = (pick + 1, ub);
            children.push(high);
        }
        if pick > lb {
            let mut low = dom.clone();
            low[v] = (lb, pick - 1);
            children.push(low);
        }
        let mut fixed = dom.clone();
        fixed[v] = (pick, pick);
        children.push(fixed);
        children
    }
}

impl MilpSolver for BranchAndBound {
    fn name(&self) -> &'static str {
        "branch-and-bound"
    }

    fn solve(&self, model: &MilpModel, config: &SolverConfig) -> Result<MilpResult, MilpError> {
        let started = Instant::now();
        let (mut search, root) = Search::new(model)?;

        let mut stack: Vec<Domains> = vec![root];
        let mut incumbent: Option<(Vec<f64>, f64)> = None;
        let mut nodes: u64 = 0;
        let mut limit_hit = false;

        while let Some(mut dom) = stack.pop() {
            let over_time = started.elapsed() >= config.time_limit;
            let over_nodes = config.node_limit.is_some_and(|n| nodes >= n);
            if over_time || over_nodes {
                stack.push(dom);
                limit_hit = true;
                break;
            }
            nodes += 1;

            if !search.propagate(&mut dom) {
                continue;
            }

            match dom.iter().position(|&(lb, ub)| lb < ub) {
                Some(v) => stack.extend(search.branch(&dom, v)),
                None => {
                    let values: Vec<f64> = dom.iter().map(|&(x, _)| x as f64).collect();
                    if !model.is_feasible(&values, TOL) {
                        continue;
                    }
                    let obj = search.objective_bound(&dom);
                    if incumbent.as_ref().map_or(true, |(_, best)| obj < *best) {
                        search.set_cutoff(obj);
                        incumbent = Some((values, obj));
                    }
                }
            }
        }

        let sign = match model.direction() {
            Direction::Minimize => 1.0,
            Direction::Maximize => -1.0,
        };

        let (status, values, objective, gap) = match (incumbent, limit_hit) {
            (None, false) => (MilpStatus::Infeasible, Vec::new(), None, None),
            (None, true) => (MilpStatus::TimeLimitNoIncumbent, Vec::new(), None, None),
            (Some((values, obj)), false) => {
                (MilpStatus::Optimal, values, Some(sign * obj), Some(0.0))
            }
            (Some((values, obj)), true) => {
                let bound = stack
                    .iter()
                    .map(|d| search.objective_bound(d))
                    .fold(obj, f64::min);
                let gap = (obj - bound).abs() / obj.abs().max(1e-10);
                (
                    MilpStatus::TimeLimitWithIncumbent,
                    values,
                    Some(sign * obj),
                    Some(gap),
                )
            }
        };

        Ok(MilpResult {
            status,
            values,
            objective,
            gap,
            nodes,
            elapsed: started.elapsed(),
        })
    }
}
