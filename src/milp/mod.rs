//! Mixed-integer linear programming abstraction.
//!
//! A [`MilpModel`] is a backend-neutral description of an integer program:
//! bounded variables, linear and indicator constraints, an objective and
//! optional start values. Any [`MilpSolver`] can solve it under a
//! [`SolverConfig`]; the crate ships [`BranchAndBound`], a dependency-free
//! exact solver suitable for the small instances of per-probe models.
//!
//! # Reference
//! - Wolsey (1998), "Integer Programming"
//! - Achterberg (2007), "Constraint Integer Programming" (bound propagation)

mod branch_bound;

pub use branch_bound::BranchAndBound;

use std::fmt::Debug;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Handle to a model variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub(crate) usize);

impl VarId {
    /// Position of the variable in declaration order.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Variable domain type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VarKind {
    /// 0/1 variable.
    Binary,
    /// Integer variable within its bounds.
    Integer,
    /// Real variable within its bounds.
    Continuous,
}

/// A declared variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    /// Name used in logs and errors.
    pub name: String,
    /// Domain of the variable.
    pub kind: VarKind,
    /// Lower bound.
    pub lb: f64,
    /// Upper bound.
    pub ub: f64,
    /// Start value hint.
    pub start: Option<f64>,
}

/// Linear expression `Σ coef·var + constant`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    /// `(variable, coefficient)` pairs.
    pub terms: Vec<(VarId, f64)>,
    /// Constant offset.
    pub constant: f64,
}

impl LinearExpr {
    /// Creates an empty expression.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates `1·var`.
    pub fn var(var: VarId) -> Self {
        Self::new().with_term(var, 1.0)
    }

    /// Adds `coef·var`.
    pub fn with_term(mut self, var: VarId, coef: f64) -> Self {
        self.add_term(var, coef);
        self
    }

    /// Adds a constant.
    pub fn with_constant(mut self, constant: f64) -> Self {
        self.constant += constant;
        self
    }

    /// Adds `coef·var` in place. Zero coefficients are dropped.
    pub fn add_term(&mut self, var: VarId, coef: f64) {
        if coef != 0.0 {
            self.terms.push((var, coef));
        }
    }

    /// Builds `Σ coef·var` from pairs.
    pub fn from_terms<I: IntoIterator<Item = (VarId, f64)>>(terms: I) -> Self {
        let mut expr = Self::new();
        for (var, coef) in terms {
            expr.add_term(var, coef);
        }
        expr
    }

    /// Evaluates the expression at the given variable values.
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.constant
            + self
                .terms
                .iter()
                .map(|&(v, c)| c * values[v.0])
                .sum::<f64>()
    }
}

/// Constraint sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sense {
    /// `expr ≤ rhs`
    Le,
    /// `expr ≥ rhs`
    Ge,
    /// `expr = rhs`
    Eq,
}

/// Optimization direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Minimize,
    Maximize,
}

/// `expr sense rhs`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearConstraint {
    /// Constraint name.
    pub name: String,
    /// Left-hand side.
    pub expr: LinearExpr,
    /// Comparison.
    pub sense: Sense,
    /// Right-hand side.
    pub rhs: f64,
}

impl LinearConstraint {
    /// Whether the constraint holds at the given values.
    pub fn is_satisfied(&self, values: &[f64], tolerance: f64) -> bool {
        let lhs = self.expr.evaluate(values);
        match self.sense {
            Sense::Le => lhs <= self.rhs + tolerance,
            Sense::Ge => lhs >= self.rhs - tolerance,
            Sense::Eq => (lhs - self.rhs).abs() <= tolerance,
        }
    }
}

/// `indicator = active_value ⇒ constraint`.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorConstraint {
    /// Binary controlling the constraint.
    pub indicator: VarId,
    /// Value of `indicator` that enforces `constraint`.
    pub active_value: bool,
    /// Enforced constraint.
    pub constraint: LinearConstraint,
}

/// Backend-neutral integer program.
#[derive(Debug, Clone, Default)]
pub struct MilpModel {
    name: String,
    variables: Vec<Variable>,
    constraints: Vec<LinearConstraint>,
    indicators: Vec<IndicatorConstraint>,
    objective: LinearExpr,
    direction: Direction,
}

impl MilpModel {
    /// Creates an empty model.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Model name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declares a variable. Binary variables get bounds `[0, 1]`.
    pub fn add_var(&mut self, name: impl Into<String>, kind: VarKind, lb: f64, ub: f64) -> VarId {
        let (lb, ub) = match kind {
            VarKind::Binary => (0.0, 1.0),
            _ => (lb, ub),
        };
        self.variables.push(Variable {
            name: name.into(),
            kind,
            lb,
            ub,
            start: None,
        });
        VarId(self.variables.len() - 1)
    }

    /// Declares a binary variable.
    pub fn add_binary(&mut self, name: impl Into<String>) -> VarId {
        self.add_var(name, VarKind::Binary, 0.0, 1.0)
    }

    /// Declares an integer variable.
    pub fn add_integer(&mut self, name: impl Into<String>, lb: f64, ub: f64) -> VarId {
        self.add_var(name, VarKind::Integer, lb, ub)
    }

    /// Registers `expr sense rhs`.
    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        expr: LinearExpr,
        sense: Sense,
        rhs: f64,
    ) {
        self.constraints.push(LinearConstraint {
            name: name.into(),
            expr,
            sense,
            rhs,
        });
    }

    /// Registers `indicator = active_value ⇒ expr sense rhs`.
    pub fn add_indicator(
        &mut self,
        name: impl Into<String>,
        indicator: VarId,
        active_value: bool,
        expr: LinearExpr,
        sense: Sense,
        rhs: f64,
    ) {
        self.indicators.push(IndicatorConstraint {
            indicator,
            active_value,
            constraint: LinearConstraint {
                name: name.into(),
                expr,
                sense,
                rhs,
            },
        });
    }

    /// Sets the objective.
    pub fn set_objective(&mut self, expr: LinearExpr, direction: Direction) {
        self.objective = expr;
        self.direction = direction;
    }

    /// Seeds a start value for a variable.
    pub fn set_start(&mut self, var: VarId, value: f64) {
        self.variables[var.0].start = Some(value);
    }

    /// Declared variables.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Linear constraints.
    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    /// Indicator constraints.
    pub fn indicators(&self) -> &[IndicatorConstraint] {
        &self.indicators
    }

    /// Objective expression.
    pub fn objective(&self) -> &LinearExpr {
        &self.objective
    }

    /// Objective direction.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Number of variables.
    pub fn var_count(&self) -> usize {
        self.variables.len()
    }

    /// Number of linear plus indicator constraints.
    pub fn constraint_count(&self) -> usize {
        self.constraints.len() + self.indicators.len()
    }

    /// Whether `values` satisfies bounds, integrality and every constraint.
    pub fn is_feasible(&self, values: &[f64], tolerance: f64) -> bool {
        if values.len() != self.variables.len() {
            return false;
        }
        let in_domain = self.variables.iter().zip(values).all(|(var, &x)| {
            let integral = var.kind == VarKind::Continuous || (x - x.round()).abs() <= tolerance;
            integral && x >= var.lb - tolerance && x <= var.ub + tolerance
        });
        in_domain
            && self
                .constraints
                .iter()
                .all(|c| c.is_satisfied(values, tolerance))
            && self.indicators.iter().all(|ind| {
                let active = (values[ind.indicator.0] >= 0.5) == ind.active_value;
                !active || ind.constraint.is_satisfied(values, tolerance)
            })
    }
}

/// Solve termination status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MilpStatus {
    /// Proven optimal.
    Optimal,
    /// Proven infeasible.
    Infeasible,
    /// Limit reached before any feasible point was found.
    TimeLimitNoIncumbent,
    /// Limit reached with a feasible, possibly suboptimal, point.
    TimeLimitWithIncumbent,
}

/// Solver output.
#[derive(Debug, Clone, PartialEq)]
pub struct MilpResult {
    /// Termination status.
    pub status: MilpStatus,
    /// Incumbent variable values (empty without incumbent).
    pub values: Vec<f64>,
    /// Incumbent objective value.
    pub objective: Option<f64>,
    /// Relative optimality gap of the incumbent (0 when optimal).
    pub gap: Option<f64>,
    /// Search nodes explored.
    pub nodes: u64,
    /// Wall-clock solve time.
    pub elapsed: Duration,
}

impl MilpResult {
    /// Whether an incumbent exists.
    pub fn has_incumbent(&self) -> bool {
        matches!(
            self.status,
            MilpStatus::Optimal | MilpStatus::TimeLimitWithIncumbent
        )
    }

    /// Incumbent value of a variable.
    pub fn value(&self, var: VarId) -> Option<f64> {
        self.values.get(var.0).copied()
    }
}

/// Solver configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Wall-clock time limit.
    pub time_limit: Duration,
    /// Optional cap on explored search nodes; treated like the time limit.
    pub node_limit: Option<u64>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit: Duration::from_secs(60),
            node_limit: None,
        }
    }
}

impl SolverConfig {
    /// Sets the time limit.
    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = time_limit;
        self
    }

    /// Sets the node limit.
    pub fn with_node_limit(mut self, node_limit: u64) -> Self {
        self.node_limit = Some(node_limit);
        self
    }
}

/// Errors raised for models a backend cannot handle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MilpError {
    /// A variable kind the backend does not support.
    #[error("variable `{0}` has a kind this solver does not support")]
    UnsupportedVariable(String),
    /// A variable without finite bounds.
    #[error("variable `{0}` needs finite bounds")]
    UnboundedVariable(String),
    /// An indicator constraint on a non-binary variable.
    #[error("indicator variable `{0}` is not binary")]
    NonBinaryIndicator(String),
}

/// An integer-program solving engine.
pub trait MilpSolver: Send + Sync + Debug {
    /// Backend name (for logs).
    fn name(&self) -> &'static str;

    /// Solves a model.
    ///
    /// Infeasibility and limits are statuses, not errors; errors mean the
    /// model is outside what this backend accepts.
    fn solve(&self, model: &MilpModel, config: &SolverConfig) -> Result<MilpResult, MilpError>;
}
