//! Input validation and schedule checking.
//!
//! [`validate_dag`] checks structural integrity of a dependency graph before
//! it is used. Detects:
//! - Duplicate or empty operation IDs
//! - Edges referencing unknown operations
//! - Duplicate edges and self loops
//! - Circular dependencies
//!
//! [`check_schedule`] verifies a produced assignment against precedence,
//! per-slot capacity and per-slot generation concurrency.
//!
//! # Reference
//! Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.4 (Topological Sort)

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::error::ScheduleError;
use crate::models::{Assignment, Edge, Operation, ScheduleProblem, Violation, ViolationType};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two operations share the same ID.
    DuplicateId,
    /// An operation has an empty ID.
    EmptyId,
    /// An edge references an operation that doesn't exist.
    UnknownOperation,
    /// The same `from → to` pair appears twice.
    DuplicateEdge,
    /// Dependency graph contains a cycle (including self loops).
    CyclicDependency,
}

impl ValidationError {
    /// Creates a validation error.
    pub fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates operations and edges of a dependency graph.
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_dag(operations: &[Operation], edges: &[Edge]) -> ValidationResult {
    let mut errors = Vec::new();

    let mut ids = HashSet::new();
    for op in operations {
        if op.id.is_empty() {
            errors.push(ValidationError::new(
                ValidationErrorKind::EmptyId,
                "Operation with empty ID",
            ));
        }
        if !ids.insert(op.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate operation ID: {}", op.id),
            ));
        }
    }

    let mut pairs = HashSet::new();
    for edge in edges {
        for endpoint in [&edge.from, &edge.to] {
            if !ids.contains(endpoint.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::UnknownOperation,
                    format!(
                        "Edge '{}' -> '{}' references unknown operation '{}'",
                        edge.from, edge.to, endpoint
                    ),
                ));
            }
        }
        if edge.from == edge.to {
            errors.push(ValidationError::new(
                ValidationErrorKind::CyclicDependency,
                format!("Operation '{}' depends on itself", edge.from),
            ));
        }
        if !pairs.insert((edge.from.as_str(), edge.to.as_str())) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateEdge,
                format!("Duplicate edge '{}' -> '{}'", edge.from, edge.to),
            ));
        }
    }

    if let Some(cycle_err) = detect_cycles(operations, edges) {
        errors.push(cycle_err);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Detects cycles in the dependency graph using DFS.
///
/// Self loops are reported separately by the caller and skipped here.
fn detect_cycles(operations: &[Operation], edges: &[Edge]) -> Option<ValidationError> {
    let mut adj: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in edges.iter().filter(|e| e.from != e.to) {
        adj.entry(edge.from.as_str()).or_default().push(edge.to.as_str());
    }

    let mut visited = HashSet::new();
    let mut in_stack = HashSet::new();

    for op in operations {
        let node = op.id.as_str();
        if !visited.contains(node) && has_cycle_dfs(node, &adj, &mut visited, &mut in_stack) {
            return Some(ValidationError::new(
                ValidationErrorKind::CyclicDependency,
                format!("Circular dependency detected involving operation '{node}'"),
            ));
        }
    }

    None
}

fn has_cycle_dfs<'a>(
    node: &'a str,
    adj: &HashMap<&'a str, Vec<&'a str>>,
    visited: &mut HashSet<&'a str>,
    in_stack: &mut HashSet<&'a str>,
) -> bool {
    visited.insert(node);
    in_stack.insert(node);

    if let Some(neighbors) = adj.get(node) {
        for &next in neighbors {
            if in_stack.contains(next) {
                return true;
            }
            if !visited.contains(next) && has_cycle_dfs(next, adj, visited, in_stack) {
                return true;
            }
        }
    }

    in_stack.remove(node);
    false
}

/// Checks an assignment against every scheduling constraint.
///
/// With `period = None` the schedule is checked per absolute cycle (a single
/// packet, no pipelining): capacity per cycle, and no concurrency limits
/// since only one generation exists. With `Some(T)` operations are folded
/// onto slots `start % T` and all generations sharing a slot are counted.
///
/// # Returns
/// All detected violations; empty means feasible.
///
/// # Errors
/// [`ScheduleError::ZeroPeriod`] for `Some(0)`.
pub fn check_schedule(
    problem: &ScheduleProblem,
    assignment: &Assignment,
    period: Option<u32>,
) -> crate::Result<Vec<Violation>> {
    if period == Some(0) {
        return Err(ScheduleError::ZeroPeriod);
    }
    let dag = problem.dag();
    let limits = problem.limits();
    let mut violations = Vec::new();

    for op in dag.operations() {
        if assignment.start(&op.id).is_none() {
            violations.push(Violation::new(
                ViolationType::Unscheduled,
                &op.id,
                format!("Operation '{}' has no start cycle", op.id),
            ));
        }
    }

    for edge in dag.edges() {
        if let (Some(tu), Some(tv)) = (assignment.start(&edge.from), assignment.start(&edge.to)) {
            if (tv as i64) - (tu as i64) < edge.delay as i64 {
                violations.push(Violation::precedence(
                    &edge.to,
                    format!(
                        "'{}' starts at {} but '{}' starts at {} with delay {}",
                        edge.to, tv, edge.from, tu, edge.delay
                    ),
                ));
            }
        }
    }

    #[derive(Default)]
    struct SlotLoad {
        units: u32,
        fields: u32,
        match_gens: BTreeSet<u32>,
        action_gens: BTreeSet<u32>,
    }

    let mut slots: BTreeMap<u32, SlotLoad> = BTreeMap::new();
    for (idx, op) in dag.operations().iter().enumerate() {
        let Some(t) = assignment.start(&op.id) else {
            continue;
        };
        let (slot, generation) = match period {
            Some(p) => (t % p, t / p),
            None => (t, 0),
        };
        let load = slots.entry(slot).or_default();
        if op.is_match() {
            load.units += problem.match_units(idx);
            load.match_gens.insert(generation);
        } else {
            load.fields += problem.action_fields(idx);
            load.action_gens.insert(generation);
        }
    }

    for (&slot, load) in &slots {
        if load.units > limits.match_unit_limit {
            violations.push(Violation::slot(
                ViolationType::MatchCapacity,
                slot,
                format!("{} match units > limit {}", load.units, limits.match_unit_limit),
            ));
        }
        if load.fields > limits.action_fields_limit {
            violations.push(Violation::slot(
                ViolationType::ActionCapacity,
                slot,
                format!(
                    "{} action fields > limit {}",
                    load.fields, limits.action_fields_limit
                ),
            ));
        }
        if load.match_gens.len() > limits.match_proc_limit as usize {
            violations.push(Violation::slot(
                ViolationType::MatchConcurrency,
                slot,
                format!(
                    "{} generations matching > limit {}",
                    load.match_gens.len(),
                    limits.match_proc_limit
                ),
            ));
        }
        if load.action_gens.len() > limits.action_proc_limit as usize {
            violations.push(Violation::slot(
                ViolationType::ActionConcurrency,
                slot,
                format!(
                    "{} generations acting > limit {}",
                    load.action_gens.len(),
                    limits.action_proc_limit
                ),
            ));
        }
    }

    Ok(violations)
}
