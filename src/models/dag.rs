//! Dependency graph model.
//!
//! A `ScheduleDag` holds the operations of one packet's program and the
//! delay-weighted dependencies between them. It is built once per input,
//! validated on construction and never mutated afterwards; heuristics that
//! consume the graph work on their own in-degree copies.
//!
//! # Reference
//! Jose et al. (2015), "Compiling Packet Programs to Reconfigurable Switches"

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use serde::{Deserialize, Serialize};

use super::{Operation, OperationKind};
use crate::error::{Result, ScheduleError};
use crate::validation::validate_dag;

/// Dependency classification between two operations.
///
/// Informational only; scheduling uses the edge delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyType {
    /// The successor matches on a field the predecessor produces.
    #[default]
    Match,
    /// The successor acts on a field the predecessor produces.
    Action,
    /// The successor's execution depends on the predecessor's outcome.
    Successor,
    /// The successor writes a field the predecessor reads.
    Reverse,
}

/// A delay-weighted dependency `from → to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Predecessor operation ID.
    pub from: String,
    /// Successor operation ID.
    pub to: String,
    /// Minimum number of cycles `to` must start after `from`.
    pub delay: u32,
    /// Dependency classification.
    #[serde(default)]
    pub dep_type: DependencyType,
}

impl Edge {
    /// Creates an edge with an explicit delay.
    pub fn new(from: impl Into<String>, to: impl Into<String>, delay: u32) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            delay,
            dep_type: DependencyType::default(),
        }
    }

    /// Sets the dependency type.
    pub fn with_dep_type(mut self, dep_type: DependencyType) -> Self {
        self.dep_type = dep_type;
        self
    }
}

/// Per-kind latencies used to derive edge delays.
///
/// An edge leaving an operation of kind `k` is delayed by the latency of
/// `k`: a match result is available `match_delay` cycles after the match
/// starts, and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LatencySpec {
    /// Cycles from a match start until dependents may start (dM).
    pub match_delay: u32,
    /// Cycles from an action start until dependents may start (dA).
    pub action_delay: u32,
    /// Cycles from a condition start until dependents may start.
    pub condition_delay: u32,
}

impl LatencySpec {
    /// Creates a latency spec.
    pub fn new(match_delay: u32, action_delay: u32, condition_delay: u32) -> Self {
        Self {
            match_delay,
            action_delay,
            condition_delay,
        }
    }

    /// Delay of an edge leaving an operation of the given kind.
    pub fn delay_after(&self, kind: OperationKind) -> u32 {
        match kind {
            OperationKind::Match => self.match_delay,
            OperationKind::Action => self.action_delay,
            OperationKind::Condition => self.condition_delay,
        }
    }
}

/// Validated operation dependency graph.
#[derive(Debug, Clone)]
pub struct ScheduleDag {
    operations: Vec<Operation>,
    edges: Vec<Edge>,
    index: HashMap<String, usize>,
    /// Per node: (predecessor index, delay).
    preds: Vec<Vec<(usize, u32)>>,
    /// Per node: (successor index, delay).
    succs: Vec<Vec<(usize, u32)>>,
}

impl ScheduleDag {
    /// Builds and validates a graph.
    ///
    /// # Errors
    /// `ScheduleError::InvalidDag` on duplicate IDs, unknown edge
    /// endpoints, duplicate edges or cycles.
    pub fn new(operations: Vec<Operation>, edges: Vec<Edge>) -> Result<Self> {
        validate_dag(&operations, &edges).map_err(ScheduleError::InvalidDag)?;

        let index: HashMap<String, usize> = operations
            .iter()
            .enumerate()
            .map(|(i, op)| (op.id.clone(), i))
            .collect();

        let mut preds = vec![Vec::new(); operations.len()];
        let mut succs = vec![Vec::new(); operations.len()];
        for edge in &edges {
            let u = index[&edge.from];
            let v = index[&edge.to];
            succs[u].push((v, edge.delay));
            preds[v].push((u, edge.delay));
        }

        Ok(Self {
            operations,
            edges,
            index,
            preds,
            succs,
        })
    }

    /// Number of operations.
    #[inline]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Whether the graph has no operations.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// All operations in insertion order.
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Operation at a node index.
    #[inline]
    pub fn operation(&self, idx: usize) -> &Operation {
        &self.operations[idx]
    }

    /// Looks up an operation by ID.
    pub fn get(&self, id: &str) -> Option<&Operation> {
        self.index.get(id).map(|&i| &self.operations[i])
    }

    /// Node index of an operation ID.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Operations, optionally restricted to one kind.
    pub fn nodes(&self, select: Option<OperationKind>) -> impl Iterator<Item = &Operation> {
        self.operations
            .iter()
            .filter(move |op| select.map_or(true, |k| op.kind == k))
    }

    /// Node indices of the given kind.
    pub fn indices_of(&self, kind: OperationKind) -> Vec<usize> {
        (0..self.len())
            .filter(|&i| self.operations[i].kind == kind)
            .collect()
    }

    /// All edges in insertion order.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Edges as `(from index, to index, delay)` triples.
    pub fn edge_indices(&self) -> impl Iterator<Item = (usize, usize, u32)> + '_ {
        self.succs
            .iter()
            .enumerate()
            .flat_map(|(u, out)| out.iter().map(move |&(v, d)| (u, v, d)))
    }

    /// Predecessors of a node with their edge delays.
    #[inline]
    pub fn predecessors(&self, idx: usize) -> &[(usize, u32)] {
        &self.preds[idx]
    }

    /// Successors of a node with their edge delays.
    #[inline]
    pub fn successors(&self, idx: usize) -> &[(usize, u32)] {
        &self.succs[idx]
    }

    /// In-degree of every node.
    pub fn in_degrees(&self) -> Vec<usize> {
        self.preds.iter().map(Vec::len).collect()
    }

    /// Topological order; among ready nodes the lowest index goes first.
    pub fn topological_order(&self) -> Vec<usize> {
        let mut in_deg = self.in_degrees();
        let mut ready: BinaryHeap<Reverse<usize>> = in_deg
            .iter()
            .enumerate()
            .filter(|(_, &d)| d == 0)
            .map(|(i, _)| Reverse(i))
            .collect();
        let mut order = Vec::with_capacity(self.len());

        while let Some(Reverse(u)) = ready.pop() {
            order.push(u);
            for &(v, _) in &self.succs[u] {
                in_deg[v] -= 1;
                if in_deg[v] == 0 {
                    ready.push(Reverse(v));
                }
            }
        }
        order
    }

    /// Longest delay-weighted path.
    ///
    /// Returns the operation IDs along the path and its length (sum of
    /// edge delays). An empty graph yields `(vec![], 0)`.
    pub fn critical_path(&self) -> (Vec<String>, u32) {
        let mut dist = vec![0u32; self.len()];
        let mut via: Vec<Option<usize>> = vec![None; self.len()];

        for u in self.topological_order() {
            for &(v, delay) in &self.succs[u] {
                let candidate = dist[u] + delay;
                if candidate > dist[v] || (via[v].is_none() && candidate == dist[v]) {
                    dist[v] = candidate;
                    via[v] = Some(u);
                }
            }
        }

        let Some(end) = (0..self.len()).max_by_key(|&i| (dist[i], Reverse(i))) else {
            return (Vec::new(), 0);
        };

        let mut path = vec![self.operations[end].id.clone()];
        let mut cur = end;
        while let Some(prev) = via[cur] {
            path.push(self.operations[prev].id.clone());
            cur = prev;
        }
        path.reverse();
        (path, dist[end])
    }
}

/// Incremental `ScheduleDag` construction.
///
/// Dependencies added with [`DagBuilder::with_dependency`] take their delay
/// from the latency spec, keyed by the kind of the source operation.
///
/// # Example
/// ```
/// use pipeline_schedule::models::{DagBuilder, DependencyType, LatencySpec, Operation};
///
/// let dag = DagBuilder::new()
///     .with_latency(LatencySpec::new(2, 1, 1))
///     .with_operation(Operation::match_op("acl", 80))
///     .with_operation(Operation::action("drop", 1))
///     .with_dependency("acl", "drop", DependencyType::Match)
///     .build()
///     .unwrap();
/// assert_eq!(dag.edges()[0].delay, 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct DagBuilder {
    operations: Vec<Operation>,
    edges: Vec<Edge>,
    dependencies: Vec<(String, String, DependencyType)>,
    latency: LatencySpec,
}

impl DagBuilder {
    /// Creates an empty builder with zero latencies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the latency spec used for typed dependencies.
    pub fn with_latency(mut self, latency: LatencySpec) -> Self {
        self.latency = latency;
        self
    }

    /// Adds an operation.
    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.operations.push(operation);
        self
    }

    /// Adds an edge with an explicit delay.
    pub fn with_edge(mut self, edge: Edge) -> Self {
        self.edges.push(edge);
        self
    }

    /// Adds a dependency whose delay comes from the latency spec.
    pub fn with_dependency(
        mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        dep_type: DependencyType,
    ) -> Self {
        self.dependencies.push((from.into(), to.into(), dep_type));
        self
    }

    /// Resolves dependency delays and validates the graph.
    pub fn build(self) -> Result<ScheduleDag> {
        let kinds: HashMap<&str, OperationKind> = self
            .operations
            .iter()
            .map(|op| (op.id.as_str(), op.kind))
            .collect();

        let mut edges = self.edges;
        for (from, to, dep_type) in self.dependencies {
            // Unknown sources are reported by validation.
            let delay = kinds
                .get(from.as_str())
                .map_or(0, |&k| self.latency.delay_after(k));
            edges.push(Edge::new(from, to, delay).with_dep_type(dep_type));
        }

        ScheduleDag::new(self.operations, edges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> ScheduleDag {
        DagBuilder::new()
            .with_latency(LatencySpec::new(2, 1, 0))
            .with_operation(Operation::match_op("A", 80))
            .with_operation(Operation::action("B", 2))
            .with_operation(Operation::match_op("C", 160))
            .with_operation(Operation::action("D", 2))
            .with_dependency("A", "B", DependencyType::Match)
            .with_dependency("B", "C", DependencyType::Action)
            .with_dependency("C", "D", DependencyType::Match)
            .build()
            .unwrap()
    }

    #[test]
    fn test_latency_derived_delays() {
        let dag = chain();
        let delays: Vec<u32> = dag.edges().iter().map(|e| e.delay).collect();
        assert_eq!(delays, vec![2, 1, 2]);
    }

    #[test]
    fn test_critical_path_chain() {
        let (path, len) = chain().critical_path();
        assert_eq!(path, vec!["A", "B", "C", "D"]);
        assert_eq!(len, 5);
    }

    #[test]
    fn test_critical_path_picks_heavier_branch() {
        let dag = ScheduleDag::new(
            vec![
                Operation::match_op("s", 80),
                Operation::action("x", 1),
                Operation::action("y", 1),
                Operation::condition("t"),
            ],
            vec![
                Edge::new("s", "x", 1),
                Edge::new("s", "y", 4),
                Edge::new("x", "t", 1),
                Edge::new("y", "t", 1),
            ],
        )
        .unwrap();
        let (path, len) = dag.critical_path();
        assert_eq!(path, vec!["s", "y", "t"]);
        assert_eq!(len, 5);
    }

    #[test]
    fn test_critical_path_empty() {
        let dag = ScheduleDag::new(vec![], vec![]).unwrap();
        assert_eq!(dag.critical_path(), (vec![], 0));
        assert!(dag.is_empty());
    }

    #[test]
    fn test_topological_order_respects_edges() {
        let dag = ScheduleDag::new(
            vec![
                Operation::action("late", 1),
                Operation::match_op("early", 80),
            ],
            vec![Edge::new("early", "late", 1)],
        )
        .unwrap();
        assert_eq!(dag.topological_order(), vec![1, 0]);
    }

    #[test]
    fn test_nodes_select() {
        let dag = chain();
        assert_eq!(dag.nodes(None).count(), 4);
        assert_eq!(dag.nodes(Some(OperationKind::Match)).count(), 2);
        assert_eq!(dag.indices_of(OperationKind::Action), vec![1, 3]);
        assert_eq!(dag.get("C").unwrap().key_width, 160);
        assert_eq!(dag.index_of("D"), Some(3));
    }

    #[test]
    fn test_cycle_rejected() {
        let err = ScheduleDag::new(
            vec![Operation::action("a", 1), Operation::action("b", 1)],
            vec![Edge::new("a", "b", 0), Edge::new("b", "a", 0)],
        )
        .unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidDag(_)));
    }

    #[test]
    fn test_unknown_dependency_source_rejected() {
        let err = DagBuilder::new()
            .with_operation(Operation::action("a", 1))
            .with_dependency("ghost", "a", DependencyType::Successor)
            .build()
            .unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidDag(_)));
    }
}
