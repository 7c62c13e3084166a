//! Shared fixtures for unit and property tests.

use proptest::prelude::*;

use crate::models::{Edge, HardwareLimits, Operation, ScheduleDag, ScheduleProblem};

/// `A(match 80) -2-> B(action 2) -1-> C(match 160) -2-> D(action 2)` on a
/// 2-unit, 4-field, single-generation processor.
pub(crate) fn chain_problem() -> ScheduleProblem {
    let dag = ScheduleDag::new(
        vec![
            Operation::match_op("A", 80),
            Operation::action("B", 2),
            Operation::match_op("C", 160),
            Operation::action("D", 2),
        ],
        vec![
            Edge::new("A", "B", 2),
            Edge::new("B", "C", 1),
            Edge::new("C", "D", 2),
        ],
    )
    .unwrap();
    ScheduleProblem::new(dag, HardwareLimits::new(2, 80, 4, 1, 1).unwrap()).unwrap()
}

/// Random DAGs of up to seven operations whose edges go from lower to
/// higher index, on limits every single operation fits.
pub(crate) fn arb_problem() -> impl Strategy<Value = ScheduleProblem> {
    (1usize..8)
        .prop_flat_map(|n| {
            let ops = prop::collection::vec((0u8..3, 0usize..3, 0u32..5), n);
            let edges = prop::collection::vec((any::<bool>(), 0u32..3), n * (n - 1) / 2);
            (ops, edges, 1u32..3, 1u32..3)
        })
        .prop_map(|(ops, edge_mask, match_proc, action_proc)| {
            let n = ops.len();
            let operations: Vec<Operation> = ops
                .into_iter()
                .enumerate()
                .map(|(i, (kind, width, fields))| match kind {
                    0 => Operation::match_op(format!("o{i}"), [40, 80, 160][width]),
                    1 => Operation::action(format!("o{i}"), fields),
                    _ => Operation::condition(format!("o{i}")),
                })
                .collect();

            let mut edges = Vec::new();
            let mut k = 0;
            for i in 0..n {
                for j in (i + 1)..n {
                    let (present, delay) = edge_mask[k];
                    if present {
                        edges.push(Edge::new(format!("o{i}"), format!("o{j}"), delay));
                    }
                    k += 1;
                }
            }

            let dag = ScheduleDag::new(operations, edges).unwrap();
            let limits = HardwareLimits::new(2, 80, 4, match_proc, action_proc).unwrap();
            ScheduleProblem::new(dag, limits).unwrap()
        })
}
