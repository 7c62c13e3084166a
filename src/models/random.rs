//! Random operation graphs for benchmarking.
//!
//! Edges only go from a lower to a higher index, each present with
//! probability `1 / (ceil((n - 1) / 2c) + 1)` for roughly `c` edges per
//! operation. An operation with successors is a condition, match or action
//! (24 / 38 / 38 %); a leaf is a match or action (50 / 50 %), so every
//! condition guards something. Key widths are `80 · min(G, 8)` bits and
//! field counts `min(G, 32)`, with `G ≥ 1` geometric.

use rand::{Rng, RngCore};
use rand_distr::{Distribution, Geometric};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{DagBuilder, DependencyType, LatencySpec, Operation, OperationKind, ScheduleDag};
use crate::error::{Result, ScheduleError};

/// Bits per key-width step.
const KEY_WIDTH_STEP: u32 = 80;

/// Generator of random, acyclic operation graphs.
///
/// # Example
/// ```
/// use pipeline_schedule::models::RandomDagGenerator;
/// use rand::rngs::SmallRng;
/// use rand::SeedableRng;
///
/// let mut rng = SmallRng::seed_from_u64(1);
/// let dag = RandomDagGenerator::default().generate(12, &mut rng).unwrap();
/// assert_eq!(dag.len(), 12);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomDagGenerator {
    /// Latencies that set each edge's delay from its source kind.
    pub latency: LatencySpec,
    /// Target mean out-degree.
    pub edges_per_operation: u32,
    /// Success probability of the key-width draw.
    pub key_width_p: f64,
    /// Widest key, in 80-bit steps.
    pub max_key_steps: u32,
    /// Success probability of the field-count draw.
    pub fields_p: f64,
    /// Largest field count.
    pub max_fields: u32,
    /// Probability that an operation with successors is a condition.
    pub condition_p: f64,
}

impl Default for RandomDagGenerator {
    fn default() -> Self {
        Self {
            latency: LatencySpec::new(22, 2, 0),
            edges_per_operation: 5,
            key_width_p: 0.75,
            max_key_steps: 8,
            fields_p: 0.25,
            max_fields: 32,
            condition_p: 0.24,
        }
    }
}

impl RandomDagGenerator {
    /// Sets the latencies.
    pub fn with_latency(mut self, latency: LatencySpec) -> Self {
        self.latency = latency;
        self
    }

    /// Sets the target mean out-degree.
    pub fn with_edges_per_operation(mut self, edges: u32) -> Self {
        self.edges_per_operation = edges;
        self
    }

    /// Sets the key-width draw's success probability.
    pub fn with_key_width_p(mut self, p: f64) -> Self {
        self.key_width_p = p;
        self
    }

    /// Sets the field-count draw's success probability.
    pub fn with_fields_p(mut self, p: f64) -> Self {
        self.fields_p = p;
        self
    }

    /// Sets the condition probability of non-leaf operations.
    pub fn with_condition_p(mut self, p: f64) -> Self {
        self.condition_p = p;
        self
    }

    /// Generates a graph of `n` operations.
    ///
    /// # Errors
    /// [`ScheduleError::InvalidDistribution`] if a probability is outside
    /// `[0, 1]`.
    pub fn generate(&self, n: usize, rng: &mut dyn RngCore) -> Result<ScheduleDag> {
        let key_steps = geometric("key width", self.key_width_p)?;
        let field_count = geometric("field count", self.fields_p)?;
        if !(0.0..=1.0).contains(&self.condition_p) {
            return Err(ScheduleError::InvalidDistribution {
                name: "condition",
                reason: format!("probability {} is outside [0, 1]", self.condition_p),
            });
        }

        // (n² - n) / 2 candidate pairs for about c·n edges.
        let odds = if n < 2 {
            0
        } else {
            (n - 1).div_ceil(2 * self.edges_per_operation.max(1) as usize)
        };
        let mut successors: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (i, succ) in successors.iter_mut().enumerate() {
            for j in (i + 1)..n {
                if rng.random_range(0..=odds) == 0 {
                    succ.push(j);
                }
            }
        }

        let mut kinds = Vec::with_capacity(n);
        for succ in &successors {
            let kind = if !succ.is_empty() && rng.random_bool(self.condition_p) {
                OperationKind::Condition
            } else if rng.random_bool(0.5) {
                OperationKind::Match
            } else {
                OperationKind::Action
            };
            kinds.push(kind);
        }

        let id = |i: usize| match kinds[i] {
            OperationKind::Match => format!("m{i}"),
            OperationKind::Action => format!("a{i}"),
            OperationKind::Condition => format!("c{i}"),
        };

        let mut builder = DagBuilder::new().with_latency(self.latency);
        for (i, &kind) in kinds.iter().enumerate() {
            let op = match kind {
                OperationKind::Match => {
                    let steps = capped(key_steps.sample(rng), self.max_key_steps);
                    Operation::match_op(id(i), KEY_WIDTH_STEP * steps)
                }
                OperationKind::Action => {
                    Operation::action(id(i), capped(field_count.sample(rng), self.max_fields))
                }
                OperationKind::Condition => Operation::condition(id(i)),
            };
            builder = builder.with_operation(op);
        }
        for (i, succ) in successors.iter().enumerate() {
            let dep_type = match kinds[i] {
                OperationKind::Match => DependencyType::Action,
                OperationKind::Action => DependencyType::Match,
                OperationKind::Condition => DependencyType::Successor,
            };
            for &j in succ {
                builder = builder.with_dependency(id(i), id(j), dep_type);
            }
        }

        let dag = builder.build()?;
        debug!(operations = n, edges = dag.edges().len(), "random DAG generated");
        Ok(dag)
    }
}

fn geometric(name: &'static str, p: f64) -> Result<Geometric> {
    Geometric::new(p).map_err(|e| ScheduleError::InvalidDistribution {
        name,
        reason: e.to_string(),
    })
}

/// Failures-before-success draw shifted to `≥ 1`, capped at `max`.
fn capped(failures: u64, max: u32) -> u32 {
    failures.saturating_add(1).min(u64::from(max.max(1))) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn generate(n: usize, seed: u64) -> ScheduleDag {
        let mut rng = SmallRng::seed_from_u64(seed);
        RandomDagGenerator::default().generate(n, &mut rng).unwrap()
    }

    #[test]
    fn test_defaults() {
        let generator = RandomDagGenerator::default();
        assert_eq!(generator.latency, LatencySpec::new(22, 2, 0));
        assert_eq!(generator.edges_per_operation, 5);
        assert_eq!(generator.max_key_steps, 8);
        assert_eq!(generator.max_fields, 32);
    }

    #[test]
    fn test_empty_and_single() {
        assert!(generate(0, 1).is_empty());

        let dag = generate(1, 1);
        assert_eq!(dag.len(), 1);
        assert!(dag.edges().is_empty());
        assert!(!dag.operation(0).is_condition());
    }

    #[test]
    fn test_seeded_generation_reproducible() {
        let a = generate(20, 3);
        let b = generate(20, 3);
        assert_eq!(a.operations(), b.operations());
        assert_eq!(a.edges(), b.edges());
    }

    #[test]
    fn test_small_graph_density() {
        // n = 11: every pair is an edge with probability 1/2.
        let dag = generate(11, 5);
        assert!((10..=45).contains(&dag.edges().len()), "{}", dag.edges().len());
    }

    #[test]
    fn test_capped_draws() {
        assert_eq!(capped(0, 8), 1);
        assert_eq!(capped(6, 8), 7);
        assert_eq!(capped(40, 8), 8);
        assert_eq!(capped(u64::MAX, 32), 32);
        assert_eq!(capped(3, 0), 1);
    }

    #[test]
    fn test_invalid_probability_rejected() {
        let mut rng = SmallRng::seed_from_u64(1);
        let err = RandomDagGenerator::default()
            .with_key_width_p(1.5)
            .generate(5, &mut rng)
            .unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::InvalidDistribution { name: "key width", .. }
        ));

        let err = RandomDagGenerator::default()
            .with_condition_p(f64::NAN)
            .generate(5, &mut rng)
            .unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::InvalidDistribution { name: "condition", .. }
        ));
    }

    #[test]
    fn test_json_partial() {
        let generator: RandomDagGenerator =
            serde_json::from_str(r#"{"edges_per_operation": 2}"#).unwrap();
        assert_eq!(generator.edges_per_operation, 2);
        assert_eq!(generator.key_width_p, 0.75);
    }

    proptest! {
        #[test]
        fn prop_generated_graphs_are_well_formed(n in 0usize..40, seed in any::<u64>()) {
            let latency = LatencySpec::new(3, 2, 1);
            let mut rng = SmallRng::seed_from_u64(seed);
            let dag = RandomDagGenerator::default()
                .with_latency(latency)
                .generate(n, &mut rng)
                .unwrap();
            prop_assert_eq!(dag.len(), n);

            for (idx, op) in dag.operations().iter().enumerate() {
                match op.kind {
                    OperationKind::Match => {
                        prop_assert_eq!(op.key_width % KEY_WIDTH_STEP, 0);
                        prop_assert!((80..=640).contains(&op.key_width));
                    }
                    OperationKind::Action => {
                        prop_assert!((1..=32).contains(&op.num_fields));
                    }
                    OperationKind::Condition => {
                        prop_assert!(!dag.successors(idx).is_empty());
                    }
                }
            }
            for e in dag.edges() {
                let kind = dag.get(&e.from).unwrap().kind;
                prop_assert_eq!(e.delay, latency.delay_after(kind));
            }
        }
    }
}
