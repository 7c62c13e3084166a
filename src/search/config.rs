//! Period search configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::milp::SolverConfig;

/// Period used to start a decrement search when the unbounded model gives
/// no round count.
pub const DEFAULT_FALLBACK_PERIOD: u32 = 20;

/// Which strategies run in each probe.
///
/// With `exact` set the exact periodic model decides every probe and the
/// heuristics only warm-start it; otherwise the first heuristic schedule
/// found decides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategySelection {
    /// Run the randomized sieve.
    pub sieve: bool,
    /// Run PRMT followed by the rotation pass.
    pub rotation: bool,
    /// Run the exact periodic model.
    pub exact: bool,
}

impl StrategySelection {
    /// Sieve, rotation and exact solving.
    pub fn full() -> Self {
        Self {
            sieve: true,
            rotation: true,
            exact: true,
        }
    }

    /// PRMT and rotation only.
    pub fn rotation_only() -> Self {
        Self {
            sieve: false,
            rotation: true,
            exact: false,
        }
    }

    /// Exact solving without warm starts.
    pub fn exact_only() -> Self {
        Self {
            sieve: false,
            rotation: false,
            exact: true,
        }
    }
}

impl Default for StrategySelection {
    fn default() -> Self {
        Self::full()
    }
}

/// Period search configuration.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use pipeline_schedule::search::{SearchConfig, StrategySelection};
///
/// let config = SearchConfig::default()
///     .with_time_limit(Duration::from_secs(10))
///     .with_seed(7)
///     .with_strategies(StrategySelection::rotation_only());
/// assert_eq!(config.fallback_period, 20);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Wall-clock limit of each exact solve.
    pub time_limit: Duration,
    /// Optional node limit of each exact solve.
    pub node_limit: Option<u64>,
    /// Wall-clock budget of each sieve call.
    pub sieve_budget: Duration,
    /// Random orders tried per sieve call.
    pub sieve_attempts: usize,
    /// Seed of the search's random generator.
    pub seed: u64,
    /// Largest period a decrement search may probe. `None` uses the PRMT
    /// schedule length, which rotation always fits.
    pub max_period: Option<u32>,
    /// Decrement start when the unbounded model gives nothing.
    pub fallback_period: u32,
    /// Strategies run per probe.
    pub strategies: StrategySelection,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            time_limit: Duration::from_secs(60),
            node_limit: None,
            sieve_budget: Duration::from_secs(1),
            sieve_attempts: 200,
            seed: 0,
            max_period: None,
            fallback_period: DEFAULT_FALLBACK_PERIOD,
            strategies: StrategySelection::full(),
        }
    }
}

impl SearchConfig {
    /// Sets the exact-solve time limit.
    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = time_limit;
        self
    }

    /// Sets the exact-solve node limit.
    pub fn with_node_limit(mut self, node_limit: u64) -> Self {
        self.node_limit = Some(node_limit);
        self
    }

    /// Sets the sieve budget and attempt cap.
    pub fn with_sieve(mut self, budget: Duration, attempts: usize) -> Self {
        self.sieve_budget = budget;
        self.sieve_attempts = attempts;
        self
    }

    /// Sets the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Caps the decrement search.
    pub fn with_max_period(mut self, max_period: u32) -> Self {
        self.max_period = Some(max_period);
        self
    }

    /// Sets the fallback start period.
    pub fn with_fallback_period(mut self, period: u32) -> Self {
        self.fallback_period = period;
        self
    }

    /// Sets the strategies.
    pub fn with_strategies(mut self, strategies: StrategySelection) -> Self {
        self.strategies = strategies;
        self
    }

    /// Backend configuration for one exact solve.
    pub fn solver_config(&self) -> SolverConfig {
        let config = SolverConfig::default().with_time_limit(self.time_limit);
        match self.node_limit {
            Some(limit) => config.with_node_limit(limit),
            None => config,
        }
    }
}
