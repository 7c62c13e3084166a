//! Solver-free scheduling and schedule diagnostics.
//!
//! # Greedy
//!
//! `GreedyListScheduler` packs ready operations into alternating match and
//! action rounds. It is randomized and cheap, so callers sample many runs
//! (`best_of`) and keep the one with the fewest rounds.
//!
//! # Usage
//!
//! `ResourceUsage` folds an assignment onto the slots of a period and
//! reports key width, match units, action fields and generation counts per
//! slot.
//!
//! # References
//!
//! - Graham (1969), "Bounds on Multiprocessing Timing Anomalies"
//! - Rau (1994), "Iterative Modulo Scheduling"

mod greedy;
mod usage;

pub use greedy::{GreedyListScheduler, GreedyResult, GreedySampling};
pub use usage::{ResourceUsage, SlotUsage};
