//! Crate error type.
//!
//! Only fatal problems are errors. Infeasibility and time-limit outcomes
//! are ordinary return values of the solvers and searches.

use thiserror::Error;

use crate::milp::MilpError;
use crate::validation::ValidationError;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ScheduleError>;

/// Fatal configuration or solver-contract errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScheduleError {
    /// A hardware field was not provided.
    #[error("hardware limit `{0}` is missing")]
    MissingHardwareField(&'static str),

    /// A hardware field was provided but is not a positive integer.
    #[error("hardware limit `{field}` must be positive, got {value}")]
    InvalidHardware { field: &'static str, value: u32 },

    /// The dependency graph failed input validation.
    #[error("invalid schedule DAG: {}", format_validation(.0))]
    InvalidDag(Vec<ValidationError>),

    /// An operation needs more of a resource than one slot can ever provide.
    #[error("operation `{op}` needs {demand} {resource} but a slot holds {capacity}")]
    DemandExceedsCapacity {
        op: String,
        resource: &'static str,
        demand: u32,
        capacity: u32,
    },

    /// Period lengths are counted in cycles and must be at least one.
    #[error("period must be at least one cycle")]
    ZeroPeriod,

    /// The MILP backend rejected the model.
    #[error(transparent)]
    Milp(#[from] MilpError),

    /// The backend returned a value that is not a whole cycle.
    #[error("variable `{var}` has non-integral value {value}")]
    NonIntegral { var: String, value: f64 },

    /// A random-generator parameter is out of range.
    #[error("invalid {name} distribution: {reason}")]
    InvalidDistribution { name: &'static str, reason: String },

    /// The objective-derived length disagrees with the recovered start times.
    #[error("schedule length {reported} does not match max start + 1 = {recovered}")]
    LengthMismatch { reported: u32, recovered: u32 },
}

fn format_validation(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}
