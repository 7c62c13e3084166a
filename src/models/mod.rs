//! Scheduling domain models.
//!
//! Provides the data types for periodic pipeline scheduling problems and
//! their solutions.
//!
//! # Domain Mappings
//!
//! | pipeline-schedule | Switch pipeline |
//! |-------------------|-----------------|
//! | Operation | Table lookup / action / branch |
//! | ScheduleDag | Packet program dependency graph |
//! | HardwareLimits | Per-processor match units, action fields, packet slots |
//! | Assignment | Start cycle of each operation |
//! | Period | Cycles between consecutive packet arrivals |

mod dag;
mod hardware;
mod operation;
mod problem;
mod random;
mod schedule;

pub use dag::{DagBuilder, DependencyType, Edge, LatencySpec, ScheduleDag};
pub use hardware::{HardwareLimits, HardwareSpec};
pub use operation::{Operation, OperationKind};
pub use problem::ScheduleProblem;
pub use random::RandomDagGenerator;
pub use schedule::{Assignment, Violation, ViolationType};
