//! Resource-constrained task placement.
//!
//! Places a validated task graph onto the timeline in topological order,
//! honoring dependency bounds, resource skills and capacity, sprint
//! windows, and the working calendar.

mod core;
mod resource_load;

pub use self::core::{
    assemble_result, validate_constraints, validate_hours, PlacementEngine, PlacementOutcome,
    ScheduleError,
};
pub(crate) use self::core::{dependency_start_bound, select_resource};
pub use resource_load::ResourceLoad;
