//! Resource-constrained project scheduling engine.
//!
//! Turns a task dependency graph, a resource pool, and business constraints
//! (sprints, milestones, working calendar) into a concrete timetable, a
//! critical path, and a structured conflict report.
//!
//! Pipeline: [`graph::TaskGraph`] validates the dependency graph,
//! [`critical_path`] computes the longest chain, [`scheduler`] places tasks
//! against resources and sprint windows, [`milestones`] resolves milestone
//! dates over the placed schedule, and [`update`] applies incremental
//! adjustments to an existing schedule.
//!
//! The engine is a pure, synchronous computation: every call takes all
//! required state as arguments and returns a new result. Persistence and
//! per-project serialization of calculate/update races belong to the
//! caller.

pub mod calendar;
pub mod conflicts;
pub mod critical_path;
pub mod graph;
mod interner;
pub mod logging;
pub mod milestones;
mod models;
pub mod scheduler;
pub mod update;

pub use calendar::{CalendarError, WorkCalendar};
pub use conflicts::{Conflict, ConflictLog};
pub use critical_path::{longest_path, CriticalPath};
pub use graph::{TaskGraph, ValidationError};
pub use interner::{TaskHandle, TaskIndex};
pub use models::{
    Dependency, DependencyType, Milestone, Resource, ScheduleConstraints, ScheduleResult,
    ScheduleStatus, ScheduledTask, SprintBinding, Task,
};
pub use scheduler::{PlacementEngine, ScheduleError};
pub use update::{TaskAdjustment, UpdateOptions};

use rustc_hash::FxHashMap;

/// Compute a schedule for a project.
///
/// Validates the request, builds the dependency graph, places every task,
/// and resolves milestone dates. Invalid input (empty/duplicate ids,
/// malformed durations or sprint bounds, cycles) fails here with no
/// partial work; infeasibility is reported inside the result instead.
pub fn calculate_schedule(
    tasks: &[Task],
    resources: &[Resource],
    constraints: &ScheduleConstraints,
    milestones: Vec<Milestone>,
) -> Result<ScheduleResult, ScheduleError> {
    scheduler::validate_constraints(constraints)?;
    scheduler::validate_hours(tasks, constraints)?;
    let graph = TaskGraph::build(tasks)?;
    let engine = PlacementEngine::new(&graph, tasks, resources, constraints);
    let outcome = engine.place()?;
    Ok(scheduler::assemble_result(
        &graph, outcome, milestones, constraints,
    ))
}

/// Apply manual adjustments to an existing schedule, producing a new
/// version.
///
/// The prior result is read-only; see [`update::apply_adjustments`] for
/// the repair semantics of the two option flags.
pub fn update_schedule(
    schedule: &ScheduleResult,
    tasks: &[Task],
    resources: &[Resource],
    adjustments: &FxHashMap<String, TaskAdjustment>,
    options: &UpdateOptions,
    constraints: &ScheduleConstraints,
) -> Result<ScheduleResult, ScheduleError> {
    update::apply_adjustments(schedule, tasks, resources, adjustments, options, constraints)
}
