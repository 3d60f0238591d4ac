//! Incremental schedule adjustment.
//!
//! Applies manual start/end overrides to an existing schedule and
//! optionally repairs dependency violations, producing a new schedule
//! version. The prior result is never mutated; storage and serialization
//! of versions belong to the caller.

use chrono::NaiveDateTime;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::calendar::WorkCalendar;
use crate::conflicts::{Conflict, ConflictLog};
use crate::graph::{TaskGraph, ValidationError};
use crate::interner::TaskHandle;
use crate::log_decision;
use crate::models::{
    Resource, ScheduleConstraints, ScheduleResult, ScheduledTask, SprintBinding, Task,
};
use crate::scheduler::{
    assemble_result, dependency_start_bound, select_resource, validate_constraints, validate_hours,
    PlacementOutcome, ResourceLoad, ScheduleError,
};

/// Manual override for one task's placement.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TaskAdjustment {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

/// Repair behavior after manual adjustments.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct UpdateOptions {
    /// Shift tasks whose dependency bounds the adjustments violated.
    pub preserve_dependencies: bool,
    /// Re-place every transitive successor of an adjusted task.
    pub recalculate_downstream: bool,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            preserve_dependencies: true,
            recalculate_downstream: true,
        }
    }
}

/// Apply adjustments to an existing schedule, producing a new version.
///
/// `tasks` and `resources` must be the sets the schedule was calculated
/// from; they supply durations, dependencies, sprint bindings, and
/// capacities. A moved task keeps its prior resource while that resource
/// still has room at the new start; otherwise a replacement is selected
/// with the normal placement rules.
pub fn apply_adjustments(
    schedule: &ScheduleResult,
    tasks: &[Task],
    resources: &[Resource],
    adjustments: &FxHashMap<String, TaskAdjustment>,
    options: &UpdateOptions,
    constraints: &ScheduleConstraints,
) -> Result<ScheduleResult, ScheduleError> {
    validate_constraints(constraints)?;
    validate_hours(tasks, constraints)?;
    let graph = TaskGraph::build(tasks)?;
    let calendar = WorkCalendar::new(constraints);
    let verbosity = constraints.verbosity;

    // Seed working placements from the prior version
    let mut placements: Vec<Option<ScheduledTask>> = vec![None; graph.len()];
    for placed in &schedule.tasks {
        if let Some(handle) = graph.index().handle(&placed.task_id) {
            let mut placed = placed.clone();
            placed.is_critical = false;
            placements[handle as usize] = Some(placed);
        }
    }

    // Overlay manual overrides
    let mut adjusted: FxHashSet<TaskHandle> = FxHashSet::default();
    for (task_id, adjustment) in adjustments {
        let handle = graph
            .index()
            .handle(task_id)
            .ok_or_else(|| ValidationError::UnknownAdjustedTask(task_id.clone()))?;
        if adjustment.start.is_none() && adjustment.end.is_none() {
            continue;
        }
        let duration = graph.duration_hours(handle);
        let (start, end) = match (adjustment.start, adjustment.end) {
            (Some(start), Some(end)) => (start, end),
            (Some(start), None) => {
                let start = calendar.align_forward(start)?;
                (start, calendar.add_hours(start, duration)?)
            }
            (None, Some(end)) => (calendar.sub_hours(end, duration)?, end),
            (None, None) => continue,
        };
        log_decision!(verbosity, "adjusted task {} to {} .. {}", task_id, start, end);

        let resource_ids = placements[handle as usize]
            .as_ref()
            .map(|p| p.resource_ids.clone())
            .unwrap_or_default();
        placements[handle as usize] = Some(ScheduledTask {
            task_id: task_id.clone(),
            start,
            end,
            duration_hours: duration,
            resource_ids,
            is_critical: false,
        });
        adjusted.insert(handle);
    }

    let mut conflicts = ConflictLog::new();
    let mut moved = adjusted.clone();
    if options.preserve_dependencies || options.recalculate_downstream {
        let downstream = graph.descendants(&adjusted);
        for &handle in graph.topo_order() {
            if adjusted.contains(&handle) {
                continue;
            }
            let eligible = if options.recalculate_downstream {
                downstream.contains(&handle)
            } else {
                // Preserve-only: repair direct successors of adjusted tasks
                graph
                    .predecessors(handle)
                    .iter()
                    .any(|e| adjusted.contains(&e.predecessor))
            };
            if !eligible {
                continue;
            }
            if repair_placement(
                &graph,
                &calendar,
                &tasks[handle as usize],
                handle,
                constraints,
                options,
                &mut placements,
                &mut conflicts,
            )? {
                moved.insert(handle);
            }
        }
    }

    reassign_resources(
        &graph,
        tasks,
        resources,
        &moved,
        &mut placements,
        &mut conflicts,
        verbosity,
    );

    let outcome = PlacementOutcome {
        placements,
        conflicts,
    };
    Ok(assemble_result(
        &graph,
        outcome,
        schedule.milestones.clone(),
        constraints,
    ))
}

/// Recompute one task's placement against the current state. Returns
/// whether the placement changed.
///
/// Preserve-only mode shifts forward by the minimum needed; downstream
/// recalculation re-derives the start from the placement rules, which may
/// also pull a task earlier.
#[allow(clippy::too_many_arguments)]
fn repair_placement(
    graph: &TaskGraph,
    calendar: &WorkCalendar,
    task: &Task,
    handle: TaskHandle,
    constraints: &ScheduleConstraints,
    options: &UpdateOptions,
    placements: &mut [Option<ScheduledTask>],
    conflicts: &mut ConflictLog,
) -> Result<bool, ScheduleError> {
    let Some(current) = placements[handle as usize].clone() else {
        // Never placed in the prior version; nothing to repair
        return Ok(false);
    };

    let mut required = constraints.project_start;
    for edge in graph.predecessors(handle) {
        let Some(pred) = &placements[edge.predecessor as usize] else {
            conflicts.record(Conflict::UnscheduledDependency {
                task_id: task.id.clone(),
                predecessor_id: graph
                    .index()
                    .resolve(edge.predecessor)
                    .unwrap_or_default()
                    .to_string(),
            });
            placements[handle as usize] = None;
            return Ok(false);
        };
        let bound =
            dependency_start_bound(calendar, edge, pred.start, pred.end, task.estimated_hours)?;
        required = required.max(bound);
    }
    if let SprintBinding::Bound { start, .. } = &task.sprint {
        required = required.max(*start);
    }

    let target = if options.recalculate_downstream {
        required
    } else {
        // Minimum forward shift only
        required.max(current.start)
    };
    let start = calendar.align_forward(target)?;
    if start == current.start {
        return Ok(false);
    }

    let end = calendar.add_hours(start, task.estimated_hours)?;
    if let SprintBinding::Bound {
        sprint_id,
        end: sprint_end,
        ..
    } = &task.sprint
    {
        if end > *sprint_end {
            conflicts.record(Conflict::SprintCapacityExceeded {
                task_id: task.id.clone(),
                sprint_id: sprint_id.clone(),
            });
            placements[handle as usize] = None;
            return Ok(false);
        }
    }

    log_decision!(
        constraints.verbosity,
        "shifted task {} from {} to {}",
        task.id,
        current.start,
        start
    );
    placements[handle as usize] = Some(ScheduledTask {
        start,
        end,
        ..current
    });
    Ok(true)
}

/// Re-check resource capacity for every placement this update moved.
///
/// Unmoved placements keep their assignments and register their load
/// first, so moved tasks compete for the capacity that actually remains.
/// A moved task without a resource loses its placement and records an
/// overallocation conflict, as in initial placement.
fn reassign_resources(
    graph: &TaskGraph,
    tasks: &[Task],
    resources: &[Resource],
    moved: &FxHashSet<TaskHandle>,
    placements: &mut [Option<ScheduledTask>],
    conflicts: &mut ConflictLog,
    verbosity: u8,
) {
    let mut loads: Vec<ResourceLoad> = resources.iter().map(ResourceLoad::new).collect();
    for &handle in graph.topo_order() {
        if moved.contains(&handle) {
            continue;
        }
        if let Some(placed) = &placements[handle as usize] {
            for resource_id in &placed.resource_ids {
                if let Some(idx) = resources.iter().position(|r| &r.id == resource_id) {
                    loads[idx].assign(placed.start, placed.end);
                }
            }
        }
    }

    for &handle in graph.topo_order() {
        if !moved.contains(&handle) {
            continue;
        }
        let Some(placed) = placements[handle as usize].clone() else {
            continue;
        };
        let task = &tasks[handle as usize];
        let retained = placed
            .resource_ids
            .first()
            .and_then(|id| resources.iter().position(|r| &r.id == id));
        let choice = match retained {
            Some(idx) if loads[idx].has_capacity_at(placed.start) => Some(idx),
            _ => select_resource(resources, &loads, task, placed.start, verbosity),
        };
        match choice {
            Some(idx) => {
                loads[idx].assign(placed.start, placed.end);
                if let Some(placement) = placements[handle as usize].as_mut() {
                    placement.resource_ids = vec![resources[idx].id.clone()];
                }
            }
            None => {
                log_decision!(
                    verbosity,
                    "no resource for moved task {} at {}, recording overallocation",
                    task.id,
                    placed.start
                );
                conflicts.record(Conflict::ResourceOverallocation {
                    task_id: task.id.clone(),
                });
                placements[handle as usize] = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Dependency, Resource, ScheduleStatus};
    use crate::scheduler::PlacementEngine;
    use chrono::NaiveDate;

    fn dt(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn unlimited_constraints() -> ScheduleConstraints {
        ScheduleConstraints {
            project_start: dt(3, 0),
            horizon_days: 60,
            working_hours_per_day: 24,
            respect_weekends: false,
            verbosity: 0,
        }
    }

    fn make_task(id: &str, hours: i64, deps: Vec<&str>) -> Task {
        let mut task = Task::new(id, id.to_uppercase(), hours);
        task.dependencies = deps.into_iter().map(Dependency::finish_to_start).collect();
        task
    }

    fn dev_pool() -> Vec<Resource> {
        vec![Resource::new("r1", "Dev", 10)]
    }

    fn calculate(
        tasks: &[Task],
        resources: &[Resource],
        constraints: &ScheduleConstraints,
    ) -> ScheduleResult {
        let graph = TaskGraph::build(tasks).unwrap();
        let engine = PlacementEngine::new(&graph, tasks, resources, constraints);
        let outcome = engine.place().unwrap();
        assemble_result(&graph, outcome, Vec::new(), constraints)
    }

    fn adjust_start(task_id: &str, start: NaiveDateTime) -> FxHashMap<String, TaskAdjustment> {
        let mut map = FxHashMap::default();
        map.insert(
            task_id.to_string(),
            TaskAdjustment {
                start: Some(start),
                end: None,
            },
        );
        map
    }

    #[test]
    fn test_start_only_adjustment_recomputes_end() {
        let tasks = vec![make_task("a", 8, vec![])];
        let constraints = unlimited_constraints();
        let resources = dev_pool();
        let schedule = calculate(&tasks, &resources, &constraints);

        let updated = apply_adjustments(
            &schedule,
            &tasks,
            &resources,
            &adjust_start("a", dt(5, 0)),
            &UpdateOptions::default(),
            &constraints,
        )
        .unwrap();

        let placed = updated.placement("a").unwrap();
        assert_eq!(placed.start, dt(5, 0));
        assert_eq!(placed.end, dt(5, 8));
    }

    #[test]
    fn test_prior_version_not_mutated() {
        let tasks = vec![make_task("a", 8, vec![])];
        let constraints = unlimited_constraints();
        let resources = dev_pool();
        let schedule = calculate(&tasks, &resources, &constraints);
        let original_start = schedule.placement("a").unwrap().start;

        let _updated = apply_adjustments(
            &schedule,
            &tasks,
            &resources,
            &adjust_start("a", dt(5, 0)),
            &UpdateOptions::default(),
            &constraints,
        )
        .unwrap();

        assert_eq!(schedule.placement("a").unwrap().start, original_start);
    }

    #[test]
    fn test_preserve_dependencies_shifts_successor() {
        let tasks = vec![make_task("a", 8, vec![]), make_task("b", 8, vec!["a"])];
        let constraints = unlimited_constraints();
        let resources = dev_pool();
        let schedule = calculate(&tasks, &resources, &constraints);
        assert_eq!(schedule.placement("b").unwrap().start, dt(3, 8));

        let updated = apply_adjustments(
            &schedule,
            &tasks,
            &resources,
            &adjust_start("a", dt(5, 0)),
            &UpdateOptions {
                preserve_dependencies: true,
                recalculate_downstream: false,
            },
            &constraints,
        )
        .unwrap();

        // a now ends at day 5 hour 8; b shifts forward by the minimum
        assert_eq!(updated.placement("b").unwrap().start, dt(5, 8));
    }

    #[test]
    fn test_no_repair_when_dependencies_disabled() {
        let tasks = vec![make_task("a", 8, vec![]), make_task("b", 8, vec!["a"])];
        let constraints = unlimited_constraints();
        let resources = dev_pool();
        let schedule = calculate(&tasks, &resources, &constraints);

        let updated = apply_adjustments(
            &schedule,
            &tasks,
            &resources,
            &adjust_start("a", dt(5, 0)),
            &UpdateOptions {
                preserve_dependencies: false,
                recalculate_downstream: false,
            },
            &constraints,
        )
        .unwrap();

        // b keeps its now-violated placement; the caller asked for raw overrides
        assert_eq!(updated.placement("b").unwrap().start, dt(3, 8));
    }

    #[test]
    fn test_downstream_recalculation_propagates_transitively() {
        let tasks = vec![
            make_task("a", 8, vec![]),
            make_task("b", 8, vec!["a"]),
            make_task("c", 8, vec!["b"]),
        ];
        let constraints = unlimited_constraints();
        let resources = dev_pool();
        let schedule = calculate(&tasks, &resources, &constraints);

        let updated = apply_adjustments(
            &schedule,
            &tasks,
            &resources,
            &adjust_start("a", dt(5, 0)),
            &UpdateOptions::default(),
            &constraints,
        )
        .unwrap();

        assert_eq!(updated.placement("b").unwrap().start, dt(5, 8));
        assert_eq!(updated.placement("c").unwrap().start, dt(5, 16));
        assert_eq!(updated.status, ScheduleStatus::Success);
        assert_eq!(updated.critical_path, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_downstream_recalculation_can_pull_earlier() {
        let tasks = vec![make_task("a", 8, vec![]), make_task("b", 8, vec!["a"])];
        let constraints = unlimited_constraints();
        let resources = dev_pool();
        let schedule = calculate(&tasks, &resources, &constraints);

        // First push a late, then pull it back: b follows both ways
        let pushed = apply_adjustments(
            &schedule,
            &tasks,
            &resources,
            &adjust_start("a", dt(10, 0)),
            &UpdateOptions::default(),
            &constraints,
        )
        .unwrap();
        assert_eq!(pushed.placement("b").unwrap().start, dt(10, 8));

        let pulled = apply_adjustments(
            &pushed,
            &tasks,
            &resources,
            &adjust_start("a", dt(4, 0)),
            &UpdateOptions::default(),
            &constraints,
        )
        .unwrap();
        assert_eq!(pulled.placement("b").unwrap().start, dt(4, 8));
    }

    #[test]
    fn test_shift_into_sprint_overflow_conflicts() {
        let mut b = make_task("b", 8, vec!["a"]);
        b.sprint = SprintBinding::Bound {
            sprint_id: "s1".to_string(),
            start: dt(3, 0),
            end: dt(4, 0),
        };
        let tasks = vec![make_task("a", 8, vec![]), b];
        let constraints = unlimited_constraints();
        let resources = dev_pool();
        let schedule = calculate(&tasks, &resources, &constraints);
        assert_eq!(schedule.status, ScheduleStatus::Success);

        let updated = apply_adjustments(
            &schedule,
            &tasks,
            &resources,
            &adjust_start("a", dt(6, 0)),
            &UpdateOptions::default(),
            &constraints,
        )
        .unwrap();

        assert_eq!(updated.status, ScheduleStatus::Infeasible);
        assert_eq!(
            updated.conflicts,
            vec![Conflict::SprintCapacityExceeded {
                task_id: "b".to_string(),
                sprint_id: "s1".to_string()
            }]
        );
        assert!(updated.placement("b").is_none());
    }

    #[test]
    fn test_end_only_adjustment_backs_off_start() {
        let tasks = vec![make_task("a", 8, vec![])];
        let constraints = unlimited_constraints();
        let resources = dev_pool();
        let schedule = calculate(&tasks, &resources, &constraints);

        let mut map = FxHashMap::default();
        map.insert(
            "a".to_string(),
            TaskAdjustment {
                start: None,
                end: Some(dt(6, 8)),
            },
        );
        let updated = apply_adjustments(
            &schedule,
            &tasks,
            &resources,
            &map,
            &UpdateOptions::default(),
            &constraints,
        )
        .unwrap();

        let placed = updated.placement("a").unwrap();
        assert_eq!(placed.start, dt(6, 0));
        assert_eq!(placed.end, dt(6, 8));
    }

    #[test]
    fn test_unknown_adjusted_task_rejected() {
        let tasks = vec![make_task("a", 8, vec![])];
        let constraints = unlimited_constraints();
        let resources = dev_pool();
        let schedule = calculate(&tasks, &resources, &constraints);

        let err = apply_adjustments(
            &schedule,
            &tasks,
            &resources,
            &adjust_start("ghost", dt(5, 0)),
            &UpdateOptions::default(),
            &constraints,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::InvalidInput(ValidationError::UnknownAdjustedTask(_))
        ));
    }

    #[test]
    fn test_adjustment_onto_busy_resource_conflicts() {
        let tasks = vec![make_task("a", 8, vec![]), make_task("b", 8, vec!["a"])];
        let constraints = unlimited_constraints();
        let resources = vec![Resource::new("r1", "Dev", 1)];
        let schedule = calculate(&tasks, &resources, &constraints);
        assert_eq!(schedule.status, ScheduleStatus::Success);

        // Move b on top of a's window: the only resource is already full
        let updated = apply_adjustments(
            &schedule,
            &tasks,
            &resources,
            &adjust_start("b", dt(3, 0)),
            &UpdateOptions::default(),
            &constraints,
        )
        .unwrap();

        assert_eq!(updated.status, ScheduleStatus::Infeasible);
        assert_eq!(
            updated.conflicts,
            vec![Conflict::ResourceOverallocation {
                task_id: "b".to_string()
            }]
        );
        assert!(updated.placement("b").is_none());
        assert!(updated.placement("a").is_some());
    }

    #[test]
    fn test_moved_task_reselects_free_resource() {
        let tasks = vec![make_task("a", 8, vec![]), make_task("b", 8, vec!["a"])];
        let constraints = unlimited_constraints();
        let resources = vec![
            Resource::new("r1", "Dev One", 1),
            Resource::new("r2", "Dev Two", 1),
        ];
        let schedule = calculate(&tasks, &resources, &constraints);
        assert_eq!(schedule.placement("b").unwrap().resource_ids, vec!["r1"]);

        let updated = apply_adjustments(
            &schedule,
            &tasks,
            &resources,
            &adjust_start("b", dt(3, 0)),
            &UpdateOptions::default(),
            &constraints,
        )
        .unwrap();

        // r1 is busy with a at the new start; b lands on r2 instead
        assert_eq!(updated.placement("b").unwrap().resource_ids, vec!["r2"]);
        assert_eq!(updated.status, ScheduleStatus::Success);
    }

    #[test]
    fn test_resource_assignments_retained() {
        let tasks = vec![make_task("a", 8, vec![])];
        let constraints = unlimited_constraints();
        let resources = dev_pool();
        let schedule = calculate(&tasks, &resources, &constraints);
        let original_resources = schedule.placement("a").unwrap().resource_ids.clone();

        let updated = apply_adjustments(
            &schedule,
            &tasks,
            &resources,
            &adjust_start("a", dt(5, 0)),
            &UpdateOptions::default(),
            &constraints,
        )
        .unwrap();
        assert_eq!(
            updated.placement("a").unwrap().resource_ids,
            original_resources
        );
    }
}
