//! Constrained task placement against resources, sprints, and the working
//! calendar.
//!
//! Tasks are processed in topological order. Placement failures are
//! recorded as conflicts and the run continues; only invalid input aborts
//! a run.

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::calendar::{CalendarError, WorkCalendar};
use crate::conflicts::{Conflict, ConflictLog};
use crate::critical_path::longest_path;
use crate::graph::{DepEdge, TaskGraph, ValidationError};
use crate::interner::TaskHandle;
use crate::milestones::resolve_milestones;
use crate::models::{
    DependencyType, Milestone, Resource, ScheduleConstraints, ScheduleResult, ScheduleStatus,
    ScheduledTask, SprintBinding, Task,
};
use crate::{log_decision, log_trace};

use super::resource_load::ResourceLoad;

/// Hard failures: invalid input or a runaway calendar walk. Infeasibility
/// is reported through conflicts instead.
#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error(transparent)]
    InvalidInput(#[from] ValidationError),
    #[error(transparent)]
    Calendar(#[from] CalendarError),
}

/// Validate request-level constraint bounds before any scheduling work.
pub fn validate_constraints(constraints: &ScheduleConstraints) -> Result<(), ValidationError> {
    if constraints.horizon_days < 1 {
        return Err(ValidationError::InvalidHorizon(constraints.horizon_days));
    }
    if !(1..=24).contains(&constraints.working_hours_per_day) {
        return Err(ValidationError::InvalidWorkingHours(
            constraints.working_hours_per_day,
        ));
    }
    Ok(())
}

/// Reject durations and lags no schedule inside the horizon could hold,
/// before any calendar arithmetic runs on them.
pub fn validate_hours(
    tasks: &[Task],
    constraints: &ScheduleConstraints,
) -> Result<(), ValidationError> {
    let max_hours = i64::from(constraints.horizon_days)
        .saturating_mul(i64::from(constraints.working_hours_per_day));
    for task in tasks {
        if task.estimated_hours > max_hours {
            return Err(ValidationError::DurationExceedsHorizon {
                task_id: task.id.clone(),
                hours: task.estimated_hours,
                horizon_days: constraints.horizon_days,
            });
        }
        for dep in &task.dependencies {
            if dep.lag_hours.saturating_abs() > max_hours {
                return Err(ValidationError::LagExceedsHorizon {
                    task_id: task.id.clone(),
                    lag_hours: dep.lag_hours,
                    horizon_days: constraints.horizon_days,
                });
            }
        }
    }
    Ok(())
}

/// Earliest start implied by one dependency edge, given the predecessor's
/// placed interval.
///
/// Start-anchored types bound the successor's start directly; end-anchored
/// types bound its end, so the duration is backed off through the calendar.
pub(crate) fn dependency_start_bound(
    calendar: &WorkCalendar,
    edge: &DepEdge,
    pred_start: NaiveDateTime,
    pred_end: NaiveDateTime,
    duration_hours: i64,
) -> Result<NaiveDateTime, CalendarError> {
    match edge.kind {
        DependencyType::FinishToStart => calendar.offset_hours(pred_end, edge.lag_hours),
        DependencyType::StartToStart => calendar.offset_hours(pred_start, edge.lag_hours),
        DependencyType::FinishToFinish => {
            let end_bound = calendar.offset_hours(pred_end, edge.lag_hours)?;
            calendar.sub_hours(end_bound, duration_hours)
        }
        DependencyType::StartToFinish => {
            let end_bound = calendar.offset_hours(pred_start, edge.lag_hours)?;
            calendar.sub_hours(end_bound, duration_hours)
        }
    }
}

/// Placements indexed by task handle plus the run's conflict log.
pub struct PlacementOutcome {
    pub placements: Vec<Option<ScheduledTask>>,
    pub conflicts: ConflictLog,
}

/// Placement engine for one scheduling run.
///
/// Invariant: `tasks[handle as usize]` is the task for that handle, because
/// the graph's index assigns handles in task-list order.
pub struct PlacementEngine<'a> {
    graph: &'a TaskGraph,
    tasks: &'a [Task],
    resources: &'a [Resource],
    calendar: WorkCalendar,
    project_start: NaiveDateTime,
    verbosity: u8,
}

impl<'a> PlacementEngine<'a> {
    pub fn new(
        graph: &'a TaskGraph,
        tasks: &'a [Task],
        resources: &'a [Resource],
        constraints: &ScheduleConstraints,
    ) -> Self {
        Self {
            graph,
            tasks,
            resources,
            calendar: WorkCalendar::new(constraints),
            project_start: constraints.project_start,
            verbosity: constraints.verbosity,
        }
    }

    /// Place every task, in topological order.
    pub fn place(&self) -> Result<PlacementOutcome, ScheduleError> {
        let mut placements: Vec<Option<ScheduledTask>> = vec![None; self.graph.len()];
        let mut conflicts = ConflictLog::new();
        let mut loads: Vec<ResourceLoad> =
            self.resources.iter().map(ResourceLoad::new).collect();

        for &handle in self.graph.topo_order() {
            self.place_one(handle, &mut placements, &mut loads, &mut conflicts)?;
        }

        Ok(PlacementOutcome {
            placements,
            conflicts,
        })
    }

    fn place_one(
        &self,
        handle: TaskHandle,
        placements: &mut [Option<ScheduledTask>],
        loads: &mut [ResourceLoad],
        conflicts: &mut ConflictLog,
    ) -> Result<(), ScheduleError> {
        let task = &self.tasks[handle as usize];
        let verbosity = self.verbosity;

        let Some(mut earliest) = self.earliest_start(handle, task, placements, conflicts)? else {
            return Ok(());
        };
        if let SprintBinding::Bound { start, .. } = &task.sprint {
            earliest = earliest.max(*start);
        }
        let start = self.calendar.align_forward(earliest)?;

        let Some(resource_idx) = select_resource(self.resources, loads, task, start, verbosity)
        else {
            log_decision!(
                verbosity,
                "no resource for task {} at {}, recording overallocation",
                task.id,
                start
            );
            conflicts.record(Conflict::ResourceOverallocation {
                task_id: task.id.clone(),
            });
            return Ok(());
        };

        let end = self.calendar.add_hours(start, task.estimated_hours)?;

        if let SprintBinding::Bound {
            sprint_id,
            end: sprint_end,
            ..
        } = &task.sprint
        {
            if end > *sprint_end {
                log_decision!(
                    verbosity,
                    "task {} would end {} past sprint {} end {}",
                    task.id,
                    end,
                    sprint_id,
                    sprint_end
                );
                conflicts.record(Conflict::SprintCapacityExceeded {
                    task_id: task.id.clone(),
                    sprint_id: sprint_id.clone(),
                });
                return Ok(());
            }
        }

        let resource_id = loads[resource_idx].resource_id.clone();
        loads[resource_idx].assign(start, end);
        log_decision!(
            verbosity,
            "placed task {} on {} from {} to {}",
            task.id,
            resource_id,
            start,
            end
        );
        placements[handle as usize] = Some(ScheduledTask {
            task_id: task.id.clone(),
            start,
            end,
            duration_hours: task.estimated_hours,
            resource_ids: vec![resource_id],
            is_critical: false,
        });
        Ok(())
    }

    /// Maximum of the project start and every dependency bound. `None`
    /// means a predecessor is unplaced; the conflict is recorded here.
    fn earliest_start(
        &self,
        handle: TaskHandle,
        task: &Task,
        placements: &[Option<ScheduledTask>],
        conflicts: &mut ConflictLog,
    ) -> Result<Option<NaiveDateTime>, ScheduleError> {
        let mut earliest = self.project_start;
        for edge in self.graph.predecessors(handle) {
            let Some(pred) = &placements[edge.predecessor as usize] else {
                let predecessor_id = self
                    .graph
                    .index()
                    .resolve(edge.predecessor)
                    .unwrap_or_default()
                    .to_string();
                conflicts.record(Conflict::UnscheduledDependency {
                    task_id: task.id.clone(),
                    predecessor_id,
                });
                return Ok(None);
            };
            let bound = dependency_start_bound(
                &self.calendar,
                edge,
                pred.start,
                pred.end,
                task.estimated_hours,
            )?;
            earliest = earliest.max(bound);
        }
        Ok(Some(earliest))
    }
}

/// Least-loaded resource covering the task's skills with spare capacity
/// at the start instant. Ties break toward declaration order. Shared by
/// initial placement and the update path's capacity re-check.
pub(crate) fn select_resource(
    resources: &[Resource],
    loads: &[ResourceLoad],
    task: &Task,
    start: NaiveDateTime,
    verbosity: u8,
) -> Option<usize> {
    let mut best: Option<(u32, usize)> = None;
    for (idx, resource) in resources.iter().enumerate() {
        if !task.resource_ids.is_empty() && !task.resource_ids.contains(&resource.id) {
            continue;
        }
        if !resource.has_skills(&task.required_skills) {
            continue;
        }
        let load = loads[idx].load_at(start);
        log_trace!(
            verbosity,
            "  candidate {} for task {}: load {} / capacity {}",
            resource.id,
            task.id,
            load,
            resource.capacity
        );
        if load >= resource.capacity {
            continue;
        }
        // Strict comparison keeps the earliest declared resource on ties
        if best.map_or(true, |(best_load, _)| load < best_load) {
            best = Some((load, idx));
        }
    }
    best.map(|(_, idx)| idx)
}

/// Assemble a `ScheduleResult` from a placement outcome.
pub fn assemble_result(
    graph: &TaskGraph,
    outcome: PlacementOutcome,
    milestones: Vec<Milestone>,
    constraints: &ScheduleConstraints,
) -> ScheduleResult {
    let PlacementOutcome {
        mut placements,
        conflicts,
    } = outcome;

    let all_placed = placements.iter().all(|p| p.is_some());

    // A partially placed schedule reports no critical path rather than one
    // referencing unplaced tasks
    let critical_path = if all_placed {
        longest_path(graph).task_ids
    } else {
        Vec::new()
    };
    for id in &critical_path {
        if let Some(handle) = graph.index().handle(id) {
            if let Some(placement) = placements[handle as usize].as_mut() {
                placement.is_critical = true;
            }
        }
    }

    let tasks: Vec<ScheduledTask> = graph
        .topo_order()
        .iter()
        .filter_map(|&h| placements[h as usize].clone())
        .collect();

    let milestones = resolve_milestones(milestones, &tasks);

    let project_start = tasks
        .iter()
        .map(|t| t.start)
        .min()
        .unwrap_or(constraints.project_start);
    let project_end = tasks
        .iter()
        .map(|t| t.end)
        .max()
        .unwrap_or(constraints.project_start);

    let conflicts = conflicts.into_vec();
    let status = if !all_placed {
        ScheduleStatus::Infeasible
    } else if conflicts.is_empty() {
        ScheduleStatus::Success
    } else {
        ScheduleStatus::Feasible
    };

    ScheduleResult {
        status,
        tasks,
        conflicts,
        critical_path,
        milestones,
        project_start,
        project_end,
    }
}
