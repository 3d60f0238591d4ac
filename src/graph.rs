//! Dependency-graph construction and validation.
//!
//! Builds the task graph over dense handles, validates the request-level
//! invariants, and produces a topological order via Kahn's algorithm.
//! Construction is pure; a cycle is a hard error, never a schedule
//! conflict, because placement cannot proceed at all.

use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use thiserror::Error;

use crate::interner::{TaskHandle, TaskIndex};
use crate::models::{DependencyType, SprintBinding, Task};

/// Request-level validation failures. Surfaced to the caller before any
/// placement work happens.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("task id must be non-empty")]
    EmptyTaskId,
    #[error("duplicate task id: {0:?}")]
    DuplicateTaskId(String),
    #[error("task {task_id:?} has estimated_hours {hours}, must be >= 1")]
    InvalidDuration { task_id: String, hours: i64 },
    #[error("task {task_id:?} has estimated_hours {hours} exceeding the {horizon_days}-day horizon")]
    DurationExceedsHorizon {
        task_id: String,
        hours: i64,
        horizon_days: u32,
    },
    #[error("task {task_id:?} has a dependency lag of {lag_hours}h exceeding the {horizon_days}-day horizon")]
    LagExceedsHorizon {
        task_id: String,
        lag_hours: i64,
        horizon_days: u32,
    },
    #[error("task {task_id:?} depends on unknown task {predecessor_id:?}")]
    UnknownPredecessor {
        task_id: String,
        predecessor_id: String,
    },
    #[error("task {task_id:?} has sprint {sprint_id:?} with start not before end")]
    InvalidSprintBounds { task_id: String, sprint_id: String },
    #[error("circular dependency involving tasks {task_ids:?}")]
    CircularDependency { task_ids: Vec<String> },
    #[error("adjustment references unknown task {0:?}")]
    UnknownAdjustedTask(String),
    #[error("working_hours_per_day must be in 1..=24, got {0}")]
    InvalidWorkingHours(u32),
    #[error("horizon_days must be >= 1, got {0}")]
    InvalidHorizon(u32),
}

/// A dependency edge resolved to handles.
#[derive(Clone, Copy, Debug)]
pub struct DepEdge {
    pub predecessor: TaskHandle,
    pub kind: DependencyType,
    pub lag_hours: i64,
}

/// Validated dependency graph with a topological order.
#[derive(Debug)]
pub struct TaskGraph {
    index: TaskIndex,
    durations: Vec<i64>,
    predecessors: Vec<Vec<DepEdge>>,
    successors: Vec<Vec<TaskHandle>>,
    topo_order: Vec<TaskHandle>,
    /// Position of each handle within `topo_order`.
    topo_position: Vec<usize>,
}

impl TaskGraph {
    /// Validate tasks and build the graph.
    pub fn build(tasks: &[Task]) -> Result<Self, ValidationError> {
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        for task in tasks {
            if task.id.is_empty() {
                return Err(ValidationError::EmptyTaskId);
            }
            if !seen.insert(task.id.as_str()) {
                return Err(ValidationError::DuplicateTaskId(task.id.clone()));
            }
            if task.estimated_hours < 1 {
                return Err(ValidationError::InvalidDuration {
                    task_id: task.id.clone(),
                    hours: task.estimated_hours,
                });
            }
            if let SprintBinding::Bound {
                sprint_id,
                start,
                end,
            } = &task.sprint
            {
                if start >= end {
                    return Err(ValidationError::InvalidSprintBounds {
                        task_id: task.id.clone(),
                        sprint_id: sprint_id.clone(),
                    });
                }
            }
        }

        let index = TaskIndex::new(tasks.iter().map(|t| t.id.clone()));
        let n = index.len();
        let mut durations = vec![0i64; n];
        let mut predecessors: Vec<Vec<DepEdge>> = vec![Vec::new(); n];
        let mut successors: Vec<Vec<TaskHandle>> = vec![Vec::new(); n];

        for task in tasks {
            let Some(handle) = index.handle(&task.id) else {
                continue;
            };
            durations[handle as usize] = task.estimated_hours;
            for dep in &task.dependencies {
                let predecessor = index.handle(&dep.predecessor_id).ok_or_else(|| {
                    ValidationError::UnknownPredecessor {
                        task_id: task.id.clone(),
                        predecessor_id: dep.predecessor_id.clone(),
                    }
                })?;
                predecessors[handle as usize].push(DepEdge {
                    predecessor,
                    kind: dep.kind,
                    lag_hours: dep.lag_hours,
                });
                successors[predecessor as usize].push(handle);
            }
        }

        let (topo_order, topo_position) =
            topological_sort(&index, &predecessors, &successors)?;

        Ok(Self {
            index,
            durations,
            predecessors,
            successors,
            topo_order,
            topo_position,
        })
    }

    pub fn index(&self) -> &TaskIndex {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Handles in dependency-respecting order.
    pub fn topo_order(&self) -> &[TaskHandle] {
        &self.topo_order
    }

    /// Position of a handle within the topological order.
    pub fn topo_position(&self, handle: TaskHandle) -> usize {
        self.topo_position[handle as usize]
    }

    pub fn duration_hours(&self, handle: TaskHandle) -> i64 {
        self.durations[handle as usize]
    }

    pub fn predecessors(&self, handle: TaskHandle) -> &[DepEdge] {
        &self.predecessors[handle as usize]
    }

    pub fn successors(&self, handle: TaskHandle) -> &[TaskHandle] {
        &self.successors[handle as usize]
    }

    /// All handles transitively reachable through successor edges from the
    /// seed set. The seeds themselves are not included unless reachable
    /// from another seed.
    pub fn descendants(&self, seeds: &FxHashSet<TaskHandle>) -> FxHashSet<TaskHandle> {
        let mut out: FxHashSet<TaskHandle> = FxHashSet::default();
        let mut queue: VecDeque<TaskHandle> = seeds.iter().copied().collect();
        while let Some(handle) = queue.pop_front() {
            for &succ in self.successors(handle) {
                if out.insert(succ) {
                    queue.push_back(succ);
                }
            }
        }
        out
    }

    /// Whether `to` depends on `from`, directly or transitively.
    pub fn depends_on(&self, to: TaskHandle, from: TaskHandle) -> bool {
        let mut seeds = FxHashSet::default();
        seeds.insert(from);
        self.descendants(&seeds).contains(&to)
    }
}

/// Kahn's algorithm: repeatedly remove zero-indegree nodes. Residual nodes
/// after the queue drains form a cycle.
fn topological_sort(
    index: &TaskIndex,
    predecessors: &[Vec<DepEdge>],
    successors: &[Vec<TaskHandle>],
) -> Result<(Vec<TaskHandle>, Vec<usize>), ValidationError> {
    let n = index.len();
    let mut in_degree: Vec<usize> = predecessors.iter().map(|p| p.len()).collect();

    let mut queue: VecDeque<TaskHandle> = index
        .handles()
        .filter(|&h| in_degree[h as usize] == 0)
        .collect();

    let mut order: Vec<TaskHandle> = Vec::with_capacity(n);
    while let Some(handle) = queue.pop_front() {
        order.push(handle);
        for &succ in &successors[handle as usize] {
            in_degree[succ as usize] -= 1;
            if in_degree[succ as usize] == 0 {
                queue.push_back(succ);
            }
        }
    }

    if order.len() != n {
        let mut task_ids: Vec<String> = index
            .handles()
            .filter(|&h| in_degree[h as usize] > 0)
            .filter_map(|h| index.resolve(h).map(str::to_string))
            .collect();
        task_ids.sort();
        return Err(ValidationError::CircularDependency { task_ids });
    }

    let mut position = vec![0usize; n];
    for (pos, &handle) in order.iter().enumerate() {
        position[handle as usize] = pos;
    }
    Ok((order, position))
}
