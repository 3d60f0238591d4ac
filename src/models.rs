//! Core data types for the scheduling system.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::conflicts::Conflict;

/// How a dependency anchors a successor to its predecessor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyType {
    FinishToStart,
    StartToStart,
    FinishToFinish,
    StartToFinish,
}

impl FromStr for DependencyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "finish_to_start" => Ok(DependencyType::FinishToStart),
            "start_to_start" => Ok(DependencyType::StartToStart),
            "finish_to_finish" => Ok(DependencyType::FinishToFinish),
            "start_to_finish" => Ok(DependencyType::StartToFinish),
            other => Err(format!("unknown dependency type: {other:?}")),
        }
    }
}

/// A dependency on a predecessor task with optional lag time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
    pub predecessor_id: String,
    pub kind: DependencyType,
    /// Signed lag in working hours; negative lag allows overlap.
    #[serde(default)]
    pub lag_hours: i64,
}

impl Dependency {
    pub fn new(predecessor_id: impl Into<String>, kind: DependencyType, lag_hours: i64) -> Self {
        Self {
            predecessor_id: predecessor_id.into(),
            kind,
            lag_hours,
        }
    }

    /// The most common dependency form: successor starts after predecessor ends.
    pub fn finish_to_start(predecessor_id: impl Into<String>) -> Self {
        Self::new(predecessor_id, DependencyType::FinishToStart, 0)
    }
}

/// Sprint attachment for a task.
///
/// Either the task is unbound, or it carries both sprint bounds. The
/// both-or-neither pairing is structural; `start < end` is checked at
/// graph build.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SprintBinding {
    #[default]
    Unbound,
    Bound {
        sprint_id: String,
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
}

/// A task to be scheduled.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    /// Estimated working hours, >= 1.
    pub estimated_hours: i64,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    #[serde(default)]
    pub required_skills: Vec<String>,
    /// Explicit candidate resources; empty means any skill-matching resource.
    #[serde(default)]
    pub resource_ids: Vec<String>,
    #[serde(default)]
    pub sprint: SprintBinding,
}

impl Task {
    pub fn new(id: impl Into<String>, title: impl Into<String>, estimated_hours: i64) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            estimated_hours,
            dependencies: Vec::new(),
            required_skills: Vec::new(),
            resource_ids: Vec::new(),
            sprint: SprintBinding::Unbound,
        }
    }
}

/// A resource that tasks can be assigned to.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    pub name: String,
    /// Concurrent task capacity, >= 1.
    pub capacity: u32,
    #[serde(default)]
    pub skills: Vec<String>,
    /// Informational only; never affects placement.
    #[serde(default)]
    pub is_lead: bool,
}

impl Resource {
    pub fn new(id: impl Into<String>, name: impl Into<String>, capacity: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            capacity,
            skills: Vec::new(),
            is_lead: false,
        }
    }

    /// Check whether this resource covers every required skill.
    pub fn has_skills(&self, required: &[String]) -> bool {
        required.iter().all(|s| self.skills.contains(s))
    }
}

/// Business constraints for a scheduling run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScheduleConstraints {
    pub project_start: NaiveDateTime,
    /// Maximum scheduling window; calendar walks never exceed it.
    pub horizon_days: u32,
    /// Working hours per day, 1..=24. The working window opens at midnight.
    pub working_hours_per_day: u32,
    pub respect_weekends: bool,
    /// Diagnostic verbosity, see `logging`.
    #[serde(default)]
    pub verbosity: u8,
}

impl Default for ScheduleConstraints {
    fn default() -> Self {
        Self {
            project_start: chrono::NaiveDate::default().and_hms_opt(0, 0, 0).unwrap_or_default(),
            horizon_days: 365,
            working_hours_per_day: 8,
            respect_weekends: true,
            verbosity: 0,
        }
    }
}

/// A task that has been placed on the timeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub task_id: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub duration_hours: i64,
    pub resource_ids: Vec<String>,
    pub is_critical: bool,
}

/// A milestone with a caller-maintained dependent-task set.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Milestone {
    pub id: String,
    pub title: String,
    pub target_date: NaiveDateTime,
    pub is_manual_constraint: bool,
    /// Supplied by the caller, not derived from the graph.
    #[serde(default)]
    pub dependent_task_ids: Vec<String>,
    /// Output: computed by the resolver.
    #[serde(default)]
    pub resolved_date: Option<NaiveDateTime>,
}

/// Overall outcome of a scheduling run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    /// Every task placed, no conflicts.
    Success,
    /// Every task placed, but the conflict log is non-empty.
    Feasible,
    /// At least one task could not be placed.
    Infeasible,
}

/// Result of a `calculate` or `update` run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScheduleResult {
    pub status: ScheduleStatus,
    /// Placements in topological placement order.
    pub tasks: Vec<ScheduledTask>,
    pub conflicts: Vec<Conflict>,
    /// Task ids along the longest dependency chain; empty when any task
    /// failed placement.
    pub critical_path: Vec<String>,
    pub milestones: Vec<Milestone>,
    pub project_start: NaiveDateTime,
    pub project_end: NaiveDateTime,
}

impl ScheduleResult {
    /// Look up a placement by task id.
    pub fn placement(&self, task_id: &str) -> Option<&ScheduledTask> {
        self.tasks.iter().find(|t| t.task_id == task_id)
    }
}
