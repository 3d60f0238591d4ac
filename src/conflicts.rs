//! Structured scheduling conflicts and the shared conflict log.
//!
//! Conflicts are diagnosable outcomes, not errors: the run completes and
//! reports every conflict alongside every placement that succeeded.

use serde::{Deserialize, Serialize};

/// A structured conflict discovered during scheduling.
///
/// Each variant carries enough context to be user-facing without further
/// lookups.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Conflict {
    /// The dependency graph contains a cycle through these tasks.
    CircularDependency { task_ids: Vec<String> },
    /// The task cannot finish inside its sprint window.
    SprintCapacityExceeded { task_id: String, sprint_id: String },
    /// No resource with the required skills has spare capacity.
    ResourceOverallocation { task_id: String },
    /// A predecessor was never placed, so the task cannot be positioned.
    UnscheduledDependency {
        task_id: String,
        predecessor_id: String,
    },
}

impl Conflict {
    /// Human-readable description for diagnostics.
    pub fn description(&self) -> String {
        match self {
            Conflict::CircularDependency { task_ids } => {
                format!("circular dependency involving tasks {task_ids:?}")
            }
            Conflict::SprintCapacityExceeded { task_id, sprint_id } => {
                format!("task {task_id:?} does not fit inside sprint {sprint_id:?}")
            }
            Conflict::ResourceOverallocation { task_id } => {
                format!("no resource with spare capacity and matching skills for task {task_id:?}")
            }
            Conflict::UnscheduledDependency {
                task_id,
                predecessor_id,
            } => {
                format!("task {task_id:?} depends on unplaced task {predecessor_id:?}")
            }
        }
    }

    /// Task ids this conflict affects.
    pub fn affected_tasks(&self) -> Vec<&str> {
        match self {
            Conflict::CircularDependency { task_ids } => {
                task_ids.iter().map(|s| s.as_str()).collect()
            }
            Conflict::SprintCapacityExceeded { task_id, .. }
            | Conflict::ResourceOverallocation { task_id } => vec![task_id.as_str()],
            Conflict::UnscheduledDependency {
                task_id,
                predecessor_id,
            } => vec![task_id.as_str(), predecessor_id.as_str()],
        }
    }

}

/// Append-only conflict accumulator for a single scheduling run.
///
/// Duplicate entries for the same task/kind are not suppressed; callers see
/// one entry per cause.
#[derive(Debug, Default)]
pub struct ConflictLog {
    entries: Vec<Conflict>,
}

impl ConflictLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, conflict: Conflict) {
        self.entries.push(conflict);
    }

    pub fn entries(&self) -> &[Conflict] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_vec(self) -> Vec<Conflict> {
        self.entries
    }
}
