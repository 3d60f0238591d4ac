//! Critical-path computation over the validated task graph.
//!
//! Forward pass in topological order computes each task's earliest finish;
//! the critical path is reconstructed backward from the global-maximum
//! finish, choosing at each step the predecessor that produced it. Ties
//! break toward the earliest topological position so results are
//! deterministic.

use crate::graph::TaskGraph;
use crate::interner::TaskHandle;

/// The longest dependency chain through the graph.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CriticalPath {
    /// Task ids from chain start to chain end.
    pub task_ids: Vec<String>,
    /// Earliest-finish value of the chain's last task, in working hours.
    pub total_hours: i64,
}

/// Compute earliest-finish values and reconstruct the longest path.
pub fn longest_path(graph: &TaskGraph) -> CriticalPath {
    if graph.is_empty() {
        return CriticalPath::default();
    }

    let n = graph.len();
    let mut earliest_finish = vec![0i64; n];
    let mut best_pred: Vec<Option<TaskHandle>> = vec![None; n];

    for &handle in graph.topo_order() {
        let mut best: Option<(i64, TaskHandle)> = None;
        for edge in graph.predecessors(handle) {
            let candidate = earliest_finish[edge.predecessor as usize] + edge.lag_hours;
            let replace = match best {
                None => true,
                Some((value, pred)) => {
                    candidate > value
                        || (candidate == value
                            && graph.topo_position(edge.predecessor) < graph.topo_position(pred))
                }
            };
            if replace {
                best = Some((candidate, edge.predecessor));
            }
        }

        let idx = handle as usize;
        match best {
            None => {
                earliest_finish[idx] = graph.duration_hours(handle);
            }
            Some((value, pred)) => {
                // A negative lag cannot pull a task before the project start
                earliest_finish[idx] = graph.duration_hours(handle) + value.max(0);
                best_pred[idx] = Some(pred);
            }
        }
    }

    // Chain end: global-maximum earliest finish, ties to earliest topo position
    let mut end: Option<TaskHandle> = None;
    for &handle in graph.topo_order() {
        let replace = match end {
            None => true,
            Some(current) => earliest_finish[handle as usize] > earliest_finish[current as usize],
        };
        if replace {
            end = Some(handle);
        }
    }
    let Some(end) = end else {
        return CriticalPath::default();
    };

    let mut chain: Vec<TaskHandle> = Vec::new();
    let mut cursor = Some(end);
    while let Some(handle) = cursor {
        chain.push(handle);
        cursor = best_pred[handle as usize];
    }
    chain.reverse();

    CriticalPath {
        task_ids: chain
            .into_iter()
            .filter_map(|h| graph.index().resolve(h).map(str::to_string))
            .collect(),
        total_hours: earliest_finish[end as usize],
    }
}
