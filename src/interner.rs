//! Dense task handles for graph algorithms.
//!
//! Maps string task ids to dense `u32` handles so the topological sort and
//! longest-path passes can index plain vectors instead of hashing strings.
//! The index is built once per scheduling request; the task set never grows
//! mid-run.

use rustc_hash::FxHashMap;

/// Dense task handle (u32 for compact storage and fast hashing).
pub type TaskHandle = u32;

/// Build-once map between task id strings and dense handles.
#[derive(Debug, Clone, Default)]
pub struct TaskIndex {
    handles: FxHashMap<String, TaskHandle>,
    ids: Vec<String>,
}

impl TaskIndex {
    /// Build an index over the given ids, in order. Handles are assigned
    /// 0..n following iteration order, so handle order matches input order.
    pub fn new<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let ids: Vec<String> = ids.into_iter().collect();
        let handles = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i as TaskHandle))
            .collect();
        Self { handles, ids }
    }

    /// Get the handle for a task id, if it exists.
    #[inline]
    pub fn handle(&self, id: &str) -> Option<TaskHandle> {
        self.handles.get(id).copied()
    }

    /// Get the task id for a handle.
    ///
    /// Handles produced by this index are always resolvable; an out-of-range
    /// handle is a caller bug and yields `None`.
    #[inline]
    pub fn resolve(&self, handle: TaskHandle) -> Option<&str> {
        self.ids.get(handle as usize).map(|s| s.as_str())
    }

    /// Number of indexed tasks.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Iterate over all handles in assignment order.
    pub fn handles(&self) -> impl Iterator<Item = TaskHandle> {
        0..self.ids.len() as TaskHandle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_follow_input_order() {
        let index = TaskIndex::new(["b".to_string(), "a".to_string(), "c".to_string()]);

        assert_eq!(index.handle("b"), Some(0));
        assert_eq!(index.handle("a"), Some(1));
        assert_eq!(index.handle("c"), Some(2));
        assert_eq!(index.handle("missing"), None);

        assert_eq!(index.resolve(0), Some("b"));
        assert_eq!(index.resolve(2), Some("c"));
        assert_eq!(index.resolve(99), None);
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_empty_index() {
        let index = TaskIndex::new(Vec::new());
        assert!(index.is_empty());
        assert_eq!(index.handles().count(), 0);
    }
}
