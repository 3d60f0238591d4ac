//! Per-resource load tracking with sorted assignment intervals.

use chrono::NaiveDateTime;

use crate::models::Resource;

/// Tracks the assignments of one resource as intervals sorted by start.
///
/// Capacity is a concurrent task count: a resource can hold a new task at
/// an instant while fewer than `capacity` assignments cover that instant.
#[derive(Clone, Debug)]
pub struct ResourceLoad {
    pub resource_id: String,
    capacity: u32,
    /// (start, end) pairs, end exclusive. Invariant: sorted by start.
    assignments: Vec<(NaiveDateTime, NaiveDateTime)>,
}

impl ResourceLoad {
    pub fn new(resource: &Resource) -> Self {
        Self {
            resource_id: resource.id.clone(),
            capacity: resource.capacity.max(1),
            assignments: Vec::new(),
        }
    }

    /// Number of assignments covering the given instant.
    pub fn load_at(&self, instant: NaiveDateTime) -> u32 {
        // Only intervals starting at or before the instant can cover it
        let prefix = self.assignments.partition_point(|(start, _)| *start <= instant);
        self.assignments[..prefix]
            .iter()
            .filter(|(_, end)| *end > instant)
            .count() as u32
    }

    pub fn has_capacity_at(&self, instant: NaiveDateTime) -> bool {
        self.load_at(instant) < self.capacity
    }

    /// Record an assignment, keeping the start-sorted invariant.
    pub fn assign(&mut self, start: NaiveDateTime, end: NaiveDateTime) {
        let idx = self.assignments.partition_point(|(s, _)| *s <= start);
        self.assignments.insert(idx, (start, end));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn load(capacity: u32) -> ResourceLoad {
        ResourceLoad::new(&Resource::new("r1", "Dev One", capacity))
    }

    #[test]
    fn test_empty_has_capacity() {
        let load = load(1);
        assert_eq!(load.load_at(dt(3, 0)), 0);
        assert!(load.has_capacity_at(dt(3, 0)));
    }

    #[test]
    fn test_load_counts_covering_intervals() {
        let mut load = load(2);
        load.assign(dt(3, 0), dt(3, 8));
        load.assign(dt(3, 4), dt(4, 2));

        assert_eq!(load.load_at(dt(3, 2)), 1);
        assert_eq!(load.load_at(dt(3, 5)), 2);
        assert_eq!(load.load_at(dt(3, 8)), 1); // first ended, end exclusive
        assert_eq!(load.load_at(dt(4, 2)), 0);
    }

    #[test]
    fn test_capacity_limit() {
        let mut load = load(1);
        load.assign(dt(3, 0), dt(3, 8));
        assert!(!load.has_capacity_at(dt(3, 4)));
        assert!(load.has_capacity_at(dt(3, 8)));
    }

    #[test]
    fn test_assign_keeps_sorted_order() {
        let mut load = load(3);
        load.assign(dt(5, 0), dt(5, 8));
        load.assign(dt(3, 0), dt(3, 8));
        load.assign(dt(4, 0), dt(4, 8));
        // Sorted invariant means the partition_point prefix scan stays correct
        assert_eq!(load.load_at(dt(4, 4)), 1);
        assert_eq!(load.load_at(dt(3, 4)), 1);
        assert_eq!(load.load_at(dt(5, 4)), 1);
    }
}
