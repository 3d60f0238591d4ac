//! Milestone date resolution over a placed schedule.
//!
//! Dependent task sets are supplied by the caller, not derived from the
//! graph. A dependent without a placement is skipped rather than failing
//! the run; a milestone with no placed dependents resolves to its target
//! date.

use crate::models::{Milestone, ScheduledTask};

/// Resolve each milestone's date from the placements.
///
/// `is_manual_constraint` is carried through unchanged: a manual target is
/// a compliance marker for the caller, never a placement constraint.
pub fn resolve_milestones(
    milestones: Vec<Milestone>,
    placements: &[ScheduledTask],
) -> Vec<Milestone> {
    milestones
        .into_iter()
        .map(|mut milestone| {
            let latest_end = milestone
                .dependent_task_ids
                .iter()
                .filter_map(|id| placements.iter().find(|p| &p.task_id == id))
                .map(|p| p.end)
                .max();
            milestone.resolved_date = Some(latest_end.unwrap_or(milestone.target_date));
            milestone
        })
        .collect()
}
