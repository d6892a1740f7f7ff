//! Blocked check: which prerequisites of a task are not completed yet.

use std::collections::HashMap;

use tracing::warn;

use crate::domain::{BlockedReport, BlockingTask, Task, TaskId};

/// Collect every prerequisite of `task` whose status is not `completed`.
///
/// `prerequisites` must hold the records the task's edges point at. An edge
/// whose target is missing (a dangling edge) is skipped.
pub fn blocked_by(task: &Task, prerequisites: &HashMap<TaskId, Task>) -> BlockedReport {
    let blockers = task
        .dependencies
        .iter()
        .filter_map(|edge| {
            let Some(dep) = prerequisites.get(&edge.depends_on) else {
                warn!(task = %task.id, missing = %edge.depends_on, "dangling dependency edge");
                return None;
            };
            (!dep.status.is_completed()).then(|| BlockingTask {
                id: dep.id,
                title: dep.title.clone(),
                status: dep.status,
                dependency_type: edge.dependency_type,
            })
        })
        .collect();
    BlockedReport::from_blockers(blockers)
}
