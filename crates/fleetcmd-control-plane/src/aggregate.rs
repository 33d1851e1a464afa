//! Task status aggregation.

use tracing::info;

use fleetcmd_core::{TaskAssetStatus, TaskId, TaskStatus};

use crate::store::{StoreError, TaskStore};

/// Reduce a task's task-asset statuses to one task-level status.
///
/// An empty set and an all-terminal-error set both land in the final
/// branch alongside the partially-successful case; the task level does
/// not distinguish them.
pub fn compute(statuses: &[TaskAssetStatus]) -> TaskStatus {
    if !statuses.is_empty() && statuses.iter().all(|s| *s == TaskAssetStatus::Scheduled) {
        return TaskStatus::Scheduled;
    }
    if !statuses.is_empty() && statuses.iter().all(|s| *s == TaskAssetStatus::Complete) {
        return TaskStatus::Complete;
    }
    if statuses
        .iter()
        .any(|s| matches!(s, TaskAssetStatus::InProgress | TaskAssetStatus::Scheduled))
    {
        return TaskStatus::InProgress;
    }
    TaskStatus::Failure
}

/// Recompute and persist the task-level status.
///
/// Only an InProgress task moving to a terminal status is persisted;
/// anything else is a no-op, which makes repeated invocation (from the
/// dispatch drivers and from the device-response path) safe.
pub async fn finalize(store: &dyn TaskStore, task_id: &TaskId) -> Result<(), StoreError> {
    let task = store.get_task(task_id).await?;
    if task.status != TaskStatus::InProgress {
        return Ok(());
    }

    let computed = compute(&task.asset_statuses());
    if computed.is_terminal() {
        info!(task_id = %task_id, status = ?computed, "Task settled");
        store.update_task_status(task_id, computed).await?;
    }
    Ok(())
}
