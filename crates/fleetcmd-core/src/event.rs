//! Audit events for tracking task-asset workflow milestones.

use crate::ids::{AssetId, AssetKey, TaskId, TypeId};
use crate::ErrorKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An immutable record of one workflow milestone for a task-asset.
///
/// Written to a side channel; its persistence failures never affect the
/// task outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Owning task.
    pub task_id: TaskId,
    /// Device type of the task-asset.
    pub type_id: TypeId,
    /// Asset id of the task-asset.
    pub asset_id: AssetId,
    /// Which milestone this event records.
    pub milestone: AuditMilestone,
    /// Classified failure kind, present on Fail events.
    pub error: Option<ErrorKind>,
    /// When the milestone occurred.
    pub occurred_at: DateTime<Utc>,
}

impl AuditEvent {
    fn new(task_id: TaskId, key: &AssetKey, milestone: AuditMilestone, error: Option<ErrorKind>) -> Self {
        Self {
            task_id,
            type_id: key.type_id.clone(),
            asset_id: key.asset_id.clone(),
            milestone,
            error,
            occurred_at: Utc::now(),
        }
    }

    /// The task-asset was created alongside its task.
    pub fn created(task_id: TaskId, key: &AssetKey) -> Self {
        Self::new(task_id, key, AuditMilestone::Create, None)
    }

    /// The command for the task-asset was dispatched.
    pub fn executed(task_id: TaskId, key: &AssetKey) -> Self {
        Self::new(task_id, key, AuditMilestone::Execute, None)
    }

    /// The task-asset failed with a classified error.
    pub fn failed(task_id: TaskId, key: &AssetKey, kind: ErrorKind) -> Self {
        Self::new(task_id, key, AuditMilestone::Fail, Some(kind))
    }
}

/// Workflow milestone recorded by an audit event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditMilestone {
    /// Task-asset row created at scheduling time.
    Create,
    /// Command dispatched to the device.
    Execute,
    /// Task-asset settled in an error state.
    Fail,
}
