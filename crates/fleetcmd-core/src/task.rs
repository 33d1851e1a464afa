//! Task and TaskAssetRecord types.

use crate::{AssetKey, TaskAssetStatus, TaskId, TaskStatus, TypeId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A Task represents one scheduled maintenance operation spanning one or
/// more physical assets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier.
    pub id: TaskId,

    /// Current task status.
    pub status: TaskStatus,

    /// Operation-specific payload.
    pub payload: TaskPayload,

    /// Per-asset progress rows, in scheduling order.
    pub assets: Vec<TaskAssetRecord>,

    /// When the task was created.
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Create a new Task with no assets attached yet.
    pub fn new(payload: TaskPayload) -> Self {
        Self {
            id: TaskId::generate(),
            status: TaskStatus::Scheduled,
            payload,
            assets: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Builder method to set a specific ID (useful for testing).
    pub fn with_id(mut self, id: TaskId) -> Self {
        self.id = id;
        self
    }

    /// Builder method to attach an asset, creating its progress row.
    pub fn with_asset(mut self, key: AssetKey) -> Self {
        self.add_asset(key);
        self
    }

    /// Attach an asset to this task, creating its progress row.
    pub fn add_asset(&mut self, key: AssetKey) {
        self.assets.push(TaskAssetRecord::new(self.id.clone(), key));
    }

    /// Statuses of all attached assets, in scheduling order.
    pub fn asset_statuses(&self) -> Vec<TaskAssetStatus> {
        self.assets.iter().map(|a| a.status).collect()
    }

    /// Check if the task is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Operation-specific payload of a Task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum TaskPayload {
    /// Deliver a firmware package to each asset's target sub-component.
    DownloadPackage {
        /// The package to deliver.
        package: Package,
    },
    /// Retrieve diagnostic logs from every sub-component of each asset.
    RetrieveLog {
        /// Which log archive the devices must upload.
        log_kind: LogKind,
    },
}

/// A firmware package reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    /// Registry identifier of the package.
    pub package_id: String,

    /// File name under the package root on the transfer server.
    pub file_name: String,

    /// Hardware model the package applies to. Must be a documented
    /// sub-component of every addressed device.
    pub target_type_id: TypeId,

    /// Package version string, if the registry provides one.
    pub version: Option<String>,
}

/// Which diagnostic log archive a retrieve-log task asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    /// Device operation and maintenance log.
    Diagnostic,
    /// Cash transaction journal.
    Transaction,
    /// Access and tamper log.
    Security,
}

impl LogKind {
    /// Wire name of the log kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Diagnostic => "diagnostic",
            Self::Transaction => "transaction",
            Self::Security => "security",
        }
    }
}

/// Per-device-per-task progress row.
///
/// Created when the task is scheduled; mutated once per terminal outcome;
/// never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskAssetRecord {
    /// Owning task.
    pub task_id: TaskId,

    /// Compound identity of the physical asset.
    pub key: AssetKey,

    /// Current status.
    pub status: TaskAssetStatus,

    /// When command dispatch for this asset began.
    pub started_at: Option<DateTime<Utc>>,

    /// Last status change.
    pub updated_at: Option<DateTime<Utc>>,
}

impl TaskAssetRecord {
    /// Create a new record in the Scheduled state.
    pub fn new(task_id: TaskId, key: AssetKey) -> Self {
        Self {
            task_id,
            key,
            status: TaskAssetStatus::Scheduled,
            started_at: None,
            updated_at: None,
        }
    }

    /// Mark the asset's command as dispatched and awaiting the device.
    pub fn start(&mut self) {
        self.status = TaskAssetStatus::InProgress;
        let now = Utc::now();
        self.started_at = Some(now);
        self.updated_at = Some(now);
    }

    /// Record a status transition.
    pub fn set_status(&mut self, status: TaskAssetStatus) {
        self.status = status;
        self.updated_at = Some(Utc::now());
        if status == TaskAssetStatus::InProgress && self.started_at.is_none() {
            self.started_at = self.updated_at;
        }
    }
}
